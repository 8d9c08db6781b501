pub mod canon;
pub mod command;
pub mod context;
mod densemap;
pub mod error;
pub mod eval;
pub mod fs;
pub mod graph;
pub mod includes;
pub mod kind;
pub mod load;
pub mod parse;
pub mod plan;
pub mod progress;
pub mod project;
mod run;
pub mod scanner;
pub mod settings;
mod signal;
pub mod stale;
mod task;
#[cfg(test)]
mod testutil;
pub mod trace;
pub mod work;

#[cfg(not(any(windows, target_arch = "wasm32")))]
use jemallocator::Jemalloc;

#[cfg(not(any(windows, target_arch = "wasm32")))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

pub use run::run;
