use anyhow::anyhow;
use argh::FromArgs;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::context::Context;
use crate::fs::RealFileSystem;
use crate::load::BuildfileLoader;
use crate::progress::ConsoleProgress;
use crate::project::{self, Project};
use crate::stale::Oracle;
use crate::work::Mode;
use crate::{signal, trace};

/// sbuild, an incremental build orchestrator.
#[derive(FromArgs)]
struct Args {
    /// chdir before running
    #[argh(option, short = 'C')]
    chdir: Option<String>,

    /// parallelism [default from system]
    #[argh(option, short = 'j')]
    jobs: Option<usize>,

    /// debugging tools (use "list" to list)
    #[argh(option, short = 'd')]
    debug: Option<String>,

    /// print executed command lines
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// remove the outputs of the targets instead of building them
    #[argh(switch)]
    clean: bool,

    /// targets to build, and NAME=VALUE config settings
    #[argh(positional)]
    args: Vec<String>,
}

fn run_impl() -> anyhow::Result<i32> {
    let args: Args = argh::from_env();

    if let Some(debug) = &args.debug {
        match debug.as_str() {
            "list" => {
                println!("debug tools:");
                println!("  trace  generate json performance trace");
                return Ok(1);
            }
            "trace" => trace::open("trace.json")?,
            _ => anyhow::bail!("unknown -d {:?}, use -d list to list", debug),
        }
    }

    if let Some(dir) = &args.chdir {
        let dir = Path::new(dir);
        std::env::set_current_dir(dir).map_err(|err| anyhow!("chdir {:?}: {}", dir, err))?;
    }

    let parallelism = match args.jobs {
        Some(0) => anyhow::bail!("invalid -j 0"),
        Some(n) => n,
        None => usize::from(std::thread::available_parallelism()?),
    };

    let mut config = BTreeMap::new();
    let mut targets = Vec::new();
    for arg in args.args {
        match arg.split_once('=') {
            Some((name, value)) => {
                config.insert(name.to_string(), value.to_string());
            }
            None => targets.push(arg),
        }
    }
    if targets.is_empty() {
        // The invoking directory's default target.
        targets.push(String::new());
    }

    let cwd = std::env::current_dir()?.canonicalize()?;
    let root = project::find_root(&cwd)?;
    let project = Project::new(&root, Arc::new(BuildfileLoader::new(config)));
    let oracle = Oracle::new(Arc::new(RealFileSystem::new()));
    let mut context = Context::new(project, oracle, parallelism);

    let mode = if args.clean { Mode::Clean } else { Mode::Build };
    let progress = ConsoleProgress::new(args.verbose);
    signal::register_sigint();
    let n = context.build_targets(&cwd, &targets, mode, &progress)?;

    match (mode, n) {
        (Mode::Clean, n) => println!("sbuild: cleaned {} tasks", n),
        // Special case: don't print numbers when no work done.
        (Mode::Build, 0) => println!("sbuild: no work to do"),
        (Mode::Build, n) => println!("sbuild: ran {} tasks, now up to date", n),
    }
    Ok(0)
}

pub fn run() -> anyhow::Result<i32> {
    let res = run_impl();
    trace::close()?;
    res
}
