//! Operation kinds: where the concrete build behavior plugs into the graph.

use crate::error::{Error, Result};
use crate::graph::{Graph, Operation, Target};
use crate::settings::OperationSettings;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Platform-bound behavior for one operation instance.
pub trait OperationImpl {
    /// Brings the outputs up to date, returning any console output.
    fn run(&self) -> anyhow::Result<Vec<u8>>;

    /// Removes the outputs, returning any console output.
    fn clean(&self) -> anyhow::Result<Vec<u8>>;

    /// Status message shown while the operation runs.
    fn message(&self) -> Option<String> {
        None
    }

    /// The command line, for verbose output.
    fn cmdline(&self) -> Option<String> {
        None
    }
}

pub trait OperationKind: Send + Sync {
    fn name(&self) -> &str;

    /// Built-in default settings, used where no directory overrides them.
    fn default_settings(&self) -> Box<dyn OperationSettings>;

    /// Rejects targets this kind cannot consume.
    fn validate_input(&self, _target: &Target) -> Result<()> {
        Ok(())
    }

    /// Rejects targets this kind cannot produce.
    fn validate_output(&self, _target: &Target) -> Result<()> {
        Ok(())
    }

    /// Binds `op` to the implementation for `platform` (as in
    /// `std::env::consts::OS`).
    fn implementation<'a>(
        &self,
        platform: &str,
        graph: &'a Graph,
        op: &'a Operation,
    ) -> Result<Box<dyn OperationImpl + 'a>>;
}

/// All operation kinds known to one invocation, by name.
#[derive(Default)]
pub struct Registry {
    kinds: FxHashMap<String, Arc<dyn OperationKind>>,
}

impl Registry {
    pub fn register(&mut self, kind: Arc<dyn OperationKind>) -> Result<()> {
        let name = kind.name().to_string();
        if self.kinds.contains_key(&name) {
            return Err(Error::DuplicateKind(name));
        }
        self.kinds.insert(name, kind);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn OperationKind>> {
        self.kinds
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownKind(name.to_string()))
    }
}
