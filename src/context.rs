//! Everything one invocation shares: the resolved project, the staleness
//! caches and how to execute.

use crate::error::{Error, Result};
use crate::plan::Plan;
use crate::progress::Progress;
use crate::project::Project;
use crate::stale::Oracle;
use crate::trace;
use crate::work::{Mode, Work};
use std::path::Path;

pub struct Context {
    pub project: Project,
    pub oracle: Oracle,
    /// Platform name handed to operation kinds, as in `std::env::consts::OS`.
    pub platform: &'static str,
    pub parallelism: usize,
}

impl Context {
    pub fn new(project: Project, oracle: Oracle, parallelism: usize) -> Self {
        Context {
            project,
            oracle,
            platform: std::env::consts::OS,
            parallelism,
        }
    }

    /// Builds (or cleans) one target string, resolved against absolute
    /// directory `from`.  Returns the number of operations executed.
    pub fn build_target(
        &mut self,
        from: &Path,
        target: &str,
        mode: Mode,
        progress: &dyn Progress,
    ) -> Result<usize> {
        self.build_targets(from, &[target], mode, progress)
    }

    /// Builds several targets as one graph, so operations they share are
    /// executed once.  Fails on the first target that cannot be resolved,
    /// before anything runs.
    pub fn build_targets<S: AsRef<str>>(
        &mut self,
        from: &Path,
        targets: &[S],
        mode: Mode,
        progress: &dyn Progress,
    ) -> Result<usize> {
        let mut ops = Vec::new();
        for target in targets {
            let id = trace::scope("resolve", || {
                self.project.lookup_target(from, target.as_ref())
            })?;
            let target = self.project.graph.target(id);
            match target.operation {
                Some(op) => ops.push(op),
                None => return Err(Error::NotBuildable(target.name.clone())),
            }
        }

        let graph = &self.project.graph;
        let plan = trace::scope("plan", || Plan::build_all(graph, &ops))?;
        let work = Work::new(
            graph,
            &self.oracle,
            progress,
            self.platform,
            self.parallelism,
        );
        trace::scope("work", || work.run(&plan, mode))
    }
}
