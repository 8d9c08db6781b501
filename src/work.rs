//! Build runner, choosing and executing operations as their inputs complete.

use crate::densemap::DenseMap;
use crate::error::{Error, Result};
use crate::graph::{Graph, OpId};
use crate::plan::{NodeId, Plan};
use crate::progress::Progress;
use crate::signal;
use crate::stale::Oracle;
use crate::trace;
use std::sync::atomic::{AtomicBool, AtomicIsize, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Mode {
    /// Run stale operations.
    Build,
    /// Remove the outputs of every planned operation.
    Clean,
}

/// Per-run bookkeeping shared by the worker threads.
struct RunState<'p> {
    plan: &'p Plan,
    /// Inputs each node still waits on.
    pending: DenseMap<NodeId, AtomicIsize>,
    failed: AtomicBool,
    failure: Mutex<Option<Error>>,
    /// Operations whose run()/clean() was actually invoked.
    executed: AtomicUsize,
    /// Input counter decrements, one per plan edge in a complete run.
    decrements: AtomicUsize,
}

impl<'p> RunState<'p> {
    fn new(plan: &'p Plan) -> Self {
        RunState {
            plan,
            pending: plan
                .node_ids()
                .map(|id| AtomicIsize::new(plan.node(id).pending as isize))
                .collect(),
            failed: AtomicBool::new(false),
            failure: Mutex::new(None),
            executed: AtomicUsize::new(0),
            decrements: AtomicUsize::new(0),
        }
    }

    /// Records the first failure; later ones are dropped.
    fn fail(&self, err: Error) {
        let mut failure = self.failure.lock().unwrap_or_else(|e| e.into_inner());
        if failure.is_none() {
            *failure = Some(err);
        }
        self.failed.store(true, Ordering::SeqCst);
    }

    fn take_failure(&self) -> Option<Error> {
        self.failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

pub struct Work<'a> {
    graph: &'a Graph,
    oracle: &'a Oracle,
    progress: &'a dyn Progress,
    platform: &'a str,
    parallelism: usize,
    /// Stops the run once raised; SIGINT by default.
    interrupt: &'a AtomicBool,
}

impl<'a> Work<'a> {
    pub fn new(
        graph: &'a Graph,
        oracle: &'a Oracle,
        progress: &'a dyn Progress,
        platform: &'a str,
        parallelism: usize,
    ) -> Self {
        Work {
            graph,
            oracle,
            progress,
            platform,
            parallelism: parallelism.max(1),
            interrupt: signal::interrupt_flag(),
        }
    }

    #[cfg(test)]
    fn with_interrupt(mut self, interrupt: &'a AtomicBool) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Executes the plan, returning how many operations ran (or were cleaned).
    /// The first failure stops any further operations from starting.
    pub fn run(&self, plan: &Plan, mode: Mode) -> Result<usize> {
        let state = RunState::new(plan);
        self.drive(&state, mode)?;
        Ok(state.executed.load(Ordering::SeqCst))
    }

    fn drive(&self, state: &RunState, mode: Mode) -> Result<()> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()?;
        pool.scope(move |scope| {
            for &root in state.plan.roots() {
                scope.spawn(move |scope| self.visit(state, scope, root, mode));
            }
        });

        if let Some(err) = state.take_failure() {
            return Err(err);
        }
        // The last operations may have finished after the interrupt.
        if self.interrupt.load(Ordering::SeqCst) {
            return Err(Error::Interrupted);
        }
        Ok(())
    }

    /// Handles one ready node, then spawns every consumer it made ready.
    fn visit<'s>(
        &'s self,
        state: &'s RunState<'s>,
        scope: &rayon::Scope<'s>,
        id: NodeId,
        mode: Mode,
    ) {
        if state.failed.load(Ordering::SeqCst) {
            return;
        }
        if self.interrupt.load(Ordering::SeqCst) {
            state.fail(Error::Interrupted);
            return;
        }

        let node = state.plan.node(id);
        match self.execute(node.op, mode) {
            Ok(true) => {
                state.executed.fetch_add(1, Ordering::SeqCst);
            }
            Ok(false) => {}
            Err(err) => {
                state.fail(err);
                return;
            }
        }

        for &next in &node.outs {
            let prev = state.pending[next].fetch_sub(1, Ordering::AcqRel);
            state.decrements.fetch_add(1, Ordering::SeqCst);
            if prev < 1 {
                panic!(
                    "input counter of {} went negative",
                    self.graph.op_name(state.plan.node(next).op)
                );
            }
            if prev == 1 {
                scope.spawn(move |scope| self.visit(state, scope, next, mode));
            }
        }
    }

    /// Runs or cleans one operation.  Returns whether it did anything.
    fn execute(&self, id: OpId, mode: Mode) -> Result<bool> {
        let op = self.graph.operation(id);
        if mode == Mode::Build && !self.oracle.is_stale(self.graph, op) {
            return Ok(false);
        }

        let name = self.graph.op_name(id);
        let imp = op.kind.implementation(self.platform, self.graph, op)?;
        let message = match mode {
            Mode::Build => imp.message().unwrap_or_else(|| name.clone()),
            Mode::Clean => format!("clean {}", name),
        };
        let cmdline = match mode {
            Mode::Build => imp.cmdline(),
            Mode::Clean => None,
        };
        self.progress
            .task_started(id, &message, cmdline.as_deref());

        let result = trace::scope(&message, || match mode {
            Mode::Build => imp.run(),
            Mode::Clean => imp.clean(),
        });
        for &out in op.outs() {
            self.oracle.forget(&self.graph.target(out).path);
        }
        match result {
            Ok(output) => {
                self.progress.task_finished(id, &message, &output);
                Ok(true)
            }
            Err(err) => Err(Error::Execution { op: name, err }),
        }
    }
}
