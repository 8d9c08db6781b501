//! Build progress tracking and reporting, for the purpose of display to the
//! user.

use crate::graph::OpId;
use std::io::Write;
use std::sync::Mutex;

/// Trait for build progress notifications.  Called from scheduler threads.
pub trait Progress: Sync {
    /// Called when an operation starts running or cleaning.
    fn task_started(&self, id: OpId, message: &str, cmdline: Option<&str>);

    /// Called when an operation completes successfully, with its console
    /// output.
    fn task_finished(&self, id: OpId, message: &str, output: &[u8]);

    /// Log a line of output without corrupting the progress display.
    fn log(&self, msg: &str);
}

/// Progress implementation for "dumb" console, without any overprinting.
#[derive(Default)]
pub struct ConsoleProgress {
    /// Whether to print command lines of started programs.
    verbose: bool,

    /// The id of the last command printed, used to avoid printing it twice
    /// when we have two updates from the same command in a row.
    last_started: Mutex<Option<OpId>>,
}

impl ConsoleProgress {
    pub fn new(verbose: bool) -> Self {
        ConsoleProgress {
            verbose,
            last_started: Mutex::new(None),
        }
    }

    fn set_last_started(&self, id: Option<OpId>) -> Option<OpId> {
        let mut last = self.last_started.lock().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *last, id)
    }
}

impl Progress for ConsoleProgress {
    fn task_started(&self, id: OpId, message: &str, cmdline: Option<&str>) {
        let line = match (self.verbose, cmdline) {
            (true, Some(cmdline)) => cmdline,
            _ => message,
        };
        self.log(line);
        self.set_last_started(Some(id));
    }

    fn task_finished(&self, id: OpId, message: &str, output: &[u8]) {
        if output.is_empty() {
            return;
        }
        if self.set_last_started(None) != Some(id) {
            self.log(message);
        }
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(output);
        let _ = stdout.flush();
    }

    fn log(&self, msg: &str) {
        println!("{}", msg);
    }
}
