//! Runs shell commands for command operations.
//! Unaware of the build graph; just command execution.

use std::path::Path;

/// The result of executing a command.
pub struct TaskResult {
    pub success: bool,
    /// Console output, stdout then stderr.
    pub output: Vec<u8>,
}

#[cfg(unix)]
fn shell(cmdline: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("/bin/sh");
    cmd.arg("-c").arg(cmdline);
    cmd
}

#[cfg(windows)]
fn shell(cmdline: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("cmd");
    cmd.arg("/c").arg(cmdline);
    cmd
}

#[cfg(unix)]
fn describe_signal(status: &std::process::ExitStatus, output: &mut Vec<u8>) {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(libc::SIGINT) => output.extend_from_slice(b"interrupted"),
        Some(sig) => output.extend_from_slice(format!("signal {}", sig).as_bytes()),
        None => {}
    }
}

#[cfg(not(unix))]
fn describe_signal(_status: &std::process::ExitStatus, _output: &mut Vec<u8>) {}

/// Executes `cmdline` through the platform shell in `cwd`.
/// Returns an Err() if we failed outside of the process itself.
pub fn run_command(cmdline: &str, cwd: &Path) -> anyhow::Result<TaskResult> {
    let mut cmd = shell(cmdline).current_dir(cwd).output()?;
    let mut output = Vec::new();
    output.append(&mut cmd.stdout);
    output.append(&mut cmd.stderr);
    let success = cmd.status.success();
    if !success {
        describe_signal(&cmd.status, &mut output);
    }
    Ok(TaskResult { success, output })
}
