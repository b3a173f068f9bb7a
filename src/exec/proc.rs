// src/exec/proc.rs

//! Platform-specific child process setup.

use tokio::process::Command;

/// Build a shell invocation for a task command, so workflow commands may use
/// shell features (pipes, redirects, `&&`).
pub(crate) fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Detach the child into its own process group where the host supports it,
/// so cancellation targets the whole group rather than only the leader.
#[cfg(unix)]
pub(crate) fn detach_process_group(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(not(unix))]
pub(crate) fn detach_process_group(_cmd: &mut Command) {}
