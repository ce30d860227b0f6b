//! Low-level async process management utilities.

use std::{
    ffi::OsStr,
    io,
    process::{ExitStatus, Stdio},
};

use tokio::process::{Child, Command};

/// Errors that can occur during process operations.
#[derive(thiserror::Error, Debug)]
pub enum ProcessError {
    /// Failed to spawn the process.
    #[error("Failed to spawn '{command}': {source}")]
    SpawnProcessFail {
        command: String,
        #[source]
        source: io::Error,
    },
    /// Failed to wait for child process.
    #[error("Failed to wait for child process: {0}")]
    WaitChildFail(#[source] io::Error),
}

/// Spawn a new async process with piped stdout and stderr.
///
/// Stdin is closed so that a tool prompting for input fails instead of hanging.
///
/// # Examples
///
/// ```rust
/// use rr_io::process::spawn_process;
///
/// #[tokio::main]
/// async fn main() {
///     let mut child = spawn_process("echo", &[String::from("Hello")]).unwrap();
///     let output = child.stdout.take().unwrap();
/// }
/// ```
pub fn spawn_process(cmd: &str, args: &[String]) -> Result<Child, ProcessError> {
    Command::new(OsStr::new(cmd))
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProcessError::SpawnProcessFail {
            command: String::from(cmd),
            source,
        })
}

/// Wait for the child process to complete and return its exit status.
///
/// # Examples
///
/// ```rust
/// use rr_io::process::{spawn_process, capture_exit_status};
///
/// #[tokio::main]
/// async fn main() {
///     let mut child = spawn_process("echo", &[String::from("done")]).unwrap();
///     let exit_status = capture_exit_status(&mut child).await.unwrap();
///     assert!(exit_status.success());
/// }
/// ```
pub async fn capture_exit_status(child: &mut Child) -> Result<ExitStatus, ProcessError> {
    child.wait().await.map_err(ProcessError::WaitChildFail)
}
