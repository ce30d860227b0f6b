//! High-level process runner with event handling.

use std::process::ExitStatus;

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    sync::mpsc::{UnboundedSender, unbounded_channel},
    task::JoinHandle,
};
use tracing::{debug, warn};

use crate::process::{capture_exit_status, spawn_process};

/// Events emitted during process execution.
#[derive(Debug, PartialEq)]
pub enum RunEvent {
    /// Process creation failed with error message.
    ProcessCreationFailed(String),
    /// Process was successfully created.
    ProcessCreated,
    /// Process ended (true = success, false = failure).
    ProcessEnd(bool),
    /// New stdout line from the process.
    ProcessNewOutputLine(String),
    /// New stderr line from the process.
    ProcessNewErrorLine(String),
}

/// Everything a finished process left behind.
#[derive(Debug, Default)]
pub struct RunOutput {
    /// Exit status, `None` if the process couldn't be created or awaited.
    pub exit_status: Option<ExitStatus>,
    /// Why the process couldn't be created.
    pub creation_error: Option<String>,
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.exit_status.is_some_and(|status| status.success())
    }

    /// Short human readable reason for a failed run.
    pub fn failure_reason(&self) -> Option<String> {
        if self.success() {
            return None;
        }
        if let Some(err) = &self.creation_error {
            return Some(err.clone());
        }
        let status = match self.exit_status {
            Some(status) => format!("exited with {status}"),
            None => String::from("exit status unavailable"),
        };
        let tail: Vec<&str> = self
            .stderr
            .iter()
            .rev()
            .take(5)
            .rev()
            .map(|line| line.as_str())
            .collect();
        if tail.is_empty() {
            Some(status)
        } else {
            Some(format!("{status}: {}", tail.join("\n")))
        }
    }
}

/// High-level process runner with event-driven output handling.
#[derive(Debug, Clone)]
pub struct Runner {
    /// Command to execute.
    command: String,
    /// Command line arguments.
    args: Vec<String>,
}

impl Runner {
    /// Create a new runner with command and arguments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rr_io::runner::Runner;
    ///
    /// let runner = Runner::new("allure", vec!["generate", "results"]);
    /// ```
    pub fn new(command: impl Into<String>, args: Vec<impl Into<String>>) -> Self {
        Self {
            command: command.into(),
            args: args.into_iter().map(|a| a.into()).collect(),
        }
    }

    /// Get the full command string with arguments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rr_io::runner::Runner;
    ///
    /// let runner = Runner::new("ls", vec!["-la"]);
    /// assert_eq!(runner.get_full_command(), "ls -la");
    /// ```
    pub fn get_full_command(&self) -> String {
        if self.args.is_empty() {
            return self.command.clone();
        }
        format!("{} {}", &self.command, &self.args.join(" "))
    }

    fn launch_stream_reader<T>(
        tx: UnboundedSender<RunEvent>,
        stream: T,
        to_event: fn(String) -> RunEvent,
    ) -> JoinHandle<()>
    where
        T: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stream);
            let mut buffer = Vec::new();
            loop {
                buffer.clear();
                match reader.read_until(b'\n', &mut buffer).await {
                    Ok(0) => break, // EOF
                    Ok(_) => {
                        // Tools don't always write UTF-8, keep reading whatever they print
                        let line = String::from_utf8_lossy(&buffer);
                        let line = line.trim_end_matches(['\n', '\r']);
                        if tx.send(to_event(String::from(line))).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("Failed to read process output - {err}");
                        break;
                    }
                }
            }
        })
    }

    /// Run the process to completion, sending events via the provided channel.
    ///
    /// Reads stdout and stderr line by line until the process finishes.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use rr_io::runner::{Runner, RunEvent};
    /// use tokio::sync::mpsc::unbounded_channel;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let runner = Runner::new("echo", vec!["Hello"]);
    ///     let (tx, mut rx) = unbounded_channel();
    ///     let exit_status = runner.run(tx).await;
    ///     assert!(exit_status.unwrap().success());
    ///     assert_eq!(rx.recv().await, Some(RunEvent::ProcessCreated));
    /// }
    /// ```
    pub async fn run(&self, tx: UnboundedSender<RunEvent>) -> Option<ExitStatus> {
        let mut process = match spawn_process(&self.command, &self.args) {
            Ok(process) => process,
            Err(err) => {
                let _ = tx.send(RunEvent::ProcessCreationFailed(err.to_string()));
                return None;
            }
        };

        let _ = tx.send(RunEvent::ProcessCreated);

        let stdout_task = process.stdout.take().map(|stdout| {
            Runner::launch_stream_reader(tx.clone(), stdout, RunEvent::ProcessNewOutputLine)
        });
        let stderr_task = process.stderr.take().map(|stderr| {
            Runner::launch_stream_reader(tx.clone(), stderr, RunEvent::ProcessNewErrorLine)
        });

        let exit_status = match capture_exit_status(&mut process).await {
            Ok(status) => Some(status),
            Err(err) => {
                warn!("{} - {err}", self.command);
                None
            }
        };

        // Drain both pipes before reporting the end of the process
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            let _ = task.await;
        }

        let success = exit_status.is_some_and(|status| status.success());
        let _ = tx.send(RunEvent::ProcessEnd(success));
        exit_status
    }

    /// Run the process to completion and collect its output.
    ///
    /// Output lines are forwarded to the debug log as they arrive.
    pub async fn run_collect(&self) -> RunOutput {
        let (tx, mut rx) = unbounded_channel();
        let command = self.command.as_str();

        let collect = async {
            let mut output = RunOutput::default();
            while let Some(event) = rx.recv().await {
                match event {
                    RunEvent::ProcessCreationFailed(err) => {
                        warn!("{command} - Failed to create process {err}");
                        output.creation_error = Some(err);
                    }
                    RunEvent::ProcessCreated => debug!("{command} - Process started"),
                    RunEvent::ProcessEnd(success) => {
                        debug!("{command} - Process ended (success: {success})")
                    }
                    RunEvent::ProcessNewOutputLine(line) => {
                        debug!("{command} | {line}");
                        output.stdout.push(line);
                    }
                    RunEvent::ProcessNewErrorLine(line) => {
                        debug!("{command} ! {line}");
                        output.stderr.push(line);
                    }
                }
            }
            output
        };

        let (exit_status, mut output) = tokio::join!(self.run(tx), collect);
        output.exit_status = exit_status;
        output
    }
}
