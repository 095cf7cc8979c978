//! External process stages.
//!
//! `sh` hands its input to `sh -c <command>` on stdin, one line per item,
//! and streams the process's stdout back as lines. Upstream is drained
//! before the process starts. Stdin is written from a helper thread so a
//! process that produces output before reading all of its input cannot
//! deadlock against us.

use std::io::{self, BufRead, BufReader, Lines, Write};
use std::iter;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use lazypipe::{Flow, Node, SourceNode};

use crate::error::StageError;
use crate::text::{Line, TextItem};

/// What to do when the process exits unsuccessfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitPolicy {
    /// Log a warning and end the flow normally.
    #[default]
    Ignore,
    /// Yield a [`StageError::ProcessFailed`] item after the output.
    Check,
}

/// Pipe the input through `sh -c command`.
///
/// `command` is interpreted by the shell, so quoting, globs, variables and
/// pipes all behave as they would at a `sh` prompt.
pub fn sh<T: TextItem + 'static>(command: impl Into<String>, policy: ExitPolicy) -> Node<T, Line> {
    let command = command.into();
    Node::transform("sh", move |input: Flow<T>| {
        spawn_lines(&command, input.map(TextItem::into_line), policy)
    })
}

/// Run `sh -c command` with empty stdin and stream its output.
///
/// As with [`sh`], shell syntax in `command` is interpreted.
pub fn sh_source(command: impl Into<String>, policy: ExitPolicy) -> SourceNode<Line> {
    let command = command.into();
    Node::source("sh", move || spawn_lines(&command, iter::empty(), policy))
}

fn spawn_lines(command: &str, input: impl Iterator<Item = Line>, policy: ExitPolicy) -> Flow<Line> {
    let mut payload = Vec::new();
    for line in input {
        match line {
            Ok(text) => {
                payload.extend_from_slice(text.as_bytes());
                payload.push(b'\n');
            }
            Err(err) => return Box::new(iter::once(Err(err))),
        }
    }
    match ProcessLines::spawn(command, payload, policy) {
        Ok(lines) => Box::new(lines),
        Err(err) => Box::new(iter::once(Err(err))),
    }
}

/// Stdout of a running child, line by line.
///
/// The child is reaped when its output ends. Dropping the iterator early
/// kills it.
struct ProcessLines {
    command: String,
    policy: ExitPolicy,
    child: Child,
    stdout: Lines<BufReader<ChildStdout>>,
    writer: Option<JoinHandle<io::Result<()>>>,
    done: bool,
}

impl ProcessLines {
    fn spawn(command: &str, payload: Vec<u8>, policy: ExitPolicy) -> Result<Self, StageError> {
        tracing::debug!(%command, bytes = payload.len(), "spawning process");
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|err| StageError::spawn(command, err))?;

        let (Some(mut stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(StageError::process_io(
                command,
                io::Error::other("child stdio was not captured"),
            ));
        };

        // Closing stdin when the thread ends signals EOF to the child.
        let writer = thread::spawn(move || stdin.write_all(&payload));

        Ok(Self {
            command: command.to_string(),
            policy,
            child,
            stdout: BufReader::new(stdout).lines(),
            writer: Some(writer),
            done: false,
        })
    }

    fn finish(&mut self) -> Option<Line> {
        self.done = true;
        if let Some(writer) = self.writer.take() {
            match writer.join() {
                Ok(Err(err)) if err.kind() != io::ErrorKind::BrokenPipe => {
                    self.terminate();
                    return Some(Err(StageError::process_io(self.command.as_str(), err)));
                }
                Err(_) => tracing::warn!(command = %self.command, "stdin writer panicked"),
                _ => {}
            }
        }

        let status = match self.child.wait() {
            Ok(status) => status,
            Err(err) => return Some(Err(StageError::process_io(self.command.as_str(), err))),
        };
        tracing::debug!(command = %self.command, %status, "process exited");
        if status.success() {
            return None;
        }
        match self.policy {
            ExitPolicy::Check => Some(Err(StageError::ProcessFailed {
                command: self.command.clone(),
                status,
            })),
            ExitPolicy::Ignore => {
                tracing::warn!(command = %self.command, %status, "process exited unsuccessfully");
                None
            }
        }
    }

    fn terminate(&mut self) {
        self.done = true;
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl Iterator for ProcessLines {
    type Item = Line;

    fn next(&mut self) -> Option<Line> {
        if self.done {
            return None;
        }
        match self.stdout.next() {
            Some(Ok(line)) => Some(Ok(line)),
            Some(Err(err)) => {
                self.terminate();
                Some(Err(StageError::process_io(self.command.as_str(), err)))
            }
            None => self.finish(),
        }
    }
}

impl Drop for ProcessLines {
    fn drop(&mut self) {
        if !self.done {
            tracing::debug!(command = %self.command, "output abandoned, killing process");
            self.terminate();
        }
    }
}
