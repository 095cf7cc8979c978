//! Error types for bundled stages and the pipeline DSL.

use std::io;
use std::process::ExitStatus;
use std::sync::Arc;

use lazypipe::PipelineError;
use thiserror::Error;

/// A failure raised while a stage runs.
///
/// Stage errors travel downstream as `Err` items, so the type is `Clone`;
/// underlying sources are shared behind an `Arc`.
#[derive(Error, Debug, Clone)]
pub enum StageError {
    #[error("cannot read {origin}: {source}")]
    Io {
        origin: String,
        source: Arc<io::Error>,
    },

    #[error("invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        source: Arc<reqwest::Error>,
    },

    #[error("cannot start `{command}`: {source}")]
    Spawn {
        command: String,
        source: Arc<io::Error>,
    },

    #[error("I/O error talking to `{command}`: {source}")]
    ProcessIo {
        command: String,
        source: Arc<io::Error>,
    },

    #[error("`{command}` failed with {status}")]
    ProcessFailed { command: String, status: ExitStatus },
}

impl StageError {
    pub fn io(origin: impl Into<String>, err: io::Error) -> Self {
        Self::Io {
            origin: origin.into(),
            source: Arc::new(err),
        }
    }

    pub fn http(url: impl Into<String>, err: reqwest::Error) -> Self {
        Self::Http {
            url: url.into(),
            source: Arc::new(err),
        }
    }

    pub fn spawn(command: impl Into<String>, err: io::Error) -> Self {
        Self::Spawn {
            command: command.into(),
            source: Arc::new(err),
        }
    }

    pub fn process_io(command: impl Into<String>, err: io::Error) -> Self {
        Self::ProcessIo {
            command: command.into(),
            source: Arc::new(err),
        }
    }
}

/// Errors from parsing, assembling or running a DSL pipeline.
#[derive(Error, Debug)]
pub enum DslError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("pipeline has no stages")]
    Empty,

    #[error("{stage} cannot be the first stage (start with ECHO, CAT, CURL or SH)")]
    NotASource { stage: &'static str },

    #[error(transparent)]
    Compose(#[from] PipelineError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DslError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_messages() {
        let err = StageError::io("data.txt", io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "cannot read data.txt: gone");

        let err = StageError::spawn("frob", io::Error::other("no such program"));
        assert_eq!(err.to_string(), "cannot start `frob`: no such program");
    }

    #[test]
    fn test_stage_error_is_cloneable_with_source() {
        let err = StageError::process_io("cat", io::Error::other("pipe closed"));
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
        assert!(std::error::Error::source(&copy).is_some());
    }

    #[test]
    fn test_dsl_error_wraps_compose_error() {
        let err: DslError = PipelineError::SourceDownstream {
            upstream: "cat".to_string(),
            downstream: "echo".to_string(),
        }
        .into();
        assert!(err.to_string().contains("a source stage accepts no input"));

        let err = DslError::NotASource { stage: "GREP" };
        assert_eq!(
            err.to_string(),
            "GREP cannot be the first stage (start with ECHO, CAT, CURL or SH)"
        );
    }
}
