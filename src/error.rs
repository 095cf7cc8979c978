//! Errors raised by pipeline composition.
//!
//! Stage errors are never represented here: they travel through a pipeline
//! as part of the item payload and reach the caller untouched.

use thiserror::Error;

/// A contract violation detected while composing nodes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("cannot pipe `{upstream}` into `{downstream}`: a source stage accepts no input")]
    SourceDownstream {
        upstream: String,
        downstream: String,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_downstream_message() {
        let err = PipelineError::SourceDownstream {
            upstream: "cat".to_string(),
            downstream: "echo".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "cannot pipe `cat` into `echo`: a source stage accepts no input"
        );
    }
}
