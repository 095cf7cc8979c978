//! # lazypipe-stages
//!
//! Ready-made stages for [`lazypipe`] pipelines, plus a small text
//! pipeline language and the `pipe-run` command that executes it.
//!
//! Text stages work on [`Line`] items: `Ok` lines flow through, and a
//! failure becomes an `Err` item that downstream stages pass along.
//!
//! ```
//! use lazypipe_stages::{Substitute, echo, grep, sed};
//!
//! let swap = sed(r"(\w+) and (\w+)", "$2 and $1", Substitute::Inclusive);
//! let pipeline = echo("cat and dog") | grep("dog") | swap;
//! assert_eq!(pipeline.name(), "echo | grep | sed");
//!
//! let lines: Vec<String> = pipeline.iter().collect::<Result<_, _>>().unwrap();
//! assert_eq!(lines, vec!["dog and cat"]);
//! ```

pub mod dsl;
pub mod error;
pub mod items;
pub mod logging;
pub mod pattern;
pub mod shell;
pub mod source;
pub mod text;

pub use dsl::{Command, build_pipeline, parse_commands, run_pipeline};
pub use error::{DslError, StageError};
pub use items::{count, filter, map, pretty_printer, pretty_printer_to, skip, take};
pub use pattern::{Substitute, grep, sed};
pub use shell::{ExitPolicy, sh, sh_source};
pub use source::{cat, curl, echo};
pub use text::{Line, TextItem};
