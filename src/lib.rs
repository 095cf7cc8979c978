//! # lazypipe
//!
//! Shell-style composition of lazy, pull-based pipelines.
//!
//! This library lets iterator-producing functions be plugged together the
//! way a shell plugs processes together, while keeping every step lazy:
//! nothing runs until the final node is iterated, and items are pulled one
//! at a time through the whole chain.
//!
//! ## Overview
//!
//! - **Nodes**: a [`Node`] wraps one stage function and a display name
//! - **Stages**: either a source (no input) or a transform (one input flow)
//! - **Operators**: `|` chains, `*` pairs every output of two nodes, `+`
//!   concatenates two nodes' output
//! - **Factories**: [`SourceFactory`], [`TransformFactory`], [`source!`] and
//!   [`transform!`] separate defining a stage from instantiating it
//! - **Fan-out**: [`fan_out`] lets several consumers read one upstream at
//!   their own pace
//!
//! ## Example
//!
//! ```
//! use lazypipe::{Flow, Node};
//!
//! let numbers = Node::source("numbers", || vec![1, 2, 3, 4]);
//! let running_total = Node::transform("running_total", |input: Flow<i32>| {
//!     input.scan(0, |sum, x| {
//!         *sum += x;
//!         Some(*sum)
//!     })
//! });
//!
//! let pipeline = numbers | running_total;
//! assert_eq!(pipeline.name(), "numbers | running_total");
//! assert_eq!(pipeline.iter().collect::<Vec<_>>(), vec![1, 3, 6, 10]);
//! ```

mod macros;

pub mod error;
pub mod factory;
pub mod fanout;
pub mod node;

pub use error::PipelineError;
pub use factory::{SourceFactory, TransformFactory};
pub use fanout::{Cursor, fan_out, split};
pub use node::{Flow, Node, SourceNode, Stage};
