//! Trace line parsing, Parameter construction, and backward program
//! slicing over the `tracesym` data model.
//!
//! The three stages compose as a pipeline: [`trace_parser::parse_trace`]
//! turns text into `Instruction`s, [`parambuild::build_parameters`]
//! annotates them with dependency Parameters, and [`slicer::backward_slice`]
//! reduces the annotated list against a criterion.

pub mod grammar;
pub mod parambuild;
pub mod render;
pub mod slicer;
pub mod trace_parser;

pub use parambuild::build_parameters;
pub use render::{render_assembly, render_human_line, render_llse_line};
pub use slicer::{backward_slice, Slice};
pub use trace_parser::parse_trace;
