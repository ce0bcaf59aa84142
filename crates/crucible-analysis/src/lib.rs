//! Native-type inference over the Crucible lattice (spec §4.5), with
//! usage-pattern refinement for unannotated parameters and containers.

pub mod container_inference;
pub mod infer;
pub mod param_inference;

pub use container_inference::{has_unknown_inner_type, infer_container_element_type};
pub use infer::{InferenceResult, TypeInferrer};
pub use param_inference::infer_param_type_from_body;
