//! Execution-plan domain: decoding, cost annotation, render model.
//!
//! Data flows `parse_plan` → [`annotate`] → [`emit`]:
//! the raw pasted text becomes a tolerant [`PlanNode`] tree, the annotator
//! derives exclusive times and heat intensities, and the render module
//! feeds a [`GraphSink`] in the order the layout collaborator requires.

pub mod annotate;
pub mod node;
pub mod render;

pub use annotate::{annotate, AnnotatedNode, AnnotatedPlan};
pub use node::{parse_plan, unwrap_envelope, PlanNode};
pub use render::{emit, summarize, GraphSink, RenderEdge, RenderGraph, RenderNode};
