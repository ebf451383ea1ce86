//! # pgviz-core
//!
//! Core library for pgviz - a PostgreSQL execution-plan visualizer.
//!
//! This library provides:
//! - A tolerant decoder for EXPLAIN (ANALYZE, FORMAT JSON) payloads
//! - Cost annotation (exclusive time, percentages, heat colors) and the
//!   render model consumed by the graph layout layer
//! - A bounded saved-plan store over a key-value collaborator
//! - Multi-turn Gemini conversations about a saved plan
//! - Configuration management and logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use pgviz_core::plan::{annotate, emit, parse_plan, RenderGraph};
//! use pgviz_core::store::{FileKvStore, PlanStore};
//! use pgviz_core::Config;
//!
//! let config = Config::load().expect("failed to load config");
//! let mut store = PlanStore::new(
//!     FileKvStore::open(config.store.root()).expect("failed to open store"),
//! );
//!
//! let (payload, root) = parse_plan(r#"[{"Plan": {"Node Type": "Result"}}]"#)
//!     .expect("invalid plan");
//! let annotated = annotate(&root);
//!
//! let mut graph = RenderGraph::default();
//! emit(&annotated, &mut graph);
//!
//! let record = store.save(payload, "SELECT 1").expect("failed to save");
//! println!("saved plan {} with {} nodes", record.id, graph.nodes.len());
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use plan::{annotate, parse_plan, AnnotatedPlan, PlanNode};
pub use session::{AssistantClient, Session, SessionState};
pub use store::{FileKvStore, KvStore, MemoryKvStore, PlanStore};
pub use types::*;

// Public modules
pub mod config;
pub mod error;
pub mod logging;
pub mod plan;
pub mod session;
pub mod store;
pub mod types;
