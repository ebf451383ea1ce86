//! Render model for the external layout collaborator
//!
//! The diagram surface (a directed-graph layout/draw service) builds its
//! graph incrementally: a node must exist before an edge can reference it.
//! [`emit`] therefore walks the annotated tree strictly pre-order, adding
//! each node before the edge from its parent and before any descendant.
//!
//! Labels and fill colors are precomputed here so the layout layer stays a
//! dumb consumer.

use super::annotate::{AnnotatedNode, AnnotatedPlan};
use crate::plan::node::PlanNode;
use serde::Serialize;

/// Nodes below this heat are drawn plain white instead of tinted.
const FILL_INTENSITY_FLOOR: f64 = 0.1;

/// Incremental graph-construction interface of the layout collaborator.
pub trait GraphSink {
    /// Register a node. Guaranteed to be called before any edge or child
    /// referencing `id`.
    fn add_node(&mut self, id: &str, node: RenderNode);

    /// Register a directed edge between two already-added nodes.
    fn add_edge(&mut self, from: &str, to: &str, label: &str);
}

/// Precomputed display data for one plan node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    /// Operator name shown as the node title
    pub node_type: String,
    /// Exclusive time label, e.g. "2.674ms"
    pub exclusive_label: String,
    /// Percentage-of-total label, e.g. "10.6%"
    pub percentage_label: String,
    /// CSS fill color, `None` for cold (white) nodes
    pub fill: Option<String>,
}

/// An edge with its parent-relationship label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEdge {
    pub from: String,
    pub to: String,
    /// The child's `Parent Relationship`, empty when absent
    pub label: String,
}

/// Default in-crate [`GraphSink`]: collects nodes and edges in emit order.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RenderGraph {
    pub nodes: Vec<(String, RenderNode)>,
    pub edges: Vec<RenderEdge>,
}

impl GraphSink for RenderGraph {
    fn add_node(&mut self, id: &str, node: RenderNode) {
        self.nodes.push((id.to_string(), node));
    }

    fn add_edge(&mut self, from: &str, to: &str, label: &str) {
        self.edges.push(RenderEdge {
            from: from.to_string(),
            to: to.to_string(),
            label: label.to_string(),
        });
    }
}

/// White-to-red heat fill: full red at intensity 1, white below the floor.
fn fill_color(intensity: f64) -> Option<String> {
    if intensity <= FILL_INTENSITY_FLOOR {
        return None;
    }
    let cold = (255.0 * (1.0 - intensity)).floor() as u8;
    Some(format!("rgb(255,{},{})", cold, cold))
}

fn render_node(node: &AnnotatedNode) -> RenderNode {
    RenderNode {
        node_type: node.node.node_type.clone(),
        exclusive_label: format!("{:.3}ms", node.exclusive_time_ms),
        percentage_label: format!("{:.1}%", node.percentage_of_total),
        fill: fill_color(node.color_intensity),
    }
}

/// Emit the annotated tree into a [`GraphSink`], pre-order.
pub fn emit(plan: &AnnotatedPlan, sink: &mut impl GraphSink) {
    let mut next_id = 0usize;
    emit_node(&plan.root, None, sink, &mut next_id);
}

fn emit_node(
    node: &AnnotatedNode,
    parent_id: Option<&str>,
    sink: &mut impl GraphSink,
    next_id: &mut usize,
) {
    let id = format!("n{}", *next_id);
    *next_id += 1;

    sink.add_node(&id, render_node(node));

    if let Some(parent) = parent_id {
        let label = node.node.parent_relationship.as_deref().unwrap_or("");
        sink.add_edge(parent, &id, label);
    }

    for child in &node.children {
        emit_node(child, Some(&id), sink, next_id);
    }
}

/// Indented one-line-per-node text rendering of a plan tree.
///
/// Used to give the assistant (and logs) a compact view of a plan without
/// shipping the full JSON.
pub fn summarize(root: &PlanNode) -> String {
    let mut out = String::new();
    summarize_node(root, 0, &mut out);
    out
}

fn summarize_node(node: &PlanNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    out.push_str(&format!(
        "{}- {}: {:.2}ms, {} rows ({} loops), cost: {:.2}\n",
        indent,
        node.node_type,
        node.actual_total_time_ms,
        node.actual_rows,
        node.actual_loops,
        node.total_cost
    ));
    if let Some(relation) = &node.relation_name {
        out.push_str(&format!("{}  Table: {}\n", indent, relation));
    }
    if let Some(filter) = &node.filter {
        out.push_str(&format!("{}  Filter: {}\n", indent, filter));
    }
    if let Some(cond) = &node.index_cond {
        out.push_str(&format!("{}  Index Condition: {}\n", indent, cond));
    }
    if let Some(index) = &node.index_name {
        out.push_str(&format!("{}  Index: {}\n", indent, index));
    }
    for child in &node.children {
        summarize_node(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::annotate::annotate;
    use crate::plan::node::parse_plan;
    use serde_json::json;
    use std::collections::HashSet;

    fn sample_plan() -> AnnotatedPlan {
        let text = json!([{"Plan": {
            "Node Type": "Aggregate",
            "Actual Total Time": 25.124,
            "Actual Rows": 1,
            "Actual Loops": 1,
            "Plans": [{
                "Node Type": "Seq Scan",
                "Parent Relationship": "Outer",
                "Relation Name": "users",
                "Actual Total Time": 22.45,
                "Actual Rows": 50000,
                "Actual Loops": 1,
                "Filter": "(age > 25)"
            }]
        }}])
        .to_string();
        let (_, root) = parse_plan(&text).unwrap();
        annotate(&root)
    }

    /// Sink that fails if an edge arrives before both of its endpoints.
    #[derive(Default)]
    struct OrderCheckingSink {
        seen: HashSet<String>,
        edges: usize,
    }

    impl GraphSink for OrderCheckingSink {
        fn add_node(&mut self, id: &str, _node: RenderNode) {
            self.seen.insert(id.to_string());
        }

        fn add_edge(&mut self, from: &str, to: &str, _label: &str) {
            assert!(self.seen.contains(from), "edge before parent node");
            assert!(self.seen.contains(to), "edge before child node");
            self.edges += 1;
        }
    }

    #[test]
    fn emits_nodes_before_their_edges() {
        let mut sink = OrderCheckingSink::default();
        emit(&sample_plan(), &mut sink);
        assert_eq!(sink.seen.len(), 2);
        assert_eq!(sink.edges, 1);
    }

    #[test]
    fn render_graph_collects_labels_and_edges() {
        let mut graph = RenderGraph::default();
        emit(&sample_plan(), &mut graph);

        assert_eq!(graph.nodes.len(), 2);
        let (root_id, root) = &graph.nodes[0];
        assert_eq!(root.node_type, "Aggregate");
        assert_eq!(root.exclusive_label, "2.674ms");
        assert_eq!(root.percentage_label, "10.6%");

        let (scan_id, scan) = &graph.nodes[1];
        assert_eq!(scan.node_type, "Seq Scan");
        assert_eq!(scan.exclusive_label, "22.450ms");
        // The hottest node is fully saturated red
        assert_eq!(scan.fill.as_deref(), Some("rgb(255,0,0)"));

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(&graph.edges[0].from, root_id);
        assert_eq!(&graph.edges[0].to, scan_id);
        assert_eq!(graph.edges[0].label, "Outer");
    }

    #[test]
    fn cold_nodes_have_no_fill() {
        assert_eq!(fill_color(0.0), None);
        assert_eq!(fill_color(0.1), None);
        assert_eq!(fill_color(0.5).as_deref(), Some("rgb(255,127,127)"));
        assert_eq!(fill_color(1.0).as_deref(), Some("rgb(255,0,0)"));
    }

    #[test]
    fn summarize_indents_children() {
        let plan = sample_plan();
        let text = summarize(&plan.root.node);
        assert!(text.contains("- Aggregate: 25.12ms"));
        assert!(text.contains("  - Seq Scan: 22.45ms"));
        assert!(text.contains("  Table: users"));
        assert!(text.contains("  Filter: (age > 25)"));
    }
}
