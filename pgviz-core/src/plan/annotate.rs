//! Cost annotation: exclusive time, percentages, heat intensity
//!
//! PostgreSQL reports a node's `Actual Total Time` as the average per-loop
//! wall time *including* all descendants. To find where time is really
//! spent, each node's self time is derived by subtracting the aggregate
//! time of its children:
//!
//! ```text
//! child_aggregate = sum(child.time * child.loops)
//! exclusive       = max(0, (node.time - child_aggregate)) * node.loops
//! ```
//!
//! Children are scaled by *their* loop counts because a child's reported
//! time is per-execution, while the parent waited on every execution. The
//! outer multiplication scales the per-loop self time to the node's total
//! contribution. Measurement skew in parallel plans can push the raw
//! difference negative; the clamp keeps exclusive time at zero instead of
//! propagating negative time.

use super::node::PlanNode;

/// A plan node plus derived cost fields.
///
/// Derived on every render, never persisted. The source tree is not
/// modified; annotation builds a parallel structure.
#[derive(Debug, Clone)]
pub struct AnnotatedNode {
    /// The decoded plan node this annotation describes
    pub node: PlanNode,
    /// Self time across all loops, in milliseconds (always >= 0)
    pub exclusive_time_ms: f64,
    /// Share of the plan's grand total time, in [0, 100]
    pub percentage_of_total: f64,
    /// Heat relative to the hottest node, in [0, 1]
    pub color_intensity: f64,
    /// Annotated children, same order as the source tree
    pub children: Vec<AnnotatedNode>,
}

/// Annotated tree plus the plan-wide scalars the summary panel shows.
#[derive(Debug, Clone)]
pub struct AnnotatedPlan {
    /// Annotated root node
    pub root: AnnotatedNode,
    /// Total plan time: the root's actual total time (root loops are 1)
    pub grand_total_time_ms: f64,
    /// Total rows produced: root rows scaled by root loops
    pub grand_total_rows: u64,
    /// Largest exclusive time anywhere in the tree
    pub max_exclusive_ms: f64,
}

/// Aggregate time the parent waited on its children, across all their loops.
fn child_aggregate_time(node: &PlanNode) -> f64 {
    node.children
        .iter()
        .map(|c| c.actual_total_time_ms * c.actual_loops as f64)
        .sum()
}

/// Self time of a node across all its loops, clamped at zero.
pub fn exclusive_time(node: &PlanNode) -> f64 {
    let per_loop = node.actual_total_time_ms - child_aggregate_time(node);
    (per_loop * node.actual_loops as f64).max(0.0)
}

fn max_exclusive(node: &PlanNode) -> f64 {
    node.children
        .iter()
        .map(max_exclusive)
        .fold(exclusive_time(node), f64::max)
}

/// Annotate a plan tree with exclusive times, percentages and intensities.
///
/// Every division is guarded: a plan with no measured time anywhere yields
/// all-zero percentages and intensities, never NaN.
pub fn annotate(root: &PlanNode) -> AnnotatedPlan {
    let grand_total_time_ms = root.actual_total_time_ms;
    let grand_total_rows = root.actual_rows * root.actual_loops;
    let max_exclusive_ms = max_exclusive(root);

    let annotated = annotate_node(root, grand_total_time_ms, max_exclusive_ms);

    AnnotatedPlan {
        root: annotated,
        grand_total_time_ms,
        grand_total_rows,
        max_exclusive_ms,
    }
}

fn annotate_node(node: &PlanNode, grand_total: f64, max_excl: f64) -> AnnotatedNode {
    let excl = exclusive_time(node);
    let percentage_of_total = if grand_total > 0.0 {
        100.0 * excl / grand_total
    } else {
        0.0
    };
    let color_intensity = if max_excl > 0.0 {
        (excl / max_excl).clamp(0.0, 1.0)
    } else {
        0.0
    };

    AnnotatedNode {
        node: node.clone(),
        exclusive_time_ms: excl,
        percentage_of_total,
        color_intensity,
        children: node
            .children
            .iter()
            .map(|c| annotate_node(c, grand_total, max_excl))
            .collect(),
    }
}

impl AnnotatedNode {
    /// Pre-order iterator over this subtree (self first, then children).
    pub fn walk(&self) -> impl Iterator<Item = &AnnotatedNode> + '_ {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children.iter().rev());
            Some(next)
        })
    }
}
