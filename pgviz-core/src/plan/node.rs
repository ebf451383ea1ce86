//! Typed view over raw EXPLAIN JSON plan nodes
//!
//! PostgreSQL emits plan nodes as loosely-shaped JSON objects. The decoder
//! here is tolerant by design: every field it reads has a documented default
//! and a missing or mistyped field never fails the decode. The complete raw
//! payload is kept verbatim alongside the typed tree, so nothing is lost.

use crate::error::{Error, Result};
use serde_json::Value;

/// One step of a PostgreSQL execution plan.
///
/// Field defaults match what EXPLAIN omits: times and costs default to 0,
/// loops to 1 (a node that ran at all ran at least once).
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    /// Operator name, e.g. "Seq Scan" or "Hash Join" (default "Unknown")
    pub node_type: String,
    /// Average per-loop total time in milliseconds (default 0)
    pub actual_total_time_ms: f64,
    /// Rows produced per loop (default 0)
    pub actual_rows: u64,
    /// Number of times this node was executed (default 1)
    pub actual_loops: u64,
    /// Planner cost estimate (default 0)
    pub total_cost: f64,
    /// Table scanned, if any
    pub relation_name: Option<String>,
    /// Row filter expression, if any
    pub filter: Option<String>,
    /// Index used, if any
    pub index_name: Option<String>,
    /// Index condition, if any
    pub index_cond: Option<String>,
    /// Edge label from the parent node ("Outer", "Inner", ...)
    pub parent_relationship: Option<String>,
    /// Child plan nodes, in plan order
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    /// Decode a plan node from a raw JSON object.
    ///
    /// Never fails: unrecognized shapes simply produce a node of defaults.
    pub fn from_value(value: &Value) -> Self {
        let children = value
            .get("Plans")
            .and_then(Value::as_array)
            .map(|plans| plans.iter().map(PlanNode::from_value).collect())
            .unwrap_or_default();

        PlanNode {
            node_type: value
                .get("Node Type")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
            actual_total_time_ms: f64_field(value, "Actual Total Time", 0.0),
            actual_rows: u64_field(value, "Actual Rows", 0),
            actual_loops: u64_field(value, "Actual Loops", 1).max(1),
            total_cost: f64_field(value, "Total Cost", 0.0),
            relation_name: str_field(value, "Relation Name"),
            filter: str_field(value, "Filter"),
            index_name: str_field(value, "Index Name"),
            index_cond: str_field(value, "Index Cond"),
            parent_relationship: str_field(value, "Parent Relationship"),
            children,
        }
    }

    /// True if this node has no child plans
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

fn f64_field(value: &Value, key: &str, default: f64) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(default)
}

fn u64_field(value: &Value, key: &str, default: u64) -> u64 {
    value.get(key).and_then(Value::as_u64).unwrap_or(default)
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Unwrap the EXPLAIN envelope to the root plan-node object.
///
/// Three shapes are accepted, checked in order:
/// 1. `[{ "Plan": {...} }, ...]` - the usual psql output
/// 2. `{ "Plan": {...} }` - a single unwrapped element
/// 3. a bare plan-node object, used as-is
///
/// Anything else (strings, numbers, arrays without a `Plan`) is a shape error.
pub fn unwrap_envelope(payload: &Value) -> Result<&Value> {
    if let Some(first) = payload.as_array().and_then(|arr| arr.first()) {
        if let Some(plan) = first.get("Plan") {
            return Ok(plan);
        }
        return Err(Error::PlanShape(
            "array payload has no Plan field in its first element".to_string(),
        ));
    }

    if let Some(obj) = payload.as_object() {
        if let Some(plan) = obj.get("Plan") {
            return Ok(plan);
        }
        return Ok(payload);
    }

    Err(Error::PlanShape(format!(
        "expected a plan object or EXPLAIN array, got {}",
        type_name(payload)
    )))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse pasted plan text into the verbatim payload and the decoded root.
///
/// The payload is returned untouched for storage (dedup compares the
/// original envelope, not the unwrapped subtree). Invalid JSON or an
/// unrecognized envelope fails without side effects.
pub fn parse_plan(text: &str) -> Result<(Value, PlanNode)> {
    let payload: Value = serde_json::from_str(text)?;
    let root = PlanNode::from_value(unwrap_envelope(&payload)?);
    Ok((payload, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bare_node() -> Value {
        json!({
            "Node Type": "Seq Scan",
            "Relation Name": "users",
            "Actual Total Time": 22.45,
            "Actual Rows": 50000,
            "Actual Loops": 1,
            "Total Cost": 15453.0,
            "Filter": "(age > 25)"
        })
    }

    #[test]
    fn decodes_fields_with_defaults() {
        let node = PlanNode::from_value(&bare_node());
        assert_eq!(node.node_type, "Seq Scan");
        assert_eq!(node.actual_total_time_ms, 22.45);
        assert_eq!(node.actual_rows, 50000);
        assert_eq!(node.actual_loops, 1);
        assert_eq!(node.relation_name.as_deref(), Some("users"));
        assert_eq!(node.filter.as_deref(), Some("(age > 25)"));
        assert!(node.index_name.is_none());
        assert!(node.is_leaf());
    }

    #[test]
    fn empty_object_decodes_to_defaults() {
        let node = PlanNode::from_value(&json!({}));
        assert_eq!(node.node_type, "Unknown");
        assert_eq!(node.actual_total_time_ms, 0.0);
        assert_eq!(node.actual_loops, 1);
        assert!(node.children.is_empty());
    }

    #[test]
    fn zero_loops_clamps_to_one() {
        let node = PlanNode::from_value(&json!({"Actual Loops": 0}));
        assert_eq!(node.actual_loops, 1);
    }

    #[test]
    fn decodes_nested_children_in_order() {
        let value = json!({
            "Node Type": "Hash Join",
            "Plans": [
                {"Node Type": "Seq Scan", "Parent Relationship": "Outer"},
                {"Node Type": "Hash", "Parent Relationship": "Inner",
                 "Plans": [{"Node Type": "Index Scan"}]}
            ]
        });
        let node = PlanNode::from_value(&value);
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[0].node_type, "Seq Scan");
        assert_eq!(
            node.children[1].parent_relationship.as_deref(),
            Some("Inner")
        );
        assert_eq!(node.children[1].children[0].node_type, "Index Scan");
    }

    #[test]
    fn unwrap_accepts_all_three_envelope_shapes() {
        let node = bare_node();
        let wrapped_array = json!([{"Plan": node.clone()}]);
        let wrapped_object = json!({"Plan": node.clone()});

        let from_array = PlanNode::from_value(unwrap_envelope(&wrapped_array).unwrap());
        let from_object = PlanNode::from_value(unwrap_envelope(&wrapped_object).unwrap());
        let from_bare = PlanNode::from_value(unwrap_envelope(&node).unwrap());

        assert_eq!(from_array, from_object);
        assert_eq!(from_object, from_bare);
    }

    #[test]
    fn unwrap_rejects_non_plan_shapes() {
        assert!(unwrap_envelope(&json!("not a plan")).is_err());
        assert!(unwrap_envelope(&json!(42)).is_err());
        assert!(unwrap_envelope(&json!([{"NoPlan": {}}])).is_err());
    }

    #[test]
    fn parse_plan_rejects_invalid_json() {
        assert!(matches!(parse_plan("{not json"), Err(Error::Json(_))));
    }

    #[test]
    fn parse_plan_keeps_payload_verbatim() {
        let text = r#"[{"Plan": {"Node Type": "Result"}, "Planning Time": 0.1}]"#;
        let (payload, root) = parse_plan(text).unwrap();
        // The envelope survives, including fields outside the Plan subtree
        assert!(payload[0].get("Planning Time").is_some());
        assert_eq!(root.node_type, "Result");
    }
}
