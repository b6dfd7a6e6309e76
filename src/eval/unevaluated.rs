//! `unevaluatedItems` / `unevaluatedProperties`.
//!
//! Both run after every sibling keyword, so `out` already holds whatever the node's
//! applicators (and the references they followed) marked as evaluated.
use serde_json::Value;

use super::{Evaluator, Outcome};
use crate::schema::node::NodeId;

impl<'s> Evaluator<'s> {
    pub(super) fn unevaluated_items(&mut self, sub: NodeId, instance: &Value, out: &mut Outcome) {
        let Value::Array(items) = instance else { return };
        for (i, item) in items.iter().enumerate() {
            if out.items.contains(i) {
                continue;
            }
            let child = self.descend(sub, item, i.to_string());
            out.items.insert(i);
            out.absorb_nested(child);
        }
    }

    pub(super) fn unevaluated_properties(
        &mut self,
        sub: NodeId,
        instance: &Value,
        out: &mut Outcome,
    ) {
        let Value::Object(map) = instance else { return };
        for (name, value) in map {
            if out.properties.contains(name) {
                continue;
            }
            let child = self.descend(sub, value, name.as_str());
            out.properties.insert(name.clone());
            out.absorb_nested(child);
        }
    }
}
