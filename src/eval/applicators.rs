use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::Value;

use super::{Evaluator, Outcome};
use crate::schema::node::{NodeId, Pattern, RefId};

impl<'s> Evaluator<'s> {
    // ---- references ----

    pub(super) fn apply_ref(
        &mut self,
        node: NodeId,
        id: RefId,
        dynamic: bool,
        instance: &Value,
        out: &mut Outcome,
    ) {
        let schema = self.schema;
        let resolved = &schema.refs[id.0];
        let mut target = resolved.target;
        if dynamic {
            if let Some(anchor) = &resolved.dynamic_anchor {
                let outermost = self
                    .scope
                    .iter()
                    .find_map(|rid| schema.table.dynamic_anchor(*rid, anchor));
                if let Some(found) = outermost {
                    target = found;
                }
            }
        }

        let key = (target, instance as *const Value as usize);
        if !self.active.insert(key) {
            let keyword = if dynamic { "$dynamicRef" } else { "$ref" };
            let message = format!("`{}` loops without consuming the instance", resolved.uri);
            let unit = self.failure(node, keyword, message);
            out.fail(unit);
            return;
        }
        tracing::trace!(target = %resolved.uri, node = target.0, dynamic, "following reference");

        let entered = self.enter(schema.nodes[target.0].resource);
        let child = self.evaluate(target, instance);
        if entered {
            self.scope.pop();
        }
        self.active.remove(&key);
        out.absorb(child);
    }

    // ---- in-place ----

    pub(super) fn all_of(&mut self, subs: &[NodeId], instance: &Value, out: &mut Outcome) {
        for (i, sub) in subs.iter().enumerate() {
            let child = self.step(*sub, instance, i.to_string());
            out.absorb(child);
        }
    }

    pub(super) fn any_of(
        &mut self,
        node: NodeId,
        subs: &[NodeId],
        instance: &Value,
        out: &mut Outcome,
    ) {
        // every branch runs: unevaluated* needs all of the passing ones
        let results: Vec<Outcome> = subs
            .iter()
            .enumerate()
            .map(|(i, sub)| self.step(*sub, instance, i.to_string()))
            .collect();
        if results.iter().any(|r| r.valid) {
            for child in results.into_iter().filter(|r| r.valid) {
                out.absorb(child);
            }
            return;
        }
        let message = format!("{instance} matches none of the subschemas");
        let unit = self.failure(node, "anyOf", message);
        out.fail(unit);
        for child in results {
            out.absorb(child);
        }
    }

    pub(super) fn one_of(
        &mut self,
        node: NodeId,
        subs: &[NodeId],
        instance: &Value,
        out: &mut Outcome,
    ) {
        let results: Vec<Outcome> = subs
            .iter()
            .enumerate()
            .map(|(i, sub)| self.step(*sub, instance, i.to_string()))
            .collect();
        let passing: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.valid)
            .map(|(i, _)| i)
            .collect();
        match passing.as_slice() {
            [only] => {
                let only = *only;
                if let Some(child) = results.into_iter().nth(only) {
                    out.absorb(child);
                }
            }
            [] => {
                let message = format!("{instance} matches none of the subschemas");
                let unit = self.failure(node, "oneOf", message);
                out.fail(unit);
                for child in results {
                    out.absorb(child);
                }
            }
            many => {
                let message = format!("{instance} matches more than one subschema: {many:?}");
                let unit = self.failure(node, "oneOf", message);
                out.fail(unit);
            }
        }
    }

    pub(super) fn not(&mut self, node: NodeId, sub: NodeId, instance: &Value, out: &mut Outcome) {
        let child = self.evaluate(sub, instance);
        if child.valid {
            let message = format!("{instance} must not match the subschema");
            let unit = self.failure(node, "not", message);
            out.fail(unit);
        }
    }

    pub(super) fn if_then_else(
        &mut self,
        condition: NodeId,
        then: Option<NodeId>,
        otherwise: Option<NodeId>,
        instance: &Value,
        out: &mut Outcome,
    ) {
        let verdict = self.evaluate(condition, instance);
        let (branch, name) = if verdict.valid {
            out.absorb(verdict);
            (then, "then")
        } else {
            (otherwise, "else")
        };
        let Some(branch) = branch else { return };
        // report the branch under its own keyword, not under `if`
        self.keyword_path.pop();
        let child = self.step(branch, instance, name);
        self.keyword_path.push("if");
        out.absorb(child);
    }

    pub(super) fn dependent_schemas(
        &mut self,
        deps: &[(String, NodeId)],
        instance: &Value,
        out: &mut Outcome,
    ) {
        let Value::Object(map) = instance else { return };
        for (property, sub) in deps {
            if map.contains_key(property) {
                let child = self.step(*sub, instance, property.as_str());
                out.absorb(child);
            }
        }
    }

    // ---- arrays ----

    pub(super) fn prefix_items(&mut self, subs: &[NodeId], instance: &Value, out: &mut Outcome) {
        let Value::Array(items) = instance else { return };
        for (i, (sub, item)) in subs.iter().zip(items).enumerate() {
            self.keyword_path.push(i.to_string());
            let child = self.descend(*sub, item, i.to_string());
            self.keyword_path.pop();
            out.items.insert(i);
            out.absorb_nested(child);
        }
    }

    pub(super) fn items(&mut self, sub: NodeId, skip: usize, instance: &Value, out: &mut Outcome) {
        let Value::Array(items) = instance else { return };
        for (i, item) in items.iter().enumerate().skip(skip) {
            let child = self.descend(sub, item, i.to_string());
            out.items.insert(i);
            out.absorb_nested(child);
        }
    }

    pub(super) fn contains(
        &mut self,
        node: NodeId,
        sub: NodeId,
        min: u64,
        max: Option<u64>,
        instance: &Value,
        out: &mut Outcome,
    ) {
        let Value::Array(items) = instance else { return };
        let mut matched = 0u64;
        for (i, item) in items.iter().enumerate() {
            let child = self.descend(sub, item, i.to_string());
            if child.valid {
                matched += 1;
                out.items.insert(i);
                out.absorb_nested(child);
            }
        }
        let message = if matched < min {
            Some(format!("{matched} items match, at least {min} required"))
        } else {
            max.filter(|max| matched > *max)
                .map(|max| format!("{matched} items match, at most {max} allowed"))
        };
        if let Some(message) = message {
            let unit = self.failure(node, "contains", message);
            out.fail(unit);
        }
    }

    // ---- objects ----

    pub(super) fn properties(
        &mut self,
        props: &IndexMap<String, NodeId>,
        instance: &Value,
        out: &mut Outcome,
    ) {
        let Value::Object(map) = instance else { return };
        for (name, sub) in props {
            let Some(value) = map.get(name) else { continue };
            self.keyword_path.push(name.as_str());
            let child = self.descend(*sub, value, name.as_str());
            self.keyword_path.pop();
            out.properties.insert(name.clone());
            out.absorb_nested(child);
        }
    }

    pub(super) fn pattern_properties(
        &mut self,
        patterns: &[(Pattern, NodeId)],
        instance: &Value,
        out: &mut Outcome,
    ) {
        let Value::Object(map) = instance else { return };
        for (pattern, sub) in patterns {
            for (name, value) in map {
                if !pattern.is_match(name) {
                    continue;
                }
                self.keyword_path.push(pattern.as_str());
                let child = self.descend(*sub, value, name.as_str());
                self.keyword_path.pop();
                out.properties.insert(name.clone());
                out.absorb_nested(child);
            }
        }
    }

    pub(super) fn additional_properties(
        &mut self,
        sub: NodeId,
        known: &HashSet<String>,
        patterns: &[Pattern],
        instance: &Value,
        out: &mut Outcome,
    ) {
        let Value::Object(map) = instance else { return };
        for (name, value) in map {
            if known.contains(name) || patterns.iter().any(|p| p.is_match(name)) {
                continue;
            }
            let child = self.descend(sub, value, name.as_str());
            out.properties.insert(name.clone());
            out.absorb_nested(child);
        }
    }

    pub(super) fn property_names(&mut self, sub: NodeId, instance: &Value, out: &mut Outcome) {
        let Value::Object(map) = instance else { return };
        for name in map.keys() {
            let key = Value::String(name.clone());
            let child = self.descend(sub, &key, name.as_str());
            out.absorb_nested(child);
        }
    }
}
