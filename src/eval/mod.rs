//! Recursive evaluation.
//!
//! One [`Evaluator`] per top-level call owns the dynamic scope and the instance /
//! keyword paths. Nothing here is shared, so a compiled schema can be evaluated from
//! any number of threads at once.
use std::collections::HashSet;

use serde_json::Value;

use crate::error::OutputUnit;
use crate::pointer::JsonPointer;
use crate::schema::Compiled;
use crate::schema::node::{Keyword, NodeId, NodeKind, ResourceId};

mod applicators;
pub(crate) mod assertions;
pub mod outcome;
mod unevaluated;

pub use outcome::Output;
pub(crate) use outcome::Outcome;

pub(crate) struct Evaluator<'s> {
    schema: &'s Compiled,
    /// Dynamic scope, outermost resource first.
    scope: Vec<ResourceId>,
    instance_path: JsonPointer,
    keyword_path: JsonPointer,
    collect_annotations: bool,
    /// References currently being followed, keyed by target and instance address.
    active: HashSet<(NodeId, usize)>,
}

impl<'s> Evaluator<'s> {
    pub fn new(schema: &'s Compiled, collect_annotations: bool) -> Self {
        Self {
            schema,
            scope: Vec::new(),
            instance_path: JsonPointer::root(),
            keyword_path: JsonPointer::root(),
            collect_annotations,
            active: HashSet::new(),
        }
    }

    pub fn run(mut self, instance: &Value) -> Outcome {
        self.evaluate(self.schema.root, instance)
    }

    pub(crate) fn evaluate(&mut self, node: NodeId, instance: &Value) -> Outcome {
        let schema = self.schema;
        let entry = &schema.nodes[node.0];
        let entered = entry.resource_uri.is_some() && self.enter(entry.resource);

        let mut outcome = Outcome::valid();
        match &entry.kind {
            NodeKind::Bool(true) => {}
            NodeKind::Bool(false) => {
                let message = Some("false schema allows no value".to_string());
                let unit = self.unit(node, None, message, None);
                outcome.fail(unit);
            }
            NodeKind::Keywords(keywords) => {
                for keyword in keywords {
                    self.keyword_path.push(keyword.name());
                    self.apply(node, keyword, instance, &mut outcome);
                    self.keyword_path.pop();
                }
            }
        }

        if entered {
            self.scope.pop();
        }
        outcome.settle()
    }

    /// Push `resource` unless it is already the innermost scope entry.
    fn enter(&mut self, resource: ResourceId) -> bool {
        if self.scope.last() == Some(&resource) {
            return false;
        }
        self.scope.push(resource);
        true
    }

    fn apply(&mut self, node: NodeId, keyword: &'s Keyword, instance: &Value, out: &mut Outcome) {
        match keyword {
            Keyword::Ref(id) => self.apply_ref(node, *id, false, instance, out),
            Keyword::DynamicRef(id) => self.apply_ref(node, *id, true, instance, out),

            Keyword::AllOf(subs) => self.all_of(subs, instance, out),
            Keyword::AnyOf(subs) => self.any_of(node, subs, instance, out),
            Keyword::OneOf(subs) => self.one_of(node, subs, instance, out),
            Keyword::Not(sub) => self.not(node, *sub, instance, out),
            Keyword::If { condition, then, otherwise } => {
                self.if_then_else(*condition, *then, *otherwise, instance, out)
            }
            Keyword::DependentSchemas(deps) => self.dependent_schemas(deps, instance, out),
            Keyword::PrefixItems(subs) => self.prefix_items(subs, instance, out),
            Keyword::Items { schema, skip } => self.items(*schema, *skip, instance, out),
            Keyword::Contains { schema, min, max } => {
                self.contains(node, *schema, *min, *max, instance, out)
            }
            Keyword::Properties(props) => self.properties(props, instance, out),
            Keyword::PatternProperties(patterns) => {
                self.pattern_properties(patterns, instance, out)
            }
            Keyword::AdditionalProperties { schema, known, patterns } => {
                self.additional_properties(*schema, known, patterns, instance, out)
            }
            Keyword::PropertyNames(sub) => self.property_names(*sub, instance, out),
            Keyword::UnevaluatedItems(sub) => self.unevaluated_items(*sub, instance, out),
            Keyword::UnevaluatedProperties(sub) => {
                self.unevaluated_properties(*sub, instance, out)
            }

            Keyword::Format { name, check } => {
                if let (Some(check), Value::String(s)) = (check, instance) {
                    if !check(s) {
                        let message = format!("{instance} is not a valid {name}");
                        let unit = self.failure(node, keyword.name(), message);
                        out.fail(unit);
                        return;
                    }
                }
                self.annotate(node, keyword, Value::String(name.clone()), out);
            }
            Keyword::Annotation { value, .. } => self.annotate(node, keyword, value.clone(), out),
            Keyword::ContentSchema(value) => self.annotate(node, keyword, value.clone(), out),
            Keyword::Custom { value, handler, .. } => {
                if let Err(message) = handler.validate(value, instance) {
                    let unit = self.failure(node, keyword.name(), message);
                    out.fail(unit);
                }
            }

            _ => {
                if let Err(message) = assertions::check(keyword, instance) {
                    let unit = self.failure(node, keyword.name(), message);
                    out.fail(unit);
                }
            }
        }
    }

    fn annotate(&self, node: NodeId, keyword: &Keyword, value: Value, out: &mut Outcome) {
        if self.collect_annotations {
            out.annotate(self.unit(node, Some(keyword.name()), None, Some(value)));
        }
    }

    // ---- paths ----

    /// Evaluate `node` against a child of the instance at `token`.
    fn descend(&mut self, node: NodeId, instance: &Value, token: impl Into<String>) -> Outcome {
        self.instance_path.push(token);
        let outcome = self.evaluate(node, instance);
        self.instance_path.pop();
        outcome
    }

    /// Evaluate `node` one keyword-path step further in.
    fn step(&mut self, node: NodeId, instance: &Value, token: impl Into<String>) -> Outcome {
        self.keyword_path.push(token);
        let outcome = self.evaluate(node, instance);
        self.keyword_path.pop();
        outcome
    }

    fn failure(&self, node: NodeId, keyword: &str, message: String) -> OutputUnit {
        self.unit(node, Some(keyword), Some(message), None)
    }

    pub(crate) fn unit(
        &self,
        node: NodeId,
        keyword: Option<&str>,
        message: Option<String>,
        annotation: Option<Value>,
    ) -> OutputUnit {
        let entry = &self.schema.nodes[node.0];
        let resource = &self.schema.table.resource(entry.resource).uri;
        let mut pointer = entry.schema_pointer.clone();
        if let Some(keyword) = keyword {
            pointer.push(keyword);
        }
        OutputUnit {
            keyword: keyword.unwrap_or("false").to_string(),
            keyword_location: self.keyword_path.to_string(),
            absolute_keyword_location: format!("{resource}#{pointer}"),
            instance_location: self.instance_path.to_string(),
            message,
            annotation,
        }
    }
}
