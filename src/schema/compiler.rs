//! Compile pass: raw JSON → node arena + resource table.
//!
//! A single depth-first walk registers every `$id`, `$anchor`, `$dynamicAnchor` and
//! subschema location. Only schema-bearing keywords are descended into; `enum`,
//! `const` and unknown keywords stay opaque data. References are collected during
//! the walk and resolved afterwards, fetching remote documents on demand, until no
//! reference is left pending.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use url::Url;

use super::node::{
    Keyword, NodeId, NodeKind, Pattern, PrimitiveType, RefId, ResolvedRef, ResourceId, SchemaNode,
};
use super::table::{Lookup, ResourceTable};
use crate::equality::{hash_key, num_key};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::pointer::JsonPointer;
use crate::uri;
use crate::vocabulary::{self, VocabularySet};

/// Output of the compile pass. Immutable from here on.
#[derive(Debug)]
pub struct Compiled {
    pub nodes: Vec<SchemaNode>,
    pub table: ResourceTable,
    pub refs: Vec<ResolvedRef>,
    pub root: NodeId,
}

// ————————————————————————————————————————————————————————————————————————————
// STATE
// ————————————————————————————————————————————————————————————————————————————

struct PendingRef {
    id: RefId,
    reference: String,
    base: Url,
    dynamic: bool,
}

/// A resource enclosing the node being walked, with the document pointer of its root.
#[derive(Clone, Debug)]
struct Frame {
    resource: ResourceId,
    prefix: JsonPointer,
}

#[derive(Clone, Debug)]
struct Scope {
    base: Url,
    frames: Vec<Frame>,
    vocabularies: Arc<VocabularySet>,
}

pub struct Compiler<'o> {
    options: &'o Options,
    nodes: Vec<SchemaNode>,
    table: ResourceTable,
    pending: Vec<PendingRef>,
    refs: Vec<Option<ResolvedRef>>,
    dialects: HashMap<Url, Arc<VocabularySet>>,
    resource_vocabularies: HashMap<ResourceId, Arc<VocabularySet>>,
}

impl<'o> Compiler<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self {
            options,
            nodes: Vec::new(),
            table: ResourceTable::new(),
            pending: Vec::new(),
            refs: Vec::new(),
            dialects: HashMap::new(),
            resource_vocabularies: HashMap::new(),
        }
    }

    pub fn compile(mut self, raw: &Value) -> Result<Compiled> {
        let base = uri::parse_absolute(&self.options.base_uri)?;
        tracing::debug!(base = %base, "compiling schema");
        let root = self.compile_document(raw, base)?;
        self.resolve_pending()?;

        let refs = self
            .refs
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::UnresolvedReference {
                reference: "<pending>".to_string(),
                base: String::new(),
            })?;
        tracing::debug!(
            nodes = self.nodes.len(),
            resources = self.table.len(),
            references = refs.len(),
            "schema compiled"
        );
        Ok(Compiled { nodes: self.nodes, table: self.table, refs, root })
    }

    fn compile_document(&mut self, raw: &Value, document_uri: Url) -> Result<NodeId> {
        let scope = Scope {
            base: document_uri.clone(),
            frames: Vec::new(),
            vocabularies: Arc::new(VocabularySet::standard()),
        };
        let mut pointer = JsonPointer::root();
        self.walk(raw, &mut pointer, &scope, Some(&document_uri))
    }

    // ————————————————————————————————————————————————————————————————————————
    // WALK
    // ————————————————————————————————————————————————————————————————————————

    fn walk(
        &mut self,
        raw: &Value,
        pointer: &mut JsonPointer,
        parent: &Scope,
        document_uri: Option<&Url>,
    ) -> Result<NodeId> {
        let map = match raw {
            Value::Bool(_) => None,
            Value::Object(map) => Some(map),
            _ => {
                let reason = "must be an object or a boolean";
                return Err(Error::structure("schema", pointer.to_string(), reason));
            }
        };
        let mut scope = parent.clone();

        // ---- identity ----
        let mut resource_uri = match map.and_then(|m| m.get("$id")) {
            Some(raw_id) => {
                let id = raw_id
                    .as_str()
                    .ok_or_else(|| {
                        Error::structure("$id", pointer.to_string(), "must be a string")
                    })?;
                let resolved = uri::resolve(&scope.base, id)?;
                if resolved.fragment().is_some_and(|f| !f.is_empty()) {
                    let reason = "must not carry a fragment";
                    return Err(Error::structure("$id", pointer.to_string(), reason));
                }
                Some(uri::strip_fragment(&resolved))
            }
            None => None,
        };
        if resource_uri.is_none() {
            resource_uri = document_uri.map(uri::strip_fragment);
        }
        if let (Some(_), Some(dialect)) = (&resource_uri, map.and_then(|m| m.get("$schema"))) {
            let dialect = dialect
                .as_str()
                .ok_or_else(|| {
                    Error::structure("$schema", pointer.to_string(), "must be a string")
                })?;
            scope.vocabularies = self.dialect(dialect)?;
        }
        if let Some(uri) = &resource_uri {
            scope.base = uri.clone();
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(SchemaNode {
            kind: NodeKind::Bool(true),
            resource_uri: resource_uri.clone(),
            dynamic_anchor: None,
            resource: ResourceId(0),
            schema_pointer: JsonPointer::root(),
        });

        if let Some(uri) = resource_uri {
            let rid = self.table.register_resource(uri.clone(), id, raw.clone())?;
            if let Some(document_uri) = document_uri {
                let document_uri = uri::strip_fragment(document_uri);
                if document_uri != uri {
                    self.table.alias(document_uri, rid)?;
                }
            }
            self.resource_vocabularies.insert(rid, scope.vocabularies.clone());
            scope.frames.push(Frame { resource: rid, prefix: pointer.clone() });
        }
        let Some(frame) = scope.frames.last().cloned() else {
            let reason = "schema outside of any resource";
            return Err(Error::structure("$id", pointer.to_string(), reason));
        };
        for enclosing in &scope.frames {
            if let Some(relative) = pointer.strip_prefix(&enclosing.prefix) {
                self.table.register_location(enclosing.resource, relative, id);
            }
        }
        self.nodes[id.0].resource = frame.resource;
        self.nodes[id.0].schema_pointer = pointer.strip_prefix(&frame.prefix).unwrap_or_default();

        let kind = match map {
            None => NodeKind::Bool(matches!(raw, Value::Bool(true))),
            Some(map) => {
                self.anchors(map, id, frame.resource, pointer)?;
                NodeKind::Keywords(self.keywords(map, pointer, &scope)?)
            }
        };
        self.nodes[id.0].kind = kind;
        Ok(id)
    }

    fn anchors(
        &mut self,
        map: &Map<String, Value>,
        id: NodeId,
        resource: ResourceId,
        pointer: &JsonPointer,
    ) -> Result<()> {
        for (keyword, dynamic) in [("$anchor", false), ("$dynamicAnchor", true)] {
            let Some(raw) = map.get(keyword) else { continue };
            let name = raw
                .as_str()
                .filter(|name| is_anchor_name(name))
                .ok_or_else(|| {
                    Error::structure(keyword, pointer.to_string(), "must be a plain-name anchor")
                })?;
            self.table.register_anchor(resource, name, id, dynamic)?;
            if dynamic {
                self.nodes[id.0].dynamic_anchor = Some(name.to_string());
            }
        }
        Ok(())
    }

    fn keywords(
        &mut self,
        map: &Map<String, Value>,
        pointer: &mut JsonPointer,
        scope: &Scope,
    ) -> Result<Vec<Keyword>> {
        let mut out = Vec::with_capacity(map.len());
        for (name, value) in map {
            if !scope.vocabularies.allows(name) {
                if let Some(handler) = self.options.keywords.get(name) {
                    out.push(Keyword::Custom {
                        name: name.clone(),
                        value: value.clone(),
                        handler: handler.clone(),
                    });
                }
                continue;
            }
            pointer.push(name.as_str());
            let keyword = self.keyword(name, value, map, pointer, scope)?;
            pointer.pop();
            out.extend(keyword);
        }
        out.sort_by_key(Keyword::runs_last);
        Ok(out)
    }

    fn keyword(
        &mut self,
        name: &str,
        value: &Value,
        map: &Map<String, Value>,
        pointer: &mut JsonPointer,
        scope: &Scope,
    ) -> Result<Option<Keyword>> {
        let keyword = match name {
            // ---- core ----
            "$ref" | "$dynamicRef" => {
                let reference = expect_str(name, value, pointer)?;
                let id = RefId(self.refs.len());
                self.refs.push(None);
                let dynamic = name == "$dynamicRef";
                self.pending.push(PendingRef {
                    id,
                    reference: reference.to_string(),
                    base: scope.base.clone(),
                    dynamic,
                });
                if dynamic { Keyword::DynamicRef(id) } else { Keyword::Ref(id) }
            }
            "$defs" => {
                self.walk_map(name, value, pointer, scope)?;
                return Ok(None);
            }
            "$id" | "$schema" | "$anchor" | "$dynamicAnchor" | "$comment" | "$vocabulary" => {
                return Ok(None);
            }

            // ---- applicators ----
            "allOf" | "anyOf" | "oneOf" => {
                let subs = self.walk_array(name, value, pointer, scope)?;
                match name {
                    "allOf" => Keyword::AllOf(subs),
                    "anyOf" => Keyword::AnyOf(subs),
                    _ => Keyword::OneOf(subs),
                }
            }
            "not" => Keyword::Not(self.walk(value, pointer, scope, None)?),
            "if" => {
                let condition = self.walk(value, pointer, scope, None)?;
                let then = self.walk_sibling(map, "then", pointer, scope)?;
                let otherwise = self.walk_sibling(map, "else", pointer, scope)?;
                Keyword::If { condition, then, otherwise }
            }
            "then" | "else" => {
                // owned by `if`; without one they only need registering
                if !map.contains_key("if") {
                    self.walk(value, pointer, scope, None)?;
                }
                return Ok(None);
            }
            "dependentSchemas" => {
                let subs = self.walk_map(name, value, pointer, scope)?;
                Keyword::DependentSchemas(subs.into_iter().collect())
            }
            "prefixItems" => Keyword::PrefixItems(self.walk_array(name, value, pointer, scope)?),
            "items" => {
                let skip = map.get("prefixItems").and_then(Value::as_array).map_or(0, Vec::len);
                Keyword::Items { schema: self.walk(value, pointer, scope, None)?, skip }
            }
            "contains" => {
                let schema = self.walk(value, pointer, scope, None)?;
                let (mut min, mut max) = (1, None);
                if scope.vocabularies.allows("minContains") {
                    if let Some(raw) = map.get("minContains") {
                        min = expect_count("minContains", raw, pointer)?;
                    }
                    if let Some(raw) = map.get("maxContains") {
                        max = Some(expect_count("maxContains", raw, pointer)?);
                    }
                }
                Keyword::Contains { schema, min, max }
            }
            "properties" => Keyword::Properties(self.walk_map(name, value, pointer, scope)?),
            "patternProperties" => {
                let subs = self.walk_map(name, value, pointer, scope)?;
                let mut patterns = Vec::with_capacity(subs.len());
                for (source, id) in subs {
                    patterns.push((Pattern::compile(&source)?, id));
                }
                Keyword::PatternProperties(patterns)
            }
            "additionalProperties" => {
                let schema = self.walk(value, pointer, scope, None)?;
                let known: HashSet<String> = map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| props.keys().cloned().collect())
                    .unwrap_or_default();
                let mut patterns = Vec::new();
                if let Some(raw) = map.get("patternProperties").and_then(Value::as_object) {
                    for source in raw.keys() {
                        patterns.push(Pattern::compile(source)?);
                    }
                }
                Keyword::AdditionalProperties { schema, known, patterns }
            }
            "propertyNames" => Keyword::PropertyNames(self.walk(value, pointer, scope, None)?),

            // ---- unevaluated ----
            "unevaluatedItems" => {
                Keyword::UnevaluatedItems(self.walk(value, pointer, scope, None)?)
            }
            "unevaluatedProperties" => {
                Keyword::UnevaluatedProperties(self.walk(value, pointer, scope, None)?)
            }

            // ---- validation ----
            "type" => Keyword::Type(expect_types(value, pointer)?),
            "enum" => {
                let values = value
                    .as_array()
                    .ok_or_else(|| {
                        Error::structure(name, pointer.to_string(), "must be an array")
                    })?;
                Keyword::Enum {
                    values: values.clone(),
                    keys: values.iter().map(hash_key).collect(),
                }
            }
            "const" => Keyword::Const(value.clone()),
            "multipleOf" => {
                let n = value
                    .as_number()
                    .filter(|n| n.as_f64().is_some_and(|f| f > 0.0))
                    .ok_or_else(|| {
                        let reason = "must be a number greater than 0";
                        Error::structure(name, pointer.to_string(), reason)
                    })?;
                Keyword::MultipleOf(num_key(n))
            }
            "maximum" | "exclusiveMaximum" | "minimum" | "exclusiveMinimum" => {
                let n = value
                    .as_number()
                    .ok_or_else(|| {
                        Error::structure(name, pointer.to_string(), "must be a number")
                    })?;
                let n = num_key(n);
                match name {
                    "maximum" => Keyword::Maximum(n),
                    "exclusiveMaximum" => Keyword::ExclusiveMaximum(n),
                    "minimum" => Keyword::Minimum(n),
                    _ => Keyword::ExclusiveMinimum(n),
                }
            }
            "maxLength" => Keyword::MaxLength(expect_count(name, value, pointer)?),
            "minLength" => Keyword::MinLength(expect_count(name, value, pointer)?),
            "maxItems" => Keyword::MaxItems(expect_count(name, value, pointer)?),
            "minItems" => Keyword::MinItems(expect_count(name, value, pointer)?),
            "maxProperties" => Keyword::MaxProperties(expect_count(name, value, pointer)?),
            "minProperties" => Keyword::MinProperties(expect_count(name, value, pointer)?),
            "minContains" | "maxContains" => {
                // read by `contains`
                expect_count(name, value, pointer)?;
                return Ok(None);
            }
            "pattern" => Keyword::Pattern(Pattern::compile(expect_str(name, value, pointer)?)?),
            "uniqueItems" => match value {
                Value::Bool(true) => Keyword::UniqueItems,
                Value::Bool(false) => return Ok(None),
                _ => return Err(Error::structure(name, pointer.to_string(), "must be a boolean")),
            },
            "required" => Keyword::Required(expect_strings(name, value, pointer)?),
            "dependentRequired" => {
                let map = value
                    .as_object()
                    .ok_or_else(|| {
                        Error::structure(name, pointer.to_string(), "must be an object")
                    })?;
                let mut out = Vec::with_capacity(map.len());
                for (property, names) in map {
                    out.push((property.clone(), expect_strings(name, names, pointer)?));
                }
                Keyword::DependentRequired(out)
            }

            // ---- format & content ----
            "format" => {
                let format = expect_str(name, value, pointer)?;
                let asserting =
                    self.options.asserts_format(format) || scope.vocabularies.asserts_formats();
                let check = if asserting {
                    let check = self
                        .options
                        .format_check(format)
                        .ok_or_else(|| {
                            Error::not_implemented(format!("assertion of format `{format}`"))
                        })?;
                    Some(check)
                } else {
                    None
                };
                Keyword::Format { name: format.to_string(), check }
            }
            "contentSchema" => {
                self.walk(value, pointer, scope, None)?;
                Keyword::ContentSchema(value.clone())
            }
            _ => match annotation_keyword(name) {
                Some(keyword) => Keyword::Annotation { keyword, value: value.clone() },
                None => return Ok(None),
            },
        };
        Ok(Some(keyword))
    }

    fn walk_array(
        &mut self,
        name: &str,
        value: &Value,
        pointer: &mut JsonPointer,
        scope: &Scope,
    ) -> Result<Vec<NodeId>> {
        let items = value
            .as_array()
            .filter(|items| !items.is_empty())
            .ok_or_else(|| {
                let reason = "must be a non-empty array of schemas";
                Error::structure(name, pointer.to_string(), reason)
            })?;
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            pointer.push(i.to_string());
            out.push(self.walk(item, pointer, scope, None)?);
            pointer.pop();
        }
        Ok(out)
    }

    fn walk_map(
        &mut self,
        name: &str,
        value: &Value,
        pointer: &mut JsonPointer,
        scope: &Scope,
    ) -> Result<IndexMap<String, NodeId>> {
        let map = value
            .as_object()
            .ok_or_else(|| {
                Error::structure(name, pointer.to_string(), "must be an object of schemas")
            })?;
        let mut out = IndexMap::with_capacity(map.len());
        for (key, item) in map {
            pointer.push(key.as_str());
            out.insert(key.clone(), self.walk(item, pointer, scope, None)?);
            pointer.pop();
        }
        Ok(out)
    }

    /// Walk `map[key]` while `pointer` currently sits on a sibling keyword.
    fn walk_sibling(
        &mut self,
        map: &Map<String, Value>,
        key: &str,
        pointer: &mut JsonPointer,
        scope: &Scope,
    ) -> Result<Option<NodeId>> {
        let Some(value) = map.get(key) else { return Ok(None) };
        let Some(current) = pointer.tokens().last().cloned() else { return Ok(None) };
        pointer.pop();
        pointer.push(key);
        let walked = self.walk(value, pointer, scope, None);
        pointer.pop();
        pointer.push(current);
        walked.map(Some)
    }

    // ————————————————————————————————————————————————————————————————————————
    // REFERENCES
    // ————————————————————————————————————————————————————————————————————————

    fn resolve_pending(&mut self) -> Result<()> {
        while let Some(pending) = self.pending.pop() {
            let target_uri = uri::resolve(&pending.base, &pending.reference)?;
            let target = self.locate(&target_uri, &pending)?;
            let dynamic_anchor = if pending.dynamic {
                // only a bookended target takes part in dynamic resolution
                let (_, fragment) = uri::split_fragment(&target_uri);
                let declared = self.nodes[target.0].dynamic_anchor.as_deref();
                fragment.filter(|name| !name.starts_with('/') && declared == Some(name.as_str()))
            } else {
                None
            };
            tracing::trace!(
                reference = %pending.reference,
                target = %target_uri,
                node = target.0,
                "resolved reference"
            );
            self.refs[pending.id.0] = Some(ResolvedRef { uri: target_uri, target, dynamic_anchor });
        }
        Ok(())
    }

    fn locate(&mut self, target_uri: &Url, pending: &PendingRef) -> Result<NodeId> {
        let unresolved = || Error::UnresolvedReference {
            reference: pending.reference.clone(),
            base: pending.base.to_string(),
        };
        let (resource_uri, fragment) = uri::split_fragment(target_uri);
        let resource = match self.table.resource_id(&resource_uri) {
            Some(resource) => resource,
            None => {
                let document = self.fetch(&resource_uri)?;
                self.compile_document(&document, resource_uri.clone())?;
                self.table.resource_id(&resource_uri).ok_or_else(unresolved)?
            }
        };
        match self.table.lookup_in(resource, fragment.as_deref()) {
            Lookup::Found(node) => Ok(node),
            Lookup::Uncompiled { resource, pointer } => {
                self.compile_at(resource, pointer).ok_or_else(unresolved)?
            }
            Lookup::UnknownResource | Lookup::UnknownFragment => Err(unresolved()),
        }
    }

    /// A pointer into a location the walk never reached (e.g. inside an unknown
    /// keyword): compile that value on demand, inside its resource.
    fn compile_at(&mut self, resource: ResourceId, pointer: JsonPointer) -> Option<Result<NodeId>> {
        let entry = self.table.resource(resource);
        let raw = entry.raw.pointer(&pointer.to_string())?.clone();
        if !raw.is_object() && !raw.is_boolean() {
            return None;
        }
        let scope = Scope {
            base: entry.uri.clone(),
            frames: vec![Frame { resource, prefix: JsonPointer::root() }],
            vocabularies: self
                .resource_vocabularies
                .get(&resource)
                .cloned()
                .unwrap_or_else(|| Arc::new(VocabularySet::standard())),
        };
        tracing::debug!(
            resource = %entry.uri,
            pointer = %pointer,
            "compiling referenced non-schema location"
        );
        let mut pointer = pointer;
        Some(self.walk(&raw, &mut pointer, &scope, None))
    }

    fn fetch(&self, uri: &Url) -> Result<Value> {
        if let Some(document) = crate::retrieve::builtin(uri) {
            return Ok(document.clone());
        }
        if let Some(document) = self.options.resources.get(uri.as_str()) {
            return Ok(document.clone());
        }
        tracing::debug!(uri = %uri, "retrieving remote resource");
        self.options.retriever.retrieve(uri).map_err(|source| {
            tracing::warn!(uri = %uri, error = %source, "remote retrieval failed");
            Error::Fetch { uri: uri.to_string(), source }
        })
    }

    // ————————————————————————————————————————————————————————————————————————
    // DIALECT
    // ————————————————————————————————————————————————————————————————————————

    fn dialect(&mut self, declared: &str) -> Result<Arc<VocabularySet>> {
        if let Some(name) = vocabulary::unsupported_dialect(declared) {
            return Err(Error::not_implemented(format!("dialect {name}")));
        }
        let url = Url::parse(declared)
            .map_err(|_| Error::structure("$schema", declared, "must be an absolute URI"))?;
        let url = uri::strip_fragment(&url);
        if url.as_str() == vocabulary::DIALECT_2020_12 {
            return Ok(Arc::new(VocabularySet::standard()));
        }
        if let Some(known) = self.dialects.get(&url) {
            return Ok(known.clone());
        }
        let metaschema = self.fetch(&url)?;
        let set = match metaschema.get("$vocabulary").and_then(Value::as_object) {
            Some(declared) => VocabularySet::from_declaration(declared)?,
            None => VocabularySet::standard(),
        };
        tracing::debug!(dialect = %url, ?set, "custom dialect");
        let set = Arc::new(set);
        self.dialects.insert(url, set.clone());
        Ok(set)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SHAPE HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn expect_str<'v>(name: &str, value: &'v Value, pointer: &JsonPointer) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| Error::structure(name, pointer.to_string(), "must be a string"))
}

/// Non-negative integer; integral floats such as `2.0` count.
fn expect_count(name: &str, value: &Value, pointer: &JsonPointer) -> Result<u64> {
    let count = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        _ => None,
    };
    count.ok_or_else(|| {
        Error::structure(name, pointer.to_string(), "must be a non-negative integer")
    })
}

fn expect_strings(name: &str, value: &Value, pointer: &JsonPointer) -> Result<Vec<String>> {
    value
        .as_array()
        .and_then(|items| {
            items.iter().map(|v| v.as_str().map(str::to_string)).collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| Error::structure(name, pointer.to_string(), "must be an array of strings"))
}

fn expect_types(value: &Value, pointer: &JsonPointer) -> Result<Vec<PrimitiveType>> {
    let bad = || {
        let reason = "must be a type name or an array of type names";
        Error::structure("type", pointer.to_string(), reason)
    };
    match value {
        Value::String(name) => Ok(vec![PrimitiveType::from_name(name).ok_or_else(bad)?]),
        Value::Array(names) => names
            .iter()
            .map(|name| name.as_str().and_then(PrimitiveType::from_name).ok_or_else(bad))
            .collect(),
        _ => Err(bad()),
    }
}

fn annotation_keyword(name: &str) -> Option<&'static str> {
    Some(match name {
        "title" => "title",
        "description" => "description",
        "default" => "default",
        "deprecated" => "deprecated",
        "readOnly" => "readOnly",
        "writeOnly" => "writeOnly",
        "examples" => "examples",
        "contentEncoding" => "contentEncoding",
        "contentMediaType" => "contentMediaType",
        _ => return None,
    })
}

fn is_anchor_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(raw: Value) -> Result<Compiled> {
        let options = Options::new();
        Compiler::new(&options).compile(&raw)
    }

    fn find(compiled: &Compiled, uri: &str) -> Option<NodeId> {
        match compiled.table.lookup(&Url::parse(uri).unwrap()) {
            Lookup::Found(node) => Some(node),
            _ => None,
        }
    }

    #[test]
    fn ids_anchors_and_locations_register() {
        let compiled = compile(json!({
            "$id": "http://example.com/root.json",
            "$defs": {
                "A": {"$anchor": "foo"},
                "B": {
                    "$id": "other.json",
                    "$defs": {
                        "X": {"$anchor": "bar"},
                        "Y": {"$id": "t/inner.json", "$anchor": "bar"}
                    }
                }
            }
        }))
        .unwrap();
        let a = find(&compiled, "http://example.com/root.json#foo").unwrap();
        assert_eq!(find(&compiled, "http://example.com/root.json#/$defs/A"), Some(a));
        let x = find(&compiled, "http://example.com/other.json#bar").unwrap();
        assert_eq!(find(&compiled, "http://example.com/other.json#/$defs/X"), Some(x));
        assert_eq!(find(&compiled, "http://example.com/root.json#/$defs/B/$defs/X"), Some(x));
        let y = find(&compiled, "http://example.com/t/inner.json#bar").unwrap();
        assert_ne!(x, y);
        let inner = compiled.nodes[y.0].resource;
        assert_eq!(compiled.table.resource(inner).uri.as_str(), "http://example.com/t/inner.json");
        assert_eq!(compiled.nodes[x.0].schema_pointer.to_string(), "/$defs/X");
    }

    #[test]
    fn enum_and_const_are_opaque() {
        let compiled = compile(json!({
            "$defs": {
                "anchor_in_enum": {"enum": [{"$anchor": "my_anchor", "type": "null"}]},
                "const_not_id": {"const": {"$id": "http://example.com/not-a-resource"}},
                "unknown": {"x-keyword": {"$anchor": "hidden"}}
            }
        }))
        .unwrap();
        assert_eq!(find(&compiled, "json-schema:///#my_anchor"), None);
        assert_eq!(find(&compiled, "json-schema:///#hidden"), None);
        assert_eq!(find(&compiled, "http://example.com/not-a-resource"), None);
    }

    #[test]
    fn refs_resolve_at_compile_time() {
        let compiled = compile(json!({
            "$ref": "#/$defs/bool",
            "$defs": {"bool": false}
        }))
        .unwrap();
        assert_eq!(compiled.refs.len(), 1);
        let target = compiled.refs[0].target;
        assert!(matches!(compiled.nodes[target.0].kind, NodeKind::Bool(false)));
    }

    #[test]
    fn unresolvable_ref_fails_compilation() {
        let err = compile(json!({"$ref": "#/$defs/missing"})).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { .. }));
        let err = compile(json!({"$ref": "http://example.com/nowhere.json"})).unwrap_err();
        assert!(matches!(err, Error::Fetch { .. }));
    }

    #[test]
    fn ref_into_unknown_keyword_compiles_on_demand() {
        let compiled = compile(json!({
            "properties": {"foo": {"x-unknown": {"type": "integer"}}},
            "$ref": "#/properties/foo/x-unknown"
        }))
        .unwrap();
        let target = compiled.refs[0].target;
        assert!(matches!(&compiled.nodes[target.0].kind, NodeKind::Keywords(k) if k.len() == 1));
    }

    #[test]
    fn malformed_shapes_are_structure_errors() {
        for raw in [
            json!({"properties": []}),
            json!({"allOf": []}),
            json!({"type": "text"}),
            json!({"minLength": -1}),
            json!({"required": [1]}),
            json!({"$id": "http://x/y#frag"}),
            json!({"$anchor": "1bad"}),
            json!({"items": 3}),
        ] {
            assert!(matches!(compile(raw.clone()), Err(Error::Structure { .. })), "{raw}");
        }
        assert!(compile(json!({"minLength": 2.0})).is_ok());
    }

    #[test]
    fn duplicate_identifiers_collide() {
        let err = compile(json!({
            "$defs": {
                "a": {"$id": "http://example.com/dup.json"},
                "b": {"$id": "http://example.com/dup.json"}
            }
        }))
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier { .. }));
        let err =
            compile(json!({"$defs": {"a": {"$anchor": "x"}, "b": {"$anchor": "x"}}})).unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier { .. }));
    }

    #[test]
    fn unevaluated_keywords_sort_last() {
        let compiled = compile(json!({
            "unevaluatedProperties": false,
            "properties": {"a": true},
            "allOf": [{"properties": {"b": true}}]
        }))
        .unwrap();
        let NodeKind::Keywords(keywords) = &compiled.nodes[compiled.root.0].kind else {
            panic!("root")
        };
        assert_eq!(keywords.last().map(Keyword::name), Some("unevaluatedProperties"));
    }

    #[test]
    fn dynamic_ref_is_dynamic_only_when_bookended() {
        let compiled = compile(json!({
            "$dynamicAnchor": "meta",
            "$defs": {
                "a": {"$dynamicRef": "#meta"},
                "b": {"$dynamicRef": "#/$defs/a"},
                "c": {"$anchor": "plain"},
                "d": {"$dynamicRef": "#plain"}
            }
        }))
        .unwrap();
        let anchors: Vec<Option<&str>> =
            compiled.refs.iter().map(|r| r.dynamic_anchor.as_deref()).collect();
        assert_eq!(anchors.iter().filter(|a| **a == Some("meta")).count(), 1);
        assert_eq!(anchors.iter().filter(|a| a.is_none()).count(), 2);
    }

    #[test]
    fn older_dialects_are_limitations() {
        let err =
            compile(json!({"$schema": "http://json-schema.org/draft-07/schema#"})).unwrap_err();
        assert!(err.is_engine_limitation());
    }
}
