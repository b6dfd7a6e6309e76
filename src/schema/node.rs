// Compiled schema nodes. Nodes live in an arena owned by the compiled schema and
// refer to each other by index, so `{"$ref": "#"}` style cycles need no ownership
// cycle.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::equality::{HashKey, NumKey};
use crate::error::{Error, Result};
use crate::format::FormatCheck;
use crate::options::CustomKeyword;
use crate::pointer::JsonPointer;

// ————————————————————————————————————————————————————————————————————————————
// HANDLES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) usize);

/// Index into the compiled schema's resolved references.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RefId(pub(crate) usize);

// ————————————————————————————————————————————————————————————————————————————
// NODES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug)]
pub struct SchemaNode {
    pub kind: NodeKind,
    /// Set when this node starts a resource (own `$id`, or document root).
    pub resource_uri: Option<Url>,
    pub dynamic_anchor: Option<String>,
    /// Nearest enclosing resource (itself when `resource_uri` is set).
    pub resource: ResourceId,
    /// Location relative to the root of `resource`.
    pub schema_pointer: JsonPointer,
}

#[derive(Debug)]
pub enum NodeKind {
    Bool(bool),
    Keywords(Vec<Keyword>),
}

/// Reference target fixed during the compile pass.
#[derive(Debug, Clone)]
pub struct ResolvedRef {
    pub uri: Url,
    pub target: NodeId,
    /// Present only for a `$dynamicRef` whose lexical target declares the
    /// same `$dynamicAnchor`; otherwise the reference is purely lexical.
    pub dynamic_anchor: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrimitiveType {
    Null,
    Boolean,
    Object,
    Array,
    Number,
    String,
    Integer,
}

impl PrimitiveType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "boolean" => Self::Boolean,
            "object" => Self::Object,
            "array" => Self::Array,
            "number" => Self::Number,
            "string" => Self::String,
            "integer" => Self::Integer,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Number => "number",
            Self::String => "string",
            Self::Integer => "integer",
        }
    }
}

/// One recognised keyword. Unknown keywords never become variants.
pub enum Keyword {
    // ---- core ----
    Ref(RefId),
    DynamicRef(RefId),

    // ---- validation ----
    Type(Vec<PrimitiveType>),
    Enum { values: Vec<Value>, keys: HashSet<HashKey> },
    Const(Value),
    MultipleOf(NumKey),
    Maximum(NumKey),
    ExclusiveMaximum(NumKey),
    Minimum(NumKey),
    ExclusiveMinimum(NumKey),
    MaxLength(u64),
    MinLength(u64),
    Pattern(Pattern),
    MaxItems(u64),
    MinItems(u64),
    UniqueItems,
    MaxProperties(u64),
    MinProperties(u64),
    Required(Vec<String>),
    DependentRequired(Vec<(String, Vec<String>)>),

    // ---- applicators ----
    AllOf(Vec<NodeId>),
    AnyOf(Vec<NodeId>),
    OneOf(Vec<NodeId>),
    Not(NodeId),
    If { condition: NodeId, then: Option<NodeId>, otherwise: Option<NodeId> },
    DependentSchemas(Vec<(String, NodeId)>),
    PrefixItems(Vec<NodeId>),
    Items { schema: NodeId, skip: usize },
    Contains { schema: NodeId, min: u64, max: Option<u64> },
    Properties(IndexMap<String, NodeId>),
    PatternProperties(Vec<(Pattern, NodeId)>),
    AdditionalProperties { schema: NodeId, known: HashSet<String>, patterns: Vec<Pattern> },
    PropertyNames(NodeId),

    // ---- unevaluated (always last in a node) ----
    UnevaluatedItems(NodeId),
    UnevaluatedProperties(NodeId),

    // ---- annotations ----
    Format { name: String, check: Option<FormatCheck> },
    Annotation { keyword: &'static str, value: Value },
    ContentSchema(Value),

    Custom { name: String, value: Value, handler: Arc<dyn CustomKeyword> },
}

impl Keyword {
    pub fn name(&self) -> &str {
        match self {
            Keyword::Ref(_) => "$ref",
            Keyword::DynamicRef(_) => "$dynamicRef",
            Keyword::Type(_) => "type",
            Keyword::Enum { .. } => "enum",
            Keyword::Const(_) => "const",
            Keyword::MultipleOf(_) => "multipleOf",
            Keyword::Maximum(_) => "maximum",
            Keyword::ExclusiveMaximum(_) => "exclusiveMaximum",
            Keyword::Minimum(_) => "minimum",
            Keyword::ExclusiveMinimum(_) => "exclusiveMinimum",
            Keyword::MaxLength(_) => "maxLength",
            Keyword::MinLength(_) => "minLength",
            Keyword::Pattern(_) => "pattern",
            Keyword::MaxItems(_) => "maxItems",
            Keyword::MinItems(_) => "minItems",
            Keyword::UniqueItems => "uniqueItems",
            Keyword::MaxProperties(_) => "maxProperties",
            Keyword::MinProperties(_) => "minProperties",
            Keyword::Required(_) => "required",
            Keyword::DependentRequired(_) => "dependentRequired",
            Keyword::AllOf(_) => "allOf",
            Keyword::AnyOf(_) => "anyOf",
            Keyword::OneOf(_) => "oneOf",
            Keyword::Not(_) => "not",
            Keyword::If { .. } => "if",
            Keyword::DependentSchemas(_) => "dependentSchemas",
            Keyword::PrefixItems(_) => "prefixItems",
            Keyword::Items { .. } => "items",
            Keyword::Contains { .. } => "contains",
            Keyword::Properties(_) => "properties",
            Keyword::PatternProperties(_) => "patternProperties",
            Keyword::AdditionalProperties { .. } => "additionalProperties",
            Keyword::PropertyNames(_) => "propertyNames",
            Keyword::UnevaluatedItems(_) => "unevaluatedItems",
            Keyword::UnevaluatedProperties(_) => "unevaluatedProperties",
            Keyword::Format { .. } => "format",
            Keyword::Annotation { keyword, .. } => keyword,
            Keyword::ContentSchema(_) => "contentSchema",
            Keyword::Custom { name, .. } => name,
        }
    }

    /// Unevaluated keywords must see every sibling's annotations.
    pub(crate) fn runs_last(&self) -> bool {
        matches!(self, Keyword::UnevaluatedItems(_) | Keyword::UnevaluatedProperties(_))
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keyword({})", self.name())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PATTERNS
// ————————————————————————————————————————————————————————————————————————————

/// ECMA-262 flavoured `pattern`, translated onto the `regex` crate.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn compile(source: &str) -> Result<Self> {
        Ok(Self { source: source.to_string(), regex: translate_pattern(source)? })
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// ECMA `\d` and `\w` are ASCII-only; the regex crate's are Unicode-aware.
/// Look-around and back-references have no equivalent and are engine limitations.
pub fn translate_pattern(src: &str) -> Result<Regex> {
    for marker in ["(?=", "(?!", "(?<=", "(?<!"] {
        if src.contains(marker) {
            return Err(Error::not_implemented(format!("look-around in pattern `{src}`")));
        }
    }
    let mut out = String::with_capacity(src.len() + 8);
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('d') => out.push_str("[0-9]"),
            Some('D') => out.push_str("[^0-9]"),
            Some('w') => out.push_str("[0-9A-Za-z_]"),
            Some('W') => out.push_str("[^0-9A-Za-z_]"),
            Some('c') => match chars.peek().copied() {
                Some(l) if l.is_ascii_alphabetic() => {
                    chars.next();
                    out.push_str(&format!("\\x{{{:02X}}}", (l as u32) % 32));
                }
                _ => out.push_str("\\\\c"),
            },
            Some(d @ '1'..='9') => {
                let what = format!("back-reference \\{d} in pattern `{src}`");
                return Err(Error::not_implemented(what));
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => return Err(Error::structure("pattern", src, "trailing backslash")),
        }
    }
    Regex::new(&out).map_err(|e| Error::structure("pattern", src, e.to_string()))
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_class_is_ascii_only() {
        let p = Pattern::compile(r"^\d+$").unwrap();
        assert!(p.is_match("0123"));
        assert!(!p.is_match("߀"));
        let w = Pattern::compile(r"^\w+$").unwrap();
        assert!(!w.is_match("é"));
        let inside = Pattern::compile(r"^[\d-]+$").unwrap();
        assert!(inside.is_match("1-2"));
    }

    #[test]
    fn patterns_are_unanchored() {
        let p = Pattern::compile("a+").unwrap();
        assert!(p.is_match("xxaxx"));
        assert_eq!(p.as_str(), "a+");
    }

    #[test]
    fn unsupported_constructs_are_limitations() {
        assert!(Pattern::compile("(?=a)b").unwrap_err().is_engine_limitation());
        assert!(Pattern::compile(r"(a)\1").unwrap_err().is_engine_limitation());
        assert!(matches!(Pattern::compile("^(abc]"), Err(Error::Structure { .. })));
    }

    #[test]
    fn unicode_property_classes_work() {
        let p = Pattern::compile(r"^\p{Letter}+$").unwrap();
        assert!(p.is_match("ŷ"));
        assert!(!p.is_match("1"));
    }
}
