//! Dialect detection and `$vocabulary` handling for 2020-12.
use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const DIALECT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

/// Metaschemas of dialects this engine does not evaluate.
const OLDER_DIALECTS: &[(&str, &str)] = &[
    ("json-schema.org/draft/2019-09/schema", "draft 2019-09"),
    ("json-schema.org/draft-07/schema", "draft-07"),
    ("json-schema.org/draft-06/schema", "draft-06"),
    ("json-schema.org/draft-04/schema", "draft-04"),
    ("json-schema.org/draft-03/schema", "draft-03"),
];

/// Name of a known-but-unsupported dialect for a `$schema` value.
pub fn unsupported_dialect(uri: &str) -> Option<&'static str> {
    let trimmed = uri.trim_start_matches("https://").trim_start_matches("http://");
    let trimmed = trimmed.trim_end_matches('#');
    OLDER_DIALECTS.iter().find(|(needle, _)| trimmed == *needle).map(|(_, name)| *name)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vocabulary {
    Core,
    Applicator,
    Unevaluated,
    Validation,
    MetaData,
    FormatAnnotation,
    FormatAssertion,
    Content,
}

impl Vocabulary {
    pub const ALL: [Vocabulary; 8] = [
        Vocabulary::Core,
        Vocabulary::Applicator,
        Vocabulary::Unevaluated,
        Vocabulary::Validation,
        Vocabulary::MetaData,
        Vocabulary::FormatAnnotation,
        Vocabulary::FormatAssertion,
        Vocabulary::Content,
    ];

    pub fn uri(self) -> &'static str {
        match self {
            Vocabulary::Core => "https://json-schema.org/draft/2020-12/vocab/core",
            Vocabulary::Applicator => "https://json-schema.org/draft/2020-12/vocab/applicator",
            Vocabulary::Unevaluated => "https://json-schema.org/draft/2020-12/vocab/unevaluated",
            Vocabulary::Validation => "https://json-schema.org/draft/2020-12/vocab/validation",
            Vocabulary::MetaData => "https://json-schema.org/draft/2020-12/vocab/meta-data",
            Vocabulary::FormatAnnotation => {
                "https://json-schema.org/draft/2020-12/vocab/format-annotation"
            }
            Vocabulary::FormatAssertion => {
                "https://json-schema.org/draft/2020-12/vocab/format-assertion"
            }
            Vocabulary::Content => "https://json-schema.org/draft/2020-12/vocab/content",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.uri() == uri)
    }
}

/// Vocabulary owning `keyword`; `None` for keywords outside the dialect.
pub fn vocabulary_of(keyword: &str) -> Option<Vocabulary> {
    let vocabulary = match keyword {
        "$id" | "$schema" | "$ref" | "$anchor" | "$dynamicRef" | "$dynamicAnchor"
        | "$vocabulary" | "$comment" | "$defs" => Vocabulary::Core,
        "allOf" | "anyOf" | "oneOf" | "not" | "if" | "then" | "else" | "dependentSchemas"
        | "prefixItems" | "items" | "contains" | "properties" | "patternProperties"
        | "additionalProperties" | "propertyNames" => Vocabulary::Applicator,
        "unevaluatedItems" | "unevaluatedProperties" => Vocabulary::Unevaluated,
        "type" | "enum" | "const" | "multipleOf" | "maximum" | "exclusiveMaximum" | "minimum"
        | "exclusiveMinimum" | "maxLength" | "minLength" | "pattern" | "maxItems"
        | "minItems" | "uniqueItems" | "maxContains" | "minContains" | "maxProperties"
        | "minProperties" | "required" | "dependentRequired" => Vocabulary::Validation,
        "title" | "description" | "default" | "deprecated" | "readOnly" | "writeOnly"
        | "examples" => Vocabulary::MetaData,
        "format" => Vocabulary::FormatAnnotation,
        "contentEncoding" | "contentMediaType" | "contentSchema" => Vocabulary::Content,
        _ => return None,
    };
    Some(vocabulary)
}

/// Active vocabularies of one dialect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VocabularySet(BTreeSet<Vocabulary>);

impl Default for VocabularySet {
    fn default() -> Self {
        Self::standard()
    }
}

impl VocabularySet {
    /// The standard 2020-12 metaschema: everything except format assertion.
    pub fn standard() -> Self {
        Self(Vocabulary::ALL.into_iter().filter(|v| *v != Vocabulary::FormatAssertion).collect())
    }

    /// Read a metaschema's `$vocabulary` object.
    pub fn from_declaration(declared: &Map<String, Value>) -> Result<Self> {
        let mut set = BTreeSet::from([Vocabulary::Core]);
        for (uri, required) in declared {
            match (Vocabulary::from_uri(uri), required) {
                (Some(v), _) => {
                    set.insert(v);
                }
                (None, Value::Bool(true)) => {
                    return Err(Error::not_implemented(format!("required vocabulary `{uri}`")));
                }
                (None, _) => {
                    tracing::debug!(vocabulary = %uri, "ignoring optional unknown vocabulary");
                }
            }
        }
        // format-assertion subsumes the annotation behaviour
        if set.contains(&Vocabulary::FormatAssertion) {
            set.insert(Vocabulary::FormatAnnotation);
        }
        Ok(Self(set))
    }

    pub fn contains(&self, vocabulary: Vocabulary) -> bool {
        self.0.contains(&vocabulary)
    }

    /// Whether `keyword` is live under this dialect.
    pub fn allows(&self, keyword: &str) -> bool {
        vocabulary_of(keyword).is_some_and(|v| self.contains(v))
    }

    pub fn asserts_formats(&self) -> bool {
        self.contains(Vocabulary::FormatAssertion)
    }
}

// ------------------------------- Tests ------------------------------------ //
