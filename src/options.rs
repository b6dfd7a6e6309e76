//! Compile-time capability set.
//!
//! Everything that would otherwise be a global registry (formats, custom keywords,
//! retrieval) is carried here, so schemas built with different options coexist.
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::format::FormatCheck;
use crate::retrieve::{NoRetriever, Retrieve};
use crate::schema::Schema;

/// Handler for a keyword outside the 2020-12 vocabularies.
pub trait CustomKeyword: Send + Sync {
    /// `Err(message)` when `instance` violates the keyword's `value`.
    fn validate(&self, value: &Value, instance: &Value) -> std::result::Result<(), String>;
}

impl<F> CustomKeyword for F
where
    F: Fn(&Value, &Value) -> std::result::Result<(), String> + Send + Sync,
{
    fn validate(&self, value: &Value, instance: &Value) -> std::result::Result<(), String> {
        self(value, instance)
    }
}

#[derive(Clone)]
pub struct Options {
    pub(crate) base_uri: String,
    pub(crate) assert_formats: bool,
    pub(crate) formats: HashMap<String, FormatCheck>,
    /// Format names asserted even when `assert_formats` is off.
    pub(crate) asserted_formats: HashSet<String>,
    pub(crate) keywords: HashMap<String, Arc<dyn CustomKeyword>>,
    pub(crate) retriever: Arc<dyn Retrieve>,
    pub(crate) resources: HashMap<String, Value>,
    pub(crate) validate_schema: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_uri: crate::uri::DEFAULT_BASE.to_string(),
            assert_formats: false,
            formats: HashMap::new(),
            asserted_formats: HashSet::new(),
            keywords: HashMap::new(),
            retriever: Arc::new(NoRetriever),
            resources: HashMap::new(),
            validate_schema: true,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    /// Assert every known `format` instead of only annotating.
    pub fn with_format_assertion(mut self, assert: bool) -> Self {
        self.assert_formats = assert;
        self
    }

    /// Custom or overriding predicate for a format name. The name is asserted.
    pub fn with_format(mut self, name: impl Into<String>, check: FormatCheck) -> Self {
        let name = name.into();
        self.asserted_formats.insert(name.clone());
        self.formats.insert(name, check);
        self
    }

    /// Assert one format name, leaving every other format an annotation.
    pub fn with_format_asserted(mut self, name: impl Into<String>) -> Self {
        self.asserted_formats.insert(name.into());
        self
    }

    pub fn with_keyword(
        mut self,
        name: impl Into<String>,
        handler: Arc<dyn CustomKeyword>,
    ) -> Self {
        self.keywords.insert(name.into(), handler);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retrieve>) -> Self {
        self.retriever = retriever;
        self
    }

    /// Make `document` resolvable under `uri` without retrieval.
    pub fn with_resource(mut self, uri: impl Into<String>, document: Value) -> Self {
        let uri = uri.into();
        let key = match url::Url::parse(&uri) {
            Ok(url) => crate::uri::strip_fragment(&url).to_string(),
            Err(_) => uri,
        };
        self.resources.insert(key, document);
        self
    }

    /// Check schemas that declare `$schema` against that metaschema first.
    pub fn should_validate_schema(mut self, validate: bool) -> Self {
        self.validate_schema = validate;
        self
    }

    pub fn compile(&self, schema: &Value) -> Result<Schema> {
        Schema::compile_with(schema, self)
    }

    pub fn compile_text(&self, document: &str) -> Result<Schema> {
        let value: Value = serde_json::from_str(document)?;
        self.compile(&value)
    }

    pub(crate) fn asserts_format(&self, name: &str) -> bool {
        self.assert_formats || self.asserted_formats.contains(name)
    }

    /// Predicate for `name`: caller-supplied first, then built-in.
    pub(crate) fn format_check(&self, name: &str) -> Option<FormatCheck> {
        self.formats.get(name).copied().or_else(|| crate::format::builtin(name))
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("base_uri", &self.base_uri)
            .field("assert_formats", &self.assert_formats)
            .field("formats", &self.formats.keys().collect::<Vec<_>>())
            .field("asserted_formats", &self.asserted_formats)
            .field("keywords", &self.keywords.keys().collect::<Vec<_>>())
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("validate_schema", &self.validate_schema)
            .finish()
    }
}
