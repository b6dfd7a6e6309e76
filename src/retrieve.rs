//! Remote resource retrieval.
//!
//! The compiler calls a [`Retrieve`] implementation whenever a `$ref` or `$schema`
//! points outside the documents it already knows. Transport is up to the caller:
//! the crate ships an in-memory fixture map and a directory mapper, and always knows
//! the 2020-12 metaschemas without I/O.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value;
use url::Url;

use crate::error::FetchError;

pub trait Retrieve: Send + Sync {
    fn retrieve(&self, uri: &Url) -> Result<Value, FetchError>;
}

/// Knows nothing; every unknown URI is unresolved.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRetriever;

impl Retrieve for NoRetriever {
    fn retrieve(&self, uri: &Url) -> Result<Value, FetchError> {
        Err(FetchError::Unknown(uri.to_string()))
    }
}

/// Fixture map from absolute URI (fragment ignored) to document.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRetriever {
    documents: HashMap<String, Value>,
}

impl InMemoryRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uri: impl Into<String>, document: Value) -> Self {
        self.insert(uri, document);
        self
    }

    pub fn insert(&mut self, uri: impl Into<String>, document: Value) {
        let uri = uri.into();
        let key = match Url::parse(&uri) {
            Ok(url) => crate::uri::strip_fragment(&url).to_string(),
            Err(_) => uri.split('#').next().unwrap_or(&uri).to_string(),
        };
        self.documents.insert(key, document);
    }
}

impl Retrieve for InMemoryRetriever {
    fn retrieve(&self, uri: &Url) -> Result<Value, FetchError> {
        let key = crate::uri::strip_fragment(uri);
        self.documents
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Unknown(uri.to_string()))
    }
}

/// Serves every URI under `prefix` from files below `root`.
///
/// `http://localhost:1234/` + `remotes/` turns `http://localhost:1234/a/b.json`
/// into `remotes/a/b.json`.
#[derive(Debug, Clone)]
pub struct DirectoryRetriever {
    prefix: String,
    root: PathBuf,
}

impl DirectoryRetriever {
    pub fn new(prefix: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self { prefix: prefix.into(), root: root.into() }
    }
}

impl Retrieve for DirectoryRetriever {
    fn retrieve(&self, uri: &Url) -> Result<Value, FetchError> {
        let uri_str = crate::uri::strip_fragment(uri).to_string();
        let Some(relative) = uri_str.strip_prefix(&self.prefix) else {
            return Err(FetchError::Unknown(uri_str));
        };
        let path = self.root.join(relative);
        tracing::debug!(uri = %uri_str, path = %path.display(), "reading remote schema from disk");
        let source = std::fs::read_to_string(&path)
            .map_err(|source| FetchError::Io { uri: uri_str.clone(), source })?;
        serde_json::from_str(&source).map_err(|source| FetchError::Json { uri: uri_str, source })
    }
}

/// Tries each retriever in order; the first success wins.
#[derive(Default, Clone)]
pub struct ChainRetriever {
    chain: Vec<Arc<dyn Retrieve>>,
}

impl ChainRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, retriever: Arc<dyn Retrieve>) -> Self {
        self.chain.push(retriever);
        self
    }
}

impl Retrieve for ChainRetriever {
    fn retrieve(&self, uri: &Url) -> Result<Value, FetchError> {
        let mut last = FetchError::Unknown(uri.to_string());
        for retriever in &self.chain {
            match retriever.retrieve(uri) {
                Ok(document) => return Ok(document),
                Err(error) => last = error,
            }
        }
        Err(last)
    }
}

// ---- built-in metaschemas ---- //

const BUILTIN_SOURCES: &[(&str, &str)] = &[
    ("https://json-schema.org/draft/2020-12/schema", include_str!("metaschemas/schema.json")),
    ("https://json-schema.org/draft/2020-12/meta/core", include_str!("metaschemas/meta/core.json")),
    (
        "https://json-schema.org/draft/2020-12/meta/applicator",
        include_str!("metaschemas/meta/applicator.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/unevaluated",
        include_str!("metaschemas/meta/unevaluated.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/validation",
        include_str!("metaschemas/meta/validation.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/meta-data",
        include_str!("metaschemas/meta/meta-data.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/format-annotation",
        include_str!("metaschemas/meta/format-annotation.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/format-assertion",
        include_str!("metaschemas/meta/format-assertion.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/content",
        include_str!("metaschemas/meta/content.json"),
    ),
];

static BUILTIN: Lazy<HashMap<&'static str, Value>> = Lazy::new(|| {
    BUILTIN_SOURCES
        .iter()
        .filter_map(|(uri, src)| serde_json::from_str(src).ok().map(|doc| (*uri, doc)))
        .collect()
});

/// Embedded metaschema document for `uri`, if any.
pub fn builtin(uri: &Url) -> Option<&'static Value> {
    let key = crate::uri::strip_fragment(uri);
    BUILTIN.get(key.as_str())
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_builtin_metaschema_parses() {
        assert_eq!(BUILTIN.len(), BUILTIN_SOURCES.len());
        let validation = "https://json-schema.org/draft/2020-12/meta/validation";
        let url = Url::parse(&format!("{validation}#/$defs/stringArray")).unwrap();
        assert_eq!(builtin(&url).and_then(|d| d.get("$id")), Some(&json!(validation)));
    }

    #[test]
    fn in_memory_ignores_fragment() {
        let retriever =
            InMemoryRetriever::new().with("http://example.com/a.json#", json!({"type": "string"}));
        let url = Url::parse("http://example.com/a.json#/type").unwrap();
        assert_eq!(retriever.retrieve(&url).unwrap(), json!({"type": "string"}));
        let missing = Url::parse("http://example.com/b.json").unwrap();
        assert!(matches!(retriever.retrieve(&missing), Err(FetchError::Unknown(_))));
    }

    #[test]
    fn directory_rejects_foreign_prefix() {
        let retriever = DirectoryRetriever::new("http://localhost:1234/", "/nonexistent");
        let foreign = Url::parse("http://example.com/x.json").unwrap();
        assert!(matches!(retriever.retrieve(&foreign), Err(FetchError::Unknown(_))));
        let local = Url::parse("http://localhost:1234/x.json").unwrap();
        assert!(matches!(retriever.retrieve(&local), Err(FetchError::Io { .. })));
    }

    #[test]
    fn chain_falls_through() {
        let chain = ChainRetriever::new()
            .push(Arc::new(NoRetriever))
            .push(Arc::new(InMemoryRetriever::new().with("urn:a", json!(true))));
        assert_eq!(chain.retrieve(&Url::parse("urn:a").unwrap()).unwrap(), json!(true));
    }
}
