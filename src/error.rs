//! Error taxonomy.
//!
//! Compile-time failures (shape, identifiers, references, retrieval, metaschema) abort
//! compilation entirely. `Invalid` is the ordinary outcome of validating an instance
//! that does not conform and is plain data. `NotYetImplemented` marks an engine
//! limitation and must never be confused with a schema violation.
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Failure reported by a [`crate::retrieve::Retrieve`] implementation.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("no retriever knows `{0}`")]
    Unknown(String),
    #[error("io error reading `{uri}`: {source}")]
    Io {
        uri: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{uri}` is not valid JSON: {source}")]
    Json {
        uri: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("malformed `{keyword}` at {location}: {reason}")]
    Structure {
        keyword: String,
        location: String,
        reason: String,
    },

    #[error("identifier `{uri}` is declared more than once")]
    DuplicateIdentifier { uri: String },

    #[error("cannot resolve reference `{reference}` against `{base}`")]
    UnresolvedReference { reference: String, base: String },

    #[error("failed to retrieve `{uri}`: {source}")]
    Fetch {
        uri: String,
        #[source]
        source: FetchError,
    },

    #[error("schema does not conform to its metaschema `{dialect}`:\n{errors}")]
    InvalidSchema {
        dialect: String,
        errors: ValidationError,
    },

    #[error("not yet implemented: {feature}")]
    NotYetImplemented { feature: String },

    #[error("{0}")]
    Invalid(ValidationError),
}

impl Error {
    /// True when the engine gave up on a feature rather than judging the input.
    pub fn is_engine_limitation(&self) -> bool {
        matches!(self, Error::NotYetImplemented { .. })
    }

    pub fn is_invalid_instance(&self) -> bool {
        matches!(self, Error::Invalid(_))
    }

    pub(crate) fn structure(
        keyword: impl Into<String>,
        location: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::Structure {
            keyword: keyword.into(),
            location: location.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_implemented(feature: impl Into<String>) -> Self {
        Error::NotYetImplemented { feature: feature.into() }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One failing (or annotating) keyword application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUnit {
    pub keyword: String,
    /// Path through the evaluation, `$ref`s included.
    pub keyword_location: String,
    /// URI of the keyword inside its own resource.
    pub absolute_keyword_location: String,
    pub instance_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<serde_json::Value>,
}

/// The instance did not conform. Always carries at least one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    errors: Vec<OutputUnit>,
}

impl ValidationError {
    pub(crate) fn new(errors: Vec<OutputUnit>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[OutputUnit] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<OutputUnit> {
        self.errors
    }

    /// Units for one keyword name, handy when building messages.
    pub fn by_keyword<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a OutputUnit> + 'a {
        self.errors.iter().filter(move |e| e.keyword == keyword)
    }
}

impl fmt::Display for OutputUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.instance_location.is_empty() { "(root)" } else { &self.instance_location };
        match &self.message {
            Some(message) => write!(f, "{at}: {message} [{}]", self.keyword_location),
            None => write!(f, "{at}: `{}` [{}]", self.keyword, self.keyword_location),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, unit) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {unit}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
