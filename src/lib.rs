//! JSON Schema 2020-12 validation.
//!
//! ```no_run
//! use serde_json::json;
//!
//! let schema = json_conform::from_value(&json!({"type": "integer"})).unwrap();
//! assert!(schema.is_valid(&json!(1)));
//! assert!(schema.validate(&json!(1.5)).is_err());
//! ```
//!
//! A schema is compiled once into an arena of nodes plus a resource table; every
//! reference is resolved (fetching remote documents through [`Retrieve`]) before the
//! first instance is seen. Evaluation is then a pure function of schema, instance
//! and dynamic scope.
pub mod equality;
pub mod error;
pub mod eval;
pub mod format;
pub mod options;
pub mod pointer;
pub mod retrieve;
pub mod schema;
pub mod uri;
pub mod vocabulary;

pub use error::{Error, FetchError, OutputUnit, Result, ValidationError};
pub use eval::Output;
pub use options::{CustomKeyword, Options};
pub use retrieve::{ChainRetriever, DirectoryRetriever, InMemoryRetriever, NoRetriever, Retrieve};
pub use schema::Schema;

/// Parse and compile a schema document with default options.
pub fn from_text(document: &str) -> Result<Schema> {
    Schema::from_text(document)
}

/// Compile an already parsed schema with default options.
pub fn from_value(schema: &serde_json::Value) -> Result<Schema> {
    Schema::new(schema)
}

/// One-shot check; compile failures count as not valid.
pub fn is_valid(schema: &serde_json::Value, instance: &serde_json::Value) -> bool {
    Schema::new(schema).is_ok_and(|s| s.is_valid(instance))
}
