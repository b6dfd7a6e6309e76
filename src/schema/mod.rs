//! Compiled schema handle.
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::{Value, json};
use url::Url;

use crate::error::{Error, Result, ValidationError};
use crate::eval::{Evaluator, Output};
use crate::options::Options;
use crate::vocabulary;

mod compiler;
pub mod node;
pub mod table;

pub(crate) use compiler::Compiled;
use compiler::Compiler;

/// A compiled, immutable schema. Cheap to clone and safe to share across threads.
#[derive(Clone, Debug)]
pub struct Schema {
    inner: Arc<Compiled>,
}

static STANDARD_METASCHEMA: OnceCell<Schema> = OnceCell::new();

impl Schema {
    /// Compile with default [`Options`].
    pub fn new(schema: &Value) -> Result<Self> {
        Self::compile_with(schema, &Options::default())
    }

    pub fn from_text(document: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(document)?;
        Self::new(&value)
    }

    pub fn compile_with(schema: &Value, options: &Options) -> Result<Self> {
        if options.validate_schema {
            check_against_metaschema(schema, options)?;
        }
        let compiled = Compiler::new(options).compile(schema)?;
        Ok(Self { inner: Arc::new(compiled) })
    }

    /// `Err(Error::Invalid(..))` when the instance does not conform.
    pub fn validate(&self, instance: &Value) -> Result<()> {
        let outcome = Evaluator::new(&self.inner, false).run(instance);
        if outcome.valid {
            Ok(())
        } else {
            Err(Error::Invalid(ValidationError::new(outcome.errors)))
        }
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        Evaluator::new(&self.inner, false).run(instance).valid
    }

    /// Full result with annotations, in the flat output shape.
    pub fn validate_detailed(&self, instance: &Value) -> Output {
        Evaluator::new(&self.inner, true).run(instance).into()
    }

    pub fn root_uri(&self) -> &Url {
        let root = &self.inner.nodes[self.inner.root.0];
        &self.inner.table.resource(root.resource).uri
    }

    /// Number of resources (documents and embedded `$id`s) compiled in.
    pub fn resource_count(&self) -> usize {
        self.inner.table.len()
    }
}

fn standard_metaschema() -> Result<&'static Schema> {
    STANDARD_METASCHEMA.get_or_try_init(|| {
        tracing::debug!("compiling the 2020-12 metaschema");
        Options::new()
            .should_validate_schema(false)
            .compile(&json!({ "$ref": vocabulary::DIALECT_2020_12 }))
    })
}

/// Schema-validating-schema for documents that declare `$schema`.
fn check_against_metaschema(schema: &Value, options: &Options) -> Result<()> {
    let Some(dialect) = schema.get("$schema").and_then(Value::as_str) else {
        return Ok(());
    };
    if let Some(name) = vocabulary::unsupported_dialect(dialect) {
        return Err(Error::not_implemented(format!("dialect {name}")));
    }
    let custom;
    let metaschema = if dialect.trim_end_matches('#') == vocabulary::DIALECT_2020_12 {
        standard_metaschema()?
    } else {
        custom = options
            .clone()
            .should_validate_schema(false)
            .with_base_uri(crate::uri::DEFAULT_BASE)
            .compile(&json!({ "$ref": dialect }))?;
        &custom
    };
    tracing::debug!(dialect, "checking schema against its metaschema");
    let outcome = Evaluator::new(&metaschema.inner, false).run(schema);
    if outcome.valid {
        Ok(())
    } else {
        Err(Error::InvalidSchema {
            dialect: dialect.to_string(),
            errors: ValidationError::new(outcome.errors),
        })
    }
}

// ------------------------------- Tests ------------------------------------ //
