//! Per-node evaluation result and the public output shape.
use std::collections::HashSet;

use serde::Serialize;

use crate::error::OutputUnit;

/// Array indices some keyword applied a subschema to.
#[derive(Debug, Default, Clone)]
pub(crate) struct ItemSet {
    indices: HashSet<usize>,
}

impl ItemSet {
    pub fn insert(&mut self, index: usize) {
        self.indices.insert(index);
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn extend(&mut self, other: ItemSet) {
        self.indices.extend(other.indices);
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Outcome {
    pub valid: bool,
    /// Property names evaluated at this instance location.
    pub properties: HashSet<String>,
    pub items: ItemSet,
    pub errors: Vec<OutputUnit>,
    pub annotations: Vec<OutputUnit>,
}

impl Outcome {
    pub fn valid() -> Self {
        Self {
            valid: true,
            properties: HashSet::new(),
            items: ItemSet::default(),
            errors: Vec::new(),
            annotations: Vec::new(),
        }
    }

    pub fn fail(&mut self, unit: OutputUnit) {
        self.valid = false;
        self.errors.push(unit);
    }

    pub fn annotate(&mut self, unit: OutputUnit) {
        self.annotations.push(unit);
    }

    /// Merge a subschema applied to the *same* instance location. A valid child
    /// contributes its evaluated sets; an invalid one only its errors.
    pub fn absorb(&mut self, child: Outcome) {
        if child.valid {
            self.properties.extend(child.properties);
            self.items.extend(child.items);
            self.annotations.extend(child.annotations);
        } else {
            self.valid = false;
            self.errors.extend(child.errors);
        }
    }

    /// Merge a subschema applied to a child of the instance. Evaluated sets belong
    /// to the child location and stay behind.
    pub fn absorb_nested(&mut self, child: Outcome) {
        if child.valid {
            self.annotations.extend(child.annotations);
        } else {
            self.valid = false;
            self.errors.extend(child.errors);
        }
    }

    /// Invalid schemas keep no annotations.
    pub(crate) fn settle(mut self) -> Self {
        if !self.valid {
            self.properties.clear();
            self.items = ItemSet::default();
            self.annotations.clear();
        }
        self
    }
}

/// Flat ("basic") result of [`crate::Schema::validate_detailed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<OutputUnit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<OutputUnit>,
}

impl From<Outcome> for Output {
    fn from(outcome: Outcome) -> Self {
        Self { valid: outcome.valid, errors: outcome.errors, annotations: outcome.annotations }
    }
}
