//! The schema oracle collaborator: a source of column types
//! for predicates not defined in the current program.

use std::collections::BTreeMap;

use crate::lattice::Type;

/// Queried by the merger for any predicate the current program doesn't
/// define itself (built-ins like `+`, or tables defined elsewhere).
pub trait SchemaOracle {
    /// Returns the field-name-to-type mapping for `predicate_name`, or
    /// `None` if the oracle has no knowledge of it.
    fn columns(&self, predicate_name: &str) -> Option<BTreeMap<String, Type>>;
}

/// An in-memory oracle backed by a fixed map, for tests.
#[derive(Debug, Default, Clone)]
pub struct MapSchemaOracle {
    predicates: BTreeMap<String, BTreeMap<String, Type>>,
}

impl MapSchemaOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_predicate(
        mut self,
        predicate_name: impl Into<String>,
        columns: BTreeMap<String, Type>,
    ) -> Self {
        self.predicates.insert(predicate_name.into(), columns);
        self
    }
}

impl SchemaOracle for MapSchemaOracle {
    fn columns(&self, predicate_name: &str) -> Option<BTreeMap<String, Type>> {
        self.predicates.get(predicate_name).cloned()
    }
}
