//! Model factories and the explicit per-database registration table.

use crate::connection::Connection;
use crate::error::{AssociationError, ModelError};
use crate::model::types::{Association, ModelDefinition, ModelMap, ModelRef, TypeRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// Produces one model definition bound to a live connection.
pub trait ModelFactory: Send + Sync {
    fn define(&self, connection: &Connection, types: &TypeRegistry) -> Result<ModelDefinition, ModelError>;

    /// Hook run once every model of the connection has loaded. None when the model has no associations.
    fn association_hook(&self) -> Option<&dyn AssociationHook> {
        None
    }
}

pub trait AssociationHook: Send + Sync {
    fn associate(
        &self,
        model: &ModelDefinition,
        siblings: &Siblings<'_>,
    ) -> Result<Vec<Association>, AssociationError>;
}

/// Read-only view of the complete model set of one connection.
pub struct Siblings<'a> {
    connection: &'a str,
    models: &'a ModelMap,
}

impl<'a> Siblings<'a> {
    pub(crate) fn new(connection: &'a str, models: &'a ModelMap) -> Self {
        Siblings { connection, models }
    }

    pub fn connection(&self) -> &str {
        self.connection
    }

    pub fn model(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    /// Reference to sibling `target` on behalf of model `from`.
    pub fn reference(&self, from: &str, target: &str) -> Result<ModelRef, AssociationError> {
        if self.models.contains_key(target) {
            Ok(ModelRef {
                connection: self.connection.to_string(),
                model: target.to_string(),
            })
        } else {
            Err(AssociationError::UnknownModel {
                connection: self.connection.to_string(),
                from: from.to_string(),
                target: target.to_string(),
            })
        }
    }

    /// An association must stay within this connection and point at a loaded model.
    pub(crate) fn check(&self, from: &str, association: &Association) -> Result<(), AssociationError> {
        if association.target.connection != self.connection {
            return Err(AssociationError::CrossConnection {
                connection: self.connection.to_string(),
                from: from.to_string(),
                target: association.target.model.clone(),
                target_connection: association.target.connection.clone(),
            });
        }
        self.reference(from, &association.target.model).map(|_| ())
    }
}

/// Code-defined model factories per database key.
#[derive(Clone, Default)]
pub struct ModelCatalog {
    by_key: HashMap<String, Vec<Arc<dyn ModelFactory>>>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        ModelCatalog {
            by_key: HashMap::new(),
        }
    }

    pub fn register(mut self, key: &str, factory: Arc<dyn ModelFactory>) -> Self {
        self.by_key.entry(key.to_string()).or_default().push(factory);
        self
    }

    pub fn factories(&self, key: &str) -> &[Arc<dyn ModelFactory>] {
        self.by_key.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
