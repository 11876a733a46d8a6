//! Bound model definitions and the per-dialect type registry.

use crate::config::Dialect;
use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column data types offered by at least one dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Integer,
    BigInt,
    Float,
    Double,
    Decimal,
    String,
    Text,
    Boolean,
    Date,
    DateTime,
    Timestamp,
    Time,
    Json,
    Jsonb,
    Blob,
    Bytea,
    Uuid,
    Array,
    Enum,
}

#[derive(Clone, Debug)]
pub struct TypeInfo {
    pub data_type: DataType,
    pub name: &'static str,
    pub needs_length: bool,
    pub description: &'static str,
}

const fn info(data_type: DataType, name: &'static str, needs_length: bool, description: &'static str) -> TypeInfo {
    TypeInfo {
        data_type,
        name,
        needs_length,
        description,
    }
}

const MYSQL_TYPES: &[TypeInfo] = &[
    info(DataType::Integer, "INTEGER", false, "Whole number"),
    info(DataType::BigInt, "BIGINT", false, "Large whole number"),
    info(DataType::Float, "FLOAT", false, "Floating point number"),
    info(DataType::Double, "DOUBLE", false, "Double precision number"),
    info(DataType::Decimal, "DECIMAL", true, "Exact decimal (e.g., 10,2 for currency)"),
    info(DataType::String, "STRING", true, "Variable length string (VARCHAR)"),
    info(DataType::Text, "TEXT", false, "Long text"),
    info(DataType::Boolean, "BOOLEAN", false, "True/False"),
    info(DataType::Date, "DATE", false, "Date only"),
    info(DataType::DateTime, "DATETIME", false, "Date and time"),
    info(DataType::Time, "TIME", false, "Time only"),
    info(DataType::Json, "JSON", false, "JSON data"),
    info(DataType::Blob, "BLOB", false, "Binary data"),
    info(DataType::Enum, "ENUM", false, "Enumeration (list of values)"),
];

const POSTGRES_TYPES: &[TypeInfo] = &[
    info(DataType::Integer, "INTEGER", false, "Whole number"),
    info(DataType::BigInt, "BIGINT", false, "Large whole number"),
    info(DataType::Float, "FLOAT", false, "Floating point number"),
    info(DataType::Double, "DOUBLE", false, "Double precision number"),
    info(DataType::Decimal, "DECIMAL", true, "Exact decimal (e.g., 10,2 for currency)"),
    info(DataType::String, "STRING", true, "Variable length string (VARCHAR)"),
    info(DataType::Text, "TEXT", false, "Long text"),
    info(DataType::Boolean, "BOOLEAN", false, "True/False"),
    info(DataType::Date, "DATE", false, "Date only"),
    info(DataType::Timestamp, "TIMESTAMP", false, "Date and time with timezone"),
    info(DataType::Time, "TIME", false, "Time only"),
    info(DataType::Jsonb, "JSONB", false, "Binary JSON data (recommended)"),
    info(DataType::Json, "JSON", false, "JSON data"),
    info(DataType::Bytea, "BYTEA", false, "Binary data"),
    info(DataType::Uuid, "UUID", false, "Universally unique identifier"),
    info(DataType::Array, "ARRAY", false, "Array of values"),
    info(DataType::Enum, "ENUM", false, "Enumeration (list of values)"),
];

/// Data types available to model factories on one connection.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    dialect: Dialect,
    types: &'static [TypeInfo],
}

impl TypeRegistry {
    pub fn for_dialect(dialect: Dialect) -> Self {
        let types = match dialect {
            Dialect::Mysql | Dialect::Mariadb => MYSQL_TYPES,
            Dialect::Postgres => POSTGRES_TYPES,
        };
        TypeRegistry { dialect, types }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn types(&self) -> &[TypeInfo] {
        self.types
    }

    pub fn get(&self, name: &str) -> Option<&TypeInfo> {
        self.types.iter().find(|t| t.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn resolve(&self, name: &str) -> Result<DataType, ModelError> {
        self.get(name)
            .map(|t| t.data_type)
            .ok_or_else(|| ModelError::UnsupportedType {
                dialect: self.dialect.as_str(),
                name: name.to_string(),
            })
    }

    pub fn needs_length(&self, name: &str) -> bool {
        self.get(name).map(|t| t.needs_length).unwrap_or(false)
    }
}

/// Length used when a type needs one and none was given.
pub fn default_length(data_type: DataType) -> Option<&'static str> {
    match data_type {
        DataType::String => Some("255"),
        DataType::Decimal => Some("10,2"),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttributeDefinition {
    pub name: String,
    pub data_type: DataType,
    pub length: Option<String>,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub allow_null: bool,
    pub unique: bool,
    pub default: Option<serde_json::Value>,
    /// Allowed values for `Enum`.
    pub values: Vec<String>,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        AttributeDefinition {
            name: name.into(),
            data_type,
            length: None,
            primary_key: false,
            auto_increment: false,
            allow_null: true,
            unique: false,
            default: None,
            values: Vec::new(),
        }
    }

    /// Auto-increment integer primary key.
    pub fn serial_id(name: impl Into<String>) -> Self {
        AttributeDefinition {
            primary_key: true,
            auto_increment: true,
            allow_null: false,
            ..Self::new(name, DataType::Integer)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    BelongsTo,
    HasOne,
    HasMany,
}

/// A model qualified by the connection that owns it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ModelRef {
    pub connection: String,
    pub model: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Association {
    pub kind: AssociationKind,
    pub target: ModelRef,
    pub foreign_key: Option<String>,
}

/// A named schema binding on one connection.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelDefinition {
    pub name: String,
    pub table_name: String,
    /// Key of the owning connection.
    pub connection: String,
    pub attributes: Vec<AttributeDefinition>,
    /// Adds `created_at` / `updated_at` on sync.
    pub timestamps: bool,
    associations: Vec<Association>,
}

impl ModelDefinition {
    pub fn new(connection: &str, name: impl Into<String>, table_name: impl Into<String>) -> Self {
        ModelDefinition {
            name: name.into(),
            table_name: table_name.into(),
            connection: connection.to_string(),
            attributes: Vec::new(),
            timestamps: true,
            associations: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: AttributeDefinition) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub(crate) fn attach(&mut self, associations: Vec<Association>) {
        self.associations.extend(associations);
    }

    pub fn primary_key(&self) -> Vec<&AttributeDefinition> {
        self.attributes.iter().filter(|a| a.primary_key).collect()
    }

    /// Check names and enum values; add an `id` primary key when none is declared.
    pub fn normalize(mut self) -> Result<Self, ModelError> {
        let invalid = |message: String| ModelError::Invalid {
            model: self.name.clone(),
            message,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("model name cannot be empty".into()));
        }
        if self.table_name.trim().is_empty() {
            return Err(invalid("table name cannot be empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for attr in &self.attributes {
            if !seen.insert(attr.name.as_str()) {
                return Err(invalid(format!("duplicate attribute '{}'", attr.name)));
            }
            if attr.data_type == DataType::Enum && attr.values.is_empty() {
                return Err(invalid(format!("enum attribute '{}' has no values", attr.name)));
            }
        }
        if self.attributes.iter().all(|a| !a.primary_key) {
            if seen.contains("id") {
                return Err(invalid("no primary key and 'id' is not one".into()));
            }
            self.attributes.insert(0, AttributeDefinition::serial_id("id"));
        }
        Ok(self)
    }
}

/// Models of one connection keyed by model name.
pub type ModelMap = HashMap<String, ModelDefinition>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_follows_dialect() {
        let pg = TypeRegistry::for_dialect(Dialect::Postgres);
        assert_eq!(pg.resolve("jsonb").unwrap(), DataType::Jsonb);
        assert!(pg.resolve("DATETIME").is_err());
        assert!(pg.needs_length("STRING"));

        let maria = TypeRegistry::for_dialect(Dialect::Mariadb);
        assert_eq!(maria.resolve("DATETIME").unwrap(), DataType::DateTime);
        assert!(matches!(
            maria.resolve("UUID"),
            Err(ModelError::UnsupportedType { dialect: "mariadb", .. })
        ));
    }

    #[test]
    fn normalize_adds_missing_primary_key() {
        let model = ModelDefinition::new("CRM_DB", "Note", "notes")
            .with_attribute(AttributeDefinition::new("body", DataType::Text))
            .normalize()
            .unwrap();
        assert_eq!(model.attributes[0].name, "id");
        assert!(model.attributes[0].primary_key);
    }

    #[test]
    fn normalize_rejects_enum_without_values() {
        let err = ModelDefinition::new("CRM_DB", "Ticket", "tickets")
            .with_attribute(AttributeDefinition::new("status", DataType::Enum))
            .normalize()
            .unwrap_err();
        assert!(matches!(err, ModelError::Invalid { .. }));
    }
}
