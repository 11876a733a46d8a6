//! Declarative model files (`Models/<folder>/<table>.json`).

use crate::config::validate_length;
use crate::connection::Connection;
use crate::error::{AssociationError, ModelError};
use crate::model::factory::{AssociationHook, ModelFactory, Siblings};
use crate::model::types::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_increment: bool,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub allow_null: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl AttributeSpec {
    pub fn new(name: &str, type_: &str) -> Self {
        AttributeSpec {
            name: name.to_string(),
            type_: type_.to_string(),
            length: None,
            primary_key: false,
            auto_increment: false,
            allow_null: true,
            unique: false,
            default: None,
            values: Vec::new(),
        }
    }

    fn bind(&self, types: &TypeRegistry) -> Result<AttributeDefinition, ModelError> {
        let data_type = types.resolve(&self.type_)?;
        Ok(AttributeDefinition {
            name: self.name.clone(),
            data_type,
            length: self.length.clone(),
            primary_key: self.primary_key,
            auto_increment: self.auto_increment,
            allow_null: self.allow_null && !self.primary_key,
            unique: self.unique,
            default: self.default.clone(),
            values: self.values.clone(),
        })
    }
}

/// Parses `name:TYPE[(length)][:pk][:auto][:unique][:not_null]`, e.g. `email:STRING(120):unique`.
impl FromStr for AttributeSpec {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: String| ModelError::Invalid {
            model: s.to_string(),
            message,
        };
        let mut parts = s.split(':').map(str::trim);
        let name = parts.next().filter(|n| !n.is_empty()).ok_or_else(|| invalid("missing column name".into()))?;
        let raw_type = parts.next().filter(|t| !t.is_empty()).ok_or_else(|| invalid("missing column type".into()))?;
        let (type_, length) = match raw_type.split_once('(') {
            Some((t, rest)) => {
                let len = rest
                    .strip_suffix(')')
                    .ok_or_else(|| invalid(format!("unclosed length in '{}'", raw_type)))?;
                (t, Some(len.to_string()))
            }
            None => (raw_type, None),
        };
        let mut spec = AttributeSpec::new(name, &type_.to_uppercase());
        spec.length = length;
        for flag in parts {
            match flag.to_lowercase().as_str() {
                "pk" | "primary_key" => {
                    spec.primary_key = true;
                    spec.allow_null = false;
                }
                "auto" | "auto_increment" => spec.auto_increment = true,
                "unique" => spec.unique = true,
                "not_null" => spec.allow_null = false,
                other => return Err(invalid(format!("unknown flag '{}'", other))),
            }
        }
        Ok(spec)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationSpec {
    pub kind: AssociationKind,
    /// Sibling model name on the same database.
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,
}

/// Model file contents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    pub table: String,
    #[serde(default = "default_true")]
    pub timestamps: bool,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associations: Vec<AssociationSpec>,
}

/// `user_profiles` -> `User_profiles`.
pub fn model_name_for_table(table: &str) -> String {
    let mut chars = table.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl ModelSpec {
    /// Starter model for a new database: the given attributes, or an auto-increment `id`.
    pub fn sample(table: &str, attributes: Vec<AttributeSpec>) -> Self {
        let attributes = if attributes.is_empty() {
            let mut id = AttributeSpec::new("id", "INTEGER");
            id.primary_key = true;
            id.auto_increment = true;
            id.allow_null = false;
            vec![id]
        } else {
            attributes
        };
        ModelSpec {
            name: model_name_for_table(table),
            table: table.to_string(),
            timestamps: true,
            attributes,
            associations: Vec::new(),
        }
    }

    /// Bind attributes through `types` and normalize, as loading does for `connection`.
    pub fn definition(&self, connection: &str, types: &TypeRegistry) -> Result<ModelDefinition, ModelError> {
        let mut model = ModelDefinition::new(connection, self.name.clone(), self.table.clone());
        model.timestamps = self.timestamps;
        for attr in &self.attributes {
            if let Some(length) = &attr.length {
                validate_length(length).map_err(|e| ModelError::Invalid {
                    model: self.name.clone(),
                    message: format!("attribute '{}': {}", attr.name, e),
                })?;
            }
            model = model.with_attribute(attr.bind(types)?);
        }
        model.normalize()
    }
}

/// Factory backed by a model file.
#[derive(Clone, Debug)]
pub struct DeclarativeModel {
    spec: ModelSpec,
}

impl DeclarativeModel {
    pub fn new(spec: ModelSpec) -> Self {
        DeclarativeModel { spec }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }
}

impl ModelFactory for DeclarativeModel {
    fn define(&self, connection: &Connection, types: &TypeRegistry) -> Result<ModelDefinition, ModelError> {
        self.spec.definition(connection.key(), types)
    }

    fn association_hook(&self) -> Option<&dyn AssociationHook> {
        if self.spec.associations.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl AssociationHook for DeclarativeModel {
    fn associate(
        &self,
        model: &ModelDefinition,
        siblings: &Siblings<'_>,
    ) -> Result<Vec<Association>, AssociationError> {
        self.spec
            .associations
            .iter()
            .map(|a| {
                Ok(Association {
                    kind: a.kind,
                    target: siblings.reference(&model.name, &a.target)?,
                    foreign_key: a.foreign_key.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attribute_flags() {
        let spec: AttributeSpec = "email:string(120):unique:not_null".parse().unwrap();
        assert_eq!(spec.name, "email");
        assert_eq!(spec.type_, "STRING");
        assert_eq!(spec.length.as_deref(), Some("120"));
        assert!(spec.unique);
        assert!(!spec.allow_null);

        assert!("email".parse::<AttributeSpec>().is_err());
        assert!("email:STRING:sparkly".parse::<AttributeSpec>().is_err());
        assert!("price:DECIMAL(10,2".parse::<AttributeSpec>().is_err());
    }

    #[test]
    fn sample_model_defaults_to_serial_id() {
        let spec = ModelSpec::sample("sample_table", Vec::new());
        assert_eq!(spec.name, "Sample_table");
        assert_eq!(spec.attributes.len(), 1);
        assert!(spec.attributes[0].primary_key && spec.attributes[0].auto_increment);

        let text = serde_json::to_string(&spec).unwrap();
        let back: ModelSpec = serde_json::from_str(&text).unwrap();
        assert_eq!(back, spec);
    }

    #[test]
    fn model_file_defaults() {
        let spec: ModelSpec = serde_json::from_str(
            r#"{"name": "User", "table": "users", "attributes": [{"name": "email", "type": "STRING"}]}"#,
        )
        .unwrap();
        assert!(spec.timestamps);
        assert!(spec.attributes[0].allow_null);
        assert!(spec.associations.is_empty());
    }

    #[test]
    fn definition_rejects_what_loading_rejects() {
        let types = TypeRegistry::for_dialect(crate::config::Dialect::Postgres);
        let with = |attr: &str| ModelSpec::sample("orders", vec![attr.parse().unwrap()]);

        assert!(with("status:ENUM").definition("R_DB", &types).is_err());
        assert!(with("id:INTEGER").definition("R_DB", &types).is_err());
        assert!(with("title:STRING(abc)").definition("R_DB", &types).is_err());

        let model = with("price:DECIMAL(10,2)").definition("R_DB", &types).unwrap();
        assert_eq!(model.primary_key()[0].name, "id");
    }
}
