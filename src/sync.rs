//! Schema sync: `CREATE TABLE IF NOT EXISTS` for each bound model, per dialect.
//! Existing tables are left as they are.

use crate::config::Dialect;
use crate::model::{default_length, AttributeDefinition, DataType, ModelDefinition};
use serde_json::Value;

fn quote(dialect: Dialect, s: &str) -> String {
    match dialect {
        Dialect::Postgres => format!("\"{}\"", s.replace('"', "\"\"")),
        Dialect::Mysql | Dialect::Mariadb => format!("`{}`", s.replace('`', "``")),
    }
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn default_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".into(),
        Value::Bool(b) => if *b { "TRUE".into() } else { "FALSE".into() },
        Value::Number(n) => n.to_string(),
        Value::String(s) => literal(s),
        other => literal(&other.to_string()),
    }
}

fn column_type(dialect: Dialect, attr: &AttributeDefinition) -> String {
    let length = attr
        .length
        .as_deref()
        .or_else(|| default_length(attr.data_type));
    let pg = dialect == Dialect::Postgres;
    match attr.data_type {
        DataType::Integer if pg && attr.auto_increment => "SERIAL".into(),
        DataType::BigInt if pg && attr.auto_increment => "BIGSERIAL".into(),
        DataType::Integer => "INTEGER".into(),
        DataType::BigInt => "BIGINT".into(),
        DataType::Float if pg => "REAL".into(),
        DataType::Float => "FLOAT".into(),
        DataType::Double if pg => "DOUBLE PRECISION".into(),
        DataType::Double => "DOUBLE".into(),
        DataType::Decimal => format!("DECIMAL({})", length.unwrap_or("10,2")),
        DataType::String => format!("VARCHAR({})", length.unwrap_or("255")),
        DataType::Text => "TEXT".into(),
        DataType::Boolean if pg => "BOOLEAN".into(),
        DataType::Boolean => "TINYINT(1)".into(),
        DataType::Date => "DATE".into(),
        DataType::DateTime if pg => "TIMESTAMP".into(),
        DataType::DateTime => "DATETIME".into(),
        DataType::Timestamp if pg => "TIMESTAMPTZ".into(),
        DataType::Timestamp => "TIMESTAMP".into(),
        DataType::Time => "TIME".into(),
        DataType::Json => "JSON".into(),
        DataType::Jsonb if pg => "JSONB".into(),
        DataType::Jsonb => "JSON".into(),
        DataType::Blob | DataType::Bytea if pg => "BYTEA".into(),
        DataType::Blob | DataType::Bytea => "BLOB".into(),
        DataType::Uuid if pg => "UUID".into(),
        DataType::Uuid => "CHAR(36)".into(),
        DataType::Array if pg => "TEXT[]".into(),
        DataType::Array => "JSON".into(),
        DataType::Enum if pg => "VARCHAR(255)".into(),
        DataType::Enum => {
            let values: Vec<String> = attr.values.iter().map(|v| literal(v)).collect();
            format!("ENUM({})", values.join(", "))
        }
    }
}

fn column_def(dialect: Dialect, attr: &AttributeDefinition) -> String {
    let name = quote(dialect, &attr.name);
    let mut def = format!("{} {}", name, column_type(dialect, attr));
    if !attr.allow_null || attr.primary_key {
        def.push_str(" NOT NULL");
    }
    if attr.auto_increment && dialect != Dialect::Postgres {
        def.push_str(" AUTO_INCREMENT");
    }
    if attr.unique && !attr.primary_key {
        def.push_str(" UNIQUE");
    }
    if let Some(ref d) = attr.default {
        def.push_str(" DEFAULT ");
        def.push_str(&default_literal(d));
    }
    if attr.data_type == DataType::Enum && dialect == Dialect::Postgres {
        let values: Vec<String> = attr.values.iter().map(|v| literal(v)).collect();
        def.push_str(&format!(" CHECK ({} IN ({}))", name, values.join(", ")));
    }
    def
}

/// DDL creating the model's table if it does not exist.
pub fn create_table_sql(dialect: Dialect, model: &ModelDefinition) -> String {
    let mut col_defs: Vec<String> = model.attributes.iter().map(|a| column_def(dialect, a)).collect();

    if model.timestamps {
        let ts = match dialect {
            Dialect::Postgres => "TIMESTAMPTZ NOT NULL DEFAULT NOW()",
            Dialect::Mysql | Dialect::Mariadb => "TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP",
        };
        for name in ["created_at", "updated_at"] {
            if !model.attributes.iter().any(|a| a.name == name) {
                col_defs.push(format!("{} {}", quote(dialect, name), ts));
            }
        }
    }

    let pk_cols: Vec<String> = model.primary_key().iter().map(|a| quote(dialect, &a.name)).collect();
    if !pk_cols.is_empty() {
        col_defs.push(format!("PRIMARY KEY ({})", pk_cols.join(", ")));
    }

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quote(dialect, &model.table_name),
        col_defs.join(",\n    ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttributeDefinition;

    fn orders() -> ModelDefinition {
        let mut status = AttributeDefinition::new("status", DataType::Enum);
        status.values = vec!["open".into(), "closed".into()];
        status.default = Some(Value::String("open".into()));
        let mut email = AttributeDefinition::new("email", DataType::String);
        email.length = Some("120".into());
        email.unique = true;
        ModelDefinition::new("SHOP_DB", "Order", "orders")
            .with_attribute(AttributeDefinition::serial_id("id"))
            .with_attribute(email)
            .with_attribute(status)
    }

    #[test]
    fn postgres_table() {
        let sql = create_table_sql(Dialect::Postgres, &orders());
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"orders\""));
        assert!(sql.contains("\"id\" SERIAL NOT NULL"));
        assert!(sql.contains("\"email\" VARCHAR(120) UNIQUE"));
        assert!(sql.contains("CHECK (\"status\" IN ('open', 'closed'))"));
        assert!(sql.contains("\"created_at\" TIMESTAMPTZ NOT NULL DEFAULT NOW()"));
        assert!(sql.contains("PRIMARY KEY (\"id\")"));
    }

    #[test]
    fn mysql_table() {
        let sql = create_table_sql(Dialect::Mysql, &orders());
        assert!(sql.contains("`id` INTEGER NOT NULL AUTO_INCREMENT"));
        assert!(sql.contains("`status` ENUM('open', 'closed') DEFAULT 'open'"));
        assert!(sql.contains("`updated_at` TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP"));
    }

    #[test]
    fn timestamps_can_be_disabled() {
        let mut model = orders();
        model.timestamps = false;
        assert!(!create_table_sql(Dialect::Postgres, &model).contains("created_at"));
    }
}
