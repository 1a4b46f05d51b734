//! Record schema: ordered field descriptors plus table and storage key.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;
use crate::field::FieldType;

/// Describes one field of a record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Part of the record's primary key.
    #[serde(default)]
    pub primary_key: bool,

    /// Used for key equality even when not a primary key.
    #[serde(default)]
    pub query_key: bool,

    /// Relevance weight as declared text; unparsable values are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary_key: false,
            query_key: false,
            boost: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn query_key(mut self) -> Self {
        self.query_key = true;
        self
    }

    pub fn with_boost(mut self, boost: impl Into<String>) -> Self {
        self.boost = Some(boost.into());
        self
    }

    /// Parsed boost, if declared and parsable as a float.
    pub fn boost_value(&self) -> Option<f32> {
        self.boost
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| s.trim().parse::<f32>().ok())
    }
}

/// Schema of one record type (one table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSchema {
    /// Table name; the second level of the partition directory.
    pub table_name: String,
    /// Field whose value selects the partition's first directory level.
    pub storage_key_field: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl RecordSchema {
    pub fn new(table_name: impl Into<String>, storage_key_field: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            storage_key_field: storage_key_field.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Look up a field descriptor by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Position of a field in declaration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Ordered field names.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Check the schema is usable: non-empty names, no duplicates, and a
    /// declared storage key field.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.table_name.trim().is_empty() {
            return Err(TypesError::InvalidInput("table name is empty".into()));
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(TypesError::InvalidInput(format!(
                    "table '{}' declares a field with an empty name",
                    self.table_name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(TypesError::InvalidInput(format!(
                    "table '{}' declares field '{}' twice",
                    self.table_name, field.name
                )));
            }
        }
        if self.field(&self.storage_key_field).is_none() {
            return Err(TypesError::UnknownField {
                table: self.table_name.clone(),
                field: self.storage_key_field.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contacts() -> RecordSchema {
        RecordSchema::new("contacts", "tenant")
            .with_field(FieldDescriptor::new("tenant", FieldType::ShortText))
            .with_field(FieldDescriptor::new("id", FieldType::Int64).primary_key())
            .with_field(FieldDescriptor::new("bio", FieldType::LongText).with_boost("2.5"))
    }

    #[test]
    fn test_field_lookup() {
        let schema = contacts();
        assert_eq!(schema.field("id").unwrap().field_type, FieldType::Int64);
        assert_eq!(schema.position("bio"), Some(2));
        assert!(schema.field("missing").is_none());
        let names: Vec<&str> = schema.field_names().collect();
        assert_eq!(names, vec!["tenant", "id", "bio"]);
    }

    #[test]
    fn test_boost_parsing() {
        let schema = contacts();
        assert_eq!(schema.field("bio").unwrap().boost_value(), Some(2.5));
        assert_eq!(schema.field("id").unwrap().boost_value(), None);

        let bad = FieldDescriptor::new("x", FieldType::LongText).with_boost("heavy");
        assert_eq!(bad.boost_value(), None);
    }

    #[test]
    fn test_validate() {
        assert!(contacts().validate().is_ok());

        let missing_key = RecordSchema::new("t", "nope")
            .with_field(FieldDescriptor::new("a", FieldType::Bool));
        assert!(matches!(
            missing_key.validate(),
            Err(TypesError::UnknownField { .. })
        ));

        let duplicate = RecordSchema::new("t", "a")
            .with_field(FieldDescriptor::new("a", FieldType::Bool))
            .with_field(FieldDescriptor::new("a", FieldType::Int32));
        assert!(matches!(
            duplicate.validate(),
            Err(TypesError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_schema_from_json() {
        let json = r#"{
            "table_name": "contacts",
            "storage_key_field": "tenant",
            "fields": [
                {"name": "tenant", "type": "short_text"},
                {"name": "id", "type": "int64", "primary_key": true},
                {"name": "bio", "type": "long_text", "boost": "1.5"}
            ]
        }"#;
        let schema: RecordSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.fields.len(), 3);
        assert!(schema.field("id").unwrap().primary_key);
        assert!(!schema.field("tenant").unwrap().query_key);
        assert_eq!(schema.field("bio").unwrap().boost_value(), Some(1.5));
    }
}
