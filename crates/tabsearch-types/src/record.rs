//! Records: typed values bound to one record schema.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::error::TypesError;
use crate::field::{FieldType, FieldValue};
use crate::schema::{FieldDescriptor, RecordSchema};

/// JSON key carrying the relevance score of a search hit.
pub const SCORE_JSON_KEY: &str = "_score";

/// JSON key carrying per-record query-key overrides (`{"field": bool}`).
pub const QUERY_KEYS_JSON_KEY: &str = "_query_keys";

/// An ordered set of typed values for one schema.
///
/// Unset fields stay unset; nothing is defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<RecordSchema>,
    values: Vec<Option<FieldValue>>,
    query_keys: HashMap<String, bool>,
    score: Option<f64>,
}

impl Record {
    pub fn new(schema: Arc<RecordSchema>) -> Self {
        let values = vec![None; schema.fields.len()];
        Self {
            schema,
            values,
            query_keys: HashMap::new(),
            score: None,
        }
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.schema
            .position(name)
            .and_then(|idx| self.values[idx].as_ref())
    }

    /// Set a field, checking it is declared and the value fits its type.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> Result<(), TypesError> {
        let value = value.into();
        let idx = self.position(name)?;
        let descriptor = &self.schema.fields[idx];
        if !value.fits(descriptor.field_type) {
            return Err(TypesError::TypeMismatch {
                field: name.to_string(),
                expected: descriptor.field_type,
                found: value.kind(),
            });
        }
        self.values[idx] = Some(value);
        Ok(())
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Result<Self, TypesError> {
        self.set(name, value)?;
        Ok(self)
    }

    /// Unset a field.
    pub fn clear(&mut self, name: &str) -> Result<Option<FieldValue>, TypesError> {
        let idx = self.position(name)?;
        Ok(self.values[idx].take())
    }

    /// Override whether a field takes part in key equality for this record.
    pub fn set_query_key(&mut self, name: &str, is_query_key: bool) -> Result<(), TypesError> {
        self.position(name)?;
        self.query_keys.insert(name.to_string(), is_query_key);
        Ok(())
    }

    /// Whether a field takes part in key equality.
    ///
    /// A per-record override wins; otherwise primary keys and fields declared
    /// as query keys do.
    pub fn is_query_key(&self, descriptor: &FieldDescriptor) -> bool {
        self.query_keys
            .get(&descriptor.name)
            .copied()
            .unwrap_or(descriptor.primary_key || descriptor.query_key)
    }

    /// Relevance score attached by a search.
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn set_score(&mut self, score: f64) {
        self.score = Some(score);
    }

    /// Fields in schema order with their values.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldDescriptor, Option<&FieldValue>)> {
        self.schema
            .fields
            .iter()
            .zip(self.values.iter().map(Option::as_ref))
    }

    /// Fields that are set, in schema order.
    pub fn populated(&self) -> impl Iterator<Item = (&FieldDescriptor, &FieldValue)> {
        self.iter().filter_map(|(d, v)| v.map(|v| (d, v)))
    }

    fn position(&self, name: &str) -> Result<usize, TypesError> {
        self.schema
            .position(name)
            .ok_or_else(|| TypesError::UnknownField {
                table: self.schema.table_name.clone(),
                field: name.to_string(),
            })
    }

    /// Build a record from a JSON object keyed by field name.
    ///
    /// `null` leaves a field unset. The score key is ignored.
    pub fn from_json(schema: Arc<RecordSchema>, json: &Value) -> Result<Self, TypesError> {
        let object = json
            .as_object()
            .ok_or_else(|| TypesError::InvalidInput("record must be a JSON object".into()))?;

        let mut record = Record::new(schema);
        for (key, value) in object {
            if key == SCORE_JSON_KEY {
                continue;
            }
            if key == QUERY_KEYS_JSON_KEY {
                record.apply_query_keys(value)?;
                continue;
            }
            if value.is_null() {
                continue;
            }
            let idx = record.position(key)?;
            let descriptor = &record.schema.fields[idx];
            let parsed = json_to_value(descriptor, value)?;
            record.values[idx] = Some(parsed);
        }
        Ok(record)
    }

    /// Render the set fields (and score, if any) as a JSON object.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (descriptor, value) in self.populated() {
            object.insert(descriptor.name.clone(), value_to_json(value));
        }
        if let Some(score) = self.score {
            object.insert(
                SCORE_JSON_KEY.to_string(),
                Number::from_f64(score).map(Value::Number).unwrap_or(Value::Null),
            );
        }
        Value::Object(object)
    }

    fn apply_query_keys(&mut self, value: &Value) -> Result<(), TypesError> {
        let overrides = value.as_object().ok_or_else(|| {
            TypesError::InvalidInput(format!("{} must be an object", QUERY_KEYS_JSON_KEY))
        })?;
        for (name, flag) in overrides {
            let flag = flag.as_bool().ok_or_else(|| {
                TypesError::InvalidInput(format!("query key flag for '{}' must be a bool", name))
            })?;
            self.set_query_key(name, flag)?;
        }
        Ok(())
    }
}

fn json_to_value(descriptor: &FieldDescriptor, value: &Value) -> Result<FieldValue, TypesError> {
    let mismatch = || TypesError::TypeMismatch {
        field: descriptor.name.clone(),
        expected: descriptor.field_type,
        found: json_kind(value),
    };

    match descriptor.field_type {
        FieldType::Int32 => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(FieldValue::Int32)
            .ok_or_else(mismatch),
        FieldType::Int64 => value.as_i64().map(FieldValue::Int64).ok_or_else(mismatch),
        FieldType::Float64 => value.as_f64().map(FieldValue::Float64).ok_or_else(mismatch),
        FieldType::Bool => value.as_bool().map(FieldValue::Bool).ok_or_else(mismatch),
        FieldType::ShortText | FieldType::LongText => value
            .as_str()
            .map(|s| FieldValue::Text(s.to_string()))
            .ok_or_else(mismatch),
        FieldType::Identifier => {
            let text = value.as_str().ok_or_else(mismatch)?;
            Uuid::parse_str(text)
                .map(FieldValue::Identifier)
                .map_err(|e| TypesError::InvalidInput(format!("{}: {}", descriptor.name, e)))
        }
        FieldType::Timestamp => {
            let text = value.as_str().ok_or_else(mismatch)?;
            DateTime::parse_from_rfc3339(text)
                .map(|ts| FieldValue::Timestamp(ts.with_timezone(&Utc)))
                .map_err(|e| TypesError::InvalidInput(format!("{}: {}", descriptor.name, e)))
        }
    }
}

fn value_to_json(value: &FieldValue) -> Value {
    match value {
        FieldValue::Int32(v) => Value::from(*v),
        FieldValue::Int64(v) => Value::from(*v),
        FieldValue::Float64(v) => Number::from_f64(*v)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        FieldValue::Bool(v) => Value::Bool(*v),
        FieldValue::Text(v) => Value::String(v.clone()),
        FieldValue::Identifier(v) => Value::String(v.hyphenated().to_string()),
        FieldValue::Timestamp(v) => Value::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
