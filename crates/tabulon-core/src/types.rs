//! Core types: fields, selection criteria, table schemas, store names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{QueryError, SchemaError};

/// A record's non-key field values, keyed by field name.
///
/// Every non-key field of the schema is present; absent values are stored
/// as `Value::Null`.
pub type Record = Map<String, Value>;

/// Name of the store holding the table catalog.
pub const CATALOG_STORE: &str = "catalog";

/// The primitive type tag of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Float,
    Str,
    Bool,
}

/// A named, typed column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// A comparison operator in a [`SelectionCriterion`].
///
/// The set is closed: text outside `= != < > <= >=` never parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
        }
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            ">" => Ok(Operator::Gt),
            "<=" => Ok(Operator::Le),
            ">=" => Ok(Operator::Ge),
            other => Err(QueryError::UnsupportedOperator(other.to_string())),
        }
    }
}

impl TryFrom<String> for Operator {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One predicate of a query: `field_name <operator> value`.
///
/// A list of criteria is the conjunction of its members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionCriterion {
    pub field_name: String,
    pub operator: Operator,
    pub value: Value,
}

impl SelectionCriterion {
    pub fn new(field_name: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field_name: field_name.into(),
            operator,
            value: value.into(),
        }
    }

    /// Build a criterion from operator text, rejecting anything outside the
    /// supported set with [`QueryError::UnsupportedOperator`].
    pub fn parse(
        field_name: impl Into<String>,
        operator: &str,
        value: impl Into<Value>,
    ) -> Result<Self, QueryError> {
        Ok(Self::new(field_name, operator.parse()?, value))
    }

    /// `field = value`
    pub fn eq(field_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field_name, Operator::Eq, value)
    }
}

/// Schema definition for a table.
///
/// `index_flags` runs parallel to `fields`; the key field's flag is always
/// false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub fields: Vec<Field>,
    pub key_field: String,
    pub index_flags: Vec<bool>,
}

impl TableSchema {
    /// Build and validate a schema with every index flag cleared.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<Field>,
        key_field: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let key_field = key_field.into();
        validate_name(&name)?;
        if fields.is_empty() {
            return Err(SchemaError::NoFields);
        }
        for (i, field) in fields.iter().enumerate() {
            validate_name(&field.name)?;
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }
        if !fields.iter().any(|f| f.name == key_field) {
            return Err(SchemaError::KeyFieldNotInSchema {
                table: name,
                key: key_field,
            });
        }
        let index_flags = vec![false; fields.len()];
        Ok(Self {
            name,
            fields,
            key_field,
            index_flags,
        })
    }

    /// Position of `name` in the field list.
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_position(name).is_some()
    }

    pub fn is_key(&self, name: &str) -> bool {
        self.key_field == name
    }

    pub fn is_indexed(&self, name: &str) -> bool {
        self.field_position(name)
            .is_some_and(|pos| self.index_flags.get(pos).copied().unwrap_or(false))
    }

    /// Names of all fields except the key, in schema order.
    pub fn value_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .map(|f| f.name.as_str())
            .filter(|name| *name != self.key_field)
    }

    /// Names of all indexed fields, in schema order.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .zip(&self.index_flags)
            .filter(|(_, flag)| **flag)
            .map(|(f, _)| f.name.as_str())
    }

    pub(crate) fn set_indexed(&mut self, name: &str) {
        if self.is_key(name) {
            return;
        }
        if let Some(pos) = self.field_position(name) {
            self.index_flags[pos] = true;
        }
    }
}

/// Check a table or field name is usable as a store name component.
pub fn validate_name(name: &str) -> Result<(), SchemaError> {
    let bad = name.is_empty() || name.contains(['.', '/', '\\', '\0']);
    if bad {
        return Err(SchemaError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Store name of a table's record store.
pub fn record_store_name(table: &str) -> String {
    format!("{table}.records")
}

/// Store name of the hash index on `field` of `table`.
pub fn index_store_name(table: &str, field: &str) -> String {
    format!("{table}.{field}.index")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student_fields() -> Vec<Field> {
        vec![
            Field::new("ID", FieldType::Int),
            Field::new("First", FieldType::Str),
            Field::new("Last", FieldType::Str),
            Field::new("Birthday", FieldType::Str),
        ]
    }

    #[test]
    fn test_operator_parse() {
        for op in ["=", "!=", "<", ">", "<=", ">="] {
            let parsed: Operator = op.parse().unwrap();
            assert_eq!(parsed.as_str(), op);
        }
        for bad in ["==", "<>", "", "LIKE", "= 1 or True"] {
            assert!(matches!(
                bad.parse::<Operator>(),
                Err(QueryError::UnsupportedOperator(_))
            ));
        }
    }

    #[test]
    fn test_criterion_serde() {
        let c = SelectionCriterion::parse("Birthday", ">=", "01/01/2000").unwrap();
        let text = serde_json::to_string(&c).unwrap();
        assert!(text.contains("\">=\""));
        let back: SelectionCriterion = serde_json::from_str(&text).unwrap();
        assert_eq!(back, c);

        let bad = json!({"field_name": "ID", "operator": "__import__", "value": 1});
        assert!(serde_json::from_value::<SelectionCriterion>(bad).is_err());
    }

    #[test]
    fn test_schema_new() {
        let schema = TableSchema::new("Students", student_fields(), "ID").unwrap();
        assert_eq!(schema.index_flags, vec![false; 4]);
        assert_eq!(
            schema.value_fields().collect::<Vec<_>>(),
            vec!["First", "Last", "Birthday"]
        );
        assert_eq!(schema.indexed_fields().count(), 0);
    }

    #[test]
    fn test_schema_rejects_bad_definitions() {
        assert!(matches!(
            TableSchema::new("Students", student_fields(), "Nope"),
            Err(SchemaError::KeyFieldNotInSchema { .. })
        ));
        assert!(matches!(
            TableSchema::new("Students", vec![], "ID"),
            Err(SchemaError::NoFields)
        ));
        let dup = vec![Field::new("ID", FieldType::Int), Field::new("ID", FieldType::Str)];
        assert!(matches!(
            TableSchema::new("Students", dup, "ID"),
            Err(SchemaError::DuplicateField(_))
        ));
        assert!(matches!(
            TableSchema::new("a/b", student_fields(), "ID"),
            Err(SchemaError::InvalidName(_))
        ));
    }

    #[test]
    fn test_set_indexed_never_flags_key() {
        let mut schema = TableSchema::new("Students", student_fields(), "ID").unwrap();
        schema.set_indexed("ID");
        schema.set_indexed("Birthday");
        assert!(!schema.is_indexed("ID"));
        assert!(schema.is_indexed("Birthday"));
        assert_eq!(schema.indexed_fields().collect::<Vec<_>>(), vec!["Birthday"]);
    }

    #[test]
    fn test_field_type_serde() {
        let f = Field::new("ID", FieldType::Int);
        assert_eq!(serde_json::to_value(&f).unwrap(), json!({"name": "ID", "type": "int"}));
    }
}
