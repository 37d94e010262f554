//! Selection criterion evaluation.
//!
//! Criteria are evaluated against a row: the record's stored non-key values
//! plus the primary key. A null value fails every operator. A field that the
//! schema declares but the stored row lacks is a schema fault, reported
//! separately from null.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use crate::error::SchemaError;
use crate::types::{Operator, Record, SelectionCriterion};

/// A stored row as seen by the evaluator.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    pub table: &'a str,
    pub key_field: &'a str,
    pub key: &'a Value,
    pub record: &'a Record,
}

impl<'a> RowView<'a> {
    /// Resolve a field's stored value.
    ///
    /// Fails with [`SchemaError::RowMissingField`] when the row has no slot
    /// for a non-key field.
    pub fn value(&self, field: &str) -> Result<&'a Value, SchemaError> {
        if field == self.key_field {
            return Ok(self.key);
        }
        self.record
            .get(field)
            .ok_or_else(|| SchemaError::RowMissingField {
                table: self.table.to_string(),
                field: field.to_string(),
                key: self.key.to_string(),
            })
    }
}

/// Evaluate the conjunction of `criteria` against `row`. Short-circuits on
/// the first false criterion.
pub fn matches_all(criteria: &[&SelectionCriterion], row: &RowView<'_>) -> Result<bool, SchemaError> {
    for criterion in criteria {
        let stored = row.value(&criterion.field_name)?;
        if !matches_value(criterion.operator, stored, &criterion.value) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Apply `op` to a stored value and a literal. Null never matches.
pub fn matches_value(op: Operator, stored: &Value, literal: &Value) -> bool {
    if stored.is_null() {
        return false;
    }
    let ord = compare_values(stored, literal);
    match op {
        Operator::Eq => ord == Some(Ordering::Equal),
        Operator::Ne => ord != Some(Ordering::Equal),
        Operator::Lt => ord == Some(Ordering::Less),
        Operator::Gt => ord == Some(Ordering::Greater),
        Operator::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        Operator::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
    }
}

/// Compare two JSON values, returning an ordering if the types are comparable.
///
/// - Numbers: exact, including integers against floats beyond 2^53
/// - Strings: compared lexicographically
/// - Booleans: false < true
/// - Null == Null
/// - Mismatched types, arrays and objects: `None`
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn compare_numbers(a: &Number, b: &Number) -> Option<Ordering> {
    match (as_integer(a), as_integer(b)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        (Some(x), None) => compare_int_float(x, b.as_f64()?),
        (None, Some(y)) => compare_int_float(y, a.as_f64()?).map(Ordering::reverse),
        (None, None) => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

fn as_integer(n: &Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

/// Exact ordering of an integer against a float, without rounding the
/// integer through `f64`.
fn compare_int_float(int: i128, float: f64) -> Option<Ordering> {
    const I128_LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
    if float.is_nan() {
        return None;
    }
    if float >= I128_LIMIT {
        return Some(Ordering::Less);
    }
    if float < -I128_LIMIT {
        return Some(Ordering::Greater);
    }
    let whole = float.trunc();
    match int.cmp(&(whole as i128)) {
        Ordering::Equal => 0.0f64.partial_cmp(&(float - whole)),
        ord => Some(ord),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> Record {
        let Value::Object(map) = json!({
            "First": "John",
            "Last": "Doe",
            "Birthday": "23/11/2000",
            "Age": 30,
            "Score": 95.5,
            "Nickname": null,
        }) else {
            unreachable!()
        };
        map
    }

    fn eval(criterion: SelectionCriterion, record: &Record) -> Result<bool, SchemaError> {
        let key = json!(1_000_001);
        let row = RowView {
            table: "Students",
            key_field: "ID",
            key: &key,
            record,
        };
        matches_all(&[&criterion], &row)
    }

    #[test]
    fn test_eq_and_ne() {
        let rec = sample_record();
        assert!(eval(SelectionCriterion::eq("First", "John"), &rec).unwrap());
        assert!(!eval(SelectionCriterion::eq("First", "Jane"), &rec).unwrap());
        assert!(eval(SelectionCriterion::new("First", Operator::Ne, "Jane"), &rec).unwrap());
        assert!(!eval(SelectionCriterion::new("First", Operator::Ne, "John"), &rec).unwrap());
    }

    #[test]
    fn test_ordering_operators() {
        let rec = sample_record();
        assert!(eval(SelectionCriterion::new("Age", Operator::Lt, 40), &rec).unwrap());
        assert!(!eval(SelectionCriterion::new("Age", Operator::Lt, 30), &rec).unwrap());
        assert!(eval(SelectionCriterion::new("Age", Operator::Le, 30), &rec).unwrap());
        assert!(eval(SelectionCriterion::new("Age", Operator::Gt, 29.5), &rec).unwrap());
        assert!(eval(SelectionCriterion::new("Age", Operator::Ge, 30.0), &rec).unwrap());
        assert!(eval(SelectionCriterion::new("Score", Operator::Gt, 95), &rec).unwrap());
        assert!(eval(SelectionCriterion::new("Last", Operator::Lt, "Smith"), &rec).unwrap());
    }

    #[test]
    fn test_key_field_resolves_to_key() {
        let rec = sample_record();
        assert!(eval(SelectionCriterion::eq("ID", 1_000_001), &rec).unwrap());
        assert!(eval(SelectionCriterion::new("ID", Operator::Gt, 1_000_000), &rec).unwrap());
    }

    #[test]
    fn test_null_fails_every_operator() {
        let rec = sample_record();
        for op in [
            Operator::Eq,
            Operator::Ne,
            Operator::Lt,
            Operator::Gt,
            Operator::Le,
            Operator::Ge,
        ] {
            assert!(!eval(SelectionCriterion::new("Nickname", op, "x"), &rec).unwrap());
            assert!(!eval(SelectionCriterion::new("Nickname", op, Value::Null), &rec).unwrap());
        }
    }

    #[test]
    fn test_missing_slot_is_schema_fault() {
        let rec = sample_record();
        let err = eval(SelectionCriterion::eq("Email", "a@b"), &rec).unwrap_err();
        assert!(matches!(err, SchemaError::RowMissingField { ref field, .. } if field == "Email"));
    }

    #[test]
    fn test_type_mismatch() {
        let rec = sample_record();
        assert!(!eval(SelectionCriterion::eq("Age", "30"), &rec).unwrap());
        assert!(!eval(SelectionCriterion::new("Age", Operator::Lt, "99"), &rec).unwrap());
        assert!(eval(SelectionCriterion::new("Age", Operator::Ne, "30"), &rec).unwrap());
    }

    #[test]
    fn test_conjunction_short_circuits() {
        let rec = sample_record();
        let key = json!(1);
        let row = RowView {
            table: "Students",
            key_field: "ID",
            key: &key,
            record: &rec,
        };
        let first_false = SelectionCriterion::eq("First", "Nobody");
        let missing = SelectionCriterion::eq("Email", "x");
        // The missing field is never reached.
        assert!(!matches_all(&[&first_false, &missing], &row).unwrap());
        assert!(matches_all(&[], &row).unwrap());
    }

    #[test]
    fn test_compare_values_numbers() {
        assert_eq!(compare_values(&json!(1), &json!(2)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!(2.0), &json!(2)), Some(Ordering::Equal));
        assert_eq!(
            compare_values(&json!(u64::MAX), &json!(u64::MAX - 1)),
            Some(Ordering::Greater)
        );
        assert_eq!(compare_values(&json!(-1), &json!(u64::MAX)), Some(Ordering::Less));
    }

    #[test]
    fn test_compare_values_large_int_against_float() {
        // 2^53 + 1 is not representable as f64; 2^53 is.
        let big = json!(9_007_199_254_740_993_i64);
        let float = json!(9_007_199_254_740_992.0_f64);
        assert_eq!(compare_values(&big, &float), Some(Ordering::Greater));
        assert_eq!(compare_values(&float, &big), Some(Ordering::Less));
        assert_eq!(
            compare_values(&json!(9_007_199_254_740_992_i64), &float),
            Some(Ordering::Equal)
        );
        assert_eq!(
            compare_values(&json!(u64::MAX), &json!(18_446_744_073_709_551_616.0_f64)),
            Some(Ordering::Less)
        );
        assert_eq!(compare_values(&json!(3), &json!(2.5)), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!(-3), &json!(-2.5)), Some(Ordering::Less));
        assert_eq!(compare_values(&json!(2), &json!(2.5)), Some(Ordering::Less));
    }

    #[test]
    fn test_compare_values_mixed_types() {
        assert_eq!(compare_values(&json!("a"), &json!(1)), None);
        assert_eq!(compare_values(&json!([1]), &json!([1])), None);
        assert_eq!(compare_values(&json!(true), &json!(false)), Some(Ordering::Greater));
        assert_eq!(compare_values(&Value::Null, &Value::Null), Some(Ordering::Equal));
    }
}
