//! Predicate evaluation and value comparison.
//!
//! One comparison rule serves filtering, equality and ordering: when
//! both operands have a numeric reading (integers, floats, booleans as
//! 0/1, numeric text) they compare numerically; otherwise their textual
//! renderings compare lexically. The fallback is a deliberate
//! compatibility rule inherited from the loosely-typed origin of the
//! grammar, pinned by tests here rather than left implicit.

use crate::error::{CoreError, CoreResult};
use flatdb_value::{Record, Value};
use std::cmp::Ordering;
use std::fmt;

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
    /// Less than or equal.
    Le,
    /// Greater than or equal.
    Ge,
    /// Case-sensitive literal substring containment. Not a glob, not a
    /// regex.
    Contains,
}

impl Op {
    /// Parses the textual operator grammar.
    ///
    /// Accepted spellings: `=`, `==`, `!=`, `<>`, `<`, `>`, `<=`, `>=`,
    /// and `LIKE` (any case) for substring containment.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownOperator`] for anything else.
    pub fn parse(op: &str) -> CoreResult<Self> {
        match op {
            "=" | "==" => Ok(Op::Eq),
            "!=" | "<>" => Ok(Op::Ne),
            "<" => Ok(Op::Lt),
            ">" => Ok(Op::Gt),
            "<=" => Ok(Op::Le),
            ">=" => Ok(Op::Ge),
            _ if op.eq_ignore_ascii_case("like") => Ok(Op::Contains),
            _ => Err(CoreError::unknown_operator(op)),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Gt => ">",
            Op::Le => "<=",
            Op::Ge => ">=",
            Op::Contains => "LIKE",
        };
        f.write_str(text)
    }
}

/// One filter condition: field, operator, comparison value.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Field name the condition reads.
    pub field: String,
    /// Comparison operator.
    pub op: Op,
    /// Value the field is compared against.
    pub value: Value,
}

impl Predicate {
    /// Creates a predicate.
    pub fn new(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Evaluates this predicate against one record.
    ///
    /// A field missing from the record is present-with-null for
    /// `=`/`!=`, and fails every ordering and containment operator.
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        let field = record.get(&self.field);
        match self.op {
            Op::Eq => compare_values(field.unwrap_or(&Value::Null), &self.value) == Ordering::Equal,
            Op::Ne => compare_values(field.unwrap_or(&Value::Null), &self.value) != Ordering::Equal,
            Op::Lt | Op::Gt | Op::Le | Op::Ge => {
                let Some(actual) = field else { return false };
                let ord = compare_values(actual, &self.value);
                match self.op {
                    Op::Lt => ord == Ordering::Less,
                    Op::Gt => ord == Ordering::Greater,
                    Op::Le => ord != Ordering::Greater,
                    Op::Ge => ord != Ordering::Less,
                    _ => unreachable!(),
                }
            }
            Op::Contains => {
                let Some(actual) = field else { return false };
                actual.render_text().contains(&self.value.render_text())
            }
        }
    }
}

/// Compares two values under the shared comparison rule.
///
/// Numeric when both operands have a numeric reading, lexical over the
/// textual rendering otherwise. NaN never occurs: `numeric_reading`
/// filters non-finite floats into the lexical branch.
#[must_use]
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.numeric_reading(), b.numeric_reading()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.render_text().cmp(&b.render_text()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::new()
            .with("name", "Alice")
            .with("score", 10)
            .with("ratio", 0.5)
            .with("active", true)
            .with("note", Value::Null)
    }

    #[test]
    fn parse_accepts_the_full_grammar() {
        assert_eq!(Op::parse("=").unwrap(), Op::Eq);
        assert_eq!(Op::parse("==").unwrap(), Op::Eq);
        assert_eq!(Op::parse("!=").unwrap(), Op::Ne);
        assert_eq!(Op::parse("<>").unwrap(), Op::Ne);
        assert_eq!(Op::parse("<").unwrap(), Op::Lt);
        assert_eq!(Op::parse(">").unwrap(), Op::Gt);
        assert_eq!(Op::parse("<=").unwrap(), Op::Le);
        assert_eq!(Op::parse(">=").unwrap(), Op::Ge);
        assert_eq!(Op::parse("LIKE").unwrap(), Op::Contains);
        assert_eq!(Op::parse("like").unwrap(), Op::Contains);
        assert!(matches!(
            Op::parse("=~"),
            Err(CoreError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn numeric_comparison_when_both_parse() {
        // 10 < 9 lexically but not numerically; both operands numeric,
        // so the numeric branch wins.
        assert!(!Predicate::new("score", Op::Lt, 9).matches(&record()));
        assert!(Predicate::new("score", Op::Lt, 11).matches(&record()));
        // Numeric text on either side still compares numerically.
        assert!(Predicate::new("score", Op::Eq, "10").matches(&record()));
        assert!(Predicate::new("score", Op::Lt, "11").matches(&record()));
    }

    #[test]
    fn lexical_fallback_when_either_side_is_not_numeric() {
        // "Alice" < "B" lexically.
        assert!(Predicate::new("name", Op::Lt, "B").matches(&record()));
        // Number against non-numeric text falls back to text rendering:
        // "10" < "2x" lexically even though 10 < 2 is false.
        assert!(Predicate::new("score", Op::Lt, "2x").matches(&record()));
    }

    #[test]
    fn booleans_read_as_zero_and_one() {
        assert!(Predicate::new("active", Op::Eq, 1).matches(&record()));
        assert!(Predicate::new("active", Op::Gt, 0).matches(&record()));
        assert!(!Predicate::new("active", Op::Eq, 0).matches(&record()));
    }

    #[test]
    fn missing_field_is_null_for_equality() {
        assert!(Predicate::new("ghost", Op::Eq, Value::Null).matches(&record()));
        assert!(!Predicate::new("ghost", Op::Ne, Value::Null).matches(&record()));
        assert!(Predicate::new("ghost", Op::Ne, 1).matches(&record()));
        // An explicit null field behaves the same as a missing one.
        assert!(Predicate::new("note", Op::Eq, Value::Null).matches(&record()));
    }

    #[test]
    fn missing_field_fails_ordering_and_containment() {
        assert!(!Predicate::new("ghost", Op::Lt, 1).matches(&record()));
        assert!(!Predicate::new("ghost", Op::Gt, Value::Null).matches(&record()));
        assert!(!Predicate::new("ghost", Op::Le, "z").matches(&record()));
        assert!(!Predicate::new("ghost", Op::Ge, "").matches(&record()));
        assert!(!Predicate::new("ghost", Op::Contains, "").matches(&record()));
    }

    #[test]
    fn contains_is_literal_and_case_sensitive() {
        assert!(Predicate::new("name", Op::Contains, "lic").matches(&record()));
        assert!(!Predicate::new("name", Op::Contains, "LIC").matches(&record()));
        assert!(!Predicate::new("name", Op::Contains, "A.*e").matches(&record()));
        // Numbers render to text before containment.
        assert!(Predicate::new("score", Op::Contains, "1").matches(&record()));
    }

    #[test]
    fn compare_values_orders_mixed_types() {
        assert_eq!(
            compare_values(&Value::Integer(2), &Value::Float(2.0)),
            Ordering::Equal
        );
        assert_eq!(
            compare_values(&Value::Text("10".into()), &Value::Integer(9)),
            Ordering::Greater
        );
        // Non-numeric side: lexical, so "10" < "9".
        assert_eq!(
            compare_values(&Value::Text("10".into()), &Value::Text("9a".into())),
            Ordering::Less
        );
        // Null renders empty and sorts before any non-empty text.
        assert_eq!(
            compare_values(&Value::Null, &Value::Text("a".into())),
            Ordering::Less
        );
    }
}
