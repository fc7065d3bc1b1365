use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::Record;

/// Comparison operator of a [`Filter::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Eq => "eq",
            Operator::Ne => "ne",
        }
    }

    /// SQL spelling of the operator.
    pub fn sql(self) -> &'static str {
        match self {
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Eq => "=",
            Operator::Ne => "!=",
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Operator::Lt => ordering == Ordering::Less,
            Operator::Le => ordering != Ordering::Greater,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Ge => ordering != Ordering::Less,
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Ne => ordering != Ordering::Equal,
        }
    }
}

impl FromStr for Operator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lt" => Ok(Operator::Lt),
            "le" => Ok(Operator::Le),
            "gt" => Ok(Operator::Gt),
            "ge" => Ok(Operator::Ge),
            "eq" => Ok(Operator::Eq),
            "ne" => Ok(Operator::Ne),
            other => Err(ValidationError::new("operator", format!("unknown operator '{other}'"))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend-agnostic match predicate. A list of filters is combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches records whose `field` is one of `values`. No values matches nothing.
    In { field: String, values: Vec<Value> },
    /// Matches records where `field <operator> value` holds.
    Compare {
        field: String,
        operator: Operator,
        value: Value,
    },
}

impl Filter {
    pub fn new(field: impl Into<String>, values: Vec<Value>) -> Self {
        Filter::In {
            field: field.into(),
            values,
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, vec![value.into()])
    }

    pub fn for_id(id: impl Into<Value>) -> Self {
        Self::eq("id", id)
    }

    pub fn for_uuid(id: Uuid) -> Self {
        Self::eq("id", id.to_string())
    }

    pub fn compare(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Filter::Compare {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Build a comparison from a values list, which must hold exactly one value.
    pub fn comparison(
        field: impl Into<String>,
        operator: Operator,
        values: Vec<Value>,
    ) -> Result<Self, ValidationError> {
        let field = field.into();
        let [value]: [Value; 1] = values.try_into().map_err(|_| {
            ValidationError::new(field.clone(), "a comparison filter needs exactly one value")
        })?;
        Ok(Filter::Compare {
            field,
            operator,
            value,
        })
    }

    pub fn field(&self) -> &str {
        match self {
            Filter::In { field, .. } | Filter::Compare { field, .. } => field,
        }
    }

    /// Evaluate against an in-memory record. A missing field is treated as null.
    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.get(self.field()).unwrap_or(&Value::Null);
        match self {
            Filter::In { values, .. } => values.contains(actual),
            Filter::Compare { operator, value, .. } => compare_values(actual, value)
                .map(|ordering| operator.accepts(ordering))
                .unwrap_or(false),
        }
    }
}

/// Order two JSON scalars of the same kind; `None` when they are not comparable
/// (including any comparison against null, as in SQL).
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn empty_values_match_nothing() {
        let filter = Filter::new("name", vec![]);
        assert!(!filter.matches(&record(json!({"name": "foo"}))));
        assert!(!filter.matches(&record(json!({}))));
    }

    #[test]
    fn in_filter_matches_members() {
        let filter = Filter::new("name", vec![json!("foo"), json!("bar")]);
        assert!(filter.matches(&record(json!({"name": "bar"}))));
        assert!(!filter.matches(&record(json!({"name": "baz"}))));
    }

    #[test]
    fn comparison_requires_single_value() {
        assert!(Filter::comparison("n", Operator::Gt, vec![json!(1), json!(2)]).is_err());
        assert!(Filter::comparison("n", Operator::Gt, vec![]).is_err());
        let filter = Filter::comparison("n", Operator::Gt, vec![json!(1)]).unwrap();
        assert!(filter.matches(&record(json!({"n": 2}))));
        assert!(!filter.matches(&record(json!({"n": 1}))));
    }

    #[test]
    fn comparison_against_null_is_false() {
        let filter = Filter::compare("n", Operator::Ne, 1);
        assert!(!filter.matches(&record(json!({"n": null}))));
    }

    #[test]
    fn timestamps_compare_textually() {
        let filter = Filter::compare("created_at", Operator::Lt, "2024-02-01T00:00:00.000000Z");
        assert!(filter.matches(&record(json!({"created_at": "2024-01-31T23:59:59.999999Z"}))));
    }

    #[test]
    fn operator_round_trip() {
        for op in ["lt", "le", "gt", "ge", "eq", "ne"] {
            assert_eq!(op.parse::<Operator>().unwrap().as_str(), op);
        }
        assert!("like".parse::<Operator>().is_err());
    }
}
