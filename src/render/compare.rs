use crate::{compile::Operator, log::{Error, INCOMPATIBLE_TYPES}};
use serde_json::Value;

/// Return true if the given [`Value`] is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(bo) => *bo,
        Value::Number(nu) => nu.as_f64().is_some_and(|n| n > 0.0f64),
        Value::String(st) => !st.is_empty(),
        Value::Array(ar) => !ar.is_empty(),
        Value::Object(ob) => !ob.is_empty(),
        Value::Null => false,
    }
}

/// Compare the two [`Value`] instances with the given [`Operator`].
///
/// # Errors
///
/// Returns an [`Error`] if the two types cannot be compared, or the
/// `Operator` cannot be applied to the types.
pub fn compare_values(left: &Value, operator: Operator, right: &Value) -> Result<bool, Error> {
    let result = match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            let left_as = left.as_f64().unwrap_or_default();
            let right_as = right.as_f64().unwrap_or_default();
            match operator {
                Operator::Greater => left_as > right_as,
                Operator::Lesser => left_as < right_as,
                Operator::Equal => left_as == right_as,
                Operator::NotEqual => left_as != right_as,
                Operator::GreaterOrEqual => left_as >= right_as,
                Operator::LesserOrEqual => left_as <= right_as,
            }
        }
        (Value::String(left), Value::String(right)) => match operator {
            Operator::Greater => left > right,
            Operator::Lesser => left < right,
            Operator::Equal => left == right,
            Operator::NotEqual => left != right,
            Operator::GreaterOrEqual => left >= right,
            Operator::LesserOrEqual => left <= right,
        },
        (Value::Bool(left), Value::Bool(right)) => match operator {
            Operator::Greater => left > right,
            Operator::Lesser => left < right,
            Operator::Equal => left == right,
            Operator::NotEqual => left != right,
            Operator::GreaterOrEqual => left >= right,
            Operator::LesserOrEqual => left <= right,
        },
        (left @ Value::Array(_), right @ Value::Array(_))
        | (left @ Value::Object(_), right @ Value::Object(_)) => match operator {
            Operator::Equal => left == right,
            Operator::NotEqual => left != right,
            unsupported => {
                return Err(Error::render(INCOMPATIBLE_TYPES).with_help(format!(
                    "operator `{unsupported}` is invalid on collection types, \
                    only `==` and `!=` are supported"
                )))
            }
        },
        (left, right) => {
            return Err(Error::render(INCOMPATIBLE_TYPES).with_help(format!(
                "types `{}` and `{}` cannot be compared",
                left, right
            )))
        }
    };

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::{compare_values, is_truthy};
    use crate::compile::Operator;
    use serde_json::json;

    #[test]
    fn test_truthy() {
        let true_values = vec![
            json!("lorem"),
            json!(12),
            json!(114.4),
            json!(true),
            json!(vec!["lorem", "ipsum"]),
            json!({"lorem": "ipsum"}),
        ];
        let false_values = vec![
            json!(""),
            json!(0),
            json!(0.0),
            json!(-12),
            json!(false),
            json!(vec![""; 0]),
            json!({}),
            json!(null),
        ];

        for value in true_values {
            assert!(is_truthy(&value), "{value} should be truthy");
        }
        for value in false_values {
            assert!(!is_truthy(&value), "{value} should be falsy");
        }
    }

    #[test]
    fn test_compare_numbers() {
        assert!(compare_values(&json!(10), Operator::Greater, &json!(5)).unwrap());
        assert!(compare_values(&json!(5), Operator::LesserOrEqual, &json!(5)).unwrap());
        assert!(!compare_values(&json!(5), Operator::NotEqual, &json!(5)).unwrap());
    }

    #[test]
    fn test_compare_strings() {
        assert!(compare_values(&json!("b"), Operator::Greater, &json!("a")).unwrap());
        assert!(compare_values(&json!("a"), Operator::Equal, &json!("a")).unwrap());
    }

    #[test]
    fn test_compare_collections() {
        assert!(compare_values(&json!(["a"]), Operator::Equal, &json!(["a"])).unwrap());
        assert!(compare_values(&json!({"a": 1}), Operator::NotEqual, &json!({"a": 2})).unwrap());
        assert!(compare_values(&json!(["a"]), Operator::Greater, &json!(["b"])).is_err());
    }

    #[test]
    fn test_compare_incompatible() {
        assert!(compare_values(&json!("hello"), Operator::Greater, &json!(true)).is_err());
        assert!(compare_values(&json!(10), Operator::Equal, &json!("10")).is_err());
    }
}
