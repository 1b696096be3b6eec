use std::cmp::Ordering;

use crate::flattener::{BinaryOp, UnaryOp};

use super::value::Value;
use super::RuntimeError;

/// Coerce a value to an exact integer. Strings spelling an integer count,
/// matching the reference arithmetic.
fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(value) => Some(*value),
        Value::Str(value) => value.trim().parse().ok(),
        _ => None,
    }
}

/// Floor division: the quotient is rounded toward negative infinity.
fn floor_div(left: i64, right: i64) -> i64 {
    let quotient = left / right;
    if left % right != 0 && (left < 0) != (right < 0) {
        return quotient - 1;
    }
    quotient
}

/// Exponentiation with the result truncated toward zero for negative
/// exponents: 0 unless the base is 1 or -1.
fn pow_trunc(base: i64, exponent: i64) -> Result<i64, RuntimeError> {
    if exponent >= 0 {
        let exponent = u32::try_from(exponent)
            .map_err(|_| RuntimeError::Value("integer overflow in '**'".into()))?;
        return base
            .checked_pow(exponent)
            .ok_or_else(|| RuntimeError::Value("integer overflow in '**'".into()));
    }

    match base {
        1 => Ok(1),
        -1 if exponent % 2 == 0 => Ok(1),
        -1 => Ok(-1),
        _ => Ok(0),
    }
}

fn arithmetic_operands(
    op: BinaryOp,
    left: &Value,
    right: &Value,
) -> Result<(i64, i64), RuntimeError> {
    match (to_int(left), to_int(right)) {
        (Some(left), Some(right)) => Ok((left, right)),
        _ => Err(RuntimeError::Type(format!(
            "cannot apply '{op}' to {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

/// Relational comparison: integer comparison when both operands coerce,
/// lexical string comparison otherwise.
fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Ordering, RuntimeError> {
    if let (Some(left), Some(right)) = (to_int(left), to_int(right)) {
        return Ok(left.cmp(&right));
    }

    if let (Value::Str(left), Value::Str(right)) = (left, right) {
        return Ok(left.cmp(right));
    }

    Err(RuntimeError::Type(format!(
        "cannot compare {} and {} with '{op}'",
        left.type_name(),
        right.type_name()
    )))
}

fn truth_operands(op: BinaryOp, left: &Value, right: &Value) -> Result<(bool, bool), RuntimeError> {
    match (left, right) {
        (Value::Bool(left), Value::Bool(right)) => Ok((*left, *right)),
        _ => Err(RuntimeError::Type(format!(
            "'{op}' expects truthvalues, got {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

pub fn apply_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, RuntimeError> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
            let (l, r) = arithmetic_operands(op, &left, &right)?;
            let result = match op {
                BinaryOp::Add => l.checked_add(r),
                BinaryOp::Sub => l.checked_sub(r),
                BinaryOp::Mul => l.checked_mul(r),
                BinaryOp::Div => {
                    if r == 0 {
                        return Err(RuntimeError::Value("division by zero".into()));
                    }
                    Some(floor_div(l, r))
                }
                BinaryOp::Pow => Some(pow_trunc(l, r)?),
                _ => unreachable!(),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::Value(format!("integer overflow in '{op}'")))
        }

        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),

        BinaryOp::Gr => Ok(Value::Bool(compare(op, &left, &right)? == Ordering::Greater)),
        BinaryOp::Ge => Ok(Value::Bool(compare(op, &left, &right)? != Ordering::Less)),
        BinaryOp::Ls => Ok(Value::Bool(compare(op, &left, &right)? == Ordering::Less)),
        BinaryOp::Le => Ok(Value::Bool(compare(op, &left, &right)? != Ordering::Greater)),

        BinaryOp::And => {
            let (l, r) = truth_operands(op, &left, &right)?;
            Ok(Value::Bool(l && r))
        }
        BinaryOp::Or => {
            let (l, r) = truth_operands(op, &left, &right)?;
            Ok(Value::Bool(l || r))
        }

        BinaryOp::Aug => match left {
            Value::Tuple(mut items) => {
                items.push(right);
                Ok(Value::Tuple(items))
            }
            other => Err(RuntimeError::Type(format!(
                "'aug' expects a tuple as its first operand, got {}",
                other.type_name()
            ))),
        },
    }
}

pub fn apply_unary(op: UnaryOp, operand: Value) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Neg => match to_int(&operand) {
            Some(value) => value
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::Value("integer overflow in 'neg'".into())),
            None => Err(RuntimeError::Type(format!(
                "'neg' expects an integer, got {}",
                operand.type_name()
            ))),
        },
        UnaryOp::Not => match operand {
            Value::Bool(value) => Ok(Value::Bool(!value)),
            other => Err(RuntimeError::Value(format!(
                "invalid truthvalue for 'not': {other}"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_division_rounds_toward_negative_infinity() {
        assert_eq!(floor_div(7, 2), 3);
        assert_eq!(floor_div(-7, 2), -4);
        assert_eq!(floor_div(7, -2), -4);
        assert_eq!(floor_div(-7, -2), 3);
        assert_eq!(floor_div(6, 3), 2);
    }

    #[test]
    fn test_pow_with_negative_exponent_truncates() {
        assert_eq!(pow_trunc(2, -1), Ok(0));
        assert_eq!(pow_trunc(1, -5), Ok(1));
        assert_eq!(pow_trunc(-1, -3), Ok(-1));
        assert_eq!(pow_trunc(-1, -4), Ok(1));
        assert_eq!(pow_trunc(2, 10), Ok(1024));
    }

    #[test]
    fn test_arithmetic_coerces_integer_strings() {
        assert_eq!(
            apply_binary(BinaryOp::Add, Value::Str("2".into()), Value::Int(3)),
            Ok(Value::Int(5))
        );
        assert!(apply_binary(BinaryOp::Add, Value::Str("x".into()), Value::Int(3)).is_err());
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        assert!(apply_binary(BinaryOp::Div, Value::Int(1), Value::Int(0)).is_err());
    }

    #[test]
    fn test_comparison_falls_back_to_lexical_order() {
        assert_eq!(
            apply_binary(BinaryOp::Gr, Value::Str("10".into()), Value::Int(9)),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            apply_binary(
                BinaryOp::Ls,
                Value::Str("apple".into()),
                Value::Str("banana".into())
            ),
            Ok(Value::Bool(true))
        );
        assert!(apply_binary(BinaryOp::Gr, Value::Bool(true), Value::Int(1)).is_err());
    }

    #[test]
    fn test_equality_is_structural() {
        let left = Value::Tuple(vec![Value::Int(1), Value::Str("a".into())]);
        let right = Value::Tuple(vec![Value::Int(1), Value::Str("a".into())]);
        assert_eq!(apply_binary(BinaryOp::Eq, left, right), Ok(Value::Bool(true)));
        assert_eq!(
            apply_binary(BinaryOp::Eq, Value::Int(1), Value::Str("1".into())),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn test_aug_appends_to_a_tuple() {
        assert_eq!(
            apply_binary(BinaryOp::Aug, Value::Tuple(vec![]), Value::Int(1)),
            Ok(Value::Tuple(vec![Value::Int(1)]))
        );
        assert!(apply_binary(BinaryOp::Aug, Value::Int(1), Value::Int(2)).is_err());
    }

    #[test]
    fn test_not_rejects_non_truthvalues() {
        assert_eq!(
            apply_unary(UnaryOp::Not, Value::Bool(true)),
            Ok(Value::Bool(false))
        );
        assert!(apply_unary(UnaryOp::Not, Value::Int(1)).is_err());
    }
}
