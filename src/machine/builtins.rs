use std::collections::HashMap;

use once_cell::sync::Lazy;
use unescape::unescape;

use super::value::Value;
use super::RuntimeError;

static BUILTINS: Lazy<HashMap<&'static str, Builtin>> = Lazy::new(|| {
    HashMap::from([
        ("Print", Builtin::Print),
        ("print", Builtin::Print),
        ("Isinteger", Builtin::Isinteger),
        ("Isstring", Builtin::Isstring),
        ("Istuple", Builtin::Istuple),
        ("Isdummy", Builtin::Isdummy),
        ("Istruthvalue", Builtin::Istruthvalue),
        ("Isfunction", Builtin::Isfunction),
        ("Stem", Builtin::Stem),
        ("Stern", Builtin::Stern),
        ("Conc", Builtin::Conc),
        ("Order", Builtin::Order),
        ("Null", Builtin::Null),
        ("ItoS", Builtin::ItoS),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Isinteger,
    Isstring,
    Istuple,
    Isdummy,
    Istruthvalue,
    Isfunction,
    Stem,
    Stern,
    Conc,
    Order,
    Null,
    ItoS,
}

impl Builtin {
    /// Builtin names take precedence over variable lookup, so they cannot
    /// be shadowed by user bindings.
    pub fn lookup(name: &str) -> Option<Builtin> {
        BUILTINS.get(name).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Print => "Print",
            Builtin::Isinteger => "Isinteger",
            Builtin::Isstring => "Isstring",
            Builtin::Istuple => "Istuple",
            Builtin::Isdummy => "Isdummy",
            Builtin::Istruthvalue => "Istruthvalue",
            Builtin::Isfunction => "Isfunction",
            Builtin::Stem => "Stem",
            Builtin::Stern => "Stern",
            Builtin::Conc => "Conc",
            Builtin::Order => "Order",
            Builtin::Null => "Null",
            Builtin::ItoS => "ItoS",
        }
    }

    /// `Conc` consumes a second stack value (and the leftover application
    /// marker on the control tape) when applied.
    pub fn is_binary(&self) -> bool {
        matches!(self, Builtin::Conc)
    }

    pub fn apply(&self, arg: Value) -> Result<Value, RuntimeError> {
        match self {
            Builtin::Print => Ok(print_value(arg)),
            Builtin::Isinteger => Ok(Value::Bool(matches!(arg, Value::Int(_)))),
            Builtin::Isstring => Ok(Value::Bool(matches!(arg, Value::Str(_)))),
            Builtin::Istuple => Ok(Value::Bool(matches!(arg, Value::Tuple(_)))),
            Builtin::Isdummy => Ok(Value::Bool(arg == Value::Dummy)),
            Builtin::Istruthvalue => Ok(Value::Bool(matches!(arg, Value::Bool(_)))),
            Builtin::Isfunction => Ok(Value::Bool(matches!(
                arg,
                Value::Closure(_) | Value::Eta(_)
            ))),
            Builtin::Stem => match arg {
                Value::Str(value) => Ok(Value::Str(
                    value.chars().next().map(String::from).unwrap_or_default(),
                )),
                _ => Ok(Value::Str(String::new())),
            },
            Builtin::Stern => match arg {
                Value::Str(value) => {
                    let mut chars = value.chars();
                    chars.next();
                    Ok(Value::Str(chars.collect()))
                }
                _ => Ok(Value::Str(String::new())),
            },
            Builtin::Order => match arg {
                Value::Str(value) => Ok(Value::Int(value.chars().count() as i64)),
                Value::Tuple(items) => Ok(Value::Int(items.len() as i64)),
                other => Err(RuntimeError::Type(format!(
                    "Order expects a string or a tuple, got {}",
                    other.type_name()
                ))),
            },
            Builtin::Null => {
                let empty = match &arg {
                    Value::Tuple(items) => items.is_empty(),
                    Value::Str(value) => value.is_empty(),
                    Value::Int(value) => *value == 0,
                    _ => false,
                };
                Ok(Value::Bool(empty))
            }
            Builtin::ItoS => match arg {
                Value::Int(value) => Ok(Value::Str(value.to_string())),
                other => Err(RuntimeError::Type(format!(
                    "ItoS expects an integer, got {}",
                    other.type_name()
                ))),
            },
            Builtin::Conc => Err(RuntimeError::Type(
                "Conc requires two arguments".into(),
            )),
        }
    }

    pub fn apply_binary(&self, first: Value, second: Value) -> Result<Value, RuntimeError> {
        match self {
            Builtin::Conc => match (first, second) {
                (Value::Str(first), Value::Str(second)) => Ok(Value::Str(first + &second)),
                (first, second) => Err(RuntimeError::Type(format!(
                    "Conc expects two strings, got {} and {}",
                    first.type_name(),
                    second.type_name()
                ))),
            },
            other => other.apply(first),
        }
    }
}

/// Write the human-readable form of a value to stdout and return the value
/// the application yields: the formatted text for tuples, the untouched
/// argument otherwise.
fn print_value(arg: Value) -> Value {
    match &arg {
        Value::Tuple(items) if items.is_empty() => {
            print!("nil");
            Value::Str("nil".into())
        }
        Value::Tuple(items) => {
            let formatted = format_tuple(items);
            print!("{formatted}");
            Value::Str(formatted)
        }
        Value::Str(value) => {
            let interpreted = unescape(value).unwrap_or_else(|| value.clone());
            print!("{interpreted}");
            arg
        }
        other => {
            print!("{}", render_plain(other));
            arg
        }
    }
}

/// Bare rendering used by `Print`: strings without quotes, nested tuples in
/// parentheses.
fn render_plain(value: &Value) -> String {
    match value {
        Value::Str(content) => content.clone(),
        Value::Tuple(items) => format_tuple(items),
        other => other.to_string(),
    }
}

fn format_tuple(items: &[Value]) -> String {
    let parts = items.iter().map(render_plain).collect::<Vec<_>>();
    format!("({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_covers_both_print_spellings() {
        assert_eq!(Builtin::lookup("Print"), Some(Builtin::Print));
        assert_eq!(Builtin::lookup("print"), Some(Builtin::Print));
        assert_eq!(Builtin::lookup("Conc"), Some(Builtin::Conc));
        assert_eq!(Builtin::lookup("conc"), None);
    }

    #[test]
    fn test_stem_and_stern() {
        assert_eq!(
            Builtin::Stem.apply(Value::Str("abc".into())),
            Ok(Value::Str("a".into()))
        );
        assert_eq!(
            Builtin::Stern.apply(Value::Str("abc".into())),
            Ok(Value::Str("bc".into()))
        );
        assert_eq!(
            Builtin::Stem.apply(Value::Str(String::new())),
            Ok(Value::Str(String::new()))
        );
        assert_eq!(Builtin::Stern.apply(Value::Int(1)), Ok(Value::Str(String::new())));
    }

    #[test]
    fn test_conc() {
        assert_eq!(
            Builtin::Conc.apply_binary(Value::Str("ab".into()), Value::Str("cd".into())),
            Ok(Value::Str("abcd".into()))
        );
        assert!(Builtin::Conc
            .apply_binary(Value::Str("ab".into()), Value::Int(1))
            .is_err());
    }

    #[test]
    fn test_order() {
        assert_eq!(
            Builtin::Order.apply(Value::Str("abc".into())),
            Ok(Value::Int(3))
        );
        assert_eq!(
            Builtin::Order.apply(Value::Tuple(vec![Value::Int(1), Value::Int(2)])),
            Ok(Value::Int(2))
        );
        assert!(Builtin::Order.apply(Value::Int(5)).is_err());
    }

    #[test]
    fn test_null_is_true_for_empty_values_and_zero() {
        assert_eq!(Builtin::Null.apply(Value::Tuple(vec![])), Ok(Value::Bool(true)));
        assert_eq!(
            Builtin::Null.apply(Value::Str(String::new())),
            Ok(Value::Bool(true))
        );
        assert_eq!(Builtin::Null.apply(Value::Int(0)), Ok(Value::Bool(true)));
        assert_eq!(Builtin::Null.apply(Value::Int(1)), Ok(Value::Bool(false)));
        assert_eq!(Builtin::Null.apply(Value::Bool(false)), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_itos() {
        assert_eq!(
            Builtin::ItoS.apply(Value::Int(42)),
            Ok(Value::Str("42".into()))
        );
        assert!(Builtin::ItoS.apply(Value::Str("42".into())).is_err());
    }

    #[test]
    fn test_type_predicates() {
        assert_eq!(Builtin::Isinteger.apply(Value::Int(1)), Ok(Value::Bool(true)));
        assert_eq!(
            Builtin::Isinteger.apply(Value::Str("1".into())),
            Ok(Value::Bool(false))
        );
        assert_eq!(
            Builtin::Istruthvalue.apply(Value::Bool(false)),
            Ok(Value::Bool(true))
        );
        assert_eq!(Builtin::Isdummy.apply(Value::Dummy), Ok(Value::Bool(true)));
    }
}
