//! Implementations of the built-in `$prim.*` operations.

use crate::{EvalError, Primitive, Value};

fn expect_int(prim: &str, value: &Value) -> Result<i64, EvalError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(EvalError::runtime(format!(
            "{} expects an Int, got {}",
            prim, other
        ))),
    }
}

fn expect_string<'v>(prim: &str, value: &'v Value) -> Result<&'v str, EvalError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(EvalError::runtime(format!(
            "{} expects a String, got {}",
            prim, other
        ))),
    }
}

fn int_binary(
    name: &'static str,
    op: impl Fn(i64, i64) -> Result<Value, EvalError> + 'static,
) -> Primitive {
    Primitive::native(name, 2, move |args| {
        let a = expect_int(name, &args[0])?;
        let b = expect_int(name, &args[1])?;
        op(a, b)
    })
}

pub fn builtins() -> Vec<Primitive> {
    vec![
        int_binary("$prim.int_plus", |a, b| Ok(Value::Int(a.wrapping_add(b)))),
        int_binary("$prim.int_minus", |a, b| Ok(Value::Int(a.wrapping_sub(b)))),
        int_binary("$prim.int_multiply", |a, b| Ok(Value::Int(a.wrapping_mul(b)))),
        int_binary("$prim.int_divide", |a, b| {
            if b == 0 {
                return Err(EvalError::runtime("division by zero"));
            }
            Ok(Value::Int(a.wrapping_div(b)))
        }),
        Primitive::native("$prim.int_negate", 1, |args| {
            Ok(Value::Int(expect_int("$prim.int_negate", &args[0])?.wrapping_neg()))
        }),
        int_binary("$prim.int_eq", |a, b| Ok(Value::bool(a == b))),
        int_binary("$prim.int_lt", |a, b| Ok(Value::bool(a < b))),
        int_binary("$prim.int_gt", |a, b| Ok(Value::bool(a > b))),
        Primitive::native("$prim.string_concat", 2, |args| {
            let a = expect_string("$prim.string_concat", &args[0])?;
            let b = expect_string("$prim.string_concat", &args[1])?;
            Ok(Value::String(format!("{}{}", a, b)))
        }),
        Primitive::native("$prim.string_length", 1, |args| {
            let s = expect_string("$prim.string_length", &args[0])?;
            Ok(Value::Int(s.chars().count() as i64))
        }),
    ]
}
