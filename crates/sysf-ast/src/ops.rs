//! Operator table used to desugar `SurfaceTermKind::Op`.

/// Binary operators and the primitive each one calls.
pub const BINARY_OPERATORS: &[(&str, &str)] = &[
    ("+", "$prim.int_plus"),
    ("-", "$prim.int_minus"),
    ("*", "$prim.int_multiply"),
    ("/", "$prim.int_divide"),
    ("==", "$prim.int_eq"),
    ("<", "$prim.int_lt"),
    (">", "$prim.int_gt"),
    ("++", "$prim.string_concat"),
];

/// Unary operators: `(- x)` negates.
pub const UNARY_OPERATORS: &[(&str, &str)] = &[("-", "$prim.int_negate")];

pub fn is_operator(symbol: &str) -> bool {
    BINARY_OPERATORS.iter().any(|(op, _)| *op == symbol)
        || UNARY_OPERATORS.iter().any(|(op, _)| *op == symbol)
}

/// Resolve an operator applied to `arity` operands to its primitive name.
pub fn primitive_for(op: &str, arity: usize) -> Option<&'static str> {
    let table = match arity {
        1 => UNARY_OPERATORS,
        2 => BINARY_OPERATORS,
        _ => return None,
    };
    table
        .iter()
        .find(|(symbol, _)| *symbol == op)
        .map(|(_, prim)| *prim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minus_depends_on_arity() {
        assert_eq!(primitive_for("-", 2), Some("$prim.int_minus"));
        assert_eq!(primitive_for("-", 1), Some("$prim.int_negate"));
        assert_eq!(primitive_for("-", 3), None);
    }

    #[test]
    fn unknown_operator() {
        assert!(!is_operator("%"));
        assert_eq!(primitive_for("+", 1), None);
        assert_eq!(primitive_for("==", 2), Some("$prim.int_eq"));
    }
}
