//! Names and signatures every program starts with.

use sysf_core::{ConstructorDef, DataDeclaration, Type};

pub const PRIMITIVE_TYPES: &[&str] = &["Int", "String"];

pub fn bool_declaration() -> DataDeclaration {
    DataDeclaration {
        name: "Bool".into(),
        type_params: Vec::new(),
        constructors: vec![
            ConstructorDef {
                name: "True".into(),
                args: Vec::new(),
            },
            ConstructorDef {
                name: "False".into(),
                args: Vec::new(),
            },
        ],
    }
}

/// Built-in primitive operations and their types.
pub fn primitive_ops() -> Vec<(&'static str, Type)> {
    let int_binary = || Type::arrows([Type::int(), Type::int()], Type::int());
    let int_compare = || Type::arrows([Type::int(), Type::int()], Type::bool());
    vec![
        ("$prim.int_plus", int_binary()),
        ("$prim.int_minus", int_binary()),
        ("$prim.int_multiply", int_binary()),
        ("$prim.int_divide", int_binary()),
        ("$prim.int_negate", Type::arrow(Type::int(), Type::int())),
        ("$prim.int_eq", int_compare()),
        ("$prim.int_lt", int_compare()),
        ("$prim.int_gt", int_compare()),
        (
            "$prim.string_concat",
            Type::arrows([Type::string(), Type::string()], Type::string()),
        ),
        ("$prim.string_length", Type::arrow(Type::string(), Type::int())),
    ]
}
