use crate::EvalError;
use smol_str::SmolStr;
use std::fmt;
use std::rc::Rc;
use sysf_core::{ConsList, Term};

/// Runtime environment: index 0 is the innermost binding, matching the de
/// Bruijn indices of the core term being evaluated.
pub type Env = ConsList<Value>;

pub type PrimFn = Rc<dyn Fn(&[Value]) -> Result<Value, EvalError>>;

#[derive(Clone)]
pub enum PrimImpl {
    Native(PrimFn),
    /// `llm.<name>`: executed by the evaluator's LLM host.
    Llm,
}

/// A primitive operation with the number of arguments it waits for before
/// running.
#[derive(Clone)]
pub struct Primitive {
    pub name: SmolStr,
    pub arity: usize,
    pub imp: PrimImpl,
}

impl Primitive {
    pub fn native(
        name: impl Into<SmolStr>,
        arity: usize,
        run: impl Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            imp: PrimImpl::Native(Rc::new(run)),
        }
    }

    pub fn llm(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            arity: 1,
            imp: PrimImpl::Llm,
        }
    }
}

#[derive(Clone)]
pub enum Value {
    Int(i64),
    String(String),
    /// Data constructor. Fully applied when `args.len() == arity`.
    Constructor {
        name: SmolStr,
        arity: usize,
        args: Vec<Value>,
    },
    Closure {
        env: Env,
        body: Rc<Term>,
    },
    TypeClosure {
        env: Env,
        body: Rc<Term>,
    },
    PrimOp(Primitive),
    /// A primitive holding the arguments it has received so far.
    PrimOpPartial(Primitive, Vec<Value>),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    /// A fully applied constructor.
    pub fn constructor(name: impl Into<SmolStr>, args: Vec<Value>) -> Value {
        Value::Constructor {
            name: name.into(),
            arity: args.len(),
            args,
        }
    }

    pub fn bool(b: bool) -> Value {
        Value::constructor(if b { "True" } else { "False" }, Vec::new())
    }

    pub fn is_saturated(&self) -> bool {
        match self {
            Value::Constructor { arity, args, .. } => args.len() == *arity,
            _ => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Constructor { name, arity, args } => {
                if args.len() < *arity {
                    write!(f, "<constructor {}>", name)
                } else if args.is_empty() {
                    write!(f, "{}", name)
                } else {
                    write!(f, "({}", name)?;
                    for a in args {
                        write!(f, " {}", a)?;
                    }
                    write!(f, ")")
                }
            }
            Value::Closure { .. } => write!(f, "<closure>"),
            Value::TypeClosure { .. } => write!(f, "<type-closure>"),
            Value::PrimOp(prim) => write!(f, "<prim {}>", prim.name),
            Value::PrimOpPartial(prim, args) => {
                write!(f, "<prim {}", prim.name)?;
                for a in args {
                    write!(f, " {}", a)?;
                }
                write!(f, ">")
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Data values compare structurally; functions never compare equal.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (
                Value::Constructor {
                    name: a_name,
                    args: a_args,
                    ..
                },
                Value::Constructor {
                    name: b_name,
                    args: b_args,
                    ..
                },
            ) => a_name == b_name && a_args == b_args,
            _ => false,
        }
    }
}
