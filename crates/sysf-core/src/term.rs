use crate::Type;
use smol_str::SmolStr;
use std::fmt;
use std::rc::Rc;

/// Core term. Local variables are de Bruijn indices: `Var(0)` is the
/// nearest enclosing binder (lambda, let, or pattern variable).
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Var(usize),
    Global(SmolStr),
    /// Lambda. `param_type` is `None` for unannotated surface lambdas.
    Abs {
        param_type: Option<Type>,
        body: Rc<Term>,
    },
    App(Rc<Term>, Rc<Term>),
    /// Type abstraction. Type variables stay named.
    TAbs {
        var: SmolStr,
        body: Rc<Term>,
    },
    TApp(Rc<Term>, Type),
    Constructor(SmolStr, Vec<Term>),
    Case(Rc<Term>, Vec<Branch>),
    Let {
        name: SmolStr,
        value: Rc<Term>,
        body: Rc<Term>,
    },
    IntLit(i64),
    StringLit(String),
    /// Primitive operation, including `llm.<name>` functions.
    PrimOp(SmolStr),
    ToolCall(SmolStr, Vec<Term>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub pattern: Pattern,
    pub body: Rc<Term>,
}

/// Flat constructor pattern. The first variable is index 0 in the body.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub constructor: SmolStr,
    pub vars: Vec<SmolStr>,
}

impl Term {
    pub fn abs(param_type: Option<Type>, body: Term) -> Term {
        Term::Abs {
            param_type,
            body: Rc::new(body),
        }
    }

    pub fn app(func: Term, arg: Term) -> Term {
        Term::App(Rc::new(func), Rc::new(arg))
    }

    pub fn tabs(var: impl Into<SmolStr>, body: Term) -> Term {
        Term::TAbs {
            var: var.into(),
            body: Rc::new(body),
        }
    }

    pub fn tapp(func: Term, type_arg: Type) -> Term {
        Term::TApp(Rc::new(func), type_arg)
    }

    pub fn let_in(name: impl Into<SmolStr>, value: Term, body: Term) -> Term {
        Term::Let {
            name: name.into(),
            value: Rc::new(value),
            body: Rc::new(body),
        }
    }

    pub fn case(scrutinee: Term, branches: Vec<Branch>) -> Term {
        Term::Case(Rc::new(scrutinee), branches)
    }
}

impl Branch {
    pub fn new(constructor: impl Into<SmolStr>, vars: Vec<SmolStr>, body: Term) -> Branch {
        Branch {
            pattern: Pattern {
                constructor: constructor.into(),
                vars,
            },
            body: Rc::new(body),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Var(index) => write!(f, "#{}", index),
            Term::Global(name) | Term::PrimOp(name) => write!(f, "{}", name),
            Term::Abs {
                param_type: Some(ty),
                body,
            } => write!(f, "(fn : {}. {})", ty, body),
            Term::Abs {
                param_type: None,
                body,
            } => write!(f, "(fn. {})", body),
            Term::App(func, arg) => write!(f, "({} {})", func, arg),
            Term::TAbs { var, body } => write!(f, "(tfn '{}. {})", var, body),
            Term::TApp(func, ty) => write!(f, "({} @{})", func, ty),
            Term::Constructor(name, args) if args.is_empty() => write!(f, "{}", name),
            Term::Constructor(name, args) => {
                write!(f, "({}", name)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
            Term::Case(scrutinee, branches) => {
                write!(f, "(case {}", scrutinee)?;
                for branch in branches {
                    write!(f, " [{}", branch.pattern.constructor)?;
                    for var in &branch.pattern.vars {
                        write!(f, " {}", var)?;
                    }
                    write!(f, " => {}]", branch.body)?;
                }
                write!(f, ")")
            }
            Term::Let { name, value, body } => write!(f, "(let {} = {} in {})", name, value, body),
            Term::IntLit(n) => write!(f, "{}", n),
            Term::StringLit(s) => write!(f, "{:?}", s),
            Term::ToolCall(tool, args) => {
                write!(f, "(tool {}", tool)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
