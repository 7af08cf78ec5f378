use smol_str::SmolStr;
use sysf_core::Type;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TypeError {
    #[error("undefined variable: {0}")]
    UndefinedVariable(SmolStr),

    #[error("undefined constructor: {0}")]
    UndefinedConstructor(SmolStr),

    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: Type, actual: Type },

    #[error("cannot unify {left} with {right}")]
    Unification { left: Type, right: Type },

    #[error("occurs check: '{var} occurs in {ty}")]
    OccursCheck { var: SmolStr, ty: Type },

    #[error("{0}")]
    Other(String),

    #[error("in {name}: {source}")]
    InDeclaration {
        name: SmolStr,
        source: Box<TypeError>,
    },
}

impl TypeError {
    /// The declaration an error was raised in, if it has been attributed.
    pub fn declaration(&self) -> Option<&SmolStr> {
        match self {
            TypeError::InDeclaration { name, .. } => Some(name),
            _ => None,
        }
    }
}
