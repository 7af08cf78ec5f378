use smol_str::SmolStr;
use sysf_lexer::Span;

/// Scope and shape errors found while elaborating a declaration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ElabError {
    #[error("undefined variable: {name}")]
    UndefinedVariable { name: SmolStr, span: Span },

    #[error("undefined type variable: {name}")]
    UndefinedTypeVariable { name: SmolStr, span: Span },

    #[error("undefined constructor: {name}")]
    UndefinedConstructor { name: SmolStr, span: Span },

    #[error("{message}")]
    Elaboration { message: String, span: Span },
}

impl ElabError {
    pub fn span(&self) -> Span {
        match self {
            ElabError::UndefinedVariable { span, .. }
            | ElabError::UndefinedTypeVariable { span, .. }
            | ElabError::UndefinedConstructor { span, .. }
            | ElabError::Elaboration { span, .. } => *span,
        }
    }
}
