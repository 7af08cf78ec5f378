//! Core data model shared by the elaborator, type checker and evaluator.

mod cons_list;
mod error;
mod module;
mod term;
mod types;

pub use cons_list::ConsList;
pub use error::ElabError;
pub use module::{
    llm_primitive_name, ConstructorDef, DataDeclaration, Declaration, LlmFunction, Module,
    TermDeclaration, LLM_PREFIX,
};
pub use sysf_lexer::Span;
pub use term::{Branch, Pattern, Term};
pub use types::{fresh_name, Type};
