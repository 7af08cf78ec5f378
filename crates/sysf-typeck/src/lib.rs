//! Type checking for elaborated System F modules: substitutions, first-order
//! unification with an occurs check, and a bidirectional checker.

mod checker;
mod context;
mod error;
mod unify;

pub use checker::TypeChecker;
pub use context::Context;
pub use error::TypeError;
pub use unify::{occurs_in, unify, unify_rigid, Substitution};

use smol_str::SmolStr;
use std::collections::HashMap;
use sysf_core::{Module, Type};

/// Check every term declaration of `module` with a fresh [`TypeChecker`].
pub fn check_program(module: &Module) -> Result<HashMap<SmolStr, Type>, TypeError> {
    TypeChecker::new(module).check_program(module)
}
