use smol_str::SmolStr;
use sysf_core::{ConsList, Type};

/// Typing context: the types of bound term variables (index 0 is the most
/// recent binder) and the names of bound type variables.
///
/// Extending shares the existing bindings, so branches of a term can extend
/// the same context independently.
#[derive(Debug, Clone, Default)]
pub struct Context {
    terms: ConsList<Type>,
    type_vars: ConsList<SmolStr>,
}

impl Context {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Bind a new term variable at index 0, shifting every existing index by one.
    pub fn extend_term(&self, ty: Type) -> Context {
        Context {
            terms: self.terms.cons(ty),
            type_vars: self.type_vars.clone(),
        }
    }

    pub fn extend_type(&self, name: SmolStr) -> Context {
        Context {
            terms: self.terms.clone(),
            type_vars: self.type_vars.cons(name),
        }
    }

    pub fn lookup_type(&self, index: usize) -> Option<&Type> {
        self.terms.get(index)
    }

    pub fn has_type_var(&self, name: &str) -> bool {
        self.type_vars.iter().any(|var| var == name)
    }

    pub fn depth(&self) -> usize {
        self.terms.len()
    }
}
