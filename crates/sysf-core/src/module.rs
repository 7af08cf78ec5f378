use crate::{ElabError, Term, Type};
use smol_str::SmolStr;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;
use sysf_lexer::Span;

// ── Declarations ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Data(DataDeclaration),
    Term(TermDeclaration),
    PrimType(SmolStr),
    PrimOp { name: SmolStr, ty: Type },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataDeclaration {
    pub name: SmolStr,
    pub type_params: Vec<SmolStr>,
    pub constructors: Vec<ConstructorDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDef {
    pub name: SmolStr,
    pub args: Vec<Type>,
}

impl DataDeclaration {
    /// `T p1 ... pn`
    pub fn result_type(&self) -> Type {
        Type::constructor(
            self.name.clone(),
            self.type_params.iter().cloned().map(Type::Var).collect(),
        )
    }

    /// `forall p1 ... pn. arg1 -> ... -> argk -> T p1 ... pn`
    pub fn constructor_type(&self, constructor: &ConstructorDef) -> Type {
        Type::foralls(
            &self.type_params,
            Type::arrows(constructor.args.iter().cloned(), self.result_type()),
        )
    }

    /// True when every constructor is nullary, so a value is just a tag.
    pub fn is_enumeration(&self) -> bool {
        self.constructors.iter().all(|c| c.args.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermDeclaration {
    pub name: SmolStr,
    pub type_annotation: Option<Type>,
    pub body: Rc<Term>,
    pub pragma: BTreeMap<SmolStr, String>,
    pub docstring: Option<String>,
    pub param_docstrings: Vec<(SmolStr, String)>,
    pub span: Span,
}

/// Metadata recorded for a declaration carrying the `LLM` pragma. Its body
/// has been replaced by `PrimOp("llm.<name>")`.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmFunction {
    pub name: SmolStr,
    pub docstring: Option<String>,
    pub param_docstrings: Vec<(SmolStr, String)>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub param_type: Type,
    pub return_type: Type,
}

impl LlmFunction {
    pub fn primitive_name(&self) -> SmolStr {
        llm_primitive_name(&self.name)
    }
}

pub const LLM_PREFIX: &str = "llm.";

pub fn llm_primitive_name(name: &str) -> SmolStr {
    SmolStr::new(format!("{}{}", LLM_PREFIX, name))
}

// ── Module ────────────────────────────────────────────────────────

/// Output of elaboration: core declarations plus the tables the checker and
/// evaluator are seeded from.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub declarations: Vec<Declaration>,
    /// Every known data type, built-ins included.
    pub data_types: HashMap<SmolStr, DataDeclaration>,
    pub constructor_types: HashMap<SmolStr, Type>,
    /// Annotated (or synthesised) types of term declarations.
    pub global_types: HashMap<SmolStr, Type>,
    /// Types of primitive operations, including `llm.<name>`.
    pub primitive_types: HashMap<SmolStr, Type>,
    pub primitive_type_names: HashSet<SmolStr>,
    pub llm_functions: HashMap<SmolStr, LlmFunction>,
    pub errors: Vec<ElabError>,
    pub warnings: Vec<String>,
}

impl Module {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn term_declarations(&self) -> impl Iterator<Item = &TermDeclaration> {
        self.declarations.iter().filter_map(|d| match d {
            Declaration::Term(t) => Some(t),
            _ => None,
        })
    }

    pub fn term_declaration(&self, name: &str) -> Option<&TermDeclaration> {
        self.term_declarations().find(|d| d.name == name)
    }

    /// Number of fields a constructor takes.
    pub fn constructor_arity(&self, name: &str) -> Option<usize> {
        let ty = self.constructor_types.get(name)?;
        let (_, body) = ty.split_foralls();
        Some(body.split_arrows().0.len())
    }

    /// The data type that declares `constructor`.
    pub fn data_type_of(&self, constructor: &str) -> Option<&DataDeclaration> {
        self.data_types
            .values()
            .find(|d| d.constructors.iter().any(|c| c.name == constructor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_decl() -> DataDeclaration {
        DataDeclaration {
            name: "List".into(),
            type_params: vec!["a".into()],
            constructors: vec![
                ConstructorDef {
                    name: "Nil".into(),
                    args: vec![],
                },
                ConstructorDef {
                    name: "Cons".into(),
                    args: vec![
                        Type::var("a"),
                        Type::constructor("List", vec![Type::var("a")]),
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_constructor_types() {
        let decl = list_decl();
        assert_eq!(
            decl.constructor_type(&decl.constructors[0]).to_string(),
            "(forall 'a (List 'a))"
        );
        assert_eq!(
            decl.constructor_type(&decl.constructors[1]).to_string(),
            "(forall 'a (-> 'a (List 'a) (List 'a)))"
        );
        assert!(!decl.is_enumeration());
    }

    #[test]
    fn test_constructor_arity_and_owner() {
        let decl = list_decl();
        let mut module = Module::default();
        for c in &decl.constructors {
            module
                .constructor_types
                .insert(c.name.clone(), decl.constructor_type(c));
        }
        module.data_types.insert(decl.name.clone(), decl);
        assert_eq!(module.constructor_arity("Nil"), Some(0));
        assert_eq!(module.constructor_arity("Cons"), Some(2));
        assert_eq!(module.constructor_arity("Leaf"), None);
        assert_eq!(
            module.data_type_of("Cons").map(|d| d.name.as_str()),
            Some("List")
        );
    }

    #[test]
    fn test_llm_primitive_name() {
        assert_eq!(llm_primitive_name("translate"), "llm.translate");
    }
}
