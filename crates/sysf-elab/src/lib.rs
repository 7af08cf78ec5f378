//! Elaboration: resolves the names of a [`SurfaceModule`] and produces a core
//! [`Module`] with de Bruijn-indexed terms and the global tables the type
//! checker and evaluator are seeded from.
//!
//! Declarations are processed in order. A declaration that fails is dropped
//! and its error recorded in [`Module::errors`]; elaboration then continues
//! with the next one, so every scope error in a file is reported at once.

mod builtins;

pub use builtins::{bool_declaration, primitive_ops, PRIMITIVE_TYPES};
pub use sysf_core::ElabError;

use log::{debug, trace};
use smol_str::SmolStr;
use std::collections::HashSet;
use std::rc::Rc;
use sysf_ast::{
    ops, SurfaceBranch, SurfaceDataDeclaration, SurfaceDeclaration, SurfaceModule,
    SurfacePrimOpDecl, SurfaceTermDeclaration, SurfaceTermKind, SurfaceTypeKind, TermId, TypeId,
};
use sysf_core::{
    llm_primitive_name, Branch, ConstructorDef, DataDeclaration, Declaration, LlmFunction, Module,
    Span, Term, TermDeclaration, Type,
};

type Result<T> = std::result::Result<T, ElabError>;

/// The pragma that turns a declaration into an LLM-backed primitive.
pub const LLM_PRAGMA: &str = "LLM";

/// Elaborate with a fresh [`Elaborator`].
pub fn elaborate(surface: &SurfaceModule) -> Module {
    Elaborator::new().elaborate(surface)
}

pub struct Elaborator {
    /// Term binders in scope, innermost last. A name's de Bruijn index is
    /// its distance from the end.
    term_vars: Vec<SmolStr>,
    type_vars: Vec<SmolStr>,
    globals: HashSet<SmolStr>,
    module: Module,
}

impl Default for Elaborator {
    fn default() -> Self {
        Self::new()
    }
}

impl Elaborator {
    /// An elaborator seeded with `Int`, `String`, `Bool` and the built-in
    /// primitive operations.
    pub fn new() -> Self {
        let mut module = Module::default();
        for name in PRIMITIVE_TYPES {
            module.primitive_type_names.insert(SmolStr::new(name));
        }
        for (name, ty) in primitive_ops() {
            module.primitive_types.insert(SmolStr::new(name), ty);
        }
        let bool_decl = bool_declaration();
        for c in &bool_decl.constructors {
            module
                .constructor_types
                .insert(c.name.clone(), bool_decl.constructor_type(c));
        }
        module.data_types.insert(bool_decl.name.clone(), bool_decl);

        Self {
            term_vars: Vec::new(),
            type_vars: Vec::new(),
            globals: HashSet::new(),
            module,
        }
    }

    pub fn elaborate(mut self, surface: &SurfaceModule) -> Module {
        for decl in &surface.declarations {
            self.term_vars.clear();
            self.type_vars.clear();
            let result = match decl {
                SurfaceDeclaration::Data(d) => self.elaborate_data(surface, d),
                SurfaceDeclaration::Term(d) => self.elaborate_term_declaration(surface, d),
                SurfaceDeclaration::PrimType(d) => {
                    if !self.module.primitive_type_names.insert(d.name.clone()) {
                        self.warn(format!("primitive type {} declared twice", d.name));
                    }
                    Ok(Some(Declaration::PrimType(d.name.clone())))
                }
                SurfaceDeclaration::PrimOp(d) => self.elaborate_prim_op(surface, d),
            };
            match result {
                Ok(Some(core)) => {
                    debug!("elaborated {}", decl.name());
                    self.module.declarations.push(core);
                }
                Ok(None) => {}
                Err(e) => {
                    debug!("rejected {}: {}", decl.name(), e);
                    self.module.errors.push(e);
                }
            }
        }
        self.module
    }

    fn warn(&mut self, message: String) {
        self.module.warnings.push(message);
    }

    // ── Scopes ────────────────────────────────────────────────────

    fn push_var(&mut self, name: SmolStr) {
        trace!("bind {} at depth {}", name, self.term_vars.len());
        self.term_vars.push(name);
    }

    fn pop_var(&mut self) {
        self.term_vars.pop();
    }

    fn resolve_name(&self, name: &SmolStr, span: Span) -> Result<Term> {
        if let Some(pos) = self.term_vars.iter().rposition(|v| v == name) {
            return Ok(Term::Var(self.term_vars.len() - 1 - pos));
        }
        if self.globals.contains(name) {
            return Ok(Term::Global(name.clone()));
        }
        if self.module.primitive_types.contains_key(name) {
            return Ok(Term::PrimOp(name.clone()));
        }
        if self.module.constructor_types.contains_key(name) {
            return Ok(Term::Constructor(name.clone(), Vec::new()));
        }
        Err(ElabError::UndefinedVariable {
            name: name.clone(),
            span,
        })
    }

    // ── Declarations ──────────────────────────────────────────────

    fn elaborate_data(
        &mut self,
        surface: &SurfaceModule,
        d: &SurfaceDataDeclaration,
    ) -> Result<Option<Declaration>> {
        // Register name and arity first so constructors can mention the type.
        // Constructor types are built from the elaborated argument types, so
        // they are registered last, all at once; a failure registers none.
        let placeholder = DataDeclaration {
            name: d.name.clone(),
            type_params: d.type_params.clone(),
            constructors: Vec::new(),
        };
        let previous = self.module.data_types.insert(d.name.clone(), placeholder);

        self.type_vars = d.type_params.clone();
        let constructors = d
            .constructors
            .iter()
            .map(|c| {
                let args = c
                    .args
                    .iter()
                    .map(|&t| self.elaborate_type(surface, t))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ConstructorDef {
                    name: c.name.clone(),
                    args,
                })
            })
            .collect::<Result<Vec<_>>>();
        self.type_vars.clear();

        let constructors = match constructors {
            Ok(constructors) => constructors,
            Err(e) => {
                match previous {
                    Some(prev) => self.module.data_types.insert(d.name.clone(), prev),
                    None => self.module.data_types.remove(&d.name),
                };
                return Err(e);
            }
        };

        let decl = DataDeclaration {
            name: d.name.clone(),
            type_params: d.type_params.clone(),
            constructors,
        };

        if let Some(prev) = previous {
            if prev == decl {
                self.module.data_types.insert(d.name.clone(), prev);
                return Ok(None);
            }
            self.warn(format!("data type {} redeclared", d.name));
            for c in &prev.constructors {
                self.module.constructor_types.remove(&c.name);
            }
        }

        for c in &decl.constructors {
            if let Some(owner) = self.module.data_type_of(&c.name) {
                let owner = owner.name.clone();
                self.warn(format!(
                    "constructor {} of {} shadows the one declared by {}",
                    c.name, decl.name, owner
                ));
            }
            self.module
                .constructor_types
                .insert(c.name.clone(), decl.constructor_type(c));
        }
        self.module.data_types.insert(d.name.clone(), decl.clone());
        Ok(Some(Declaration::Data(decl)))
    }

    fn elaborate_prim_op(
        &mut self,
        surface: &SurfaceModule,
        d: &SurfacePrimOpDecl,
    ) -> Result<Option<Declaration>> {
        let ty = self.elaborate_type(surface, d.type_ann)?;
        if self
            .module
            .primitive_types
            .insert(d.name.clone(), ty.clone())
            .is_some()
        {
            self.warn(format!("primitive {} redeclared", d.name));
        }
        Ok(Some(Declaration::PrimOp {
            name: d.name.clone(),
            ty,
        }))
    }

    fn elaborate_term_declaration(
        &mut self,
        surface: &SurfaceModule,
        d: &SurfaceTermDeclaration,
    ) -> Result<Option<Declaration>> {
        // Joining the globals before the body makes self-reference resolve.
        let newly_global = self.globals.insert(d.name.clone());
        if !newly_global {
            self.warn(format!("{} redeclared", d.name));
        }
        let result = self.elaborate_term_declaration_inner(surface, d);
        if result.is_err() && newly_global {
            self.globals.remove(&d.name);
        }
        result.map(Some)
    }

    fn elaborate_term_declaration_inner(
        &mut self,
        surface: &SurfaceModule,
        d: &SurfaceTermDeclaration,
    ) -> Result<Declaration> {
        let type_annotation = d
            .type_ann
            .map(|t| self.elaborate_type(surface, t))
            .transpose()?;

        for key in d.pragma.keys() {
            if key != LLM_PRAGMA {
                self.warn(format!("unknown pragma {} on {} ignored", key, d.name));
            }
        }
        if let Some(text) = d.pragma.get(LLM_PRAGMA) {
            return self.elaborate_llm_declaration(surface, d, type_annotation, text);
        }

        let body = self.elaborate_term(surface, d.body)?;
        if let Some(ty) = &type_annotation {
            self.module.global_types.insert(d.name.clone(), ty.clone());
        }
        Ok(Declaration::Term(TermDeclaration {
            name: d.name.clone(),
            type_annotation,
            body: Rc::new(body),
            pragma: d.pragma.clone(),
            docstring: d.docstring.clone(),
            param_docstrings: d.param_docstrings.clone(),
            span: d.span,
        }))
    }

    /// Records the metadata of an `LLM` declaration and replaces its body
    /// with `PrimOp("llm.<name>")`.
    fn elaborate_llm_declaration(
        &mut self,
        surface: &SurfaceModule,
        d: &SurfaceTermDeclaration,
        type_annotation: Option<Type>,
        pragma_text: &str,
    ) -> Result<Declaration> {
        let body = &surface.terms[d.body];
        let SurfaceTermKind::Abs { param_type, .. } = &body.kind else {
            return Err(ElabError::Elaboration {
                message: format!("LLM pragma on {} requires a lambda body", d.name),
                span: body.span,
            });
        };

        let ty = match (type_annotation, param_type) {
            (Some(ty), _) => ty,
            (None, Some(param_type)) => {
                let param = self.elaborate_type(surface, *param_type)?;
                Type::arrow(param.clone(), param)
            }
            (None, None) => {
                return Err(ElabError::Elaboration {
                    message: format!(
                        "LLM function {} needs a type annotation or an annotated parameter",
                        d.name
                    ),
                    span: d.span,
                })
            }
        };
        let (_, monotype) = ty.split_foralls();
        let Type::Arrow(param_type, return_type) = monotype else {
            return Err(ElabError::Elaboration {
                message: format!("LLM function {} must have a function type, not {}", d.name, ty),
                span: d.span,
            });
        };

        let (model, temperature) = self.parse_llm_settings(&d.name, pragma_text, d.span)?;
        let param_docstrings = if d.param_docstrings.is_empty() {
            lambda_param_docstrings(surface, d.body)
        } else {
            d.param_docstrings.clone()
        };

        let function = LlmFunction {
            name: d.name.clone(),
            docstring: d.docstring.clone(),
            param_docstrings: param_docstrings.clone(),
            model,
            temperature,
            param_type: param_type.as_ref().clone(),
            return_type: return_type.as_ref().clone(),
        };
        let primitive = llm_primitive_name(&d.name);
        debug!("{} is LLM-backed through {}", d.name, primitive);

        self.module.primitive_types.insert(primitive.clone(), ty.clone());
        self.module.global_types.insert(d.name.clone(), ty.clone());
        self.module.llm_functions.insert(d.name.clone(), function);

        Ok(Declaration::Term(TermDeclaration {
            name: d.name.clone(),
            type_annotation: Some(ty),
            body: Rc::new(Term::PrimOp(primitive)),
            pragma: d.pragma.clone(),
            docstring: d.docstring.clone(),
            param_docstrings,
            span: d.span,
        }))
    }

    /// `model=gpt-4o temperature=0.2`
    fn parse_llm_settings(
        &mut self,
        name: &str,
        text: &str,
        span: Span,
    ) -> Result<(Option<String>, Option<f64>)> {
        let mut model = None;
        let mut temperature = None;
        for setting in text.split_whitespace() {
            match setting.split_once('=') {
                Some(("model", value)) => model = Some(value.trim_matches('"').to_string()),
                Some(("temperature", value)) => {
                    let parsed = value.parse::<f64>().map_err(|_| ElabError::Elaboration {
                        message: format!("invalid temperature '{}' in LLM pragma of {}", value, name),
                        span,
                    })?;
                    temperature = Some(parsed);
                }
                _ => self.warn(format!(
                    "unknown LLM setting '{}' on {} ignored",
                    setting, name
                )),
            }
        }
        Ok((model, temperature))
    }

    // ── Terms ─────────────────────────────────────────────────────

    fn elaborate_term(&mut self, surface: &SurfaceModule, id: TermId) -> Result<Term> {
        let term = &surface.terms[id];
        let span = term.span;
        match &term.kind {
            SurfaceTermKind::Var(name) => self.resolve_name(name, span),

            SurfaceTermKind::Abs {
                param,
                param_type,
                body,
                ..
            } => {
                let param_type = param_type
                    .map(|t| self.elaborate_type(surface, t))
                    .transpose()?;
                self.push_var(param.clone());
                let body = self.elaborate_term(surface, *body);
                self.pop_var();
                Ok(Term::abs(param_type, body?))
            }

            SurfaceTermKind::App { func, arg } => {
                let func = self.elaborate_term(surface, *func)?;
                let arg = self.elaborate_term(surface, *arg)?;
                Ok(Term::app(func, arg))
            }

            SurfaceTermKind::TypeAbs { param, body } => {
                self.type_vars.push(param.clone());
                let body = self.elaborate_term(surface, *body);
                self.type_vars.pop();
                Ok(Term::tabs(param.clone(), body?))
            }

            SurfaceTermKind::TypeApp { func, type_arg } => {
                let func = self.elaborate_term(surface, *func)?;
                let type_arg = self.elaborate_type(surface, *type_arg)?;
                Ok(Term::tapp(func, type_arg))
            }

            SurfaceTermKind::Let { name, value, body } => {
                let value = self.elaborate_term(surface, *value)?;
                self.push_var(name.clone());
                let body = self.elaborate_term(surface, *body);
                self.pop_var();
                Ok(Term::let_in(name.clone(), value, body?))
            }

            // `(ann T e)` is `((fn (x : T) x) e)`.
            SurfaceTermKind::Ann { type_ann, term } => {
                let ty = self.elaborate_type(surface, *type_ann)?;
                let term = self.elaborate_term(surface, *term)?;
                Ok(Term::app(Term::abs(Some(ty), Term::Var(0)), term))
            }

            SurfaceTermKind::Constructor { name, args } => {
                if !self.module.constructor_types.contains_key(name) {
                    return Err(ElabError::UndefinedConstructor {
                        name: name.clone(),
                        span,
                    });
                }
                let args = args
                    .iter()
                    .map(|&a| self.elaborate_term(surface, a))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Term::Constructor(name.clone(), args))
            }

            SurfaceTermKind::Case {
                scrutinee,
                branches,
            } => {
                let scrutinee = self.elaborate_term(surface, *scrutinee)?;
                let branches = branches
                    .iter()
                    .map(|b| self.elaborate_branch(surface, b))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Term::case(scrutinee, branches))
            }

            SurfaceTermKind::ToolCall { tool, args } => {
                let args = args
                    .iter()
                    .map(|&a| self.elaborate_term(surface, a))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Term::ToolCall(tool.clone(), args))
            }

            SurfaceTermKind::IntLit(n) => Ok(Term::IntLit(*n)),
            SurfaceTermKind::StringLit(s) => Ok(Term::StringLit(s.clone())),

            SurfaceTermKind::Op { op, args } => {
                let Some(primitive) = ops::primitive_for(op, args.len()) else {
                    return Err(ElabError::Elaboration {
                        message: format!("operator {} cannot take {} operands", op, args.len()),
                        span,
                    });
                };
                if !self.module.primitive_types.contains_key(primitive) {
                    return Err(ElabError::UndefinedVariable {
                        name: primitive.into(),
                        span,
                    });
                }
                let mut result = Term::PrimOp(primitive.into());
                for &arg in args {
                    let arg = self.elaborate_term(surface, arg)?;
                    result = Term::app(result, arg);
                }
                Ok(result)
            }
        }
    }

    fn elaborate_branch(&mut self, surface: &SurfaceModule, branch: &SurfaceBranch) -> Result<Branch> {
        let pattern = &branch.pattern;
        let Some(arity) = self.module.constructor_arity(&pattern.constructor) else {
            return Err(ElabError::UndefinedConstructor {
                name: pattern.constructor.clone(),
                span: pattern.span,
            });
        };
        if arity != pattern.vars.len() {
            return Err(ElabError::Elaboration {
                message: format!(
                    "pattern {} binds {} variables but the constructor has {} fields",
                    pattern.constructor,
                    pattern.vars.len(),
                    arity
                ),
                span: pattern.span,
            });
        }

        // Pushed last-first so the first pattern variable is index 0.
        for var in pattern.vars.iter().rev() {
            self.push_var(var.clone());
        }
        let body = self.elaborate_term(surface, branch.body);
        for _ in &pattern.vars {
            self.pop_var();
        }
        Ok(Branch::new(
            pattern.constructor.clone(),
            pattern.vars.clone(),
            body?,
        ))
    }

    // ── Types ─────────────────────────────────────────────────────

    fn elaborate_type(&mut self, surface: &SurfaceModule, id: TypeId) -> Result<Type> {
        let ty = &surface.types[id];
        let span = ty.span;
        match &ty.kind {
            SurfaceTypeKind::Var(name) => {
                if self.type_vars.contains(name) {
                    Ok(Type::Var(name.clone()))
                } else {
                    Err(ElabError::UndefinedTypeVariable {
                        name: name.clone(),
                        span,
                    })
                }
            }
            SurfaceTypeKind::Named(name) => self.resolve_type_name(name, Vec::new(), span),
            SurfaceTypeKind::Arrow { param, ret } => {
                let param = self.elaborate_type(surface, *param)?;
                let ret = self.elaborate_type(surface, *ret)?;
                Ok(Type::arrow(param, ret))
            }
            SurfaceTypeKind::Forall { var, body } => {
                self.type_vars.push(var.clone());
                let body = self.elaborate_type(surface, *body);
                self.type_vars.pop();
                Ok(Type::forall(var.clone(), body?))
            }
            SurfaceTypeKind::Applied { name, args } => {
                let args = args
                    .iter()
                    .map(|&a| self.elaborate_type(surface, a))
                    .collect::<Result<Vec<_>>>()?;
                self.resolve_type_name(name, args, span)
            }
        }
    }

    fn resolve_type_name(&self, name: &SmolStr, args: Vec<Type>, span: Span) -> Result<Type> {
        if self.module.primitive_type_names.contains(name) {
            if !args.is_empty() {
                return Err(ElabError::Elaboration {
                    message: format!("primitive type {} takes no arguments", name),
                    span,
                });
            }
            return Ok(Type::Primitive(name.clone()));
        }
        if let Some(data) = self.module.data_types.get(name) {
            let expected = data.type_params.len();
            if expected != args.len() {
                return Err(ElabError::Elaboration {
                    message: format!(
                        "type {} expects {} arguments, got {}",
                        name,
                        expected,
                        args.len()
                    ),
                    span,
                });
            }
            return Ok(Type::Constructor(name.clone(), args));
        }
        Err(ElabError::UndefinedTypeVariable {
            name: name.clone(),
            span,
        })
    }
}

/// Docstrings attached to the parameters of a leading lambda chain.
fn lambda_param_docstrings(surface: &SurfaceModule, mut id: TermId) -> Vec<(SmolStr, String)> {
    let mut docs = Vec::new();
    while let SurfaceTermKind::Abs {
        param,
        param_docstring,
        body,
        ..
    } = &surface.terms[id].kind
    {
        if let Some(doc) = param_docstring {
            docs.push((param.clone(), doc.clone()));
        }
        id = *body;
    }
    docs
}
