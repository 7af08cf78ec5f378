use crate::{unify_rigid, Context, Substitution, TypeError};
use log::debug;
use smol_str::SmolStr;
use std::collections::HashMap;
use sysf_core::{Module, Term, TermDeclaration, Type};

type Result<T> = std::result::Result<T, TypeError>;

/// Bidirectional checker over core terms. Holds the constructor, primitive
/// and global type tables; meta variables `_t0, _t1, ...` are numbered per
/// checker.
///
/// Everything learned about meta variables accumulates in one substitution
/// shared by all declarations. Type variables bound by a type abstraction
/// are rigid: they unify only with themselves or with a meta.
pub struct TypeChecker {
    constructor_types: HashMap<SmolStr, Type>,
    primitive_types: HashMap<SmolStr, Type>,
    global_types: HashMap<SmolStr, Type>,
    subst: Substitution,
    next_meta: usize,
}

impl TypeChecker {
    pub fn new(module: &Module) -> Self {
        Self {
            constructor_types: module.constructor_types.clone(),
            primitive_types: module.primitive_types.clone(),
            global_types: module.global_types.clone(),
            subst: Substitution::empty(),
            next_meta: 0,
        }
    }

    pub fn fresh_meta(&mut self) -> Type {
        let ty = Type::Var(SmolStr::new(format!("_t{}", self.next_meta)));
        self.next_meta += 1;
        ty
    }

    /// The type of a global with every solved meta filled in.
    pub fn global_type(&self, name: &str) -> Option<Type> {
        self.global_types.get(name).map(|ty| self.subst.apply(ty))
    }

    /// `ty` with every meta solved so far filled in.
    pub fn resolve(&self, ty: &Type) -> Type {
        self.subst.apply(ty)
    }

    /// Replace each leading `forall` with a fresh meta variable.
    fn instantiate(&mut self, ty: &Type) -> Type {
        let mut ty = ty.clone();
        while let Type::Forall(var, body) = &ty {
            let meta = self.fresh_meta();
            ty = body.substitute(var, &meta);
        }
        ty
    }

    fn constructor_type(&self, name: &SmolStr) -> Result<Type> {
        self.constructor_types
            .get(name)
            .cloned()
            .ok_or_else(|| TypeError::UndefinedConstructor(name.clone()))
    }

    /// Unify under the current substitution and record the result. Type
    /// variables bound in `ctx` stay rigid.
    fn unify(&mut self, ctx: &Context, left: &Type, right: &Type) -> Result<()> {
        let left = self.subst.apply(left);
        let right = self.subst.apply(right);
        let step = unify_rigid(&left, &right, &|var: &str| ctx.has_type_var(var))?;
        if !step.is_empty() {
            self.subst = step.compose(&self.subst);
        }
        Ok(())
    }

    /// [`Self::unify`], reporting a failure as `expected` versus `actual`.
    fn expect_type(&mut self, ctx: &Context, expected: &Type, actual: &Type) -> Result<()> {
        match self.unify(ctx, expected, actual) {
            Err(TypeError::Unification { .. }) => Err(TypeError::TypeMismatch {
                expected: self.subst.apply(expected),
                actual: self.subst.apply(actual),
            }),
            result => result,
        }
    }

    // ── Programs ──────────────────────────────────────────────────

    /// Check every term declaration in order and return the final types.
    ///
    /// Each name gets a placeholder type (its annotation, or a fresh meta)
    /// before its body is checked, so declarations may refer to themselves.
    /// An unannotated placeholder must agree with the type finally inferred.
    pub fn check_program(&mut self, module: &Module) -> Result<HashMap<SmolStr, Type>> {
        let mut types = HashMap::new();
        for decl in module.term_declarations() {
            let placeholder = match &decl.type_annotation {
                Some(ty) => ty.clone(),
                None => self.fresh_meta(),
            };
            self.global_types.insert(decl.name.clone(), placeholder.clone());

            let ty = self
                .check_declaration(decl, &placeholder)
                .map_err(|e| TypeError::InDeclaration {
                    name: decl.name.clone(),
                    source: Box::new(e),
                })?;
            debug!("{} : {}", decl.name, ty);
            self.global_types.insert(decl.name.clone(), ty.clone());
            types.insert(decl.name.clone(), ty);
        }
        // Later declarations may have solved metas left in earlier ones.
        for ty in types.values_mut() {
            *ty = self.subst.apply(ty);
        }
        Ok(types)
    }

    fn check_declaration(&mut self, decl: &TermDeclaration, placeholder: &Type) -> Result<Type> {
        let ctx = Context::empty();
        match &decl.type_annotation {
            Some(ty) => {
                self.check(&ctx, &decl.body, ty)?;
                Ok(ty.clone())
            }
            None => {
                let ty = self.infer(&ctx, &decl.body)?;
                self.expect_type(&ctx, placeholder, &ty)?;
                Ok(self.subst.apply(&ty))
            }
        }
    }

    // ── Checking ──────────────────────────────────────────────────

    pub fn check(&mut self, ctx: &Context, term: &Term, expected: &Type) -> Result<()> {
        let expected = self.subst.apply(expected);
        match (term, &expected) {
            (Term::Abs { param_type, body }, Type::Arrow(domain, codomain)) => {
                let param = match param_type {
                    Some(declared) => {
                        self.expect_type(ctx, domain, declared)?;
                        declared.clone()
                    }
                    None => domain.as_ref().clone(),
                };
                self.check(&ctx.extend_term(param), body, codomain)
            }

            (Term::TAbs { var, body }, Type::Forall(expected_var, expected_body)) => {
                let expected_body = if var == expected_var {
                    expected_body.as_ref().clone()
                } else {
                    expected_body.substitute(expected_var, &Type::Var(var.clone()))
                };
                self.check(&ctx.extend_type(var.clone()), body, &expected_body)
            }

            _ => {
                let actual = self.infer(ctx, term)?;
                self.expect_type(ctx, &expected, &actual)
            }
        }
    }

    // ── Inference ─────────────────────────────────────────────────

    pub fn infer(&mut self, ctx: &Context, term: &Term) -> Result<Type> {
        match term {
            Term::Var(index) => ctx
                .lookup_type(*index)
                .map(|ty| self.subst.apply(ty))
                .ok_or_else(|| TypeError::UndefinedVariable(SmolStr::new(format!("#{}", index)))),

            Term::Global(name) => self
                .global_type(name)
                .ok_or_else(|| TypeError::UndefinedVariable(name.clone())),

            Term::Abs {
                param_type: Some(param),
                body,
            } => {
                let body_ty = self.infer(&ctx.extend_term(param.clone()), body)?;
                Ok(self.subst.apply(&Type::arrow(param.clone(), body_ty)))
            }
            Term::Abs {
                param_type: None, ..
            } => Err(TypeError::Other(
                "cannot infer the type of a lambda without a parameter annotation".into(),
            )),

            Term::App(func, arg) => self.infer_app(ctx, func, arg),

            Term::TAbs { var, body } => {
                let body_ty = self.infer(&ctx.extend_type(var.clone()), body)?;
                Ok(Type::forall(var.clone(), body_ty))
            }

            Term::TApp(func, type_arg) => {
                // A bare constructor is looked up directly instead of being
                // instantiated with metas by `infer`.
                let func_ty = match func.as_ref() {
                    Term::Constructor(name, args) if args.is_empty() => {
                        self.constructor_type(name)?
                    }
                    _ => self.infer(ctx, func)?,
                };
                match func_ty {
                    Type::Forall(var, body) => Ok(body.substitute(&var, type_arg)),
                    other => Err(TypeError::Other(format!(
                        "cannot apply type argument {} to a term of type {}",
                        type_arg, other
                    ))),
                }
            }

            Term::Constructor(name, args) => {
                let ty = self.constructor_type(name)?;
                let ty = self.instantiate(&ty);
                let (params, result) = ty.split_arrows();
                if args.len() > params.len() {
                    return Err(TypeError::Other(format!(
                        "constructor {} takes {} arguments but {} were given",
                        name,
                        params.len(),
                        args.len()
                    )));
                }
                for (arg, param) in args.iter().zip(&params) {
                    self.check(ctx, arg, param)?;
                }
                let remaining = params[args.len()..].iter().map(|&p| p.clone());
                Ok(self.subst.apply(&Type::arrows(remaining, result.clone())))
            }

            Term::Case(scrutinee, branches) => self.infer_case(ctx, scrutinee, branches),

            Term::Let { value, body, .. } => {
                let value_ty = self.infer(ctx, value)?;
                self.infer(&ctx.extend_term(value_ty), body)
            }

            Term::IntLit(_) => Ok(Type::int()),
            Term::StringLit(_) => Ok(Type::string()),

            Term::PrimOp(name) => self
                .primitive_types
                .get(name)
                .cloned()
                .ok_or_else(|| TypeError::UndefinedVariable(name.clone())),

            // Tool signatures belong to the host.
            Term::ToolCall(_, args) => {
                for arg in args {
                    self.infer(ctx, arg)?;
                }
                Ok(self.fresh_meta())
            }
        }
    }

    fn infer_app(&mut self, ctx: &Context, func: &Term, arg: &Term) -> Result<Type> {
        let func_ty = self.infer(ctx, func)?;
        match &func_ty {
            Type::Arrow(domain, codomain) => {
                self.check(ctx, arg, domain)?;
                Ok(self.subst.apply(codomain))
            }
            // An unresolved meta (a placeholder or tool result) becomes an arrow.
            Type::Var(var) if !ctx.has_type_var(var) => {
                let domain = self.fresh_meta();
                let codomain = self.fresh_meta();
                self.unify(ctx, &func_ty, &Type::arrow(domain.clone(), codomain.clone()))?;
                self.check(ctx, arg, &domain)?;
                Ok(self.subst.apply(&codomain))
            }
            _ => Err(TypeError::TypeMismatch {
                expected: Type::arrow(self.fresh_meta(), self.fresh_meta()),
                actual: func_ty,
            }),
        }
    }

    fn infer_case(
        &mut self,
        ctx: &Context,
        scrutinee: &Term,
        branches: &[sysf_core::Branch],
    ) -> Result<Type> {
        if branches.is_empty() {
            return Err(TypeError::Other("case expression has no branches".into()));
        }
        let scrutinee_ty = self.infer(ctx, scrutinee)?;

        let mut result: Option<Type> = None;
        for branch in branches {
            let pattern = &branch.pattern;
            let ty = self.constructor_type(&pattern.constructor)?;
            let ty = self.instantiate(&ty);
            let (params, constructed) = ty.split_arrows();
            if params.len() != pattern.vars.len() {
                return Err(TypeError::Other(format!(
                    "pattern {} binds {} variables but the constructor has {} fields",
                    pattern.constructor,
                    pattern.vars.len(),
                    params.len()
                )));
            }

            self.unify(ctx, constructed, &scrutinee_ty)?;
            // Extended last-first so the first pattern variable is index 0.
            let branch_ctx = params
                .iter()
                .rev()
                .fold(ctx.clone(), |acc, param| acc.extend_term(self.subst.apply(param)));
            let body_ty = self.infer(&branch_ctx, &branch.body)?;

            result = Some(match result {
                None => body_ty,
                Some(previous) => {
                    self.unify(ctx, &previous, &body_ty)?;
                    self.subst.apply(&previous)
                }
            });
        }
        result.ok_or_else(|| TypeError::Other("case expression has no branches".into()))
    }
}
