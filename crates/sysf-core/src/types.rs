use smol_str::SmolStr;
use std::collections::BTreeSet;
use std::fmt;

/// A System F type. Structurally compared; bound variables are named.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Type variable, either bound by a `Forall` or a meta variable (`_t0`).
    Var(SmolStr),
    Arrow(Box<Type>, Box<Type>),
    Forall(SmolStr, Box<Type>),
    /// Data type applied to its arguments: `(List Int)`, `Bool`.
    Constructor(SmolStr, Vec<Type>),
    /// Opaque host type: `Int`, `String`, or a `prim-type` declaration.
    Primitive(SmolStr),
}

impl Type {
    pub fn var(name: impl Into<SmolStr>) -> Type {
        Type::Var(name.into())
    }

    pub fn arrow(param: Type, ret: Type) -> Type {
        Type::Arrow(Box::new(param), Box::new(ret))
    }

    pub fn forall(var: impl Into<SmolStr>, body: Type) -> Type {
        Type::Forall(var.into(), Box::new(body))
    }

    pub fn constructor(name: impl Into<SmolStr>, args: Vec<Type>) -> Type {
        Type::Constructor(name.into(), args)
    }

    pub fn primitive(name: impl Into<SmolStr>) -> Type {
        Type::Primitive(name.into())
    }

    pub fn int() -> Type {
        Type::primitive("Int")
    }

    pub fn string() -> Type {
        Type::primitive("String")
    }

    pub fn bool() -> Type {
        Type::constructor("Bool", Vec::new())
    }

    /// `p1 -> p2 -> ... -> ret`
    pub fn arrows<I>(params: I, ret: Type) -> Type
    where
        I: IntoIterator<Item = Type>,
        I::IntoIter: DoubleEndedIterator,
    {
        params
            .into_iter()
            .rev()
            .fold(ret, |acc, param| Type::arrow(param, acc))
    }

    /// Wrap `body` in one `Forall` per variable, outermost first.
    pub fn foralls(vars: &[SmolStr], body: Type) -> Type {
        vars.iter()
            .rev()
            .fold(body, |acc, var| Type::forall(var.clone(), acc))
    }

    /// Leading bound variables and the remaining body.
    pub fn split_foralls(&self) -> (Vec<SmolStr>, &Type) {
        let mut vars = Vec::new();
        let mut ty = self;
        while let Type::Forall(var, body) = ty {
            vars.push(var.clone());
            ty = body;
        }
        (vars, ty)
    }

    /// Parameter types of the arrow chain and its final result.
    pub fn split_arrows(&self) -> (Vec<&Type>, &Type) {
        let mut params = Vec::new();
        let mut ty = self;
        while let Type::Arrow(param, ret) = ty {
            params.push(param.as_ref());
            ty = ret;
        }
        (params, ty)
    }

    pub fn free_vars(&self) -> BTreeSet<SmolStr> {
        let mut vars = BTreeSet::new();
        self.collect_free_vars(&mut Vec::new(), &mut vars);
        vars
    }

    fn collect_free_vars(&self, bound: &mut Vec<SmolStr>, out: &mut BTreeSet<SmolStr>) {
        match self {
            Type::Var(name) => {
                if !bound.contains(name) {
                    out.insert(name.clone());
                }
            }
            Type::Arrow(param, ret) => {
                param.collect_free_vars(bound, out);
                ret.collect_free_vars(bound, out);
            }
            Type::Forall(var, body) => {
                bound.push(var.clone());
                body.collect_free_vars(bound, out);
                bound.pop();
            }
            Type::Constructor(_, args) => {
                for arg in args {
                    arg.collect_free_vars(bound, out);
                }
            }
            Type::Primitive(_) => {}
        }
    }

    /// Replace free occurrences of `var` with `replacement`.
    ///
    /// A `Forall` binding the same name shadows `var` and is left untouched.
    /// A binder that would capture a free variable of `replacement` is
    /// renamed first.
    pub fn substitute(&self, var: &str, replacement: &Type) -> Type {
        match self {
            Type::Var(name) if name == var => replacement.clone(),
            Type::Var(_) | Type::Primitive(_) => self.clone(),
            Type::Arrow(param, ret) => Type::arrow(
                param.substitute(var, replacement),
                ret.substitute(var, replacement),
            ),
            Type::Forall(bound, _) if bound == var => self.clone(),
            Type::Forall(bound, body) => {
                let replacement_vars = replacement.free_vars();
                if replacement_vars.contains(bound) && body.free_vars().contains(var) {
                    let mut avoid = replacement_vars;
                    avoid.extend(body.free_vars());
                    let fresh = fresh_name(bound, &avoid);
                    let renamed = body.substitute(bound, &Type::Var(fresh.clone()));
                    Type::forall(fresh, renamed.substitute(var, replacement))
                } else {
                    Type::forall(bound.clone(), body.substitute(var, replacement))
                }
            }
            Type::Constructor(name, args) => Type::Constructor(
                name.clone(),
                args.iter()
                    .map(|a| a.substitute(var, replacement))
                    .collect(),
            ),
        }
    }
}

/// `base`, primed until it avoids every name in `avoid`.
pub fn fresh_name(base: &str, avoid: &BTreeSet<SmolStr>) -> SmolStr {
    let mut candidate = format!("{}'", base);
    while avoid.contains(candidate.as_str()) {
        candidate.push('\'');
    }
    SmolStr::new(candidate)
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Var(name) => write!(f, "'{}", name),
            Type::Primitive(name) => write!(f, "{}", name),
            Type::Arrow(..) => {
                let (params, ret) = self.split_arrows();
                write!(f, "(->")?;
                for param in params {
                    write!(f, " {}", param)?;
                }
                write!(f, " {})", ret)
            }
            Type::Forall(var, body) => write!(f, "(forall '{} {})", var, body),
            Type::Constructor(name, args) if args.is_empty() => write!(f, "{}", name),
            Type::Constructor(name, args) => {
                write!(f, "({}", name)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(elem: Type) -> Type {
        Type::constructor("List", vec![elem])
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::int().to_string(), "Int");
        assert_eq!(Type::var("a").to_string(), "'a");
        assert_eq!(list(Type::int()).to_string(), "(List Int)");
        assert_eq!(Type::bool().to_string(), "Bool");
        let id = Type::forall("a", Type::arrow(Type::var("a"), Type::var("a")));
        assert_eq!(id.to_string(), "(forall 'a (-> 'a 'a))");
        let add = Type::arrows([Type::int(), Type::int()], Type::int());
        assert_eq!(add.to_string(), "(-> Int Int Int)");
        let higher = Type::arrow(Type::arrow(Type::int(), Type::int()), Type::int());
        assert_eq!(higher.to_string(), "(-> (-> Int Int) Int)");
    }

    #[test]
    fn test_free_vars_excludes_bound() {
        let ty = Type::forall("a", Type::arrow(Type::var("a"), Type::var("b")));
        let free: Vec<_> = ty.free_vars().into_iter().collect();
        assert_eq!(free, vec![SmolStr::new("b")]);
    }

    #[test]
    fn test_substitute_respects_shadowing() {
        let ty = Type::forall("a", Type::var("a"));
        assert_eq!(ty.substitute("a", &Type::int()), ty);
    }

    #[test]
    fn test_substitute_free_occurrence() {
        let ty = Type::arrow(Type::var("a"), list(Type::var("a")));
        assert_eq!(
            ty.substitute("a", &Type::int()),
            Type::arrow(Type::int(), list(Type::int()))
        );
    }

    #[test]
    fn test_substitute_avoids_capture() {
        // (forall 'b (-> 'a 'b))[a := 'b] must not capture the free 'b.
        let ty = Type::forall("b", Type::arrow(Type::var("a"), Type::var("b")));
        let result = ty.substitute("a", &Type::var("b"));
        assert_eq!(
            result,
            Type::forall("b'", Type::arrow(Type::var("b"), Type::var("b'")))
        );
        assert!(result.free_vars().contains("b"));
    }

    #[test]
    fn test_split_helpers() {
        let ty = Type::forall(
            "a",
            Type::arrows([Type::var("a"), list(Type::var("a"))], list(Type::var("a"))),
        );
        let (vars, body) = ty.split_foralls();
        assert_eq!(vars, vec![SmolStr::new("a")]);
        let (params, ret) = body.split_arrows();
        assert_eq!(params.len(), 2);
        assert_eq!(ret, &list(Type::var("a")));
        assert_eq!(Type::foralls(&vars, body.clone()), ty);
    }
}
