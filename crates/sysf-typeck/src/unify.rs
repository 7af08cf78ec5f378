use crate::TypeError;
use log::trace;
use smol_str::SmolStr;
use std::collections::BTreeMap;
use sysf_core::{fresh_name, Type};

/// An immutable mapping from type-variable names to types.
///
/// A substitution is a sequence of layers applied first to last, so
/// `s1.compose(&s2)` is exactly `s2` followed by `s1`, even under binders that
/// shadow one of the mapped names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    layers: Vec<BTreeMap<SmolStr, Type>>,
}

impl Substitution {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn singleton(var: impl Into<SmolStr>, ty: Type) -> Self {
        let mut map = BTreeMap::new();
        map.insert(var.into(), ty);
        Self { layers: vec![map] }
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn apply(&self, ty: &Type) -> Type {
        self.layers
            .iter()
            .fold(ty.clone(), |ty, layer| apply_layer(layer, &ty))
    }

    /// The substitution that applies `other` first, then `self`.
    pub fn compose(&self, other: &Substitution) -> Substitution {
        Substitution {
            layers: other
                .layers
                .iter()
                .chain(self.layers.iter())
                .cloned()
                .collect(),
        }
    }
}

impl FromIterator<(SmolStr, Type)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (SmolStr, Type)>>(iter: I) -> Self {
        let map: BTreeMap<SmolStr, Type> = iter.into_iter().collect();
        if map.is_empty() {
            Self::empty()
        } else {
            Self { layers: vec![map] }
        }
    }
}

/// Simultaneous substitution of one layer. A `Forall` drops the mapping for
/// its own variable before descending, and is renamed if it would capture a
/// free variable of a replacement.
fn apply_layer(layer: &BTreeMap<SmolStr, Type>, ty: &Type) -> Type {
    match ty {
        Type::Var(name) => layer.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Type::Arrow(param, ret) => Type::arrow(apply_layer(layer, param), apply_layer(layer, ret)),
        Type::Forall(var, body) => {
            let mut inner = layer.clone();
            inner.remove(var);
            let body_vars = body.free_vars();
            let captures = inner
                .iter()
                .any(|(k, v)| body_vars.contains(k) && occurs_in(var, v));
            if captures {
                let mut avoid = body_vars;
                avoid.extend(inner.keys().cloned());
                for v in inner.values() {
                    avoid.extend(v.free_vars());
                }
                let fresh = fresh_name(var, &avoid);
                let renamed = body.substitute(var, &Type::Var(fresh.clone()));
                Type::forall(fresh, apply_layer(&inner, &renamed))
            } else {
                Type::forall(var.clone(), apply_layer(&inner, body))
            }
        }
        Type::Constructor(name, args) => Type::Constructor(
            name.clone(),
            args.iter().map(|a| apply_layer(layer, a)).collect(),
        ),
        Type::Primitive(_) => ty.clone(),
    }
}

/// Does `var` occur free in `ty`? An occurrence bound by an inner `Forall`
/// of the same name does not count.
pub fn occurs_in(var: &str, ty: &Type) -> bool {
    match ty {
        Type::Var(name) => name == var,
        Type::Arrow(param, ret) => occurs_in(var, param) || occurs_in(var, ret),
        Type::Forall(bound, body) => bound != var && occurs_in(var, body),
        Type::Constructor(_, args) => args.iter().any(|a| occurs_in(var, a)),
        Type::Primitive(_) => false,
    }
}

/// Most general unifier of two types.
///
/// `forall` against `forall` unifies the bodies directly without relating
/// the bound names, so it is first-order only.
pub fn unify(t1: &Type, t2: &Type) -> Result<Substitution, TypeError> {
    unify_rigid(t1, t2, &|_: &str| false)
}

/// Like [`unify`], but a variable for which `rigid` holds is never bound: it
/// only unifies with itself or with a flexible variable.
pub fn unify_rigid(
    t1: &Type,
    t2: &Type,
    rigid: &dyn Fn(&str) -> bool,
) -> Result<Substitution, TypeError> {
    trace!("unify {} ~ {}", t1, t2);
    match (t1, t2) {
        (Type::Var(a), Type::Var(b)) if a == b => Ok(Substitution::empty()),
        (Type::Var(var), other) if !rigid(var) => bind(var, other),
        (other, Type::Var(var)) if !rigid(var) => bind(var, other),
        (Type::Arrow(p1, r1), Type::Arrow(p2, r2)) => {
            let s1 = unify_rigid(p1, p2, rigid)?;
            let s2 = unify_rigid(&s1.apply(r1), &s1.apply(r2), rigid)?;
            Ok(s2.compose(&s1))
        }
        (Type::Forall(_, b1), Type::Forall(_, b2)) => unify_rigid(b1, b2, rigid),
        (Type::Constructor(n1, args1), Type::Constructor(n2, args2))
            if n1 == n2 && args1.len() == args2.len() =>
        {
            let mut subst = Substitution::empty();
            for (a1, a2) in args1.iter().zip(args2) {
                let step = unify_rigid(&subst.apply(a1), &subst.apply(a2), rigid)?;
                subst = step.compose(&subst);
            }
            Ok(subst)
        }
        (Type::Primitive(a), Type::Primitive(b)) if a == b => Ok(Substitution::empty()),
        _ => Err(TypeError::Unification {
            left: t1.clone(),
            right: t2.clone(),
        }),
    }
}

fn bind(var: &SmolStr, ty: &Type) -> Result<Substitution, TypeError> {
    if occurs_in(var, ty) {
        return Err(TypeError::OccursCheck {
            var: var.clone(),
            ty: ty.clone(),
        });
    }
    Ok(Substitution::singleton(var.clone(), ty.clone()))
}
