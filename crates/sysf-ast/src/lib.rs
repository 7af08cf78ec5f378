//! Surface AST: what the parser produces, before name resolution.
//!
//! Binders are still named here. The elaborator (`sysf-elab`) turns this into
//! the de Bruijn-indexed core terms of `sysf-core`.

pub mod ops;

use la_arena::{Arena, Idx};
use smol_str::SmolStr;
use std::collections::BTreeMap;
pub use sysf_lexer::Span;

// ── ID types ──────────────────────────────────────────────────────

pub type TermId = Idx<SurfaceTerm>;
pub type TypeId = Idx<SurfaceType>;

// ── Module ────────────────────────────────────────────────────────

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct SurfaceModule {
    pub declarations: Vec<SurfaceDeclaration>,
    pub terms: Arena<SurfaceTerm>,
    pub types: Arena<SurfaceType>,
}

impl SurfaceModule {
    pub fn new() -> Self {
        Self {
            declarations: Vec::new(),
            terms: Arena::new(),
            types: Arena::new(),
        }
    }
}

impl Default for SurfaceModule {
    fn default() -> Self {
        Self::new()
    }
}

// ── Declarations ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SurfaceDeclaration {
    Data(SurfaceDataDeclaration),
    Term(SurfaceTermDeclaration),
    PrimType(SurfacePrimTypeDecl),
    PrimOp(SurfacePrimOpDecl),
}

impl SurfaceDeclaration {
    pub fn name(&self) -> &SmolStr {
        match self {
            SurfaceDeclaration::Data(d) => &d.name,
            SurfaceDeclaration::Term(d) => &d.name,
            SurfaceDeclaration::PrimType(d) => &d.name,
            SurfaceDeclaration::PrimOp(d) => &d.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            SurfaceDeclaration::Data(d) => d.span,
            SurfaceDeclaration::Term(d) => d.span,
            SurfaceDeclaration::PrimType(d) => d.span,
            SurfaceDeclaration::PrimOp(d) => d.span,
        }
    }
}

/// Data type: `(data (List 'a) Nil (Cons 'a (List 'a)))`
#[derive(Debug, Clone)]
pub struct SurfaceDataDeclaration {
    pub name: SmolStr,
    pub type_params: Vec<SmolStr>,
    pub constructors: Vec<SurfaceConstructorDef>,
    pub span: Span,
}

/// One constructor of a data type: `(Cons 'a (List 'a))`
#[derive(Debug, Clone)]
pub struct SurfaceConstructorDef {
    pub name: SmolStr,
    pub args: Vec<TypeId>,
    pub span: Span,
}

/// Term definition: `(def name : type "doc" {-# LLM #-} body)`
#[derive(Debug, Clone)]
pub struct SurfaceTermDeclaration {
    pub name: SmolStr,
    pub type_ann: Option<TypeId>,
    pub body: TermId,
    /// Pragma name → raw pragma text, e.g. `LLM` → `model=gpt-4o`.
    pub pragma: BTreeMap<SmolStr, String>,
    pub docstring: Option<String>,
    /// Parameter name → docstring, for the leading lambda chain of the body.
    pub param_docstrings: Vec<(SmolStr, String)>,
    pub span: Span,
}

/// Primitive type: `(prim-type Float)`
#[derive(Debug, Clone)]
pub struct SurfacePrimTypeDecl {
    pub name: SmolStr,
    pub span: Span,
}

/// Primitive operation signature: `(prim-op $prim.float_add : (-> Float Float Float))`
#[derive(Debug, Clone)]
pub struct SurfacePrimOpDecl {
    pub name: SmolStr,
    pub type_ann: TypeId,
    pub span: Span,
}

// ── Terms ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SurfaceTerm {
    pub kind: SurfaceTermKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum SurfaceTermKind {
    /// Variable, global or primitive reference.
    Var(SmolStr),
    /// Lambda: `(fn (x : T "doc") body)`
    Abs {
        param: SmolStr,
        param_type: Option<TypeId>,
        param_docstring: Option<String>,
        body: TermId,
    },
    /// Application: `(f a)`
    App { func: TermId, arg: TermId },
    /// Type abstraction: `(tfn 'a body)`
    TypeAbs { param: SmolStr, body: TermId },
    /// Type application: `(f @T)`
    TypeApp { func: TermId, type_arg: TypeId },
    /// `(let ((x value)) body)`
    Let {
        name: SmolStr,
        value: TermId,
        body: TermId,
    },
    /// Type annotation: `(ann T term)`
    Ann { type_ann: TypeId, term: TermId },
    /// Constructor application: `(Cons x xs)` or bare `Nil`
    Constructor { name: SmolStr, args: Vec<TermId> },
    /// `(case scrutinee (Pattern body)...)`
    Case {
        scrutinee: TermId,
        branches: Vec<SurfaceBranch>,
    },
    /// Host tool invocation: `(tool name args...)`
    ToolCall { tool: SmolStr, args: Vec<TermId> },
    IntLit(i64),
    StringLit(String),
    /// Operator application, desugared through [`ops::primitive_for`].
    Op { op: SmolStr, args: Vec<TermId> },
}

/// A case branch: `((Cons y ys) body)`
#[derive(Debug, Clone)]
pub struct SurfaceBranch {
    pub pattern: SurfacePattern,
    pub body: TermId,
    pub span: Span,
}

/// Flat constructor pattern binding one variable per field.
#[derive(Debug, Clone)]
pub struct SurfacePattern {
    pub constructor: SmolStr,
    pub vars: Vec<SmolStr>,
    pub span: Span,
}

// ── Types ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SurfaceType {
    pub kind: SurfaceTypeKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum SurfaceTypeKind {
    /// Type variable: `'a`
    Var(SmolStr),
    /// Named type: `Int`, `Bool`, `List`
    Named(SmolStr),
    /// Function type: `(-> A B)`; longer arrows are right-nested by the parser.
    Arrow { param: TypeId, ret: TypeId },
    /// `(forall 'a T)`
    Forall { var: SmolStr, body: TypeId },
    /// Applied type constructor: `(List 'a)`
    Applied { name: SmolStr, args: Vec<TypeId> },
}

// ── Pretty printer ────────────────────────────────────────────────

pub fn pretty_print(module: &SurfaceModule) -> String {
    let mut printer = PrettyPrinter {
        module,
        buf: String::new(),
        indent: 0,
    };
    printer.print_module();
    printer.buf
}

struct PrettyPrinter<'a> {
    module: &'a SurfaceModule,
    buf: String,
    indent: usize,
}

impl<'a> PrettyPrinter<'a> {
    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.buf.push_str("  ");
        }
    }

    fn writeln(&mut self, s: &str) {
        self.write_indent();
        self.buf.push_str(s);
        self.buf.push('\n');
    }

    fn print_module(&mut self) {
        for decl in &self.module.declarations {
            self.print_declaration(decl);
        }
    }

    fn print_declaration(&mut self, decl: &SurfaceDeclaration) {
        match decl {
            SurfaceDeclaration::Data(d) => self.print_data(d),
            SurfaceDeclaration::Term(d) => self.print_def(d),
            SurfaceDeclaration::PrimType(d) => self.writeln(&format!("(prim-type {})", d.name)),
            SurfaceDeclaration::PrimOp(d) => {
                self.write_indent();
                self.buf.push_str(&format!("(prim-op {} : ", d.name));
                self.print_type(d.type_ann);
                self.buf.push_str(")\n");
            }
        }
    }

    fn print_data(&mut self, d: &SurfaceDataDeclaration) {
        let params = d
            .type_params
            .iter()
            .map(|p| format!(" '{}", p))
            .collect::<String>();
        self.writeln(&format!("(data {}{}", d.name, params));
        self.indent += 1;
        for c in &d.constructors {
            self.write_indent();
            self.buf.push_str(c.name.as_str());
            for &arg in &c.args {
                self.buf.push(' ');
                self.print_type(arg);
            }
            self.buf.push('\n');
        }
        self.indent -= 1;
        self.writeln(")");
    }

    fn print_def(&mut self, d: &SurfaceTermDeclaration) {
        self.writeln(&format!("(def {}", d.name));
        self.indent += 1;
        if let Some(ty) = d.type_ann {
            self.write_indent();
            self.buf.push_str("type: ");
            self.print_type(ty);
            self.buf.push('\n');
        }
        if let Some(ref doc) = d.docstring {
            self.writeln(&format!("doc: {:?}", doc));
        }
        for (name, text) in &d.pragma {
            self.writeln(&format!("pragma: {} {:?}", name, text));
        }
        for (param, doc) in &d.param_docstrings {
            self.writeln(&format!("param-doc: {} {:?}", param, doc));
        }
        self.write_indent();
        self.buf.push_str("body: ");
        self.print_term(d.body);
        self.buf.push('\n');
        self.indent -= 1;
        self.writeln(")");
    }

    fn print_term(&mut self, id: TermId) {
        let term = &self.module.terms[id];
        match &term.kind {
            SurfaceTermKind::Var(name) => self.buf.push_str(name),
            SurfaceTermKind::IntLit(n) => self.buf.push_str(&n.to_string()),
            SurfaceTermKind::StringLit(s) => self.buf.push_str(&format!("{:?}", s)),
            SurfaceTermKind::Abs {
                param,
                param_type,
                body,
                ..
            } => {
                self.buf.push_str(&format!("(fn {}", param));
                if let Some(t) = param_type {
                    self.buf.push_str(" : ");
                    self.print_type(*t);
                }
                self.buf.push_str(". ");
                self.print_term(*body);
                self.buf.push(')');
            }
            SurfaceTermKind::App { func, arg } => {
                self.buf.push('(');
                self.print_term(*func);
                self.buf.push(' ');
                self.print_term(*arg);
                self.buf.push(')');
            }
            SurfaceTermKind::TypeAbs { param, body } => {
                self.buf.push_str(&format!("(tfn '{}. ", param));
                self.print_term(*body);
                self.buf.push(')');
            }
            SurfaceTermKind::TypeApp { func, type_arg } => {
                self.buf.push('(');
                self.print_term(*func);
                self.buf.push_str(" @");
                self.print_type(*type_arg);
                self.buf.push(')');
            }
            SurfaceTermKind::Let { name, value, body } => {
                self.buf.push_str(&format!("(let {} = ", name));
                self.print_term(*value);
                self.buf.push_str(" in ");
                self.print_term(*body);
                self.buf.push(')');
            }
            SurfaceTermKind::Ann { type_ann, term } => {
                self.buf.push_str("(ann ");
                self.print_type(*type_ann);
                self.buf.push(' ');
                self.print_term(*term);
                self.buf.push(')');
            }
            SurfaceTermKind::Constructor { name, args } => {
                if args.is_empty() {
                    self.buf.push_str(name);
                } else {
                    self.buf.push_str(&format!("({}", name));
                    for &a in args {
                        self.buf.push(' ');
                        self.print_term(a);
                    }
                    self.buf.push(')');
                }
            }
            SurfaceTermKind::Case {
                scrutinee,
                branches,
            } => {
                self.buf.push_str("(case ");
                self.print_term(*scrutinee);
                for b in branches {
                    self.buf.push_str(" [");
                    self.buf.push_str(&b.pattern.constructor);
                    for v in &b.pattern.vars {
                        self.buf.push(' ');
                        self.buf.push_str(v);
                    }
                    self.buf.push_str(" => ");
                    self.print_term(b.body);
                    self.buf.push(']');
                }
                self.buf.push(')');
            }
            SurfaceTermKind::ToolCall { tool, args } => {
                self.buf.push_str(&format!("(tool {}", tool));
                for &a in args {
                    self.buf.push(' ');
                    self.print_term(a);
                }
                self.buf.push(')');
            }
            SurfaceTermKind::Op { op, args } => {
                self.buf.push_str(&format!("({}", op));
                for &a in args {
                    self.buf.push(' ');
                    self.print_term(a);
                }
                self.buf.push(')');
            }
        }
    }

    fn print_type(&mut self, id: TypeId) {
        let ty = &self.module.types[id];
        match &ty.kind {
            SurfaceTypeKind::Var(name) => self.buf.push_str(&format!("'{}", name)),
            SurfaceTypeKind::Named(name) => self.buf.push_str(name),
            SurfaceTypeKind::Arrow { param, ret } => {
                self.buf.push_str("(-> ");
                self.print_type(*param);
                self.buf.push(' ');
                self.print_type(*ret);
                self.buf.push(')');
            }
            SurfaceTypeKind::Forall { var, body } => {
                self.buf.push_str(&format!("(forall '{} ", var));
                self.print_type(*body);
                self.buf.push(')');
            }
            SurfaceTypeKind::Applied { name, args } => {
                self.buf.push_str(&format!("({}", name));
                for &a in args {
                    self.buf.push(' ');
                    self.print_type(a);
                }
                self.buf.push(')');
            }
        }
    }
}
