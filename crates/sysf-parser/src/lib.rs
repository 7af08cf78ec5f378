use smol_str::SmolStr;
use std::collections::BTreeMap;
use sysf_ast::*;
use sysf_lexer::{lex, Span, Token};

#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}: {}", self.span.start, self.span.end, self.message)
    }
}

pub fn parse(source: &str) -> (SurfaceModule, Vec<ParseError>) {
    let (tokens, lex_errors) = lex(source);
    let mut parser = Parser::new(tokens);
    let mut errors: Vec<ParseError> = lex_errors
        .into_iter()
        .map(|span| ParseError {
            message: "unexpected character".into(),
            span,
        })
        .collect();
    parser.parse_module();
    errors.append(&mut parser.errors);
    (parser.module, errors)
}

/// An application argument: a term or an `@T` type argument.
enum Arg {
    Term(TermId),
    Type(TypeId),
}

/// Lambda parameter: name, annotation, docstring.
type Param = (SmolStr, Option<TypeId>, Option<String>, Span);

struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    module: SurfaceModule,
    errors: Vec<ParseError>,
}

impl Parser {
    fn new(tokens: Vec<(Token, Span)>) -> Self {
        Self {
            tokens,
            pos: 0,
            module: SurfaceModule::new(),
            errors: Vec::new(),
        }
    }

    // ── Token helpers ─────────────────────────────────────────────

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| *s)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|(_, s)| Span::new(s.end, s.end))
                    .unwrap_or(Span::new(0, 0))
            })
    }

    fn prev_span(&self) -> Span {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|(_, s)| *s)
            .unwrap_or(Span::new(0, 0))
    }

    fn advance(&mut self) -> (Token, Span) {
        let tok = self.tokens[self.pos].clone();
        self.pos += 1;
        tok
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    fn check_symbol(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Symbol(s)) if s.as_str() == name)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Option<Span> {
        if self.check(expected) {
            let (_, span) = self.advance();
            Some(span)
        } else {
            let span = self.peek_span();
            self.error(
                format!("expected {:?}, found {:?}", expected, self.peek()),
                span,
            );
            None
        }
    }

    fn expect_symbol(&mut self) -> Option<(SmolStr, Span)> {
        if let Some(Token::Symbol(_)) = self.peek() {
            let (tok, span) = self.advance();
            if let Token::Symbol(s) = tok {
                return Some((s, span));
            }
        }
        let span = self.peek_span();
        self.error(format!("expected symbol, found {:?}", self.peek()), span);
        None
    }

    fn expect_type_var(&mut self) -> Option<(SmolStr, Span)> {
        if let Some(Token::TypeVar(_)) = self.peek() {
            let (tok, span) = self.advance();
            if let Token::TypeVar(s) = tok {
                return Some((s, span));
            }
        }
        let span = self.peek_span();
        self.error(
            format!("expected type variable ('a), found {:?}", self.peek()),
            span,
        );
        None
    }

    fn eat_string(&mut self) -> Option<String> {
        if let Some(Token::String(_)) = self.peek() {
            if let (Token::String(s), _) = self.advance() {
                return Some(s);
            }
        }
        None
    }

    fn error(&mut self, message: String, span: Span) {
        self.errors.push(ParseError { message, span });
    }

    /// Skip tokens until we reach a `)` at depth 0, consuming it.
    fn recover_to_close_paren(&mut self) {
        let mut depth = 1;
        while !self.at_end() && depth > 0 {
            match self.peek() {
                Some(Token::LParen) => depth += 1,
                Some(Token::RParen) => depth -= 1,
                _ => {}
            }
            self.advance();
        }
    }

    // ── Allocators ────────────────────────────────────────────────

    fn alloc_term(&mut self, kind: SurfaceTermKind, span: Span) -> TermId {
        self.module.terms.alloc(SurfaceTerm { kind, span })
    }

    fn alloc_type(&mut self, kind: SurfaceTypeKind, span: Span) -> TypeId {
        self.module.types.alloc(SurfaceType { kind, span })
    }

    // ── Module parsing ────────────────────────────────────────────

    fn parse_module(&mut self) {
        while !self.at_end() {
            if let Some(decl) = self.parse_declaration() {
                self.module.declarations.push(decl);
            }
        }
    }

    fn parse_declaration(&mut self) -> Option<SurfaceDeclaration> {
        let start = self.peek_span();
        if !self.eat(&Token::LParen) {
            let span = self.peek_span();
            self.error("expected '(' to start a declaration".into(), span);
            self.advance();
            return None;
        }

        let result = if self.check_symbol("def") {
            self.advance();
            self.parse_def(start).map(SurfaceDeclaration::Term)
        } else if self.check_symbol("data") {
            self.advance();
            self.parse_data(start).map(SurfaceDeclaration::Data)
        } else if self.check_symbol("prim-type") {
            self.advance();
            self.expect_symbol().map(|(name, _)| {
                SurfaceDeclaration::PrimType(SurfacePrimTypeDecl {
                    name,
                    span: start.merge(self.peek_span()),
                })
            })
        } else if self.check_symbol("prim-op") {
            self.advance();
            self.parse_prim_op(start).map(SurfaceDeclaration::PrimOp)
        } else {
            let span = self.peek_span();
            self.error(
                format!(
                    "expected declaration (def, data, prim-type, prim-op), found {:?}",
                    self.peek()
                ),
                span,
            );
            self.recover_to_close_paren();
            return None;
        };

        let end = self.peek_span();
        if !self.eat(&Token::RParen) {
            self.error("expected ')' to close declaration".into(), end);
            self.recover_to_close_paren();
            return None;
        }
        result
    }

    // ── def ───────────────────────────────────────────────────────

    fn parse_def(&mut self, start: Span) -> Option<SurfaceTermDeclaration> {
        let (name, _) = self.expect_symbol()?;

        let type_ann = if self.eat(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };

        // Docstrings and pragmas may come in either order. A string directly
        // followed by `)` is the body, not a docstring.
        let mut docstring = None;
        let mut pragma = BTreeMap::new();
        loop {
            match self.peek() {
                Some(Token::String(_)) if self.peek_nth(1) != Some(&Token::RParen) => {
                    docstring = self.eat_string();
                }
                Some(Token::Pragma(_)) => {
                    if let (Token::Pragma(text), _) = self.advance() {
                        let (key, rest) = match text.split_once(char::is_whitespace) {
                            Some((key, rest)) => (key, rest.trim()),
                            None => (text.as_str(), ""),
                        };
                        pragma.insert(SmolStr::new(key), rest.to_string());
                    }
                }
                _ => break,
            }
        }

        let body = self.parse_term()?;
        let param_docstrings = self.collect_param_docstrings(body);

        Some(SurfaceTermDeclaration {
            name,
            type_ann,
            body,
            pragma,
            docstring,
            param_docstrings,
            span: start.merge(self.peek_span()),
        })
    }

    /// Docstrings of the parameters of the leading lambda chain.
    fn collect_param_docstrings(&self, mut id: TermId) -> Vec<(SmolStr, String)> {
        let mut docs = Vec::new();
        while let SurfaceTermKind::Abs {
            param,
            param_docstring,
            body,
            ..
        } = &self.module.terms[id].kind
        {
            if let Some(doc) = param_docstring {
                docs.push((param.clone(), doc.clone()));
            }
            id = *body;
        }
        docs
    }

    // ── data ──────────────────────────────────────────────────────

    fn parse_data(&mut self, start: Span) -> Option<SurfaceDataDeclaration> {
        let (name, type_params) = if self.eat(&Token::LParen) {
            let (name, _) = self.expect_symbol()?;
            let mut params = Vec::new();
            while !self.at_end() && !self.check(&Token::RParen) {
                let (p, _) = self.expect_type_var()?;
                params.push(p);
            }
            self.expect(&Token::RParen)?;
            (name, params)
        } else {
            let (name, _) = self.expect_symbol()?;
            (name, Vec::new())
        };

        let mut constructors = Vec::new();
        while !self.at_end() && !self.check(&Token::RParen) {
            constructors.push(self.parse_constructor_def()?);
        }

        Some(SurfaceDataDeclaration {
            name,
            type_params,
            constructors,
            span: start.merge(self.peek_span()),
        })
    }

    fn parse_constructor_def(&mut self) -> Option<SurfaceConstructorDef> {
        let start = self.peek_span();
        if self.eat(&Token::LParen) {
            let (name, _) = self.expect_symbol()?;
            let mut args = Vec::new();
            while !self.at_end() && !self.check(&Token::RParen) {
                args.push(self.parse_type()?);
            }
            let end = self.peek_span();
            self.expect(&Token::RParen)?;
            Some(SurfaceConstructorDef {
                name,
                args,
                span: start.merge(end),
            })
        } else {
            let (name, span) = self.expect_symbol()?;
            Some(SurfaceConstructorDef {
                name,
                args: Vec::new(),
                span,
            })
        }
    }

    // ── prim-op ───────────────────────────────────────────────────

    fn parse_prim_op(&mut self, start: Span) -> Option<SurfacePrimOpDecl> {
        let (name, _) = self.expect_symbol()?;
        self.expect(&Token::Colon)?;
        let type_ann = self.parse_type()?;
        Some(SurfacePrimOpDecl {
            name,
            type_ann,
            span: start.merge(self.peek_span()),
        })
    }

    // ── Terms ─────────────────────────────────────────────────────

    fn parse_term(&mut self) -> Option<TermId> {
        let start = self.peek_span();
        match self.peek()? {
            Token::LParen => self.parse_list_term(),
            Token::Int(_) => {
                let (tok, span) = self.advance();
                if let Token::Int(n) = tok {
                    Some(self.alloc_term(SurfaceTermKind::IntLit(n), span))
                } else {
                    None
                }
            }
            Token::String(_) => {
                let (tok, span) = self.advance();
                if let Token::String(s) = tok {
                    Some(self.alloc_term(SurfaceTermKind::StringLit(s), span))
                } else {
                    None
                }
            }
            Token::Symbol(_) => {
                let (tok, span) = self.advance();
                if let Token::Symbol(s) = tok {
                    let kind = if is_constructor_name(&s) {
                        SurfaceTermKind::Constructor {
                            name: s,
                            args: Vec::new(),
                        }
                    } else {
                        SurfaceTermKind::Var(s)
                    };
                    Some(self.alloc_term(kind, span))
                } else {
                    None
                }
            }
            _ => {
                self.error(format!("unexpected token {:?}", self.peek()), start);
                None
            }
        }
    }

    fn parse_list_term(&mut self) -> Option<TermId> {
        let start = self.peek_span();
        self.expect(&Token::LParen)?;

        if self.check(&Token::RParen) {
            let end = self.peek_span();
            self.advance();
            self.error("empty parentheses".into(), start.merge(end));
            return None;
        }

        let result = if self.check_symbol("fn") {
            self.advance();
            self.parse_fn_body(start)
        } else if self.check_symbol("tfn") {
            self.advance();
            self.parse_tfn_body(start)
        } else if self.check_symbol("let") {
            self.advance();
            self.parse_let_body(start)
        } else if self.check_symbol("ann") {
            self.advance();
            self.parse_ann_body(start)
        } else if self.check_symbol("case") {
            self.advance();
            self.parse_case_body(start)
        } else if self.check_symbol("tool") {
            self.advance();
            self.parse_tool_body(start)
        } else if matches!(self.peek(), Some(Token::Symbol(s)) if ops::is_operator(s)) {
            self.parse_op_body(start)
        } else {
            self.parse_app_body(start)
        };

        let end = self.peek_span();
        self.expect(&Token::RParen)?;
        let id = result?;
        // The outermost node of a parenthesised form covers the parentheses.
        self.module.terms[id].span = start.merge(end);
        Some(id)
    }

    fn parse_fn_body(&mut self, start: Span) -> Option<TermId> {
        let params = self.parse_params()?;
        if params.is_empty() {
            self.error("fn requires at least one parameter".into(), start);
            return None;
        }
        let body = self.parse_term()?;
        let end = self.prev_span();
        let mut result = body;
        for (param, param_type, param_docstring, param_span) in params.into_iter().rev() {
            result = self.alloc_term(
                SurfaceTermKind::Abs {
                    param,
                    param_type,
                    param_docstring,
                    body: result,
                },
                param_span.merge(end),
            );
        }
        Some(result)
    }

    /// `x`, `(x : T "doc")`, or `(p1 p2 ...)` where each `p` is `x` or `(x : T "doc")`.
    fn parse_params(&mut self) -> Option<Vec<Param>> {
        if let Some(Token::Symbol(_)) = self.peek() {
            let (name, span) = self.expect_symbol()?;
            return Some(vec![(name, None, None, span)]);
        }
        if matches!(self.peek_nth(1), Some(Token::Symbol(_)))
            && matches!(self.peek_nth(2), Some(Token::Colon))
        {
            return Some(vec![self.parse_annotated_param()?]);
        }
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        while !self.at_end() && !self.check(&Token::RParen) {
            if let Some(Token::Symbol(_)) = self.peek() {
                let (name, span) = self.expect_symbol()?;
                params.push((name, None, None, span));
            } else {
                params.push(self.parse_annotated_param()?);
            }
        }
        self.expect(&Token::RParen)?;
        Some(params)
    }

    fn parse_annotated_param(&mut self) -> Option<Param> {
        let start = self.peek_span();
        self.expect(&Token::LParen)?;
        let (name, _) = self.expect_symbol()?;
        let param_type = if self.eat(&Token::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let doc = self.eat_string();
        let end = self.peek_span();
        self.expect(&Token::RParen)?;
        Some((name, param_type, doc, start.merge(end)))
    }

    fn parse_tfn_body(&mut self, start: Span) -> Option<TermId> {
        let mut params = Vec::new();
        if self.eat(&Token::LParen) {
            while !self.at_end() && !self.check(&Token::RParen) {
                params.push(self.expect_type_var()?.0);
            }
            self.expect(&Token::RParen)?;
        } else {
            params.push(self.expect_type_var()?.0);
        }
        if params.is_empty() {
            self.error("tfn requires at least one type parameter".into(), start);
            return None;
        }
        let body = self.parse_term()?;
        let span = start.merge(self.prev_span());
        let mut result = body;
        for param in params.into_iter().rev() {
            result = self.alloc_term(SurfaceTermKind::TypeAbs { param, body: result }, span);
        }
        Some(result)
    }

    fn parse_let_body(&mut self, start: Span) -> Option<TermId> {
        self.expect(&Token::LParen)?;
        let mut bindings = Vec::new();
        while !self.at_end() && !self.check(&Token::RParen) {
            self.expect(&Token::LParen)?;
            let (name, _) = self.expect_symbol()?;
            let value = self.parse_term()?;
            self.expect(&Token::RParen)?;
            bindings.push((name, value));
        }
        self.expect(&Token::RParen)?;
        let body = self.parse_term()?;
        let span = start.merge(self.prev_span());
        let mut result = body;
        for (name, value) in bindings.into_iter().rev() {
            result = self.alloc_term(
                SurfaceTermKind::Let {
                    name,
                    value,
                    body: result,
                },
                span,
            );
        }
        Some(result)
    }

    fn parse_ann_body(&mut self, start: Span) -> Option<TermId> {
        let type_ann = self.parse_type()?;
        let term = self.parse_term()?;
        Some(self.alloc_term(SurfaceTermKind::Ann { type_ann, term }, start))
    }

    fn parse_case_body(&mut self, start: Span) -> Option<TermId> {
        let scrutinee = self.parse_term()?;
        let mut branches = Vec::new();
        while !self.at_end() && !self.check(&Token::RParen) {
            branches.push(self.parse_branch()?);
        }
        Some(self.alloc_term(
            SurfaceTermKind::Case {
                scrutinee,
                branches,
            },
            start,
        ))
    }

    fn parse_branch(&mut self) -> Option<SurfaceBranch> {
        let start = self.peek_span();
        self.expect(&Token::LParen)?;
        let pattern = self.parse_pattern()?;
        let body = self.parse_term()?;
        let end = self.peek_span();
        self.expect(&Token::RParen)?;
        Some(SurfaceBranch {
            pattern,
            body,
            span: start.merge(end),
        })
    }

    fn parse_pattern(&mut self) -> Option<SurfacePattern> {
        let start = self.peek_span();
        if self.eat(&Token::LParen) {
            let (constructor, _) = self.expect_symbol()?;
            let mut vars = Vec::new();
            while !self.at_end() && !self.check(&Token::RParen) {
                let (v, span) = self.expect_symbol()?;
                if is_constructor_name(&v) {
                    self.error(
                        format!("nested pattern {} is not supported; bind a variable", v),
                        span,
                    );
                    return None;
                }
                vars.push(v);
            }
            let end = self.peek_span();
            self.expect(&Token::RParen)?;
            Some(SurfacePattern {
                constructor,
                vars,
                span: start.merge(end),
            })
        } else {
            let (constructor, span) = self.expect_symbol()?;
            Some(SurfacePattern {
                constructor,
                vars: Vec::new(),
                span,
            })
        }
    }

    fn parse_tool_body(&mut self, start: Span) -> Option<TermId> {
        let (tool, _) = self.expect_symbol()?;
        let mut args = Vec::new();
        while !self.at_end() && !self.check(&Token::RParen) {
            args.push(self.parse_term()?);
        }
        Some(self.alloc_term(SurfaceTermKind::ToolCall { tool, args }, start))
    }

    fn parse_op_body(&mut self, start: Span) -> Option<TermId> {
        let (op, op_span) = self.expect_symbol()?;
        let mut args = Vec::new();
        while !self.at_end() && !self.check(&Token::RParen) {
            args.push(self.parse_term()?);
        }
        if ops::primitive_for(&op, args.len()).is_none() {
            self.error(
                format!("operator {} cannot take {} operands", op, args.len()),
                op_span,
            );
            return None;
        }
        Some(self.alloc_term(SurfaceTermKind::Op { op, args }, start))
    }

    fn parse_app_body(&mut self, start: Span) -> Option<TermId> {
        let head = self.parse_term()?;
        let mut args = Vec::new();
        while !self.at_end() && !self.check(&Token::RParen) {
            if self.eat(&Token::At) {
                args.push(Arg::Type(self.parse_type()?));
            } else {
                args.push(Arg::Term(self.parse_term()?));
            }
        }

        // `(Cons x xs)` is a saturated constructor node unless type arguments
        // are involved, in which case it is an ordinary application chain.
        let all_terms = args.iter().all(|a| matches!(a, Arg::Term(_)));
        if all_terms && !args.is_empty() {
            if let SurfaceTermKind::Constructor { name, args: existing } =
                &self.module.terms[head].kind
            {
                if existing.is_empty() {
                    let name = name.clone();
                    let args = args
                        .into_iter()
                        .filter_map(|a| match a {
                            Arg::Term(t) => Some(t),
                            Arg::Type(_) => None,
                        })
                        .collect();
                    return Some(self.alloc_term(SurfaceTermKind::Constructor { name, args }, start));
                }
            }
        }

        let mut result = head;
        for arg in args {
            let kind = match arg {
                Arg::Term(arg) => SurfaceTermKind::App { func: result, arg },
                Arg::Type(type_arg) => SurfaceTermKind::TypeApp {
                    func: result,
                    type_arg,
                },
            };
            let span = start.merge(self.prev_span());
            result = self.alloc_term(kind, span);
        }
        Some(result)
    }

    // ── Types ─────────────────────────────────────────────────────

    fn parse_type(&mut self) -> Option<TypeId> {
        let start = self.peek_span();
        match self.peek()? {
            Token::Symbol(_) => {
                let (tok, span) = self.advance();
                if let Token::Symbol(s) = tok {
                    Some(self.alloc_type(SurfaceTypeKind::Named(s), span))
                } else {
                    None
                }
            }
            Token::TypeVar(_) => {
                let (tok, span) = self.advance();
                if let Token::TypeVar(s) = tok {
                    Some(self.alloc_type(SurfaceTypeKind::Var(s), span))
                } else {
                    None
                }
            }
            Token::LParen => {
                self.advance();
                let result = if self.check_symbol("->") {
                    self.advance();
                    self.parse_arrow_type(start)
                } else if self.check_symbol("forall") {
                    self.advance();
                    self.parse_forall_type(start)
                } else {
                    let (name, _) = self.expect_symbol()?;
                    let mut args = Vec::new();
                    while !self.at_end() && !self.check(&Token::RParen) {
                        args.push(self.parse_type()?);
                    }
                    let span = start.merge(self.peek_span());
                    if args.is_empty() {
                        Some(self.alloc_type(SurfaceTypeKind::Named(name), span))
                    } else {
                        Some(self.alloc_type(SurfaceTypeKind::Applied { name, args }, span))
                    }
                };
                self.expect(&Token::RParen)?;
                result
            }
            _ => {
                self.error(format!("expected type, found {:?}", self.peek()), start);
                None
            }
        }
    }

    /// `(-> A B C)` = `A -> (B -> C)`
    fn parse_arrow_type(&mut self, start: Span) -> Option<TypeId> {
        let mut parts = Vec::new();
        while !self.at_end() && !self.check(&Token::RParen) {
            parts.push(self.parse_type()?);
        }
        if parts.len() < 2 {
            self.error("-> needs a parameter and a result type".into(), start);
            return None;
        }
        let span = start.merge(self.peek_span());
        let mut result = parts.pop()?;
        while let Some(param) = parts.pop() {
            result = self.alloc_type(SurfaceTypeKind::Arrow { param, ret: result }, span);
        }
        Some(result)
    }

    fn parse_forall_type(&mut self, start: Span) -> Option<TypeId> {
        let mut vars = Vec::new();
        if self.eat(&Token::LParen) {
            while !self.at_end() && !self.check(&Token::RParen) {
                vars.push(self.expect_type_var()?.0);
            }
            self.expect(&Token::RParen)?;
        } else {
            vars.push(self.expect_type_var()?.0);
        }
        let body = self.parse_type()?;
        let span = start.merge(self.peek_span());
        let mut result = body;
        for var in vars.into_iter().rev() {
            result = self.alloc_type(SurfaceTypeKind::Forall { var, body: result }, span);
        }
        Some(result)
    }
}

/// Constructors and data types are capitalised.
fn is_constructor_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

#[cfg(test)]
mod tests;
