use logos::Logos;
use smol_str::SmolStr;

/// Source span as byte offsets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

fn parse_string(lex: &mut logos::Lexer<Token>) -> Option<String> {
    let slice = lex.slice();
    let inner = &slice[1..slice.len() - 1];
    let mut result = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                'n' => result.push('\n'),
                't' => result.push('\t'),
                'r' => result.push('\r'),
                '\\' => result.push('\\'),
                '"' => result.push('"'),
                other => {
                    result.push('\\');
                    result.push(other);
                }
            }
        } else {
            result.push(c);
        }
    }
    Some(result)
}

/// Strips `{-#` / `#-}` and surrounding whitespace from a pragma.
fn parse_pragma(lex: &mut logos::Lexer<Token>) -> String {
    let slice = lex.slice();
    slice[3..slice.len() - 3].trim().to_string()
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r";[^\n]*")]
pub enum Token {
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(":")]
    Colon,
    /// Type-argument marker: `@Int`, `@(List 'a)`
    #[token("@")]
    At,

    /// Declaration pragma: `{-# LLM model=gpt-4o #-}`
    #[regex(r"\{-#[^#]*#-\}", parse_pragma)]
    Pragma(String),

    #[regex(r"-?[0-9]+", priority = 3, callback = |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r#""([^"\\]|\\.)*""#, callback = parse_string)]
    String(String),

    /// Type variable: `'a`, `'elem`
    #[regex(r"'[a-zA-Z_][a-zA-Z0-9_]*", callback = |lex| SmolStr::new(&lex.slice()[1..]))]
    TypeVar(SmolStr),

    /// Identifiers and operators: `length`, `Cons`, `+`, `->`, `$prim.int_plus`
    #[regex(r"[a-zA-Z_$+\-*/<>=!&|^~][a-zA-Z0-9_$+\-*/<>=!&|^~.?]*", priority = 1, callback = |lex| SmolStr::new(lex.slice()))]
    Symbol(SmolStr),
}

/// Lex source code into a list of (token, span) pairs.
pub fn lex(source: &str) -> (Vec<(Token, Span)>, Vec<Span>) {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start as u32, range.end as u32);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => errors.push(span),
        }
    }

    (tokens, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_tokens(source: &str) -> Vec<Token> {
        let (tokens, errors) = lex(source);
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        tokens.into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(
            lex_tokens("( ) : @"),
            vec![Token::LParen, Token::RParen, Token::Colon, Token::At]
        );
    }

    #[test]
    fn test_integers() {
        assert_eq!(lex_tokens("42"), vec![Token::Int(42)]);
        assert_eq!(lex_tokens("0"), vec![Token::Int(0)]);
        assert_eq!(lex_tokens("-7"), vec![Token::Int(-7)]);
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            lex_tokens(r#""hello""#),
            vec![Token::String("hello".into())]
        );
        assert_eq!(
            lex_tokens(r#""say \"hi\"\n""#),
            vec![Token::String("say \"hi\"\n".into())]
        );
        assert_eq!(lex_tokens(r#""""#), vec![Token::String("".into())]);
    }

    #[test]
    fn test_type_vars() {
        assert_eq!(
            lex_tokens("'a 'elem"),
            vec![Token::TypeVar("a".into()), Token::TypeVar("elem".into())]
        );
    }

    #[test]
    fn test_symbols_and_operators() {
        assert_eq!(
            lex_tokens("length Cons -> + - == ++ $prim.int_plus"),
            vec![
                Token::Symbol("length".into()),
                Token::Symbol("Cons".into()),
                Token::Symbol("->".into()),
                Token::Symbol("+".into()),
                Token::Symbol("-".into()),
                Token::Symbol("==".into()),
                Token::Symbol("++".into()),
                Token::Symbol("$prim.int_plus".into()),
            ]
        );
    }

    #[test]
    fn test_pragma() {
        assert_eq!(
            lex_tokens("{-# LLM model=gpt-4o temperature=0.2 #-}"),
            vec![Token::Pragma("LLM model=gpt-4o temperature=0.2".into())]
        );
        assert_eq!(lex_tokens("{-#LLM#-}"), vec![Token::Pragma("LLM".into())]);
    }

    #[test]
    fn test_type_application() {
        assert_eq!(
            lex_tokens("(id @Int 5)"),
            vec![
                Token::LParen,
                Token::Symbol("id".into()),
                Token::At,
                Token::Symbol("Int".into()),
                Token::Int(5),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(lex_tokens("; a comment\n42"), vec![Token::Int(42)]);
    }

    #[test]
    fn test_unknown_character_is_error() {
        let (_, errors) = lex("(x # y)");
        assert_eq!(errors, vec![Span::new(3, 4)]);
    }

    #[test]
    fn test_spans() {
        let (tokens, _) = lex("(+ 1 2)");
        assert_eq!(tokens[0], (Token::LParen, Span::new(0, 1)));
        assert_eq!(tokens[1], (Token::Symbol("+".into()), Span::new(1, 2)));
        assert_eq!(tokens[2], (Token::Int(1), Span::new(3, 4)));
        assert_eq!(tokens[3], (Token::Int(2), Span::new(5, 6)));
        assert_eq!(tokens[4], (Token::RParen, Span::new(6, 7)));
    }
}
