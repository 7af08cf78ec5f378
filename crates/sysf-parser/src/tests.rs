use super::*;

fn parse_and_print(source: &str) -> String {
    let (module, errors) = parse(source);
    if !errors.is_empty() {
        let mut result = String::from("ERRORS:\n");
        for e in &errors {
            result.push_str(&format!("  {}\n", e));
        }
        result.push('\n');
        result.push_str(&pretty_print(&module));
        result
    } else {
        pretty_print(&module)
    }
}

fn parse_errors(source: &str) -> Vec<String> {
    let (_, errors) = parse(source);
    errors.iter().map(|e| e.to_string()).collect()
}

// ── Declarations ────────────────────────────────────────────────

#[test]
fn test_parse_polymorphic_identity() {
    let result = parse_and_print("(def id : (forall 'a (-> 'a 'a)) (tfn 'a (fn (x : 'a) x)))");
    insta::assert_snapshot!(result, @r"
    (def id
      type: (forall 'a (-> 'a 'a))
      body: (tfn 'a. (fn x : 'a. x))
    )
    ");
}

#[test]
fn test_parse_data() {
    let result = parse_and_print("(data (List 'a) Nil (Cons 'a (List 'a)))");
    insta::assert_snapshot!(result, @r"
    (data List 'a
      Nil
      Cons 'a (List 'a)
    )
    ");
}

#[test]
fn test_parse_data_without_params() {
    let (module, errors) = parse("(data Color Red Green Blue)");
    assert!(errors.is_empty(), "{:?}", errors);
    let SurfaceDeclaration::Data(d) = &module.declarations[0] else {
        panic!("expected data declaration");
    };
    assert_eq!(d.name, "Color");
    assert!(d.type_params.is_empty());
    let names: Vec<_> = d.constructors.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Red", "Green", "Blue"]);
}

#[test]
fn test_parse_llm_def() {
    let result = parse_and_print(
        "(def summarize : (-> String String)\n  \"Summarize text.\"\n  {-# LLM model=gpt-4o temperature=0.2 #-}\n  (fn (text : String \"The text\") text))",
    );
    insta::assert_snapshot!(result, @r#"
    (def summarize
      type: (-> String String)
      doc: "Summarize text."
      pragma: LLM "model=gpt-4o temperature=0.2"
      param-doc: text "The text"
      body: (fn text : String. text)
    )
    "#);
}

#[test]
fn test_parse_pragma_before_docstring() {
    let (module, errors) = parse("(def f {-# LLM #-} \"doc\" (fn (x : Int) x))");
    assert!(errors.is_empty(), "{:?}", errors);
    let SurfaceDeclaration::Term(d) = &module.declarations[0] else {
        panic!("expected term declaration");
    };
    assert_eq!(d.docstring.as_deref(), Some("doc"));
    assert_eq!(d.pragma.get("LLM").map(String::as_str), Some(""));
}

#[test]
fn test_parse_string_body_is_not_docstring() {
    let result = parse_and_print("(def greeting \"hello\")");
    insta::assert_snapshot!(result, @r#"
    (def greeting
      body: "hello"
    )
    "#);
}

#[test]
fn test_parse_prim_decls() {
    let result =
        parse_and_print("(prim-type Float)\n(prim-op $prim.float_add : (-> Float Float Float))");
    insta::assert_snapshot!(result, @r"
    (prim-type Float)
    (prim-op $prim.float_add : (-> Float (-> Float Float)))
    ");
}

// ── Terms ───────────────────────────────────────────────────────

#[test]
fn test_parse_multi_param_fn() {
    let result = parse_and_print("(def add (fn ((x : Int) (y : Int)) (+ x y)))");
    insta::assert_snapshot!(result, @r"
    (def add
      body: (fn x : Int. (fn y : Int. (+ x y)))
    )
    ");
}

#[test]
fn test_parse_unannotated_params() {
    let result = parse_and_print("(def k (fn (x y) x))");
    insta::assert_snapshot!(result, @r"
    (def k
      body: (fn x. (fn y. x))
    )
    ");
}

#[test]
fn test_parse_type_application() {
    let result = parse_and_print("(def main (id @Int 5))");
    insta::assert_snapshot!(result, @r"
    (def main
      body: ((id @Int) 5)
    )
    ");
}

#[test]
fn test_parse_constructors() {
    let result = parse_and_print("(def l (Cons 1 Nil))\n(def e (Nil @Int))");
    insta::assert_snapshot!(result, @r"
    (def l
      body: (Cons 1 Nil)
    )
    (def e
      body: (Nil @Int)
    )
    ");
}

#[test]
fn test_parse_case() {
    let result = parse_and_print(
        "(def len (fn (xs : (List Int))\n  (case xs\n    (Nil 0)\n    ((Cons y ys) (+ 1 (len ys))))))",
    );
    insta::assert_snapshot!(result, @r"
    (def len
      body: (fn xs : (List Int). (case xs [Nil => 0] [Cons y ys => (+ 1 (len ys))]))
    )
    ");
}

#[test]
fn test_parse_let_and_ann() {
    let result = parse_and_print("(def main (let ((x 1) (y 2)) (ann Int (+ x y))))");
    insta::assert_snapshot!(result, @r"
    (def main
      body: (let x = 1 in (let y = 2 in (ann Int (+ x y))))
    )
    ");
}

#[test]
fn test_parse_tool_call() {
    let result = parse_and_print("(def t (tool search \"rust\" 3))");
    insta::assert_snapshot!(result, @r#"
    (def t
      body: (tool search "rust" 3)
    )
    "#);
}

#[test]
fn test_parse_multi_tfn_and_forall() {
    let result =
        parse_and_print("(def k : (forall ('a 'b) (-> 'a 'b 'a)) (tfn ('a 'b) (fn ((x : 'a) (y : 'b)) x)))");
    insta::assert_snapshot!(result, @r"
    (def k
      type: (forall 'a (forall 'b (-> 'a (-> 'b 'a))))
      body: (tfn 'a. (tfn 'b. (fn x : 'a. (fn y : 'b. x))))
    )
    ");
}

#[test]
fn test_unary_minus() {
    let result = parse_and_print("(def n (- 5))");
    insta::assert_snapshot!(result, @r"
    (def n
      body: (- 5)
    )
    ");
}

#[test]
fn test_term_spans_cover_parens() {
    let (module, errors) = parse("(def x (f 1))");
    assert!(errors.is_empty());
    let SurfaceDeclaration::Term(d) = &module.declarations[0] else {
        panic!("expected term declaration");
    };
    assert_eq!(module.terms[d.body].span, Span::new(7, 12));
}

// ── Errors ──────────────────────────────────────────────────────

#[test]
fn test_error_def_without_name() {
    assert_eq!(
        parse_errors("(def)"),
        ["4:5: expected symbol, found Some(RParen)"]
    );
}

#[test]
fn test_error_operator_arity() {
    assert_eq!(
        parse_errors("(def x (+ 1 2 3))"),
        ["8:9: operator + cannot take 3 operands"]
    );
}

#[test]
fn test_error_recovers_at_next_declaration() {
    let (module, errors) = parse("(def a 1)\n(oops)\n(def b 2)");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("expected declaration"));
    let names: Vec<_> = module.declarations.iter().map(|d| d.name().as_str()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn test_error_unclosed_declaration() {
    let (module, errors) = parse("(def a (+ 1 2)");
    assert!(module.declarations.is_empty());
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("close declaration"));
}

#[test]
fn test_error_invalid_character() {
    let errors = parse_errors("(def a #)");
    assert_eq!(errors[0], "7:8: unexpected character");
}

#[test]
fn test_error_nested_pattern() {
    let errors = parse_errors("(def f (case x ((Cons (Cons a b) c) 0)))");
    assert!(!errors.is_empty());
}

#[test]
fn test_error_empty_parens() {
    let errors = parse_errors("(def main ())");
    assert_eq!(errors[0], "10:12: empty parentheses");
}

// ── Property-based tests ────────────────────────────────────────

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parse_never_panics_on_ascii(s in "\\PC{0,200}") {
            let _ = parse(&s);
        }

        #[test]
        fn parse_never_panics_on_lispy_input(
            s in proptest::string::string_regex(r"[\(\) a-zA-Z0-9\+\-\*:@'\n ]{0,150}")
                .unwrap()
        ) {
            let _ = parse(&s);
        }

        #[test]
        fn error_spans_stay_within_input(
            s in proptest::string::string_regex(r"[\(\) a-zA-Z0-9\+\-\*:@'\n ]{0,150}")
                .unwrap()
        ) {
            let (_, errors) = parse(&s);
            for error in &errors {
                prop_assert!(error.span.start <= error.span.end);
                prop_assert!(error.span.end as usize <= s.len());
            }
        }
    }
}
