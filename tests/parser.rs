use treelox as lox;

use lox::ast::{Expr, LiteralValue, Stmt};
use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::parser::Parser;
use lox::scanner::Scanner;
use lox::token::Token;

fn scan(source: &str) -> Vec<Token<'_>> {
    Scanner::new(source)
        .collect::<Result<_, _>>()
        .expect("clean scan")
}

/// Parse a single expression and render it in prefix form.
fn parse_to_prefix(source: &str) -> String {
    let tokens = scan(source);
    let expr = Parser::new(&tokens)
        .parse_expression()
        .expect("clean parse");

    AstPrinter::print(&expr)
}

fn parse_program_errors(source: &str) -> Vec<LoxError> {
    let tokens = scan(source);

    match Parser::new(&tokens).parse() {
        Ok(_) => Vec::new(),
        Err(errors) => errors,
    }
}

#[test]
fn factor_binds_tighter_than_term() {
    assert_eq!(parse_to_prefix("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
    assert_eq!(parse_to_prefix("1 * 2 + 3"), "(+ (* 1.0 2.0) 3.0)");
}

#[test]
fn grouping_overrides_precedence() {
    assert_eq!(parse_to_prefix("(1 + 2) * 3"), "(* (group (+ 1.0 2.0)) 3.0)");
}

#[test]
fn binary_operators_are_left_associative() {
    assert_eq!(parse_to_prefix("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
    assert_eq!(parse_to_prefix("8 / 4 / 2"), "(/ (/ 8.0 4.0) 2.0)");
}

#[test]
fn unary_is_right_associative() {
    assert_eq!(parse_to_prefix("!!true"), "(! (! true))");
    assert_eq!(parse_to_prefix("--1"), "(- (- 1.0))");
}

#[test]
fn comparison_binds_tighter_than_equality() {
    assert_eq!(parse_to_prefix("1 < 2 == true"), "(== (< 1.0 2.0) true)");
}

#[test]
fn logical_and_binds_tighter_than_or() {
    assert_eq!(parse_to_prefix("a or b and c"), "(or a (and b c))");
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(parse_to_prefix("a = b = 1"), "(= a (= b 1.0))");
}

#[test]
fn calls_chain_left_to_right() {
    assert_eq!(parse_to_prefix("f(1)(2)"), "(call (call f 1.0) 2.0)");
    assert_eq!(parse_to_prefix("clock()"), "(call clock)");
}

#[test]
fn invalid_assignment_target_is_reported() {
    let tokens = scan("1 = 2");
    let err = Parser::new(&tokens)
        .parse_expression()
        .expect_err("should not parse");

    assert_eq!(
        err.to_string(),
        "[line 1] Error at '=': Invalid assignment target."
    );
}

#[test]
fn parse_error_at_end_of_input() {
    let tokens = scan("(1");
    let err = Parser::new(&tokens)
        .parse_expression()
        .expect_err("should not parse");

    assert_eq!(
        err.to_string(),
        "[line 1] Error at end: Expect ')' after expression."
    );
}

#[test]
fn for_loop_desugars_to_block_and_while() {
    let tokens = scan("for (var i = 0; i < 3; i = i + 1) print i;");
    let program = Parser::new(&tokens).parse().expect("clean parse");

    assert_eq!(program.len(), 1);

    let Stmt::Block(outer) = &program[0] else {
        panic!("expected the initializer block");
    };
    assert_eq!(outer.len(), 2);
    assert!(matches!(outer[0], Stmt::Var { .. }));

    let Stmt::While { body, .. } = &outer[1] else {
        panic!("expected the desugared while loop");
    };
    let Stmt::Block(inner) = body.as_ref() else {
        panic!("expected the body+increment block");
    };
    assert_eq!(inner.len(), 2);
    assert!(matches!(inner[0], Stmt::Print(_)));
    assert!(matches!(inner[1], Stmt::Expression(Expr::Assign { .. })));
}

#[test]
fn for_loop_with_empty_clauses_defaults_to_true() {
    let tokens = scan("for (;;) print 1;");
    let program = Parser::new(&tokens).parse().expect("clean parse");

    // no initializer and no increment: just the while loop
    let Stmt::While { condition, body } = &program[0] else {
        panic!("expected a bare while loop");
    };
    assert_eq!(*condition, Expr::Literal(LiteralValue::True));
    assert!(matches!(body.as_ref(), Stmt::Print(_)));
}

#[test]
fn panic_mode_recovers_at_statement_boundaries() {
    let errors = parse_program_errors("var 1 = 2;\nprint;\nvar ok = 3;");

    assert_eq!(errors.len(), 2, "both errors should be reported");
    assert!(errors[0].to_string().contains("Expect variable name."));
    assert!(errors[1].to_string().contains("Expect expression."));
}

#[test]
fn recovery_resumes_at_declaration_keywords() {
    // junk before `var`: synchronize discards it and stops at the keyword,
    // so the following declaration parses without a second error
    let errors = parse_program_errors("print 1 2\nvar a = 2;");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Expect ';' after value."));
}

#[test]
fn argument_limit_is_reported_but_call_still_parses() {
    let args: String = (0..256)
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let source = format!("f({});", args);

    let errors = parse_program_errors(&source);

    assert!(!errors.is_empty());
    assert!(errors[0]
        .to_string()
        .contains("Can't have more than 255 arguments."));
}

#[test]
fn function_declaration_parses_params_and_body() {
    let tokens = scan("fun add(a, b) { return a + b; }");
    let program = Parser::new(&tokens).parse().expect("clean parse");

    let Stmt::Function { name, params, body } = &program[0] else {
        panic!("expected a function declaration");
    };
    assert_eq!(name.lexeme, "add");
    assert_eq!(params.len(), 2);
    assert_eq!(body.len(), 1);
    assert!(matches!(body[0], Stmt::Return { .. }));
}

#[test]
fn class_declaration_parses_methods() {
    let tokens = scan("class Counter { value() { return 1; } }");
    let program = Parser::new(&tokens).parse().expect("clean parse");

    let Stmt::Class { name, methods } = &program[0] else {
        panic!("expected a class declaration");
    };
    assert_eq!(name.lexeme, "Counter");
    assert_eq!(methods.len(), 1);
    assert!(matches!(methods[0], Stmt::Function { .. }));
}

#[test]
fn property_access_and_this_parse_into_stub_nodes() {
    assert_eq!(parse_to_prefix("a.b.c"), "(get (get a b) c)");
    assert_eq!(parse_to_prefix("a.b = 1"), "(set a b 1.0)");
    assert_eq!(parse_to_prefix("this.x"), "(get this x)");
    assert_eq!(parse_to_prefix("super.init"), "(super init)");
}
