use treelox as lox;

use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::token::Token;

/// Full pipeline against a fresh interpreter, capturing program output and
/// the runtime diagnostic, if any.
fn run_capture(source: &str) -> (String, Option<String>) {
    let tokens: Vec<Token<'_>> = Scanner::new(source)
        .collect::<Result<_, _>>()
        .expect("clean scan");
    let program = Parser::new(&tokens).parse().expect("clean parse");

    let mut out: Vec<u8> = Vec::new();
    let mut runtime_error: Option<String> = None;

    {
        let mut interpreter = Interpreter::with_output(&mut out);

        {
            let mut resolver = Resolver::new(&mut interpreter);
            resolver.resolve(&program).expect("clean resolve");
        }

        if let Err(e) = interpreter.interpret(&program) {
            runtime_error = Some(e.to_string());
        }
    }

    (String::from_utf8(out).expect("utf8 output"), runtime_error)
}

fn run(source: &str) -> String {
    let (output, error) = run_capture(source);

    assert_eq!(error, None, "unexpected runtime error");

    output
}

fn run_err(source: &str) -> String {
    let (_, error) = run_capture(source);

    error.expect("expected a runtime error")
}

/// Resolve only; returns the rendered static diagnostics.
fn resolve_errors(source: &str) -> Vec<String> {
    let tokens: Vec<Token<'_>> = Scanner::new(source)
        .collect::<Result<_, _>>()
        .expect("clean scan");
    let program = Parser::new(&tokens).parse().expect("clean parse");

    let mut interpreter = Interpreter::with_output(Vec::<u8>::new());
    let mut resolver = Resolver::new(&mut interpreter);

    match resolver.resolve(&program) {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(ToString::to_string).collect(),
    }
}

// ─────────────────────────── expressions ───────────────────────────

#[test]
fn arithmetic_and_numeric_formatting() {
    assert_eq!(run("print 1 + 2;"), "3\n");
    assert_eq!(run("print 6 / 2;"), "3\n");
    assert_eq!(run("print 7 / 2;"), "3.5\n");
    assert_eq!(run("print 2 * 3 - 1;"), "5\n");
    assert_eq!(run("print -(1 + 2);"), "-3\n");
}

#[test]
fn division_by_zero_follows_ieee_semantics() {
    assert_eq!(run("print 1 / 0;"), "inf\n");
    assert_eq!(run("print -1 / 0;"), "-inf\n");
}

#[test]
fn plus_concatenates_strings() {
    assert_eq!(run("print \"foo\" + \"bar\";"), "foobar\n");
}

#[test]
fn plus_rejects_mixed_operands() {
    let err = run_err("print 1 + \"a\";");

    assert!(err.contains("Operands must be two numbers or two strings."));
    assert!(err.contains("[line 1]"));
}

#[test]
fn numeric_operators_reject_non_numbers() {
    assert!(run_err("print -\"a\";").contains("Operand must be a number."));
    assert!(run_err("print 1 < \"a\";").contains("Operands must be numbers."));
    assert!(run_err("print \"a\" * 2;").contains("Operands must be numbers."));
}

#[test]
fn runtime_errors_carry_the_operator_line() {
    let err = run_err("var a = 1;\nvar b = \"x\";\nprint a\n  *\n  b;");

    assert!(err.contains("[line 4]"), "got: {err}");
}

#[test]
fn equality_never_raises() {
    assert_eq!(run("print nil == nil;"), "true\n");
    assert_eq!(run("print nil == false;"), "false\n");
    assert_eq!(run("print 1 == 1;"), "true\n");
    assert_eq!(run("print 1 == \"1\";"), "false\n");
    assert_eq!(run("print \"a\" == \"a\";"), "true\n");
    assert_eq!(run("print 1 != 2;"), "true\n");
}

#[test]
fn truthiness_rules() {
    // only nil and false are falsy
    assert_eq!(run("if (0) print \"yes\"; else print \"no\";"), "yes\n");
    assert_eq!(run("if (\"\") print \"yes\"; else print \"no\";"), "yes\n");
    assert_eq!(run("if (nil) print \"yes\"; else print \"no\";"), "no\n");
    assert_eq!(run("if (false) print \"yes\"; else print \"no\";"), "no\n");
    assert_eq!(run("print !nil;"), "true\n");
    assert_eq!(run("print !0;"), "false\n");
}

#[test]
fn logical_operators_short_circuit_and_return_the_operand() {
    assert_eq!(run("print nil or \"yes\";"), "yes\n");
    assert_eq!(run("print 1 or 2;"), "1\n");
    assert_eq!(run("print nil and \"no\";"), "nil\n");
    assert_eq!(run("print 1 and 2;"), "2\n");

    // the right side must not evaluate when the left decides
    assert_eq!(run("var a = 1; false and (a = 2); print a;"), "1\n");
    assert_eq!(run("var a = 1; true or (a = 2); print a;"), "1\n");
}

// ─────────────────────────── statements ───────────────────────────

#[test]
fn var_without_initializer_is_nil() {
    assert_eq!(run("var a; print a;"), "nil\n");
}

#[test]
fn assignment_is_an_expression_yielding_the_value() {
    assert_eq!(run("var a = 1; print a = 2;"), "2\n");
}

#[test]
fn undefined_variable_reads_and_writes_fail() {
    assert!(run_err("print missing;").contains("Undefined variable 'missing'."));
    assert!(run_err("missing = 1;").contains("Undefined variable 'missing'."));
}

#[test]
fn blocks_shadow_and_restore() {
    assert_eq!(
        run("var a = 1; { var a = 2; print a; } print a;"),
        "2\n1\n"
    );
}

#[test]
fn assignment_in_inner_scope_mutates_the_outer_binding() {
    assert_eq!(run("var a = 1; { a = 2; } print a;"), "2\n");
}

#[test]
fn global_redeclaration_is_allowed() {
    assert_eq!(run("var a = 1; var a = 2; print a;"), "2\n");
}

#[test]
fn while_loop_runs_to_completion() {
    assert_eq!(
        run("var i = 0; while (i < 3) { print i; i = i + 1; }"),
        "0\n1\n2\n"
    );
}

#[test]
fn for_loop_matches_its_manual_desugaring() {
    let sugared = run("for (var i = 0; i < 3; i = i + 1) print i;");
    let manual = run("{ var i = 0; while (i < 3) { print i; i = i + 1; } }");

    assert_eq!(sugared, "0\n1\n2\n");
    assert_eq!(sugared, manual);
}

// ─────────────────────────── functions ───────────────────────────

#[test]
fn functions_declare_call_and_return() {
    assert_eq!(
        run("fun add(a, b) { return a + b; } print add(1, 2);"),
        "3\n"
    );
}

#[test]
fn function_values_print_their_name() {
    assert_eq!(run("fun f() {} print f;"), "<fn f>\n");
    assert_eq!(run("print clock;"), "<native fn>\n");
}

#[test]
fn falling_off_the_end_returns_nil() {
    assert_eq!(run("fun f() {} print f();"), "nil\n");
    assert_eq!(run("fun f() { return; } print f();"), "nil\n");
}

#[test]
fn return_unwinds_through_nested_scopes() {
    assert_eq!(
        run("fun f() { while (true) { { return 1; } } } print f();"),
        "1\n"
    );
}

#[test]
fn recursion_works() {
    assert_eq!(
        run("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(10);"),
        "55\n"
    );
}

#[test]
fn arity_mismatch_reports_expected_and_actual() {
    assert!(run_err("fun f() {} f(1);").contains("Expected 0 arguments but got 1."));
    assert!(run_err("fun g(a, b) {} g(1);").contains("Expected 2 arguments but got 1."));
}

#[test]
fn only_callables_can_be_called() {
    assert!(run_err("\"not a function\"();").contains("Can only call functions and classes."));
    assert!(run_err("nil();").contains("Can only call functions and classes."));
}

#[test]
fn clock_native_returns_a_positive_number() {
    assert_eq!(run("print clock() > 0;"), "true\n");
}

// ─────────────────────────── closures ───────────────────────────

#[test]
fn counter_closure_shares_its_environment_across_calls() {
    let source = "\
fun makeCounter() {
  var i = 0;
  fun inc() {
    i = i + 1;
    print i;
  }
  return inc;
}
var c = makeCounter();
c();
c();
";

    assert_eq!(run(source), "1\n2\n");
}

#[test]
fn sibling_closures_alias_the_same_slot() {
    let source = "\
fun make() {
  var i = 0;
  fun bump() { i = i + 1; print i; }
  fun jump() { i = i + 10; print i; }
  bump();
  jump();
  bump();
}
make();
";

    assert_eq!(run(source), "1\n11\n12\n");
}

#[test]
fn closures_capture_static_scope_not_dynamic() {
    let source = "\
var a = \"global\";
{
  fun show() {
    print a;
  }
  show();
  var a = \"block\";
  show();
}
";

    // both calls see the global: the body resolved `a` at declaration time
    assert_eq!(run(source), "global\nglobal\n");
}

// ─────────────────────────── error semantics ───────────────────────────

#[test]
fn runtime_error_aborts_the_script_but_keeps_partial_output() {
    let (output, error) = run_capture("print 1; print -\"a\"; print 2;");

    assert_eq!(output, "1\n");

    let error = error.expect("expected a runtime error");
    assert!(error.contains("Operand must be a number."));
}

#[test]
fn interpreting_twice_against_fresh_globals_is_deterministic() {
    let source = "var total = 0; for (var i = 1; i <= 4; i = i + 1) total = total + i; print total;";

    assert_eq!(run(source), run(source));
    assert_eq!(run(source), "10\n");
}

// ─────────────────────────── static analysis ───────────────────────────

#[test]
fn initializer_self_reference_is_rejected() {
    let errors = resolve_errors("{ var a = 1; { var a = a + 1; } }");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Can't read local variable in its own initializer."));

    // at global scope there are no local scopes to misread
    assert!(resolve_errors("var a = 1; var a = a + 1;").is_empty());
}

#[test]
fn top_level_return_is_rejected() {
    let errors = resolve_errors("return 1;");

    assert!(errors[0].contains("Can't return from top-level code."));
}

#[test]
fn this_and_super_outside_a_class_are_rejected() {
    assert!(resolve_errors("print this;")[0].contains("Can't use 'this' outside of a class."));
    assert!(resolve_errors("print super.init;")[0]
        .contains("Can't use 'super' outside of a class."));
}

// ─────────────────────────── class stubs ───────────────────────────

#[test]
fn class_declarations_are_a_runtime_stub() {
    assert!(run_err("class Foo {}").contains("Classes are not supported yet."));
}

#[test]
fn property_access_on_non_instances_fails() {
    assert!(run_err("var s = \"x\"; print s.len;").contains("Only instances have properties."));
    assert!(run_err("var s = \"x\"; s.len = 1;").contains("Only instances have fields."));
}
