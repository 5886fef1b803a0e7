use loxide as lox;

use lox::error::LoxError;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;

fn resolve_source(source: &str) -> Result<(), Vec<LoxError>> {
    let tokens = Scanner::new(source.as_bytes())
        .scan_tokens()
        .expect("source should scan");

    let statements = Parser::new(tokens).parse().expect("source should parse");

    let mut interpreter = Interpreter::new(Vec::new());

    Resolver::new(&mut interpreter).resolve(&statements)
}

fn assert_resolve_error(source: &str, expected: &str) {
    let errors = resolve_source(source).unwrap_err();

    assert!(
        errors.iter().any(|e| e.to_string().contains(expected)),
        "expected an error containing {:?}, got {:?}",
        expected,
        errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_top_level_return_rejected() {
    assert_resolve_error("return 1;", "Can't return from top-level code.");
}

#[test]
fn test_return_inside_function_allowed() {
    assert!(resolve_source("fun f() { return 1; }").is_ok());
}

#[test]
fn test_initializer_cannot_return_value() {
    assert_resolve_error(
        "class T { init() { return 1; } }",
        "Can't return a value from an initializer.",
    );
}

#[test]
fn test_initializer_bare_return_allowed() {
    assert!(resolve_source("class T { init() { return; } }").is_ok());
}

#[test]
fn test_method_may_return_value() {
    assert!(resolve_source("class T { m() { return 1; } }").is_ok());
}

#[test]
fn test_this_outside_class_rejected() {
    assert_resolve_error("print this;", "Can't use 'this' outside of a class.");
}

#[test]
fn test_this_in_nested_function_outside_class_rejected() {
    assert_resolve_error(
        "fun f() { print this; }",
        "Can't use 'this' outside of a class.",
    );
}

#[test]
fn test_super_outside_class_rejected() {
    assert_resolve_error("print super.m;", "Can't use 'super' outside of a class.");
}

#[test]
fn test_super_without_superclass_rejected() {
    assert_resolve_error(
        "class A { m() { super.m(); } }",
        "Can't use 'super' in a class with no superclass.",
    );
}

#[test]
fn test_super_with_superclass_allowed() {
    assert!(resolve_source(
        "class A { m() {} } class B < A { m() { super.m(); } }"
    )
    .is_ok());
}

#[test]
fn test_self_inheritance_rejected() {
    assert_resolve_error("class A < A {}", "A class can't inherit from itself.");
}

#[test]
fn test_duplicate_local_rejected() {
    assert_resolve_error(
        "fun f() { var a = 1; var a = 2; }",
        "Already a variable with this name in this scope.",
    );
}

#[test]
fn test_duplicate_parameter_rejected() {
    assert_resolve_error(
        "fun f(a, a) {}",
        "Already a variable with this name in this scope.",
    );
}

#[test]
fn test_shadowing_in_inner_scope_allowed() {
    assert!(resolve_source("{ var a = 1; { var a = 2; } }").is_ok());
}

#[test]
fn test_self_referential_initializer_rejected() {
    assert_resolve_error(
        "{ var a = a; }",
        "Can't read local variable in its own initializer.",
    );
}

#[test]
fn test_global_initializer_may_reference_itself() {
    // Globals are not tracked by the scope stack; this resolves (and fails
    // only at runtime).
    assert!(resolve_source("var a = a;").is_ok());
}

#[test]
fn test_multiple_errors_collected_in_one_pass() {
    let errors = resolve_source("return 1;\nprint this;").unwrap_err();

    assert_eq!(errors.len(), 2);
}

#[test]
fn test_closures_resolve() {
    assert!(resolve_source(
        "fun makeCounter() { var i = 0; fun c() { i = i + 1; return i; } return c; }"
    )
    .is_ok());
}
