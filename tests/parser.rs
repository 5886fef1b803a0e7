use loxide as lox;

use lox::ast::Stmt;
use lox::ast_printer::AstPrinter;
use lox::error::LoxError;
use lox::parser::Parser;
use lox::scanner::Scanner;

fn parse_source(source: &str) -> Result<Vec<Stmt>, Vec<LoxError>> {
    let tokens = Scanner::new(source.as_bytes())
        .scan_tokens()
        .expect("source should scan");

    Parser::new(tokens).parse()
}

fn print_source(source: &str) -> String {
    let statements = parse_source(source).expect("source should parse");

    AstPrinter::new().print(&statements)
}

#[test]
fn test_precedence_multiplication_over_addition() {
    assert_eq!(
        print_source("print 1 + 2 * 3;"),
        "(print (+ 1.0 (* 2.0 3.0)))\n"
    );
}

#[test]
fn test_grouping_and_unary() {
    assert_eq!(
        print_source("print -(1 + 2) * !true;"),
        "(print (* (- (group (+ 1.0 2.0))) (! true)))\n"
    );
}

#[test]
fn test_logical_operators_bind_looser_than_equality() {
    assert_eq!(
        print_source("print a == 1 or b == 2 and c;"),
        "(print (or (== a 1.0) (and (== b 2.0) c)))\n"
    );
}

#[test]
fn test_for_desugars_to_while() {
    let expected = "\
{
  (var i 0.0)
  (while (< i 3.0))
    {
      (print i)
      (stmt (= i (+ i 1.0)))
    }
}
";

    assert_eq!(
        print_source("for (var i = 0; i < 3; i = i + 1) print i;"),
        expected
    );
}

#[test]
fn test_for_condition_defaults_to_true() {
    let expected = "\
(while true)
  (stmt (call tick))
";

    assert_eq!(print_source("for (;;) tick();"), expected);
}

#[test]
fn test_property_access_and_assignment() {
    assert_eq!(
        print_source("x.y = z.w(1);"),
        "(stmt (set x y (call (. z w) 1.0)))\n"
    );
}

#[test]
fn test_class_declaration_with_superclass() {
    let expected = "\
class A < B
{
  m(x)
  {
    (return x)
  }
}
";

    assert_eq!(print_source("class A < B { m(x) { return x; } }"), expected);
}

#[test]
fn test_super_and_this_expressions() {
    assert_eq!(
        print_source("class B < A { m() { return super.m() == this; } }"),
        "\
class B < A
{
  m()
  {
    (return (== (call (super m)) this))
  }
}
"
    );
}

#[test]
fn test_invalid_assignment_target() {
    let errors = parse_source("1 = 2;").unwrap_err();

    assert_eq!(errors.len(), 1);
    assert!(errors[0].to_string().contains("Invalid assignment target."));
}

#[test]
fn test_synchronization_reports_multiple_errors() {
    let errors = parse_source(
        "var 1 = 2;
print 3;
)
print 4;
",
    )
    .unwrap_err();

    assert_eq!(errors.len(), 2);
    assert!(errors[0].to_string().contains("Expect variable name."));
    assert!(errors[1].to_string().contains("Expect expression."));
}

#[test]
fn test_error_location_at_end() {
    let errors = parse_source("print 1").unwrap_err();

    assert!(errors[0].to_string().contains("at end"));
}

fn function_with_params(count: usize) -> String {
    let params: Vec<String> = (0..count).map(|i| format!("p{}", i)).collect();

    format!("fun f({}) {{}}", params.join(", "))
}

fn call_with_args(count: usize) -> String {
    let args: Vec<String> = (0..count).map(|i| format!("{}", i)).collect();

    format!("f({});", args.join(", "))
}

#[test]
fn test_255_parameters_accepted() {
    assert!(parse_source(&function_with_params(255)).is_ok());
}

#[test]
fn test_256_parameters_rejected_but_parse_continues() {
    let errors = parse_source(&function_with_params(256)).unwrap_err();

    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .to_string()
        .contains("Can't have more than 255 parameters."));
}

#[test]
fn test_255_arguments_accepted() {
    assert!(parse_source(&call_with_args(255)).is_ok());
}

#[test]
fn test_256_arguments_rejected_but_parse_continues() {
    let errors = parse_source(&call_with_args(256)).unwrap_err();

    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .to_string()
        .contains("Can't have more than 255 arguments."));
}

#[test]
fn test_parse_is_deterministic() {
    let source = "\
fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }
class A < B { init(x) { this.x = x; } }
for (var i = 0; i < 10; i = i + 1) print fib(i);
";

    assert_eq!(print_source(source), print_source(source));
}
