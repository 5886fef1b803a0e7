use loxide as lox;

use lox::scanner::Scanner;
use lox::token::TokenType;

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let scanner = Scanner::new(source.as_bytes());
    let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), expected.len());

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

#[test]
fn test_scanner_symbols() {
    assert_token_sequence(
        "({*.,+*})",
        &[
            (TokenType::LEFT_PAREN, "("),
            (TokenType::LEFT_BRACE, "{"),
            (TokenType::STAR, "*"),
            (TokenType::DOT, "."),
            (TokenType::COMMA, ","),
            (TokenType::PLUS, "+"),
            (TokenType::STAR, "*"),
            (TokenType::RIGHT_BRACE, "}"),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn test_scanner_one_or_two_char_operators() {
    assert_token_sequence(
        "! != = == < <= > >= /",
        &[
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::SLASH, "/"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn test_scanner_keywords_and_identifiers() {
    assert_token_sequence(
        "var foo = fun_ny; while whiles",
        &[
            (TokenType::VAR, "var"),
            (TokenType::IDENTIFIER, "foo"),
            (TokenType::EQUAL, "="),
            (TokenType::IDENTIFIER, "fun_ny"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::WHILE, "while"),
            (TokenType::IDENTIFIER, "whiles"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn test_scanner_number_literals() {
    let tokens: Vec<_> = Scanner::new(b"12 3.75")
        .filter_map(Result::ok)
        .collect();

    assert_eq!(tokens.len(), 3);

    match tokens[0].token_type {
        TokenType::NUMBER(n) => assert_eq!(n, 12.0),
        ref other => panic!("expected NUMBER, got {:?}", other),
    }

    match tokens[1].token_type {
        TokenType::NUMBER(n) => assert_eq!(n, 3.75),
        ref other => panic!("expected NUMBER, got {:?}", other),
    }
}

#[test]
fn test_scanner_string_literal_is_raw() {
    let tokens: Vec<_> = Scanner::new(br#""hi \n there""#)
        .filter_map(Result::ok)
        .collect();

    match &tokens[0].token_type {
        // No escape processing: the backslash survives verbatim.
        TokenType::STRING(s) => assert_eq!(s, r"hi \n there"),
        other => panic!("expected STRING, got {:?}", other),
    }
}

#[test]
fn test_scanner_comments_and_lines() {
    let tokens: Vec<_> = Scanner::new(b"a // comment\nb")
        .filter_map(Result::ok)
        .collect();

    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0].line, 1);
    assert_eq!(tokens[1].line, 2);
}

#[test]
fn test_scanner_unexpected_character() {
    let mut scanner = Scanner::new(b",.$(");

    assert!(scanner.next().unwrap().is_ok());
    assert!(scanner.next().unwrap().is_ok());

    let err = scanner.next().unwrap().unwrap_err();
    assert!(
        err.to_string().contains("Unexpected character: $"),
        "unexpected message: {}",
        err
    );
}

#[test]
fn test_scan_tokens_stops_at_first_error() {
    let result = Scanner::new(b"var x = $;").scan_tokens();

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Unexpected character"));
}

#[test]
fn test_scanner_unterminated_string() {
    let err = Scanner::new(b"\"oops").scan_tokens().unwrap_err();

    assert!(err.to_string().contains("Unterminated string."));
}

#[test]
fn test_scan_tokens_appends_eof() {
    let tokens = Scanner::new(b"1 + 2").scan_tokens().unwrap();

    assert_eq!(tokens.last().unwrap().token_type, TokenType::EOF);
}
