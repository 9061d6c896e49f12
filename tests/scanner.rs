use treelox as lox;

use lox::scanner::Scanner;
use lox::token::{Token, TokenType};

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let tokens: Vec<Token<'_>> = Scanner::new(source).filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), expected.len(), "token count for {:?}", source);

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

#[test]
fn scans_punctuation() {
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
fn scans_one_and_two_character_operators() {
    assert_token_sequence(
        "! != = == < <= > >=",
        &[
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn keywords_are_distinguished_from_identifiers() {
    assert_token_sequence(
        "var varx fun function nil or orchid",
        &[
            (TokenType::VAR, "var"),
            (TokenType::IDENTIFIER, "varx"),
            (TokenType::FUN, "fun"),
            (TokenType::IDENTIFIER, "function"),
            (TokenType::NIL, "nil"),
            (TokenType::OR, "or"),
            (TokenType::IDENTIFIER, "orchid"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn number_literal_round_trips() {
    let tokens: Vec<Token<'_>> = Scanner::new("123 3.14").filter_map(Result::ok).collect();

    let TokenType::NUMBER(n) = tokens[0].token_type else {
        panic!("expected a number token");
    };
    assert_eq!(n, 123.0);
    assert_eq!(tokens[0].lexeme, "123");

    let TokenType::NUMBER(n) = tokens[1].token_type else {
        panic!("expected a number token");
    };
    assert_eq!(n, 3.14);
}

#[test]
fn trailing_dot_is_not_part_of_the_number() {
    let tokens: Vec<Token<'_>> = Scanner::new("4.").filter_map(Result::ok).collect();

    assert_eq!(tokens[0].token_type, TokenType::NUMBER(0.0));
    assert_eq!(tokens[0].lexeme, "4");
    assert_eq!(tokens[1].token_type, TokenType::DOT);
    assert_eq!(tokens[2].token_type, TokenType::EOF);
}

#[test]
fn string_literal_round_trips() {
    let tokens: Vec<Token<'_>> = Scanner::new("\"abc\"").filter_map(Result::ok).collect();

    let TokenType::STRING(ref s) = tokens[0].token_type else {
        panic!("expected a string token");
    };
    assert_eq!(s, "abc");
    assert_eq!(tokens[0].lexeme, "\"abc\"");
}

#[test]
fn multi_line_string_advances_the_line_counter() {
    let tokens: Vec<Token<'_>> = Scanner::new("\"a\nb\"\nx").filter_map(Result::ok).collect();

    let TokenType::STRING(ref s) = tokens[0].token_type else {
        panic!("expected a string token");
    };
    assert_eq!(s, "a\nb");
    assert_eq!(tokens[0].line, 2);

    assert_eq!(tokens[1].token_type, TokenType::IDENTIFIER);
    assert_eq!(tokens[1].line, 3);
}

#[test]
fn comments_run_to_end_of_line() {
    assert_token_sequence(
        "1 // the rest is ignored ))){{{\n2",
        &[
            (TokenType::NUMBER(0.0), "1"),
            (TokenType::NUMBER(0.0), "2"),
            (TokenType::EOF, ""),
        ],
    );

    // a comment at EOF terminates without a newline
    assert_token_sequence("// only a comment", &[(TokenType::EOF, "")]);
}

#[test]
fn line_numbers_follow_newlines() {
    let tokens: Vec<Token<'_>> = Scanner::new("1\n2\n\n3").filter_map(Result::ok).collect();

    assert_eq!(tokens[0].line, 1);
    assert_eq!(tokens[1].line, 2);
    assert_eq!(tokens[2].line, 4);
    assert_eq!(tokens[3].line, 4); // EOF
}

#[test]
fn unexpected_characters_are_reported_and_scanning_continues() {
    let results: Vec<_> = Scanner::new(",.@(#").collect();

    // COMMA, DOT, error, LEFT_PAREN, error, EOF
    assert_eq!(results.len(), 6);

    assert_eq!(
        results[0].as_ref().unwrap().token_type,
        TokenType::COMMA,
        "first token"
    );
    assert_eq!(results[1].as_ref().unwrap().token_type, TokenType::DOT);
    assert_eq!(
        results[3].as_ref().unwrap().token_type,
        TokenType::LEFT_PAREN
    );
    assert_eq!(results[5].as_ref().unwrap().token_type, TokenType::EOF);

    let errors: Vec<String> = results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .map(ToString::to_string)
        .collect();

    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("Unexpected character '@'."));
    assert!(errors[1].contains("Unexpected character '#'."));
}

#[test]
fn unterminated_string_is_reported() {
    let results: Vec<_> = Scanner::new("\"abc").collect();

    assert_eq!(results.len(), 2); // the error, then EOF

    let err = results[0].as_ref().expect_err("expected a lex error");
    assert!(err.to_string().contains("Unterminated string."));

    assert_eq!(results[1].as_ref().unwrap().token_type, TokenType::EOF);
}

#[test]
fn exactly_one_eof_token() {
    let mut scanner = Scanner::new("1 2");

    let kinds: Vec<TokenType> = scanner
        .by_ref()
        .filter_map(Result::ok)
        .map(|t| t.token_type)
        .collect();

    assert_eq!(
        kinds,
        vec![
            TokenType::NUMBER(0.0),
            TokenType::NUMBER(0.0),
            TokenType::EOF
        ]
    );

    // fused: the iterator stays exhausted
    assert!(scanner.next().is_none());
}

#[test]
fn tokenize_display_format() {
    let tokens: Vec<Token<'_>> = Scanner::new("(123 \"hi\" 2.5")
        .filter_map(Result::ok)
        .collect();

    assert_eq!(tokens[0].to_string(), "LEFT_PAREN ( null");
    assert_eq!(tokens[1].to_string(), "NUMBER 123 123.0");
    assert_eq!(tokens[2].to_string(), "STRING \"hi\" hi");
    assert_eq!(tokens[3].to_string(), "NUMBER 2.5 2.5");
    assert_eq!(tokens[4].to_string(), "EOF  null");
}
