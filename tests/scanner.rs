use klox::scanner::Scanner;
use klox::token::{Token, TokenType};

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let scanner = Scanner::new(source);
    let tokens: Vec<Token> = scanner.filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), expected.len());

    for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
        assert_eq!(actual.token_type, *expected_type);
        assert_eq!(actual.lexeme, *expected_lexeme);
    }
}

#[test]
fn symbols() {
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
fn one_and_two_character_operators() {
    assert_token_sequence(
        "! != = == < <= > >= - / ;",
        &[
            (TokenType::BANG, "!"),
            (TokenType::BANG_EQUAL, "!="),
            (TokenType::EQUAL, "="),
            (TokenType::EQUAL_EQUAL, "=="),
            (TokenType::LESS, "<"),
            (TokenType::LESS_EQUAL, "<="),
            (TokenType::GREATER, ">"),
            (TokenType::GREATER_EQUAL, ">="),
            (TokenType::MINUS, "-"),
            (TokenType::SLASH, "/"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn keywords_and_identifiers() {
    assert_token_sequence(
        "var language = nil; while (true) or_else",
        &[
            (TokenType::VAR, "var"),
            (TokenType::IDENTIFIER, "language"),
            (TokenType::EQUAL, "="),
            (TokenType::NIL, "nil"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::WHILE, "while"),
            (TokenType::LEFT_PAREN, "("),
            (TokenType::TRUE, "true"),
            (TokenType::RIGHT_PAREN, ")"),
            (TokenType::IDENTIFIER, "or_else"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn string_literal_strips_quotes_from_value_only() {
    let tokens: Vec<Token> = Scanner::new("\"hello\"").filter_map(Result::ok).collect();

    assert_eq!(tokens.len(), 2);
    assert_eq!(tokens[0].lexeme, "\"hello\"");

    match &tokens[0].token_type {
        TokenType::STRING(value) => assert_eq!(value, "hello"),
        other => panic!("expected STRING, got {:?}", other),
    }
}

#[test]
fn multiline_string_advances_line_counter() {
    let tokens: Vec<Token> = Scanner::new("\"a\nb\" done")
        .filter_map(Result::ok)
        .collect();

    assert_eq!(tokens[0].line, 2);
    assert_eq!(tokens[1].lexeme, "done");
    assert_eq!(tokens[1].line, 2);
}

#[test]
fn number_literals() {
    let tokens: Vec<Token> = Scanner::new("123 45.67 8.").filter_map(Result::ok).collect();

    match tokens[0].token_type {
        TokenType::NUMBER(n) => assert_eq!(n, 123.0),
        _ => panic!("expected NUMBER"),
    }

    match tokens[1].token_type {
        TokenType::NUMBER(n) => assert_eq!(n, 45.67),
        _ => panic!("expected NUMBER"),
    }

    // A trailing dot is not part of the number.
    assert_eq!(tokens[2].lexeme, "8");
    assert_eq!(tokens[3].token_type, TokenType::DOT);
}

#[test]
fn comments_and_newlines_track_lines() {
    let source = "// first line comment\nvar a; // trailing\nvar b;";
    let tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();

    assert_eq!(tokens[0].lexeme, "var");
    assert_eq!(tokens[0].line, 2);
    assert_eq!(tokens[3].lexeme, "var");
    assert_eq!(tokens[3].line, 3);
}

#[test]
fn unexpected_characters_are_reported_and_skipped() {
    let results: Vec<_> = Scanner::new(",.$(#").collect();

    // COMMA, DOT, error, LEFT_PAREN, error, EOF
    assert_eq!(results.len(), 6);

    let errors: Vec<String> = results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .map(|e| e.to_string())
        .collect();

    assert_eq!(
        errors,
        vec![
            "[line 1] Error: Unexpected character: $".to_string(),
            "[line 1] Error: Unexpected character: #".to_string(),
        ]
    );

    let kinds: Vec<&TokenType> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|t| &t.token_type)
        .collect();

    assert_eq!(kinds.len(), 4);
    assert_eq!(*kinds[0], TokenType::COMMA);
    assert_eq!(*kinds[3], TokenType::EOF);
}

#[test]
fn unterminated_string_is_an_error() {
    let results: Vec<_> = Scanner::new("var s = \"oops").collect();

    let error = results
        .iter()
        .find_map(|r| r.as_ref().err())
        .expect("expected a scan error");

    assert_eq!(error.to_string(), "[line 1] Error: Unterminated string.");
}
