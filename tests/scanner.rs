use treelox::scanner::Scanner;
use treelox::token::{Token, TokenType};

fn scan(source: &str) -> Vec<treelox::error::Result<Token>> {
    Scanner::new(source.as_bytes().to_vec()).collect()
}

fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
    let tokens: Vec<_> = scan(source).into_iter().filter_map(Result::ok).collect();

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
fn two_character_operators_use_maximal_munch() {
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
fn comments_extend_to_end_of_line() {
    assert_token_sequence(
        "var x = 1; // the rest is ignored != ==\nvar",
        &[
            (TokenType::VAR, "var"),
            (TokenType::IDENTIFIER, "x"),
            (TokenType::EQUAL, "="),
            (TokenType::NUMBER(1.0), "1"),
            (TokenType::SEMICOLON, ";"),
            (TokenType::VAR, "var"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn keywords_are_distinguished_from_identifiers() {
    assert_token_sequence(
        "class classy break breaker this super",
        &[
            (TokenType::CLASS, "class"),
            (TokenType::IDENTIFIER, "classy"),
            (TokenType::BREAK, "break"),
            (TokenType::IDENTIFIER, "breaker"),
            (TokenType::THIS, "this"),
            (TokenType::SUPER, "super"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn identifiers_allow_underscores_and_digits() {
    assert_token_sequence(
        "_private var_2 x",
        &[
            (TokenType::IDENTIFIER, "_private"),
            (TokenType::IDENTIFIER, "var_2"),
            (TokenType::IDENTIFIER, "x"),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn numbers_with_and_without_fraction() {
    let tokens: Vec<_> = scan("12 3.5").into_iter().filter_map(Result::ok).collect();

    assert!(matches!(tokens[0].token_type, TokenType::NUMBER(n) if n == 12.0));
    assert!(matches!(tokens[1].token_type, TokenType::NUMBER(n) if n == 3.5));
}

#[test]
fn trailing_dot_is_not_part_of_the_number() {
    assert_token_sequence(
        "123.",
        &[
            (TokenType::NUMBER(123.0), "123"),
            (TokenType::DOT, "."),
            (TokenType::EOF, ""),
        ],
    );
}

#[test]
fn string_literal_payload_excludes_quotes() {
    let tokens: Vec<_> = scan("\"hello\"").into_iter().filter_map(Result::ok).collect();

    match &tokens[0].token_type {
        TokenType::STRING(s) => assert_eq!(s, "hello"),
        other => panic!("expected string token, got {:?}", other),
    }
}

#[test]
fn strings_may_span_newlines_and_count_lines() {
    let tokens: Vec<_> = scan("\"a\nb\"\nvar").into_iter().filter_map(Result::ok).collect();

    // The string token carries the line it began on.
    assert_eq!(tokens[0].line, 1);
    // The scanner counted the newline inside the string plus the one after.
    assert_eq!(tokens[1].line, 3);
    assert_eq!(tokens[1].token_type, TokenType::VAR);
}

#[test]
fn line_numbers_advance_per_newline() {
    let tokens: Vec<_> = scan("var\n\nx").into_iter().filter_map(Result::ok).collect();

    assert_eq!(tokens[0].line, 1);
    assert_eq!(tokens[1].line, 3);
}

#[test]
fn unterminated_string_is_a_lexical_error() {
    let results = scan("\"oops");
    let err = results
        .into_iter()
        .find_map(Result::err)
        .expect("expected a lexical error");

    assert!(err.to_string().contains("Unterminated string"));
}

#[test]
fn unexpected_character_names_the_character() {
    let results = scan(",.$(#");

    let errors: Vec<_> = results.iter().filter(|r| r.is_err()).collect();
    assert_eq!(errors.len(), 2, "one error per bad character");

    let messages: Vec<String> = results
        .iter()
        .filter_map(|r| r.as_ref().err().map(|e| e.to_string()))
        .collect();
    assert!(messages[0].contains('$'));
    assert!(messages[1].contains('#'));

    // Scanning continues after an error.
    let kinds: Vec<_> = results
        .iter()
        .filter_map(|r| r.as_ref().ok().map(|t| t.token_type.clone()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            TokenType::COMMA,
            TokenType::DOT,
            TokenType::LEFT_PAREN,
            TokenType::EOF
        ]
    );
}
