#[cfg(test)]
mod scanner_tests {
    use yellow_interpreter as yellow;

    use yellow::scanner::Scanner;
    use yellow::token::{Token, TokenType};

    fn scan_tokens(source: &str) -> Vec<Token> {
        Scanner::new(source.as_bytes())
            .filter_map(Result::ok)
            .collect()
    }

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let tokens = scan_tokens(source);

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
    fn test_scanner_two_char_operators() {
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
    fn test_scanner_keywords_and_identifiers() {
        assert_token_sequence(
            "var foo = nil; while classify fun",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "foo"),
                (TokenType::EQUAL, "="),
                (TokenType::NIL, "nil"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::WHILE, "while"),
                // prefix of a keyword is still an identifier
                (TokenType::IDENTIFIER, "classify"),
                (TokenType::FUN, "fun"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_number_literals() {
        let tokens = scan_tokens("12 3.5 0.25");

        assert_eq!(tokens.len(), 4);

        match tokens[0].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 12.0),
            ref t => panic!("expected NUMBER, got {:?}", t),
        }
        match tokens[1].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 3.5),
            ref t => panic!("expected NUMBER, got {:?}", t),
        }
        match tokens[2].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 0.25),
            ref t => panic!("expected NUMBER, got {:?}", t),
        }
    }

    #[test]
    fn test_scanner_trailing_dot_is_not_fractional() {
        // "4." lexes as NUMBER(4) then DOT: a '.' only joins the number when
        // a digit follows it.
        assert_token_sequence(
            "4.",
            &[
                (TokenType::NUMBER(4.0), "4"),
                (TokenType::DOT, "."),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_string_literal() {
        let tokens = scan_tokens("\"hello world\"");

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].lexeme, "\"hello world\"");

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hello world"),
            t => panic!("expected STRING, got {:?}", t),
        }
    }

    #[test]
    fn test_scanner_multiline_string_counts_lines() {
        let tokens = scan_tokens("\"a\nb\"\nfoo");

        // string spans lines 1-2, identifier sits on line 3
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[1].lexeme, "foo");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_scanner_comments_and_lines() {
        let tokens = scan_tokens("// first line\nprint 1;");

        assert_eq!(tokens[0].token_type, TokenType::PRINT);
        assert_eq!(tokens[0].line, 2);
    }

    #[test]
    fn test_scanner_unterminated_string_is_error() {
        let results: Vec<_> = Scanner::new(b"\"oops").collect();

        // one error, then the EOF token
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());

        let message = results[0].as_ref().err().map(|e| e.to_string());
        assert!(message
            .as_deref()
            .is_some_and(|m| m.contains("Unterminated string.")));

        assert!(results[1].is_ok());
    }

    #[test]
    fn test_scanner_recovers_from_unexpected_chars() {
        let results: Vec<_> = Scanner::new(b",.$(#").collect();

        // Expected sequence:
        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            let rendered = err.to_string();
            assert!(
                rendered.contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                rendered
            );
        }

        fn assert_token_matches(
            result: &Result<Token, yellow::error::YellowError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(token.token_type, expected_type);
                    assert_eq!(token.lexeme, expected_lexeme);
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn test_scanner_lex_error_format() {
        let results: Vec<_> = Scanner::new(b"@").collect();

        let rendered = results[0].as_ref().err().map(|e| e.to_string());
        assert_eq!(
            rendered.as_deref(),
            Some("ERROR : Unexpected character: @ - [line:1]")
        );
    }

    #[test]
    fn test_scanner_is_fused() {
        let mut scanner = Scanner::new(b"1");

        assert!(scanner.next().is_some()); // NUMBER
        assert!(scanner.next().is_some()); // EOF
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_token_display_number_and_string() {
        let tokens = scan_tokens("3 2.5 \"hi\" foo");

        assert_eq!(tokens[0].to_string(), "NUMBER 3 3.0");
        assert_eq!(tokens[1].to_string(), "NUMBER 2.5 2.5");
        assert_eq!(tokens[2].to_string(), "STRING \"hi\" hi");
        assert_eq!(tokens[3].to_string(), "IDENTIFIER foo null");
    }
}
