#[cfg(test)]
mod parser_tests {
    use yellow_interpreter as yellow;

    use yellow::ast::Ast;
    use yellow::error::YellowError;
    use yellow::parser::Parser;
    use yellow::scanner::Scanner;
    use yellow::stmt::Stmt;
    use yellow::token::Token;

    fn tokens(source: &str) -> Vec<Token> {
        Scanner::new(source.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("test source must lex cleanly")
    }

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens = tokens(source);
        Parser::new(&tokens)
            .parse()
            .unwrap_or_else(|errors| panic!("test source must parse cleanly: {:?}", errors))
    }

    fn parse_errors(source: &str) -> Vec<YellowError> {
        let tokens = tokens(source);
        match Parser::new(&tokens).parse() {
            Ok(_) => Vec::new(),
            Err(errors) => errors,
        }
    }

    fn printed(source: &str) -> Vec<String> {
        let printer = Ast;
        parse(source)
            .iter()
            .map(|stmt| printer.print_stmt(stmt))
            .collect()
    }

    #[test]
    fn test_factor_binds_tighter_than_term() {
        assert_eq!(printed("2 + 3 * 4;"), vec!["(; (+ 2.0 (* 3.0 4.0)))"]);
    }

    #[test]
    fn test_comparison_binds_looser_than_term() {
        assert_eq!(printed("1 + 2 < 4;"), vec!["(; (< (+ 1.0 2.0) 4.0))"]);
    }

    #[test]
    fn test_unary_and_grouping() {
        assert_eq!(
            printed("-(1 + 2) * !done;"),
            vec!["(; (* (- (group (+ 1.0 2.0))) (! done)))"]
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(printed("a = b = 1;"), vec!["(; (= a (= b 1.0)))"]);
    }

    #[test]
    fn test_logical_precedence() {
        // or binds looser than and
        assert_eq!(
            printed("a or b and c;"),
            vec!["(; (or a (and b c)))"]
        );
    }

    #[test]
    fn test_call_and_property_chains() {
        assert_eq!(
            printed("obj.field.method(1, 2);"),
            vec!["(; (call (. (. obj field) method) 1.0 2.0))"]
        );
    }

    #[test]
    fn test_property_assignment_becomes_set() {
        assert_eq!(
            printed("obj.field = 3;"),
            vec!["(; (= (. obj field) 3.0))"]
        );
    }

    #[test]
    fn test_for_desugars_to_while_in_blocks() {
        assert_eq!(
            printed("for (var i = 0; i < 2; i = i + 1) print i;"),
            vec!["(block (var i 0.0) (while (< i 2.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );
    }

    #[test]
    fn test_for_without_clauses_desugars_to_bare_while() {
        assert_eq!(
            printed("for (;;) print 1;"),
            vec!["(while true (print 1.0))"]
        );
    }

    #[test]
    fn test_class_with_superclass_and_method() {
        assert_eq!(
            printed("class B < A { m() { return 1; } }"),
            vec!["(class B (< A) (fun m () (return 1.0)))"]
        );
    }

    #[test]
    fn test_super_and_this_in_method() {
        assert_eq!(
            printed("class B < A { m() { return super.m() + this.x; } }"),
            vec!["(class B (< A) (fun m () (return (+ (call (super m)) (. this x)))))"]
        );
    }

    #[test]
    fn test_invalid_assignment_target() {
        let errors = parse_errors("1 = 2;");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Invalid assignment target"));
    }

    #[test]
    fn test_two_broken_statements_report_two_errors() {
        let errors = parse_errors("var 1 = 2; print; var x = 3;");

        assert_eq!(errors.len(), 2, "one error per broken statement");
        assert!(errors[0].to_string().contains("Expected variable name"));
        assert!(errors[1].to_string().contains("Expected expression"));
    }

    #[test]
    fn test_recovery_bounds_cascade_to_one_error() {
        // The broken print statement swallows everything to the next ';';
        // the cascade stays a single reported error.
        let errors = parse_errors("print (1 var x = 1;");

        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_statement_after_recovery_still_parses() {
        let errors = parse_errors("print (1; var x = 1; print;");

        // the first and third statements are broken, the middle one parses
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_error_at_end_location() {
        let errors = parse_errors("print 1");

        assert_eq!(errors.len(), 1);
        let rendered = errors[0].to_string();
        assert!(
            rendered.starts_with("ERROR at end:"),
            "expected at-end location, got: {}",
            rendered
        );
    }

    #[test]
    fn test_error_carries_offending_lexeme() {
        let errors = parse_errors("var 1 = 2;");

        assert!(errors[0].to_string().contains("at '1'"));
    }

    #[test]
    fn test_missing_class_body_is_error() {
        let errors = parse_errors("class A");

        assert_eq!(errors.len(), 1);
        assert!(errors[0]
            .to_string()
            .contains("Expected '{' before class body"));
    }
}
