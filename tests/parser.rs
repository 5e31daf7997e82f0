#[cfg(test)]
mod parser_tests {
    use pretty_assertions::assert_eq;

    use rox::ast::{Expr, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::parser::Parser;
    use rox::scanner::Scanner;

    fn parse(source: &str) -> Result<Vec<Stmt>, Vec<String>> {
        let (tokens, lex_errors) = Scanner::new(source).scan_all();
        assert!(lex_errors.is_empty(), "unexpected lexical errors");

        Parser::new(tokens)
            .parse()
            .map_err(|errors| errors.iter().map(|e| e.to_string()).collect())
    }

    fn printed(source: &str) -> Vec<String> {
        parse(source)
            .expect("source should parse")
            .iter()
            .map(AstPrinter::print_stmt)
            .collect()
    }

    fn expression(source: &str) -> String {
        let (tokens, _) = Scanner::new(source).scan_all();
        let expr: Expr = Parser::new(tokens)
            .parse_expression()
            .expect("expression should parse");
        AstPrinter::print(&expr)
    }

    #[test]
    fn precedence_climbs_from_assignment_to_primary() {
        assert_eq!(expression("1 + 2 * 3"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(expression("-1 - -2"), "(- (- 1.0) (- 2.0))");
        assert_eq!(expression("!true == false"), "(== (! true) false)");
        assert_eq!(expression("1 < 2 == 3 >= 4"), "(== (< 1.0 2.0) (>= 3.0 4.0))");
        assert_eq!(expression("a or b and c"), "(or a (and b c))");
        assert_eq!(expression("(1 + 2) / 3"), "(/ (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(expression("a = b = 3"), "(= a (= b 3.0))");
    }

    #[test]
    fn binary_operators_are_left_associative() {
        assert_eq!(expression("1 - 2 - 3"), "(- (- 1.0 2.0) 3.0)");
        assert_eq!(expression("8 / 4 / 2"), "(/ (/ 8.0 4.0) 2.0)");
    }

    #[test]
    fn calls_and_property_access_chain() {
        assert_eq!(expression("f(1)(2, x)"), "(call (call f 1.0) 2.0 x)");
        assert_eq!(expression("a.b.c()"), "(call (. (. a b) c))");
        assert_eq!(expression("a.b = 1"), "(= (. a b) 1.0)");
    }

    #[test]
    fn for_loop_desugars_into_while_inside_a_block() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            vec!["(block (var i 0.0) (while (< i 3.0) (block (print i) (; (= i (+ i 1.0))))))"]
        );
    }

    #[test]
    fn for_loop_without_clauses_loops_on_true() {
        assert_eq!(printed("for (;;) print 1;"), vec!["(while true (print 1.0))"]);
    }

    #[test]
    fn class_with_superclass_and_methods() {
        assert_eq!(
            printed("class B < A { init(x) { this.x = x; } get() { return super.get(); } }"),
            vec![
                "(class B < A (fun init(x) (; (= (. this x) x))) (fun get() (return (call (super get)))))"
            ]
        );
    }

    #[test]
    fn declarations_and_control_flow() {
        assert_eq!(
            printed("var a; fun f(x, y) { if (x) return y; else return; } while (a) {}"),
            vec![
                "(var a)",
                "(fun f(x y) (if-else x (return y) (return)))",
                "(while a (block))",
            ]
        );
    }

    #[test]
    fn invalid_assignment_target_is_reported() {
        assert_eq!(
            parse("1 + 2 = 3;").unwrap_err(),
            vec!["[line 1] Error at '=': Invalid assignment target"]
        );
    }

    #[test]
    fn recovers_and_reports_every_statement_error() {
        let errors: Vec<String> = parse("var = 1;\nprint 2;\nprint (3;\nvar ok = 4;\n1 +;").unwrap_err();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error at '=': Expected variable name",
                "[line 3] Error at ';': Expected ')' after expression",
                "[line 5] Error at ';': Expected expression",
            ]
        );
    }

    #[test]
    fn missing_semicolon_at_end_of_input() {
        assert_eq!(
            parse("print 1").unwrap_err(),
            vec!["[line 1] Error at end: Expected ';' after value"]
        );
    }

    #[test]
    fn argument_cap_is_reported_without_stopping_the_parse() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source: String = format!("f({});\nprint;", args.join(", "));

        let errors: Vec<String> = parse(&source).unwrap_err();

        // The cap error does not swallow the independent error on line 2.
        assert_eq!(errors.len(), 2);
        assert!(errors[0].ends_with("Can't have more than 255 arguments"));
        assert_eq!(errors[1], "[line 2] Error at ';': Expected expression");
    }

    #[test]
    fn parameter_cap_is_reported() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source: String = format!("fun f({}) {{}}", params.join(", "));

        let errors: Vec<String> = parse(&source).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0],
            "[line 1] Error at 'p255': Can't have more than 255 parameters"
        );
    }

    #[test]
    fn variable_nodes_start_unresolved() {
        let statements: Vec<Stmt> = parse("print a;").unwrap();

        let Stmt::Print {
            value: Expr::Variable { depth, .. },
            ..
        } = &statements[0]
        else {
            panic!("expected a print of a variable");
        };
        assert_eq!(depth.get(), None);
    }
}
