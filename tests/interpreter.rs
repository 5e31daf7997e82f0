mod common;

#[cfg(test)]
mod interpreter_tests {
    use pretty_assertions::assert_eq;

    use std::io::{self, Write};

    use crate::common::{output_of, run, runtime_error_of, session};
    use rox::lox::{Lox, Outcome, EXIT_COMPILE_ERROR, EXIT_RUNTIME_ERROR};
    use rox::parser::Parser;
    use rox::scanner::Scanner;

    /// Output sink that refuses every write.
    struct ClosedOutput;

    impl Write for ClosedOutput {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn arithmetic_and_number_formatting() {
        assert_eq!(
            output_of("print 6 / 3; print 1 + 2 * 3; print 7 / 2; print -0.5 * 4; print 1 / 0;"),
            vec!["2", "7", "3.5", "-2", "inf"]
        );
    }

    #[test]
    fn strings_concatenate() {
        assert_eq!(output_of(r#"print "a" + "b"; print "" + "x";"#), vec!["ab", "x"]);
    }

    #[test]
    fn comparison_and_equality() {
        assert_eq!(
            output_of(
                r#"print 1 < 2; print 2 <= 1; print "a" == "a"; print nil == false; print 1 == "1"; print 3 != 3;"#
            ),
            vec!["true", "false", "true", "false", "false", "false"]
        );
    }

    #[test]
    fn truthiness_and_logical_operators() {
        assert_eq!(
            output_of(
                r#"
                if (0) print "zero is truthy";
                if ("") print "empty string is truthy";
                if (nil) print "unreachable"; else print "nil is falsy";
                print nil or "default";
                print false and missing;
                print 1 and 2;
                print !nil;
                "#
            ),
            vec![
                "zero is truthy",
                "empty string is truthy",
                "nil is falsy",
                "default",
                "false",
                "2",
                "true",
            ]
        );
    }

    #[test]
    fn uninitialized_variables_are_nil() {
        assert_eq!(output_of("var a; print a;"), vec!["nil"]);
    }

    #[test]
    fn block_scoping_and_shadowing() {
        assert_eq!(
            output_of("var a = 10; { var a = a + 1; print a; } print a;"),
            vec!["11", "10"]
        );
    }

    #[test]
    fn assignment_reaches_the_enclosing_frame() {
        assert_eq!(
            output_of("var a = 1; { a = 2; { a = a + 1; } } print a;"),
            vec!["3"]
        );
    }

    #[test]
    fn while_and_for_loops() {
        assert_eq!(
            output_of(
                r#"
                var i = 0;
                while (i < 3) { print i; i = i + 1; }
                for (var j = 0; j < 2; j = j + 1) print "j" + "";
                "#
            ),
            vec!["0", "1", "2", "j", "j"]
        );
    }

    #[test]
    fn recursion() {
        assert_eq!(
            output_of("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(15);"),
            vec!["610"]
        );
    }

    #[test]
    fn closure_counters_are_independent() {
        let source = r#"
            fun makeCounter() {
                var i = 0;
                fun count() { i = i + 1; return i; }
                return count;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a();
            print a();
            print b();
            print a();
        "#;

        assert_eq!(output_of(source), vec!["1", "2", "1", "3"]);
    }

    #[test]
    fn closures_share_the_captured_frame() {
        let source = r#"
            var get;
            var set;
            {
                var shared = "before";
                fun g() { return shared; }
                fun s(v) { shared = v; }
                get = g;
                set = s;
            }
            set("after");
            print get();
        "#;

        assert_eq!(output_of(source), vec!["after"]);
    }

    #[test]
    fn each_loop_iteration_gets_a_fresh_scope() {
        let source = r#"
            var first;
            var second;
            for (var i = 0; i < 2; i = i + 1) {
                var j = i;
                fun show() { print j; }
                if (i == 0) first = show; else second = show;
            }
            first();
            second();
        "#;

        assert_eq!(output_of(source), vec!["0", "1"]);
    }

    #[test]
    fn function_without_return_yields_nil() {
        assert_eq!(output_of("fun f() {} print f();"), vec!["nil"]);
    }

    #[test]
    fn return_exits_nested_loops() {
        let source = r#"
            fun first() {
                for (var i = 0; i < 10; i = i + 1) {
                    while (true) { return i; }
                }
            }
            print first();
        "#;

        assert_eq!(output_of(source), vec!["0"]);
    }

    #[test]
    fn classes_fields_and_methods() {
        let source = r#"
            class Point {
                init(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            var p = Point(1, 2);
            print p.sum();
            p.x = 10;
            print p.sum();
            print p;
            print Point;
        "#;

        assert_eq!(output_of(source), vec!["3", "12", "Point instance", "Point"]);
    }

    #[test]
    fn bound_methods_remember_their_instance() {
        let source = r#"
            class Box {
                init(v) { this.v = v; }
                get() { return this.v; }
            }
            var m = Box("kept").get;
            var other = Box("other");
            other.m = m;
            print m();
            print other.m();
        "#;

        assert_eq!(output_of(source), vec!["kept", "kept"]);
    }

    #[test]
    fn fields_shadow_methods() {
        assert_eq!(
            output_of(r#"class A { m() { return "method"; } } var a = A(); a.m = "field"; print a.m;"#),
            vec!["field"]
        );
    }

    #[test]
    fn calling_init_directly_returns_the_instance() {
        let source = r#"
            class Foo { init() { this.n = 1; return; } }
            var foo = Foo();
            print foo.init() == foo;
            print foo.n;
        "#;

        assert_eq!(output_of(source), vec!["true", "1"]);
    }

    #[test]
    fn inheritance_override_and_super() {
        let source = r#"
            class A {
                method() { return "A method"; }
                greet() { return "hi from A"; }
            }
            class B < A {
                method() { return "B then " + super.method(); }
            }
            class C < B {}
            var c = C();
            print c.method();
            print c.greet();
        "#;

        assert_eq!(output_of(source), vec!["B then A method", "hi from A"]);
    }

    #[test]
    fn inherited_initializer_sets_arity() {
        let source = r#"
            class Base { init(name) { this.name = name; } }
            class Derived < Base {}
            print Derived("d").name;
        "#;

        assert_eq!(output_of(source), vec!["d"]);
        assert_eq!(
            runtime_error_of("class Base { init(a) {} } class Derived < Base {} Derived();"),
            "Expected 1 arguments but got 0."
        );
    }

    #[test]
    fn value_display() {
        assert_eq!(
            output_of("fun f() {} class K {} print f; print clock; print K; print nil; print true;"),
            vec!["<fn f>", "<native fn>", "K", "nil", "true"]
        );
    }

    #[test]
    fn clock_returns_a_number() {
        assert_eq!(output_of("var t = clock(); print t > 0; print t - t;"), vec!["true", "0"]);
    }

    #[test]
    fn object_equality_is_identity() {
        assert_eq!(
            output_of("class A {} var a = A(); var b = A(); print a == a; print a == b; print A == A;"),
            vec!["true", "false", "true"]
        );
    }

    #[test]
    fn runtime_error_messages() {
        assert_eq!(runtime_error_of(r#"print 1 + "a";"#), "Operands must be two numbers or two strings.");
        assert_eq!(runtime_error_of(r#"print "a" - 1;"#), "Operands must be numbers.");
        assert_eq!(runtime_error_of(r#"print -"a";"#), "Operand must be a number.");
        assert_eq!(runtime_error_of("print missing;"), "Undefined variable 'missing'.");
        assert_eq!(runtime_error_of("missing = 1;"), "Undefined variable 'missing'.");
        assert_eq!(runtime_error_of(r#""text"();"#), "Can only call functions and classes.");
        assert_eq!(runtime_error_of("fun f() {} f(1);"), "Expected 0 arguments but got 1.");
        assert_eq!(runtime_error_of("var x = 1; print x.y;"), "Only instances have properties.");
        assert_eq!(runtime_error_of("var x = 1; x.y = 2;"), "Only instances have fields.");
        assert_eq!(runtime_error_of("class A {} print A().nope;"), "Undefined property 'nope'.");
        assert_eq!(runtime_error_of("var NotClass = 1; class B < NotClass {}"), "Superclass must be a class.");
    }

    #[test]
    fn runtime_error_reports_line_and_exit_code() {
        let (outcome, output) = run("print 1;\nprint 2;\nprint nil * 2;\nprint 3;");

        assert_eq!(output, "1\n2\n");
        let Outcome::RuntimeError(e) = &outcome else {
            panic!("expected a runtime error, got {:?}", outcome);
        };
        assert_eq!(e.line, 3);
        assert_eq!(e.to_string(), "Operands must be numbers.\n[line 3]");
        assert_eq!(outcome.exit_code(), EXIT_RUNTIME_ERROR);
    }

    #[test]
    fn compile_errors_prevent_execution() {
        let (outcome, output) = run("print 1;\nprint ;");

        assert_eq!(output, "");
        assert_eq!(outcome.exit_code(), EXIT_COMPILE_ERROR);
    }

    #[test]
    fn session_keeps_globals_between_runs() {
        let (mut lox, out) = session();

        assert!(lox.run("var count = 1;").is_success());
        assert!(lox.run("fun bump() { count = count + 1; return count; }").is_success());
        assert!(lox.run("print bump();").is_success());
        assert_eq!(out.contents(), "2\n");
    }

    #[test]
    fn session_recovers_after_a_runtime_error_inside_a_block() {
        let (mut lox, out) = session();

        assert!(lox.run("var x = \"global\";").is_success());

        let failed: Outcome = lox.run("{ var x = \"inner\"; print nil + 1; }");
        assert_eq!(failed.exit_code(), EXIT_RUNTIME_ERROR);

        out.clear();
        assert!(lox.run("print x;").is_success());
        assert_eq!(out.contents(), "global\n");
    }

    #[test]
    fn session_resolves_against_earlier_globals() {
        let (mut lox, out) = session();

        assert!(lox.run("var a = 1;").is_success());
        assert!(lox.run("{ var a = a + 1; print a; }").is_success());
        assert_eq!(out.contents(), "2\n");
    }

    #[test]
    fn running_the_same_program_twice_gives_the_same_output() {
        let source = r#"
            class Counter { init() { this.n = 0; } inc() { this.n = this.n + 1; return this; } }
            print Counter().inc().inc().n;
        "#;

        assert_eq!(output_of(source), output_of(source));
        assert_eq!(output_of(source), vec!["2"]);
    }

    #[test]
    fn unresolved_top_level_return_is_a_runtime_error() {
        let (tokens, _) = Scanner::new("print 1;\nreturn;\nprint 2;").scan_all();
        let statements = Parser::new(tokens).parse().expect("program should parse");

        let (mut lox, out) = session();
        let outcome: Outcome = lox.interpret(&statements);

        let Outcome::RuntimeError(e) = &outcome else {
            panic!("expected a runtime error, got {:?}", outcome);
        };
        assert_eq!(e.message, "Can't return from top-level code.");
        assert_eq!(e.line, 2);
        assert_eq!(out.contents(), "1\n");
    }

    #[test]
    fn failed_print_reports_the_print_line() {
        let mut lox = Lox::with_output(Box::new(ClosedOutput));

        let Outcome::RuntimeError(e) = lox.run("var a = 1;\n\nprint a;") else {
            panic!("expected a runtime error");
        };
        assert_eq!(e.line, 3);
        assert_eq!(e.message, "Failed to write output: closed");
    }
}
