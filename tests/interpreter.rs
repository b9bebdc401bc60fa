#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::Write;
    use std::rc::Rc;

    use yellow_interpreter as yellow;

    use yellow::error::YellowError;
    use yellow::interpreter::Interpreter;
    use yellow::parser::Parser;
    use yellow::resolver::Resolver;
    use yellow::scanner::Scanner;
    use yellow::stmt::Stmt;
    use yellow::token::Token;

    /// Clonable in-memory sink so a test can keep reading what the
    /// interpreter wrote.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn parse(source: &str) -> Vec<Stmt> {
        let tokens: Vec<Token> = Scanner::new(source.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("test source must lex cleanly");

        Parser::new(&tokens)
            .parse()
            .unwrap_or_else(|errors| panic!("test source must parse cleanly: {:?}", errors))
    }

    /// Full pipeline against a capturing interpreter.  Panics on static
    /// errors; returns captured output plus the runtime result.
    fn run(source: &str) -> (String, Result<(), YellowError>) {
        let statements = parse(source);

        let buf = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));

        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .unwrap_or_else(|errors| panic!("test source must resolve cleanly: {:?}", errors));

        let result = interpreter.interpret(&statements);
        let output = String::from_utf8(buf.0.borrow().clone()).expect("output is UTF-8");

        (output, result)
    }

    /// Runs a program that must succeed; returns its printed output.
    fn run_ok(source: &str) -> String {
        let (output, result) = run(source);

        if let Err(e) = result {
            panic!("program failed: {}", e);
        }

        output
    }

    /// Runs a program that must hit a runtime error; returns output so far
    /// plus the rendered diagnostic.
    fn run_err(source: &str) -> (String, String) {
        let (output, result) = run(source);

        match result {
            Ok(()) => panic!("program unexpectedly succeeded, output: {output}"),
            Err(e) => (output, e.to_string()),
        }
    }

    /// Resolver diagnostics for a source, rendered.  Empty when clean.
    fn resolve_errors(source: &str) -> Vec<String> {
        let statements = parse(source);
        let mut interpreter = Interpreter::with_output(Box::new(SharedBuf::default()));

        match Resolver::new(&mut interpreter).resolve(&statements) {
            Ok(()) => Vec::new(),
            Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    // ───────────────────────── expressions & operators ──────────────────────

    #[test]
    fn test_arithmetic_precedence() {
        assert_eq!(run_ok("print 2 + 3 * 4;"), "14\n");
        assert_eq!(run_ok("print (2 + 3) * 4;"), "20\n");
        assert_eq!(run_ok("print 7 / 2;"), "3.5\n");
        assert_eq!(run_ok("print 1 - 2 - 3;"), "-4\n");
    }

    #[test]
    fn test_division_by_zero_follows_float_semantics() {
        assert_eq!(run_ok("print 1 / 0;"), "inf\n");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(run_ok("print \"a\" + \"b\";"), "ab\n");
    }

    #[test]
    fn test_mixed_plus_is_runtime_error() {
        let (output, message) = run_err("print \"a\" + 1;");

        assert_eq!(output, "");
        assert!(message.contains("Operands must be two numbers or two strings"));
    }

    #[test]
    fn test_comparison_and_equality() {
        assert_eq!(
            run_ok("print 1 < 2; print 2 <= 2; print 3 > 4; print 2 >= 2;"),
            "true\ntrue\nfalse\ntrue\n"
        );
        assert_eq!(
            run_ok("print \"x\" == \"x\"; print nil == nil; print 1 == \"1\"; print 1 != 2;"),
            "true\ntrue\nfalse\ntrue\n"
        );
    }

    #[test]
    fn test_comparison_requires_numbers() {
        let (_, message) = run_err("print \"a\" < \"b\";");

        assert!(message.contains("Operands must be numbers"));
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(
            run_ok("print -3; print !true; print !nil; print !0;"),
            "-3\nfalse\ntrue\nfalse\n"
        );

        let (_, message) = run_err("print -\"x\";");
        assert!(message.contains("Operand must be a number"));
    }

    #[test]
    fn test_truthiness_zero_and_empty_string_are_truthy() {
        assert_eq!(
            run_ok("if (0) print \"zero\"; if (\"\") print \"empty\"; if (nil) print \"nil\"; else print \"falsey\";"),
            "zero\nempty\nfalsey\n"
        );
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_eq!(
            run_ok("print \"hi\" or 2; print nil or \"yes\"; print nil and 2; print 1 and 2;"),
            "hi\nyes\nnil\n2\n"
        );

        // the right operand must not be evaluated when the left decides
        assert_eq!(
            run_ok("var a = 1; false and (a = 2); print a; true or (a = 3); print a;"),
            "1\n1\n"
        );
    }

    #[test]
    fn test_number_display_trims_integral_fraction() {
        assert_eq!(run_ok("print 3.0; print 2.5; print 100;"), "3\n2.5\n100\n");
    }

    // ─────────────────────────── scoping & closures ─────────────────────────

    #[test]
    fn test_block_shadowing_restores_outer_binding() {
        assert_eq!(
            run_ok("var x = 1; { var x = 2; print x; } print x;"),
            "2\n1\n"
        );
    }

    #[test]
    fn test_assignment_in_block_mutates_outer() {
        assert_eq!(run_ok("var x = 1; { x = 2; } print x;"), "2\n");
    }

    #[test]
    fn test_closure_counter_instances_are_independent() {
        let source = "
            fun makeCounter() {
              var count = 0;
              fun increment() {
                count = count + 1;
                return count;
              }
              return increment;
            }
            var a = makeCounter();
            var b = makeCounter();
            print a();
            print a();
            print b();
        ";

        assert_eq!(run_ok(source), "1\n2\n1\n");
    }

    #[test]
    fn test_closure_resolves_to_declaration_scope() {
        // The canonical regression for distance-by-node-identity: both calls
        // must see the binding that existed at showA's declaration.
        let source = "
            var a = \"global\";
            {
              fun showA() {
                print a;
              }
              showA();
              var a = \"block\";
              showA();
            }
        ";

        assert_eq!(run_ok(source), "global\nglobal\n");
    }

    #[test]
    fn test_two_closures_share_one_frame() {
        let source = "
            fun pair() {
              var n = 0;
              fun bump() { n = n + 1; }
              fun read() { return n; }
              bump();
              bump();
              return read;
            }
            print pair()();
        ";

        assert_eq!(run_ok(source), "2\n");
    }

    #[test]
    fn test_global_forward_reference_from_function() {
        // Globals resolve by name at call time, so a function may reference
        // a global declared after it.
        let source = "
            fun late() { return amount; }
            var amount = 7;
            print late();
        ";

        assert_eq!(run_ok(source), "7\n");
    }

    // ─────────────────────────── functions & return ─────────────────────────

    #[test]
    fn test_function_without_return_yields_nil() {
        assert_eq!(run_ok("fun f() {} print f();"), "nil\n");
    }

    #[test]
    fn test_bare_return_unwinds() {
        assert_eq!(
            run_ok("fun f() { return; print \"unreached\"; } f(); print \"done\";"),
            "done\n"
        );
    }

    #[test]
    fn test_return_from_nested_block() {
        assert_eq!(
            run_ok("fun f() { while (true) { return 42; } } print f();"),
            "42\n"
        );
    }

    #[test]
    fn test_recursion() {
        let source = "
            fun fib(n) {
              if (n < 2) return n;
              return fib(n - 1) + fib(n - 2);
            }
            print fib(10);
        ";

        assert_eq!(run_ok(source), "55\n");
    }

    #[test]
    fn test_arity_mismatch_is_call_site_error() {
        let (_, message) = run_err("fun f(a, b) { print a; } f(1);");

        assert!(message.contains("Expected 2 arguments but got 1"));
    }

    #[test]
    fn test_calling_non_callable() {
        let (_, message) = run_err("var x = 1; x();");

        assert!(message.contains("Can only call functions and classes."));
    }

    #[test]
    fn test_function_display() {
        assert_eq!(run_ok("fun f() {} print f;"), "<fn f>\n");
        assert_eq!(run_ok("print clock;"), "<native fn clock>\n");
    }

    // ────────────────────────────── while / for ─────────────────────────────

    #[test]
    fn test_desugared_for_loop_runs() {
        assert_eq!(
            run_ok("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn test_while_loop() {
        assert_eq!(
            run_ok("var i = 3; while (i > 0) { print i; i = i - 1; }"),
            "3\n2\n1\n"
        );
    }

    // ────────────────────────────── classes ─────────────────────────────────

    #[test]
    fn test_class_display_and_instance_display() {
        assert_eq!(
            run_ok("class Toast {} print Toast; print Toast();"),
            "<class Toast>\n<instance <class Toast>>\n"
        );
    }

    #[test]
    fn test_methods_and_fields() {
        let source = "
            class Toast {
              topping() { return \"jam\"; }
            }
            var t = Toast();
            print t.topping();
            t.flavor = \"wheat\";
            print t.flavor;
        ";

        assert_eq!(run_ok(source), "jam\nwheat\n");
    }

    #[test]
    fn test_this_binds_receiver() {
        let source = "
            class Cake {
              taste() {
                print \"The \" + this.flavor + \" cake is delicious\";
              }
            }
            var cake = Cake();
            cake.flavor = \"chocolate\";
            cake.taste();
        ";

        assert_eq!(run_ok(source), "The chocolate cake is delicious\n");
    }

    #[test]
    fn test_detached_method_keeps_receiver() {
        let source = "
            class Box { value() { return this.v; } }
            var b = Box();
            b.v = 9;
            var m = b.value;
            print m();
        ";

        assert_eq!(run_ok(source), "9\n");
    }

    #[test]
    fn test_init_runs_with_constructor_arguments() {
        let source = "
            class Point {
              init(x, y) {
                this.x = x;
                this.y = y;
              }
            }
            var p = Point(1, 2);
            print p.x;
            print p.y;
        ";

        assert_eq!(run_ok(source), "1\n2\n");
    }

    #[test]
    fn test_class_arity_comes_from_init() {
        let (_, message) = run_err("class P { init(a, b) {} } P(1);");

        assert!(message.contains("Expected 2 arguments but got 1"));

        let (_, message) = run_err("class Q {} Q(1);");

        assert!(message.contains("Expected 0 arguments but got 1"));
    }

    #[test]
    fn test_bare_return_in_init_still_yields_instance() {
        let source = "
            class Foo {
              init() {
                this.v = 1;
                if (true) return;
                this.v = 2;
              }
            }
            var f = Foo();
            print f.v;
            print f.init();
        ";

        // calling init directly also returns the receiver
        assert_eq!(run_ok(source), "1\n<instance <class Foo>>\n");
    }

    #[test]
    fn test_fields_shadow_methods_on_read() {
        let source = "
            class C {
              name() { return \"method\"; }
            }
            var c = C();
            c.name = \"field\";
            print c.name;
        ";

        assert_eq!(run_ok(source), "field\n");
    }

    #[test]
    fn test_undefined_property_is_runtime_error() {
        let (_, message) = run_err("class T {} var t = T(); print t.nope;");

        assert!(message.contains("Undefined property 'nope'."));
    }

    #[test]
    fn test_property_access_on_non_instance() {
        let (_, message) = run_err("var s = \"str\"; print s.len;");
        assert!(message.contains("Only instances have properties"));

        let (_, message) = run_err("var n = 1; n.x = 2;");
        assert!(message.contains("Only instances have fields"));
    }

    // ───────────────────────────── inheritance ──────────────────────────────

    #[test]
    fn test_method_resolution_prefers_subclass() {
        let source = "
            class A {
              who() { return \"A\"; }
              shared() { return \"from A\"; }
            }
            class B < A {
              who() { return \"B\"; }
            }
            var b = B();
            print b.who();
            print b.shared();
        ";

        assert_eq!(run_ok(source), "B\nfrom A\n");
    }

    #[test]
    fn test_super_invokes_immediate_superclass_bound_to_receiver() {
        let source = "
            class A {
              method() { return \"A method\"; }
            }
            class B < A {
              method() { return \"B method\"; }
              test() { return super.method(); }
            }
            class C < B {}
            print C().test();
        ";

        // super inside B::test refers to A even when the receiver is a C
        assert_eq!(run_ok(source), "A method\n");
    }

    #[test]
    fn test_inherited_init_constructs_through_chain() {
        let source = "
            class Base {
              init(v) { this.v = v; }
            }
            class Derived < Base {}
            print Derived(5).v;
        ";

        assert_eq!(run_ok(source), "5\n");
    }

    #[test]
    fn test_superclass_must_be_a_class() {
        let (_, message) = run_err("var NotAClass = \"x\"; class Sub < NotAClass {}");

        assert!(message.contains("Superclass must be a class"));
    }

    // ─────────────────────────── runtime error flow ─────────────────────────

    #[test]
    fn test_undefined_variable() {
        let (_, message) = run_err("print missing;");

        assert!(message.contains("Undefined variable 'missing'."));
    }

    #[test]
    fn test_runtime_error_format_and_abort() {
        let (output, message) = run_err("print 1; print missing; print 2;");

        // statements before the failure ran, statements after did not
        assert_eq!(output, "1\n");
        assert_eq!(message, "Undefined variable 'missing'. - [line: 1]");
    }

    #[test]
    fn test_assignment_to_undefined_is_error() {
        let (_, message) = run_err("missing = 1;");

        assert!(message.contains("Undefined variable 'missing'."));
    }

    // ──────────────────────────── native bridge ─────────────────────────────

    #[test]
    fn test_native_print_writes_without_newline() {
        assert_eq!(
            run_ok("__print__(\"a\"); __print__(\"b\"); __println__(\"c\");"),
            "abc\n"
        );
    }

    #[test]
    fn test_native_print_stringifies() {
        assert_eq!(run_ok("__println__(3.0); __println__(nil);"), "3\nnil\n");
    }

    #[test]
    fn test_list_operations() {
        let source = "
            var l = __list__();
            __list__append__(l, 1);
            __list__append__(l, 2);
            print __list__len__(l);
            print __list__get__(l, 0);
            print __list__set__(l, 0, 9);
            print __list__get__(l, 0);
            print __list__delete__(l, 1);
            print l;
        ";

        assert_eq!(run_ok(source), "2\n1\n1\n9\n2\n[9]\n");
    }

    #[test]
    fn test_list_append_returns_true() {
        assert_eq!(
            run_ok("var l = __list__(); print __list__append__(l, 1);"),
            "true\n"
        );
    }

    #[test]
    fn test_list_shares_by_reference() {
        let source = "
            var a = __list__();
            var b = a;
            __list__append__(a, 1);
            print __list__len__(b);
            print a == b;
        ";

        assert_eq!(run_ok(source), "1\ntrue\n");
    }

    #[test]
    fn test_list_type_mismatch() {
        let (_, message) = run_err("__list__append__(1, 2);");

        assert!(message.contains("Invalid list append operation: Not a list object"));
    }

    #[test]
    fn test_list_index_out_of_bounds() {
        let (_, message) = run_err("var l = __list__(); __list__get__(l, 3);");
        assert!(message.contains("Invalid list get operation: index out of bounds"));

        let (_, message) = run_err("var l = __list__(); __list__get__(l, 0 - 1);");
        assert!(message.contains("index out of bounds"));
    }

    #[test]
    fn test_list_index_must_be_number() {
        let (_, message) = run_err("var l = __list__(); __list__get__(l, \"0\");");

        assert!(message.contains("Invalid list get operation: Index must be a number"));
    }

    #[test]
    fn test_native_error_surfaces_with_call_line() {
        let (_, message) = run_err("var l = __list__();\n\n__list__get__(l, 3);");

        assert!(message.ends_with("- [line: 3]"), "got: {message}");
    }

    #[test]
    fn test_map_operations() {
        let source = "
            var m = __map__();
            __map__set__(m, \"k\", 1);
            print __map__get__(m, \"k\");
            print __map__get__(m, \"missing\");
            print __map__len__(m);
            __map__set__(m, \"b\", 2);
            print m;
            print __map__delete__(m, \"b\");
            print __map__len__(m);
        ";

        // map display iterates in key order
        assert_eq!(run_ok(source), "1\nnil\n1\n{b: 2, k: 1}\n2\n1\n");
    }

    #[test]
    fn test_map_key_must_be_string() {
        let (_, message) = run_err("var m = __map__(); __map__set__(m, 1, 2);");

        assert!(message.contains("Invalid map set operation: Key not a string"));
    }

    #[test]
    fn test_map_type_mismatch() {
        let (_, message) = run_err("__map__len__(42);");

        assert!(message.contains("Invalid map len operation: Not a map object"));
    }

    // ─────────────────────────── resolver statics ───────────────────────────

    #[test]
    fn test_read_local_in_own_initializer() {
        let errors = resolve_errors("{ var a = a; }");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Can't read local variable in its own initialiser"));
    }

    #[test]
    fn test_redeclaration_in_block_scope() {
        let errors = resolve_errors("{ var a = 1; var a = 2; }");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Variable already declared in this scope"));
    }

    #[test]
    fn test_global_redeclaration_is_permitted() {
        assert_eq!(resolve_errors("var a = 1; var a = 2;"), Vec::<String>::new());
        assert_eq!(run_ok("var a = 1; var a = 2; print a;"), "2\n");
    }

    #[test]
    fn test_top_level_return_rejected() {
        let errors = resolve_errors("return 1;");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Can't return from top-level code"));
    }

    #[test]
    fn test_return_value_in_initializer_rejected() {
        let errors = resolve_errors("class F { init() { return 5; } }");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Can't return a value from an initialiser"));

        // a bare return is fine
        assert_eq!(
            resolve_errors("class F { init() { return; } }"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_this_outside_class_rejected() {
        let errors = resolve_errors("print this;");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Can't use 'this' outside of a class"));
    }

    #[test]
    fn test_super_placement_rules() {
        let errors = resolve_errors("print super.x;");
        assert!(errors[0].contains("Can't use 'super' outside of a class"));

        let errors = resolve_errors("class A { m() { return super.m(); } }");
        assert!(errors[0].contains("Can't use 'super' in a class with no superclass."));
    }

    #[test]
    fn test_class_cannot_inherit_from_itself() {
        let errors = resolve_errors("class A < A {}");

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("A class can't inherit from itself"));
    }

    #[test]
    fn test_resolver_collects_multiple_errors() {
        let errors = resolve_errors("return 1; print this;");

        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_resolver_error_format() {
        let errors = resolve_errors("return 1;");

        assert_eq!(
            errors[0],
            "ERROR at 'return': Can't return from top-level code - [line:1]"
        );
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let statements = parse("{ var a = 1; { var b = a; print b; } }");
        let mut interpreter = Interpreter::with_output(Box::new(SharedBuf::default()));

        // resolving the same tree twice records the same distances and is
        // not an error
        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("first resolve");
        Resolver::new(&mut interpreter)
            .resolve(&statements)
            .expect("second resolve");

        interpreter.interpret(&statements).expect("interpret");
    }

    #[test]
    fn test_repl_style_sequential_runs_share_globals() {
        let buf = SharedBuf::default();
        let mut interpreter = Interpreter::with_output(Box::new(buf.clone()));

        for source in ["var a = 1;", "fun f() { return a; }", "print f();"] {
            let statements = parse(source);
            Resolver::new(&mut interpreter)
                .resolve(&statements)
                .expect("resolve");
            interpreter.interpret(&statements).expect("interpret");
        }

        let output = String::from_utf8(buf.0.borrow().clone()).expect("output is UTF-8");
        assert_eq!(output, "1\n");
    }
}
