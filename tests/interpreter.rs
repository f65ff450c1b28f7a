use std::cell::RefCell;
use std::rc::Rc;

use treelox::error::{LoxError, Result};
use treelox::interpreter::Interpreter;
use treelox::parser::Parser;
use treelox::resolver::Resolver;
use treelox::scanner::Scanner;

/// Run a program through the whole pipeline, printing into `sink` so output
/// stays observable even when the program fails partway.
fn try_run(source: &str, sink: Rc<RefCell<Vec<u8>>>) -> Result<()> {
    let tokens = Scanner::new(source.as_bytes().to_vec()).collect::<Result<Vec<_>>>()?;
    let statements = Parser::new(tokens).parse()?;

    let mut interpreter = Interpreter::with_output(sink);
    Resolver::new(&mut interpreter).resolve(&statements)?;
    interpreter.interpret(&statements)
}

fn captured(sink: &Rc<RefCell<Vec<u8>>>) -> String {
    String::from_utf8(sink.borrow().clone()).expect("program output should be UTF-8")
}

/// Run a program to completion, capturing everything it prints.
fn run(source: &str) -> Result<String> {
    let sink = Rc::new(RefCell::new(Vec::<u8>::new()));
    try_run(source, sink.clone())?;
    Ok(captured(&sink))
}

fn assert_output(source: &str, expected: &str) {
    match run(source) {
        Ok(output) => assert_eq!(output, expected, "for program: {source}"),
        Err(e) => panic!("program failed: {e}\nprogram: {source}"),
    }
}

fn runtime_error(source: &str) -> String {
    match run(source) {
        Err(e @ LoxError::Runtime(_)) => e.to_string(),
        Err(other) => panic!("expected a runtime error, got: {other}"),
        Ok(output) => panic!("expected {source:?} to fail, printed: {output:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Expressions and operators
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn arithmetic_and_grouping() {
    assert_output("print (5 - (3 - 1)) + -1;", "2\n");
    assert_output("print 8 / 2 * 2;", "8\n");
}

#[test]
fn plus_adds_numbers_and_concatenates_strings() {
    assert_output("print 1 + 2;\nprint \"a\" + \"b\";", "3\nab\n");
}

#[test]
fn plus_on_mixed_operands_is_a_type_error() {
    let err = runtime_error("print 1 + \"a\";");
    assert!(err.contains("two numbers or two strings"));
}

#[test]
fn division_by_zero_follows_ieee754() {
    assert_output("print 1 / 0;", "inf\n");
    assert_output("print -1 / 0;", "-inf\n");
}

#[test]
fn comparisons_require_numbers() {
    assert_output("print 1 < 2;\nprint 2 <= 1;\nprint 3 >= 3;", "true\nfalse\ntrue\n");
    let err = runtime_error("print 1 < \"2\";");
    assert!(err.contains("must be numbers"));
}

#[test]
fn unary_minus_requires_a_number() {
    let err = runtime_error("print -\"s\";");
    assert!(err.contains("must be a number"));
}

#[test]
fn bang_negates_truthiness() {
    assert_output("print !nil;\nprint !0;\nprint !!true;", "true\nfalse\ntrue\n");
}

#[test]
fn equality_is_structural_and_never_crosses_tags() {
    assert_output(
        "print nil == nil;\nprint 1 == \"1\";\nprint \"a\" == \"a\";\nprint 1 != 2;",
        "true\nfalse\ntrue\ntrue\n",
    );
}

#[test]
fn zero_and_empty_string_are_truthy() {
    assert_output(
        "if (0) print \"zero\";\nif (\"\") print \"empty\";\nif (nil) print \"no\"; else print \"nil falsy\";",
        "zero\nempty\nnil falsy\n",
    );
}

#[test]
fn logical_operators_short_circuit() {
    assert_output(
        r#"
        var called = false;
        fun touch() { called = true; return true; }
        print false and touch();
        print called;
        print true or touch();
        print called;
        "#,
        "false\nfalse\ntrue\nfalse\n",
    );
}

#[test]
fn or_preserves_the_left_value_and_falls_back() {
    assert_output("print nil or \"fallback\";\nprint \"first\" or \"second\";", "fallback\nfirst\n");
}

#[test]
fn and_yields_the_right_value_when_left_is_truthy() {
    assert_output("print 1 and 2;\nprint false and 2;", "2\nfalse\n");
}

// ─────────────────────────────────────────────────────────────────────────
// Variables and scope
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn var_without_initializer_defaults_to_nil() {
    assert_output("var x;\nprint x;", "nil\n");
}

#[test]
fn assignment_evaluates_to_the_assigned_value() {
    assert_output("var a = 1;\nprint a = 2;\nprint a;", "2\n2\n");
}

#[test]
fn assigning_an_undefined_variable_is_an_error_not_a_declaration() {
    let err = runtime_error("x = 1;");
    assert!(err.contains("undefined variable 'x'"));
}

#[test]
fn reading_an_undefined_variable_is_an_error() {
    let err = runtime_error("print missing;");
    assert!(err.contains("undefined variable 'missing'"));
}

#[test]
fn redeclaring_a_global_is_a_runtime_error() {
    let err = runtime_error("var a = 1;\nvar a = 2;");
    assert!(err.contains("already declared"));
}

#[test]
fn blocks_shadow_without_clobbering() {
    assert_output(
        r#"
        var a = "outer";
        {
            var a = "inner";
            print a;
        }
        print a;
        "#,
        "inner\nouter\n",
    );
}

#[test]
fn while_loops_iterate() {
    assert_output(
        r#"
        var i = 0;
        var sum = 0;
        while (i < 5) {
            sum = sum + i;
            i = i + 1;
        }
        print sum;
        "#,
        "10\n",
    );
}

#[test]
fn break_leaves_only_the_innermost_loop() {
    assert_output(
        r#"
        var i = 0;
        while (i < 2) {
            var j = 0;
            while (true) {
                j = j + 1;
                if (j == 2) break;
            }
            print j;
            i = i + 1;
        }
        "#,
        "2\n2\n",
    );
}

#[test]
fn for_loop_with_break_stops_early() {
    assert_output(
        r#"
        for (var i = 0; i < 5; i = i + 1) {
            if (i == 3) break;
            print i;
        }
        "#,
        "0\n1\n2\n",
    );
}

#[test]
fn for_loop_matches_its_while_translation() {
    let for_loop = "for (var i = 0; i < 4; i = i + 1) print i;";
    let while_loop = "{ var i = 0; while (i < 4) { print i; i = i + 1; } }";
    assert_eq!(run(for_loop).unwrap(), run(while_loop).unwrap());
}

// ─────────────────────────────────────────────────────────────────────────
// Functions and closures
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn functions_return_values_and_default_to_nil() {
    assert_output(
        r#"
        fun f(n) {
            if (n > 0) return "pos";
            return "neg";
        }
        fun g() {}
        print f(1);
        print f(-1);
        print g();
        "#,
        "pos\nneg\nnil\n",
    );
}

#[test]
fn recursion_reaches_the_function_through_its_own_name() {
    assert_output(
        r#"
        fun fib(n) {
            if (n <= 1) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(10);
        "#,
        "55\n",
    );
}

#[test]
fn closures_capture_their_declaration_environment() {
    assert_output(
        r#"
        fun makeCounter() {
            var i = 0;
            fun count() {
                i = i + 1;
                return i;
            }
            return count;
        }
        var counter = makeCounter();
        print counter();
        print counter();
        "#,
        "1\n2\n",
    );
}

#[test]
fn shadowing_after_capture_does_not_rebind_the_closure() {
    assert_output(
        r#"
        var a = "global";
        {
            fun show() { print a; }
            show();
            var a = "block";
            show();
        }
        "#,
        "global\nglobal\n",
    );
}

#[test]
fn closures_see_assignments_to_the_captured_binding() {
    assert_output(
        r#"
        var f;
        {
            var x = 1;
            fun read() { return x; }
            f = read;
            x = 2;
        }
        print f();
        "#,
        "2\n",
    );
}

#[test]
fn function_values_display_by_name() {
    assert_output("fun f() {}\nprint f;", "<fn f>\n");
}

#[test]
fn calling_a_non_callable_is_an_error() {
    let err = runtime_error("var x = 1;\nx();");
    assert!(err.contains("can only call"));
}

#[test]
fn arity_mismatch_evaluates_no_arguments() {
    let source = r#"
        fun f(a, b) {}
        fun touch() { print "touched"; return 1; }
        f(touch());
    "#;
    let sink = Rc::new(RefCell::new(Vec::<u8>::new()));
    let err = try_run(source, sink.clone()).expect_err("call should fail the arity check");

    assert!(matches!(err, LoxError::Runtime(_)), "got: {err}");
    assert!(err.to_string().contains("expected 2 arguments but got 1"));
    // The arity check uses the syntactic argument count, so the failing
    // call never ran its argument expression.
    assert_eq!(captured(&sink), "", "argument side effect must not run");
}

#[test]
fn calling_a_non_callable_evaluates_no_arguments() {
    let source = r#"
        var x = 1;
        fun touch() { print "touched"; return 1; }
        x(touch());
    "#;
    let sink = Rc::new(RefCell::new(Vec::<u8>::new()));
    let err = try_run(source, sink.clone()).expect_err("call should fail the callable check");

    assert!(matches!(err, LoxError::Runtime(_)), "got: {err}");
    assert!(err.to_string().contains("can only call"));
    assert_eq!(captured(&sink), "", "argument side effect must not run");
}

// ─────────────────────────────────────────────────────────────────────────
// Classes, instances, inheritance
// ─────────────────────────────────────────────────────────────────────────

#[test]
fn classes_and_instances_display_forms() {
    assert_output("class C {}\nprint C;\nprint C();", "C\n<C instance>\n");
}

#[test]
fn fields_are_created_on_assignment_and_read_back() {
    assert_output(
        r#"
        class Box {}
        var b = Box();
        b.value = 1;
        b.value = b.value + 1;
        print b.value;
        "#,
        "2\n",
    );
}

#[test]
fn methods_reach_the_receiver_through_this() {
    assert_output(
        r#"
        class Counter {
            init() { this.count = 0; }
            bump() {
                this.count = this.count + 1;
                return this.count;
            }
        }
        var c = Counter();
        c.bump();
        print c.bump();
        "#,
        "2\n",
    );
}

#[test]
fn an_extracted_method_stays_bound_to_its_instance() {
    assert_output(
        r#"
        class Greeter {
            init(name) { this.name = name; }
            greet() { print this.name; }
        }
        var g = Greeter("ada");
        var m = g.greet;
        m();
        "#,
        "ada\n",
    );
}

#[test]
fn initializer_receives_constructor_arguments() {
    assert_output(
        r#"
        class Point {
            init(x, y) {
                this.x = x;
                this.y = y;
            }
        }
        var p = Point(1, 2);
        print p.x + p.y;
        "#,
        "3\n",
    );
}

#[test]
fn constructor_arity_comes_from_the_initializer() {
    let err = runtime_error("class C { init(a) {} }\nC();");
    assert!(err.contains("expected 1 arguments but got 0"));
}

#[test]
fn bare_return_in_initializer_yields_the_instance() {
    assert_output("class C { init() { return; } }\nprint C();", "<C instance>\n");
}

#[test]
fn early_return_in_initializer_keeps_fields_set_so_far() {
    assert_output(
        r#"
        class C {
            init() {
                this.x = 1;
                if (this.x == 1) return;
                this.x = 2;
            }
        }
        print C().x;
        "#,
        "1\n",
    );
}

#[test]
fn methods_are_inherited() {
    assert_output(
        r#"
        class A { m() { print "m"; } }
        class B < A {}
        B().m();
        "#,
        "m\n",
    );
}

#[test]
fn super_calls_the_overridden_method() {
    assert_output(
        r#"
        class A { hello() { print "A"; } }
        class B < A { hello() { super.hello(); print "B"; } }
        B().hello();
        "#,
        "A\nB\n",
    );
}

#[test]
fn super_lookup_walks_past_an_empty_intermediate_class() {
    assert_output(
        r#"
        class A { speak() { print "A"; } }
        class B < A {}
        class C < B { speak() { super.speak(); print "C"; } }
        C().speak();
        "#,
        "A\nC\n",
    );
}

#[test]
fn super_method_binds_the_current_instance() {
    assert_output(
        r#"
        class A {
            name() { return this.label; }
        }
        class B < A {
            describe() { print super.name(); }
        }
        var b = B();
        b.label = "bound";
        b.describe();
        "#,
        "bound\n",
    );
}

#[test]
fn undefined_property_is_an_error() {
    let err = runtime_error("class C {}\nprint C().nope;");
    assert!(err.contains("undefined property 'nope'"));
}

#[test]
fn property_access_on_non_instances_is_an_error() {
    let err = runtime_error("print 1.x;");
    assert!(err.contains("only instances have properties"));
}

#[test]
fn superclass_must_be_a_class() {
    let err = runtime_error("var NotAClass = 1;\nclass B < NotAClass {}");
    assert!(err.contains("superclass must be a class"));
}
