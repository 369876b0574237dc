// File: tests/interpreter_tests.rs
//
// End-to-end interpreter tests: source text in, observable behavior out,
// through the public `lumen::vm::Vm` API only.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use lumen::vm::{InterpretResult, Vm};

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn run(source: &str) -> (InterpretResult, String) {
    let buffer = SharedBuffer::default();
    let mut vm = Vm::new().with_output(Box::new(buffer.clone()));
    let result = vm.interpret(source);
    let output = String::from_utf8(buffer.0.borrow().clone()).unwrap();
    (result, output)
}

#[test]
fn arithmetic_respects_operator_precedence_and_grouping() {
    let (result, out) = run("print (1 + 2) * 3 - 4 / 2;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "7\n");
}

#[test]
fn string_concatenation_and_comparison() {
    let source = r#"
        var greeting = "Hello, " + "world!";
        print greeting;
        print greeting == "Hello, world!";
    "#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "Hello, world!\ntrue\n");
}

#[test]
fn ternary_expression_short_circuits_the_untaken_branch() {
    let source = r#"
        fun boom() { return 1 / 0; }
        print true ? "ok" : boom();
    "#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "ok\n");
}

#[test]
fn control_flow_if_while_and_for() {
    let source = r#"
        var sum = 0;
        for (var i = 1; i <= 5; i = i + 1) {
            if (i == 3) {
                sum = sum + 100;
            }
            sum = sum + i;
        }
        print sum;

        var n = 3;
        var fact = 1;
        while (n > 0) {
            fact = fact * n;
            n = n - 1;
        }
        print fact;
    "#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "115\n6\n");
}

#[test]
fn closures_keep_independent_captured_state() {
    let source = r#"
        fun makeCounter() {
            var count = 0;
            fun increment() {
                count = count + 1;
                return count;
            }
            return increment;
        }
        var counterA = makeCounter();
        var counterB = makeCounter();
        counterA();
        counterA();
        counterA();
        print counterA();
        print counterB();
    "#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "4\n1\n");
}

#[test]
fn classes_fields_and_methods() {
    let source = r#"
        class Point {
            init(x, y) {
                this.x = x;
                this.y = y;
            }
            sum() {
                return this.x + this.y;
            }
        }
        var p = Point(3, 4);
        print p.sum();
        p.x = 10;
        print p.sum();
        print p;
    "#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "7\n14\nPoint instance\n");
}

#[test]
fn single_inheritance_with_super_and_overriding() {
    let source = r#"
        class Shape {
            describe() {
                return "a shape";
            }
        }
        class Square < Shape {
            init(side) {
                this.side = side;
            }
            describe() {
                return "Square(" + super.describe();
            }
        }
        print Square(5).describe();
    "#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "Square(a shape\n");
}

#[test]
fn runtime_type_error_reports_and_resets_the_stack() {
    let (result, _) = run(r#"print "the answer is " + 42;"#);
    assert_eq!(result, InterpretResult::RuntimeError);

    // The same VM can keep going afterward — a failed statement doesn't
    // poison the session.
    let source = r#"print "the answer is " + "42";"#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "the answer is 42\n");
}

#[test]
fn undefined_global_is_a_runtime_error_not_a_panic() {
    let (result, _) = run("print doesNotExist;");
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn calling_a_non_callable_value_is_a_runtime_error() {
    let (result, _) = run("var x = 5; x();");
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn wrong_arity_is_a_runtime_error() {
    let source = r#"
        fun needsTwo(a, b) { return a + b; }
        needsTwo(1);
    "#;
    let (result, _) = run(source);
    assert_eq!(result, InterpretResult::RuntimeError);
}

#[test]
fn gc_native_reports_bytes_freed_and_never_collects_live_data() {
    let source = r#"
        var kept = "I must survive";
        fun churn() {
            var i = 0;
            while (i < 100) {
                fun inner() { return i; }
                i = i + 1;
            }
        }
        churn();
        gc();
        print kept;
    "#;
    let (result, out) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "I must survive\n");
}
