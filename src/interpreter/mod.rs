mod class;
mod env;
mod fun;
mod inter;
mod namespace;
mod natives;
mod value;
mod visitor;

pub use class::{Class, Instance, InstanceOf, NativeClass};
pub use env::Environment;
pub use fun::{Arity, Callable, Function, NativeFunction};
pub use inter::{Flow, Interpreter};
pub use namespace::{Namespace, GLOBAL};
pub use value::{Slot, Value};

#[cfg(test)]
mod tests {
    use crate::{imports::MemoryLoader, CaptureOutput, MinikError};

    use super::*;

    fn run(source: &str) -> (String, Vec<MinikError>) {
        let output = CaptureOutput::new();
        let mut interpreter = Interpreter::default().with_output(Box::new(output.clone()));
        let errs = crate::run(&mut interpreter, source, &mut MemoryLoader::new());
        (output.to_string(), errs)
    }

    fn run_ok(source: &str) -> String {
        let (output, errs) = run(source);
        assert!(errs.is_empty(), "unexpected errors: {:?}", errs);
        output
    }

    fn run_err(source: &str) -> MinikError {
        let (_, mut errs) = run(source);
        assert_eq!(errs.len(), 1, "expected exactly one error, got {:?}", errs);
        errs.remove(0)
    }

    #[test]
    fn shadowing() {
        run_ok("x := 1; { x := 2; assert(x == 2); } assert(x == 1);");
    }

    #[test]
    fn forward_reference_inside_a_block() {
        let output = run_ok("{ a:() { return b(); } b:() { return 42; } print(a()); }");
        assert_eq!(output, "42\n");
    }

    #[test]
    fn lists_alias_and_numbers_copy() {
        let output = run_ok(r#"
            change:(list, n) { list[0] = 10; n = 20; }
            items := [1, 2];
            n := 1;
            change(items, n);
            print(items[0], n);
        "#);
        assert_eq!(output, "10 1\n");
    }

    #[test]
    fn defers_run_in_reverse_on_return() {
        let output = run_ok(r#"
            f:() {
                defer print("first");
                defer print("second");
                return "done";
            }
            print(f());
        "#);
        assert_eq!(output, "second\nfirst\ndone\n");
    }

    #[test]
    fn defers_run_when_a_failure_propagates() {
        let (output, errs) = run(r#"
            f:() {
                defer print("cleanup");
                missing();
            }
            f();
        "#);
        assert_eq!(output, "cleanup\n");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].description(), "Undefined variable 'missing'.");
    }

    #[test]
    fn labeled_break_leaves_the_outer_loop() {
        let output = run_ok(r#"
            label outer for (i := 0; i < 3; ++i) {
                for (j := 0; j < 3; ++j) {
                    if (j == 1) { continue outer; }
                    if (i == 2) { break outer; }
                    print(i, j);
                }
            }
        "#);
        assert_eq!(output, "0 0\n1 0\n");
    }

    #[test]
    fn goto_skips_forward() {
        let output = run_ok(r#"
            print("a");
            goto skip;
            print("b");
            label skip;
            print("c");
        "#);
        assert_eq!(output, "a\nc\n");
    }

    #[test]
    fn goto_to_a_missing_label_fails() {
        let err = run_err("f:() { goto nowhere; } f();");
        assert_eq!(err.description(), "Couldn't find label 'nowhere'.");
        assert!(err.is_runtime());
    }

    #[test]
    fn class_members_exist_before_methods_run() {
        run_ok(r#"
            class Counter {
                Counter:() {}
                count := 0;
                inc:() { count = count + 1; }
            }
            c := Counter();
            assert(c.count == 0);
            c.inc();
            c.inc();
            assert(c.count == 2);
        "#);
    }

    #[test]
    fn instances_do_not_share_fields() {
        let output = run_ok(r#"
            class Box { value := 0; put:(v) { value = v; } }
            a := Box();
            b := Box();
            a.put(1);
            b.put(2);
            print(a.value, b.value);
        "#);
        assert_eq!(output, "1 2\n");
    }

    #[test]
    fn initializer_receives_arguments_and_returns_the_instance() {
        let output = run_ok(r#"
            class Point {
                x:; y:;
                Point:(x0, y0) { x = x0; this.y = y0; return 5; }
            }
            p := Point(3, 4);
            print(p, p.x, p.y);
        "#);
        assert_eq!(output, "<instance of Point> 3 4\n");
    }

    #[test]
    fn out_of_bounds_indexing_fails() {
        let err = run_err("items := [1, 2]; print(items[2]);");
        assert_eq!(err.description(), "List index out of bounds. The index 2 is outside the valid range of 0 to 1.");
        assert_eq!(err.line(), 1);

        let err = run_err("s := \"ab\"; s[5] = \"c\";");
        assert!(err.description().starts_with("String index out of bounds."));
    }

    #[test]
    fn resolve_errors_prevent_execution() {
        let (output, errs) = run("print(1); return 2; break;");
        assert_eq!(output, "");
        assert_eq!(errs.len(), 2);
        assert!(errs.iter().all(|err| err.is_resolve()));
    }

    #[test]
    fn globals_persist_between_runs() {
        let output = CaptureOutput::new();
        let mut interpreter = Interpreter::default().with_output(Box::new(output.clone()));
        assert!(crate::run(&mut interpreter, "count := 1;", &mut MemoryLoader::new()).is_empty());
        assert!(crate::run(&mut interpreter, "count = count + 1; print(count);", &mut MemoryLoader::new()).is_empty());
        assert_eq!(output.to_string(), "2\n");
        assert_eq!(interpreter.global("count").and_then(|value| value.as_number()), Some(2.0));
    }

    #[test]
    fn namespaces_resolve_their_own_members_first() {
        let output = run_ok(r#"
            scale := 100;
            namespace geometry {
                scale := 2;
                double:(n) { return n * scale; }
            }
            print(geometry.double(4), scale);
        "#);
        assert_eq!(output, "8 100\n");
    }

    #[test]
    fn reopened_namespaces_merge() {
        let output = run_ok(r#"
            namespace config { a := 1; }
            namespace config { b := 2; }
            print(config.a, config.b);
        "#);
        assert_eq!(output, "1 2\n");
    }

    #[test]
    fn stack_overflow_is_reported() {
        let err = run_err("f:() { return f(); } f();");
        assert_eq!(err.description(), "Stack overflow.");
    }

    #[test]
    fn deep_recursion_below_the_limit() {
        let output = run_ok(r#"
            count:(n) {
                if (n == 0) { return 0; }
                return 1 + count(n - 1);
            }
            print(count(250));
        "#);
        assert_eq!(output, "250\n");
    }

    #[test]
    fn repeated_runs_keep_only_body_bindings() {
        let output = CaptureOutput::new();
        let mut interpreter = Interpreter::default().with_output(Box::new(output.clone()));
        let mut loader = MemoryLoader::new();

        assert!(crate::run(&mut interpreter, "{ x := 1; print(x); }", &mut loader).is_empty());
        assert!(interpreter.locals.is_empty());

        assert!(crate::run(&mut interpreter, "f:() { y := 2; return y; }", &mut loader).is_empty());
        assert_eq!(interpreter.locals.len(), 1);

        assert!(crate::run(&mut interpreter, "for (i := 0; i < 3; i = i + 1) { print(f()); }", &mut loader).is_empty());
        assert_eq!(interpreter.locals.len(), 1);
        assert_eq!(output.to_string(), "1\n2\n2\n2\n");
    }

    #[test]
    fn deep_recursion_on_a_small_thread() {
        let output = std::thread::Builder::new()
            .stack_size(512 * 1024)
            .spawn(|| run_ok("count:(n) { if (n == 0) { return 0; } return 1 + count(n - 1); } print(count(200));"))
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(output, "200\n");
    }
}
