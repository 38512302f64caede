use std::rc::Rc;

use crate::{
    errors,
    interpreter::{Arity, Namespace, Slot, Value},
    Loc, MinikError,
};

use super::{define_native, Package};

/// In-place operations on the shared box of a list.
pub struct ListPackage;

impl Package for ListPackage {
    fn name(&self) -> &str {
        "list"
    }

    fn install(&self, namespace: &Rc<Namespace>) {
        for name in ["size", "count"] {
            define_native(namespace, name, Arity::Exactly(1), move |_, args| {
                let len = with_list(&args[0], name, |items| items.len())?;
                Ok(Slot::new(Value::Number(len as f64)))
            });
        }

        define_native(namespace, "clear", Arity::Exactly(1), |_, args| {
            with_list(&args[0], "clear", |items| items.clear())?;
            Ok(Slot::nil())
        });

        for name in ["pop", "pop_back"] {
            define_native(namespace, name, Arity::Exactly(1), move |_, args| {
                with_list(&args[0], name, |items| items.pop())?;
                Ok(Slot::nil())
            });
        }

        for name in ["push", "push_back", "append"] {
            define_native(namespace, name, Arity::Exactly(2), move |_, args| {
                // A list pushed onto itself is stored as a snapshot.
                let item = if args[1].ptr_eq(&args[0]) { Slot::new(args[1].get()) } else { args[1].clone() };
                with_list(&args[0], name, |items| items.push(item))?;
                Ok(Slot::nil())
            });
        }

        define_native(namespace, "back", Arity::Exactly(1), |_, args| {
            let last = with_list(&args[0], "back", |items| items.last().cloned())?;
            Ok(last.unwrap_or_else(Slot::nil))
        });

        define_native(namespace, "front", Arity::Exactly(1), |_, args| {
            let first = with_list(&args[0], "front", |items| items.first().cloned())?;
            Ok(first.unwrap_or_else(Slot::nil))
        });

        define_native(namespace, "deep_copy", Arity::Exactly(1), |_, args| {
            let value = args[0].get();
            match value {
                Value::List(_) => Ok(Slot::new(deep_copy(&value))),
                _ => Ok(Slot::nil()),
            }
        });
    }
}

fn with_list<T>(arg: &Slot, function: &str, f: impl FnOnce(&mut Vec<Slot>) -> T) -> Result<T, MinikError> {
    match &mut *arg.borrow_mut() {
        Value::List(items) => Ok(f(items)),
        other => Err(errors::runtime(
            Loc::Native,
            format!("'{}' expects a list as its first argument, but got a {}.", function, other.type_name()),
            "Pass a list such as `[1, 2, 3]`.",
        )),
    }
}

fn deep_copy(value: &Value) -> Value {
    match value {
        Value::List(items) => Value::List(items.iter().map(|item| Slot::new(deep_copy(&item.borrow()))).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use crate::{imports::MemoryLoader, CaptureOutput, Interpreter};

    fn run(source: &str) -> String {
        let output = CaptureOutput::new();
        let mut interpreter = Interpreter::default().with_output(Box::new(output.clone()));
        let errs = crate::run(&mut interpreter, source, &mut MemoryLoader::new());
        assert!(errs.is_empty(), "unexpected errors: {:?}", errs);
        output.to_string()
    }

    #[test]
    fn push_pop_and_size() {
        let output = run(r#"
            import list;
            items := [];
            list.push(items, 1);
            list.push_back(items, 2);
            list.append(items, 3);
            print(list.size(items), items);
            list.pop(items);
            print(list.count(items), list.front(items), list.back(items));
            list.clear(items);
            print(list.size(items), list.back(items));
        "#);
        assert_eq!(output, "3 <list>1, 2, 3</list size=3>\n2 1 2\n0 nil\n");
    }

    #[test]
    fn back_is_the_element_box() {
        let output = run(r#"
            import list as l;
            items := [1, 2];
            ++l.back(items);
            print(items);
        "#);
        assert_eq!(output, "<list>1, 3</list size=2>\n");
    }

    #[test]
    fn deep_copy_detaches_nested_lists() {
        let output = run(r#"
            import list;
            inner := [1];
            outer := [inner, 2];
            copy := list.deep_copy(outer);
            copy[0][0] = 9;
            copy[1] = 8;
            print(outer, copy);
        "#);
        assert_eq!(output, "<list><list>1</list size=1>, 2</list size=2> <list><list>9</list size=1>, 8</list size=2>\n");
    }

    #[test]
    fn rejects_non_lists() {
        let mut interpreter = Interpreter::default();
        let errs = crate::run(&mut interpreter, "import list; list.size(3);", &mut MemoryLoader::new());
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].description(), "'size' expects a list as its first argument, but got a number.");
    }
}
