use std::io::Write;

use crate::{errors, Loc, MinikError};

use super::{env::Environment, Arity, Callable, Interpreter, Slot, Value};

pub(super) fn install(globals: &Environment) {
    define(globals, "clock", Arity::Exactly(0), |_, _| {
        let offset = std::time::SystemTime::now().duration_since(std::time::SystemTime::UNIX_EPOCH)
            .map_err(|_| errors::runtime(
                Loc::Native,
                "Failed to get current system time because the system time is currently set to a time earlier than 1970-01-01T00:00:00Z.",
                "Make sure that you have set your system clock correctly."))?;

        Ok(Slot::new(Value::Number(offset.as_secs_f64())))
    });

    define(globals, "assert", Arity::Any, assert);

    define(globals, "to_str", Arity::Exactly(1), |_, args| {
        Ok(Slot::new(Value::String(args[0].to_string())))
    });

    define(globals, "print", Arity::Any, |interpreter, args| {
        let line = args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>().join(" ");
        writeln!(interpreter.output, "{}", line)?;
        Ok(Slot::new(Value::String(line)))
    });
}

fn define<T: Fn(&mut Interpreter, Vec<Slot>) -> Result<Slot, MinikError> + 'static>(globals: &Environment, name: &str, arity: Arity, fun: T) {
    globals.insert(name, Slot::new(Value::Callable(Callable::native(name, arity, fun))));
}

fn assert(_: &mut Interpreter, args: Vec<Slot>) -> Result<Slot, MinikError> {
    let condition = match args.first().map(|arg| arg.get()) {
        Some(Value::Bool(condition)) => condition,
        Some(_) => return Err(errors::runtime(
            Loc::Native,
            "assert expects bool as first argument.",
            "Pass a comparison such as `assert(x == 1)`.",
        )),
        None => return Err(errors::runtime(
            Loc::Native,
            "assert expects at least one argument.",
            "Call it as `assert(condition)` or `assert(condition, message)`.",
        )),
    };

    let message = match args.get(1).map(|arg| arg.get()) {
        Some(Value::String(message)) => Some(message),
        Some(_) => return Err(errors::runtime(
            Loc::Native,
            "assert expects string as second argument.",
            "Describe the failed condition with a string literal.",
        )),
        None => None,
    };

    if args.len() > 2 {
        return Err(errors::runtime(
            Loc::Native,
            format!("assert expects at most two arguments but got {}.", args.len()),
            "Call it as `assert(condition)` or `assert(condition, message)`.",
        ));
    }

    if !condition {
        return Err(errors::assertion(message));
    }

    Ok(Slot::new(Value::Bool(true)))
}

#[cfg(test)]
mod tests {
    use crate::{lexer::Token, CaptureOutput};

    use super::*;

    fn call(interpreter: &mut Interpreter, name: &str, args: Vec<Value>) -> Result<Value, MinikError> {
        let Value::Callable(fun) = interpreter.globals.get(&Token::identifier(name))?.get() else {
            panic!("{} should be a callable", name)
        };

        fun.call(interpreter, args.into_iter().map(Slot::new).collect()).map(|slot| slot.get())
    }

    #[test]
    fn print_joins_with_spaces() {
        let output = CaptureOutput::new();
        let mut interpreter = Interpreter::default().with_output(Box::new(output.clone()));

        let result = call(&mut interpreter, "print", vec![Value::from("a"), Value::from(1.0), Value::Nil]).unwrap();
        assert_eq!(result.to_string(), "a 1 nil");
        assert_eq!(output.to_string(), "a 1 nil\n");
    }

    #[test]
    fn to_str_uses_display() {
        let mut interpreter = Interpreter::default();
        let result = call(&mut interpreter, "to_str", vec![Value::from(2.5)]).unwrap();
        assert!(matches!(result, Value::String(s) if s == "2.5"));
    }

    #[test]
    fn clock_is_positive() {
        let mut interpreter = Interpreter::default();
        let result = call(&mut interpreter, "clock", vec![]).unwrap();
        assert!(result.as_number().unwrap() > 0.0);
    }

    #[test]
    fn assert_checks_its_arguments() {
        let mut interpreter = Interpreter::default();
        assert!(call(&mut interpreter, "assert", vec![Value::from(true)]).is_ok());

        let err = call(&mut interpreter, "assert", vec![Value::from(false), Value::from("boom")]).unwrap_err();
        assert_eq!(err, errors::assertion(Some("boom".to_string())));

        let err = call(&mut interpreter, "assert", vec![Value::from(1.0)]).unwrap_err();
        assert_eq!(err.description(), "assert expects bool as first argument.");

        let err = call(&mut interpreter, "assert", vec![Value::from(true), Value::from(1.0)]).unwrap_err();
        assert_eq!(err.description(), "assert expects string as second argument.");

        let err = call(&mut interpreter, "assert", vec![]).unwrap_err();
        assert_eq!(err.description(), "assert expects at least one argument.");
    }
}
