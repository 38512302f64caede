use std::rc::Rc;

use crate::interpreter::{Arity, Callable, Namespace, NativeClass, Slot, Value};

use super::{define_native, number, Package};

const UNARY: [(&str, fn(f64) -> f64); 16] = [
    ("sin", f64::sin),
    ("cos", f64::cos),
    ("tan", f64::tan),
    ("asin", f64::asin),
    ("acos", f64::acos),
    ("atan", f64::atan),
    ("sinh", f64::sinh),
    ("cosh", f64::cosh),
    ("tanh", f64::tanh),
    ("sqrt", f64::sqrt),
    ("exp", f64::exp),
    ("log", f64::ln),
    ("log10", f64::log10),
    ("ceil", f64::ceil),
    ("floor", f64::floor),
    ("fabs", f64::abs),
];

const BINARY: [(&str, fn(f64, f64) -> f64); 4] = [
    ("min", f64::min),
    ("max", f64::max),
    ("pow", f64::powf),
    ("atan2", f64::atan2),
];

/// Floating point functions, `PI` and the `Vector2` class.
pub struct MathPackage;

impl Package for MathPackage {
    fn name(&self) -> &str {
        "math"
    }

    fn install(&self, namespace: &Rc<Namespace>) {
        for (name, op) in UNARY {
            define_native(namespace, name, Arity::Exactly(1), move |_, args| {
                Ok(Slot::new(Value::Number(op(number(&args[0], name)?))))
            });
        }

        for (name, op) in BINARY {
            define_native(namespace, name, Arity::Exactly(2), move |_, args| {
                Ok(Slot::new(Value::Number(op(number(&args[0], name)?, number(&args[1], name)?))))
            });
        }

        namespace.define("PI", Slot::new(Value::Number(std::f64::consts::PI)));

        let vector = NativeClass::new("Vector2", &["x", "y"]);
        namespace.define("Vector2", Slot::new(Value::Callable(Callable::NativeClass(Rc::new(vector)))));
    }
}
