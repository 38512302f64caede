//! Native packages which programs bring in with `import name;` or `import name as alias;`.

use std::rc::Rc;

use fnv::FnvHashMap;

use crate::{
    errors,
    interpreter::{Arity, Callable, Function, Interpreter, Namespace, NativeFunction, Slot, Value},
    Loc, MinikError,
};

mod list;
mod math;

pub use list::ListPackage;
pub use math::MathPackage;

pub trait Package {
    fn name(&self) -> &str;

    /// Defines the package's functions, classes and constants in a freshly created namespace.
    fn install(&self, namespace: &Rc<Namespace>);
}

#[derive(Default)]
pub struct PackageRegistry {
    packages: FnvHashMap<String, Rc<dyn Package>>,
}

impl PackageRegistry {
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register(Box::new(MathPackage));
        registry.register(Box::new(ListPackage));
        registry
    }

    pub fn register(&mut self, package: Box<dyn Package>) {
        self.packages.insert(package.name().to_string(), Rc::from(package));
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn Package>> {
        self.packages.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.packages.keys().map(|name| name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Installs a native function which carries `namespace` as its namespace marker.
pub fn define_native<T>(namespace: &Rc<Namespace>, name: &str, arity: Arity, fun: T)
where
    T: Fn(&mut Interpreter, Vec<Slot>) -> Result<Slot, MinikError> + 'static,
{
    let fun = Function::delegate(NativeFunction::new(name, arity, fun), Some(namespace.clone()));
    namespace.define(name, Slot::new(Value::Callable(Callable::Function(Rc::new(fun)))));
}

pub(crate) fn number(arg: &Slot, function: &str) -> Result<f64, MinikError> {
    match *arg.borrow() {
        Value::Number(n) => Ok(n),
        ref other => Err(errors::runtime(
            Loc::Native,
            format!("'{}' expects number arguments, but got a {}.", function, other.type_name()),
            "Convert the argument to a number first.",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeting;

    impl Package for Greeting {
        fn name(&self) -> &str {
            "greeting"
        }

        fn install(&self, namespace: &Rc<Namespace>) {
            namespace.define("text", Slot::new(Value::from("hello")));
        }
    }

    #[test]
    fn registry_lists_builtin_packages() {
        let registry = PackageRegistry::builtin();
        assert_eq!(registry.names(), vec!["list", "math"]);
        assert!(registry.get("math").is_some());
        assert!(registry.get("raylib").is_none());
    }

    #[test]
    fn registered_packages_install_into_a_namespace() {
        let mut registry = PackageRegistry::default();
        registry.register(Box::new(Greeting));

        let namespace = Rc::new(Namespace::new("g", None));
        registry.get("greeting").unwrap().install(&namespace);
        assert_eq!(namespace.get("text").unwrap().to_string(), "hello");
    }

    #[test]
    fn natives_carry_their_namespace() {
        let namespace = Rc::new(Namespace::new("tools", None));
        define_native(&namespace, "answer", Arity::Exactly(0), |_, _| Ok(Slot::new(Value::Number(42.0))));

        let Value::Callable(Callable::Function(fun)) = namespace.get("answer").unwrap().get() else {
            panic!("expected a function")
        };
        assert_eq!(fun.to_string(), "<native fn answer>");
        assert_eq!(fun.arity(), Arity::Exactly(0));
        assert_eq!(fun.namespace().map(|ns| ns.name().to_string()), Some("tools".to_string()));

        let mut interpreter = Interpreter::default();
        assert_eq!(fun.call(&mut interpreter, vec![]).unwrap().get().as_number(), Some(42.0));
    }
}
