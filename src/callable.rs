//! Runtime callables: user functions, classes, and class instances.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::interpreter::{Interpreter, Unwind};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A closure: the declaration plus the environment captured at the point the
/// function was declared.
#[derive(Debug)]
pub struct LoxFunction {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
    pub is_initializer: bool,
}

impl LoxFunction {
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this function whose closure chain starts with a
    /// fresh environment binding `this` to the receiving instance. Binding
    /// never mutates the original closure, so method lookup stays pure.
    pub fn bind(&self, instance: &Rc<RefCell<LoxInstance>>) -> LoxFunction {
        let wrapper = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &self.closure,
        ))));
        wrapper
            .borrow_mut()
            .define("this", Value::Instance(Rc::clone(instance)));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: wrapper,
            is_initializer: self.is_initializer,
        }
    }

    /// Execute the body in a fresh frame parented on the stored closure,
    /// catching a `Return` unwind at this boundary. Initializers always
    /// yield the bound `this`, whatever the body did.
    pub fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Value>) -> Result<Value, Unwind> {
        debug!("Calling <fn {}>", self.declaration.name.lexeme);

        let frame = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
            &self.closure,
        ))));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            frame.borrow_mut().define(&param.lexeme, argument);
        }

        let returned = match interpreter.execute_in_env(frame, &self.declaration.body) {
            Ok(()) => Value::Nil,
            Err(Unwind::Return(value)) => value,
            Err(other) => return Err(other),
        };

        if self.is_initializer {
            return Environment::get_at(&self.closure, 0, "this").ok_or_else(|| {
                Unwind::from(RuntimeError::UndefinedVariable {
                    name: "this".to_string(),
                    line: self.declaration.name.line,
                })
            });
        }

        Ok(returned)
    }
}

/// A class: its methods by name plus an optional superclass.
#[derive(Debug)]
pub struct LoxClass {
    pub name: String,
    pub superclass: Option<Rc<LoxClass>>,
    pub methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
    /// Method lookup walks the whole superclass chain, nearest class first.
    pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Calling a class takes as many arguments as its initializer does.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }

    /// Constructor call: allocate the instance, then run `init` (if any)
    /// bound to it.
    pub fn call(
        class: &Rc<LoxClass>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, Unwind> {
        debug!("Instantiating class {}", class.name);

        let instance = Rc::new(RefCell::new(LoxInstance::new(Rc::clone(class))));

        if let Some(initializer) = class.find_method("init") {
            initializer.bind(&instance).call(interpreter, arguments)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// An instance: its class plus a mutable bag of fields.
#[derive(Debug)]
pub struct LoxInstance {
    pub class: Rc<LoxClass>,
    fields: HashMap<String, Value>,
}

impl LoxInstance {
    pub fn new(class: Rc<LoxClass>) -> Self {
        LoxInstance {
            class,
            fields: HashMap::new(),
        }
    }

    /// Property lookup order: own fields, then methods up the class chain.
    /// A method comes back bound to the receiving instance.
    pub fn get(instance: &Rc<RefCell<LoxInstance>>, name: &str) -> Option<Value> {
        if let Some(value) = instance.borrow().fields.get(name) {
            return Some(value.clone());
        }

        let method = instance.borrow().class.find_method(name)?;
        Some(Value::Function(Rc::new(method.bind(instance))))
    }

    /// Setting always creates or overwrites the instance's own field.
    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}
