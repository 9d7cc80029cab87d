use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::function::KloxFunction;
use crate::value::Value;

#[derive(Debug)]
pub struct KloxClass {
    name: String,
    superclass: Option<Rc<KloxClass>>,
    methods: HashMap<String, Rc<KloxFunction>>,
}

impl KloxClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<KloxClass>>,
        methods: HashMap<String, Rc<KloxFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Method lookup walks the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<KloxFunction>> {
        if let Some(method) = self.methods.get(name) {
            Some(Rc::clone(method))
        } else if let Some(superclass) = &self.superclass {
            superclass.find_method(name)
        } else {
            None
        }
    }

    /// Calling a class takes as many arguments as its `init` declares.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

impl Display for KloxClass {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug)]
pub struct KloxInstance {
    class: Rc<KloxClass>,
    fields: HashMap<String, Value>,
}

impl KloxInstance {
    pub fn new(class: Rc<KloxClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class(&self) -> &Rc<KloxClass> {
        &self.class
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    /// Fields spring into existence on first assignment.
    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}

impl Display for KloxInstance {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} instance", self.class.name)
    }
}
