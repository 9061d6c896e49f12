use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A single scope in the runtime chain.
///
/// Scopes link to their parent through a shared `Rc`, so a closure keeps its
/// defining scope alive after the block that created it has exited, and a
/// mutation through one alias is visible through every other.  The chain is
/// acyclic; the globals scope is the unique root with no `enclosing`.
#[derive(Debug, Clone, Default)]
pub struct Environment<'s> {
    values: HashMap<&'s str, Value<'s>>,
    enclosing: Option<Rc<RefCell<Environment<'s>>>>,
}

impl<'s> Environment<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment<'s>>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Declare `name` in this scope, overwriting any previous binding.
    pub fn define(&mut self, name: &'s str, value: Value<'s>) {
        self.values.insert(name, value);
    }

    /// Walk this scope and its ancestors for `name`.
    pub fn get(&self, name: &str) -> Result<Value<'s>, String> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name)
        } else {
            Err(format!("Undefined variable '{}'.", name))
        }
    }

    /// Mutate the nearest scope that already defines `name`; never creates a
    /// new binding.
    pub fn assign(&mut self, name: &'s str, value: Value<'s>) -> Result<(), String> {
        if self.values.contains_key(name) {
            self.values.insert(name, value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value)
        } else {
            Err(format!("Undefined variable '{}'.", name))
        }
    }

    /// Read a binding exactly `distance` parent links up.  The resolver
    /// guarantees the binding exists there for a resolved program.
    pub fn get_at(this: &Rc<RefCell<Self>>, distance: usize, name: &str) -> Value<'s> {
        Self::ancestor(this, distance)
            .borrow()
            .values
            .get(name)
            .cloned()
            .expect("binding missing at resolved distance")
    }

    /// Write a binding exactly `distance` parent links up; same contract as
    /// [`Environment::get_at`].
    pub fn assign_at(this: &Rc<RefCell<Self>>, distance: usize, name: &'s str, value: Value<'s>) {
        Self::ancestor(this, distance)
            .borrow_mut()
            .values
            .insert(name, value);
    }

    /// Jump exactly `distance` parent links.
    fn ancestor(this: &Rc<RefCell<Self>>, distance: usize) -> Rc<RefCell<Self>> {
        let mut environment: Rc<RefCell<Self>> = Rc::clone(this);

        for _ in 0..distance {
            let enclosing = environment
                .borrow()
                .enclosing
                .clone()
                .expect("scope chain shorter than resolved distance");

            environment = enclosing;
        }

        environment
    }
}
