//! Scoped variable environment for the blk evaluator.
//!
//! Scopes form a parent-linked chain. Each [`Environment`] is a cheap handle
//! to one scope; cloning it aliases the same storage, so a closure holding a
//! handle observes later definitions in its defining scope.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::builtins;
use crate::error::{EvalError, EvalResult};
use crate::value::Binding;

/// One scope level.
struct Scope {
    store: RefCell<HashMap<String, Binding>>,
    parent: Option<Environment>,
}

/// Outcome of [`Environment::define`].
#[derive(Debug, Clone)]
pub enum Defined {
    /// The binding was stored.
    Fresh(Binding),
    /// The name was already bound in this scope; nothing changed.
    AlreadyDefined(Binding),
}

impl Defined {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Defined::Fresh(_))
    }

    pub fn binding(&self) -> &Binding {
        match self {
            Defined::Fresh(b) | Defined::AlreadyDefined(b) => b,
        }
    }
}

#[derive(Clone)]
pub struct Environment(Rc<Scope>);

impl Environment {
    /// A root scope with no bindings.
    pub fn new() -> Self {
        Self(Rc::new(Scope {
            store: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    /// A child scope of `parent`.
    pub fn enclosed(parent: &Environment) -> Self {
        Self(Rc::new(Scope {
            store: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        }))
    }

    /// A root scope holding the builtin functions and modules.
    pub fn with_builtins() -> Self {
        let env = Self::new();
        for (name, value) in builtins::table() {
            env.override_define(name, Binding::builtin(value));
        }
        env
    }

    /// Look `name` up from this scope outward.
    pub fn resolve(&self, name: &str) -> Option<Binding> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(binding) = env.0.store.borrow().get(name) {
                return Some(binding.clone());
            }
            scope = env.parent();
        }
        None
    }

    /// Bind `name` in this scope unless it is already bound here.
    ///
    /// Shadowing a name from an enclosing scope is allowed.
    pub fn define(&self, name: &str, binding: Binding) -> Defined {
        let mut store = self.0.store.borrow_mut();
        if let Some(existing) = store.get(name) {
            debug!(ident = name, "redeclaration ignored");
            return Defined::AlreadyDefined(existing.clone());
        }
        trace!(ident = name, kind = %binding.value.kind(), "define");
        store.insert(name.to_string(), binding.clone());
        Defined::Fresh(binding)
    }

    /// Bind `name` in this scope, replacing any existing binding.
    pub fn override_define(&self, name: &str, binding: Binding) {
        trace!(ident = name, kind = %binding.value.kind(), "override");
        self.0.store.borrow_mut().insert(name.to_string(), binding);
    }

    pub fn parent(&self) -> Option<&Environment> {
        self.0.parent.as_ref()
    }

    /// [`resolve`](Self::resolve), with a miss as an error.
    pub fn lookup(&self, name: &str) -> EvalResult<Binding> {
        self.resolve(name).ok_or_else(|| EvalError::UnresolvedName {
            name: name.to_string(),
        })
    }

    /// [`define`](Self::define), with a redeclaration as an error.
    pub fn declare(&self, name: &str, binding: Binding) -> EvalResult<Binding> {
        match self.define(name, binding) {
            Defined::Fresh(binding) => Ok(binding),
            Defined::AlreadyDefined(_) => Err(EvalError::Redeclaration {
                name: name.to_string(),
            }),
        }
    }

    /// Whether both handles refer to the same scope.
    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of bindings in this scope alone.
    pub fn len(&self) -> usize {
        self.0.store.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.store.borrow().is_empty()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bindings may hold closures over this scope; list names only.
        let store = self.0.store.borrow();
        let mut names: Vec<&str> = store.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}
