//! The selector-keyed dispatch table.

use crate::method::NativeMethod;
use object_model::Symbol;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Maps selectors to bound native methods.
///
/// Populated by the bootstrap loader; consulted by the send mechanism
/// before falling back to bytecode execution. Keyed on the symbol ordering
/// contract (interned symbols order lexicographically).
#[derive(Default)]
pub struct DispatchTable {
    entries: BTreeMap<Symbol, Rc<NativeMethod>>,
}

impl DispatchTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a method under its selector, replacing any previous binding.
    pub fn register(&mut self, method: NativeMethod) -> Rc<NativeMethod> {
        let method = Rc::new(method);
        self.entries
            .insert(method.selector().clone(), method.clone());
        method
    }

    /// Finds the binding for a selector.
    pub fn lookup(&self, selector: &Symbol) -> Option<Rc<NativeMethod>> {
        self.entries.get(selector).cloned()
    }

    /// Number of installed bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
