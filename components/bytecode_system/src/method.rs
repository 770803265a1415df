//! Method records and the lookup registry.

use memory_manager::RootIndex;
use object_model::{ClassId, ClassTable, Symbol};
use std::collections::{BTreeMap, HashMap};

/// Identifier of a registered method.
///
/// Small enough to be carried through the object world as a tagged small
/// integer (a context's method field holds one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(u32);

impl MethodId {
    /// Returns the raw identifier.
    pub fn to_raw(self) -> u32 {
        self.0
    }

    /// Rebuilds an identifier from its raw form.
    pub fn from_raw(raw: u32) -> Self {
        MethodId(raw)
    }
}

/// An immutable compiled-from-source method record.
///
/// Created once by the external compiler/loader, never mutated afterwards.
/// The literal array lives on the heap and is pinned through the root table,
/// so the record stays valid across collection cycles.
pub struct Method {
    /// The class the method is installed on.
    pub class: ClassId,
    /// The method's selector.
    pub selector: Symbol,
    /// The stack-machine instruction stream.
    pub bytecode: Box<[u8]>,
    /// Root-table handle of the heap literal array.
    pub literals: RootIndex,
    /// Selectors referenced by send instructions, indexed by operand.
    pub selectors: Box<[Symbol]>,
    /// Number of temporary slots the method's context needs.
    pub temporary_count: usize,
    /// Number of arguments, the receiver included.
    pub argument_count: usize,
}

/// Registry of all loaded methods, with per-class selector tables.
#[derive(Default)]
pub struct MethodRegistry {
    methods: Vec<Method>,
    by_class: HashMap<ClassId, BTreeMap<Symbol, MethodId>>,
}

impl MethodRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a method and installs it in its class's selector table.
    pub fn register(&mut self, method: Method) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.by_class
            .entry(method.class)
            .or_default()
            .insert(method.selector.clone(), id);
        self.methods.push(method);
        id
    }

    /// Returns a registered method, or `None` for an unknown id.
    ///
    /// Ids travel through the object world as tagged integers, so a forged
    /// context can present any value here; lookups stay total.
    pub fn get(&self, id: MethodId) -> Option<&Method> {
        self.methods.get(id.0 as usize)
    }

    /// Looks up `selector` starting at `class` and walking the superclass
    /// chain, the message-send resolution order.
    pub fn lookup(
        &self,
        classes: &ClassTable,
        class: ClassId,
        selector: &Symbol,
    ) -> Option<MethodId> {
        let mut current = Some(class);
        while let Some(class) = current {
            if let Some(id) = self.by_class.get(&class).and_then(|t| t.get(selector)) {
                return Some(*id);
            }
            current = classes.superclass(class);
        }
        None
    }

    /// Number of registered methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Returns true if no method has been registered.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
