//! Class registry and the strict cast compatibility check.
//!
//! Classes are registered once at bootstrap and are immutable afterwards.
//! Objects carry a [`ClassId`] in their header; the table answers the
//! subclass question behind the strict cast of the object model contract.

use crate::error::CastError;
use crate::symbol::Symbol;

/// Identifier of a registered class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(u32);

impl ClassId {
    /// Returns the raw identifier, for storage in an object header.
    pub fn to_raw(self) -> u32 {
        self.0
    }

    /// Rebuilds an identifier from a raw header word.
    pub fn from_raw(raw: u32) -> Self {
        ClassId(raw)
    }
}

struct ClassEntry {
    name: Symbol,
    superclass: Option<ClassId>,
}

/// The registry of classes known to the VM.
#[derive(Default)]
pub struct ClassTable {
    classes: Vec<ClassEntry>,
}

impl ClassTable {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class under `name` with an optional superclass.
    pub fn register(&mut self, name: Symbol, superclass: Option<ClassId>) -> ClassId {
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassEntry { name, superclass });
        id
    }

    /// Returns the name of a class, or `None` for an unregistered id.
    ///
    /// A forged [`ClassId`] can reach the table through an object header,
    /// so lookups stay total rather than indexing.
    pub fn name(&self, class: ClassId) -> Option<&Symbol> {
        self.classes.get(class.0 as usize).map(|entry| &entry.name)
    }

    /// Returns the direct superclass; `None` for a root class or an
    /// unregistered id.
    pub fn superclass(&self, class: ClassId) -> Option<ClassId> {
        self.classes
            .get(class.0 as usize)
            .and_then(|entry| entry.superclass)
    }

    /// Renders a class id for diagnostics, naming unregistered ids instead
    /// of failing on them.
    pub fn describe(&self, class: ClassId) -> String {
        match self.name(class) {
            Some(name) => name.to_string(),
            None => format!("<unregistered class {}>", class.0),
        }
    }

    /// Returns true if `actual` is `expected` or one of its subclasses.
    pub fn is_compatible(&self, actual: ClassId, expected: ClassId) -> bool {
        let mut current = Some(actual);
        while let Some(class) = current {
            if class == expected {
                return true;
            }
            current = self.superclass(class);
        }
        false
    }

    /// The strict cast check: verifies that an object of class `actual` may
    /// be treated as an instance of `expected`.
    ///
    /// This is the single channel through which dynamic/static type
    /// mismatches surface to callers.
    pub fn check_cast(&self, actual: ClassId, expected: ClassId) -> Result<(), CastError> {
        if self.is_compatible(actual, expected) {
            Ok(())
        } else {
            Err(CastError::TypeMismatch {
                expected: self.describe(expected),
                found: self.describe(actual),
            })
        }
    }

    /// Returns the number of registered classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Returns true if no class has been registered.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
