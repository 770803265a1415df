//! Interned symbols.
//!
//! Symbols are immutable byte strings owned by the (external) symbol table.
//! Equality and ordering both follow the bytes; interning makes equality
//! resolve by pointer in the common case and makes symbols usable as keys
//! in ordered maps such as the native dispatch table.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// An interned, immutable selector.
///
/// Cloning a `Symbol` is cheap (a reference-count bump). Equality is byte
/// content, with a pointer-identity fast path: symbols from one
/// [`SymbolTable`] share their interned entry, so the comparison is O(1) in
/// practice, and symbols from different tables still compare consistently
/// with the byte ordering.
#[derive(Clone)]
pub struct Symbol(Rc<[u8]>);

impl Symbol {
    /// Returns the symbol's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the symbol's text, replacing invalid UTF-8.
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        // Interned symbols share their entry, so the pointer check settles
        // almost every comparison without touching the bytes.
        Rc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_ref().cmp(other.0.as_ref())
    }
}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_ref().hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_text())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

/// The interning pool for symbols.
///
/// This is the consuming interface to the external symbol table
/// collaborator: it guarantees that equal byte sequences intern to the same
/// `Symbol`, so comparisons rarely have to look past the pointer.
#[derive(Default)]
pub struct SymbolTable {
    entries: BTreeMap<Box<[u8]>, Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `name`, returning the canonical symbol for it.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(existing) = self.entries.get(name.as_bytes()) {
            return existing.clone();
        }
        let symbol = Symbol(Rc::from(name.as_bytes()));
        self.entries
            .insert(name.as_bytes().into(), symbol.clone());
        symbol
    }

    /// Returns the number of interned symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no symbol has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
