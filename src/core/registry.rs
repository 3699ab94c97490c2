//! # Module registry - initialized children of a slot, by type.
//!
//! The registry records every child module whose `init` succeeded:
//! - First instance of a type → [`RegistryEntry::Single`]
//! - Second instance of the same type → promoted to [`RegistryEntry::Many`]
//! - Further instances → appended to the sequence
//!
//! ## Architecture
//! ```text
//! init completion (Ok) ──► ModuleRegistry::insert(kind, module)
//!                              ├─► vacant        → Single(module)
//!                              ├─► Single(a)     → Many([a, module])   (promotion)
//!                              └─► Many([..])    → Many([.., module])
//! ```
//!
//! ## Rules
//! - Registry holds references only; it never initializes or disposes modules
//! - Promotion is irreversible for a key
//! - Order inside `Many` is completion order, not call order
//! - Failed modules are never inserted

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::host::ModuleRef;

use super::lock;

/// Registered instances of one module type.
#[derive(Clone, Debug)]
pub enum RegistryEntry {
    /// Exactly one instance was registered.
    Single(ModuleRef),
    /// Two or more instances, in completion order.
    Many(Vec<ModuleRef>),
}

impl RegistryEntry {
    /// Number of instances in this entry.
    pub fn len(&self) -> usize {
        match self {
            RegistryEntry::Single(_) => 1,
            RegistryEntry::Many(all) => all.len(),
        }
    }

    /// Companion of [`len`](Self::len); an entry holds at least one instance.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the entry was promoted to a sequence.
    pub fn is_many(&self) -> bool {
        matches!(self, RegistryEntry::Many(_))
    }

    /// First registered instance.
    pub fn first(&self) -> Option<&ModuleRef> {
        match self {
            RegistryEntry::Single(one) => Some(one),
            RegistryEntry::Many(all) => all.first(),
        }
    }

    /// Instances in registration order.
    pub fn to_vec(&self) -> Vec<ModuleRef> {
        match self {
            RegistryEntry::Single(one) => vec![one.clone()],
            RegistryEntry::Many(all) => all.clone(),
        }
    }
}

/// Result of [`ModuleRegistry::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Insertion {
    /// First instance of its type.
    Single,
    /// Second instance; the entry was promoted to a sequence.
    Promoted,
    /// Appended to an existing sequence of the given length.
    Appended(usize),
}

impl Insertion {
    /// Number of instances of the type after the insertion.
    pub(crate) fn count(self) -> usize {
        match self {
            Insertion::Single => 1,
            Insertion::Promoted => 2,
            Insertion::Appended(n) => n,
        }
    }
}

/// Registry of initialized child modules keyed by type name.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Mutex<HashMap<String, RegistryEntry>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successfully initialized module, promoting on the second instance.
    pub(crate) fn insert(&self, kind: &str, module: ModuleRef) -> Insertion {
        let mut modules = lock(&self.modules);
        match modules.entry(kind.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(RegistryEntry::Single(module));
                Insertion::Single
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                match entry {
                    RegistryEntry::Single(first) => {
                        *entry = RegistryEntry::Many(vec![first.clone(), module]);
                        Insertion::Promoted
                    }
                    RegistryEntry::Many(all) => {
                        all.push(module);
                        Insertion::Appended(all.len())
                    }
                }
            }
        }
    }

    /// Returns the entry registered for `kind`.
    pub fn get(&self, kind: &str) -> Option<RegistryEntry> {
        lock(&self.modules).get(kind).cloned()
    }

    /// Returns the instances registered for `kind` (empty if none).
    pub fn instances(&self, kind: &str) -> Vec<ModuleRef> {
        self.get(kind).map(|e| e.to_vec()).unwrap_or_default()
    }

    /// Number of instances registered for `kind`.
    pub fn count(&self, kind: &str) -> usize {
        lock(&self.modules).get(kind).map_or(0, RegistryEntry::len)
    }

    /// Returns sorted list of registered type names.
    pub fn list(&self) -> Vec<String> {
        let modules = lock(&self.modules);
        let mut names: Vec<String> = modules.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns every registered instance, grouped by sorted type name.
    pub fn all(&self) -> Vec<ModuleRef> {
        let modules = lock(&self.modules);
        let mut kinds: Vec<&String> = modules.keys().collect();
        kinds.sort_unstable();
        kinds
            .into_iter()
            .filter_map(|k| modules.get(k))
            .flat_map(RegistryEntry::to_vec)
            .collect()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        lock(&self.modules).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestModule;
    use std::sync::Arc;

    #[test]
    fn test_distinct_kinds_stay_single() {
        let reg = ModuleRegistry::new();
        assert!(reg.is_empty());
        assert_eq!(reg.insert("header", TestModule::ok("h1")), Insertion::Single);
        assert_eq!(reg.insert("footer", TestModule::ok("f1")), Insertion::Single);

        assert_eq!(reg.list(), vec!["footer".to_string(), "header".to_string()]);
        assert!(!reg.get("header").unwrap().is_many());
        assert!(!reg.get("footer").unwrap().is_many());
        assert_eq!(reg.count("missing"), 0);
        assert!(reg.get("missing").is_none());
    }

    #[test]
    fn test_promotion_keeps_insert_order() {
        let reg = ModuleRegistry::new();
        let a = TestModule::ok("a");
        let b = TestModule::ok("b");
        let c = TestModule::ok("c");

        assert_eq!(reg.insert("widget", a.clone()), Insertion::Single);
        assert_eq!(reg.insert("widget", b.clone()), Insertion::Promoted);
        assert_eq!(reg.insert("widget", c.clone()), Insertion::Appended(3));

        let entry = reg.get("widget").unwrap();
        assert!(entry.is_many());
        assert_eq!(entry.len(), 3);
        assert!(!entry.is_empty());
        assert!(!RegistryEntry::Single(a.clone()).is_empty());
        let ids: Vec<&str> = match &entry {
            RegistryEntry::Many(all) => all.iter().map(|m| m.id()).collect(),
            RegistryEntry::Single(_) => panic!("expected promotion"),
        };
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(Arc::ptr_eq(entry.first().unwrap(), &a));
    }

    #[test]
    fn test_all_groups_by_kind() {
        let reg = ModuleRegistry::new();
        reg.insert("b", TestModule::ok("b1"));
        reg.insert("a", TestModule::ok("a1"));
        reg.insert("b", TestModule::ok("b2"));

        let ids: Vec<String> = reg.all().iter().map(|m| m.id().to_string()).collect();
        assert_eq!(ids, vec!["a1", "b1", "b2"]);
        assert_eq!(reg.instances("b").len(), 2);
        assert_eq!(Insertion::Appended(5).count(), 5);
    }
}
