//! The host's live text repository, seen only through enumerate/get/set.

use crate::codec::TranslationMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Capability surface the engine needs from the host string table.
pub trait TextRepository {
    /// Every key currently known to the repository, in no particular order.
    fn all_keys(&self) -> Vec<String>;

    /// Current text for `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Insert or overwrite the text for `key`.
    fn set(&mut self, key: &str, text: &str);

    /// Whether this repository is backed by the very table `map` points at.
    ///
    /// Copying a table into itself would mutate it while iterating, so merges
    /// check this first.
    fn shares_table(&self, _map: &SharedMap) -> bool {
        false
    }

    /// Whether the table is borrowed elsewhere, so writing now would fail.
    fn is_busy(&self) -> bool {
        false
    }
}

impl TextRepository for TranslationMap {
    fn all_keys(&self) -> Vec<String> {
        self.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }

    fn set(&mut self, key: &str, text: &str) {
        self.insert(key.to_string(), text.to_string());
    }
}

/// A dictionary shared between the engine and the host.
///
/// The host hands these to its "overload strings" entry point; identity of the
/// handle, not its contents, decides whether two of them are the same table.
pub type SharedMap = Rc<RefCell<TranslationMap>>;

impl TextRepository for SharedMap {
    fn all_keys(&self) -> Vec<String> {
        self.borrow().keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.borrow().get(key).cloned()
    }

    fn set(&mut self, key: &str, text: &str) {
        self.borrow_mut().insert(key.to_string(), text.to_string());
    }

    fn shares_table(&self, map: &SharedMap) -> bool {
        Rc::ptr_eq(self, map)
    }

    fn is_busy(&self) -> bool {
        self.try_borrow_mut().is_err()
    }
}

/// In-memory string table keyed the way the host keys its root table.
///
/// Hosts that keep their own table implement [`TextRepository`] directly; this
/// type backs tests and standalone tooling.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    entries: HashMap<String, String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StringTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl TextRepository for StringTable {
    fn all_keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, text: &str) {
        self.entries.insert(key.to_string(), text.to_string());
    }
}
