//! Bijective string interning shared by a chunk's `String`-kind columns.

use ahash::AHashMap;

use crate::common::constants::NULL_INDEX;

/// Interns strings to compact `i32` ids. Ids are stable for the lifetime of
/// the dictionary: the same string always maps to the same id, and
/// `NULL_INDEX` is reserved and never assigned to a real string.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    strings: Vec<String>,
    ids: AHashMap<String, i32>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning its id. Calling this twice with equal strings
    /// returns the same id.
    pub fn intern(&mut self, s: &str) -> i32 {
        if let Some(&id) = self.ids.get(s) {
            return id;
        }
        let id = self.strings.len() as i32;
        self.strings.push(s.to_string());
        self.ids.insert(s.to_string(), id);
        id
    }

    pub fn get(&self, id: i32) -> Option<&str> {
        if id == NULL_INDEX {
            return None;
        }
        self.strings.get(id as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Merge `other`'s entries into `self`, returning a map from `other`'s
    /// ids to `self`'s ids. Used by Concat when combining chunks that each
    /// carry their own dictionary.
    pub fn merge(&mut self, other: &Dictionary) -> Vec<i32> {
        let mut remap = Vec::with_capacity(other.strings.len());
        for s in &other.strings {
            remap.push(self.intern(s));
        }
        remap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut dict = Dictionary::new();
        let a = dict.intern("hello");
        let b = dict.intern("hello");
        assert_eq!(a, b);
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn distinct_strings_get_distinct_ids() {
        let mut dict = Dictionary::new();
        let a = dict.intern("a");
        let b = dict.intern("b");
        assert_ne!(a, b);
        assert_eq!(dict.get(a), Some("a"));
        assert_eq!(dict.get(b), Some("b"));
    }

    #[test]
    fn merge_remaps_ids_without_duplicating_shared_strings() {
        let mut left = Dictionary::new();
        left.intern("x");
        left.intern("y");

        let mut right = Dictionary::new();
        let rx = right.intern("x");
        let rz = right.intern("z");

        let remap = left.merge(&right);
        assert_eq!(left.get(remap[rx as usize]), Some("x"));
        assert_eq!(left.get(remap[rz as usize]), Some("z"));
        assert_eq!(left.len(), 3);
    }
}
