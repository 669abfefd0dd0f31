//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the shadertools-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Macro table: 256 hash chains of Define records.
//

use std::rc::Rc;

use crate::strings::hash_djbxor;

const BUCKETS: usize = 256;

/// A macro definition.
///
/// `paramcount` of 0 marks an object-like macro; a positive count a
/// function-like macro with that many formals; -1 the function-like
/// zero-formal case (`#define a()`), which is distinct from object-like.
///
/// The expander reuses this record for collected macro arguments, where
/// `definition` holds the pre-expanded text and `original` the raw
/// lexemes for `#` stringification.
#[derive(Debug, Clone)]
pub struct Define {
    pub identifier: Rc<str>,
    pub definition: Rc<str>,
    pub original: Option<Rc<str>>,
    pub parameters: Vec<Rc<str>>,
    pub paramcount: i32,
}

impl Define {
    /// An object-like macro (also used for the synthetic `__FILE__` and
    /// `__LINE__` lookups, which are re-materialized per call).
    pub fn object(identifier: impl Into<Rc<str>>, definition: impl Into<Rc<str>>) -> Self {
        Self {
            identifier: identifier.into(),
            definition: definition.into(),
            original: None,
            parameters: Vec::new(),
            paramcount: 0,
        }
    }
}

fn bucket_index(sym: &str) -> usize {
    (hash_djbxor(sym.as_bytes()) & 0xff) as usize
}

/// Hash table from identifier to `Define`, chained per bucket with
/// insertion at the head.
pub struct DefineTable {
    buckets: Vec<Vec<Define>>,
}

impl DefineTable {
    pub fn new() -> Self {
        Self {
            buckets: vec![Vec::new(); BUCKETS],
        }
    }

    /// Insert a new macro. Returns false (leaving the table unchanged)
    /// if the name is already defined; redefinition is an error, not a
    /// silent replace.
    pub fn insert(&mut self, def: Define) -> bool {
        let bucket = &mut self.buckets[bucket_index(&def.identifier)];
        if bucket.iter().any(|d| d.identifier == def.identifier) {
            return false;
        }
        bucket.insert(0, def);
        true
    }

    pub fn find(&self, sym: &str) -> Option<&Define> {
        self.buckets[bucket_index(sym)]
            .iter()
            .find(|d| &*d.identifier == sym)
    }

    /// Remove a macro. Returns false if it wasn't defined.
    pub fn remove(&mut self, sym: &str) -> bool {
        let bucket = &mut self.buckets[bucket_index(sym)];
        match bucket.iter().position(|d| &*d.identifier == sym) {
            Some(i) => {
                bucket.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }
}

impl Default for DefineTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_find() {
        let mut table = DefineTable::new();
        assert!(table.insert(Define::object("A", "1")));
        assert_eq!(&*table.find("A").unwrap().definition, "1");
        assert!(table.find("B").is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut table = DefineTable::new();
        assert!(table.insert(Define::object("A", "1")));
        assert!(!table.insert(Define::object("A", "2")));
        assert_eq!(&*table.find("A").unwrap().definition, "1");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_define_then_undef_is_identity() {
        let mut table = DefineTable::new();
        assert!(table.insert(Define::object("X", "Y")));
        assert!(table.remove("X"));
        assert!(table.find("X").is_none());
        assert_eq!(table.len(), 0);
        assert!(!table.remove("X"));
    }

    #[test]
    fn test_chains_hold_many_entries() {
        let mut table = DefineTable::new();
        for i in 0..1000 {
            assert!(table.insert(Define::object(
                format!("macro_{}", i).as_str(),
                format!("{}", i).as_str()
            )));
        }
        assert_eq!(table.len(), 1000);
        assert_eq!(&*table.find("macro_512").unwrap().definition, "512");
    }
}
