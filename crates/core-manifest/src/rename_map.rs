//! Old-path to new-path substitution table

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One planned rename, paths relative to the package root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameEntry {
    pub old: String,
    pub new: String,
}

/// Insertion-ordered rename table with unique source paths.
///
/// Lookups are exact and single-hop: a name that is the target of one entry
/// and the source of another is not chased further.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RenameEntry>", into = "Vec<RenameEntry>")]
pub struct RenameMap {
    entries: Vec<RenameEntry>,
    index: HashMap<String, usize>,
}

impl RenameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(old, new)` pairs, rejecting repeated sources
    pub fn from_pairs<I, O, N>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (O, N)>,
        O: Into<String>,
        N: Into<String>,
    {
        let mut map = Self::new();
        for (old, new) in pairs {
            map.insert(old, new)?;
        }
        Ok(map)
    }

    pub fn insert<O: Into<String>, N: Into<String>>(&mut self, old: O, new: N) -> Result<()> {
        let old = old.into();
        if self.index.contains_key(&old) {
            return Err(Error::DuplicateRename { path: old });
        }
        self.index.insert(old.clone(), self.entries.len());
        self.entries.push(RenameEntry {
            old,
            new: new.into(),
        });
        Ok(())
    }

    /// New name for `old`, if it is renamed
    pub fn get(&self, old: &str) -> Option<&str> {
        self.index
            .get(old)
            .map(|&i| self.entries[i].new.as_str())
    }

    pub fn contains(&self, old: &str) -> bool {
        self.index.contains_key(old)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenameEntry> {
        self.entries.iter()
    }

    /// The map that undoes this one
    pub fn inverse(&self) -> Result<Self> {
        Self::from_pairs(self.entries.iter().map(|e| (e.new.clone(), e.old.clone())))
    }
}

impl TryFrom<Vec<RenameEntry>> for RenameMap {
    type Error = Error;

    fn try_from(entries: Vec<RenameEntry>) -> Result<Self> {
        Self::from_pairs(entries.into_iter().map(|e| (e.old, e.new)))
    }
}

impl From<RenameMap> for Vec<RenameEntry> {
    fn from(map: RenameMap) -> Self {
        map.entries
    }
}

impl<'a> IntoIterator for &'a RenameMap {
    type Item = &'a RenameEntry;
    type IntoIter = std::slice::Iter<'a, RenameEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
