// ABOUTME: Non-empty set of public hostnames attached to an application.
// ABOUTME: Insertion order is kept for requests; comparisons are by membership.

use nonempty::NonEmpty;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Eq)]
pub struct CnameSet(NonEmpty<String>);

impl CnameSet {
    /// Build a set from hostnames, dropping duplicates. `None` when empty.
    pub fn from_vec(names: Vec<String>) -> Option<Self> {
        let mut unique: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        NonEmpty::from_vec(unique).map(Self)
    }

    pub fn single(name: impl Into<String>) -> Self {
        Self(NonEmpty::new(name.into()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl PartialEq for CnameSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|name| other.contains(name))
    }
}

impl fmt::Display for CnameSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

impl Serialize for CnameSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
