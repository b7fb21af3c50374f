// ABOUTME: Process-type to unit-count mapping.
// ABOUTME: Keeps first-seen order so platform calls are issued deterministically.

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use std::fmt;

/// Number of running units per process type.
///
/// Entries keep the order in which process types were first seen. Equality
/// ignores that order.
#[derive(Debug, Clone, Default, Eq)]
pub struct ProcessTopology {
    entries: Vec<(String, u32)>,
}

impl ProcessTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count occurrences of each process-type name in a unit list.
    pub fn from_units<I, S>(process_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut topology = Self::new();
        for name in process_names {
            let name = name.as_ref();
            let count = topology.count(name);
            topology.set(name, count + 1);
        }
        topology
    }

    pub fn get(&self, process: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(name, _)| name == process)
            .map(|(_, count)| *count)
    }

    /// Unit count for a process type, treating an absent entry as zero.
    pub fn count(&self, process: &str) -> u32 {
        self.get(process).unwrap_or(0)
    }

    pub fn set(&mut self, process: &str, count: u32) {
        match self.entries.iter_mut().find(|(name, _)| name == process) {
            Some(entry) => entry.1 = count,
            None => self.entries.push((process.to_string(), count)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_units(&self) -> u64 {
        self.entries.iter().map(|(_, count)| u64::from(*count)).sum()
    }
}

impl PartialEq for ProcessTopology {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(name, count)| other.get(name) == Some(count))
    }
}

impl<S: Into<String>> FromIterator<(S, u32)> for ProcessTopology {
    fn from_iter<I: IntoIterator<Item = (S, u32)>>(iter: I) -> Self {
        let mut topology = Self::new();
        for (name, count) in iter {
            topology.set(&name.into(), count);
        }
        topology
    }
}

impl fmt::Display for ProcessTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(no units)");
        }
        for (i, (name, count)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={count}")?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for ProcessTopology {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TopologyVisitor;

        impl<'de> Visitor<'de> for TopologyVisitor {
            type Value = ProcessTopology;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of process type to unit count")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut topology = ProcessTopology::new();
                while let Some((name, count)) = map.next_entry::<String, u32>()? {
                    topology.set(&name, count);
                }
                Ok(topology)
            }
        }

        deserializer.deserialize_map(TopologyVisitor)
    }
}

impl serde::Serialize for ProcessTopology {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.iter())
    }
}
