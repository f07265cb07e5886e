use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    aliases: BTreeMap<String, BTreeSet<String>>,
}

impl AliasTable {
    /// a table without any alias, every name is its own canonical name
    pub fn empty() -> AliasTable {
        AliasTable {
            aliases: BTreeMap::new(),
        }
    }

    pub fn with_alias(mut self, canonical: &str, alias: &str) -> AliasTable {
        self.aliases
            .entry(canonical.to_string())
            .or_default()
            .insert(alias.to_string());
        self
    }

    /// adds all the aliases of other, keeping the existing ones
    pub fn extend(&mut self, other: &AliasTable) {
        for (canonical, aliases) in other.aliases.iter() {
            self.aliases
                .entry(canonical.clone())
                .or_default()
                .extend(aliases.iter().cloned());
        }
    }

    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases
            .iter()
            .find(|(_, aliases)| aliases.contains(name))
            .map(|(canonical, _)| canonical.as_str())
            .unwrap_or(name)
    }

    pub fn len(&self) -> usize {
        self.aliases.values().map(|a| a.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The spellings found in the johns hopkins time series.
impl Default for AliasTable {
    fn default() -> AliasTable {
        AliasTable::empty()
            .with_alias("China", "Mainland China")
            .with_alias("South Korea", "Korea, South")
            .with_alias("South Korea", "Republic of Korea")
            .with_alias("Taiwan", "Taiwan*")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_collapses_known_spellings() {
        let t = AliasTable::default();
        assert_eq!(t.canonical("Mainland China"), "China");
        assert_eq!(t.canonical("Korea, South"), "South Korea");
        assert_eq!(t.canonical("Republic of Korea"), "South Korea");
        assert_eq!(t.canonical("Taiwan*"), "Taiwan");
        assert_eq!(t.canonical("Italy"), "Italy");
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn extend_adds_without_dropping() {
        let mut t = AliasTable::default();
        let extra = AliasTable::empty()
            .with_alias("South Korea", "S. Korea")
            .with_alias("Czechia", "Czech Republic");
        t.extend(&extra);
        assert_eq!(t.canonical("S. Korea"), "South Korea");
        assert_eq!(t.canonical("Korea, South"), "South Korea");
        assert_eq!(t.canonical("Czech Republic"), "Czechia");
    }

    #[test]
    fn deserializes_from_yaml_mapping() {
        let t: AliasTable = serde_yaml::from_str("Iran:\n  - Iran (Islamic Republic of)\n").unwrap();
        assert_eq!(t.canonical("Iran (Islamic Republic of)"), "Iran");
        assert_eq!(t.len(), 1);
    }
}
