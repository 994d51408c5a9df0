use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::CharacterRecord;

/// Known spellings whose asset id differs from what players type or read.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("Aurelion Sol", "AurelionSol"),
    ("Bel'Veth", "Belveth"),
    ("Cho'Gath", "Chogath"),
    ("Dr. Mundo", "DrMundo"),
    ("Jarvan IV", "JarvanIV"),
    ("Kai'Sa", "Kaisa"),
    ("Kha'Zix", "Khazix"),
    ("Kog'Maw", "KogMaw"),
    ("K'Sante", "KSante"),
    ("LeBlanc", "Leblanc"),
    ("Lee Sin", "LeeSin"),
    ("Master Yi", "MasterYi"),
    ("Miss Fortune", "MissFortune"),
    ("Nunu & Willump", "Nunu"),
    ("Rek'Sai", "RekSai"),
    ("Renata Glasc", "Renata"),
    ("Tahm Kench", "TahmKench"),
    ("Twisted Fate", "TwistedFate"),
    ("Vel'Koz", "Velkoz"),
    ("Wukong", "MonkeyKing"),
    ("Xin Zhao", "XinZhao"),
];

/// One variant spelling and the asset id it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AliasEntry {
    pub variant: String,
    pub canonical_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AliasFile {
    List(Vec<AliasEntry>),
    Map(BTreeMap<String, String>),
}

/// Lowercase, with whitespace and punctuation removed: `"Kha'Zix "` -> `"khazix"`.
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The single alias table consulted by every name lookup.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    by_key: HashMap<String, String>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for (variant, canonical_id) in BUILTIN_ALIASES {
            table.insert(AliasEntry {
                variant: (*variant).to_string(),
                canonical_id: (*canonical_id).to_string(),
            });
        }
        table
    }

    /// Adds an entry. The canonical id also becomes an alias of itself so that
    /// resolving an already canonical id is a no-op.
    ///
    /// Chains collapse: if the canonical id is itself a known variant, the
    /// entry points at that variant's target, and entries that pointed at the
    /// new variant are redirected. Every value in the table is therefore a
    /// fixpoint, whatever order entries arrive in.
    pub fn insert(&mut self, entry: AliasEntry) {
        let variant_key = normalize_key(&entry.variant);
        if variant_key.is_empty() || normalize_key(&entry.canonical_id).is_empty() {
            return;
        }
        let target = self.follow(entry.canonical_id.trim());
        let target_key = normalize_key(&target);

        if variant_key != target_key {
            for canonical in self.by_key.values_mut() {
                if normalize_key(canonical) == variant_key {
                    *canonical = target.clone();
                }
            }
        }
        self.by_key.insert(variant_key, target.clone());
        self.by_key.entry(target_key).or_insert(target);
    }

    /// Walks variant links from `canonical` until it reaches an id that maps to itself.
    fn follow(&self, canonical: &str) -> String {
        let mut current = canonical.to_string();
        for _ in 0..=self.by_key.len() {
            let Some(next) = self.by_key.get(&normalize_key(&current)) else {
                break;
            };
            let settled = normalize_key(next) == normalize_key(&current);
            current = next.clone();
            if settled {
                break;
            }
        }
        current
    }

    /// Merges entries from JSON: either `[{"variant", "canonical_id"}]` or `{variant: id}`.
    pub fn extend_from_json(&mut self, raw: &str) -> Result<usize> {
        let parsed: AliasFile = serde_json::from_str(raw).context("invalid alias json")?;
        let entries: Vec<AliasEntry> = match parsed {
            AliasFile::List(list) => list,
            AliasFile::Map(map) => map
                .into_iter()
                .map(|(variant, canonical_id)| AliasEntry {
                    variant,
                    canonical_id,
                })
                .collect(),
        };
        let count = entries.len();
        for entry in entries {
            self.insert(entry);
        }
        Ok(count)
    }

    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed reading alias file {}", path.display()))?;
        self.extend_from_json(&raw)
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.by_key.get(&normalize_key(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Maps free-form names to canonical character ids. Exact matching only.
#[derive(Debug, Clone)]
pub struct NameNormalizer {
    aliases: AliasTable,
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new(AliasTable::builtin())
    }
}

impl NameNormalizer {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Alias table first, then exact normalized match on id or display name.
    ///
    /// Returns `None` when nothing matches or when the name matches records
    /// with different ids.
    pub fn resolve_canonical_id(
        &self,
        name: &str,
        characters: &[CharacterRecord],
    ) -> Option<String> {
        let key = normalize_key(name);
        if key.is_empty() {
            return None;
        }
        if let Some(canonical) = self.aliases.lookup(name) {
            return Some(canonical.to_string());
        }

        let mut found: Option<&str> = None;
        for record in characters {
            if normalize_key(&record.id) != key && normalize_key(&record.name) != key {
                continue;
            }
            match found {
                None => found = Some(record.id.as_str()),
                Some(prev) if prev == record.id => {}
                Some(prev) => {
                    tracing::debug!(name, first = prev, second = %record.id, "ambiguous character name");
                    return None;
                }
            }
        }
        found.map(str::to_string)
    }

    /// Resolves and returns the matching record.
    pub fn find<'a>(&self, name: &str, characters: &'a [CharacterRecord]) -> Option<&'a CharacterRecord> {
        let id = self.resolve_canonical_id(name, characters)?;
        characters.iter().find(|c| c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_case() {
        assert_eq!(normalize_key(" Kha'Zix "), "khazix");
        assert_eq!(normalize_key("Dr. Mundo"), "drmundo");
        assert_eq!(normalize_key("Nunu & Willump"), "nunuwillump");
    }

    #[test]
    fn alias_file_accepts_both_shapes() {
        let mut table = AliasTable::empty();
        let n = table
            .extend_from_json(r#"[{"variant": "Fiddle", "canonical_id": "Fiddlesticks"}]"#)
            .unwrap();
        assert_eq!(n, 1);
        table
            .extend_from_json(r#"{"Mel Medarda": "Mel"}"#)
            .unwrap();
        assert_eq!(table.lookup("fiddle"), Some("Fiddlesticks"));
        assert_eq!(table.lookup("MEL medarda"), Some("Mel"));
        assert_eq!(table.lookup("Mel"), Some("Mel"));
    }

    #[test]
    fn blank_entries_are_ignored() {
        let mut table = AliasTable::empty();
        table.insert(AliasEntry {
            variant: "  ".to_string(),
            canonical_id: "Ahri".to_string(),
        });
        assert!(table.is_empty());
    }
}
