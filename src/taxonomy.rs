//! Priority taxonomy and canal classification
//!
//! Two fixed levels: main groups ("A", "B", "C") own sub-groups ("A1", "A2", ...),
//! and sub-groups list the canals assigned to them. The taxonomy is plain
//! configuration; the resolver receives it at construction and never mutates it.

use anyhow::{Context, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main group and the sub-groups it encloses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainGroup {
    pub name: String,
    pub sub_groups: Vec<String>,
}

/// Sub-group and the canals assigned to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubGroup {
    pub name: String,
    pub canals: Vec<String>,
}

/// Result of a direct classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub main_group: String,
    pub sub_group: String,
}

/// Two-level priority taxonomy
///
/// Order is significant: both lists are scanned front to back and the first
/// match wins, so a canal listed under two sub-groups takes the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityTaxonomy {
    pub main_groups: Vec<MainGroup>,
    pub sub_groups: Vec<SubGroup>,
}

impl PriorityTaxonomy {
    pub fn new(main_groups: Vec<MainGroup>, sub_groups: Vec<SubGroup>) -> Self {
        let taxonomy = Self { main_groups, sub_groups };
        taxonomy.report_duplicates();
        taxonomy
    }

    /// Built-in Rabi season allocation
    pub fn rabi_default() -> Self {
        fn main(name: &str, subs: &[&str]) -> MainGroup {
            MainGroup {
                name: name.to_string(),
                sub_groups: subs.iter().map(|s| s.to_string()).collect(),
            }
        }
        fn sub(name: &str, canals: &[&str]) -> SubGroup {
            SubGroup {
                name: name.to_string(),
                canals: canals.iter().map(|s| s.to_string()).collect(),
            }
        }

        Self::new(
            vec![
                main("A", &["A1", "A2"]),
                main("B", &["B1", "B2"]),
                main("C", &["C1", "C2"]),
            ],
            vec![
                sub("A1", &["Chamman Disty", "Nal Disty", "Tarinda Disty", "Channa Minor"]),
                sub("A2", &["Upper Wah Faquiran Disty", "Lower Wah Faquiran Disty", "Kacha Disty"]),
                sub("B1", &["Azim Disty", "Pattan Munara Minor", "Kandera Disty", "Nal Disty"]),
                sub("B2", &["Adam Sohaba Disty", "Talla Disty", "Chamman Disty", "Sianwar Minor"]),
                sub("C1", &["Naushera Link Disty", "Naushera Minor", "Bagh Minor", "Malu Minor"]),
                sub("C2", &["Manthar Disty", "Lakhi Minor", "Sultan Disty"]),
            ],
        )
    }

    /// Load a taxonomy from JSON
    ///
    /// ```json
    /// {"main_groups": [{"name": "A", "sub_groups": ["A1"]}],
    ///  "sub_groups":  [{"name": "A1", "canals": ["Nal Disty"]}]}
    /// ```
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read taxonomy file: {:?}", path))?;

        let parsed: PriorityTaxonomy = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse taxonomy JSON: {:?}", path))?;

        Ok(Self::new(parsed.main_groups, parsed.sub_groups))
    }

    /// Classify a canal by direct listing
    ///
    /// Returns `None` when the canal is not listed, or when none of the
    /// sub-groups listing it belongs to a main group.
    pub fn classify(&self, canal: &str) -> Option<Classification> {
        let canal = canal.trim();

        self.sub_groups
            .iter()
            .filter(|sub| sub.canals.iter().any(|c| c.trim() == canal))
            .find_map(|sub| {
                self.main_group_of(&sub.name).map(|main| Classification {
                    main_group: main.to_string(),
                    sub_group: sub.name.clone(),
                })
            })
    }

    /// Main group enclosing a sub-group
    pub fn main_group_of(&self, sub_group: &str) -> Option<&str> {
        self.main_groups
            .iter()
            .find(|main| main.sub_groups.iter().any(|s| s == sub_group))
            .map(|main| main.name.as_str())
    }

    /// Canals listed under more than one sub-group, in first-seen order
    pub fn duplicate_canals(&self) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut reported = FxHashSet::default();
        let mut duplicates = Vec::new();

        for canal in self.sub_groups.iter().flat_map(|s| s.canals.iter()) {
            let canal = canal.trim();
            if !seen.insert(canal) && reported.insert(canal) {
                duplicates.push(canal.to_string());
            }
        }

        duplicates
    }

    fn report_duplicates(&self) {
        for canal in self.duplicate_canals() {
            tracing::warn!(
                "Canal '{}' is listed under more than one sub-group; the first listing wins",
                canal
            );
        }
    }
}

impl Default for PriorityTaxonomy {
    fn default() -> Self {
        Self::rabi_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(main: &str, sub: &str) -> Option<Classification> {
        Some(Classification {
            main_group: main.to_string(),
            sub_group: sub.to_string(),
        })
    }

    #[test]
    fn test_direct_listing() {
        let taxonomy = PriorityTaxonomy::rabi_default();
        assert_eq!(taxonomy.classify("Kacha Disty"), classified("A", "A2"));
        assert_eq!(taxonomy.classify("Sultan Disty"), classified("C", "C2"));
        assert_eq!(taxonomy.classify("  Malu Minor "), classified("C", "C1"));
    }

    #[test]
    fn test_first_listing_wins() {
        // Listed under A1 and B1
        let taxonomy = PriorityTaxonomy::rabi_default();
        assert_eq!(taxonomy.classify("Nal Disty"), classified("A", "A1"));
        // Listed under A1 and B2
        assert_eq!(taxonomy.classify("Chamman Disty"), classified("A", "A1"));
    }

    #[test]
    fn test_unknown_canal() {
        let taxonomy = PriorityTaxonomy::rabi_default();
        assert_eq!(taxonomy.classify("Unknown Minor"), None);
        assert_eq!(taxonomy.classify(""), None);
    }

    #[test]
    fn test_main_group_never_differs_from_enclosing_group() {
        let taxonomy = PriorityTaxonomy::rabi_default();
        let duplicates = taxonomy.duplicate_canals();

        for sub in &taxonomy.sub_groups {
            for canal in &sub.canals {
                if duplicates.contains(canal) {
                    continue;
                }
                let c = taxonomy.classify(canal).unwrap();
                assert_eq!(c.sub_group, sub.name);
                assert_eq!(Some(c.main_group.as_str()), taxonomy.main_group_of(&sub.name));
            }
        }
    }

    #[test]
    fn test_orphan_sub_group_is_skipped() {
        let taxonomy = PriorityTaxonomy::new(
            vec![MainGroup {
                name: "B".into(),
                sub_groups: vec!["B1".into()],
            }],
            vec![
                SubGroup {
                    name: "X9".into(),
                    canals: vec!["Azim Disty".into()],
                },
                SubGroup {
                    name: "B1".into(),
                    canals: vec!["Azim Disty".into()],
                },
            ],
        );

        assert_eq!(taxonomy.classify("Azim Disty"), classified("B", "B1"));
    }

    #[test]
    fn test_duplicate_canals() {
        let taxonomy = PriorityTaxonomy::rabi_default();
        assert_eq!(
            taxonomy.duplicate_canals(),
            vec!["Nal Disty".to_string(), "Chamman Disty".to_string()]
        );
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taxonomy.json");
        std::fs::write(
            &path,
            r#"{
                "main_groups": [{"name": "K", "sub_groups": ["K1"]}],
                "sub_groups": [{"name": "K1", "canals": ["Kot Minor"]}]
            }"#,
        )
        .unwrap();

        let taxonomy = PriorityTaxonomy::load(&path).unwrap();
        assert_eq!(taxonomy.classify("Kot Minor"), classified("K", "K1"));
        assert_eq!(taxonomy.classify("Nal Disty"), None);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PriorityTaxonomy::load(Path::new("/no/such/taxonomy.json")).unwrap_err();
        assert!(err.to_string().contains("taxonomy"));
    }
}
