use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::emotion::Emotion;
use super::threat_category::ThreatCategory;

/// Rejected category-mapping table. Raised at construction, never at lookup.
#[derive(Error, Debug)]
pub enum MappingError {
    #[error("emotion {0} is not mapped to any category")]
    Missing(Emotion),
    #[error("emotion {0} is mapped to more than one category")]
    Duplicate(Emotion),
    #[error("unknown label in mapping: {0}")]
    UnknownLabel(String),
    #[error("invalid mapping JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read mapping file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Validated emotion → threat-category lookup table.
///
/// Every one of the seven emotions maps to exactly one category; tables
/// that miss or repeat a label are rejected when the mapper is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThreatCategoryMapper {
    table: [ThreatCategory; Emotion::COUNT],
}

impl ThreatCategoryMapper {
    /// Builds a mapper from `(category, emotions)` groups.
    pub fn from_groups<I, E>(groups: I) -> Result<Self, MappingError>
    where
        I: IntoIterator<Item = (ThreatCategory, E)>,
        E: IntoIterator<Item = Emotion>,
    {
        let mut slots: [Option<ThreatCategory>; Emotion::COUNT] = [None; Emotion::COUNT];
        for (category, emotions) in groups {
            for emotion in emotions {
                let slot = &mut slots[emotion.index()];
                if slot.is_some() {
                    return Err(MappingError::Duplicate(emotion));
                }
                *slot = Some(category);
            }
        }

        let mut table = [ThreatCategory::Safe; Emotion::COUNT];
        for (emotion, slot) in Emotion::ALL.into_iter().zip(slots) {
            table[emotion.index()] = slot.ok_or(MappingError::Missing(emotion))?;
        }
        Ok(Self { table })
    }

    /// Parses the nested `{"Safe": ["Happy", "Neutral"], ...}` shape.
    pub fn from_json_str(json: &str) -> Result<Self, MappingError> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut groups = Vec::with_capacity(raw.len());
        for (category, labels) in raw {
            let category: ThreatCategory =
                category.parse().map_err(MappingError::UnknownLabel)?;
            let emotions = labels
                .iter()
                .map(|l| l.parse::<Emotion>().map_err(MappingError::UnknownLabel))
                .collect::<Result<Vec<_>, _>>()?;
            groups.push((category, emotions));
        }
        Self::from_groups(groups)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, MappingError> {
        let json = fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn category(&self, emotion: Emotion) -> ThreatCategory {
        self.table[emotion.index()]
    }

    /// Emotions grouped by category, in label order.
    pub fn groups(&self) -> BTreeMap<ThreatCategory, Vec<Emotion>> {
        let mut groups: BTreeMap<ThreatCategory, Vec<Emotion>> = BTreeMap::new();
        for emotion in Emotion::ALL {
            groups.entry(self.category(emotion)).or_default().push(emotion);
        }
        groups
    }
}

impl Default for ThreatCategoryMapper {
    /// Safe = {Happy, Neutral}; Offensive = {Angry, Disgust};
    /// Threat = {Fear, Sad, Surprise}.
    fn default() -> Self {
        // Indexed by Emotion::ALL order.
        Self {
            table: [
                ThreatCategory::Safe,      // Happy
                ThreatCategory::Safe,      // Neutral
                ThreatCategory::Offensive, // Angry
                ThreatCategory::Offensive, // Disgust
                ThreatCategory::Threat,    // Fear
                ThreatCategory::Threat,    // Sad
                ThreatCategory::Threat,    // Surprise
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Emotion::Happy, ThreatCategory::Safe)]
    #[case(Emotion::Neutral, ThreatCategory::Safe)]
    #[case(Emotion::Angry, ThreatCategory::Offensive)]
    #[case(Emotion::Disgust, ThreatCategory::Offensive)]
    #[case(Emotion::Fear, ThreatCategory::Threat)]
    #[case(Emotion::Sad, ThreatCategory::Threat)]
    #[case(Emotion::Surprise, ThreatCategory::Threat)]
    fn test_default_table(#[case] emotion: Emotion, #[case] expected: ThreatCategory) {
        assert_eq!(ThreatCategoryMapper::default().category(emotion), expected);
    }

    #[test]
    fn test_custom_table_is_honored() {
        let mapper = ThreatCategoryMapper::from_groups([
            (ThreatCategory::Safe, vec![Emotion::Happy, Emotion::Neutral, Emotion::Surprise]),
            (ThreatCategory::Offensive, vec![Emotion::Disgust]),
            (ThreatCategory::Threat, vec![Emotion::Angry, Emotion::Fear, Emotion::Sad]),
        ])
        .unwrap();

        assert_eq!(mapper.category(Emotion::Surprise), ThreatCategory::Safe);
        assert_eq!(mapper.category(Emotion::Angry), ThreatCategory::Threat);
        assert_eq!(mapper.groups()[&ThreatCategory::Offensive], vec![Emotion::Disgust]);
    }

    #[test]
    fn test_missing_label_fails_at_construction() {
        let result = ThreatCategoryMapper::from_groups([
            (ThreatCategory::Safe, vec![Emotion::Happy, Emotion::Neutral]),
            (ThreatCategory::Offensive, vec![Emotion::Angry, Emotion::Disgust]),
            (ThreatCategory::Threat, vec![Emotion::Fear, Emotion::Sad]),
        ]);
        assert!(matches!(result, Err(MappingError::Missing(Emotion::Surprise))));
    }

    #[test]
    fn test_duplicate_label_fails_at_construction() {
        let result = ThreatCategoryMapper::from_groups([
            (ThreatCategory::Safe, vec![Emotion::Happy, Emotion::Neutral, Emotion::Sad]),
            (ThreatCategory::Offensive, vec![Emotion::Angry, Emotion::Disgust]),
            (ThreatCategory::Threat, vec![Emotion::Fear, Emotion::Sad, Emotion::Surprise]),
        ]);
        assert!(matches!(result, Err(MappingError::Duplicate(Emotion::Sad))));
    }

    #[test]
    fn test_json_matches_default() {
        let json = r#"{
            "Safe": ["Happy", "Neutral"],
            "Offensive": ["Disgust", "Angry"],
            "Threat": ["Fear", "Sad", "Surprise"]
        }"#;
        let mapper = ThreatCategoryMapper::from_json_str(json).unwrap();
        assert_eq!(mapper, ThreatCategoryMapper::default());
    }

    #[test]
    fn test_json_unknown_label_rejected() {
        let json = r#"{"Safe": ["Happy", "Neutral", "Contempt"]}"#;
        let result = ThreatCategoryMapper::from_json_str(json);
        assert!(matches!(result, Err(MappingError::UnknownLabel(_))));
    }

    #[test]
    fn test_json_unknown_category_rejected() {
        let json = r#"{"Harmless": ["Happy"]}"#;
        assert!(matches!(
            ThreatCategoryMapper::from_json_str(json),
            Err(MappingError::UnknownLabel(_))
        ));
    }

    #[test]
    fn test_json_incomplete_table_rejected() {
        let json = r#"{"Safe": ["Happy", "Neutral"]}"#;
        assert!(matches!(
            ThreatCategoryMapper::from_json_str(json),
            Err(MappingError::Missing(Emotion::Angry))
        ));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        fs::write(
            &path,
            r#"{"Safe": ["Happy", "Neutral", "Angry", "Disgust", "Fear", "Sad", "Surprise"]}"#,
        )
        .unwrap();
        let mapper = ThreatCategoryMapper::from_json_file(&path).unwrap();
        assert!(Emotion::ALL
            .iter()
            .all(|e| mapper.category(*e) == ThreatCategory::Safe));
    }

    #[test]
    fn test_groups_cover_all_labels() {
        let groups = ThreatCategoryMapper::default().groups();
        assert_eq!(groups[&ThreatCategory::Safe], vec![Emotion::Happy, Emotion::Neutral]);
        assert_eq!(groups.values().map(Vec::len).sum::<usize>(), 7);
    }
}
