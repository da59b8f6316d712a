use std::fmt;

use serde::Serialize;

use crate::detection::domain::detection::Detection;
use crate::emotion::domain::emotion::Emotion;
use crate::emotion::domain::threat_category::ThreatCategory;

/// Overall level of a sequence of detections: its most severe category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ThreatLevel {
    NoDetections,
    Safe,
    Offensive,
    Threat,
}

impl ThreatLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreatLevel::NoDetections => "NoDetections",
            ThreatLevel::Safe => "Safe",
            ThreatLevel::Offensive => "Offensive",
            ThreatLevel::Threat => "Threat",
        }
    }
}

impl From<ThreatCategory> for ThreatLevel {
    fn from(category: ThreatCategory) -> Self {
        match category {
            ThreatCategory::Safe => ThreatLevel::Safe,
            ThreatCategory::Offensive => ThreatLevel::Offensive,
            ThreatCategory::Threat => ThreatLevel::Threat,
        }
    }
}

impl fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label and how often it occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Tally<T> {
    pub label: T,
    pub count: usize,
}

/// Aggregate statistics over a sequence of detections.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub total_detections: usize,
    /// Detections without an emotion. Included in `total_detections`.
    pub unclassified: usize,
    /// Most frequent classified emotion; ties go to the one seen first.
    pub most_common_emotion: Option<Emotion>,
    pub most_common_category: Option<ThreatCategory>,
    pub threat_level: ThreatLevel,
    /// Share of detections in the Offensive or Threat category.
    pub flagged_ratio: f64,
    /// Emotion counts in first-seen order.
    pub emotion_counts: Vec<Tally<Emotion>>,
    /// Category counts in first-seen order.
    pub category_counts: Vec<Tally<ThreatCategory>>,
}

impl Summary {
    pub fn empty() -> Self {
        StreamAggregator::new().finish()
    }

    pub fn emotion_count(&self, emotion: Emotion) -> usize {
        count_of(&self.emotion_counts, emotion)
    }

    pub fn category_count(&self, category: ThreatCategory) -> usize {
        count_of(&self.category_counts, category)
    }
}

/// Folds detections one at a time into a [`Summary`].
///
/// Keeps only counters, so memory does not grow with stream length.
#[derive(Clone, Debug, Default)]
pub struct StreamAggregator {
    total: usize,
    unclassified: usize,
    emotions: Vec<Tally<Emotion>>,
    categories: Vec<Tally<ThreatCategory>>,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, detection: &Detection) {
        self.total += 1;
        match detection.emotion() {
            Some(emotion) => bump(&mut self.emotions, emotion),
            None => self.unclassified += 1,
        }
        bump(&mut self.categories, detection.category());
    }

    pub fn extend<'a>(&mut self, detections: impl IntoIterator<Item = &'a Detection>) {
        for detection in detections {
            self.push(detection);
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn finish(&self) -> Summary {
        let threat_level = self
            .categories
            .iter()
            .map(|t| ThreatLevel::from(t.label))
            .max()
            .unwrap_or(ThreatLevel::NoDetections);

        let flagged = self.count_category(ThreatCategory::Offensive)
            + self.count_category(ThreatCategory::Threat);
        let flagged_ratio = if self.total > 0 {
            flagged as f64 / self.total as f64
        } else {
            0.0
        };

        Summary {
            total_detections: self.total,
            unclassified: self.unclassified,
            most_common_emotion: most_common(&self.emotions),
            most_common_category: most_common(&self.categories),
            threat_level,
            flagged_ratio,
            emotion_counts: self.emotions.clone(),
            category_counts: self.categories.clone(),
        }
    }

    fn count_category(&self, category: ThreatCategory) -> usize {
        count_of(&self.categories, category)
    }
}

/// Summarizes detections in arrival order.
pub fn summarize<'a>(detections: impl IntoIterator<Item = &'a Detection>) -> Summary {
    let mut aggregator = StreamAggregator::new();
    aggregator.extend(detections);
    aggregator.finish()
}

fn bump<T: PartialEq>(tallies: &mut Vec<Tally<T>>, label: T) {
    match tallies.iter_mut().find(|t| t.label == label) {
        Some(t) => t.count += 1,
        None => tallies.push(Tally { label, count: 1 }),
    }
}

fn count_of<T: PartialEq>(tallies: &[Tally<T>], label: T) -> usize {
    tallies
        .iter()
        .find(|t| t.label == label)
        .map_or(0, |t| t.count)
}

/// Highest count; the earliest entry wins a tie.
fn most_common<T: Copy>(tallies: &[Tally<T>]) -> Option<T> {
    let mut best: Option<&Tally<T>> = None;
    for tally in tallies {
        if best.map_or(true, |b| tally.count > b.count) {
            best = Some(tally);
        }
    }
    best.map(|t| t.label)
}
