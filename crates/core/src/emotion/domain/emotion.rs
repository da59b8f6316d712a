use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The fixed set of facial emotion labels. No other labels exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Emotion {
    Happy,
    Neutral,
    Angry,
    Disgust,
    Fear,
    Sad,
    Surprise,
}

impl Emotion {
    pub const COUNT: usize = 7;

    pub const ALL: [Emotion; Emotion::COUNT] = [
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Angry,
        Emotion::Disgust,
        Emotion::Fear,
        Emotion::Sad,
        Emotion::Surprise,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "Happy",
            Emotion::Neutral => "Neutral",
            Emotion::Angry => "Angry",
            Emotion::Disgust => "Disgust",
            Emotion::Fear => "Fear",
            Emotion::Sad => "Sad",
            Emotion::Surprise => "Surprise",
        }
    }

    /// Position of this label in [`Emotion::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Emotion {
    type Err = String;

    /// Case-insensitive label lookup.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown emotion label '{s}'"))
    }
}

/// Per-label probabilities for one face.
///
/// Values are clamped to [0, 1] on construction. They need not sum to 1;
/// providers report their native scores and the dominant label is the argmax.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct EmotionDistribution {
    scores: [f64; Emotion::COUNT],
}

impl EmotionDistribution {
    /// Builds a distribution from scores ordered like [`Emotion::ALL`].
    pub fn new(scores: [f64; Emotion::COUNT]) -> Self {
        Self {
            scores: scores.map(clamp_unit),
        }
    }

    /// Builds a distribution from `(label, score)` pairs; absent labels score 0.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Emotion, f64)>,
    {
        let mut scores = [0.0; Emotion::COUNT];
        for (emotion, score) in pairs {
            scores[emotion.index()] = clamp_unit(score);
        }
        Self { scores }
    }

    pub fn get(&self, emotion: Emotion) -> f64 {
        self.scores[emotion.index()]
    }

    /// Scores ordered like [`Emotion::ALL`].
    pub fn scores(&self) -> &[f64; Emotion::COUNT] {
        &self.scores
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.into_iter().zip(self.scores.iter().copied())
    }

    /// Label with the highest score and that score.
    ///
    /// Ties resolve to the label that comes first in [`Emotion::ALL`].
    pub fn dominant(&self) -> (Emotion, f64) {
        let mut best = (Emotion::ALL[0], self.scores[0]);
        for (emotion, score) in self.iter().skip(1) {
            if score > best.1 {
                best = (emotion, score);
            }
        }
        best
    }
}

impl Serialize for EmotionDistribution {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(Emotion::COUNT))?;
        for (emotion, score) in self.iter() {
            map.serialize_entry(emotion.as_str(), &score)?;
        }
        map.end()
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
