//! ImageNet label table and top-k decoding of classifier outputs.
//!
//! The table is read from the `imagenet_class_index.json` file distributed with Keras, which maps
//! the output index of the network to a WordNet id and a readable name:
//!
//! ```json
//! {"0": ["n01440764", "tench"], "1": ["n01443537", "goldfish"], ...}
//! ```
use std::{cmp::Ordering, collections::HashMap, fs, path::Path};

use itertools::Itertools;
use serde::Deserialize;
use thiserror::Error;

/// Errors while loading a label table.
#[derive(Debug, Error)]
pub enum LabelError {
    #[error("failed to read label file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse label file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("label key {0:?} is not a class index")]
    InvalidIndex(String),

    #[error("label table has no entry for class {0}")]
    MissingIndex(usize),

    #[error("label table is empty")]
    Empty,
}

/// Errors while decoding a network output.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("expected {expected} class scores, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
}

/// One ranked class of a classification result.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// WordNet id, e.g. `n02110185`.
    pub class_id: String,
    /// Readable name, e.g. `Siberian_husky`.
    pub label: String,
    /// Score of the class, in `[0, 1]` for softmax outputs.
    pub confidence: f32,
}

/// One entry of the class index, `[wordnet_id, name]`.
#[derive(Debug, Deserialize)]
struct ClassEntry(String, String);

/// Class labels indexed by network output position.
#[derive(Clone, Debug)]
pub struct LabelTable {
    classes: Vec<(String, String)>,
}

impl LabelTable {
    /// Parse a Keras class index document.
    pub fn from_json(json: &str) -> Result<Self, LabelError> {
        let raw: HashMap<String, ClassEntry> = serde_json::from_str(json)?;
        if raw.is_empty() {
            return Err(LabelError::Empty);
        }

        let mut indexed = raw
            .into_iter()
            .map(|(key, ClassEntry(class_id, label))| match key.parse::<usize>() {
                Ok(index) => Ok((index, (class_id, label))),
                Err(_) => Err(LabelError::InvalidIndex(key)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        indexed.sort_by_key(|(index, _)| *index);

        // Indices have to cover 0..n without gaps
        for (position, (index, _)) in indexed.iter().enumerate() {
            if *index != position {
                return Err(LabelError::MissingIndex(position));
            }
        }

        Ok(Self {
            classes: indexed.into_iter().map(|(_, class)| class).collect(),
        })
    }

    /// Read and parse a Keras class index file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LabelError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// WordNet id and name of a class.
    pub fn get(&self, index: usize) -> Option<(&str, &str)> {
        self.classes
            .get(index)
            .map(|(class_id, label)| (class_id.as_str(), label.as_str()))
    }

    /// Map a score vector over all classes to the `top` highest scoring predictions.
    ///
    /// Results are sorted by descending score. Equal scores keep the order of their class index
    /// and NaN scores rank below every number.
    pub fn decode(&self, scores: &[f32], top: usize) -> Result<Vec<Prediction>, DecodeError> {
        if scores.len() != self.classes.len() {
            return Err(DecodeError::ShapeMismatch {
                expected: self.classes.len(),
                actual: scores.len(),
            });
        }

        let predictions = scores
            .iter()
            .copied()
            .enumerate()
            .sorted_by(|(_, a), (_, b)| descending(*a, *b))
            .take(top)
            .map(|(index, confidence)| {
                let (class_id, label) = &self.classes[index];
                Prediction {
                    class_id: class_id.clone(),
                    label: label.clone(),
                    confidence,
                }
            })
            .collect();

        Ok(predictions)
    }
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}
