//! Common code shared between `photo_identify` and its tests.
pub mod labels;

pub use labels::{DecodeError, LabelError, LabelTable, Prediction};

/// Number of predictions shown for every classified image.
pub const TOP_K: usize = 5;
