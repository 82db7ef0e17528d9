//! Runtime settings of the server.
//!
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

/// Model location relative to the project root.
pub const MODEL_RELATIVE_PATH: [&str; 3] = ["prediction", "models", "vgg16.onnx"];

/// Where Keras publishes the ImageNet class index.
pub const DEFAULT_LABELS_URL: &str =
    "https://storage.googleapis.com/download.tensorflow.org/data/imagenet_class_index.json";

const LABELS_FILE_NAME: &str = "imagenet_class_index.json";

/// Upper bound for request bodies, 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Explicit configuration handed to the server at construction time.
#[derive(Clone, Debug)]
pub struct Settings {
    pub server_address: SocketAddr,
    pub project_root: PathBuf,
    /// Overrides the model location derived from `project_root`.
    pub model_path: Option<PathBuf>,
    /// Source to download the model from if it is missing.
    pub model_url: Option<String>,
    /// Overrides the default label file location.
    pub labels_path: Option<PathBuf>,
    pub labels_url: String,
    pub max_upload_bytes: usize,
}

impl Settings {
    pub fn new(server_address: SocketAddr, project_root: impl Into<PathBuf>) -> Self {
        Self {
            server_address,
            project_root: project_root.into(),
            model_path: None,
            model_url: None,
            labels_path: None,
            labels_url: DEFAULT_LABELS_URL.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Path of the ONNX model, `<root>/prediction/models/vgg16.onnx` unless overridden.
    pub fn model_path(&self) -> PathBuf {
        match &self.model_path {
            Some(path) => path.clone(),
            None => MODEL_RELATIVE_PATH
                .iter()
                .fold(self.project_root.clone(), |path, part| path.join(part)),
        }
    }

    /// Path of the label file.
    ///
    /// Defaults to the user cache directory, next to the model if there is none.
    pub fn labels_path(&self) -> PathBuf {
        match &self.labels_path {
            Some(path) => path.clone(),
            None => default_labels_path(&self.project_root),
        }
    }
}

fn default_labels_path(project_root: &Path) -> PathBuf {
    match dirs::cache_dir() {
        Some(cache) => cache.join("photo_identify").join(LABELS_FILE_NAME),
        None => project_root
            .join(MODEL_RELATIVE_PATH[0])
            .join(MODEL_RELATIVE_PATH[1])
            .join(LABELS_FILE_NAME),
    }
}
