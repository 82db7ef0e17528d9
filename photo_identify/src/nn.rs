use std::path::Path;

use anyhow::{bail, Context, Result};
use common::{LabelTable, Prediction, TOP_K};
use image::{imageops::FilterType, DynamicImage, RgbImage};
use ndarray::s;
use smallvec::SmallVec;
use tract_onnx::prelude::*;

use crate::{config::Settings, utils::ensure_file};

type NnModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;
type NnOut = SmallVec<[TValue; 4]>;

/// Side length of the square network input.
pub const INPUT_SIZE: u32 = 224;

/// Per-channel ImageNet means in BGR order, subtracted from the raw 0..255 pixel values.
const MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// A model which maps an image to ranked class predictions.
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>>;
}

/// VGG16 trained on ImageNet, converted from the Keras application model to ONNX.
pub struct Vgg16Model {
    model: NnModel,
    labels: LabelTable,
}

impl Vgg16Model {
    pub fn new(model_path: impl AsRef<Path>, labels: LabelTable) -> Result<Self> {
        let model = get_vgg16_model(model_path.as_ref())?;
        Ok(Self { model, labels })
    }

    /// Fetch missing artifacts and load the model with its label table.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let client = reqwest::Client::new();

        let labels_path = settings.labels_path();
        ensure_file(&client, &settings.labels_url, &labels_path).await?;
        let labels = LabelTable::from_path(&labels_path)
            .with_context(|| format!("failed to load labels from {}", labels_path.display()))?;

        let model_path = settings.model_path();
        if let Some(model_url) = &settings.model_url {
            ensure_file(&client, model_url, &model_path).await?;
        }

        log::info!("Loading model from {}", model_path.display());
        let model = tokio::task::spawn_blocking(move || Self::new(model_path, labels)).await??;
        log::info!("Model ready");

        Ok(model)
    }

    fn postproc(&self, raw_nn_out: NnOut) -> Result<Vec<Prediction>> {
        postproc(&self.labels, raw_nn_out)
    }
}

impl Classifier for Vgg16Model {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>> {
        let valid_input = tvec!(preproc(image).into());
        let raw_nn_out = self.model.run(valid_input)?;
        self.postproc(raw_nn_out)
    }
}

fn get_vgg16_model(model_path: &Path) -> Result<NnModel> {
    let input_fact = InferenceFact::dt_shape(
        f32::datum_type(),
        tvec!(1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3),
    );
    let model = tract_onnx::onnx()
        .model_for_path(model_path)
        .with_context(|| format!("failed to read model {}", model_path.display()))?
        .with_input_fact(0, input_fact)?
        .into_optimized()?
        .into_runnable()?;

    Ok(model)
}

/// Build the NHWC input tensor of shape `(1, 224, 224, 3)`.
///
/// The image is squashed to 224x224 without keeping the aspect ratio, then converted to BGR
/// with the ImageNet channel means subtracted and no further scaling.
pub fn preproc(image: &DynamicImage) -> Tensor {
    let resized: RgbImage = image::imageops::resize(
        &image.to_rgb8(),
        INPUT_SIZE,
        INPUT_SIZE,
        FilterType::Nearest,
    );

    let size = INPUT_SIZE as usize;
    let tensor: Tensor = tract_ndarray::Array4::from_shape_fn((1, size, size, 3), |(_, y, x, c)| {
        // Channel 0 of the tensor is blue
        resized[(x as _, y as _)][2 - c] as f32 - MEAN_BGR[c]
    })
    .into();

    tensor
}

/// Decode the `(1, classes)` softmax output into the top predictions.
fn postproc(labels: &LabelTable, raw_nn_out: NnOut) -> Result<Vec<Prediction>> {
    let Some(output) = raw_nn_out.first() else {
        bail!("model produced no outputs");
    };

    let scores = output.to_array_view::<f32>()?;
    if scores.ndim() != 2 || scores.shape()[0] != 1 {
        bail!("unexpected output shape {:?}", scores.shape());
    }
    let scores = scores.slice(s![0, ..]).to_vec();

    Ok(labels.decode(&scores, TOP_K)?)
}
