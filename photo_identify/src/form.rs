//! Upload form with a single required image field.
//!
use std::io::Cursor;

use axum::extract::Multipart;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use thiserror::Error;

/// Name of the file input.
pub const IMAGE_FIELD: &str = "image";
/// Name of the hidden input holding the browser-side data URL of the selected image.
pub const IMG_DATA_FIELD: &str = "img_data";

/// Reasons for rejecting a submission.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("no image was submitted")]
    Missing,

    #[error("the submitted file is empty")]
    Empty,

    #[error("the submitted file is not a valid image: {0}")]
    NotAnImage(#[from] image::ImageError),
}

/// A file part of the multipart body.
#[derive(Debug)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Bytes,
}

/// Submitted form data, not yet validated.
#[derive(Debug, Default)]
pub struct ImageUploadForm {
    image: Option<UploadedImage>,
    img_data: Option<String>,
}

/// An upload which decoded successfully.
#[derive(Debug)]
pub struct ValidImage {
    pub bytes: Bytes,
    pub image: DynamicImage,
    img_data: Option<String>,
}

impl ImageUploadForm {
    /// The unbound form.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(image: Option<UploadedImage>, img_data: Option<String>) -> Self {
        Self { image, img_data }
    }

    /// Collect the form fields of a multipart body.
    ///
    /// A body which breaks off early keeps the fields read until then.
    pub async fn from_multipart(mut multipart: Multipart) -> Self {
        let mut form = Self::empty();

        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    log::debug!("Malformed multipart body: {}", e);
                    break;
                }
            };

            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                // Only file parts count as uploads
                Some(IMAGE_FIELD) => {
                    let Some(file_name) = field.file_name().map(str::to_owned) else {
                        continue;
                    };
                    match field.bytes().await {
                        Ok(bytes) => form.image = Some(UploadedImage { file_name, bytes }),
                        Err(e) => {
                            log::debug!("Failed to read upload {}: {}", file_name, e);
                            break;
                        }
                    }
                }
                Some(IMG_DATA_FIELD) => form.img_data = field.text().await.ok(),
                _ => (),
            }
        }

        form
    }

    /// Check that a non-empty, decodable image was submitted.
    pub fn validate(self) -> Result<ValidImage, FormError> {
        let upload = self.image.ok_or(FormError::Missing)?;
        if upload.file_name.is_empty() && upload.bytes.is_empty() {
            // What browsers send for an untouched file input
            return Err(FormError::Missing);
        }
        if upload.bytes.is_empty() {
            return Err(FormError::Empty);
        }

        let image = image::load_from_memory(&upload.bytes)?;
        log::debug!(
            "Accepted {} ({}x{}, {} bytes)",
            upload.file_name,
            image.width(),
            image.height(),
            upload.bytes.len()
        );

        Ok(ValidImage {
            bytes: upload.bytes,
            image,
            img_data: self.img_data,
        })
    }
}

impl ValidImage {
    /// Data URL to redisplay the upload.
    ///
    /// Uses the value of the hidden field when it holds an image data URL. Otherwise the uploaded
    /// bytes are embedded as they are if browsers can show the format, else re-encoded as PNG.
    pub fn display_url(&self) -> String {
        if let Some(img_data) = &self.img_data {
            if img_data.starts_with("data:image/") {
                return img_data.clone();
            }
        }

        if let Some(mime) = image::guess_format(&self.bytes)
            .ok()
            .and_then(browser_mime_type)
        {
            return data_url(mime, &self.bytes);
        }

        let mut buf = Cursor::new(Vec::new());
        match self.image.write_to(&mut buf, ImageOutputFormat::Png) {
            Ok(()) => data_url("image/png", buf.get_ref()),
            Err(e) => {
                log::warn!("Failed to re-encode upload for display: {}", e);
                data_url("application/octet-stream", &self.bytes)
            }
        }
    }
}

fn data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// MIME type of formats browsers render in an `<img>` tag.
fn browser_mime_type(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Ico => Some("image/x-icon"),
        ImageFormat::Avif => Some("image/avif"),
        _ => None,
    }
}
