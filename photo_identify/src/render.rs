//! HTML page with the upload form and, after a successful upload, the predictions.
//!
use common::Prediction;

use crate::{
    form::{IMAGE_FIELD, IMG_DATA_FIELD},
    PREDICT_PATH,
};

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Photo Identify</title>
    <style>
        body { font-family: sans-serif; margin: 2em auto; max-width: 40em; }
        #preview { max-width: 100%; max-height: 24em; margin: 1em 0; }
        table.predictions td { padding: 0.2em 1em; }
    </style>
</head>
<body>
<div class="container">
    <h3>Photo Identify</h3>
"#;

const TAIL: &str = r#"</div>
<script>
    document.getElementById("id_image").addEventListener("change", function (event) {
        const file = event.target.files[0];
        if (!file) {
            return;
        }
        // The server echoes the upload itself, the hidden field stays empty
        const preview = document.getElementById("preview");
        preview.src = URL.createObjectURL(file);
        preview.hidden = false;
    });
</script>
</body>
</html>
"#;

/// Page shown for GET requests and rejected uploads.
pub fn blank_page() -> String {
    page(None, None)
}

/// Page with the predictions for an upload, redisplaying the uploaded image.
pub fn result_page(predictions: &[Prediction], img_data: &str) -> String {
    page(Some(predictions), Some(img_data))
}

fn page(predictions: Option<&[Prediction]>, img_data: Option<&str>) -> String {
    let mut html = String::from(HEAD);

    html.push_str(&upload_form());

    match img_data {
        Some(img_data) => {
            html.push_str(&format!(
                "    <img id=\"preview\" src=\"{}\" alt=\"uploaded image\">\n",
                escape_html(img_data)
            ));
        }
        None => html.push_str("    <img id=\"preview\" alt=\"uploaded image\" hidden>\n"),
    }

    if let Some(predictions) = predictions {
        html.push_str(&predictions_table(predictions));
    }

    html.push_str(TAIL);
    html
}

fn upload_form() -> String {
    format!(
        r#"    <form action="{PREDICT_PATH}" method="post" enctype="multipart/form-data">
        <input type="file" name="{IMAGE_FIELD}" id="id_image" accept="image/*" required>
        <input type="hidden" name="{IMG_DATA_FIELD}" id="id_img_data">
        <button type="submit">Identify</button>
    </form>
"#
    )
}

fn predictions_table(predictions: &[Prediction]) -> String {
    let mut table = String::from("    <table class=\"predictions\">\n");
    for (rank, prediction) in predictions.iter().enumerate() {
        table.push_str(&format!(
            "        <tr data-label=\"{label}\" data-confidence=\"{confidence:.6}\"><td>{rank}</td><td>{name}</td><td>{percent:.2}%</td></tr>\n",
            label = escape_html(&prediction.label),
            confidence = prediction.confidence,
            rank = rank + 1,
            name = escape_html(&prediction.label.replace('_', " ")),
            percent = prediction.confidence * 100.0,
        ));
    }
    table.push_str("    </table>\n");
    table
}

/// Escape text for use in element content and quoted attribute values.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
