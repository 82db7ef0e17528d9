//! Utility functions
//!
use std::{
    fs::{self, File},
    io::Cursor,
    path::Path,
};

use anyhow::{Context, Result};
use reqwest::Client;

/// Download a file from a URL to a given filepath.
pub async fn download_file(
    client: &Client,
    url: &str,
    filepath: impl AsRef<std::path::Path>,
) -> Result<()> {
    let resp = client.get(url).send().await?.error_for_status()?;

    let mut file = File::create(filepath)?;
    let mut content = Cursor::new(resp.bytes().await?);
    std::io::copy(&mut content, &mut file)?;

    Ok(())
}

/// Download `url` to `filepath` unless the file already exists.
pub async fn ensure_file(client: &Client, url: &str, filepath: &Path) -> Result<()> {
    if filepath.exists() {
        return Ok(());
    }

    if let Some(parent) = filepath.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    log::info!("Downloading {} to {}", url, filepath.display());
    // The target only appears once the download is complete
    let partial = filepath.with_extension("part");
    download_file(client, url, &partial)
        .await
        .with_context(|| format!("failed to download {url}"))?;
    fs::rename(&partial, filepath)?;

    Ok(())
}
