use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use tracing::{info, warn};
use url::Url;

use crate::error::{Error, Result};

const KNOWN_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadJob {
    pub url: String,
    pub path: PathBuf,
}

/// `{prefix}_{counter}.{ext}`, taking the extension from the URL path when it
/// is a known image type and `jpg` otherwise.
pub fn image_file_name(prefix: &str, counter: usize, url: &str) -> String {
    let ext = Url::parse(url)
        .ok()
        .and_then(|u| {
            Path::new(u.path())
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
        })
        .filter(|e| KNOWN_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or_else(|| "jpg".to_owned());

    format!("{}_{}.{}", prefix, counter, ext)
}

pub async fn download_image(client: &Client, url: &str, path: &Path) -> Result<PathBuf> {
    let response = client.get(url).send().await?;

    // 204/206 and friends carry no complete image
    if response.status() != StatusCode::OK {
        return Err(Error::HttpStatus {
            url: url.to_owned(),
            status: response.status(),
        });
    }

    let bytes = response.bytes().await?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &bytes).await?;

    info!(path = %path.display(), bytes = bytes.len(), "Image downloaded");
    Ok(path.to_path_buf())
}

/// Runs every job with at most `concurrency` requests in flight. Results come
/// back in job order.
pub async fn download_all(
    client: &Client,
    jobs: &[DownloadJob],
    concurrency: usize,
) -> Vec<Result<PathBuf>> {
    let mut results: Vec<(usize, Result<PathBuf>)> = stream::iter(jobs.iter().enumerate())
        .map(|(i, job)| async move {
            let result = download_image(client, &job.url, &job.path).await;
            if let Err(err) = &result {
                warn!(url = %job.url, error = %err, "Unable to download image");
            }
            (i, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    results.sort_by_key(|(i, _)| *i);
    results.into_iter().map(|(_, r)| r).collect()
}
