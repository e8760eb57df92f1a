//! The scrape → classify → chart steps, each usable on its own.

use tracing::{info, warn};

use crate::chart::write_chart;
use crate::classify::Classifier;
use crate::config::Config;
use crate::download::{download_all, image_file_name, DownloadJob};
use crate::error::Result;
use crate::records::PinRecord;
use crate::scraper::Scraper;
use crate::trends::prepare_chart_data;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClassifySummary {
    pub classified: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Scrapes the configured board and downloads each pin's image.
///
/// Every opened pin yields a record, including pins whose image could not be
/// found or downloaded (their `image_path` stays empty).
pub async fn scrape(config: &Config) -> Result<Vec<PinRecord>> {
    let scraper = Scraper::new(config)?;
    let pins = scraper.scrape_board().await?;

    let mut records: Vec<PinRecord> = pins
        .into_iter()
        .map(|pin| PinRecord {
            pin_url: pin.url,
            image_url: pin.image_url,
            image_path: None,
            created_at: pin.created_at,
            style: None,
        })
        .collect();

    let (indices, jobs): (Vec<usize>, Vec<DownloadJob>) = records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| {
            let url = record.image_url.as_ref()?;
            let name = image_file_name(&config.image_prefix, i, url);
            Some((
                i,
                DownloadJob {
                    url: url.clone(),
                    path: config.image_dir.join(name),
                },
            ))
        })
        .unzip();

    if jobs.len() < records.len() {
        warn!(
            missing = records.len() - jobs.len(),
            "Some pins had no image to download"
        );
    }

    let results = download_all(scraper.client(), &jobs, config.download_concurrency).await;
    let mut downloaded = 0;
    for (i, result) in indices.into_iter().zip(results) {
        if let Ok(path) = result {
            records[i].image_path = Some(path);
            downloaded += 1;
        }
    }

    info!(pins = records.len(), downloaded, "Scrape finished");
    Ok(records)
}

/// Labels records that have a downloaded image. Records that already carry a
/// style are left alone unless `force` is set.
pub fn classify(classifier: &Classifier, records: &mut [PinRecord], force: bool) -> ClassifySummary {
    let mut summary = ClassifySummary::default();

    let (indices, paths): (Vec<usize>, Vec<_>) = records
        .iter()
        .enumerate()
        .filter_map(|(i, record)| {
            if record.style.is_some() && !force {
                return None;
            }
            record.image_path.clone().map(|path| (i, path))
        })
        .unzip();
    summary.skipped = records.len() - indices.len();

    for (i, result) in indices.into_iter().zip(classifier.classify_all(&paths)) {
        match result {
            Ok(style) => {
                records[i].style = Some(style);
                summary.classified += 1;
            }
            Err(_) => summary.failed += 1,
        }
    }

    info!(
        classified = summary.classified,
        failed = summary.failed,
        skipped = summary.skipped,
        "Classification finished"
    );
    summary
}

/// Aggregates the records and writes the chart; returns its `file://` URL.
pub fn chart(config: &Config, records: &[PinRecord]) -> Result<String> {
    let data = prepare_chart_data(records);
    if data.is_empty() {
        warn!("No dated pins, chart will be empty");
    }
    write_chart(&config.chart_path, &data)
}
