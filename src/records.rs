use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::Writer;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::style::Style;

/// Day-precision format used for `createdAt`, e.g. `14 Mar 2022`.
pub const DATE_FORMAT: &str = "%d %b %Y";

/// One scraped pin and what is known about it so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRecord {
    pub pin_url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
    #[serde(default, with = "created_at")]
    pub created_at: Option<NaiveDate>,
    #[serde(default)]
    pub style: Option<Style>,
}

impl PinRecord {
    pub fn new(pin_url: impl Into<String>) -> Self {
        Self {
            pin_url: pin_url.into(),
            image_url: None,
            image_path: None,
            created_at: None,
            style: None,
        }
    }

    pub fn created_at_label(&self) -> Option<String> {
        self.created_at.map(|d| d.format(DATE_FORMAT).to_string())
    }
}

mod created_at {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(d) => s.serialize_str(&d.format(DATE_FORMAT).to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}

pub fn load_records(path: &Path) -> Result<Vec<PinRecord>> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn save_records(path: &Path, records: &[PinRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn write_records_csv(path: &Path, records: &[PinRecord]) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(["Pin URL", "Image URL", "Image Path", "Created At", "Style"])?;

    for record in records {
        let image_path = record
            .image_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let created_at = record.created_at_label().unwrap_or_default();

        writer.write_record([
            record.pin_url.as_str(),
            record.image_url.as_deref().unwrap_or_default(),
            image_path.as_str(),
            created_at.as_str(),
            record.style.map(Style::label).unwrap_or_default(),
        ])?;
    }

    writer.flush()?;

    Ok(())
}
