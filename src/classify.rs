use std::path::{Path, PathBuf};
use std::process::Command;

use rayon::prelude::*;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::error::{Error, Result};
use crate::style::Style;

/// External image classifier, invoked as `program [args..] script <image>`.
///
/// The script prints either a bare style label or a JSON object mapping
/// labels to probabilities.
#[derive(Debug, Clone)]
pub struct Classifier {
    program: String,
    args: Vec<String>,
    script: PathBuf,
}

impl Classifier {
    pub fn new(config: &ClassifierConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            script: config.script.clone(),
        }
    }

    pub fn classify(&self, image: &Path) -> Result<Style> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&self.script)
            .arg(image)
            .output()?;

        if !output.status.success() {
            return Err(Error::ClassifierFailed {
                image: image.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let style = parse_output(&stdout)?;
        debug!(image = %image.display(), %style, "Classified image");
        Ok(style)
    }

    /// Classifies images in parallel; results line up with `images`.
    pub fn classify_all(&self, images: &[PathBuf]) -> Vec<Result<Style>> {
        images
            .par_iter()
            .map(|image| {
                let result = self.classify(image);
                if let Err(err) = &result {
                    warn!(image = %image.display(), error = %err, "Classification failed");
                }
                result
            })
            .collect()
    }
}

pub fn parse_output(stdout: &str) -> Result<Style> {
    let text = stdout.trim();
    if text.starts_with('{') {
        let scores: Map<String, Value> = serde_json::from_str(text)?;
        return dominant_style(&scores).ok_or_else(|| Error::UnknownStyle(text.to_owned()));
    }
    // a script may print progress first; the label is the last line
    let label = text.lines().last().unwrap_or_default();
    label.parse()
}

/// Highest-scoring known style; ties go to the earlier style.
fn dominant_style(scores: &Map<String, Value>) -> Option<Style> {
    let mut best: Option<(Style, f64)> = None;
    for style in Style::ALL {
        let score = scores
            .iter()
            .find(|(label, _)| label.trim().eq_ignore_ascii_case(style.label()))
            .and_then(|(_, v)| v.as_f64());
        if let Some(score) = score {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((style, score));
            }
        }
    }
    best.map(|(style, _)| style)
}
