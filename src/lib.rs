//! Scrape a Pinterest board, label each pin image's style with an external
//! classifier, and chart how the styles trend over time.

pub mod chart;
pub mod classify;
pub mod config;
pub mod download;
pub mod error;
pub mod pipeline;
pub mod records;
pub mod scraper;
pub mod style;
pub mod trends;

pub use classify::Classifier;
pub use config::Config;
pub use error::{Error, Result};
pub use records::{load_records, save_records, write_records_csv, PinRecord};
pub use scraper::{PinPage, Scraper};
pub use style::Style;
pub use trends::{prepare_chart_data, ChartData};
