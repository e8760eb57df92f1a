mod common;

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use pin_style_trends::pipeline;
use pin_style_trends::{Config, Error, Scraper, Style};

use common::{board, pin_page, serve, serve_fn, Route};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake";

fn config_for(base: &str, dir: &std::path::Path) -> Config {
    Config {
        board_url: format!("{}/krazikhan/fashion/", base),
        max_pins: 5,
        max_polls: 3,
        image_dir: dir.join("images"),
        records_path: dir.join("pins.json"),
        chart_path: dir.join("style-trends.html"),
        ..Config::default()
    }
}

#[tokio::test]
async fn scrape_opens_each_pin_once_and_downloads_images() {
    let dir = tempfile::tempdir().unwrap();

    // the server address is only known after binding, so pin pages use
    // relative image URLs which are resolved against the pin URL
    let mut routes = HashMap::new();
    routes.insert(
        "/krazikhan/fashion/".to_owned(),
        Route::html(board(&["/pin/1/", "/pin/2/?from=board", "/pin/1/", "/pin/3/"])),
    );
    routes.insert(
        "/pin/1/".to_owned(),
        Route::html(pin_page("/img/one.png", "Mon, 14 Mar 2022 18:23:11 +0000")),
    );
    routes.insert(
        "/pin/2/".to_owned(),
        Route::html(pin_page("/img/missing.jpg", "2023-01-02T08:00:00Z")),
    );
    routes.insert("/img/one.png".to_owned(), Route::bytes("image/png", PNG_BYTES));
    let base = serve(routes).await;

    let mut config = config_for(&base, dir.path());
    config.page_source_path = Some(dir.path().join("temp-pin-source.html"));

    let records = pipeline::scrape(&config).await.unwrap();

    // pin 3 is a 404: seen, skipped, not fatal
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].pin_url, format!("{}/pin/1/", base));
    assert_eq!(records[1].pin_url, format!("{}/pin/2/", base));
    assert_eq!(records[0].created_at, NaiveDate::from_ymd_opt(2022, 3, 14));
    assert_eq!(records[1].created_at, NaiveDate::from_ymd_opt(2023, 1, 2));

    let image = dir.path().join("images").join("pin_0.png");
    assert_eq!(records[0].image_path.as_deref(), Some(image.as_path()));
    assert_eq!(fs::read(&image).unwrap(), PNG_BYTES);

    assert_eq!(
        records[1].image_url.as_deref(),
        Some(format!("{}/img/missing.jpg", base).as_str())
    );
    assert_eq!(records[1].image_path, None);

    let source = fs::read_to_string(dir.path().join("temp-pin-source.html")).unwrap();
    assert!(source.contains("created_at"));
}

#[tokio::test]
async fn scrape_stops_at_max_pins() {
    let dir = tempfile::tempdir().unwrap();

    let mut routes = HashMap::new();
    routes.insert(
        "/krazikhan/fashion/".to_owned(),
        Route::html(board(&["/pin/1/", "/pin/2/", "/pin/3/"])),
    );
    for n in 1..=3 {
        routes.insert(
            format!("/pin/{}/", n),
            Route::html(pin_page("/img/x.jpg", "Tue, 01 Feb 2022 10:00:00 +0000")),
        );
    }
    let base = serve(routes).await;

    let mut config = config_for(&base, dir.path());
    config.max_pins = 2;

    let pins = Scraper::new(&config).unwrap().scrape_board().await.unwrap();
    assert_eq!(pins.len(), 2);
    assert!(pins[1].url.ends_with("/pin/2/"));
}

/// Board whose pin links come from `links(hit)`; every `/pin/N/` page exists.
async fn counted_board<F>(links: F) -> (String, Arc<AtomicUsize>)
where
    F: Fn(usize) -> Vec<String> + Send + Sync + 'static,
{
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let base = serve_fn(move |path| {
        if path == "/krazikhan/fashion/" {
            let hit = counter.fetch_add(1, Ordering::SeqCst) + 1;
            let links = links(hit);
            let refs: Vec<&str> = links.iter().map(String::as_str).collect();
            Route::html(board(&refs))
        } else if path.starts_with("/pin/") {
            Route::html(pin_page("/img/x.jpg", "Tue, 01 Feb 2022 10:00:00 +0000"))
        } else {
            Route::not_found()
        }
    })
    .await;
    (base, hits)
}

#[tokio::test]
async fn changing_board_is_polled_up_to_max_polls() {
    let dir = tempfile::tempdir().unwrap();
    let (base, hits) = counted_board(|hit| vec![format!("/pin/{}/", hit)]).await;

    let mut config = config_for(&base, dir.path());
    config.max_pins = 10;
    config.max_polls = 3;

    let pins = Scraper::new(&config).unwrap().scrape_board().await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(pins.len(), 3);
    assert!(pins[2].url.ends_with("/pin/3/"));
}

#[tokio::test]
async fn unchanged_board_stops_after_one_refetch() {
    let dir = tempfile::tempdir().unwrap();
    let (base, hits) = counted_board(|_| vec!["/pin/1/".to_owned()]).await;

    let mut config = config_for(&base, dir.path());
    config.max_pins = 10;
    config.max_polls = 5;

    let pins = Scraper::new(&config).unwrap().scrape_board().await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(pins.len(), 1);
}

#[tokio::test]
async fn later_board_failure_keeps_what_was_found() {
    let dir = tempfile::tempdir().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    // first poll lists a pin that 404s, second poll gets a 500
    let base = serve_fn(move |path| match path {
        "/krazikhan/fashion/" if counter.fetch_add(1, Ordering::SeqCst) == 0 => {
            Route::html(board(&["/pin/gone/"]))
        }
        "/krazikhan/fashion/" => Route::status(500),
        _ => Route::not_found(),
    })
    .await;

    let config = config_for(&base, dir.path());
    let pins = Scraper::new(&config).unwrap().scrape_board().await.unwrap();
    assert!(pins.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unreachable_board_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let base = serve(HashMap::new()).await;
    let config = config_for(&base, dir.path());

    let err = Scraper::new(&config).unwrap().scrape_board().await.unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status, .. } if status.as_u16() == 404));
}

#[cfg(unix)]
mod classification {
    use std::fs;
    use std::path::{Path, PathBuf};

    use pin_style_trends::config::ClassifierConfig;
    use pin_style_trends::pipeline::{self, ClassifySummary};
    use pin_style_trends::{Classifier, PinRecord, Style};

    fn script(dir: &Path, name: &str, body: &str) -> Classifier {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        Classifier::new(&ClassifierConfig {
            program: "sh".to_owned(),
            args: Vec::new(),
            script: path,
        })
    }

    fn record(n: usize, image: Option<PathBuf>, style: Option<Style>) -> PinRecord {
        let mut record = PinRecord::new(format!("https://www.pinterest.ca/pin/{}/", n));
        record.image_path = image;
        record.style = style;
        record
    }

    #[test]
    fn mock_probabilities_label_every_pending_image() {
        let dir = tempfile::tempdir().unwrap();
        let classifier = script(
            dir.path(),
            "mock.sh",
            r#"echo '{"chic style": 0.05, "goth style": 0.85, "kawaii style": 0.05, "vintage style": 0.05}'"#,
        );

        let image = dir.path().join("pin_0.jpg");
        let mut records = vec![
            record(0, Some(image.clone()), None),
            record(1, None, None),
            record(2, Some(image.clone()), Some(Style::Emo)),
        ];

        let summary = pipeline::classify(&classifier, &mut records, false);
        assert_eq!(
            summary,
            ClassifySummary {
                classified: 1,
                failed: 0,
                skipped: 2,
            }
        );
        assert_eq!(records[0].style, Some(Style::Goth));
        assert_eq!(records[1].style, None);
        assert_eq!(records[2].style, Some(Style::Emo));

        let summary = pipeline::classify(&classifier, &mut records, true);
        assert_eq!(summary.classified, 2);
        assert_eq!(records[2].style, Some(Style::Goth));
    }

    #[test]
    fn script_receives_image_path() {
        let dir = tempfile::tempdir().unwrap();
        let classifier = script(
            dir.path(),
            "by-name.sh",
            "case \"$1\" in *punk*) echo 'punk style' ;; *) echo 'chic style' ;; esac",
        );

        let styles: Vec<_> = classifier
            .classify_all(&[dir.path().join("punk_1.jpg"), dir.path().join("pin_2.jpg")])
            .into_iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(styles, [Style::Punk, Style::Chic]);
    }

    #[test]
    fn failing_script_is_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let classifier = script(dir.path(), "broken.sh", "echo 'no model' >&2; exit 3");

        let mut records = vec![record(0, Some(dir.path().join("pin_0.jpg")), None)];
        let summary = pipeline::classify(&classifier, &mut records, false);
        assert_eq!(summary.failed, 1);
        assert_eq!(records[0].style, None);

        let err = classifier.classify(&dir.path().join("pin_0.jpg")).unwrap_err();
        assert!(err.to_string().contains("no model"));
    }
}

#[test]
fn chart_from_records() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for("http://localhost", dir.path());

    let mut goth = pin_style_trends::PinRecord::new("https://www.pinterest.ca/pin/1/");
    goth.created_at = NaiveDate::from_ymd_opt(2022, 3, 14);
    goth.style = Some(Style::Goth);

    let url = pipeline::chart(&config, &[goth]).unwrap();
    assert!(url.starts_with("file://"));

    let html = fs::read_to_string(&config.chart_path).unwrap();
    assert!(html.contains("14 Mar 2022"));
    assert!(html.contains("goth style (100.0%)"));
}
