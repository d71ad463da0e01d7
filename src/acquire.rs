// src/acquire.rs

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::error::FetchError;
use crate::fetch::{file_name, Fetch};
use crate::process::Dataset;

/// Everything one download run needs.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub data_dir: PathBuf,
    pub locators: Vec<String>,
}

#[derive(Debug)]
pub enum Failure {
    /// Transport error, timeout, or non-2xx status.
    Network(FetchError),
    /// Bad locator, undecodable payload, or a failed write.
    Unexpected(anyhow::Error),
}

#[derive(Debug)]
pub enum Outcome {
    Saved { path: PathBuf, rows: u64 },
    SkippedEmpty,
    Failed(Failure),
}

/// What happened to each locator, in order, plus the accumulated row total.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<(String, Outcome)>,
    pub total_rows: u64,
}

impl RunReport {
    fn record(&mut self, url: String, outcome: Outcome) {
        if let Outcome::Saved { rows, .. } = &outcome {
            self.total_rows += rows;
        }
        self.outcomes.push((url, outcome));
    }

    pub fn saved(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Saved { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::SkippedEmpty))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Fetch every locator in turn, writing each month under `ctx.data_dir`.
///
/// Only failing to create the output directory is an error; anything that
/// goes wrong with a single locator ends up in the report.
#[instrument(level = "info", skip_all, fields(dir = %ctx.data_dir.display(), months = ctx.locators.len()))]
pub async fn download_all<F: Fetch>(ctx: &RunContext, fetcher: &F) -> Result<RunReport> {
    fs::create_dir_all(&ctx.data_dir)
        .with_context(|| format!("creating data directory {}", ctx.data_dir.display()))?;

    let mut report = RunReport::default();
    for url in &ctx.locators {
        let outcome = fetch_one(&ctx.data_dir, url, fetcher).await;
        match &outcome {
            Outcome::Saved { path, rows } => {
                info!(path = %path.display(), rows, "saved");
            }
            Outcome::SkippedEmpty => {
                warn!(url = %url, "empty or unavailable, skipping");
            }
            Outcome::Failed(Failure::Network(e)) => {
                error!(url = %url, error = %e, "network error");
            }
            Outcome::Failed(Failure::Unexpected(e)) => {
                error!(url = %url, error = ?e, "unexpected error");
            }
        }
        report.record(url.clone(), outcome);
    }

    info!(
        saved = report.saved(),
        skipped = report.skipped(),
        failed = report.failed(),
        total_rows = report.total_rows,
        "download finished"
    );
    Ok(report)
}

async fn fetch_one<F: Fetch>(data_dir: &Path, url: &str, fetcher: &F) -> Outcome {
    let name = match file_name(url) {
        Ok(name) => name,
        Err(e) => return Outcome::Failed(Failure::Unexpected(e)),
    };
    let dest = data_dir.join(&name);
    info!(name = %name, "downloading");
    let start = Instant::now();

    let payload = match fetcher.fetch(url).await {
        Ok(payload) => payload,
        Err(e) => return Outcome::Failed(Failure::Network(e)),
    };
    if payload.declared_len() == 0 {
        return Outcome::SkippedEmpty;
    }
    info!(name = %name, bytes = payload.body.len(), elapsed = ?start.elapsed(), "downloaded");

    // decode + write are CPU and disk bound
    let target = dest.clone();
    let persisted = tokio::task::spawn_blocking(move || -> Result<u64> {
        let dataset = Dataset::decode(payload.into_body()?)?;
        dataset.persist(&target)?;
        Ok(dataset.num_rows() as u64)
    })
    .await;

    match persisted {
        Ok(Ok(rows)) => Outcome::Saved { path: dest, rows },
        Ok(Err(e)) => Outcome::Failed(Failure::Unexpected(
            e.context(format!("processing {}", name)),
        )),
        Err(join) => Outcome::Failed(Failure::Unexpected(
            anyhow::Error::new(join).context(format!("processing {}", name)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{monthly_urls, Payload, UrlTemplate};
    use crate::process::tests::trips_parquet;
    use bytes::Bytes;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[derive(Clone)]
    enum Canned {
        Rows(usize),
        Empty,
        Garbage,
        Down,
        Status(u16),
    }

    /// Serves canned responses keyed by locator.
    struct FakeFetcher(HashMap<String, Canned>);

    impl FakeFetcher {
        fn new(urls: &[String], responses: &[Canned]) -> Self {
            Self(urls.iter().cloned().zip(responses.iter().cloned()).collect())
        }
    }

    impl Fetch for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<Payload, FetchError> {
            let body = match self.0.get(url) {
                Some(Canned::Rows(n)) => trips_parquet(*n),
                Some(Canned::Empty) => Bytes::new(),
                Some(Canned::Garbage) => Bytes::from_static(b"<html>gone</html>"),
                Some(Canned::Down) | None => {
                    return Err(FetchError::Transport("connection refused".into()))
                }
                Some(Canned::Status(code)) => return Err(FetchError::Status(*code)),
            };
            Ok(Payload {
                content_length: Some(body.len() as u64),
                gzipped: false,
                body,
            })
        }
    }

    fn urls(start: &str, count: usize) -> Vec<String> {
        monthly_urls(&UrlTemplate::default(), start, count).unwrap()
    }

    fn parquet_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".parquet"))
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn saves_two_and_skips_empty_third() {
        let tmp = tempdir().unwrap();
        let data_dir = tmp.path().join("data");
        let locators = urls("2024-01", 3);
        let fetcher = FakeFetcher::new(
            &locators,
            &[Canned::Rows(100), Canned::Rows(200), Canned::Empty],
        );
        let ctx = RunContext {
            data_dir: data_dir.clone(),
            locators,
        };

        let report = download_all(&ctx, &fetcher).await.unwrap();

        assert_eq!(report.total_rows, 300);
        assert_eq!((report.saved(), report.skipped(), report.failed()), (2, 1, 0));
        assert_eq!(
            parquet_files(&data_dir),
            [
                "yellow_tripdata_2024-01.parquet",
                "yellow_tripdata_2024-02.parquet"
            ]
        );
    }

    #[tokio::test]
    async fn transport_error_does_not_stop_the_run() {
        let tmp = tempdir().unwrap();
        let locators = urls("2023-11", 4);
        let fetcher = FakeFetcher::new(
            &locators,
            &[
                Canned::Rows(5),
                Canned::Down,
                Canned::Status(404),
                Canned::Rows(7),
            ],
        );
        let ctx = RunContext {
            data_dir: tmp.path().to_path_buf(),
            locators,
        };

        let report = download_all(&ctx, &fetcher).await.unwrap();

        assert_eq!(report.total_rows, 12);
        assert_eq!(report.failed(), 2);
        assert!(matches!(
            report.outcomes[1].1,
            Outcome::Failed(Failure::Network(FetchError::Transport(_)))
        ));
        assert!(matches!(
            report.outcomes[2].1,
            Outcome::Failed(Failure::Network(FetchError::Status(404)))
        ));
        assert_eq!(
            parquet_files(tmp.path()),
            [
                "yellow_tripdata_2023-11.parquet",
                "yellow_tripdata_2024-02.parquet"
            ]
        );
    }

    #[tokio::test]
    async fn undecodable_payload_is_unexpected_and_writes_nothing() {
        let tmp = tempdir().unwrap();
        let locators = urls("2024-05", 2);
        let fetcher = FakeFetcher::new(&locators, &[Canned::Garbage, Canned::Rows(3)]);
        let ctx = RunContext {
            data_dir: tmp.path().to_path_buf(),
            locators,
        };

        let report = download_all(&ctx, &fetcher).await.unwrap();

        assert!(matches!(
            report.outcomes[0].1,
            Outcome::Failed(Failure::Unexpected(_))
        ));
        assert_eq!(report.total_rows, 3);
        assert_eq!(parquet_files(tmp.path()), ["yellow_tripdata_2024-06.parquet"]);
    }

    #[tokio::test]
    async fn every_locator_failing_still_reports() {
        let tmp = tempdir().unwrap();
        let locators = urls("2024-01", 3);
        let fetcher = FakeFetcher::new(&locators, &[Canned::Down, Canned::Down, Canned::Down]);
        let ctx = RunContext {
            data_dir: tmp.path().join("data"),
            locators,
        };

        let report = download_all(&ctx, &fetcher).await.unwrap();

        assert_eq!(report.total_rows, 0);
        assert_eq!(report.failed(), 3);
        assert!(parquet_files(&ctx.data_dir).is_empty());
    }

    #[tokio::test]
    async fn rerun_overwrites_with_identical_results() {
        let tmp = tempdir().unwrap();
        let locators = urls("2024-01", 2);
        let fetcher = FakeFetcher::new(&locators, &[Canned::Rows(50), Canned::Rows(60)]);
        let ctx = RunContext {
            data_dir: tmp.path().to_path_buf(),
            locators,
        };

        let first = download_all(&ctx, &fetcher).await.unwrap();
        let snapshot: Vec<Vec<u8>> = parquet_files(tmp.path())
            .iter()
            .map(|n| fs::read(tmp.path().join(n)).unwrap())
            .collect();

        let second = download_all(&ctx, &fetcher).await.unwrap();
        let again: Vec<Vec<u8>> = parquet_files(tmp.path())
            .iter()
            .map(|n| fs::read(tmp.path().join(n)).unwrap())
            .collect();

        assert_eq!(first.total_rows, 110);
        assert_eq!(second.total_rows, first.total_rows);
        assert_eq!(snapshot, again);
    }

    #[tokio::test]
    async fn unwritable_data_dir_is_fatal() {
        let tmp = tempdir().unwrap();
        let blocker = tmp.path().join("data");
        fs::write(&blocker, b"not a directory").unwrap();
        let ctx = RunContext {
            data_dir: blocker,
            locators: urls("2024-01", 1),
        };
        let fetcher = FakeFetcher::new(&ctx.locators, &[Canned::Rows(1)]);

        assert!(download_all(&ctx, &fetcher).await.is_err());
    }
}
