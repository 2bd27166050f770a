//! Comparing many screenshots at once.
//!
//! Each comparison runs on tokio's blocking pool. Names are independent, and
//! repeated names are serialized by the per-name lock inside the engine.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::diff::engine::{CompareOptions, run_comparison};
use crate::diff::types::{ComparisonResult, VisualError, VisualResult};

/// A screenshot file queued for comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenshotFile {
    /// Screenshot name (file stem)
    pub name: String,
    pub path: PathBuf,
}

/// Every `*.png` directly inside `dir`, sorted by name.
///
/// Review artifacts (`*.current.png`, `*.diff.png`) are skipped so a baseline
/// directory can't be fed back into itself by accident.
pub fn collect_screenshots(dir: &Path) -> VisualResult<Vec<ScreenshotFile>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| VisualError::io(dir, e))? {
        let entry = entry.map_err(|e| VisualError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().map(|e| e != "png").unwrap_or(true) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if name.ends_with(".current") || name.ends_with(".diff") {
            continue;
        }
        files.push(ScreenshotFile {
            name: name.to_string(),
            path: path.clone(),
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Compare every file against its baseline, at most `concurrency` at a time.
///
/// Results come back in input order, one per file.
pub async fn compare_files(
    files: Vec<ScreenshotFile>,
    options: CompareOptions,
    concurrency: usize,
) -> Vec<(String, VisualResult<ComparisonResult>)> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let options = Arc::new(options);

    let mut handles = Vec::with_capacity(files.len());
    for file in files {
        let permits = Arc::clone(&permits);
        let options = Arc::clone(&options);
        let name = file.name.clone();
        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            tokio::task::spawn_blocking(move || {
                let bytes = fs::read(&file.path).map_err(|e| VisualError::io(&file.path, e))?;
                debug!(screenshot = file.name.as_str(), path = %file.path.display(), "Comparing");
                run_comparison(&file.name, &bytes, &options)
            })
            .await
        });
        handles.push((name, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (name, handle) in handles {
        let result = match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) | Err(join_err) => {
                warn!(screenshot = name.as_str(), error = %join_err, "Comparison task failed");
                Err(VisualError::io(
                    PathBuf::from(&name),
                    std::io::Error::other(join_err.to_string()),
                ))
            }
        };
        results.push((name, result));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::codec::{PixelGrid, encode};
    use crate::diff::types::ComparisonStatus;

    fn write_png(path: &Path, color: [u8; 4]) {
        fs::write(path, encode(&PixelGrid::with_color(8, 8, color)).unwrap()).unwrap();
    }

    #[test]
    fn test_collect_skips_review_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("b.png"), [0, 0, 0, 255]);
        write_png(&dir.path().join("a.png"), [0, 0, 0, 255]);
        write_png(&dir.path().join("a.current.png"), [0, 0, 0, 255]);
        write_png(&dir.path().join("a.diff.png"), [0, 0, 0, 255]);
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let files = collect_screenshots(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_compare_files_seeds_then_passes() {
        let shots = tempfile::tempdir().unwrap();
        let baselines = tempfile::tempdir().unwrap();
        for name in ["one", "two", "three"] {
            write_png(&shots.path().join(format!("{}.png", name)), [10, 20, 30, 255]);
        }
        let options = CompareOptions::new(baselines.path());

        let files = collect_screenshots(shots.path()).unwrap();
        let first = compare_files(files.clone(), options.clone(), 2).await;
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|(_, r)| r.as_ref().unwrap().status == ComparisonStatus::New));

        let second = compare_files(files, options, 2).await;
        assert!(second.iter().all(|(_, r)| r.as_ref().unwrap().status == ComparisonStatus::Passed));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let baselines = tempfile::tempdir().unwrap();
        let files = vec![ScreenshotFile {
            name: "gone".to_string(),
            path: baselines.path().join("does-not-exist.png"),
        }];
        let results = compare_files(files, CompareOptions::new(baselines.path()), 1).await;
        assert!(matches!(results[0].1, Err(VisualError::Io { .. })));
    }
}
