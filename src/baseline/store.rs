//! On-disk layout of baseline artifacts.
//!
//! For a screenshot named `N` the store keeps up to three files:
//! - `N.png` - the accepted baseline
//! - `N.current.png` - the latest screenshot awaiting review
//! - `N.diff.png` - highlighted differences between the two
//!
//! Status is never stored; it is recomputed from which files exist.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::lock::{self, NameGuard};
use crate::config;
use crate::diff::types::{VisualError, VisualResult};
use crate::diff::{codec, engine, pixelmatch};

const BASELINE_SUFFIX: &str = ".png";
const CURRENT_SUFFIX: &str = ".current.png";
const DIFF_SUFFIX: &str = ".diff.png";

/// Paths of the three artifacts for one screenshot name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub baseline: PathBuf,
    pub current: PathBuf,
    pub diff: PathBuf,
}

/// Review state derived from artifact presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineStatus {
    /// A screenshot awaits review with nothing to diff against
    New,
    /// A screenshot awaits review and a diff image exists
    Diff,
    /// Only the baseline exists
    Approved,
}

impl BaselineStatus {
    /// Classify a name by which of its artifacts exist.
    ///
    /// Returns `None` when the name is not tracked at all. A diff file without a
    /// current screenshot is stale and ignored.
    pub fn from_presence(baseline: bool, current: bool, diff: bool) -> Option<Self> {
        match (baseline, current, diff) {
            (true, true, true) => Some(BaselineStatus::Diff),
            (_, true, _) => Some(BaselineStatus::New),
            (true, false, _) => Some(BaselineStatus::Approved),
            (false, false, _) => None,
        }
    }

    /// Awaiting an approve/reject decision
    pub fn is_pending(&self) -> bool {
        matches!(self, BaselineStatus::New | BaselineStatus::Diff)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BaselineStatus::New => "new",
            BaselineStatus::Diff => "diff",
            BaselineStatus::Approved => "approved",
        }
    }
}

impl std::fmt::Display for BaselineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked screenshot in a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineEntry {
    pub name: String,
    pub status: BaselineStatus,
    /// Recomputed for `Diff` entries; absent when recomputation failed
    pub diff_percentage: Option<f64>,
    pub paths: ArtifactPaths,
}

/// Entries grouped by status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusGroups {
    pub new: Vec<BaselineEntry>,
    pub diff: Vec<BaselineEntry>,
    pub approved: Vec<BaselineEntry>,
}

/// Every tracked name in a baseline directory, in directory order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineListing {
    pub all: Vec<BaselineEntry>,
    pub by_status: StatusGroups,
}

impl BaselineListing {
    fn push(&mut self, entry: BaselineEntry) {
        let group = match entry.status {
            BaselineStatus::New => &mut self.by_status.new,
            BaselineStatus::Diff => &mut self.by_status.diff,
            BaselineStatus::Approved => &mut self.by_status.approved,
        };
        group.push(entry.clone());
        self.all.push(entry);
    }

    /// New entries followed by diff entries
    pub fn pending(&self) -> impl Iterator<Item = &BaselineEntry> {
        self.by_status.new.iter().chain(self.by_status.diff.iter())
    }

    pub fn pending_count(&self) -> usize {
        self.by_status.new.len() + self.by_status.diff.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

/// Artifact storage rooted at one baseline directory
#[derive(Debug, Clone)]
pub struct BaselineStore {
    dir: PathBuf,
    /// Used when recomputing percentages for diff entries
    color_sensitivity: f64,
}

impl Default for BaselineStore {
    fn default() -> Self {
        Self::new(config::baseline_dir())
    }
}

impl BaselineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            color_sensitivity: config::get().color_sensitivity,
        }
    }

    pub fn color_sensitivity(mut self, sensitivity: f64) -> Self {
        self.color_sensitivity = config::clamp_sensitivity(sensitivity);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact paths for `name`. No filesystem access.
    pub fn paths(&self, name: &str) -> VisualResult<ArtifactPaths> {
        validate_name(name)?;
        Ok(ArtifactPaths {
            baseline: self.dir.join(format!("{}{}", name, BASELINE_SUFFIX)),
            current: self.dir.join(format!("{}{}", name, CURRENT_SUFFIX)),
            diff: self.dir.join(format!("{}{}", name, DIFF_SUFFIX)),
        })
    }

    /// Serialize access to `name`'s artifacts until the guard drops
    pub fn lock(&self, name: &str) -> NameGuard {
        lock::acquire(&self.dir.join(format!("{}{}", name, BASELINE_SUFFIX)))
    }

    /// Create the directory if it does not exist yet
    pub fn ensure_dir(&self) -> VisualResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| VisualError::io(&self.dir, e))
    }

    /// Current status of `name`, or `None` if untracked
    pub fn status(&self, name: &str) -> VisualResult<Option<BaselineStatus>> {
        let paths = self.paths(name)?;
        Ok(BaselineStatus::from_presence(
            paths.baseline.is_file(),
            paths.current.is_file(),
            paths.diff.is_file(),
        ))
    }

    /// Recomputed difference percentage for a name in `Diff` status
    pub fn diff_percentage(&self, name: &str) -> VisualResult<Option<f64>> {
        let paths = self.paths(name)?;
        if self.status(name)? != Some(BaselineStatus::Diff) {
            return Ok(None);
        }
        Ok(recompute_percentage(name, &paths, self.color_sensitivity))
    }

    /// Enumerate every tracked name and classify it.
    ///
    /// `Diff` entries get their percentage recomputed; a recomputation failure
    /// leaves the percentage empty instead of failing the listing.
    pub fn list(&self) -> VisualResult<BaselineListing> {
        let mut listing = BaselineListing::default();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(listing),
            Err(e) => return Err(VisualError::io(&self.dir, e)),
        };

        let mut names = Vec::new();
        let mut seen = HashSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| VisualError::io(&self.dir, e))?;
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            let Some(name) = artifact_name(file_name) else {
                continue;
            };
            if validate_name(name).is_ok() && seen.insert(name.to_string()) {
                names.push(name.to_string());
            }
        }

        for name in names {
            let paths = self.paths(&name)?;
            let Some(status) = BaselineStatus::from_presence(
                paths.baseline.is_file(),
                paths.current.is_file(),
                paths.diff.is_file(),
            ) else {
                continue;
            };
            let diff_percentage = if status == BaselineStatus::Diff {
                recompute_percentage(&name, &paths, self.color_sensitivity)
            } else {
                None
            };
            listing.push(BaselineEntry {
                name,
                status,
                diff_percentage,
                paths,
            });
        }

        Ok(listing)
    }

    pub(crate) fn read(&self, path: &Path) -> VisualResult<Vec<u8>> {
        fs::read(path).map_err(|e| VisualError::io(path, e))
    }

    pub(crate) fn write(&self, path: &Path, bytes: &[u8]) -> VisualResult<()> {
        fs::write(path, bytes).map_err(|e| VisualError::io(path, e))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Wrote artifact");
        Ok(())
    }

    pub(crate) fn copy(&self, from: &Path, to: &Path) -> VisualResult<()> {
        fs::copy(from, to).map_err(|e| VisualError::io(to, e))?;
        Ok(())
    }

    /// Delete `path` if present; returns whether a file was removed
    pub(crate) fn remove(&self, path: &Path) -> VisualResult<bool> {
        match fs::remove_file(path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed artifact");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VisualError::io(path, e)),
        }
    }
}

/// Screenshot name an artifact file belongs to
fn artifact_name(file_name: &str) -> Option<&str> {
    if let Some(name) = file_name.strip_suffix(CURRENT_SUFFIX) {
        Some(name)
    } else if let Some(name) = file_name.strip_suffix(DIFF_SUFFIX) {
        Some(name)
    } else {
        file_name.strip_suffix(BASELINE_SUFFIX)
    }
}

/// Reject names that would escape the directory or alias another name's artifacts
fn validate_name(name: &str) -> VisualResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || name.ends_with(".current")
        || name.ends_with(".diff");
    if invalid {
        return Err(VisualError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn recompute_percentage(name: &str, paths: &ArtifactPaths, color_sensitivity: f64) -> Option<f64> {
    let load = |path: &Path| {
        fs::read(path)
            .map_err(|e| VisualError::io(path, e))
            .and_then(|bytes| codec::decode(&bytes))
    };
    let (baseline, current) = match (load(&paths.baseline), load(&paths.current)) {
        (Ok(b), Ok(c)) => (b, c),
        (Err(e), _) | (_, Err(e)) => {
            warn!(screenshot = name, error = %e, "Could not recompute diff percentage");
            return None;
        }
    };
    if baseline.dimensions() != current.dimensions() {
        return None;
    }
    match pixelmatch::count_different(&baseline, &current, color_sensitivity) {
        Ok(diff_pixels) => Some(engine::diff_percentage(diff_pixels, baseline.dimensions())),
        Err(e) => {
            warn!(screenshot = name, error = %e, "Could not recompute diff percentage");
            None
        }
    }
}
