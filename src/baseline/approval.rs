//! Approve/reject transitions for pending screenshots.
//!
//! ```text
//! new  --approve--> approved   (current becomes the baseline)
//! diff --approve--> approved   (current becomes the baseline, diff discarded)
//! diff --reject---> approved   (current and diff discarded, baseline kept)
//! new  --reject---> approved   (current discarded)
//! ```
//!
//! Nothing-to-do cases are outcomes, not errors, so scripts can re-run safely.

use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Stderr, StdinLock, Stdout, Write};

use tracing::{info, warn};

use super::store::{BaselineStatus, BaselineStore};
use crate::diff::types::VisualResult;

/// Result of approving one name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApprovalOutcome {
    /// The pending screenshot is now the baseline
    Approved {
        name: String,
        prior: BaselineStatus,
        diff_percentage: Option<f64>,
    },
    /// Baseline exists and nothing is pending
    AlreadyApproved { name: String },
    /// No artifacts for this name
    NotFound { name: String },
}

impl ApprovalOutcome {
    pub fn name(&self) -> &str {
        match self {
            ApprovalOutcome::Approved { name, .. }
            | ApprovalOutcome::AlreadyApproved { name }
            | ApprovalOutcome::NotFound { name } => name,
        }
    }

    /// Status before the operation
    pub fn prior_status(&self) -> Option<BaselineStatus> {
        match self {
            ApprovalOutcome::Approved { prior, .. } => Some(*prior),
            ApprovalOutcome::AlreadyApproved { .. } => Some(BaselineStatus::Approved),
            ApprovalOutcome::NotFound { .. } => None,
        }
    }

    /// Status after the operation
    pub fn new_status(&self) -> Option<BaselineStatus> {
        match self {
            ApprovalOutcome::NotFound { .. } => None,
            _ => Some(BaselineStatus::Approved),
        }
    }

    /// Whether the name ends up approved
    pub fn succeeded(&self) -> bool {
        !matches!(self, ApprovalOutcome::NotFound { .. })
    }
}

/// Result of rejecting one name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RejectOutcome {
    /// Pending artifacts were discarded
    Rejected {
        name: String,
        prior: BaselineStatus,
        /// `None` when no baseline was left behind
        new_status: Option<BaselineStatus>,
    },
    /// Nothing pending for this name
    NothingToReject {
        name: String,
        status: Option<BaselineStatus>,
    },
}

impl RejectOutcome {
    pub fn name(&self) -> &str {
        match self {
            RejectOutcome::Rejected { name, .. } | RejectOutcome::NothingToReject { name, .. } => {
                name
            }
        }
    }
}

/// Per-name failure inside a bulk approval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalFailure {
    pub name: String,
    pub error: String,
}

/// Summary of a confirmed bulk approval
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkReport {
    /// Names the batch tried to approve
    pub attempted: usize,
    /// Names that ended up approved
    pub approved: usize,
    pub outcomes: Vec<ApprovalOutcome>,
    pub failures: Vec<ApprovalFailure>,
}

/// Result of [`approve_all`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum BulkApproval {
    /// Nothing was pending; no prompt was shown
    NothingPending,
    /// The confirmation was refused; nothing changed
    Cancelled { pending: usize },
    Completed(BulkReport),
}

/// Yes/no gate in front of bulk approval
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool>;
}

/// Always says yes (non-interactive runs, `--yes`)
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> io::Result<bool> {
        Ok(true)
    }
}

/// Writes the prompt to `output` and reads one answer line from `input`.
///
/// Only `y`/`yes` (any case) confirm; an empty or closed input refuses.
#[derive(Debug)]
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptConfirm<StdinLock<'static>, Stdout> {
    /// Interactive terminal prompt
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl PromptConfirm<StdinLock<'static>, Stderr> {
    /// Prompt on stderr, leaving stdout to machine-readable output
    pub fn stdin_with_stderr() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        write!(self.output, "{} [y/N] ", prompt)?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(is_yes(&answer))
    }
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        Ok(self(prompt))
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Promote the pending screenshot for `name` to baseline
pub fn approve_one(store: &BaselineStore, name: &str) -> VisualResult<ApprovalOutcome> {
    let paths = store.paths(name)?;
    let _guard = store.lock(name);

    let Some(prior) = store.status(name)? else {
        info!(screenshot = name, "Not found");
        return Ok(ApprovalOutcome::NotFound {
            name: name.to_string(),
        });
    };
    if !prior.is_pending() {
        info!(screenshot = name, "Already approved");
        return Ok(ApprovalOutcome::AlreadyApproved {
            name: name.to_string(),
        });
    }

    let diff_percentage = if prior == BaselineStatus::Diff {
        store.diff_percentage(name)?
    } else {
        None
    };

    store.copy(&paths.current, &paths.baseline)?;
    store.remove(&paths.diff)?;
    store.remove(&paths.current)?;
    info!(screenshot = name, prior = %prior, "Approved");

    Ok(ApprovalOutcome::Approved {
        name: name.to_string(),
        prior,
        diff_percentage,
    })
}

/// Discard the pending screenshot and diff for `name`, keeping the baseline
pub fn reject_one(store: &BaselineStore, name: &str) -> VisualResult<RejectOutcome> {
    let paths = store.paths(name)?;
    let _guard = store.lock(name);

    let status = store.status(name)?;
    let removed_diff = store.remove(&paths.diff)?;
    let removed_current = store.remove(&paths.current)?;

    match status {
        Some(prior) if prior.is_pending() && (removed_current || removed_diff) => {
            let new_status = store.status(name)?;
            info!(screenshot = name, prior = %prior, "Rejected");
            Ok(RejectOutcome::Rejected {
                name: name.to_string(),
                prior,
                new_status,
            })
        }
        _ => {
            info!(screenshot = name, "Nothing to reject");
            Ok(RejectOutcome::NothingToReject {
                name: name.to_string(),
                status,
            })
        }
    }
}

/// Approve every pending name after one confirmation.
///
/// Refusal changes nothing. Inside a confirmed batch each approval stands on
/// its own: a failure on one name is recorded and the rest still run.
pub fn approve_all(store: &BaselineStore, confirm: &mut dyn Confirm) -> VisualResult<BulkApproval> {
    let listing = store.list()?;
    let pending: Vec<String> = listing.pending().map(|e| e.name.clone()).collect();

    if pending.is_empty() {
        info!("No baselines pending approval");
        return Ok(BulkApproval::NothingPending);
    }

    let prompt = format!("Approve {} baseline(s)?", pending.len());
    let confirmed = confirm.confirm(&prompt).unwrap_or_else(|e| {
        warn!(error = %e, "Confirmation prompt failed; treating as refusal");
        false
    });
    if !confirmed {
        info!(pending = pending.len(), "Bulk approval cancelled");
        return Ok(BulkApproval::Cancelled {
            pending: pending.len(),
        });
    }

    let mut report = BulkReport {
        attempted: pending.len(),
        ..Default::default()
    };
    for name in &pending {
        match approve_one(store, name) {
            Ok(outcome) => {
                if outcome.succeeded() {
                    report.approved += 1;
                }
                report.outcomes.push(outcome);
            }
            Err(e) => {
                warn!(screenshot = name.as_str(), error = %e, "Approval failed");
                report.failures.push(ApprovalFailure {
                    name: name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    info!(approved = report.approved, attempted = report.attempted, "Bulk approval finished");
    Ok(BulkApproval::Completed(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes("YES"));
        assert!(is_yes("  Yes \r\n"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_approve_new_without_baseline() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("orphan.current.png"), b"pending").unwrap();
        let store = BaselineStore::new(dir.path());

        let outcome = approve_one(&store, "orphan").unwrap();
        assert_eq!(outcome.prior_status(), Some(BaselineStatus::New));
        assert_eq!(fs::read(dir.path().join("orphan.png")).unwrap(), b"pending");
        assert!(!dir.path().join("orphan.current.png").exists());
    }

    #[test]
    fn test_approve_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("home.png"), b"base").unwrap();
        let store = BaselineStore::new(dir.path());

        let outcome = approve_one(&store, "home").unwrap();
        assert!(matches!(outcome, ApprovalOutcome::AlreadyApproved { .. }));
        assert!(outcome.succeeded());
        assert_eq!(fs::read(dir.path().join("home.png")).unwrap(), b"base");
    }

    #[test]
    fn test_approve_unknown_name_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = BaselineStore::new(dir.path());
        let outcome = approve_one(&store, "ghost").unwrap();
        assert_eq!(outcome, ApprovalOutcome::NotFound { name: "ghost".to_string() });
        assert!(!outcome.succeeded());
    }

    #[test]
    fn test_reject_with_nothing_pending() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("home.png"), b"base").unwrap();
        let store = BaselineStore::new(dir.path());

        let outcome = reject_one(&store, "home").unwrap();
        assert_eq!(
            outcome,
            RejectOutcome::NothingToReject {
                name: "home".to_string(),
                status: Some(BaselineStatus::Approved),
            }
        );
    }

    #[test]
    fn test_reject_orphan_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("orphan.current.png"), b"pending").unwrap();
        let store = BaselineStore::new(dir.path());

        let outcome = reject_one(&store, "orphan").unwrap();
        assert_eq!(
            outcome,
            RejectOutcome::Rejected {
                name: "orphan".to_string(),
                prior: BaselineStatus::New,
                new_status: None,
            }
        );
        assert_eq!(store.status("orphan").unwrap(), None);
    }

    #[test]
    fn test_refused_confirmation_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.current.png"), b"a").unwrap();
        fs::write(dir.path().join("b.current.png"), b"b").unwrap();
        let store = BaselineStore::new(dir.path());

        let mut asked = Vec::new();
        let mut refuse = |prompt: &str| {
            asked.push(prompt.to_string());
            false
        };
        let result = approve_all(&store, &mut refuse).unwrap();

        assert_eq!(result, BulkApproval::Cancelled { pending: 2 });
        assert_eq!(asked, vec!["Approve 2 baseline(s)?".to_string()]);
        assert!(!dir.path().join("a.png").exists());
        assert!(!dir.path().join("b.png").exists());
    }

    #[test]
    fn test_prompt_refusal_keeps_pending_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("home.png"), b"base").unwrap();
        fs::write(dir.path().join("home.current.png"), b"wider").unwrap();
        let store = BaselineStore::new(dir.path());

        let mut prompt = PromptConfirm::new(io::Cursor::new("n\n"), Vec::new());
        let result = approve_all(&store, &mut prompt).unwrap();

        assert_eq!(result, BulkApproval::Cancelled { pending: 1 });
        assert_eq!(String::from_utf8(prompt.output).unwrap(), "Approve 1 baseline(s)? [y/N] ");
        assert_eq!(fs::read(dir.path().join("home.png")).unwrap(), b"base");
        assert!(dir.path().join("home.current.png").exists());
    }

    #[test]
    fn test_prompt_closed_input_refuses() {
        let mut prompt = PromptConfirm::new(io::Cursor::new(""), io::sink());
        assert!(!prompt.confirm("Approve 3 baseline(s)?").unwrap());

        let mut prompt = PromptConfirm::new(io::Cursor::new("Yes\n"), io::sink());
        assert!(prompt.confirm("Approve 3 baseline(s)?").unwrap());
    }

    #[test]
    fn test_nothing_pending_skips_prompt() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"a").unwrap();
        let store = BaselineStore::new(dir.path());

        let mut never = |_: &str| -> bool { panic!("should not prompt") };
        assert_eq!(approve_all(&store, &mut never).unwrap(), BulkApproval::NothingPending);
    }
}
