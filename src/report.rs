//! Human-readable rendering of listings, comparisons and approvals.
//!
//! Every function returns a `String` so the binary decides where it goes and
//! tests can assert on exact text.

use std::path::Path;

use crate::baseline::{
    ApprovalOutcome, BaselineEntry, BaselineListing, BulkApproval, RejectOutcome,
};
use crate::diff::types::{ComparisonResult, ComparisonStatus, FailureReason};

const RULE_WIDTH: usize = 50;

fn line(out: &mut String, text: &str) {
    out.push_str(text);
    out.push('\n');
}

/// Listing grouped into NEW / DIFF / APPROVED sections with a totals line
pub fn render_listing(dir: &Path, listing: &BaselineListing) -> String {
    let mut out = String::new();
    line(&mut out, "\nVisual Baselines Status");
    line(&mut out, &"=".repeat(RULE_WIDTH));
    line(&mut out, &format!("Directory: {}\n", dir.display()));

    let groups = &listing.by_status;
    if !groups.new.is_empty() {
        line(&mut out, "NEW (needs review):");
        for entry in &groups.new {
            line(&mut out, &format!("  - {}.png", entry.name));
        }
        out.push('\n');
    }

    if !groups.diff.is_empty() {
        line(&mut out, "DIFF (needs review):");
        for entry in &groups.diff {
            let pct = entry
                .diff_percentage
                .map(|p| format!(" ({:.2}% different)", p))
                .unwrap_or_default();
            line(&mut out, &format!("  - {}.png{}", entry.name, pct));
        }
        out.push('\n');
    }

    if !groups.approved.is_empty() {
        line(&mut out, "APPROVED:");
        for entry in &groups.approved {
            line(&mut out, &format!("  - {}.png", entry.name));
        }
        out.push('\n');
    }

    if listing.is_empty() {
        line(&mut out, "No baselines found.\n");
    } else {
        line(&mut out, &"-".repeat(RULE_WIDTH));
        line(
            &mut out,
            &format!(
                "Total: {} approved, {} pending review",
                groups.approved.len(),
                listing.pending_count()
            ),
        );
    }
    line(&mut out, &"=".repeat(RULE_WIDTH));
    out
}

/// The pending set shown before the bulk-approval prompt
pub fn render_pending<'a>(entries: impl IntoIterator<Item = &'a BaselineEntry>) -> String {
    let mut out = String::from("\nBaselines to approve:\n");
    for entry in entries {
        let note = percentage_note(entry.diff_percentage);
        line(&mut out, &format!("  - {}{}", entry.name, note));
    }
    out
}

fn percentage_note(diff_percentage: Option<f64>) -> String {
    diff_percentage
        .map(|p| format!(" ({:.2}% different)", p))
        .unwrap_or_else(|| " (new)".to_string())
}

/// One comparison outcome with the paths a reviewer needs
pub fn render_comparison(result: &ComparisonResult) -> String {
    let mut out = String::new();
    match result.status {
        ComparisonStatus::New => {
            line(&mut out, &format!("New baseline created: {}", result.name));
            for path in &result.artifacts {
                line(&mut out, &format!("   Path: {}", path.display()));
            }
            line(&mut out, "   Status: PENDING APPROVAL (new baseline)");
        }
        ComparisonStatus::Passed => {
            line(&mut out, &format!("Visual diff PASSED: {}", result.name));
            let pct = result.diff_percentage.unwrap_or(0.0);
            line(&mut out, &difference(pct, result.threshold));
        }
        ComparisonStatus::Failed => {
            line(&mut out, &format!("Visual diff FAILED: {}", result.name));
            match &result.reason {
                Some(FailureReason::DimensionMismatch { baseline, current }) => {
                    line(&mut out, "   Reason: Dimension mismatch");
                    line(&mut out, &format!("   Baseline: {}", baseline));
                    line(&mut out, &format!("   Current: {}", current));
                }
                Some(FailureReason::ThresholdExceeded {
                    diff_percentage,
                    threshold,
                }) => {
                    line(&mut out, &difference(*diff_percentage, *threshold));
                }
                Some(FailureReason::DecodeError { message }) => {
                    line(&mut out, &format!("   Reason: {}", message));
                }
                None => {}
            }
            for path in &result.artifacts {
                line(&mut out, &format!("   Saved: {}", path.display()));
            }
        }
    }
    out
}

fn difference(pct: f64, threshold: f64) -> String {
    format!("   Difference: {:.3}% (threshold: {}%)", pct, threshold)
}

/// Name, prior status, new status and (for diffs) the percentage
pub fn render_approval(outcome: &ApprovalOutcome) -> String {
    match outcome {
        ApprovalOutcome::Approved {
            name,
            prior,
            diff_percentage,
        } => {
            let pct = diff_percentage
                .map(|p| format!(", {:.2}% different", p))
                .unwrap_or_default();
            format!("Approved: {} ({} -> approved{})", name, prior, pct)
        }
        ApprovalOutcome::AlreadyApproved { name } => format!("Already approved: {}", name),
        ApprovalOutcome::NotFound { name } => format!("Not found: {}", name),
    }
}

pub fn render_rejection(outcome: &RejectOutcome) -> String {
    match outcome {
        RejectOutcome::Rejected {
            name,
            prior,
            new_status,
        } => {
            let after = new_status.map(|s| s.as_str()).unwrap_or("untracked");
            format!("Rejected: {} ({} -> {})", name, prior, after)
        }
        RejectOutcome::NothingToReject { name, .. } => format!("Nothing to reject: {}", name),
    }
}

pub fn render_bulk(result: &BulkApproval) -> String {
    match result {
        BulkApproval::NothingPending => "No baselines pending approval.".to_string(),
        BulkApproval::Cancelled { .. } => "Cancelled.".to_string(),
        BulkApproval::Completed(report) => {
            let mut out = String::new();
            for outcome in &report.outcomes {
                line(&mut out, &render_approval(outcome));
            }
            for failure in &report.failures {
                line(&mut out, &format!("Failed: {} ({})", failure.name, failure.error));
            }
            out.push_str(&format!(
                "\nApproved {}/{} baselines.",
                report.approved, report.attempted
            ));
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::{ArtifactPaths, BaselineStatus, BulkReport};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn entry(name: &str, status: BaselineStatus, pct: Option<f64>) -> BaselineEntry {
        BaselineEntry {
            name: name.to_string(),
            status,
            diff_percentage: pct,
            paths: ArtifactPaths {
                baseline: PathBuf::from(format!("{}.png", name)),
                current: PathBuf::from(format!("{}.current.png", name)),
                diff: PathBuf::from(format!("{}.diff.png", name)),
            },
        }
    }

    #[test]
    fn test_render_empty_listing() {
        let text = render_listing(Path::new("./vb"), &BaselineListing::default());
        assert!(text.contains("Directory: ./vb"));
        assert!(text.contains("No baselines found."));
        assert!(!text.contains("Total:"));
    }

    #[test]
    fn test_render_listing_sections() {
        let mut listing = BaselineListing::default();
        listing.by_status.new.push(entry("login", BaselineStatus::New, None));
        listing.by_status.diff.push(entry("home", BaselineStatus::Diff, Some(1.23456)));
        listing.by_status.approved.push(entry("about", BaselineStatus::Approved, None));
        listing.all = vec![
            listing.by_status.new[0].clone(),
            listing.by_status.diff[0].clone(),
            listing.by_status.approved[0].clone(),
        ];

        let text = render_listing(Path::new("./vb"), &listing);
        assert!(text.contains("NEW (needs review):\n  - login.png\n"));
        assert!(text.contains("DIFF (needs review):\n  - home.png (1.23% different)\n"));
        assert!(text.contains("APPROVED:\n  - about.png\n"));
        assert!(text.contains("Total: 1 approved, 2 pending review"));
    }

    #[test]
    fn test_render_pending() {
        let entries = [
            entry("login", BaselineStatus::New, None),
            entry("home", BaselineStatus::Diff, Some(4.5)),
        ];
        assert_eq!(
            render_pending(&entries),
            "\nBaselines to approve:\n  - login (new)\n  - home (4.50% different)\n"
        );
    }

    #[test]
    fn test_render_comparison_lines() {
        let mut passed = ComparisonResult::new("home", ComparisonStatus::Passed, 0.5);
        passed.diff_percentage = Some(0.25);
        assert_eq!(
            render_comparison(&passed),
            "Visual diff PASSED: home\n   Difference: 0.250% (threshold: 0.5%)\n"
        );

        let failed = ComparisonResult::failed(
            "home",
            FailureReason::ThresholdExceeded {
                diff_percentage: 2.0,
                threshold: 0.5,
            },
            0.5,
        )
        .with_artifact(Path::new("vb/home.current.png"));
        assert_eq!(
            render_comparison(&failed),
            "Visual diff FAILED: home\n   Difference: 2.000% (threshold: 0.5%)\n   Saved: vb/home.current.png\n"
        );
    }

    #[test]
    fn test_render_approval_and_rejection() {
        let approved = ApprovalOutcome::Approved {
            name: "home".to_string(),
            prior: BaselineStatus::Diff,
            diff_percentage: Some(2.0),
        };
        assert_eq!(render_approval(&approved), "Approved: home (diff -> approved, 2.00% different)");

        let rejected = RejectOutcome::Rejected {
            name: "home".to_string(),
            prior: BaselineStatus::Diff,
            new_status: Some(BaselineStatus::Approved),
        };
        assert_eq!(render_rejection(&rejected), "Rejected: home (diff -> approved)");
    }

    #[test]
    fn test_render_bulk_counts() {
        let report = BulkReport {
            attempted: 2,
            approved: 2,
            outcomes: vec![
                ApprovalOutcome::Approved {
                    name: "a".to_string(),
                    prior: BaselineStatus::New,
                    diff_percentage: None,
                },
                ApprovalOutcome::Approved {
                    name: "b".to_string(),
                    prior: BaselineStatus::New,
                    diff_percentage: None,
                },
            ],
            failures: vec![],
        };
        let text = render_bulk(&BulkApproval::Completed(report));
        assert!(text.ends_with("Approved 2/2 baselines."));
        assert_eq!(render_bulk(&BulkApproval::Cancelled { pending: 3 }), "Cancelled.");
    }
}
