pub mod approval;
pub mod lock;
pub mod store;

pub use approval::{
    ApprovalFailure, ApprovalOutcome, AssumeYes, BulkApproval, BulkReport, Confirm, RejectOutcome,
    PromptConfirm, approve_all, approve_one, reject_one,
};
pub use lock::NameGuard;
pub use store::{
    ArtifactPaths, BaselineEntry, BaselineListing, BaselineStatus, BaselineStore, StatusGroups,
};
