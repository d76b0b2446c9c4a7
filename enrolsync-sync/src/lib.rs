//! # enrolsync-sync
//!
//! Claim-driven enrolment and group reconciliation.
//!
//! Build a [`SyncContext`] for the authenticated user and call
//! [`EnrolmentSync::sync`] on a [`ClaimsEnroller`]. Channel management on its
//! own lives in [`InstanceManager`].

pub mod audit;
pub mod error;
pub mod group;
pub mod instance;
pub mod outcome;
pub mod prefix;
pub mod reconciler;
pub mod report;

pub use audit::{AuditLevel, AuditLog};
pub use error::{SyncError, SyncIssue};
pub use group::{GroupReconciler, MEMBER_COMPONENT};
pub use instance::{show_enrolme_link, ChannelFields, EnsuredInstance, InstanceManager, PLUGIN_NAME};
pub use outcome::{SyncOutcome, ENROLLMENT};
pub use reconciler::{ClaimsEnroller, EnrolmentSync, SyncContext};
pub use report::{Change, SyncReport};
