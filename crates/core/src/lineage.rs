//! Prompt submission lineage: revision chains and the per-chain cap.
//!
//! A chain is a root submission plus every refinement that points back to it
//! through `root_submission_id`. Only members that are still pending or have
//! produced an image count towards the cap; failed attempts do not use up a
//! refinement.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Maximum number of live (pending or successful) members per chain,
/// the original included.
pub const MAX_CHAIN_MEMBERS: i64 = 3;

/// Maximum allowed prompt length in characters.
pub const MAX_PROMPT_LENGTH: usize = 2000;

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_ERROR: &str = "ERROR";

/// Message returned when a chain has no capacity left.
pub const NO_REFINEMENTS_REMAINING: &str = "No refinements remaining for this image";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle of a prompt submission. `Pending` moves exactly once to either
/// `Success` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubmissionStatus {
    Pending,
    Success,
    Error,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 3] = [
        SubmissionStatus::Pending,
        SubmissionStatus::Success,
        SubmissionStatus::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => STATUS_PENDING,
            SubmissionStatus::Success => STATUS_SUCCESS,
            SubmissionStatus::Error => STATUS_ERROR,
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            STATUS_PENDING => Ok(SubmissionStatus::Pending),
            STATUS_SUCCESS => Ok(SubmissionStatus::Success),
            STATUS_ERROR => Ok(SubmissionStatus::Error),
            other => Err(CoreError::Internal(format!(
                "Unknown submission status '{other}'"
            ))),
        }
    }

    /// Whether a member in this state occupies a slot in its chain.
    pub fn counts_towards_chain(self) -> bool {
        matches!(self, SubmissionStatus::Pending | SubmissionStatus::Success)
    }

}

/// Stored labels of every status that occupies a chain slot, for binding
/// into `status = ANY(..)` predicates.
pub fn live_status_labels() -> Vec<&'static str> {
    SubmissionStatus::ALL
        .into_iter()
        .filter(|status| status.counts_towards_chain())
        .map(SubmissionStatus::as_str)
        .collect()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate prompt text: non-empty after trimming and within
/// [`MAX_PROMPT_LENGTH`]. Returns the trimmed prompt.
pub fn validate_prompt(prompt: &str) -> Result<&str, CoreError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Prompt must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Prompt must not exceed {MAX_PROMPT_LENGTH} characters"
        )));
    }
    Ok(trimmed)
}

/// Check that a parent submission can be refined: it must have finished with
/// an image attached.
pub fn ensure_refinable(status: SubmissionStatus, has_image: bool) -> Result<(), CoreError> {
    if status != SubmissionStatus::Success || !has_image {
        return Err(CoreError::Validation(
            "Only completed images can be refined".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Chain arithmetic
// ---------------------------------------------------------------------------

/// Resolve the chain root for a refinement of `parent_id`.
///
/// A root submission has no `root_submission_id`, so it is its own root.
pub fn chain_root(parent_id: DbId, parent_root_id: Option<DbId>) -> DbId {
    parent_root_id.unwrap_or(parent_id)
}

/// Revision index for the next member of a chain that currently has
/// `live_members` pending or successful members.
///
/// Fails with [`CoreError::LimitExceeded`] once the chain is full.
pub fn next_revision_index(live_members: i64) -> Result<i32, CoreError> {
    if live_members >= MAX_CHAIN_MEMBERS {
        return Err(CoreError::LimitExceeded(NO_REFINEMENTS_REMAINING.into()));
    }
    i32::try_from(live_members)
        .map_err(|_| CoreError::Internal(format!("Chain size {live_members} out of range")))
}

/// Refinements still available for a chain with `success_count` successful
/// members.
pub fn remaining_edits(success_count: i64) -> i64 {
    (MAX_CHAIN_MEMBERS - success_count).max(0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
