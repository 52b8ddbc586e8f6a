use std::sync::Arc;

use tracing::info;

use super::domain::{
    Actor, ApplicationKey, ApplicationRow, ApprovalStatus, DecisionLevel, RoleLevel,
    TransitionAction,
};
use super::repository::{
    AlarmDraft, ApplicationStore, ApproverDirectory, RejectionDraft, StoreError, TransitionBatch,
};

/// Drives the shared two-stage approval chain for every application type.
///
/// The engine is the only writer of approval status. Each call validates the
/// requested transition against the row's current status, builds the full
/// side-effect batch (status write, rejection append, alarm inserts), and
/// commits it through the store in one unit. A compare-and-swap on the
/// status read at validation time serializes concurrent calls per key: the
/// loser observes the winner's status and fails with `InvalidState`.
pub struct ApprovalEngine<S, D> {
    store: Arc<S>,
    directory: Arc<D>,
}

impl<S, D> ApprovalEngine<S, D>
where
    S: ApplicationStore + 'static,
    D: ApproverDirectory + 'static,
{
    pub fn new(store: Arc<S>, directory: Arc<D>) -> Self {
        Self { store, directory }
    }

    /// Applies one approver decision to the application behind `key`.
    ///
    /// The decision level is derived from the current status, never passed:
    /// `A`/`AM` route to the team leader, `B` to the division head, and any
    /// terminal status refuses the call.
    pub fn transition(
        &self,
        key: &ApplicationKey,
        actor: &Actor,
        action: TransitionAction,
        reason: Option<&str>,
    ) -> Result<ApprovalStatus, WorkflowError> {
        let row = self.store.fetch(key)?.ok_or(WorkflowError::NotFound)?;
        let current = row.status;
        let level = current
            .decision_level()
            .ok_or(WorkflowError::InvalidState { status: current })?;

        authorize_decision(actor, &row, level)?;

        let batch = match (level, action) {
            (DecisionLevel::TeamLeader, TransitionAction::Approve) => {
                self.team_approval_batch(&row)?
            }
            (DecisionLevel::DivisionHead, TransitionAction::Approve) => {
                division_approval_batch(&row)
            }
            (_, TransitionAction::Reject) => {
                let reason = required_reason(reason)?;
                rejection_batch(&row, actor, level, reason)
            }
        };
        let next = batch.status;

        self.commit(key, current, batch)?;

        info!(
            key = %key,
            actor = %actor.user_id,
            from = current.code(),
            to = next.code(),
            "approval transition committed"
        );

        Ok(next)
    }

    /// Applicant-only entry point resetting a rejected application to `AM`.
    ///
    /// The rejection ledger is untouched; history stays additive. The team
    /// leaders of the applicant's team are alarmed that the item is pending
    /// again.
    pub fn resubmit(
        &self,
        key: &ApplicationKey,
        actor: &Actor,
    ) -> Result<ApprovalStatus, WorkflowError> {
        let row = self.store.fetch(key)?.ok_or(WorkflowError::NotFound)?;

        if row.applicant_id != actor.user_id {
            return Err(WorkflowError::Forbidden(
                "only the applicant may resubmit this application".to_string(),
            ));
        }

        let current = row.status;
        if !matches!(
            current,
            ApprovalStatus::TeamRejected | ApprovalStatus::DivisionRejected
        ) {
            return Err(WorkflowError::InvalidState { status: current });
        }

        let leaders = self.directory.team_leaders(&row.division, &row.team)?;
        let alarms = leaders
            .into_iter()
            .map(|leader| AlarmDraft {
                user_id: leader,
                alarm_type: ApprovalStatus::Resubmitted,
                key: row.key,
                message: format!(
                    "{} resubmitted a {} application for your review",
                    row.applicant_id, row.key.application_type
                ),
                redirect_url: approval_url(&row.key),
            })
            .collect();

        let batch = TransitionBatch {
            status: ApprovalStatus::Resubmitted,
            rejection: None,
            alarms,
        };

        self.commit(key, current, batch)?;

        info!(
            key = %key,
            actor = %actor.user_id,
            from = current.code(),
            to = ApprovalStatus::Resubmitted.code(),
            "application resubmitted"
        );

        Ok(ApprovalStatus::Resubmitted)
    }

    fn team_approval_batch(&self, row: &ApplicationRow) -> Result<TransitionBatch, WorkflowError> {
        let mut alarms = vec![AlarmDraft {
            user_id: row.applicant_id.clone(),
            alarm_type: ApprovalStatus::TeamApproved,
            key: row.key,
            message: format!(
                "your {} application was approved by your team leader and is awaiting the division head",
                row.key.application_type
            ),
            redirect_url: approval_url(&row.key),
        }];

        for head in self.directory.division_heads(&row.division)? {
            alarms.push(AlarmDraft {
                user_id: head,
                alarm_type: ApprovalStatus::Submitted,
                key: row.key,
                message: format!(
                    "a {} application from {} is awaiting your decision",
                    row.key.application_type, row.applicant_id
                ),
                redirect_url: approval_url(&row.key),
            });
        }

        Ok(TransitionBatch {
            status: ApprovalStatus::TeamApproved,
            rejection: None,
            alarms,
        })
    }

    fn commit(
        &self,
        key: &ApplicationKey,
        expected: ApprovalStatus,
        batch: TransitionBatch,
    ) -> Result<(), WorkflowError> {
        match self.store.commit(key, expected, batch) {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict { current }) => {
                Err(WorkflowError::InvalidState { status: current })
            }
            Err(StoreError::NotFound) => Err(WorkflowError::NotFound),
            Err(err) => Err(WorkflowError::Store(err)),
        }
    }
}

fn division_approval_batch(row: &ApplicationRow) -> TransitionBatch {
    TransitionBatch {
        status: ApprovalStatus::DivisionApproved,
        rejection: None,
        alarms: vec![AlarmDraft {
            user_id: row.applicant_id.clone(),
            alarm_type: ApprovalStatus::DivisionApproved,
            key: row.key,
            message: format!(
                "your {} application received final approval",
                row.key.application_type
            ),
            redirect_url: approval_url(&row.key),
        }],
    }
}

fn rejection_batch(
    row: &ApplicationRow,
    actor: &Actor,
    level: DecisionLevel,
    reason: &str,
) -> TransitionBatch {
    let status = match level {
        DecisionLevel::TeamLeader => ApprovalStatus::TeamRejected,
        DecisionLevel::DivisionHead => ApprovalStatus::DivisionRejected,
    };

    TransitionBatch {
        status,
        rejection: Some(RejectionDraft {
            key: row.key,
            rejected_by: actor.user_id.clone(),
            level,
            reason: reason.to_string(),
        }),
        alarms: vec![AlarmDraft {
            user_id: row.applicant_id.clone(),
            alarm_type: status,
            key: row.key,
            message: format!(
                "your {} application was rejected by the {}: {}",
                row.key.application_type,
                level.label(),
                reason
            ),
            redirect_url: approval_url(&row.key),
        }],
    }
}

/// The authorization rule shared by all four application types: the actor
/// must hold the role for the derived level and be scoped to the applicant's
/// team (team leader) or division (division head).
fn authorize_decision(
    actor: &Actor,
    row: &ApplicationRow,
    level: DecisionLevel,
) -> Result<(), WorkflowError> {
    match level {
        DecisionLevel::TeamLeader => {
            if actor.role_level != RoleLevel::TeamLeader {
                return Err(WorkflowError::Forbidden(format!(
                    "the pending decision belongs to a {}",
                    level.label()
                )));
            }
            if actor.division != row.division || actor.team != row.team {
                return Err(WorkflowError::Forbidden(
                    "team leaders may only decide for their own team".to_string(),
                ));
            }
        }
        DecisionLevel::DivisionHead => {
            if actor.role_level != RoleLevel::DivisionHead {
                return Err(WorkflowError::Forbidden(format!(
                    "the pending decision belongs to a {}",
                    level.label()
                )));
            }
            if actor.division != row.division {
                return Err(WorkflowError::Forbidden(
                    "division heads may only decide for their own division".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn required_reason(reason: Option<&str>) -> Result<&str, WorkflowError> {
    match reason.map(str::trim) {
        Some(reason) if !reason.is_empty() => Ok(reason),
        _ => Err(WorkflowError::MissingReason),
    }
}

/// Frontend route an alarm redirects its recipient to.
fn approval_url(key: &ApplicationKey) -> String {
    format!("/approvals/{}/{}", key.application_type, key.seq)
}

/// Error raised by workflow operations. All variants are terminal to the
/// calling request; the engine never retries internally.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("application not found")]
    NotFound,
    #[error("no transition is permitted from status {}", .status.code())]
    InvalidState { status: ApprovalStatus },
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("a rejection reason is required")]
    MissingReason,
    #[error(transparent)]
    Store(#[from] StoreError),
}
