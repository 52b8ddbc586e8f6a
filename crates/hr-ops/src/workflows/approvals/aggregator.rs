use std::sync::Arc;

use super::domain::{
    Actor, ApplicationType, ApprovalStatus, PendingApprovalView, PendingItem, PendingList,
    RoleLevel,
};
use super::engine::WorkflowError;
use super::repository::{ApplicationStore, PendingQuery, PendingScope};

/// Produces the merged, role-scoped list of applications awaiting one
/// approver's decision across all four types.
///
/// Read-only; tolerates a read-committed snapshot of whatever the last
/// completed transition wrote and never takes the engine's locks.
pub struct PendingApprovalAggregator<S> {
    store: Arc<S>,
    item_cap: Option<usize>,
}

impl<S> PendingApprovalAggregator<S>
where
    S: ApplicationStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            item_cap: None,
        }
    }

    /// Truncates each per-type item list while `total_count` keeps the full
    /// match count.
    pub fn with_item_cap(mut self, cap: usize) -> Self {
        self.item_cap = Some(cap);
        self
    }

    /// The pending view for one approver identity. Actors holding neither
    /// decision role receive an empty view, not an error.
    pub fn list(&self, actor: &Actor) -> Result<PendingApprovalView, WorkflowError> {
        let Some(query) = scope_query(actor) else {
            return Ok(PendingApprovalView::empty());
        };

        Ok(PendingApprovalView {
            vacation: self.collect(ApplicationType::Vacation, &query)?,
            expense: self.collect(ApplicationType::Expense, &query)?,
            rental_support: self.collect(ApplicationType::RentalSupport, &query)?,
            rental_proposal: self.collect(ApplicationType::RentalProposal, &query)?,
        })
    }

    fn collect(
        &self,
        application_type: ApplicationType,
        query: &PendingQuery,
    ) -> Result<PendingList, WorkflowError> {
        let mut rows = self.store.pending(application_type, query)?;
        rows.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then(b.key.seq.cmp(&a.key.seq))
        });

        let total_count = rows.len();
        if let Some(cap) = self.item_cap {
            rows.truncate(cap);
        }

        Ok(PendingList {
            items: rows.iter().map(PendingItem::from_row).collect(),
            total_count,
        })
    }
}

/// Statuses and scope visible to an actor. Team leaders see their team's
/// first-stage queue, division heads their division's second stage, admins
/// everything still in flight.
fn scope_query(actor: &Actor) -> Option<PendingQuery> {
    match actor.role_level {
        RoleLevel::Admin => Some(PendingQuery {
            statuses: vec![
                ApprovalStatus::Submitted,
                ApprovalStatus::Resubmitted,
                ApprovalStatus::TeamApproved,
            ],
            scope: PendingScope::All,
        }),
        RoleLevel::DivisionHead => Some(PendingQuery {
            statuses: vec![ApprovalStatus::TeamApproved],
            scope: PendingScope::Division(actor.division.clone()),
        }),
        RoleLevel::TeamLeader => Some(PendingQuery {
            statuses: vec![ApprovalStatus::Submitted, ApprovalStatus::Resubmitted],
            scope: PendingScope::Team {
                division: actor.division.clone(),
                team: actor.team.clone(),
            },
        }),
        RoleLevel::None => None,
    }
}
