//! Approval workflow and notification engine.
//!
//! One state machine drives every application type (vacation, expense,
//! rental support, rental proposal) through the shared two-stage chain:
//! team-leader decision, then division-head decision. Rejections land in an
//! append-only ledger and every transition fans alarms out to the people who
//! need to act next, committed atomically with the status change.

pub mod aggregator;
pub mod alarms;
pub mod domain;
pub mod engine;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregator::PendingApprovalAggregator;
pub use alarms::AlarmDispatcher;
pub use domain::{
    Actor, Alarm, ApplicationDetail, ApplicationKey, ApplicationRow, ApplicationType,
    ApprovalStatus, DecisionLevel, PendingApprovalView, PendingItem, PendingList, RejectionRecord,
    RoleLevel, TransitionAction,
};
pub use engine::{ApprovalEngine, WorkflowError};
pub use repository::{
    AlarmDraft, AlarmStore, ApplicationStore, ApproverDirectory, PendingQuery, PendingScope,
    RejectionDraft, RejectionLedger, StoreError, TransitionBatch,
};
pub use router::{approval_router, DecisionRequest, PendingRequest, ResubmitRequest};
pub use service::ApprovalService;
