use std::sync::Arc;

use super::aggregator::PendingApprovalAggregator;
use super::alarms::AlarmDispatcher;
use super::domain::{
    Actor, Alarm, ApplicationKey, ApprovalStatus, PendingApprovalView, RejectionRecord,
    TransitionAction,
};
use super::engine::{ApprovalEngine, WorkflowError};
use super::repository::{
    AlarmStore, ApplicationStore, ApproverDirectory, RejectionLedger,
};

/// Facade composing the engine, aggregator, dispatcher, and ledger reads
/// behind one shareable type for the HTTP layer and CLI.
pub struct ApprovalService<S, L, A, D> {
    engine: ApprovalEngine<S, D>,
    aggregator: PendingApprovalAggregator<S>,
    dispatcher: AlarmDispatcher<A>,
    store: Arc<S>,
    ledger: Arc<L>,
}

impl<S, L, A, D> ApprovalService<S, L, A, D>
where
    S: ApplicationStore + 'static,
    L: RejectionLedger + 'static,
    A: AlarmStore + 'static,
    D: ApproverDirectory + 'static,
{
    pub fn new(store: Arc<S>, ledger: Arc<L>, alarms: Arc<A>, directory: Arc<D>) -> Self {
        Self {
            engine: ApprovalEngine::new(store.clone(), directory),
            aggregator: PendingApprovalAggregator::new(store.clone()),
            dispatcher: AlarmDispatcher::new(alarms),
            store,
            ledger,
        }
    }

    /// Caps each per-type pending list; `total_count` keeps the full count.
    pub fn with_pending_item_cap(mut self, cap: usize) -> Self {
        self.aggregator = self.aggregator.with_item_cap(cap);
        self
    }

    pub fn transition(
        &self,
        key: &ApplicationKey,
        actor: &Actor,
        action: TransitionAction,
        reason: Option<&str>,
    ) -> Result<ApprovalStatus, WorkflowError> {
        self.engine.transition(key, actor, action, reason)
    }

    pub fn resubmit(
        &self,
        key: &ApplicationKey,
        actor: &Actor,
    ) -> Result<ApprovalStatus, WorkflowError> {
        self.engine.resubmit(key, actor)
    }

    pub fn pending(&self, actor: &Actor) -> Result<PendingApprovalView, WorkflowError> {
        self.aggregator.list(actor)
    }

    /// Rejection history for one application, newest first. Fails `NotFound`
    /// when the key resolves to no row.
    pub fn rejection_history(
        &self,
        key: &ApplicationKey,
    ) -> Result<Vec<RejectionRecord>, WorkflowError> {
        self.store.fetch(key)?.ok_or(WorkflowError::NotFound)?;
        let history = self.ledger.history(key)?;
        Ok(history)
    }

    /// The current rejection reason shown to the applicant, if any.
    pub fn latest_rejection(
        &self,
        key: &ApplicationKey,
    ) -> Result<Option<RejectionRecord>, WorkflowError> {
        self.store.fetch(key)?.ok_or(WorkflowError::NotFound)?;
        let latest = self.ledger.latest(key)?;
        Ok(latest)
    }

    pub fn notify(
        &self,
        user_id: &str,
        alarm_type: ApprovalStatus,
        key: ApplicationKey,
        message: &str,
        redirect_url: &str,
    ) -> Result<Alarm, WorkflowError> {
        self.dispatcher
            .notify(user_id, alarm_type, key, message, redirect_url)
    }

    pub fn list_unread_alarms(&self, user_id: &str) -> Result<Vec<Alarm>, WorkflowError> {
        self.dispatcher.list_unread(user_id)
    }

    pub fn list_all_alarms(&self, user_id: &str) -> Result<Vec<Alarm>, WorkflowError> {
        self.dispatcher.list_all(user_id)
    }

    pub fn mark_alarm_read(&self, alarm_seq: u64) -> Result<(), WorkflowError> {
        self.dispatcher.mark_read(alarm_seq)
    }

    pub fn mark_all_alarms_read(&self, user_id: &str) -> Result<usize, WorkflowError> {
        self.dispatcher.mark_all_read(user_id)
    }
}
