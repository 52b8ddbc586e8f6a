use std::sync::Arc;

use super::domain::{Alarm, ApplicationKey, ApprovalStatus};
use super::engine::WorkflowError;
use super::repository::{AlarmDraft, AlarmStore, StoreError};

/// Facade over the alarm store handling recipient-side bookkeeping.
///
/// Transition-driven alarms bypass this facade (they travel in the commit
/// batch); `notify` exists for callers outside the state machine.
pub struct AlarmDispatcher<A> {
    store: Arc<A>,
}

impl<A> AlarmDispatcher<A>
where
    A: AlarmStore + 'static,
{
    pub fn new(store: Arc<A>) -> Self {
        Self { store }
    }

    pub fn notify(
        &self,
        user_id: &str,
        alarm_type: ApprovalStatus,
        key: ApplicationKey,
        message: &str,
        redirect_url: &str,
    ) -> Result<Alarm, WorkflowError> {
        let alarm = self.store.insert(AlarmDraft {
            user_id: user_id.to_string(),
            alarm_type,
            key,
            message: message.to_string(),
            redirect_url: redirect_url.to_string(),
        })?;
        Ok(alarm)
    }

    /// Unread alarms for a recipient, newest first.
    pub fn list_unread(&self, user_id: &str) -> Result<Vec<Alarm>, WorkflowError> {
        let mut alarms = self.store.unread(user_id)?;
        sort_newest_first(&mut alarms);
        Ok(alarms)
    }

    /// All alarms for a recipient, newest first.
    pub fn list_all(&self, user_id: &str) -> Result<Vec<Alarm>, WorkflowError> {
        let mut alarms = self.store.all(user_id)?;
        sort_newest_first(&mut alarms);
        Ok(alarms)
    }

    /// Marks one alarm read. Already-read alarms are a no-op; unknown ids
    /// fail with `NotFound`.
    pub fn mark_read(&self, alarm_seq: u64) -> Result<(), WorkflowError> {
        match self.store.mark_read(alarm_seq) {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => Err(WorkflowError::NotFound),
            Err(err) => Err(WorkflowError::Store(err)),
        }
    }

    /// Marks every unread alarm for a recipient read, returning the count
    /// flipped. Zero unread rows leaves the store untouched.
    pub fn mark_all_read(&self, user_id: &str) -> Result<usize, WorkflowError> {
        let flipped = self.store.mark_all_read(user_id)?;
        Ok(flipped)
    }
}

fn sort_newest_first(alarms: &mut [Alarm]) {
    alarms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.seq.cmp(&a.seq)));
}
