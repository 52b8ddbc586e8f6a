use super::domain::{
    Alarm, ApplicationKey, ApplicationRow, ApplicationType, ApprovalStatus, DecisionLevel,
    RejectionRecord,
};

/// Rejection event awaiting persistence; the store assigns `seq` and the
/// `recorded_at` timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionDraft {
    pub key: ApplicationKey,
    pub rejected_by: String,
    pub level: DecisionLevel,
    pub reason: String,
}

/// Alarm awaiting persistence; the store assigns `seq`, `created_at`, and
/// the initial unread flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmDraft {
    pub user_id: String,
    pub alarm_type: ApprovalStatus,
    pub key: ApplicationKey,
    pub message: String,
    pub redirect_url: String,
}

/// Every side effect of one status transition, applied as a single unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionBatch {
    pub status: ApprovalStatus,
    pub rejection: Option<RejectionDraft>,
    pub alarms: Vec<AlarmDraft>,
}

/// Visibility scope applied to pending-approval queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingScope {
    All,
    Division(String),
    Team { division: String, team: String },
}

impl PendingScope {
    pub fn matches(&self, row: &ApplicationRow) -> bool {
        match self {
            PendingScope::All => true,
            PendingScope::Division(division) => row.division == *division,
            PendingScope::Team { division, team } => {
                row.division == *division && row.team == *team
            }
        }
    }
}

/// Status and scope filter for one pending-approval query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    pub statuses: Vec<ApprovalStatus>,
    pub scope: PendingScope,
}

impl PendingQuery {
    pub fn matches(&self, row: &ApplicationRow) -> bool {
        self.statuses.contains(&row.status) && self.scope.matches(row)
    }
}

/// Keyed access to the four per-type application tables.
///
/// `commit` is the engine's only write path: it must compare-and-swap the
/// stored status from `expected` to `batch.status` and apply the rest of the
/// batch (rejection append, alarm inserts) in the same unit, or apply
/// nothing at all. A row that moved since the caller's read fails with
/// `Conflict` carrying the status it moved to.
pub trait ApplicationStore: Send + Sync {
    fn fetch(&self, key: &ApplicationKey) -> Result<Option<ApplicationRow>, StoreError>;

    fn commit(
        &self,
        key: &ApplicationKey,
        expected: ApprovalStatus,
        batch: TransitionBatch,
    ) -> Result<(), StoreError>;

    fn pending(
        &self,
        application_type: ApplicationType,
        query: &PendingQuery,
    ) -> Result<Vec<ApplicationRow>, StoreError>;
}

/// Read side of the append-only rejection log. Appends flow exclusively
/// through [`ApplicationStore::commit`]; nothing is ever updated or deleted.
pub trait RejectionLedger: Send + Sync {
    /// All rejection events for a key, newest first.
    fn history(&self, key: &ApplicationKey) -> Result<Vec<RejectionRecord>, StoreError>;

    /// The current (most recent) rejection for a key, if any.
    fn latest(&self, key: &ApplicationKey) -> Result<Option<RejectionRecord>, StoreError>;
}

/// Notification rows keyed by recipient.
pub trait AlarmStore: Send + Sync {
    fn insert(&self, draft: AlarmDraft) -> Result<Alarm, StoreError>;

    fn unread(&self, user_id: &str) -> Result<Vec<Alarm>, StoreError>;

    fn all(&self, user_id: &str) -> Result<Vec<Alarm>, StoreError>;

    /// No-op when the alarm is already read; `NotFound` when the id does
    /// not exist.
    fn mark_read(&self, alarm_seq: u64) -> Result<(), StoreError>;

    /// Returns how many rows flipped to read.
    fn mark_all_read(&self, user_id: &str) -> Result<usize, StoreError>;
}

/// Lookup of approver user ids for alarm fan-out.
pub trait ApproverDirectory: Send + Sync {
    fn team_leaders(&self, division: &str, team: &str) -> Result<Vec<String>, StoreError>;

    fn division_heads(&self, division: &str) -> Result<Vec<String>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("status moved concurrently to {}", .current.code())]
    Conflict { current: ApprovalStatus },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
