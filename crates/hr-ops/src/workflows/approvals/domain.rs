use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of application categories sharing the approval chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    Vacation,
    Expense,
    RentalSupport,
    RentalProposal,
}

impl ApplicationType {
    pub const ALL: [ApplicationType; 4] = [
        ApplicationType::Vacation,
        ApplicationType::Expense,
        ApplicationType::RentalSupport,
        ApplicationType::RentalProposal,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationType::Vacation => "vacation",
            ApplicationType::Expense => "expense",
            ApplicationType::RentalSupport => "rental_support",
            ApplicationType::RentalProposal => "rental_proposal",
        }
    }

    /// Parses the URL/path form; accepts both `_` and `-` separators.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vacation" => Some(ApplicationType::Vacation),
            "expense" => Some(ApplicationType::Expense),
            "rental_support" | "rental-support" => Some(ApplicationType::RentalSupport),
            "rental_proposal" | "rental-proposal" => Some(ApplicationType::RentalProposal),
            _ => None,
        }
    }
}

impl fmt::Display for ApplicationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Position of an application along the shared two-stage chain.
///
/// Serialized as the single-letter codes stored on every application row;
/// the same codes double as alarm types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalStatus {
    /// Submitted, awaiting the team-leader decision.
    #[serde(rename = "A")]
    Submitted,
    /// Resubmitted after an applicant edit, awaiting the team-leader decision.
    #[serde(rename = "AM")]
    Resubmitted,
    /// Approved by the team leader, awaiting the division-head decision.
    #[serde(rename = "B")]
    TeamApproved,
    /// Rejected by the team leader. Terminal until resubmission.
    #[serde(rename = "RB")]
    TeamRejected,
    /// Approved by the division head. Final.
    #[serde(rename = "C")]
    DivisionApproved,
    /// Rejected by the division head. Terminal until resubmission.
    #[serde(rename = "RC")]
    DivisionRejected,
}

impl ApprovalStatus {
    pub const fn code(self) -> &'static str {
        match self {
            ApprovalStatus::Submitted => "A",
            ApprovalStatus::Resubmitted => "AM",
            ApprovalStatus::TeamApproved => "B",
            ApprovalStatus::TeamRejected => "RB",
            ApprovalStatus::DivisionApproved => "C",
            ApprovalStatus::DivisionRejected => "RC",
        }
    }

    /// Terminal statuses admit no further decision; only an explicit
    /// applicant resubmission leaves `TeamRejected`/`DivisionRejected`.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApprovalStatus::TeamRejected
                | ApprovalStatus::DivisionApproved
                | ApprovalStatus::DivisionRejected
        )
    }

    /// The decision level implied by the current status. Level is always
    /// derived from stored state, never passed by the caller.
    pub const fn decision_level(self) -> Option<DecisionLevel> {
        match self {
            ApprovalStatus::Submitted | ApprovalStatus::Resubmitted => {
                Some(DecisionLevel::TeamLeader)
            }
            ApprovalStatus::TeamApproved => Some(DecisionLevel::DivisionHead),
            ApprovalStatus::TeamRejected
            | ApprovalStatus::DivisionApproved
            | ApprovalStatus::DivisionRejected => None,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Stage of the approval chain a decision (or rejection) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionLevel {
    TeamLeader,
    DivisionHead,
}

impl DecisionLevel {
    pub const fn label(self) -> &'static str {
        match self {
            DecisionLevel::TeamLeader => "team leader",
            DecisionLevel::DivisionHead => "division head",
        }
    }
}

impl fmt::Display for DecisionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The two actions an approver may take at their level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Approve,
    Reject,
}

/// Role granted to an actor by the upstream identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleLevel {
    None,
    TeamLeader,
    DivisionHead,
    Admin,
}

/// Caller-resolved identity executing a workflow operation.
///
/// The engine trusts these fields as resolved by the excluded
/// authentication layer; it applies only the role/scope rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,
    pub division: String,
    pub team: String,
    pub role_level: RoleLevel,
}

/// Discriminated key joining workflow records to one concrete application
/// row without a relational constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationKey {
    pub application_type: ApplicationType,
    pub seq: u64,
}

impl ApplicationKey {
    pub const fn new(application_type: ApplicationType, seq: u64) -> Self {
        Self {
            application_type,
            seq,
        }
    }
}

impl fmt::Display for ApplicationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.application_type, self.seq)
    }
}

/// Uniform projection of one row from a per-type application table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRow {
    pub key: ApplicationKey,
    pub applicant_id: String,
    pub division: String,
    pub team: String,
    pub status: ApprovalStatus,
    pub submitted_at: DateTime<Utc>,
    pub detail: ApplicationDetail,
}

/// Type-specific payload carried alongside the shared approval columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplicationDetail {
    Vacation {
        starts_on: NaiveDate,
        ends_on: NaiveDate,
    },
    Expense {
        amount: u32,
        category: String,
    },
    RentalSupport {
        monthly_rent: u32,
        support_amount: u32,
    },
    RentalProposal {
        address: String,
        monthly_rent: u32,
        deposit: u32,
    },
}

impl ApplicationDetail {
    /// The category this payload belongs to; must match the owning row's key.
    pub const fn application_type(&self) -> ApplicationType {
        match self {
            ApplicationDetail::Vacation { .. } => ApplicationType::Vacation,
            ApplicationDetail::Expense { .. } => ApplicationType::Expense,
            ApplicationDetail::RentalSupport { .. } => ApplicationType::RentalSupport,
            ApplicationDetail::RentalProposal { .. } => ApplicationType::RentalProposal,
        }
    }
}

/// One rejection event. Append-only; the newest record for a key is the
/// current reason shown to the applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub seq: u64,
    pub key: ApplicationKey,
    pub rejected_by: String,
    pub level: DecisionLevel,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

/// Notification row owned by its recipient. The engine only ever inserts;
/// read-state toggles are the recipient's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub seq: u64,
    pub user_id: String,
    pub alarm_type: ApprovalStatus,
    pub key: ApplicationKey,
    pub message: String,
    pub is_read: bool,
    pub redirect_url: String,
    pub created_at: DateTime<Utc>,
}

/// One application awaiting the viewing approver's decision.
///
/// Payload fields irrelevant to the item's type stay unset and are omitted
/// from serialized output rather than defaulted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingItem {
    pub application_type: ApplicationType,
    pub seq: u64,
    pub applicant_id: String,
    pub status: ApprovalStatus,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_rent: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_amount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit: Option<u32>,
}

impl PendingItem {
    pub fn from_row(row: &ApplicationRow) -> Self {
        let mut item = PendingItem {
            application_type: row.key.application_type,
            seq: row.key.seq,
            applicant_id: row.applicant_id.clone(),
            status: row.status,
            submitted_at: row.submitted_at,
            starts_on: None,
            ends_on: None,
            amount: None,
            category: None,
            monthly_rent: None,
            support_amount: None,
            address: None,
            deposit: None,
        };

        match &row.detail {
            ApplicationDetail::Vacation { starts_on, ends_on } => {
                item.starts_on = Some(*starts_on);
                item.ends_on = Some(*ends_on);
            }
            ApplicationDetail::Expense { amount, category } => {
                item.amount = Some(*amount);
                item.category = Some(category.clone());
            }
            ApplicationDetail::RentalSupport {
                monthly_rent,
                support_amount,
            } => {
                item.monthly_rent = Some(*monthly_rent);
                item.support_amount = Some(*support_amount);
            }
            ApplicationDetail::RentalProposal {
                address,
                monthly_rent,
                deposit,
            } => {
                item.address = Some(address.clone());
                item.monthly_rent = Some(*monthly_rent);
                item.deposit = Some(*deposit);
            }
        }

        item
    }
}

/// Items awaiting decision within one application type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingList {
    pub items: Vec<PendingItem>,
    pub total_count: usize,
}

impl PendingList {
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }
}

/// Merged pending view across all four application types for one approver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingApprovalView {
    pub vacation: PendingList,
    pub expense: PendingList,
    pub rental_support: PendingList,
    pub rental_proposal: PendingList,
}

impl PendingApprovalView {
    pub const fn empty() -> Self {
        Self {
            vacation: PendingList::empty(),
            expense: PendingList::empty(),
            rental_support: PendingList::empty(),
            rental_proposal: PendingList::empty(),
        }
    }
}
