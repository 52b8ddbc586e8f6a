use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::approvals::domain::{
    Actor, Alarm, ApplicationDetail, ApplicationKey, ApplicationRow, ApplicationType,
    ApprovalStatus, RejectionRecord, RoleLevel,
};
use crate::workflows::approvals::repository::{
    AlarmDraft, AlarmStore, ApplicationStore, ApproverDirectory, PendingQuery, RejectionLedger,
    StoreError, TransitionBatch,
};
use crate::workflows::approvals::service::ApprovalService;

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn applicant() -> Actor {
    Actor {
        user_id: "emp-100".to_string(),
        division: "engineering".to_string(),
        team: "platform".to_string(),
        role_level: RoleLevel::None,
    }
}

pub(super) fn team_leader() -> Actor {
    Actor {
        user_id: "lead-200".to_string(),
        division: "engineering".to_string(),
        team: "platform".to_string(),
        role_level: RoleLevel::TeamLeader,
    }
}

pub(super) fn other_team_leader() -> Actor {
    Actor {
        user_id: "lead-201".to_string(),
        division: "engineering".to_string(),
        team: "mobile".to_string(),
        role_level: RoleLevel::TeamLeader,
    }
}

pub(super) fn division_head() -> Actor {
    Actor {
        user_id: "head-300".to_string(),
        division: "engineering".to_string(),
        team: "office".to_string(),
        role_level: RoleLevel::DivisionHead,
    }
}

pub(super) fn other_division_head() -> Actor {
    Actor {
        user_id: "head-400".to_string(),
        division: "finance".to_string(),
        team: "office".to_string(),
        role_level: RoleLevel::DivisionHead,
    }
}

pub(super) fn admin() -> Actor {
    Actor {
        user_id: "admin-1".to_string(),
        division: "hr".to_string(),
        team: "people".to_string(),
        role_level: RoleLevel::Admin,
    }
}

pub(super) fn vacation_row(seq: u64, status: ApprovalStatus) -> ApplicationRow {
    ApplicationRow {
        key: ApplicationKey::new(ApplicationType::Vacation, seq),
        applicant_id: "emp-100".to_string(),
        division: "engineering".to_string(),
        team: "platform".to_string(),
        status,
        submitted_at: base_time(),
        detail: ApplicationDetail::Vacation {
            starts_on: base_time().date_naive() + Duration::days(14),
            ends_on: base_time().date_naive() + Duration::days(18),
        },
    }
}

pub(super) fn expense_row(seq: u64, status: ApprovalStatus) -> ApplicationRow {
    ApplicationRow {
        key: ApplicationKey::new(ApplicationType::Expense, seq),
        applicant_id: "emp-100".to_string(),
        division: "engineering".to_string(),
        team: "platform".to_string(),
        status,
        submitted_at: base_time() + Duration::hours(1),
        detail: ApplicationDetail::Expense {
            amount: 184_000,
            category: "team dinner".to_string(),
        },
    }
}

pub(super) fn rental_support_row(seq: u64, status: ApprovalStatus) -> ApplicationRow {
    ApplicationRow {
        key: ApplicationKey::new(ApplicationType::RentalSupport, seq),
        applicant_id: "emp-100".to_string(),
        division: "engineering".to_string(),
        team: "platform".to_string(),
        status,
        submitted_at: base_time() + Duration::hours(2),
        detail: ApplicationDetail::RentalSupport {
            monthly_rent: 850_000,
            support_amount: 300_000,
        },
    }
}

pub(super) fn rental_proposal_row(seq: u64, status: ApprovalStatus) -> ApplicationRow {
    ApplicationRow {
        key: ApplicationKey::new(ApplicationType::RentalProposal, seq),
        applicant_id: "emp-100".to_string(),
        division: "engineering".to_string(),
        team: "platform".to_string(),
        status,
        submitted_at: base_time() + Duration::hours(3),
        detail: ApplicationDetail::RentalProposal {
            address: "21 Harbor View Rd".to_string(),
            monthly_rent: 920_000,
            deposit: 5_000_000,
        },
    }
}

/// Test double implementing every store trait over one mutex so `commit`
/// really is atomic and CAS races resolve deterministically.
#[derive(Default)]
pub(super) struct MemoryBackend {
    state: Mutex<BackendState>,
}

#[derive(Default)]
struct BackendState {
    applications: HashMap<ApplicationKey, ApplicationRow>,
    rejections: Vec<RejectionRecord>,
    alarms: Vec<Alarm>,
    staff: Vec<StaffMember>,
    next_rejection_seq: u64,
    next_alarm_seq: u64,
}

struct StaffMember {
    user_id: String,
    division: String,
    team: String,
    role_level: RoleLevel,
}

impl MemoryBackend {
    pub(super) fn insert_application(&self, row: ApplicationRow) {
        let mut state = self.state.lock().expect("backend mutex poisoned");
        state.applications.insert(row.key, row);
    }

    pub(super) fn add_staff(&self, user_id: &str, division: &str, team: &str, role: RoleLevel) {
        let mut state = self.state.lock().expect("backend mutex poisoned");
        state.staff.push(StaffMember {
            user_id: user_id.to_string(),
            division: division.to_string(),
            team: team.to_string(),
            role_level: role,
        });
    }

    pub(super) fn status_of(&self, key: &ApplicationKey) -> Option<ApprovalStatus> {
        let state = self.state.lock().expect("backend mutex poisoned");
        state.applications.get(key).map(|row| row.status)
    }

    pub(super) fn rejections(&self) -> Vec<RejectionRecord> {
        let state = self.state.lock().expect("backend mutex poisoned");
        state.rejections.clone()
    }

    pub(super) fn alarms(&self) -> Vec<Alarm> {
        let state = self.state.lock().expect("backend mutex poisoned");
        state.alarms.clone()
    }

    pub(super) fn alarms_for(&self, user_id: &str) -> Vec<Alarm> {
        self.alarms()
            .into_iter()
            .filter(|alarm| alarm.user_id == user_id)
            .collect()
    }
}

impl ApplicationStore for MemoryBackend {
    fn fetch(&self, key: &ApplicationKey) -> Result<Option<ApplicationRow>, StoreError> {
        let state = self.state.lock().expect("backend mutex poisoned");
        Ok(state.applications.get(key).cloned())
    }

    fn commit(
        &self,
        key: &ApplicationKey,
        expected: ApprovalStatus,
        batch: TransitionBatch,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("backend mutex poisoned");

        let current = match state.applications.get(key) {
            Some(row) => row.status,
            None => return Err(StoreError::NotFound),
        };
        if current != expected {
            return Err(StoreError::Conflict { current });
        }

        if let Some(row) = state.applications.get_mut(key) {
            row.status = batch.status;
        }

        let now = Utc::now();
        if let Some(rejection) = batch.rejection {
            state.next_rejection_seq += 1;
            let seq = state.next_rejection_seq;
            state.rejections.push(RejectionRecord {
                seq,
                key: rejection.key,
                rejected_by: rejection.rejected_by,
                level: rejection.level,
                reason: rejection.reason,
                recorded_at: now,
            });
        }
        for draft in batch.alarms {
            state.next_alarm_seq += 1;
            let seq = state.next_alarm_seq;
            state.alarms.push(Alarm {
                seq,
                user_id: draft.user_id,
                alarm_type: draft.alarm_type,
                key: draft.key,
                message: draft.message,
                is_read: false,
                redirect_url: draft.redirect_url,
                created_at: now,
            });
        }

        Ok(())
    }

    fn pending(
        &self,
        application_type: ApplicationType,
        query: &PendingQuery,
    ) -> Result<Vec<ApplicationRow>, StoreError> {
        let state = self.state.lock().expect("backend mutex poisoned");
        Ok(state
            .applications
            .values()
            .filter(|row| row.key.application_type == application_type && query.matches(row))
            .cloned()
            .collect())
    }
}

impl RejectionLedger for MemoryBackend {
    fn history(&self, key: &ApplicationKey) -> Result<Vec<RejectionRecord>, StoreError> {
        let state = self.state.lock().expect("backend mutex poisoned");
        let mut records: Vec<RejectionRecord> = state
            .rejections
            .iter()
            .filter(|record| record.key == *key)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.seq.cmp(&a.seq));
        Ok(records)
    }

    fn latest(&self, key: &ApplicationKey) -> Result<Option<RejectionRecord>, StoreError> {
        Ok(self.history(key)?.into_iter().next())
    }
}

impl AlarmStore for MemoryBackend {
    fn insert(&self, draft: AlarmDraft) -> Result<Alarm, StoreError> {
        let mut state = self.state.lock().expect("backend mutex poisoned");
        state.next_alarm_seq += 1;
        let alarm = Alarm {
            seq: state.next_alarm_seq,
            user_id: draft.user_id,
            alarm_type: draft.alarm_type,
            key: draft.key,
            message: draft.message,
            is_read: false,
            redirect_url: draft.redirect_url,
            created_at: Utc::now(),
        };
        state.alarms.push(alarm.clone());
        Ok(alarm)
    }

    fn unread(&self, user_id: &str) -> Result<Vec<Alarm>, StoreError> {
        let state = self.state.lock().expect("backend mutex poisoned");
        Ok(state
            .alarms
            .iter()
            .filter(|alarm| alarm.user_id == user_id && !alarm.is_read)
            .cloned()
            .collect())
    }

    fn all(&self, user_id: &str) -> Result<Vec<Alarm>, StoreError> {
        let state = self.state.lock().expect("backend mutex poisoned");
        Ok(state
            .alarms
            .iter()
            .filter(|alarm| alarm.user_id == user_id)
            .cloned()
            .collect())
    }

    fn mark_read(&self, alarm_seq: u64) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("backend mutex poisoned");
        match state.alarms.iter_mut().find(|alarm| alarm.seq == alarm_seq) {
            Some(alarm) => {
                alarm.is_read = true;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn mark_all_read(&self, user_id: &str) -> Result<usize, StoreError> {
        let mut state = self.state.lock().expect("backend mutex poisoned");
        let mut flipped = 0;
        for alarm in state
            .alarms
            .iter_mut()
            .filter(|alarm| alarm.user_id == user_id && !alarm.is_read)
        {
            alarm.is_read = true;
            flipped += 1;
        }
        Ok(flipped)
    }
}

impl ApproverDirectory for MemoryBackend {
    fn team_leaders(&self, division: &str, team: &str) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().expect("backend mutex poisoned");
        Ok(state
            .staff
            .iter()
            .filter(|member| {
                member.role_level == RoleLevel::TeamLeader
                    && member.division == division
                    && member.team == team
            })
            .map(|member| member.user_id.clone())
            .collect())
    }

    fn division_heads(&self, division: &str) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().expect("backend mutex poisoned");
        Ok(state
            .staff
            .iter()
            .filter(|member| {
                member.role_level == RoleLevel::DivisionHead && member.division == division
            })
            .map(|member| member.user_id.clone())
            .collect())
    }
}

/// Backend seeded with the standard engineering/finance staff roster.
pub(super) fn seeded_backend() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::default());
    backend.add_staff("lead-200", "engineering", "platform", RoleLevel::TeamLeader);
    backend.add_staff("lead-201", "engineering", "mobile", RoleLevel::TeamLeader);
    backend.add_staff("head-300", "engineering", "office", RoleLevel::DivisionHead);
    backend.add_staff("head-301", "engineering", "office", RoleLevel::DivisionHead);
    backend.add_staff("head-400", "finance", "office", RoleLevel::DivisionHead);
    backend
}

pub(super) type MemoryService =
    ApprovalService<MemoryBackend, MemoryBackend, MemoryBackend, MemoryBackend>;

pub(super) fn build_service() -> (Arc<MemoryService>, Arc<MemoryBackend>) {
    let backend = seeded_backend();
    let service = Arc::new(ApprovalService::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        backend.clone(),
    ));
    (service, backend)
}

/// Store double failing every operation, for surface error mapping tests.
pub(super) struct UnavailableBackend;

fn offline<T>() -> Result<T, StoreError> {
    Err(StoreError::Unavailable("database offline".to_string()))
}

impl ApplicationStore for UnavailableBackend {
    fn fetch(&self, _key: &ApplicationKey) -> Result<Option<ApplicationRow>, StoreError> {
        offline()
    }

    fn commit(
        &self,
        _key: &ApplicationKey,
        _expected: ApprovalStatus,
        _batch: TransitionBatch,
    ) -> Result<(), StoreError> {
        offline()
    }

    fn pending(
        &self,
        _application_type: ApplicationType,
        _query: &PendingQuery,
    ) -> Result<Vec<ApplicationRow>, StoreError> {
        offline()
    }
}

impl RejectionLedger for UnavailableBackend {
    fn history(&self, _key: &ApplicationKey) -> Result<Vec<RejectionRecord>, StoreError> {
        offline()
    }

    fn latest(&self, _key: &ApplicationKey) -> Result<Option<RejectionRecord>, StoreError> {
        offline()
    }
}

impl AlarmStore for UnavailableBackend {
    fn insert(&self, _draft: AlarmDraft) -> Result<Alarm, StoreError> {
        offline()
    }

    fn unread(&self, _user_id: &str) -> Result<Vec<Alarm>, StoreError> {
        offline()
    }

    fn all(&self, _user_id: &str) -> Result<Vec<Alarm>, StoreError> {
        offline()
    }

    fn mark_read(&self, _alarm_seq: u64) -> Result<(), StoreError> {
        offline()
    }

    fn mark_all_read(&self, _user_id: &str) -> Result<usize, StoreError> {
        offline()
    }
}

impl ApproverDirectory for UnavailableBackend {
    fn team_leaders(&self, _division: &str, _team: &str) -> Result<Vec<String>, StoreError> {
        offline()
    }

    fn division_heads(&self, _division: &str) -> Result<Vec<String>, StoreError> {
        offline()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
