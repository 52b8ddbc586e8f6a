use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use hr_ops::workflows::approvals::{
    Alarm, AlarmDraft, AlarmStore, ApplicationDetail, ApplicationKey, ApplicationRow,
    ApplicationStore, ApplicationType, ApprovalStatus, ApproverDirectory, PendingQuery,
    RejectionLedger, RejectionRecord, RoleLevel, StoreError, TransitionBatch,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-memory adapter implementing every workflow store trait over one mutex.
///
/// Holding a single lock across `commit` makes the batch atomic and resolves
/// compare-and-swap races exactly as a row-locked SQL adapter would.
#[derive(Default)]
pub(crate) struct InMemoryWorkflowBackend {
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

impl InMemoryWorkflowBackend {
    pub(crate) fn insert_application(&self, row: ApplicationRow) {
        let mut state = self.state.lock().expect("backend mutex poisoned");
        state.applications.insert(row.key, row);
    }

    pub(crate) fn add_staff(
        &self,
        user_id: &str,
        division: &str,
        team: &str,
        role_level: RoleLevel,
    ) {
        let mut state = self.state.lock().expect("backend mutex poisoned");
        state.staff.push(StaffMember {
            user_id: user_id.to_string(),
            division: division.to_string(),
            team: team.to_string(),
            role_level,
        });
    }
}

impl ApplicationStore for InMemoryWorkflowBackend {
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

impl RejectionLedger for InMemoryWorkflowBackend {
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

impl AlarmStore for InMemoryWorkflowBackend {
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

impl ApproverDirectory for InMemoryWorkflowBackend {
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

/// Staff roster and open applications used by the demo and `--seed-demo`.
pub(crate) fn seed_demo_data(backend: &InMemoryWorkflowBackend) {
    backend.add_staff("lead-200", "engineering", "platform", RoleLevel::TeamLeader);
    backend.add_staff("lead-201", "engineering", "mobile", RoleLevel::TeamLeader);
    backend.add_staff("head-300", "engineering", "office", RoleLevel::DivisionHead);
    backend.add_staff("head-400", "finance", "office", RoleLevel::DivisionHead);

    let now = Utc::now();
    backend.insert_application(ApplicationRow {
        key: ApplicationKey::new(ApplicationType::Vacation, 1),
        applicant_id: "emp-100".to_string(),
        division: "engineering".to_string(),
        team: "platform".to_string(),
        status: ApprovalStatus::Submitted,
        submitted_at: now - Duration::hours(30),
        detail: ApplicationDetail::Vacation {
            starts_on: now.date_naive() + Duration::days(21),
            ends_on: now.date_naive() + Duration::days(25),
        },
    });
    backend.insert_application(ApplicationRow {
        key: ApplicationKey::new(ApplicationType::Expense, 1),
        applicant_id: "emp-101".to_string(),
        division: "engineering".to_string(),
        team: "platform".to_string(),
        status: ApprovalStatus::Submitted,
        submitted_at: now - Duration::hours(20),
        detail: ApplicationDetail::Expense {
            amount: 92_500,
            category: "certification exam".to_string(),
        },
    });
    backend.insert_application(ApplicationRow {
        key: ApplicationKey::new(ApplicationType::RentalSupport, 1),
        applicant_id: "emp-100".to_string(),
        division: "engineering".to_string(),
        team: "platform".to_string(),
        status: ApprovalStatus::Submitted,
        submitted_at: now - Duration::hours(10),
        detail: ApplicationDetail::RentalSupport {
            monthly_rent: 850_000,
            support_amount: 300_000,
        },
    });
    backend.insert_application(ApplicationRow {
        key: ApplicationKey::new(ApplicationType::RentalProposal, 1),
        applicant_id: "emp-102".to_string(),
        division: "engineering".to_string(),
        team: "mobile".to_string(),
        status: ApprovalStatus::TeamApproved,
        submitted_at: now - Duration::hours(5),
        detail: ApplicationDetail::RentalProposal {
            address: "21 Harbor View Rd".to_string(),
            monthly_rent: 920_000,
            deposit: 5_000_000,
        },
    });
}
