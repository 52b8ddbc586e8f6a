use crate::infra::{seed_demo_data, InMemoryWorkflowBackend};
use clap::Args;
use hr_ops::error::AppError;
use hr_ops::workflows::approvals::{
    Actor, ApplicationKey, ApplicationType, ApprovalService, PendingApprovalView, RoleLevel,
    TransitionAction,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the role-scoped pending-queue listings in the output
    #[arg(long)]
    pub(crate) skip_listings: bool,
}

type DemoService = Arc<
    ApprovalService<
        InMemoryWorkflowBackend,
        InMemoryWorkflowBackend,
        InMemoryWorkflowBackend,
        InMemoryWorkflowBackend,
    >,
>;

fn demo_actors() -> (Actor, Actor, Actor) {
    let applicant = Actor {
        user_id: "emp-100".to_string(),
        division: "engineering".to_string(),
        team: "platform".to_string(),
        role_level: RoleLevel::None,
    };
    let team_leader = Actor {
        user_id: "lead-200".to_string(),
        division: "engineering".to_string(),
        team: "platform".to_string(),
        role_level: RoleLevel::TeamLeader,
    };
    let division_head = Actor {
        user_id: "head-300".to_string(),
        division: "engineering".to_string(),
        team: "office".to_string(),
        role_level: RoleLevel::DivisionHead,
    };
    (applicant, team_leader, division_head)
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let backend = Arc::new(InMemoryWorkflowBackend::default());
    seed_demo_data(&backend);
    let service: DemoService = Arc::new(ApprovalService::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        backend,
    ));

    let (applicant, team_leader, division_head) = demo_actors();

    println!("Approval workflow demo");

    if !args.skip_listings {
        println!("\nPending queues by role");
        let leader_view = service.pending(&team_leader)?;
        print_pending("team leader lead-200", &leader_view);
        let head_view = service.pending(&division_head)?;
        print_pending("division head head-300", &head_view);
    }

    let key = ApplicationKey::new(ApplicationType::Vacation, 1);
    println!("\nWalking {key} through the chain");

    let status = service.transition(&key, &team_leader, TransitionAction::Approve, None)?;
    println!("- team leader approved -> {status}");

    let status = service.transition(
        &key,
        &division_head,
        TransitionAction::Reject,
        Some("overlaps the release window"),
    )?;
    println!("- division head rejected -> {status}");

    let latest = service.latest_rejection(&key)?;
    if let Some(record) = latest {
        println!(
            "  current reason on file: \"{}\" ({})",
            record.reason, record.level
        );
    }

    let status = service.resubmit(&key, &applicant)?;
    println!("- applicant resubmitted -> {status}");

    let status = service.transition(&key, &team_leader, TransitionAction::Approve, None)?;
    println!("- team leader approved again -> {status}");

    let status = service.transition(&key, &division_head, TransitionAction::Approve, None)?;
    println!("- division head approved -> {status} (final)");

    let history = service.rejection_history(&key)?;
    println!(
        "\nRejection ledger still holds {} record(s) for {key}",
        history.len()
    );

    let unread = service.list_unread_alarms(&applicant.user_id)?;
    println!("\nUnread alarms for {}", applicant.user_id);
    for alarm in &unread {
        println!("- [{}] {} -> {}", alarm.alarm_type, alarm.message, alarm.redirect_url);
    }

    let marked = service.mark_all_alarms_read(&applicant.user_id)?;
    println!("Marked {marked} alarm(s) read");

    Ok(())
}

fn print_pending(who: &str, view: &PendingApprovalView) {
    println!(
        "- {}: vacation {} | expense {} | rental support {} | rental proposal {}",
        who,
        view.vacation.total_count,
        view.expense.total_count,
        view.rental_support.total_count,
        view.rental_proposal.total_count
    );
}
