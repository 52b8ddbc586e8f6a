pub mod approvals;
