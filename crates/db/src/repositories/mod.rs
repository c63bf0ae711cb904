pub mod action_record_repo;
pub mod approval_repo;
pub mod execution_log_repo;

pub use action_record_repo::ActionRecordRepo;
pub use approval_repo::ApprovalRepo;
pub use execution_log_repo::ExecutionLogRepo;
