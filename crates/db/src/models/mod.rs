pub mod action_record;
pub mod approval;
pub mod execution_log;
