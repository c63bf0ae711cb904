pub mod audit;
pub mod safe_actions;
