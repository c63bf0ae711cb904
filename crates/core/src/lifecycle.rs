//! Safe action lifecycle state machine.
//!
//! Two independent, monotonic status tracks evolve on every action record:
//! the execution track ([`ActionStatus`]) and the rollback track
//! ([`RollbackStatus`]). Each enum variant's discriminant matches the
//! 1-based seed order of the corresponding `*_statuses` lookup table.
//!
//! Transitions are pure functions returning
//! `Result<NewState, TransitionError>`; the repository layer enforces the
//! same transition again via an optimistic version check on save, which is
//! the serialization point that prevents two concurrent callers from both
//! passing the replay guard.

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Human/wire-facing status name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Convert a database status ID back into the enum.
            pub fn from_id(id: StatusId) -> Option<Self> {
                match id {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }

            /// Parse a status from its wire name (case-insensitive) or its
            /// numeric ID. Used by list-query filter parsing.
            pub fn parse(value: &str) -> Option<Self> {
                if let Ok(id) = value.parse::<StatusId>() {
                    return Self::from_id(id);
                }
                let lower = value.to_ascii_lowercase();
                match lower.as_str() {
                    $( $label => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Execution track of a safe action record.
    ActionStatus {
        Proposed = 1 => "proposed",
        Approved = 2 => "approved",
        Rejected = 3 => "rejected",
        Executing = 4 => "executing",
        Completed = 5 => "completed",
        Failed = 6 => "failed",
    }
}

define_status_enum! {
    /// Rollback track of a safe action record.
    RollbackStatus {
        None = 1 => "none",
        Available = 2 => "available",
        Requested = 3 => "requested",
        Approved = 4 => "rollback_approved",
        RollingBack = 5 => "rolling_back",
        RolledBack = 6 => "rolled_back",
        RollbackFailed = 7 => "rollback_failed",
    }
}

/// A transition was attempted from a state it is not legal in.
///
/// Carries the operation name plus current-vs-expected states so the
/// conflict response and logs can show exactly what was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot {operation}: record is {current}, expected {expected}")]
pub struct TransitionError {
    pub operation: &'static str,
    pub current: &'static str,
    pub expected: &'static str,
}

impl TransitionError {
    fn new(operation: &'static str, current: &'static str, expected: &'static str) -> Self {
        Self {
            operation,
            current,
            expected,
        }
    }
}

/// Approve a proposed action. Only legal from `Proposed`.
pub fn approve(current: ActionStatus) -> Result<ActionStatus, TransitionError> {
    match current {
        ActionStatus::Proposed => Ok(ActionStatus::Approved),
        other => Err(TransitionError::new("approve", other.as_str(), "proposed")),
    }
}

/// Reject a proposed action. Only legal from `Proposed`.
pub fn reject(current: ActionStatus) -> Result<ActionStatus, TransitionError> {
    match current {
        ActionStatus::Proposed => Ok(ActionStatus::Rejected),
        other => Err(TransitionError::new("reject", other.as_str(), "proposed")),
    }
}

/// Replay guard: execution may only start from `Approved`.
pub fn begin_execute(current: ActionStatus) -> Result<ActionStatus, TransitionError> {
    match current {
        ActionStatus::Approved => Ok(ActionStatus::Executing),
        other => Err(TransitionError::new("execute", other.as_str(), "approved")),
    }
}

/// Terminal execution transition based on executor success.
pub fn finish_execute(
    current: ActionStatus,
    success: bool,
) -> Result<ActionStatus, TransitionError> {
    match current {
        ActionStatus::Executing if success => Ok(ActionStatus::Completed),
        ActionStatus::Executing => Ok(ActionStatus::Failed),
        other => Err(TransitionError::new(
            "finish execution",
            other.as_str(),
            "executing",
        )),
    }
}

/// Request a rollback.
///
/// Legal for any record past approval (the action must have been cleared to
/// run before undoing it makes sense) whose rollback track has not already
/// advanced past `Available`.
pub fn request_rollback(
    status: ActionStatus,
    rollback: RollbackStatus,
) -> Result<RollbackStatus, TransitionError> {
    match status {
        ActionStatus::Proposed | ActionStatus::Rejected => {
            return Err(TransitionError::new(
                "request rollback",
                status.as_str(),
                "approved or later",
            ));
        }
        _ => {}
    }
    match rollback {
        RollbackStatus::None | RollbackStatus::Available => Ok(RollbackStatus::Requested),
        other => Err(TransitionError::new(
            "request rollback",
            other.as_str(),
            "none or available",
        )),
    }
}

/// Approve a requested rollback. Only legal from rollback `Requested`.
pub fn approve_rollback(current: RollbackStatus) -> Result<RollbackStatus, TransitionError> {
    match current {
        RollbackStatus::Requested => Ok(RollbackStatus::Approved),
        other => Err(TransitionError::new(
            "approve rollback",
            other.as_str(),
            "requested",
        )),
    }
}

/// Replay guard for the rollback track: rollback execution may only start
/// from rollback `Approved`.
pub fn begin_rollback_execute(
    current: RollbackStatus,
) -> Result<RollbackStatus, TransitionError> {
    match current {
        RollbackStatus::Approved => Ok(RollbackStatus::RollingBack),
        other => Err(TransitionError::new(
            "execute rollback",
            other.as_str(),
            "rollback_approved",
        )),
    }
}

/// Terminal rollback transition based on executor success.
pub fn finish_rollback_execute(
    current: RollbackStatus,
    success: bool,
) -> Result<RollbackStatus, TransitionError> {
    match current {
        RollbackStatus::RollingBack if success => Ok(RollbackStatus::RolledBack),
        RollbackStatus::RollingBack => Ok(RollbackStatus::RollbackFailed),
        other => Err(TransitionError::new(
            "finish rollback",
            other.as_str(),
            "rolling_back",
        )),
    }
}
