//! Fixed-window execution throttle.
//!
//! Counters are keyed by lower-cased `(tenant, action_type,
//! operation_kind)`; distinct keys never share a counter. The map is
//! guarded by a mutex so check-and-increment is atomic under concurrent
//! callers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Throttle configuration. Disabled by default.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub enabled: bool,
    pub window_secs: u64,
    pub max_attempts: u32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            window_secs: 60,
            max_attempts: 10,
        }
    }
}

/// Outcome of a throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    /// Denied until the current window rolls over; retry hint is >= 1s.
    Denied { retry_after_secs: u64 },
}

impl ThrottleDecision {
    pub fn is_allowed(self) -> bool {
        matches!(self, ThrottleDecision::Allowed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ThrottleKey {
    tenant_id: String,
    action_type: String,
    operation_kind: String,
}

impl ThrottleKey {
    fn new(tenant_id: &str, action_type: &str, operation_kind: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_ascii_lowercase(),
            action_type: action_type.to_ascii_lowercase(),
            operation_kind: operation_kind.to_ascii_lowercase(),
        }
    }
}

/// Per-key counter for one fixed window.
#[derive(Debug, Clone, Copy)]
struct WindowSlot {
    window_index: u64,
    count: u32,
}

/// Fixed-window rate limiter for execute/rollback-execute operations.
#[derive(Debug)]
pub struct ExecutionThrottle {
    config: ThrottleConfig,
    slots: Mutex<HashMap<ThrottleKey, WindowSlot>>,
}

impl ExecutionThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Check-and-increment for the given key at the current wall clock.
    pub fn allow(
        &self,
        tenant_id: &str,
        action_type: &str,
        operation_kind: &str,
    ) -> ThrottleDecision {
        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.allow_at(tenant_id, action_type, operation_kind, now_secs)
    }

    /// Clock-injected variant of [`Self::allow`], used directly by tests.
    pub fn allow_at(
        &self,
        tenant_id: &str,
        action_type: &str,
        operation_kind: &str,
        now_secs: u64,
    ) -> ThrottleDecision {
        if !self.config.enabled {
            return ThrottleDecision::Allowed;
        }

        let window_secs = self.config.window_secs.max(1);
        let window_index = now_secs / window_secs;
        let key = ThrottleKey::new(tenant_id, action_type, operation_kind);

        let mut slots = self.slots.lock().expect("throttle mutex poisoned");
        let slot = slots.entry(key).or_insert(WindowSlot {
            window_index,
            count: 0,
        });

        // Window rolled over since the last attempt: reset the counter.
        if slot.window_index != window_index {
            slot.window_index = window_index;
            slot.count = 0;
        }

        if slot.count < self.config.max_attempts {
            slot.count += 1;
            ThrottleDecision::Allowed
        } else {
            let retry_after_secs = (window_secs - (now_secs % window_secs)).max(1);
            ThrottleDecision::Denied { retry_after_secs }
        }
    }
}
