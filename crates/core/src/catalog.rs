//! Read-only action catalog: the allowlist of remediation verbs.
//!
//! `propose` consults the catalog before any policy check or persistence.
//! An action type that is absent or disabled is denied with
//! `action_type_not_allowed`.

use std::collections::HashMap;

/// Blast-radius classification of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

/// One allowlisted action type.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub enabled: bool,
    pub risk_tier: RiskTier,
}

/// The catalog itself. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ActionCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl ActionCatalog {
    /// Build a catalog from explicit entries. Action type keys are matched
    /// case-sensitively (catalog keys are canonical snake_case verbs).
    pub fn from_entries(entries: impl IntoIterator<Item = (String, CatalogEntry)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// The platform's built-in remediation verbs.
    ///
    /// A fresh deployment gets this allowlist; all of it still executes via
    /// the dry-run executor until per-type executor flags are enabled.
    pub fn builtin() -> Self {
        let entry = |enabled, risk_tier| CatalogEntry { enabled, risk_tier };
        Self::from_entries([
            ("restart_pod".to_string(), entry(true, RiskTier::Medium)),
            ("scale_deployment".to_string(), entry(true, RiskTier::High)),
            ("http_probe".to_string(), entry(true, RiskTier::Low)),
            ("purge_cache".to_string(), entry(true, RiskTier::Medium)),
            ("rotate_log_level".to_string(), entry(true, RiskTier::Low)),
        ])
    }

    /// Look up an action type. Returns the entry only when it exists and is
    /// enabled; a disabled entry is indistinguishable from an absent one.
    pub fn lookup(&self, action_type: &str) -> Option<&CatalogEntry> {
        self.entries.get(action_type).filter(|e| e.enabled)
    }

    /// Whether the action type passes the allowlist gate.
    pub fn is_allowed(&self, action_type: &str) -> bool {
        self.lookup(action_type).is_some()
    }
}
