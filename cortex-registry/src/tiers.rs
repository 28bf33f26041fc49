//! Subscription tier definitions. Grounded on the reference
//! implementation's `TierLimits` dataclass and its three named tiers.

use serde::Serialize;

/// Per-tier resource and feature limits. A limit of `0` means unlimited,
/// matching the reference implementation's convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierLimits {
    pub name: &'static str,
    pub max_memories: u64,
    pub max_storage_mb: u64,
    pub max_namespaces: u64,
    pub requests_per_second: u32,
    pub requests_per_month: u64,
    pub retention_days: u32,
    pub semantic_search: bool,
    pub websocket: bool,
    pub analytics: bool,
    pub webhooks: u32,
    pub max_api_keys: u32,
    pub custom_embeddings: bool,
    pub sso: bool,
    pub audit_logs: bool,
    pub priority_support: bool,
}

pub const FREE: TierLimits = TierLimits {
    name: "free",
    max_memories: 5_000,
    max_storage_mb: 50,
    max_namespaces: 2,
    requests_per_second: 5,
    requests_per_month: 50_000,
    retention_days: 90,
    semantic_search: false,
    websocket: false,
    analytics: false,
    webhooks: 0,
    max_api_keys: 2,
    custom_embeddings: false,
    sso: false,
    audit_logs: false,
    priority_support: false,
};

pub const PRO: TierLimits = TierLimits {
    name: "pro",
    max_memories: 250_000,
    max_storage_mb: 5_000,
    max_namespaces: 25,
    requests_per_second: 50,
    requests_per_month: 5_000_000,
    retention_days: 365,
    semantic_search: true,
    websocket: true,
    analytics: true,
    webhooks: 10,
    max_api_keys: 25,
    custom_embeddings: false,
    sso: false,
    audit_logs: false,
    priority_support: false,
};

pub const ENTERPRISE: TierLimits = TierLimits {
    name: "enterprise",
    max_memories: 0,
    max_storage_mb: 100_000,
    max_namespaces: 0,
    requests_per_second: 200,
    requests_per_month: 0,
    retention_days: 0,
    semantic_search: true,
    websocket: true,
    analytics: true,
    webhooks: 0,
    max_api_keys: 0,
    custom_embeddings: true,
    sso: true,
    audit_logs: true,
    priority_support: true,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    Pro,
    Enterprise,
}

impl Tier {
    pub fn limits(self) -> TierLimits {
        match self {
            Tier::Free => FREE,
            Tier::Pro => PRO,
            Tier::Enterprise => ENTERPRISE,
        }
    }

    pub fn parse(name: &str) -> Tier {
        match name {
            "pro" => Tier::Pro,
            "enterprise" => Tier::Enterprise,
            _ => Tier::Free,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tier_name_falls_back_to_free() {
        assert_eq!(Tier::parse("nonexistent"), Tier::Free);
    }

    #[test]
    fn enterprise_has_no_memory_cap() {
        assert_eq!(Tier::Enterprise.limits().max_memories, 0);
    }

    #[test]
    fn only_free_tier_lacks_semantic_search() {
        assert!(!Tier::Free.limits().semantic_search);
        assert!(Tier::Pro.limits().semantic_search);
        assert!(Tier::Enterprise.limits().semantic_search);
    }
}
