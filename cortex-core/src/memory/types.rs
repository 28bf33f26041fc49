use serde::{Deserialize, Serialize};

/// Closed variant for memory categories. Parsing at the adapter boundary
/// rejects unknown values with `invalid_input` rather than accepting
/// arbitrary freeform strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Fact,
    Preference,
    Decision,
    ErrorFix,
    Pattern,
    Workflow,
    Summary,
    Custom,
}

impl MemoryType {
    pub fn as_str(self) -> &'static str {
        match self {
            MemoryType::Fact => "fact",
            MemoryType::Preference => "preference",
            MemoryType::Decision => "decision",
            MemoryType::ErrorFix => "error_fix",
            MemoryType::Pattern => "pattern",
            MemoryType::Workflow => "workflow",
            MemoryType::Summary => "summary",
            MemoryType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "fact" => MemoryType::Fact,
            "preference" => MemoryType::Preference,
            "decision" => MemoryType::Decision,
            "error_fix" => MemoryType::ErrorFix,
            "pattern" => MemoryType::Pattern,
            "workflow" => MemoryType::Workflow,
            "summary" => MemoryType::Summary,
            "custom" => MemoryType::Custom,
            _ => return None,
        })
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for t in [
            MemoryType::Fact,
            MemoryType::Preference,
            MemoryType::Decision,
            MemoryType::ErrorFix,
            MemoryType::Pattern,
            MemoryType::Workflow,
            MemoryType::Summary,
            MemoryType::Custom,
        ] {
            assert_eq!(MemoryType::parse(t.as_str()), Some(t));
        }
    }

    #[test]
    fn rejects_unknown_variant() {
        assert_eq!(MemoryType::parse("nonsense"), None);
    }
}
