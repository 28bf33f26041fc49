use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Semantic label on a directed edge between two memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRelation {
    Related,
    CausedBy,
    DependsOn,
    Supersedes,
    Contradicts,
    DerivedFrom,
    FollowUp,
}

impl LinkRelation {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkRelation::Related => "related",
            LinkRelation::CausedBy => "caused_by",
            LinkRelation::DependsOn => "depends_on",
            LinkRelation::Supersedes => "supersedes",
            LinkRelation::Contradicts => "contradicts",
            LinkRelation::DerivedFrom => "derived_from",
            LinkRelation::FollowUp => "follow_up",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "related" => LinkRelation::Related,
            "caused_by" => LinkRelation::CausedBy,
            "depends_on" => LinkRelation::DependsOn,
            "supersedes" => LinkRelation::Supersedes,
            "contradicts" => LinkRelation::Contradicts,
            "derived_from" => LinkRelation::DerivedFrom,
            "follow_up" => LinkRelation::FollowUp,
            _ => return None,
        })
    }
}

impl Default for LinkRelation {
    fn default() -> Self {
        LinkRelation::Related
    }
}

impl std::fmt::Display for LinkRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed edge `(source_id, target_id, relation)`, unique on that triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub source_id: i64,
    pub target_id: i64,
    pub relation: LinkRelation,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Which edges to traverse relative to a memory when listing its links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
    Both,
}

/// A link plus the content of whichever endpoint isn't the memory the
/// caller asked about — what `links(memory_id, ...)` returns.
#[derive(Debug, Clone, Serialize)]
pub struct LinkedMemory {
    pub link: Link,
    pub content: String,
}
