//! Regex patterns for memory extraction. Grounded on the reference
//! implementation's pattern tables.

use cortex_core::memory::MemoryType;

/// One candidate regex per memory type, in priority order: the first type
/// with a matching pattern wins a given sentence.
pub fn importance_patterns() -> Vec<(MemoryType, Vec<&'static str>)> {
    vec![
        (
            MemoryType::Preference,
            vec![
                r"(?i)(?:i |user )(?:prefer|like|want|always|never|hate)",
                r"(?i)(?:my |the )(?:style|preference|approach)",
                r"(?i)(?:don't|do not) (?:use|want|like)",
            ],
        ),
        (
            MemoryType::Decision,
            vec![
                r"(?i)(?:decided|choosing|going with|picked|selected)",
                r"(?i)(?:the plan is|we will|let's go with)",
                r"(?i)(?:agreed|confirmed|approved)",
            ],
        ),
        (
            MemoryType::Fact,
            vec![
                r"(?i)(?:the |this )(?:project|codebase|repo|app)",
                r"(?i)(?:uses|requires|depends on|built with)",
                r"(?i)(?:architecture|structure|pattern)",
            ],
        ),
        (
            MemoryType::ErrorFix,
            vec![
                r"(?i)(?:fixed|solved|resolved) (?:by|with|using)",
                r"(?i)(?:the (?:bug|error|issue) was)",
                r"(?i)(?:solution|workaround|fix):?",
            ],
        ),
        (
            MemoryType::Pattern,
            vec![
                r"(?i)(?:always|never|must) (?:use|call|import)",
                r"(?i)(?:naming convention|code style)",
                r"(?i)(?:this function|this class|this module)",
            ],
        ),
    ]
}

/// Floor importance per memory type: an extracted sentence is never scored
/// below its type's baseline significance.
pub fn type_weight(memory_type: MemoryType) -> i32 {
    match memory_type {
        MemoryType::Preference => 8,
        MemoryType::Decision => 7,
        MemoryType::ErrorFix => 7,
        MemoryType::Fact => 6,
        MemoryType::Pattern => 6,
        MemoryType::Summary => 5,
        _ => 5,
    }
}

/// Words whose presence in a sentence bump its importance — the author is
/// signaling this is a hard constraint, not a passing remark.
pub const HIGH_INDICATORS: &[&str] = &["always", "never", "must", "critical", "important", "key"];
