use serde::Serialize;

/// How a node hands activation to its children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKind {
    #[default]
    None,
    /// All active children become actionable together
    Parallel,
    /// Only the first active child becomes actionable
    Serial,
}

impl ModifierKind {
    pub fn is_none(self) -> bool {
        self == ModifierKind::None
    }
}

/// Behavioral modifiers parsed from a task's display content
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Modifier {
    pub kind: ModifierKind,
    /// Deferred-date expression from a trailing `{...}` annotation
    pub delay: Option<String>,
}
