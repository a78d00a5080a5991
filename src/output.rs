//! Result types produced by a summary run and a publish attempt.

use crate::error::GenerationFailure;
use crate::sections::{SectionKind, SectionRegistry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Resolved content of one section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionValue {
    /// Free text (title and rich-text sections).
    Text(String),
    /// Ordered labels (tag-list sections).
    Tags(Vec<String>),
}

impl SectionValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SectionValue::Text(s) => Some(s),
            SectionValue::Tags(_) => None,
        }
    }

    pub fn as_tags(&self) -> Option<&[String]> {
        match self {
            SectionValue::Tags(t) => Some(t),
            SectionValue::Text(_) => None,
        }
    }

    /// A value with no content never counts as resolved.
    pub fn is_empty(&self) -> bool {
        match self {
            SectionValue::Text(s) => s.trim().is_empty(),
            SectionValue::Tags(t) => t.is_empty(),
        }
    }

    /// Flatten to a single string; tags are joined with `", "`.
    pub fn to_plain(&self) -> String {
        match self {
            SectionValue::Text(s) => s.clone(),
            SectionValue::Tags(t) => t.join(", "),
        }
    }
}

/// Section name → resolved content. Only resolved sections appear as keys.
pub type SectionMap = BTreeMap<String, SectionValue>;

/// One phase of the round protocol, used to label token counts and
/// progress events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Round {
    Title,
    Bulk,
    /// Targeted retry for a single missing section.
    Section(String),
}

impl Round {
    /// Key under which the round's input tokens are accumulated.
    pub fn label(&self) -> String {
        match self {
            Round::Title => "title".to_string(),
            Round::Bulk => "bulk".to_string(),
            Round::Section(name) => format!("retry:{name}"),
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Round::Title => write!(f, "title round"),
            Round::Bulk => write!(f, "bulk round"),
            Round::Section(name) => write!(f, "retry for '{name}'"),
        }
    }
}

/// Input-token counts per round label. Purely observational.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAccounting {
    rounds: BTreeMap<String, u64>,
}

impl TokenAccounting {
    /// Add `tokens` to the round's running total.
    pub fn record(&mut self, round: &Round, tokens: u64) {
        *self.rounds.entry(round.label()).or_insert(0) += tokens;
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.rounds.get(label).copied()
    }

    pub fn total(&self) -> u64 {
        self.rounds.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.rounds.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Output of a successful round protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResult {
    /// Model identifier the run used.
    pub model: String,
    /// Every resolved section, title included.
    pub sections: SectionMap,
    pub token_info: TokenAccounting,
    /// Number of `generate` calls issued, successful or not.
    pub oracle_calls: u32,
}

impl SummaryResult {
    pub fn get(&self, name: &str) -> Option<&SectionValue> {
        self.sections.get(name)
    }

    /// The resolved title, if the registry's title section is present.
    pub fn title<'a>(&'a self, registry: &SectionRegistry) -> Option<&'a str> {
        self.get(&registry.title().name).and_then(SectionValue::as_text)
    }

    /// Render as a heading-delimited document in registry order.
    ///
    /// The title becomes a level-1 heading; every other resolved section a
    /// `## <name>` block, so the output parses back into the same mapping
    /// minus the title.
    pub fn to_markdown(&self, registry: &SectionRegistry) -> String {
        let mut out = String::new();
        if let Some(title) = self.title(registry) {
            out.push_str(&format!("# {}\n\n", title.trim()));
        }
        for spec in registry.specs() {
            if spec.kind == SectionKind::Title {
                continue;
            }
            if let Some(value) = self.sections.get(&spec.name) {
                out.push_str(&format!("## {}\n{}\n\n", spec.name, value.to_plain().trim()));
            }
        }
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
        out
    }
}

/// What a successful publish produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    pub page_id: String,
    /// Total body blocks submitted.
    pub blocks: usize,
    /// Calls used to submit them (page create + appends).
    pub chunks: usize,
}

/// Tri-state result of [`crate::summarize_and_publish`].
///
/// Callers must tell the three shapes apart: a failed generation never
/// touched the document service, a failed publish may have left a partial
/// page behind (`page_id` is then `Some`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    GenerationFailed {
        failure: GenerationFailure,
    },
    PublishFailed {
        reason: String,
        page_id: Option<String>,
    },
    Success {
        page_id: String,
        token_info: TokenAccounting,
        blocks: usize,
        chunks: usize,
    },
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }

    pub fn page_id(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Success { page_id, .. } => Some(page_id),
            PipelineOutcome::PublishFailed { page_id, .. } => page_id.as_deref(),
            PipelineOutcome::GenerationFailed { .. } => None,
        }
    }

    pub(crate) fn success(receipt: PublishReceipt, token_info: TokenAccounting) -> Self {
        PipelineOutcome::Success {
            page_id: receipt.page_id,
            token_info,
            blocks: receipt.blocks,
            chunks: receipt.chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_labels() {
        assert_eq!(Round::Title.label(), "title");
        assert_eq!(Round::Bulk.label(), "bulk");
        assert_eq!(Round::Section("課題は？".into()).label(), "retry:課題は？");
    }

    #[test]
    fn token_accounting_accumulates_per_round() {
        let mut t = TokenAccounting::default();
        t.record(&Round::Title, 100);
        t.record(&Round::Title, 50);
        t.record(&Round::Bulk, 1000);
        assert_eq!(t.get("title"), Some(150));
        assert_eq!(t.get("bulk"), Some(1000));
        assert_eq!(t.get("retry:x"), None);
        assert_eq!(t.total(), 1150);
    }

    #[test]
    fn token_accounting_serialises_as_map() {
        let mut t = TokenAccounting::default();
        t.record(&Round::Bulk, 7);
        assert_eq!(serde_json::to_string(&t).unwrap(), r#"{"bulk":7}"#);
    }

    #[test]
    fn empty_values() {
        assert!(SectionValue::Text("  \n".into()).is_empty());
        assert!(SectionValue::Tags(vec![]).is_empty());
        assert!(!SectionValue::Tags(vec!["a".into()]).is_empty());
    }

    #[test]
    fn tags_flatten_with_commas() {
        let v = SectionValue::Tags(vec!["a".into(), "b".into()]);
        assert_eq!(v.to_plain(), "a, b");
        assert_eq!(v.as_text(), None);
    }

    #[test]
    fn outcome_serialises_with_status_tag() {
        let o = PipelineOutcome::PublishFailed {
            reason: "boom".into(),
            page_id: None,
        };
        let json = serde_json::to_value(&o).unwrap();
        assert_eq!(json["status"], "publish_failed");
        assert_eq!(json["reason"], "boom");
        assert!(!o.is_success());
    }

    #[test]
    fn markdown_follows_registry_order() {
        let registry = SectionRegistry::default();
        let mut sections = SectionMap::new();
        sections.insert("Keywords".into(), SectionValue::Tags(vec!["nlp".into(), "rl".into()]));
        sections.insert("Name".into(), SectionValue::Text("Paper (論文)".into()));
        sections.insert("どんな研究？".into(), SectionValue::Text("研究".into()));
        let result = SummaryResult {
            model: "m".into(),
            sections,
            token_info: TokenAccounting::default(),
            oracle_calls: 2,
        };
        let md = result.to_markdown(&registry);
        assert!(md.starts_with("# Paper (論文)\n\n## どんな研究？\n研究\n\n## Keywords\nnlp, rl"));
        assert!(md.ends_with("rl\n"));
    }
}
