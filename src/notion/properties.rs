//! Typed page properties for database-backed sections.

use crate::notion::blocks::{rich_text_json, RichText};
use crate::output::{SectionMap, SectionValue};
use crate::sections::{SectionKind, SectionRegistry};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::debug;

/// Property name → Notion property value, as sent in `POST /pages`.
pub type PageProperties = Map<String, Value>;

/// Maximum characters of a multi_select option name.
pub const TAG_LIMIT: usize = 100;

/// Build the properties object for every resolved section flagged as a
/// database property. Unresolved sections are left out rather than sent empty.
pub fn build_properties(registry: &SectionRegistry, sections: &SectionMap) -> PageProperties {
    let mut properties = PageProperties::new();
    for spec in registry.database_properties() {
        let Some(value) = sections.get(&spec.name) else {
            debug!("Property '{}' unresolved, omitted", spec.name);
            continue;
        };
        let property = match spec.kind {
            SectionKind::Title => json!({ "title": text_runs(&value.to_plain()) }),
            SectionKind::TagList => {
                let tags = match value {
                    SectionValue::Tags(tags) => sanitize_tags(tags),
                    SectionValue::Text(text) => sanitize_tags(&crate::parser::split_tags(text)),
                };
                let options: Vec<Value> = tags.iter().map(|t| json!({ "name": t })).collect();
                json!({ "multi_select": options })
            }
            SectionKind::RichText => json!({ "rich_text": text_runs(&value.to_plain()) }),
        };
        properties.insert(spec.name.clone(), property);
    }
    properties
}

fn text_runs(text: &str) -> Value {
    rich_text_json(&[RichText::plain(text.trim())])
}

/// Trim, cap at [`TAG_LIMIT`] characters, drop empties and drop
/// case-insensitive duplicates (first spelling wins).
///
/// Commas are replaced because Notion rejects them in option names.
pub fn sanitize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(tags.len());
    for tag in tags {
        let cleaned: String = tag.trim().replace(',', " ").chars().take(TAG_LIMIT).collect();
        let cleaned = cleaned.trim().to_string();
        if cleaned.is_empty() {
            continue;
        }
        if seen.insert(cleaned.to_lowercase()) {
            out.push(cleaned);
        }
    }
    out
}
