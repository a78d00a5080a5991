//! Heading-delimited reply parsing.
//!
//! A reply is a sequence of `## <name>` blocks. [`SectionParser::parse`]
//! turns it into a [`SectionMap`]. It never fails: missing sections are
//! logged and the caller decides whether the partial mapping is enough.
//!
//! ```text
//! ## Name                       ┐
//! Attention Is All You Need     ┘ → "Name"     : Text("Attention Is All You Need")
//! ## Keywords                   ┐
//! transformer, attention; nlp   ┘ → "Keywords" : Tags(["transformer", "attention", "nlp"])
//! ```

use crate::output::{SectionMap, SectionValue};
use crate::pipeline::postprocess::clean_reply;
use crate::sections::SectionRegistry;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Separators accepted between tags: ASCII and full-width comma/semicolon
/// plus the Japanese enumeration comma.
static RE_TAG_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[,;，；、]\s*").unwrap());

/// Parses replies against a registry (the registry decides which sections
/// are tag lists).
#[derive(Debug, Clone, Copy)]
pub struct SectionParser<'a> {
    registry: &'a SectionRegistry,
}

impl<'a> SectionParser<'a> {
    pub fn new(registry: &'a SectionRegistry) -> Self {
        Self { registry }
    }

    /// Parse `text` into section name → content.
    ///
    /// - A line whose trimmed start is `##` (but not `###`) opens a section
    ///   named by the rest of the line, trimmed.
    /// - Content is the lines up to the next heading, joined and trimmed.
    ///   Empty content is dropped; so is everything before the first heading.
    /// - If a name occurs twice, the first non-empty block wins.
    /// - Tag-list sections are split into ordered labels.
    ///
    /// Names in `expected` that are absent from the result are logged at
    /// warn level; they do not make the parse fail.
    pub fn parse(&self, text: &str, expected: Option<&[&str]>) -> SectionMap {
        let cleaned = clean_reply(text);
        let mut result = SectionMap::new();
        let mut current: Option<String> = None;
        let mut buffer: Vec<&str> = Vec::new();

        for line in cleaned.lines() {
            if let Some(name) = heading_name(line) {
                if let Some(prev) = current.take() {
                    self.flush(&mut result, prev, &buffer);
                }
                buffer.clear();
                current = Some(name.to_string());
            } else if current.is_some() {
                buffer.push(line);
            }
        }
        if let Some(prev) = current {
            self.flush(&mut result, prev, &buffer);
        }

        debug!("Parsed {} section(s) from {} bytes", result.len(), text.len());

        if let Some(expected) = expected {
            let missing: Vec<&str> = expected
                .iter()
                .copied()
                .filter(|name| !result.contains_key(*name))
                .collect();
            if !missing.is_empty() {
                warn!("Reply is missing expected section(s): {}", missing.join(", "));
            }
        }

        result
    }

    fn flush(&self, result: &mut SectionMap, name: String, lines: &[&str]) {
        if name.is_empty() || result.contains_key(&name) {
            return;
        }
        let content = lines.join("\n").trim().to_string();
        let value = if self.registry.is_tag_list(&name) {
            SectionValue::Tags(split_tags(&content))
        } else {
            SectionValue::Text(content)
        };
        if !value.is_empty() {
            result.insert(name, value);
        }
    }
}

/// Section name if `line` is a level-2 heading.
fn heading_name(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix("##")?;
    if rest.starts_with('#') {
        return None;
    }
    Some(rest.trim())
}

/// Split a tag-list value on commas/semicolons, trimming pieces and dropping
/// empty ones. Leading list markers (`- `, `* `) are removed so a bulleted
/// keyword list also splits cleanly.
pub fn split_tags(content: &str) -> Vec<String> {
    content
        .lines()
        .flat_map(|line| RE_TAG_SEPARATOR.split(line))
        .map(|piece| piece.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::{SectionKind, SectionSpec};

    fn registry() -> SectionRegistry {
        SectionRegistry::new(vec![
            SectionSpec {
                name: "Name".into(),
                instruction: "title".into(),
                kind: SectionKind::Title,
                required: true,
                process_first: true,
                database_property: true,
            },
            SectionSpec::rich_text("A", "a").required(),
            SectionSpec::rich_text("OtherSection", "o"),
            SectionSpec::rich_text("Keywords", "k").kind(SectionKind::TagList),
        ])
        .unwrap()
    }

    fn text(v: &str) -> SectionValue {
        SectionValue::Text(v.to_string())
    }

    #[test]
    fn two_sections_with_trimmed_content() {
        let reg = registry();
        let parser = SectionParser::new(&reg);
        let map = parser.parse(
            "## Name\n  Attention Is All You Need (注意機構がすべて)  \n\n## OtherSection\nline one\nline two\n\n",
            None,
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map["Name"], text("Attention Is All You Need (注意機構がすべて)"));
        assert_eq!(map["OtherSection"], text("line one\nline two"));
    }

    #[test]
    fn reparsing_reconstruction_is_stable() {
        let reg = registry();
        let parser = SectionParser::new(&reg);
        let first = parser.parse("## A\ncontent\n", None);
        let rebuilt: String = first
            .iter()
            .map(|(k, v)| format!("## {}\n{}\n", k, v.to_plain()))
            .collect();
        assert_eq!(parser.parse(&rebuilt, None), first);
        assert_eq!(first["A"], text("content"));
    }

    #[test]
    fn missing_expected_sections_do_not_fail() {
        let reg = registry();
        let parser = SectionParser::new(&reg);
        let map = parser.parse("## A\nonly a", Some(&["A", "OtherSection", "Keywords"]));
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("A"));
    }

    #[test]
    fn no_headings_yields_empty_map() {
        let reg = registry();
        let map = SectionParser::new(&reg).parse("I could not read the paper.", Some(&["Name"]));
        assert!(map.is_empty());
    }

    #[test]
    fn preamble_is_discarded() {
        let reg = registry();
        let map = SectionParser::new(&reg).parse("Sure! Here is the summary.\n## A\nbody", None);
        assert_eq!(map.len(), 1);
        assert_eq!(map["A"], text("body"));
    }

    #[test]
    fn tag_list_is_split_and_trimmed() {
        let reg = registry();
        let map = SectionParser::new(&reg).parse("## Keywords\na, b ,c;d", None);
        assert_eq!(
            map["Keywords"],
            SectionValue::Tags(vec!["a".into(), "b".into(), "c".into(), "d".into()])
        );
    }

    #[test]
    fn tag_list_drops_empty_pieces_and_keeps_duplicates() {
        let reg = registry();
        let map = SectionParser::new(&reg).parse("## Keywords\na,, b;;a ,", None);
        assert_eq!(
            map["Keywords"],
            SectionValue::Tags(vec!["a".into(), "b".into(), "a".into()])
        );
    }

    #[test]
    fn tag_list_accepts_full_width_and_bullets() {
        assert_eq!(split_tags("深層学習、強化学習，NLP"), vec!["深層学習", "強化学習", "NLP"]);
        assert_eq!(split_tags("- a\n- b, c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn empty_section_is_not_resolved() {
        let reg = registry();
        let map = SectionParser::new(&reg).parse("## A\n\n## Keywords\n , ;\n## OtherSection\nx", None);
        assert!(!map.contains_key("A"));
        assert!(!map.contains_key("Keywords"));
        assert_eq!(map["OtherSection"], text("x"));
    }

    #[test]
    fn level_three_headings_stay_in_content() {
        let reg = registry();
        let map = SectionParser::new(&reg).parse("## A\n### Detail\nbody", None);
        assert_eq!(map["A"], text("### Detail\nbody"));
    }

    #[test]
    fn first_block_wins_on_duplicate_heading() {
        let reg = registry();
        let map = SectionParser::new(&reg).parse("## A\nfirst\n## A\nsecond", None);
        assert_eq!(map["A"], text("first"));
    }

    #[test]
    fn fenced_crlf_reply_is_cleaned_first() {
        let reg = registry();
        let map = SectionParser::new(&reg).parse("```markdown\r\n## **Name**\r\nTitle\r\n```", None);
        assert_eq!(map["Name"], text("Title"));
    }

    #[test]
    fn section_content_is_returned_verbatim() {
        let reg = registry();
        let map = SectionParser::new(&reg).parse(
            "## A\nSee ![Figure 1](figure1.png) for details\n\n\n\n\nend\n## OtherSection\nx",
            None,
        );
        assert_eq!(
            map["A"],
            text("See ![Figure 1](figure1.png) for details\n\n\n\n\nend")
        );
        assert_eq!(map["OtherSection"], text("x"));
    }

    #[test]
    fn unknown_headings_are_kept() {
        let reg = registry();
        let map = SectionParser::new(&reg).parse("## Unlisted\nstuff", None);
        assert_eq!(map["Unlisted"], text("stuff"));
    }
}
