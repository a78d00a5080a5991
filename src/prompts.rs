//! Prompt construction for the section-extraction rounds.
//!
//! Every prompt the orchestrator sends is built here so the wording of the
//! round protocol lives in one place and can be inspected by unit tests
//! without calling a model.
//!
//! Two shapes exist:
//!
//! - the **title-only** prompt, a fixed and tightly constrained instruction
//!   that must yield exactly one `## Name` heading followed by the title line
//! - the **section** prompt, one `## <name>` block per requested section with
//!   that section's instruction underneath, in registry order

use crate::sections::SectionRegistry;

/// System instruction sent alongside every generation call.
pub const SYSTEM_PROMPT: &str = "あなたは優秀な研究者です。与えられた論文を読み、指示された項目ごとに日本語で要約してください。
各項目は必ず「## 項目名」という見出し行で始め、見出しの次の行から内容を書いてください。
見出しの項目名は指示と一字一句同じにしてください。指示されていない見出しや前置き、後書きは出力しないでください。";

/// Title-only instruction. It doubles as the instruction of the built-in
/// `Name` section.
pub const TITLE_PROMPT: &str = "Extract the paper title and translate it to Japanese.
Output in the following format only, nothing else:

## Name
[Original English Title] ([Japanese Translation])

Example:
## Name
Attention Is All You Need (注意機構がすべて)

Rules:
1. Keep the original English title exactly as written in the paper
2. Japanese translation should be in parentheses
3. Do not include any other information
4. Do not include paper authors, dates, or other metadata
5. Must start with '## Name'";

/// Opening line of every multi-section prompt.
const SECTIONS_HEADER: &str = "以下の各項目について、論文の内容を日本語で要約してください。\
出力は項目ごとに「## 項目名」の見出しで始めてください。";

/// Build a prompt.
///
/// With `title_only` set, the registry's title instruction is returned
/// verbatim and `sections` is ignored. Otherwise one block per requested
/// section is emitted; `None` requests the whole registry. Unknown names in
/// `sections` are skipped, and the output order always follows the registry.
pub fn build_prompt(
    registry: &SectionRegistry,
    sections: Option<&[&str]>,
    title_only: bool,
) -> String {
    if title_only {
        return registry.title().instruction.clone();
    }

    let mut prompt = String::from(SECTIONS_HEADER);
    prompt.push_str("\n\n");

    let blocks: Vec<String> = registry
        .specs()
        .iter()
        .filter(|spec| sections.is_none_or(|wanted| wanted.contains(&spec.name.as_str())))
        .map(|spec| format!("## {}\n{}", spec.name, spec.instruction))
        .collect();

    prompt.push_str(&blocks.join("\n\n"));
    prompt.push('\n');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::{SectionKind, SectionSpec, KEYWORDS_SECTION, TITLE_SECTION};

    fn small_registry() -> SectionRegistry {
        SectionRegistry::new(vec![
            SectionSpec {
                name: "Title".into(),
                instruction: "give the title".into(),
                kind: SectionKind::Title,
                required: true,
                process_first: true,
                database_property: true,
            },
            SectionSpec::rich_text("A", "describe a").required(),
            SectionSpec::rich_text("B", "describe b"),
            SectionSpec::rich_text("C", "describe c").required(),
        ])
        .unwrap()
    }

    #[test]
    fn title_only_returns_title_instruction() {
        let reg = small_registry();
        assert_eq!(build_prompt(&reg, Some(&["A"]), true), "give the title");
    }

    #[test]
    fn default_title_prompt_demands_name_heading() {
        let reg = SectionRegistry::default();
        let prompt = build_prompt(&reg, None, true);
        assert!(prompt.contains("## Name"));
        assert!(prompt.contains("Must start with '## Name'"));
        assert_eq!(reg.title().name, TITLE_SECTION);
    }

    #[test]
    fn full_registry_when_no_subset() {
        let reg = small_registry();
        let prompt = build_prompt(&reg, None, false);
        assert!(prompt.contains("## Title\ngive the title"));
        assert!(prompt.contains("## A\ndescribe a"));
        assert!(prompt.contains("## B\ndescribe b"));
        assert!(prompt.contains("## C\ndescribe c"));
    }

    #[test]
    fn subset_follows_registry_order() {
        let reg = small_registry();
        // Requested out of order; emitted in registry order.
        let prompt = build_prompt(&reg, Some(&["C", "A"]), false);
        let a = prompt.find("## A").unwrap();
        let c = prompt.find("## C").unwrap();
        assert!(a < c);
        assert!(!prompt.contains("## B"));
        assert!(!prompt.contains("## Title"));
    }

    #[test]
    fn unknown_names_are_skipped() {
        let reg = small_registry();
        let prompt = build_prompt(&reg, Some(&["Z", "B"]), false);
        assert!(prompt.contains("## B"));
        assert!(!prompt.contains("## Z"));
    }

    #[test]
    fn keyword_instruction_reaches_prompt() {
        let reg = SectionRegistry::default();
        let prompt = build_prompt(&reg, Some(&[KEYWORDS_SECTION]), false);
        assert!(prompt.contains("## Keywords\nList 3-5 important technical keywords"));
    }
}
