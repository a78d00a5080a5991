//! Post-processing: deterministic cleanup of oracle replies before parsing.
//!
//! ## Why is post-processing necessary?
//!
//! Even well-prompted models occasionally wrap or decorate a reply in ways
//! that are harmless to a human reader but break heading detection:
//!
//! - Wrapping the whole reply in ` ```markdown ... ``` ` fences
//! - Emphasising headings (`## **Keywords**`) or adding a trailing colon
//! - Using Windows-style `\r\n` line endings
//! - Inserting zero-width characters in the middle of a section name
//!
//! The rules here fix those quirks and leave section text as the model wrote
//! it, so the parser can stay a plain line scanner. Lines that are not `##`
//! headings pass through unchanged.
//!
//! ## Rule Order
//!
//! Fences are stripped first because the fence regex anchors on the raw
//! reply. Line endings and invisible characters are normalised before any
//! line-based rule runs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw reply.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Unwrap decorated `##` headings
pub fn clean_reply(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    unwrap_decorated_headings(&s)
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Unwrap decorated headings ────────────────────────────────────────
//
// `## **Keywords**`, `## Keywords:` and `## 「Keywords」` all mean the section
// `Keywords`. Only level-2 headings are touched; deeper headings belong to
// section content.

static RE_DECORATED_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*##)[ \t]+(?:\*\*|__)?「?(.+?)」?(?:\*\*|__)?[ \t]*[:：]?[ \t]*$").unwrap()
});

fn unwrap_decorated_headings(input: &str) -> String {
    input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with("###") {
                return line.to_string();
            }
            match RE_DECORATED_HEADING.captures(line) {
                Some(caps) => format!("{} {}", &caps[1], caps[2].trim()),
                None => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```markdown\n## Name\nAttention\n```";
        assert_eq!(strip_markdown_fences(input), "## Name\nAttention");
    }

    #[test]
    fn test_strip_fences_md_tag() {
        let input = "```md\n## Name\nAttention\n```";
        assert_eq!(strip_markdown_fences(input), "## Name\nAttention");
    }

    #[test]
    fn test_no_fences_passthrough() {
        let input = "## Name\nAttention";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_inner_code_fence_untouched() {
        let input = "## 手法のキモは？\n```python\nx = 1\n```\n本文";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "Key\u{200B}words\u{FEFF}";
        assert_eq!(remove_invisible_chars(input), "Keywords");
    }

    #[test]
    fn test_unwrap_bold_heading() {
        assert_eq!(unwrap_decorated_headings("## **Keywords**"), "## Keywords");
    }

    #[test]
    fn test_unwrap_colon_heading() {
        assert_eq!(unwrap_decorated_headings("## 課題は？："), "## 課題は？");
        assert_eq!(unwrap_decorated_headings("## Name:"), "## Name");
    }

    #[test]
    fn test_deeper_headings_untouched() {
        let input = "### **Detail**:";
        assert_eq!(unwrap_decorated_headings(input), input);
    }

    #[test]
    fn test_clean_reply_full_pipeline() {
        let input = "```markdown\r\n## **Name**\r\nAttention Is All You Need   \r\n\r\n\r\n\r\n\r\n## Keywords:\r\na, b\r\n```";
        let result = clean_reply(input);
        assert_eq!(
            result,
            "## Name\nAttention Is All You Need   \n\n\n\n\n## Keywords\na, b"
        );
    }

    #[test]
    fn test_content_lines_untouched() {
        let input = "## Figures\nSee ![Figure 1](figure1.png) for details\n\n\n\n\nend  ";
        assert_eq!(clean_reply(input), input);
    }
}
