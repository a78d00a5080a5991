//! Model-reply markdown → Notion blocks.
//!
//! Section bodies come back as loose markdown. This module maps the subset
//! the model actually produces onto block types, one line at a time:
//!
//! | Line                         | Block                 |
//! |------------------------------|-----------------------|
//! | `$$ … $$` (one or more lines) | equation              |
//! | `---`, `***`, `___`          | divider               |
//! | `#`, `##`, `###` + space     | heading 1-3           |
//! | `- `, `* `, `+ `             | bulleted list item    |
//! | `1. `, `1) `                 | numbered list item    |
//! | `> `                         | callout               |
//! | anything else                | paragraph             |
//!
//! Nested lists are flattened. Inline `**bold**`, `*italic*`, `***both***`,
//! `$x$` and `$$x$$` become styled runs via [`parse_inline`].

use crate::notion::blocks::{Annotations, Block, RichText};
use once_cell::sync::Lazy;
use regex::Regex;

/// Emoji used for `>` quotes rendered as callouts.
pub const QUOTE_EMOJI: &str = "💡";

static DIVIDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(-{3,}|\*{3,}|_{3,})$").unwrap());

static NUMBERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[.)]\s+(.*)$").unwrap());

/// Convert a markdown body into blocks. Blank lines are dropped.
pub fn markdown_to_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut equation: Option<Vec<&str>> = None;

    for raw in text.lines() {
        let line = raw.trim();

        if let Some(lines) = equation.as_mut() {
            match line.strip_suffix("$$") {
                Some(last) => {
                    lines.push(last);
                    push_equation(&mut blocks, lines);
                    equation = None;
                }
                None => lines.push(line),
            }
            continue;
        }

        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("$$") {
            match rest.strip_suffix("$$") {
                Some(expr) => push_equation(&mut blocks, &[expr]),
                None => equation = Some(vec![rest]),
            }
            continue;
        }

        if DIVIDER.is_match(line) {
            blocks.push(Block::Divider);
        } else if let Some((level, rest)) = heading(line) {
            blocks.push(Block::Heading {
                level,
                text: parse_inline(rest),
            });
        } else if let Some(rest) = bullet(line) {
            blocks.push(Block::BulletedItem(parse_inline(rest)));
        } else if let Some(caps) = NUMBERED.captures(line) {
            let rest = caps.get(1).map_or("", |m| m.as_str());
            blocks.push(Block::NumberedItem(parse_inline(rest)));
        } else if let Some(rest) = line.strip_prefix('>') {
            let rest = rest.trim_start();
            if !rest.is_empty() {
                blocks.push(Block::Callout {
                    text: parse_inline(rest),
                    emoji: QUOTE_EMOJI.to_string(),
                });
            }
        } else {
            blocks.push(Block::Paragraph(parse_inline(line)));
        }
    }

    // Unterminated block equation: keep what was collected.
    if let Some(lines) = equation {
        push_equation(&mut blocks, &lines);
    }
    blocks
}

fn push_equation(blocks: &mut Vec<Block>, lines: &[&str]) {
    let expr = lines.join("\n");
    let expr = expr.trim();
    if !expr.is_empty() {
        blocks.push(Block::Equation(expr.to_string()));
    }
}

fn heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 {
        return None;
    }
    let rest = line[hashes..].strip_prefix(' ')?;
    let level = hashes.min(3) as u8;
    Some((level, rest.trim()))
}

fn bullet(line: &str) -> Option<&str> {
    ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .map(str::trim_start)
}

#[derive(Clone, Copy)]
enum Inline {
    Styled(Annotations),
    Equation,
}

/// Tried in order at every position; longer markers first.
const MARKERS: [(&str, Inline); 5] = [
    ("***", Inline::Styled(Annotations::BOLD_ITALIC)),
    ("**", Inline::Styled(Annotations::BOLD)),
    ("$$", Inline::Equation),
    ("$", Inline::Equation),
    ("*", Inline::Styled(Annotations::ITALIC)),
];

/// Tokenize one line into styled runs.
///
/// A marker only opens a span when the same marker closes it later on the
/// line and the enclosed text is non-empty with no whitespace at either end.
/// Anything else is kept as literal text, so `2 * 3 * 4` stays intact.
pub fn parse_inline(line: &str) -> Vec<RichText> {
    let mut runs = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    'scan: while i < line.len() {
        let rest = &line[i..];
        for (marker, style) in MARKERS {
            if let Some(inner) = enclosed(rest, marker) {
                if !plain.is_empty() {
                    runs.push(RichText::plain(std::mem::take(&mut plain)));
                }
                runs.push(match style {
                    Inline::Styled(annotations) => RichText::styled(inner, annotations),
                    Inline::Equation => RichText::equation(inner),
                });
                i += inner.len() + marker.len() * 2;
                continue 'scan;
            }
        }
        match rest.chars().next() {
            Some(ch) => {
                plain.push(ch);
                i += ch.len_utf8();
            }
            None => break,
        }
    }

    if !plain.is_empty() {
        runs.push(RichText::plain(plain));
    }
    runs
}

/// The text between `marker` at the start of `s` and its next occurrence.
fn enclosed<'a>(s: &'a str, marker: &str) -> Option<&'a str> {
    let after = s.strip_prefix(marker)?;
    let end = after.find(marker)?;
    let inner = &after[..end];
    let well_formed = !inner.is_empty()
        && !inner.starts_with(char::is_whitespace)
        && !inner.ends_with(char::is_whitespace);
    well_formed.then_some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> RichText {
        RichText::plain(s)
    }

    #[test]
    fn paragraphs_one_per_line() {
        let blocks = markdown_to_blocks("first line\n\nsecond line\nthird");
        assert_eq!(
            blocks,
            vec![
                Block::paragraph("first line"),
                Block::paragraph("second line"),
                Block::paragraph("third"),
            ]
        );
    }

    #[test]
    fn headings_clamp_to_three() {
        let blocks = markdown_to_blocks("# One\n## Two\n### Three\n#### Four\n#NoSpace");
        let kinds: Vec<&str> = blocks.iter().map(Block::kind).collect();
        assert_eq!(
            kinds,
            vec!["heading_1", "heading_2", "heading_3", "heading_3", "paragraph"]
        );
        assert_eq!(blocks[3], Block::heading(3, "Four"));
    }

    #[test]
    fn list_items() {
        let blocks = markdown_to_blocks("- a\n* b\n+ c\n  - nested\n1. one\n2) two");
        assert_eq!(
            blocks,
            vec![
                Block::BulletedItem(vec![plain("a")]),
                Block::BulletedItem(vec![plain("b")]),
                Block::BulletedItem(vec![plain("c")]),
                Block::BulletedItem(vec![plain("nested")]),
                Block::NumberedItem(vec![plain("one")]),
                Block::NumberedItem(vec![plain("two")]),
            ]
        );
    }

    #[test]
    fn dividers_win_over_bullets() {
        let blocks = markdown_to_blocks("---\n***\n___\n- x");
        assert_eq!(blocks[0], Block::Divider);
        assert_eq!(blocks[1], Block::Divider);
        assert_eq!(blocks[2], Block::Divider);
        assert_eq!(blocks[3], Block::BulletedItem(vec![plain("x")]));
    }

    #[test]
    fn quote_becomes_callout() {
        let blocks = markdown_to_blocks("> remember this\n>");
        assert_eq!(
            blocks,
            vec![Block::Callout {
                text: vec![plain("remember this")],
                emoji: QUOTE_EMOJI.into(),
            }]
        );
    }

    #[test]
    fn single_line_equation() {
        let blocks = markdown_to_blocks("$$E = mc^2$$");
        assert_eq!(blocks, vec![Block::Equation("E = mc^2".into())]);
    }

    #[test]
    fn multi_line_equation() {
        let blocks = markdown_to_blocks("before\n$$\na + b\n= c\n$$\nafter");
        assert_eq!(
            blocks,
            vec![
                Block::paragraph("before"),
                Block::Equation("a + b\n= c".into()),
                Block::paragraph("after"),
            ]
        );
    }

    #[test]
    fn unterminated_equation_is_kept() {
        let blocks = markdown_to_blocks("$$\n\\sum_i x_i");
        assert_eq!(blocks, vec![Block::Equation("\\sum_i x_i".into())]);
    }

    #[test]
    fn inline_styles() {
        let runs = parse_inline("a **bold** and *it* and ***both***");
        assert_eq!(
            runs,
            vec![
                plain("a "),
                RichText::styled("bold", Annotations::BOLD),
                plain(" and "),
                RichText::styled("it", Annotations::ITALIC),
                plain(" and "),
                RichText::styled("both", Annotations::BOLD_ITALIC),
            ]
        );
    }

    #[test]
    fn inline_equations() {
        let runs = parse_inline("loss $L(\\theta)$ and $$x^2$$.");
        assert_eq!(
            runs,
            vec![
                plain("loss "),
                RichText::equation("L(\\theta)"),
                plain(" and "),
                RichText::equation("x^2"),
                plain("."),
            ]
        );
    }

    #[test]
    fn unbalanced_markers_stay_literal() {
        assert_eq!(parse_inline("2 * 3 * 4"), vec![plain("2 * 3 * 4")]);
        assert_eq!(parse_inline("**open"), vec![plain("**open")]);
        assert_eq!(parse_inline("cost $5"), vec![plain("cost $5")]);
    }

    #[test]
    fn styles_inside_blocks() {
        let blocks = markdown_to_blocks("- **Key**: value");
        assert_eq!(
            blocks,
            vec![Block::BulletedItem(vec![
                RichText::styled("Key", Annotations::BOLD),
                plain(": value"),
            ])]
        );
    }

    #[test]
    fn multibyte_text_is_preserved() {
        assert_eq!(
            parse_inline("提案手法は**高精度**です"),
            vec![
                plain("提案手法は"),
                RichText::styled("高精度", Annotations::BOLD),
                plain("です"),
            ]
        );
    }
}
