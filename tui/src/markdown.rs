//! Maps a message's raw text into styled lines for the transcript.
//!
//! Fenced code regions are split out first and rendered verbatim so that
//! streaming can never corrupt already-rendered code (markdown renderers
//! tend to eat leading whitespace); the remaining prose goes through
//! pulldown-cmark.

use pulldown_cmark::Event;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;
use pulldown_cmark::TagEnd;
use ratatui::text::Line;
use ratatui::text::Span;

use crate::theme::Theme;

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Segment {
    Text(String),
    Code {
        lang: Option<String>,
        content: String,
        /// False while the closing fence has not arrived yet, which is the
        /// normal state mid-stream.
        closed: bool,
    },
}

/// Split `src` into prose and fenced code segments. A fence is a line whose
/// first non-whitespace characters are ``` or ~~~, optionally followed by a
/// language tag; the fence token that opened a block is the only one that
/// closes it. An unterminated fence yields an open code segment so partial
/// streams render as code rather than leaking markers into prose.
pub(crate) fn split_text_and_fences(src: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut code = String::new();
    let mut lang: Option<String> = None;
    let mut fence_token: Option<&str> = None;

    for line in src.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n').trim_start();
        match fence_token {
            None => {
                let open = if trimmed.starts_with("```") {
                    Some("```")
                } else if trimmed.starts_with("~~~") {
                    Some("~~~")
                } else {
                    None
                };
                if let Some(token) = open {
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    let tag = trimmed[token.len()..].trim();
                    lang = (!tag.is_empty()).then(|| tag.to_string());
                    fence_token = Some(token);
                } else {
                    text.push_str(line);
                }
            }
            Some(token) => {
                if trimmed == token {
                    segments.push(Segment::Code {
                        lang: lang.take(),
                        content: std::mem::take(&mut code),
                        closed: true,
                    });
                    fence_token = None;
                } else {
                    code.push_str(line);
                }
            }
        }
    }

    if fence_token.is_some() {
        segments.push(Segment::Code {
            lang: lang.take(),
            content: code,
            closed: false,
        });
    } else if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}

/// Render a message body into transcript lines.
pub(crate) fn render_message(src: &str, theme: Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for segment in split_text_and_fences(src) {
        match segment {
            Segment::Text(text) => render_prose(&text, theme, &mut lines),
            Segment::Code { lang, content, .. } => {
                let caption = lang.unwrap_or_else(|| "code".to_string());
                lines.push(Line::from(Span::styled(
                    format!("╭ {caption}"),
                    theme.code_caption(),
                )));
                for code_line in content.lines() {
                    lines.push(Line::from(Span::styled(
                        format!(" {code_line}"),
                        theme.code(),
                    )));
                }
            }
        }
    }
    lines
}

fn render_prose(text: &str, theme: Theme, lines: &mut Vec<Line<'static>>) {
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut strong = 0u32;
    let mut emphasis = 0u32;
    let mut heading = 0u32;
    let mut list_depth = 0usize;

    let style = |strong: u32, emphasis: u32, heading: u32, theme: Theme| {
        if heading > 0 {
            theme.heading()
        } else if strong > 0 {
            theme.strong()
        } else if emphasis > 0 {
            theme.emphasis()
        } else {
            theme.text()
        }
    };

    macro_rules! flush {
        () => {
            if !current.is_empty() {
                lines.push(Line::from(std::mem::take(&mut current)));
            }
        };
    }

    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Paragraph) => {
                if !lines.is_empty() {
                    lines.push(Line::default());
                }
            }
            Event::End(TagEnd::Paragraph) => flush!(),
            Event::Start(Tag::Heading { .. }) => {
                if !lines.is_empty() {
                    lines.push(Line::default());
                }
                heading += 1;
            }
            Event::End(TagEnd::Heading(_)) => {
                heading = heading.saturating_sub(1);
                flush!();
            }
            Event::Start(Tag::List(_)) => list_depth += 1,
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    flush!();
                }
            }
            Event::Start(Tag::Item) => {
                flush!();
                let indent = "  ".repeat(list_depth.saturating_sub(1));
                current.push(Span::styled(format!("{indent}• "), theme.dim()));
            }
            Event::End(TagEnd::Item) => flush!(),
            Event::Start(Tag::Strong) => strong += 1,
            Event::End(TagEnd::Strong) => strong = strong.saturating_sub(1),
            Event::Start(Tag::Emphasis) => emphasis += 1,
            Event::End(TagEnd::Emphasis) => emphasis = emphasis.saturating_sub(1),
            Event::Text(t) => {
                current.push(Span::styled(
                    t.into_string(),
                    style(strong, emphasis, heading, theme),
                ));
            }
            Event::Code(t) => {
                current.push(Span::styled(format!("`{t}`"), theme.code()));
            }
            Event::SoftBreak => current.push(Span::styled(" ".to_string(), theme.text())),
            Event::HardBreak => flush!(),
            Event::Rule => {
                flush!();
                lines.push(Line::from(Span::styled("───".to_string(), theme.dim())));
            }
            _ => {}
        }
    }
    flush!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_prose_is_a_single_text_segment() {
        let segments = split_text_and_fences("hello world\nsecond line\n");
        assert_eq!(
            segments,
            vec![Segment::Text("hello world\nsecond line\n".to_string())]
        );
    }

    #[test]
    fn fenced_block_with_language_tag() {
        let src = "before\n```rust\nfn main() {}\n```\nafter\n";
        let segments = split_text_and_fences(src);
        assert_eq!(
            segments,
            vec![
                Segment::Text("before\n".to_string()),
                Segment::Code {
                    lang: Some("rust".to_string()),
                    content: "fn main() {}\n".to_string(),
                    closed: true,
                },
                Segment::Text("after\n".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_fence_stays_open_during_streaming() {
        let src = "```python\nprint(\"hi\")\n";
        let segments = split_text_and_fences(src);
        assert_eq!(
            segments,
            vec![Segment::Code {
                lang: Some("python".to_string()),
                content: "print(\"hi\")\n".to_string(),
                closed: false,
            }]
        );
    }

    #[test]
    fn tilde_fences_are_not_closed_by_backticks() {
        let src = "~~~\ncode with ``` inside\n~~~\n";
        let segments = split_text_and_fences(src);
        assert_eq!(
            segments,
            vec![Segment::Code {
                lang: None,
                content: "code with ``` inside\n".to_string(),
                closed: true,
            }]
        );
    }

    #[test]
    fn code_indentation_is_preserved_verbatim() {
        let src = "```\n    indented\n\ttabbed\n```\n";
        match &split_text_and_fences(src)[0] {
            Segment::Code { content, .. } => {
                assert_eq!(content, "    indented\n\ttabbed\n");
            }
            other => panic!("expected code segment, got {other:?}"),
        }
    }

    #[test]
    fn render_styles_code_blocks_distinctly_from_prose() {
        let theme = Theme { dark: true };
        let lines = render_message("prose\n```rust\nlet x = 1;\n```\n", theme);
        // One prose line, one caption line, one code line.
        assert_eq!(lines.len(), 3);
        assert!(lines[1].spans[0].content.contains("rust"));
        assert_eq!(lines[2].spans[0].content, " let x = 1;");
    }
}
