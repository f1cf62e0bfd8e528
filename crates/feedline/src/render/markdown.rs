//! Lightweight markdown detection and styled rendering for text messages.
//!
//! Just enough structure awareness for a chat feed: headings, emphasis,
//! inline and fenced code, lists, block quotes, and rules. Anything fancier
//! belongs to a custom [`MessageRenderer`](crate::render::MessageRenderer).

use pulldown_cmark::{Event, Options, Parser, Tag};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::theme::{Component, Theme};

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

/// True when the text carries markdown structure worth formatting
pub fn has_markdown_syntax(text: &str) -> bool {
    Parser::new_ext(text, parser_options()).any(|event| match event {
        Event::Start(tag) => matches!(
            tag,
            Tag::Heading(..)
                | Tag::BlockQuote
                | Tag::CodeBlock(_)
                | Tag::List(_)
                | Tag::Emphasis
                | Tag::Strong
                | Tag::Strikethrough
                | Tag::Link(..)
                | Tag::Image(..)
        ),
        Event::Code(_) | Event::Rule => true,
        _ => false,
    })
}

/// Render markdown to styled, width-wrapped lines
pub fn render_lines(text: &str, theme: &Theme, width: u16, base: Style) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut style_stack: Vec<Style> = vec![base];
    let mut in_code_block = false;
    let mut list_depth: usize = 0;

    for event in Parser::new_ext(text, parser_options()) {
        let current = style_stack.last().copied().unwrap_or_default();
        match event {
            Event::Start(Tag::Heading(..)) => {
                flush(&mut spans, &mut lines, width);
                style_stack.push(theme.style(Component::MarkdownHeading));
            }
            Event::End(Tag::Heading(..)) => {
                flush(&mut spans, &mut lines, width);
                style_stack.pop();
            }
            Event::Start(Tag::Emphasis) => {
                style_stack.push(current.add_modifier(Modifier::ITALIC));
            }
            Event::Start(Tag::Strong) => {
                style_stack.push(current.add_modifier(Modifier::BOLD));
            }
            Event::Start(Tag::Strikethrough) => {
                style_stack.push(current.add_modifier(Modifier::CROSSED_OUT));
            }
            Event::Start(Tag::Link(..)) => {
                style_stack.push(current.add_modifier(Modifier::UNDERLINED));
            }
            Event::Start(Tag::BlockQuote) => {
                flush(&mut spans, &mut lines, width);
                style_stack.push(current.add_modifier(Modifier::ITALIC | Modifier::DIM));
            }
            Event::End(
                Tag::Emphasis
                | Tag::Strong
                | Tag::Strikethrough
                | Tag::Link(..)
                | Tag::BlockQuote,
            ) => {
                if style_stack.len() > 1 {
                    style_stack.pop();
                }
            }
            Event::Start(Tag::Paragraph) | Event::End(Tag::Paragraph) => {
                flush(&mut spans, &mut lines, width);
            }
            Event::Start(Tag::CodeBlock(_)) => {
                flush(&mut spans, &mut lines, width);
                in_code_block = true;
            }
            Event::End(Tag::CodeBlock(_)) => {
                in_code_block = false;
            }
            Event::Start(Tag::List(_)) => {
                flush(&mut spans, &mut lines, width);
                list_depth += 1;
            }
            Event::End(Tag::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
            }
            Event::Start(Tag::Item) => {
                flush(&mut spans, &mut lines, width);
                let indent = "  ".repeat(list_depth.saturating_sub(1));
                spans.push(Span::styled(format!("{indent}• "), current));
            }
            Event::End(Tag::Item) => {
                flush(&mut spans, &mut lines, width);
            }
            Event::Text(text) => {
                if in_code_block {
                    // Code block lines are never wrapped
                    let style = theme.style(Component::CodeBlock);
                    for code_line in text.lines() {
                        lines.push(Line::from(Span::styled(code_line.to_string(), style)));
                    }
                } else {
                    spans.push(Span::styled(text.to_string(), current));
                }
            }
            Event::Code(code) => {
                spans.push(Span::styled(
                    code.to_string(),
                    theme.style(Component::InlineCode),
                ));
            }
            Event::SoftBreak | Event::HardBreak => {
                flush(&mut spans, &mut lines, width);
            }
            Event::Rule => {
                flush(&mut spans, &mut lines, width);
                let bar_width = usize::from(width.max(4)).min(32);
                lines.push(Line::from(Span::styled("─".repeat(bar_width), current)));
            }
            _ => {}
        }
    }
    flush(&mut spans, &mut lines, width);
    lines
}

/// Close the span accumulator into one or more lines, wrapping single-style
/// runs at the given width.
fn flush(spans: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>, width: u16) {
    if spans.is_empty() {
        return;
    }
    if spans.len() == 1 && width > 0 {
        let span = spans.remove(0);
        let style = span.style;
        for piece in textwrap::wrap(&span.content, usize::from(width)) {
            lines.push(Line::from(Span::styled(piece.into_owned(), style)));
        }
        return;
    }
    lines.push(Line::from(std::mem::take(spans)));
}
