use crate::app::{App, MAX_SCROLL};
use crate::ui::items::format_relative_time;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

/// Render the item reader view
pub fn render(f: &mut Frame, app: &mut App, area: Rect) {
    // Layout may produce tiny rects during extreme terminal resizes
    if area.width < 3 || area.height < 3 {
        return;
    }

    // Borders take two rows and two columns
    app.reader_visible_lines = area.height.saturating_sub(2) as usize;
    app.reader_viewport_width = area.width.saturating_sub(2) as usize;

    // Clamp before rendering so a resize never draws past the end.
    app.clamp_reader_scroll();

    let Some(item) = app.reader_item.as_ref() else {
        let paragraph = Paragraph::new("No item selected")
            .block(Block::default().borders(Borders::ALL).title("Reader"));
        f.render_widget(paragraph, area);
        return;
    };

    let mut meta = Vec::with_capacity(2);
    if let Some(source) = item.source() {
        meta.push(source.to_string());
    }
    let time_str = format_relative_time(item.parsed_time());
    if !time_str.is_empty() {
        meta.push(time_str);
    }

    let title = if item.title().is_empty() {
        "(untitled)"
    } else {
        item.title()
    };

    let header = vec![
        Line::from(Span::styled(
            title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            meta.join(" • "),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
    ];

    let body: Vec<Line> = if app.reader_text.is_empty() {
        vec![Line::from(Span::styled(
            "No content. Press o to open the link.",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        app.reader_text
            .iter()
            .map(|l| Line::from(l.as_str()))
            .collect()
    };

    let text = Text::from_iter(header.into_iter().chain(body));

    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Item"))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll_offset.min(MAX_SCROLL) as u16, 0));

    f.render_widget(paragraph, area);
}

/// Convert markdown to styled ratatui Lines.
/// Returns owned Lines so the result can be kept across frames.
pub fn render_markdown(md: &str) -> Vec<Line<'static>> {
    let parser = Parser::new(md);
    let mut lines: Vec<Line<'static>> = Vec::with_capacity(md.lines().count());
    let mut current_spans: Vec<Span<'static>> = Vec::with_capacity(4);
    let mut in_code_block = false;
    let mut in_heading = false;
    let mut in_emphasis = false;
    let mut in_strong = false;
    let mut list_depth = 0usize;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { .. }) => {
                in_heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
                in_heading = false;
            }
            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
                // Tight list items stay together
                if list_depth == 0 {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::List(_)) => {
                list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    lines.push(Line::from(""));
                }
            }
            Event::Start(Tag::Item) => {
                current_spans.push(Span::raw(format!(
                    "{}• ",
                    "  ".repeat(list_depth.saturating_sub(1))
                )));
            }
            Event::End(TagEnd::Item) => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                lines.push(Line::from(""));
            }
            Event::Start(Tag::Emphasis) => {
                in_emphasis = true;
            }
            Event::End(TagEnd::Emphasis) => {
                in_emphasis = false;
            }
            Event::Start(Tag::Strong) => {
                in_strong = true;
            }
            Event::End(TagEnd::Strong) => {
                in_strong = false;
            }
            Event::Text(text) => {
                let style = if in_code_block {
                    Style::default().fg(Color::Yellow).bg(Color::Black)
                } else if in_heading {
                    Style::default()
                        .add_modifier(Modifier::BOLD)
                        .fg(Color::Cyan)
                } else if in_strong {
                    Style::default().add_modifier(Modifier::BOLD)
                } else if in_emphasis {
                    Style::default().add_modifier(Modifier::ITALIC)
                } else {
                    Style::default()
                };
                if in_code_block {
                    // Code blocks arrive as one text event with embedded newlines
                    for line in text.lines() {
                        lines.push(Line::from(Span::styled(line.to_string(), style)));
                    }
                } else {
                    current_spans.push(Span::styled(text.into_string(), style));
                }
            }
            Event::Code(code) => {
                current_spans.push(Span::styled(
                    format!("`{}`", code),
                    Style::default().fg(Color::Yellow),
                ));
            }
            Event::SoftBreak => {
                current_spans.push(Span::raw(" "));
            }
            Event::HardBreak => {
                if !current_spans.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current_spans)));
                }
            }
            _ => {}
        }
    }

    if !current_spans.is_empty() {
        lines.push(Line::from(current_spans));
    }

    // Drop the trailing blank separator
    while lines.last().is_some_and(|l| l.width() == 0) {
        lines.pop();
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_render_heading_and_paragraph() {
        let lines = render_markdown("# Today\n\nThree new posts.");
        assert_eq!(plain(&lines), vec!["Today", "Three new posts."]);
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_render_list_items() {
        let lines = render_markdown("- one\n- two\n");
        assert_eq!(plain(&lines), vec!["• one", "• two"]);
    }

    #[test]
    fn test_render_code_block_lines() {
        let lines = render_markdown("```\nlet a = 1;\nlet b = 2;\n```");
        assert_eq!(plain(&lines), vec!["let a = 1;", "let b = 2;"]);
    }

    #[test]
    fn test_render_inline_styles() {
        let lines = render_markdown("This is **bold** and *italic*");
        assert_eq!(plain(&lines), vec!["This is bold and italic"]);
        assert!(lines[0].spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert!(lines[0].spans[3].style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn test_render_empty() {
        assert!(render_markdown("").is_empty());
    }

    #[test]
    fn test_render_unicode() {
        let lines = render_markdown("Hello 世界 🌍");
        assert_eq!(plain(&lines), vec!["Hello 世界 🌍"]);
    }
}
