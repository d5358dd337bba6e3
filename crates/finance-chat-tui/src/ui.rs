use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use finance_chat_core::ChatRole;
use crate::app::App;

const INPUT_PLACEHOLDER: &str = "Ask about finance, investing, budgeting...";

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let exchanges = app.session.context().len();
    let history_indicator = if exchanges > 0 {
        format!(" [{} exchanges]", exchanges)
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(" Finance Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(history_indicator, Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(app.session.model().to_string(), Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn chat_text(app: &App) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.session.messages() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(msg.text.clone()));
                lines.push(Line::default());
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "AI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(parse_markdown_line(line));
                }
                lines.push(Line::default());
            }
        }
    }

    if app.is_loading() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    app.chat_area = Some(area);

    // Inner size minus borders
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let text = chat_text(app);

    // Count with the same wrapping the chat is drawn with
    let wrapped_lines = Paragraph::new(text.clone())
        .wrap(Wrap { trim: true })
        .line_count(app.chat_width);
    app.chat_lines = wrapped_lines.min(u16::MAX as usize) as u16;

    if app.follow_bottom {
        app.scroll_to_bottom();
    } else {
        let max_scroll = app.chat_lines.saturating_sub(app.chat_height);
        app.chat_scroll = app.chat_scroll.min(max_scroll);
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let chat = Paragraph::new(text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);

    if app.chat_lines > app.chat_height {
        let mut scrollbar_state = ScrollbarState::new(app.chat_lines as usize)
            .position(app.chat_scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(ratatui::layout::Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

/// Columns to skip so the cursor stays inside a box `width` columns wide.
fn input_offset(cursor: usize, width: usize) -> usize {
    if width == 0 {
        return 0;
    }
    cursor.saturating_sub(width - 1)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let loading = app.is_loading();

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if loading { Color::DarkGray } else { Color::Yellow }))
        .title(if loading { " Waiting for answer... " } else { " Ask " });

    let inner_width = area.width.saturating_sub(2) as usize;
    let offset = input_offset(app.cursor, inner_width);

    let input = if app.input.is_empty() {
        Paragraph::new(INPUT_PLACEHOLDER).style(Style::default().fg(Color::DarkGray))
    } else {
        Paragraph::new(app.input.as_str())
            .style(Style::default().fg(Color::White))
            .scroll((0, offset.min(u16::MAX as usize) as u16))
    };

    frame.render_widget(input.block(input_block), area);

    let cursor_x = (app.cursor - offset) as u16;
    frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let disabled_style = Style::default().bg(Color::Black).fg(Color::DarkGray);

    let send_style = if app.can_submit() { label_style } else { disabled_style };

    let mut hints = vec![
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", send_style),
        Span::styled(" ↑/↓ PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ];

    if !app.session.has_credential() {
        hints.push(Span::styled(
            " GEMINI_API_KEY not set ",
            Style::default().bg(Color::Red).fg(Color::White),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}
