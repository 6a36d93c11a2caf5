use chrono::Local;
use glasschat_core::{format_last_message_time, Sender};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::app::{App, FocusPane};
use crate::theme;

const SIDEBAR_WIDTH: u16 = 34;

/// Render `**bold**` runs of a bot reply; unbalanced markers stay literal.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    if parts.len() % 2 == 0 {
        return Line::from(text.to_string());
    }

    let spans: Vec<Span<'static>> = parts
        .iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 1 {
                Span::styled(part.to_string(), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(part.to_string())
            }
        })
        .collect();
    Line::from(spans)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let background = theme::panel_background(&app.appearance);
    frame.render_widget(Block::default().style(Style::default().bg(background)), area);

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [sidebar_area, chat_column] = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_header(app, frame, header_area);
    render_sidebar(app, frame, sidebar_area);
    render_chat(app, frame, chat_column);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let accent = theme::accent(&app.appearance);
    let background = app.appearance.background();
    let header = Line::from(vec![
        Span::styled(
            " glasschat ",
            Style::default()
                .fg(Color::Black)
                .bg(accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(app.endpoint.clone(), Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled(
            format!(
                "{} · blur {}px · overlay {}%",
                background.current,
                background.blur,
                (background.opacity * 100.0).round() as u32
            ),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints = match app.focus {
        FocusPane::Input => {
            "Enter send · Tab sidebar · Ctrl+N new · Ctrl+T accent · Ctrl+P custom accent · \
             Ctrl+B background · Alt+↑/↓ blur · Alt+←/→ overlay · Ctrl+C quit"
        }
        FocusPane::Sidebar => {
            "j/k select · / filter · n new · Enter chat · Esc clear · \
             Alt+↑/↓ blur · Alt+←/→ overlay · q quit"
        }
        FocusPane::Filter => "type to filter · Enter keep · Esc clear",
        FocusPane::Color => {
            render_color_prompt(app, frame, area);
            return;
        }
    };
    let footer = Paragraph::new(Span::styled(hints, Style::default().fg(Color::DarkGray)));
    frame.render_widget(footer, area);
}

fn render_color_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let label = " Accent colour: ";
    let mut spans = vec![
        Span::styled(label, Style::default().fg(theme::accent(&app.appearance))),
        Span::raw(app.color_input.clone()),
    ];
    match &app.color_error {
        Some(error) => spans.push(Span::styled(
            format!("  {}", error),
            Style::default().fg(Color::LightRed),
        )),
        None => spans.push(Span::styled(
            "  Enter apply · Esc cancel",
            Style::default().fg(Color::DarkGray),
        )),
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    let cursor_x = (label.chars().count() + app.color_input.chars().count()) as u16;
    frame.set_cursor_position((
        area.x + cursor_x.min(area.width.saturating_sub(1)),
        area.y,
    ));
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    app.sidebar_area = Some(area);
    let accent = theme::accent(&app.appearance);
    let focused = matches!(app.focus, FocusPane::Sidebar | FocusPane::Filter);
    let border_color = if focused { accent } else { Color::DarkGray };

    let [filter_area, list_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let filter_color = if app.focus == FocusPane::Filter {
        accent
    } else {
        Color::DarkGray
    };
    let filter_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(filter_color))
        .title(" Search conversations ");
    let filter_text = if app.filter.is_empty() && app.focus != FocusPane::Filter {
        Span::styled("/ to search", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.filter.clone())
    };
    frame.render_widget(Paragraph::new(filter_text).block(filter_block), filter_area);

    if app.focus == FocusPane::Filter {
        let cursor_x = app.filter.chars().count() as u16;
        frame.set_cursor_position((
            filter_area.x + 1 + cursor_x.min(filter_area.width.saturating_sub(3)),
            filter_area.y + 1,
        ));
    }

    let now = Local::now();
    let inner_width = list_area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = app
        .visible_ids
        .iter()
        .filter_map(|id| app.snapshot.conversations.iter().find(|c| &c.id == id))
        .map(|conversation| {
            let time = format_last_message_time(conversation.last_message_time(), now);
            let mut title = vec![Span::styled(
                conversation.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )];
            if conversation.unread_count > 0 {
                title.push(Span::styled(
                    format!(" ({})", conversation.unread_count),
                    Style::default().fg(accent),
                ));
            }
            if !time.is_empty() {
                title.push(Span::styled(
                    format!("  {}", time),
                    Style::default().fg(Color::DarkGray),
                ));
            }

            let preview: String = conversation
                .last_message()
                .unwrap_or_default()
                .chars()
                .take(inner_width)
                .collect();
            ListItem::new(vec![
                Line::from(title),
                Line::from(Span::styled(preview, Style::default().fg(Color::Gray))),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Conversations "),
        )
        .highlight_style(Style::default().bg(accent).fg(Color::Black))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.sidebar_state);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let error = app.error();
    let banner_height = if error.is_some() { 1 } else { 0 };

    let [chat_area, banner_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(banner_height),
        Constraint::Length(3),
    ])
    .areas(area);

    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let accent = theme::accent(&app.appearance);
    let Some(conversation) = app.snapshot.active() else {
        let empty = Paragraph::new(Text::from(vec![
            Line::from("No Conversation Selected".bold()),
            Line::from(Span::styled(
                "Select a conversation from the sidebar or press Ctrl+N to start a new one",
                Style::default().fg(Color::DarkGray),
            )),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .wrap(Wrap { trim: true });
        frame.render_widget(empty, chat_area);
        render_input(app, frame, input_area);
        return;
    };

    let mut lines: Vec<Line> = Vec::new();
    for msg in conversation.messages() {
        let time = msg.timestamp.with_timezone(&Local).format("%H:%M").to_string();
        match msg.sender {
            Sender::User => {
                lines.push(Line::from(vec![
                    Span::styled("You:", Style::default().fg(accent).add_modifier(Modifier::BOLD)),
                    Span::styled(format!(" {}", time), Style::default().fg(Color::DarkGray)),
                ]));
                for line in msg.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Sender::Bot => {
                lines.push(Line::from(vec![
                    Span::styled(
                        "Bot:",
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(format!(" {}", time), Style::default().fg(Color::DarkGray)),
                ]));
                for line in msg.text.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.is_sending() {
        lines.push(Line::from(Span::styled(
            "Bot:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent))
                .title(format!(" {} ", conversation.title)),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    if let Some(error) = error {
        let banner = Paragraph::new(Span::styled(
            format!(" ! {}  (Esc to dismiss)", error),
            Style::default().fg(Color::LightRed),
        ));
        frame.render_widget(banner, banner_area);
    }

    render_input(app, frame, input_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Input;
    let border_color = if focused {
        theme::accent(&app.appearance)
    } else {
        Color::DarkGray
    };
    let title = if app.is_sending() { " Sending... " } else { " Type a message... " };

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    // Scroll horizontally to keep the cursor visible
    let scroll_offset = if inner_width == 0 || cursor_pos < inner_width {
        0
    } else {
        cursor_pos - inner_width + 1
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title(title),
    );
    frame.render_widget(input, area);

    if focused {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}
