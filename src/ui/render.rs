//! Drawing the viewer with ratatui.

use crate::models::FetchStatus;
use crate::ui::app::{App, Focus, Panes};
use crate::ui::layout::row_to_line;
use ratatui::Frame;
use ratatui::style::{Color, Modifier, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, List, ListItem, Paragraph};

const HINTS: &str = "j/k move  h/l focus  gg/G top/bottom  c copy  s stats  q quit";

/// Border and text styles for a pane with or without focus.
fn pane_styles(focused: bool) -> (Style, Style) {
    if focused {
        (Style::default().fg(Color::Green), Style::default().fg(Color::Yellow))
    } else {
        (Style::default().fg(Color::DarkGray), Style::default().fg(Color::White))
    }
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let (border, _) = pane_styles(focused);
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border)
}

fn render_list(frame: &mut Frame, app: &mut App, panes: &Panes) {
    let focused = app.focus() == Focus::List;
    let (_, text) = pane_styles(focused);
    let items: Vec<ListItem> = app.store().labels().into_iter().map(ListItem::new).collect();
    let list = List::new(items)
        .block(pane_block(" News Articles ", focused))
        .style(text)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(list, panes.list, app.list_state_mut());
}

fn render_content(frame: &mut Frame, app: &App, panes: &Panes) {
    let focused = app.focus() == Focus::Content;
    let (_, text) = pane_styles(focused);
    let mut block = pane_block(" Article ", focused);
    if app.show_stats() {
        block = block.title_bottom(Line::from(format!(" {} ", app.stats())).right_aligned());
    }
    let lines: Vec<Line> = app.visible_rows().iter().map(|row| row_to_line(row)).collect();
    frame.render_widget(Paragraph::new(lines).block(block).style(text), panes.content);
}

fn render_footer(frame: &mut Frame, app: &App, panes: &Panes) {
    let counts = app.store().counts();
    let total = app.store().len();
    let scroll = app.scroll();

    let mut spans = vec![
        Span::from(format!(" {} ", app.focus().label())).reversed(),
        Span::from(format!(" loaded {}/{}", counts.loaded + counts.failed, total)),
    ];
    if counts.failed > 0 {
        spans.push(Span::from(format!(" ({} failed)", counts.failed)).fg(Color::Red));
    }
    if let Some(record) = app.store().record(app.selected()) {
        spans.push(Span::from(format!("  [{}]", status_label(record.status))));
    }
    if app.focus() == Focus::Content && scroll.total_rows() > scroll.viewport_height() {
        let visible = scroll.visible_range();
        spans.push(Span::from(format!(
            "  lines {}-{} of {}",
            visible.start + 1,
            visible.end,
            scroll.total_rows()
        )));
    }
    spans.push(Span::from("  "));
    match app.notice() {
        Some(notice) if notice.is_error => spans.push(Span::from(notice.text.clone()).fg(Color::Red)),
        Some(notice) => spans.push(Span::from(notice.text.clone()).fg(Color::Green)),
        None => spans.push(Span::from(HINTS).fg(Color::DarkGray)),
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), panes.footer);
}

/// Draw one frame.
pub fn draw(frame: &mut Frame, app: &mut App) {
    let panes = Panes::compute(frame.area());
    render_list(frame, app, &panes);
    render_content(frame, app, &panes);
    render_footer(frame, app, &panes);
}

/// Footer label for the selected article's fetch state.
pub fn status_label(status: FetchStatus) -> &'static str {
    match status {
        FetchStatus::Pending => "loading",
        FetchStatus::Loaded => "loaded",
        FetchStatus::NoMatches => "no text",
        FetchStatus::Unavailable => "unavailable",
    }
}
