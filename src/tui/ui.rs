use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::app::{App, Focus, LogPane};
use crate::console::LogKind;

const ACCENT: Color = Color::Rgb(97, 175, 239);
const BORDER: Color = Color::Rgb(92, 99, 112);
const TEXT: Color = Color::Rgb(220, 223, 228);
const MUTED: Color = Color::Rgb(127, 132, 142);
const SUCCESS: Color = Color::Rgb(152, 195, 121);
const WARNING: Color = Color::Rgb(229, 192, 123);
const ERROR: Color = Color::Rgb(224, 108, 117);
const COMMAND: Color = Color::Rgb(198, 120, 221);
const USER: Color = Color::Rgb(86, 182, 194);

fn kind_style(kind: LogKind) -> Style {
    let style = Style::default();
    match kind {
        LogKind::Info => style.fg(TEXT).add_modifier(Modifier::BOLD),
        LogKind::Command => style.fg(COMMAND).add_modifier(Modifier::BOLD),
        LogKind::Output => style.fg(TEXT),
        LogKind::Muted => style.fg(MUTED),
        LogKind::Success => style.fg(SUCCESS),
        LogKind::Warning => style.fg(WARNING),
        LogKind::Error => style.fg(ERROR).add_modifier(Modifier::BOLD),
        LogKind::User => style.fg(USER),
        LogKind::Assistant => style.fg(ACCENT),
        LogKind::Action => style.fg(WARNING).add_modifier(Modifier::ITALIC),
    }
}

fn pane_block(title: &str, focused: bool) -> Block<'_> {
    let color = if focused { ACCENT } else { BORDER };
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
}

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Min(0),    // Workspace
            Constraint::Length(1), // Key hints
        ])
        .split(f.area());

    draw_title(f, app, chunks[0]);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(22), Constraint::Percentage(78)])
        .split(chunks[1]);
    draw_tree(f, app, main[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(main[1]);
    draw_editor(f, app, right[0]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(right[1]);
    let mode = app.assistant_mode.label();
    draw_channel(f, app, bottom[0], Focus::ShellInput, "Command", "Log".to_string());
    draw_channel(
        f,
        app,
        bottom[1],
        Focus::AssistantInput,
        "Codex",
        format!("Codex output ({mode})"),
    );

    draw_footer(f, chunks[2]);
}

fn draw_title(f: &mut Frame, app: &App, area: Rect) {
    let line = Line::from(vec![
        Span::styled(
            app.title(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(app.subtitle(), Style::default().fg(MUTED)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

fn draw_tree(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .tree
        .entries()
        .iter()
        .map(|entry| {
            let marker = match (entry.is_dir, entry.expanded) {
                (true, true) => "▾ ",
                (true, false) => "▸ ",
                (false, _) => "  ",
            };
            let style = if entry.is_dir {
                Style::default().fg(ACCENT)
            } else {
                Style::default().fg(TEXT)
            };
            ListItem::new(Line::from(Span::styled(
                format!("{}{marker}{}", "  ".repeat(entry.depth), entry.name),
                style,
            )))
        })
        .collect();

    let list = List::new(items)
        .block(pane_block("Files", app.focus == Focus::Tree))
        .highlight_style(Style::default().bg(BORDER).add_modifier(Modifier::BOLD));
    let mut state = ListState::default().with_selected(Some(app.tree.selected()));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_editor(f: &mut Frame, app: &mut App, area: Rect) {
    let focused = app.focus == Focus::Editor;
    let block = pane_block("Editor", focused);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let height = inner.height as usize;
    let width = inner.width as usize;
    app.editor.scroll_into_view(width, height);

    let lines: Vec<Line> = app
        .editor
        .lines()
        .iter()
        .skip(app.editor.scroll)
        .take(height)
        .map(|l| Line::from(Span::styled(l.as_str(), Style::default().fg(TEXT))))
        .collect();
    let paragraph = Paragraph::new(lines).scroll((0, app.editor.hscroll as u16));
    f.render_widget(paragraph, inner);

    if focused {
        let (row, _) = app.editor.cursor();
        let x = inner.x + app.editor.cursor_column().saturating_sub(app.editor.hscroll) as u16;
        let y = inner.y + row.saturating_sub(app.editor.scroll) as u16;
        f.set_cursor_position(Position::new(x, y));
    }
}

fn draw_channel(
    f: &mut Frame,
    app: &App,
    area: Rect,
    focus: Focus,
    input_title: &str,
    log_title: String,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let focused = app.focus == focus;
    let (input, pane) = match focus {
        Focus::AssistantInput => (&app.assistant_input, &app.assistant_log),
        _ => (&app.shell_input, &app.general_log),
    };

    let block = pane_block(input_title, focused);
    let inner = block.inner(chunks[0]);
    let prompt = Line::from(vec![
        Span::styled("> ", Style::default().fg(ACCENT)),
        Span::styled(input.text(), Style::default().fg(TEXT)),
    ]);
    f.render_widget(Paragraph::new(prompt).block(block), chunks[0]);
    if focused {
        let x = inner.x + 2 + input.cursor_column() as u16;
        f.set_cursor_position(Position::new(x.min(inner.right().saturating_sub(1)), inner.y));
    }

    draw_log(f, pane, chunks[1], &log_title);
}

fn draw_log(f: &mut Frame, pane: &LogPane, area: Rect, title: &str) {
    let block = pane_block(title, false);
    let height = block.inner(area).height as usize;
    let total = pane.lines().len();
    let end = total.saturating_sub(pane.scroll);
    let start = end.saturating_sub(height);
    let lines: Vec<Line> = pane
        .lines()
        .range(start..end)
        .map(|l| Line::from(Span::styled(l.text.as_str(), kind_style(l.kind))))
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_footer(f: &mut Frame, area: Rect) {
    let hints = [
        ("^S", "save"),
        ("F5", "run"),
        ("^L", "clear"),
        ("^R", "reload"),
        ("^K", "login"),
        ("^T", "status"),
        ("^U", "install codex"),
        ("^E", "build"),
        ("^P", "pyinstaller"),
        ("^D", "dev tools"),
        ("^V", "view"),
        ("Tab", "focus"),
        ("^Q", "quit"),
    ];
    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, label)| {
            [
                Span::styled(*key, Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)),
                Span::styled(format!(" {label}  "), Style::default().fg(MUTED)),
            ]
        })
        .collect();
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
