//! UI rendering for image-word match.

use crate::app::{App, View};
use chrono::Utc;
use match_engine::{GameState, Pair, Side, WrongAttempt};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

pub fn draw(f: &mut Frame, app: &App) {
    match app.view {
        View::LessonList => draw_lesson_list(f, app),
        View::Play => draw_play(f, app),
        View::Result => draw_result(f, app),
        View::Editor => draw_editor(f, app),
    }

    if app.show_help {
        draw_help(f);
    }

    if app.editing {
        draw_input(f, app);
    }

    if let Some(msg) = &app.message {
        draw_message(f, msg);
    }
}

fn screen_chunks(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(area)
}

fn header(text: impl Into<String>) -> Paragraph<'static> {
    Paragraph::new(text.into())
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
}

fn footer(text: &'static str) -> Paragraph<'static> {
    Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL))
}

fn draw_lesson_list(f: &mut Frame, app: &App) {
    let chunks = screen_chunks(f.area());
    f.render_widget(header("Image-Word Match"), chunks[0]);

    if app.lessons.is_empty() {
        let msg = Paragraph::new("No lessons yet. Press 'a' to create one.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Lessons "));
        f.render_widget(msg, chunks[1]);
    } else {
        let items: Vec<ListItem> = app
            .lessons
            .iter()
            .enumerate()
            .map(|(i, lesson)| {
                let mut spans = vec![
                    Span::styled(lesson.name.as_str(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" - "),
                    Span::styled(format!("{} pairs", lesson.pairs.len()), Style::default().fg(Color::Blue)),
                ];
                if let Some(best) = app.best_scores.get(&lesson.id) {
                    spans.push(Span::raw(", "));
                    spans.push(Span::styled(format!("best {best}"), Style::default().fg(Color::Yellow)));
                }
                if let Some(desc) = &lesson.description {
                    spans.push(Span::styled(format!("  {desc}"), Style::default().fg(Color::DarkGray)));
                }

                ListItem::new(Line::from(spans)).style(if i == app.selected_lesson {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                })
            })
            .collect();

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Lessons "));
        f.render_widget(list, chunks[1]);
    }

    f.render_widget(
        footer("j/k:Navigate  Enter:Play  a:New lesson  e:Edit  d:Delete  ?:Help  q:Quit"),
        chunks[2],
    );
}

fn draw_play(f: &mut Frame, app: &App) {
    let chunks = screen_chunks(f.area());
    let Some(state) = app.game.state() else {
        return;
    };

    let mut status = format!(
        "{} | Matched {}/{} | Wrong {}",
        state.lesson().name,
        state.matched().len(),
        state.total_pairs(),
        state.wrong_attempts(),
    );
    if app.config.display.show_timer {
        status.push_str(&format!(" | {}", format_elapsed(state.elapsed(Utc::now()).num_milliseconds())));
    }
    f.render_widget(header(status), chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let wrong = app.game.wrong_attempt();
    for (side, area) in [(Side::Image, columns[0]), (Side::Word, columns[1])] {
        draw_column(f, app, state, wrong, side, area);
    }

    f.render_widget(
        footer("h/l,Tab:Column  j/k:Move  Enter:Select  r:Restart  q:Leave  ?:Help"),
        chunks[2],
    );
}

fn draw_column(f: &mut Frame, app: &App, state: &GameState, wrong: Option<WrongAttempt>, side: Side, area: Rect) {
    let focused = app.focus == side;
    let cursor = app.cursor(side);

    let items: Vec<ListItem> = state
        .column(side)
        .iter()
        .enumerate()
        .map(|(i, pair)| {
            let matched = state.is_matched(pair.id);
            let selected = state.selected(side) == Some(pair.id);
            let flashing = wrong.is_some_and(|w| w.involves(side, pair.id));

            let marker = if matched {
                "✓ "
            } else if selected {
                "▶ "
            } else {
                "  "
            };
            let mut style = if matched {
                Style::default().fg(Color::Green).add_modifier(Modifier::DIM)
            } else if selected {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            if flashing {
                style = style.bg(Color::Red).fg(Color::White);
            } else if focused && i == cursor {
                style = style.bg(Color::DarkGray);
            }

            ListItem::new(Line::from(vec![Span::raw(marker), Span::raw(cell_text(app, side, pair))])).style(style)
        })
        .collect();

    let title = match side {
        Side::Image => " Images ",
        Side::Word => " Words ",
    };
    let border = if focused { Style::default().fg(Color::Cyan) } else { Style::default() };
    let list = List::new(items).block(Block::default().borders(Borders::ALL).border_style(border).title(title));
    f.render_widget(list, area);
}

fn cell_text(app: &App, side: Side, pair: &Pair) -> String {
    match side {
        Side::Image => pair.image.clone(),
        Side::Word => match (&pair.reading, app.config.display.show_readings) {
            (Some(reading), true) => format!("{} ({})", pair.term, reading),
            _ => pair.term.clone(),
        },
    }
}

fn draw_result(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(8), // Summary
            Constraint::Min(0),    // Review + history
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    let (Some(state), Some(result)) = (app.game.state(), app.game.result()) else {
        return;
    };

    f.render_widget(header(format!("{} complete!", state.lesson().name)), chunks[0]);

    let best = app.best_scores.get(&state.lesson().id).copied().unwrap_or(result.score);
    let label = Style::default().fg(Color::DarkGray);
    let summary = vec![
        Line::from(vec![
            Span::styled("Score     ", label),
            Span::styled(result.score.to_string(), Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![Span::styled("Accuracy  ", label), Span::raw(format!("{}%", result.accuracy))]),
        Line::from(vec![
            Span::styled("Pairs     ", label),
            Span::raw(format!("{}/{}", result.correct_matches, result.total_pairs)),
        ]),
        Line::from(vec![Span::styled("Wrong     ", label), Span::raw(result.wrong_attempts.to_string())]),
        Line::from(vec![Span::styled("Time      ", label), Span::raw(format_elapsed(result.elapsed_ms))]),
        Line::from(vec![Span::styled("Best      ", label), Span::raw(best.to_string())]),
    ];
    let summary = Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title(" Result "));
    f.render_widget(summary, chunks[1]);

    let history_area = if app.config.display.show_meanings_on_result {
        let lower = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[2]);

        let items: Vec<ListItem> = state
            .lesson()
            .pairs
            .iter()
            .map(|pair| {
                let reading = pair.reading.as_deref().map(|r| format!(" ({r})")).unwrap_or_default();
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{} ", pair.image)),
                    Span::styled(format!("{}{}", pair.term, reading), Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  {}", pair.meaning), Style::default().fg(Color::Green)),
                ]))
            })
            .collect();
        f.render_widget(List::new(items).block(Block::default().borders(Borders::ALL).title(" Review ")), lower[0]);
        lower[1]
    } else {
        chunks[2]
    };

    let rows: Vec<Row> = app
        .history
        .iter()
        .map(|record| {
            Row::new(vec![
                record.result.completed_at.format("%m-%d %H:%M").to_string(),
                record.result.score.to_string(),
                record.result.wrong_attempts.to_string(),
                format_elapsed(record.result.elapsed_ms),
            ])
        })
        .collect();
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ],
    )
    .header(Row::new(vec!["When", "Score", "Wrong", "Time"]).style(Style::default().add_modifier(Modifier::BOLD)))
    .block(Block::default().borders(Borders::ALL).title(" Recent "));
    f.render_widget(table, history_area);

    f.render_widget(footer("r/Enter:Play again  q:Back  ?:Help"), chunks[3]);
}

fn draw_editor(f: &mut Frame, app: &App) {
    let chunks = screen_chunks(f.area());
    let Some(lesson) = app.editor_lesson() else {
        return;
    };

    f.render_widget(header(format!("Editing: {}", lesson.name)), chunks[0]);

    if lesson.pairs.is_empty() {
        let msg = Paragraph::new("No pairs yet. Press 'a' to add one.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Pairs "));
        f.render_widget(msg, chunks[1]);
    } else {
        let rows: Vec<Row> = lesson
            .pairs
            .iter()
            .enumerate()
            .map(|(i, pair)| {
                let row = Row::new(vec![
                    pair.image.clone(),
                    pair.term.clone(),
                    pair.reading.clone().unwrap_or_default(),
                    pair.meaning.clone(),
                ]);
                if i == app.selected_pair {
                    row.style(Style::default().bg(Color::DarkGray))
                } else {
                    row
                }
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(20),
                Constraint::Percentage(25),
                Constraint::Percentage(25),
                Constraint::Percentage(30),
            ],
        )
        .header(
            Row::new(vec!["Image", "Term", "Reading", "Meaning"]).style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(" Pairs "));
        f.render_widget(table, chunks[1]);
    }

    f.render_widget(footer("j/k:Navigate  a:Add pair  d:Delete pair  n:Rename  i:Description  q:Back  ?:Help"), chunks[2]);
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let help = r#"
Image-Word Match Keybindings

Lessons:
  j/k, Up/Down    Navigate lessons
  Enter, Space    Play lesson
  a               New lesson
  e               Edit lesson
  d               Delete lesson
  q               Quit

Playing:
  h/l, Tab        Switch column
  j/k             Move
  Enter, Space    Select image or word
  r               Restart
  q, Esc          Leave game

Editor:
  a               Add pair
  d               Delete pair
  n               Rename lesson
  i               Edit description

General:
  ?               Show this help

Press any key to close
"#;

    let popup = Paragraph::new(help)
        .block(Block::default().borders(Borders::ALL).title(" Help "))
        .wrap(Wrap { trim: false });
    f.render_widget(popup, area);
}

fn draw_input(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 15, f.area());
    f.render_widget(Clear, area);

    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", app.input_field.prompt())));
    f.render_widget(input, area);

    let width = app.input_buffer.as_str().width() as u16;
    f.set_cursor_position((area.x + 1 + width, area.y + 1));
}

fn draw_message(f: &mut Frame, msg: &str) {
    let area = Rect::new(
        f.area().x + 2,
        f.area().height.saturating_sub(5),
        f.area().width.saturating_sub(4),
        3,
    );
    f.render_widget(Clear, area);

    let message = Paragraph::new(msg)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, area);
}

/// `m:ss` for a duration in milliseconds.
fn format_elapsed(ms: i64) -> String {
    let secs = ms.max(0) / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
