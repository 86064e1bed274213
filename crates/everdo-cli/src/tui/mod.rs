use std::{io, sync::Arc, time::Duration};

use color_eyre::Result;
use crossterm::{
    event::{self, DisableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use everdo_core::{
    store::TaskStore,
    task::{Priority, Task},
};
use everdo_tasks::{
    ops,
    state::{AppEvent, AppState},
    view::Filter,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Gauge, List, ListItem, Paragraph},
    Frame, Terminal,
};
use tracing::warn;

/// Interactive task board fed by the live store subscription. All screen
/// state lives in the reducer: every keystroke becomes an `AppEvent`, and
/// writes are fire-and-forget — the next snapshot is what changes the
/// display. Typing searches; Tab cycles the filter; Esc clears the search
/// or exits.
pub async fn launch<S>(store: Arc<S>, uid: String) -> Result<()>
where
    S: TaskStore + 'static,
{
    let mut subscription = store
        .subscribe(&uid)
        .await
        .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;

    // Guard restores the terminal even if we early-return.
    let _guard = TerminalGuard::enter()?;
    let mut terminal = _guard.terminal()?;
    let mut state = AppState::default();
    let mut selected: usize = 0;

    loop {
        while let Some(snapshot) = subscription.try_next_snapshot() {
            state = state.reduce(AppEvent::SnapshotReceived(snapshot));
        }
        let visible = state.visible();
        if selected >= visible.len() {
            selected = visible.len().saturating_sub(1);
        }

        terminal.draw(|frame| draw(frame, &state, &visible, selected))?;

        if event::poll(Duration::from_millis(150))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Esc => {
                        if state.search.is_empty() {
                            break;
                        }
                        state = state.reduce(AppEvent::SearchChanged(String::new()));
                    }
                    KeyCode::Tab => {
                        let next = next_filter(state.filter);
                        state = state.reduce(AppEvent::FilterSelected(next));
                    }
                    KeyCode::Up => selected = selected.saturating_sub(1),
                    KeyCode::Down => {
                        if selected + 1 < visible.len() {
                            selected += 1;
                        }
                    }
                    KeyCode::Enter => {
                        if let Some(task) = visible.get(selected) {
                            dispatch(&store, &uid, ops::toggle_task_complete(task));
                        }
                    }
                    KeyCode::Delete => {
                        if let Some(task) = visible.get(selected) {
                            dispatch(&store, &uid, ops::delete_task(&task.id));
                        }
                    }
                    KeyCode::Backspace => {
                        let mut search = state.search.clone();
                        search.pop();
                        state = state.reduce(AppEvent::SearchChanged(search));
                    }
                    KeyCode::Char(c) => {
                        let mut search = state.search.clone();
                        search.push(c);
                        state = state.reduce(AppEvent::SearchChanged(search));
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}

/// Writes never block the render loop; the subscription delivers whatever
/// they changed, and a dropped board simply never sees the outcome.
fn dispatch<S>(store: &Arc<S>, uid: &str, request: ops::WriteRequest)
where
    S: TaskStore + 'static,
{
    let store = Arc::clone(store);
    let uid = uid.to_string();
    tokio::spawn(async move {
        if let Err(err) = crate::tasks::apply(store.as_ref(), &uid, request).await {
            warn!(%err, "background write failed");
        }
    });
}

fn next_filter(filter: Filter) -> Filter {
    match filter {
        Filter::All => Filter::Completed,
        Filter::Completed => Filter::Pending,
        Filter::Pending => Filter::All,
    }
}

fn filter_label(filter: Filter) -> &'static str {
    match filter {
        Filter::All => "All",
        Filter::Completed => "Completed",
        Filter::Pending => "Pending",
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Cyan,
    }
}

fn draw(frame: &mut Frame, state: &AppState, visible: &[Task], selected: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let progress = state.progress();
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(Span::styled(
                    "EverDo",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(progress.fraction)
        .label(format!(
            "{} / {} tasks completed",
            progress.completed, progress.total
        ));
    frame.render_widget(gauge, chunks[0]);

    let search = Paragraph::new(Line::from(vec![
        Span::raw("Search: "),
        Span::styled(
            format!("{}▌", state.search),
            Style::default().fg(Color::White),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Filter: {}", filter_label(state.filter))),
    );
    frame.render_widget(search, chunks[1]);

    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let mut row = Style::default();
            if task.completed {
                row = row.fg(Color::DarkGray).add_modifier(Modifier::CROSSED_OUT);
            }
            if index == selected {
                row = row.add_modifier(Modifier::REVERSED);
            }
            let mark = if task.completed { "[x]" } else { "[ ]" };
            let mut line = vec![
                Span::styled(
                    format!("{mark} "),
                    Style::default()
                        .fg(priority_color(task.priority))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(task.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    "  {} · {} · due {}",
                    task.priority, task.category, task.date
                )),
            ];
            if !task.subtasks.is_empty() {
                let done = task.subtasks.iter().filter(|s| s.completed).count();
                line.push(Span::raw(format!(
                    "  [{done}/{} steps]",
                    task.subtasks.len()
                )));
            }
            ListItem::new(Line::from(line)).style(row)
        })
        .collect();

    let body = List::new(items).block(Block::default().borders(Borders::ALL).title("Tasks"));
    frame.render_widget(body, chunks[2]);

    let footer = Paragraph::new(Line::from(vec![
        Span::styled("Tab", Style::default().fg(Color::Cyan)),
        Span::raw(" filter · "),
        Span::styled("↑↓", Style::default().fg(Color::Cyan)),
        Span::raw(" select · "),
        Span::styled("Enter", Style::default().fg(Color::Cyan)),
        Span::raw(" toggle · "),
        Span::styled("Del", Style::default().fg(Color::Cyan)),
        Span::raw(" delete · type to search · "),
        Span::styled("Esc", Style::default().fg(Color::Cyan)),
        Span::raw(" clear/exit"),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Controls"));
    frame.render_widget(footer, chunks[3]);
}

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        // Enter alternate screen to avoid polluting the shell buffer.
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }

    fn terminal(&self) -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
        let backend = CrosstermBackend::new(io::stdout());
        Ok(Terminal::new(backend)?)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Best-effort cleanup; errors are logged but not propagated from Drop.
        if let Err(err) = disable_raw_mode() {
            eprintln!("failed to disable raw mode: {err}");
        }
        if let Err(err) = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture) {
            eprintln!("failed to restore terminal: {err}");
        }
    }
}
