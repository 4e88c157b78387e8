use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;

use ks_core::{Category, ConfigStore};
use ks_nav::{Choice, Event as NavEvent, ExitReason, Flow, Navigator, Page};

const TICK_RATE: Duration = Duration::from_millis(200);
const TITLE: &str = "kube switch: Kubernetes Context Switcher";
const CURRENT_MARKER: &str = "► ";

#[derive(Debug)]
struct Ui {
    contexts: ListState,
    namespaces: ListState,
    button: usize,
}

impl Ui {
    fn new(nav: &Navigator) -> Self {
        let mut contexts = ListState::default();
        let current = nav
            .rows()
            .iter()
            .position(|row| nav.config().is_current(&row.name));
        if !nav.rows().is_empty() {
            contexts.select(Some(current.unwrap_or(0)));
        }
        Self {
            contexts,
            namespaces: ListState::default(),
            button: 0,
        }
    }

    /// Reset per-page widget state when a page gains focus.
    fn focus(&mut self, page: &Page) {
        match page {
            Page::Decision { .. } => self.button = 0,
            Page::NamespaceList { namespaces, .. } => {
                self.namespaces
                    .select(if namespaces.is_empty() { None } else { Some(0) });
            }
            Page::ContextList | Page::Confirmation { .. } => {}
        }
    }

    fn next_button(&mut self) {
        self.button = (self.button + 1) % Choice::ALL.len();
    }

    fn prev_button(&mut self) {
        self.button = if self.button == 0 {
            Choice::ALL.len() - 1
        } else {
            self.button - 1
        };
    }
}

#[derive(Debug, Clone, Copy)]
enum Move {
    Up,
    Down,
    PageUp,
    PageDown,
    First,
    Last,
}

fn move_list(state: &mut ListState, len: usize, movement: Move) {
    if len == 0 {
        state.select(None);
        return;
    }
    let i = state.selected().unwrap_or(0);
    let next = match movement {
        Move::Up => {
            if i == 0 {
                len - 1
            } else {
                i - 1
            }
        }
        Move::Down => {
            if i + 1 >= len {
                0
            } else {
                i + 1
            }
        }
        Move::PageUp => i.saturating_sub(5),
        Move::PageDown => (i + 5).min(len - 1),
        Move::First => 0,
        Move::Last => len - 1,
    };
    state.select(Some(next));
}

fn list_move(key: &KeyEvent) -> Option<Move> {
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Some(Move::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(Move::Down),
        KeyCode::PageUp => Some(Move::PageUp),
        KeyCode::PageDown => Some(Move::PageDown),
        KeyCode::Home | KeyCode::Char('g') => Some(Move::First),
        KeyCode::End | KeyCode::Char('G') => Some(Move::Last),
        _ => None,
    }
}

/// Run the interactive switcher until the user confirms a switch or quits.
pub fn run(mut navigator: Navigator, store: &dyn ConfigStore) -> Result<ExitReason> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut ui = Ui::new(&navigator);
    log::info!("showing {} contexts", navigator.rows().len());
    let result = event_loop(&mut terminal, &mut navigator, store, &mut ui);

    restore_terminal(terminal)?;
    result
}

fn event_loop(
    terminal: &mut Terminal<ratatui::backend::CrosstermBackend<Stdout>>,
    nav: &mut Navigator,
    store: &dyn ConfigStore,
    ui: &mut Ui,
) -> Result<ExitReason> {
    loop {
        terminal.draw(|frame| render_app(frame, nav, ui))?;

        if !event::poll(TICK_RATE)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(nav_event) = map_key(nav, ui, key) else {
            continue;
        };
        log::debug!("key {:?} -> {nav_event:?}", key.code);

        let before = nav.focused().clone();
        let flow = nav
            .dispatch(nav_event, store)
            .with_context(|| format!("failed to update {}", nav.path().display()))?;
        if let Flow::Exit(reason) = flow {
            return Ok(reason);
        }
        if *nav.focused() != before {
            ui.focus(nav.focused());
        }
    }
}

/// Translate a key press into a navigator event. List and button movement
/// stays local to the UI and yields `None`.
fn map_key(nav: &Navigator, ui: &mut Ui, key: KeyEvent) -> Option<NavEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(NavEvent::Interrupt);
    }

    match nav.focused() {
        Page::ContextList => {
            if let Some(movement) = list_move(&key) {
                move_list(&mut ui.contexts, nav.rows().len(), movement);
                return None;
            }
            match key.code {
                KeyCode::Enter => ui
                    .contexts
                    .selected()
                    .and_then(|i| nav.rows().get(i))
                    .map(|row| NavEvent::SelectContext(row.name.clone())),
                KeyCode::Char('q') => Some(NavEvent::Interrupt),
                _ => None,
            }
        }
        Page::Decision { .. } => match key.code {
            KeyCode::Left | KeyCode::Char('h') | KeyCode::BackTab => {
                ui.prev_button();
                None
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Tab => {
                ui.next_button();
                None
            }
            KeyCode::Enter => Choice::ALL.get(ui.button).copied().map(NavEvent::Choose),
            KeyCode::Esc => Some(NavEvent::Back),
            _ => None,
        },
        Page::NamespaceList { namespaces, .. } => {
            if let Some(movement) = list_move(&key) {
                move_list(&mut ui.namespaces, namespaces.len(), movement);
                return None;
            }
            match key.code {
                KeyCode::Enter => ui
                    .namespaces
                    .selected()
                    .and_then(|i| namespaces.get(i))
                    .map(|namespace| NavEvent::SelectNamespace(namespace.clone())),
                KeyCode::Esc => Some(NavEvent::Back),
                _ => None,
            }
        }
        Page::Confirmation { .. } => match key.code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => Some(NavEvent::Acknowledge),
            _ => None,
        },
    }
}

fn category_color(category: Category) -> Color {
    match category {
        Category::Production => Color::Magenta,
        Category::Staging => Color::LightMagenta,
        Category::Development => Color::Blue,
        Category::Unknown => Color::LightBlue,
    }
}

fn render_app(frame: &mut Frame, nav: &Navigator, ui: &mut Ui) {
    let size = frame.size();
    for page in nav.stack().pages() {
        match page {
            Page::ContextList => render_contexts(frame, size, nav, ui),
            Page::NamespaceList { .. } => render_namespaces(frame, size, nav, page, ui),
            Page::Decision { guarded, .. } => {
                let title = if *guarded { "Production Context" } else { "Context" };
                let buttons: Vec<&str> = Choice::ALL.iter().map(|choice| choice.label()).collect();
                render_modal(frame, size, title, page, &buttons, ui.button, *guarded);
            }
            Page::Confirmation { .. } => {
                render_modal(frame, size, "Done", page, &["OK"], 0, false);
            }
        }
    }
}

fn page_layout(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area)
}

fn render_title(frame: &mut Frame, area: Rect, title: &str) {
    let header = Paragraph::new(title)
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn render_contexts(frame: &mut Frame, area: Rect, nav: &Navigator, ui: &mut Ui) {
    let chunks = page_layout(area);
    render_title(frame, chunks[0], TITLE);

    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(6)].as_ref())
        .split(chunks[1]);

    let config = nav.config();
    let items = nav
        .rows()
        .iter()
        .map(|row| {
            let marker = if config.is_current(&row.name) { CURRENT_MARKER } else { "" };
            let summary = config
                .context(&row.name)
                .map(ks_core::ContextEntry::summary)
                .unwrap_or_default();
            ListItem::new(vec![
                Line::from(Span::styled(
                    format!("{marker}{}", row.name),
                    Style::default().fg(category_color(row.category)),
                )),
                Line::from(Span::styled(
                    format!("  {summary}"),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Contexts"))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(list, body[0], &mut ui.contexts);

    let details = match ui.contexts.selected().and_then(|i| nav.rows().get(i)) {
        Some(row) => match config.context(&row.name) {
            Some(entry) => vec![
                Line::from(format!("Context:   {}", row.name)),
                Line::from(format!("Cluster:   {}", entry.cluster)),
                Line::from(format!("User:      {}", entry.user)),
                Line::from(vec![
                    Span::raw(format!("Namespace: {}  ", entry.namespace_or_default())),
                    Span::styled(
                        format!("[{}]", row.category),
                        Style::default().fg(category_color(row.category)),
                    ),
                ]),
            ],
            None => vec![Line::from("No context information available")],
        },
        None => vec![Line::from(format!(
            "No contexts found in {}",
            nav.path().display()
        ))],
    };
    let details = Paragraph::new(details)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .wrap(Wrap { trim: true });
    frame.render_widget(details, body[1]);

    render_guide_bar(frame, chunks[2], &Page::ContextList);
}

fn render_namespaces(frame: &mut Frame, area: Rect, nav: &Navigator, page: &Page, ui: &mut Ui) {
    let Page::NamespaceList {
        context,
        namespaces,
    } = page
    else {
        return;
    };
    frame.render_widget(Clear, area);
    let chunks = page_layout(area);
    render_title(frame, chunks[0], &format!("Namespaces for context: {context}"));

    let active = nav
        .config()
        .context(context)
        .map(ks_core::ContextEntry::namespace_or_default);
    let items = namespaces
        .iter()
        .map(|namespace| {
            let marker = if Some(namespace.as_str()) == active { CURRENT_MARKER } else { "" };
            ListItem::new(format!("{marker}{namespace}"))
        })
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Namespaces"))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(list, chunks[1], &mut ui.namespaces);

    render_guide_bar(frame, chunks[2], page);
}

fn render_modal(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    page: &Page,
    buttons: &[&str],
    selected: usize,
    warning: bool,
) {
    let popup_area = centered_rect(70, 30, area);
    frame.render_widget(Clear, popup_area);
    let border = if warning { Color::Red } else { Color::Magenta };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(border));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(1)].as_ref())
        .margin(1)
        .split(popup_area);

    let text = Paragraph::new(page.message().unwrap_or_default())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(text, chunks[0]);

    let mut spans: Vec<Span> = Vec::new();
    for (i, label) in buttons.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        let style = if i == selected {
            Style::default().fg(Color::Black).bg(border).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!(" {label} "), style));
    }
    let row = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    frame.render_widget(row, chunks[1]);

    frame.render_widget(block, popup_area);
}

fn render_guide_bar(frame: &mut Frame, area: Rect, page: &Page) {
    let guide = Paragraph::new(hint_text(page))
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Blue))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(guide, area);
}

fn key_hints(page: &Page) -> Vec<(&'static str, &'static str)> {
    match page {
        Page::ContextList => vec![
            ("↑/↓", "Navigate"),
            ("Enter", "Select"),
            ("q", "Quit"),
            ("Ctrl-C", "Quit"),
        ],
        Page::Decision { .. } => vec![
            ("←/→", "Choose"),
            ("Enter", "Confirm"),
            ("Esc", "Cancel"),
            ("Ctrl-C", "Quit"),
        ],
        Page::NamespaceList { .. } => vec![
            ("↑/↓", "Navigate"),
            ("Enter", "Select"),
            ("Esc", "Back"),
            ("Ctrl-C", "Quit"),
        ],
        Page::Confirmation { .. } => vec![("Enter", "Exit")],
    }
}

fn hint_text(page: &Page) -> String {
    key_hints(page)
        .iter()
        .map(|(key, desc)| format!("{key}: {desc}"))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

fn restore_terminal(mut terminal: Terminal<ratatui::backend::CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
