use std::io;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, Wrap};

use crate::app::{App, BrowseItem, BrowseRequest, ProgressEvent, ProgressSink};
use crate::cart::{Priority, RequestType};
use crate::catalog::CatalogClient;
use crate::debounce::{Debouncer, ResponseGuard, SEARCH_DEBOUNCE};
use crate::directory::OrganizationClient;
use crate::highlight::HighlightSpan;
use crate::profile::ProfileClient;
use crate::search::{SortKey, SortOrder};
use crate::session::IdentityProvider;
use crate::store::KeyValueStore;

const TICK: Duration = Duration::from_millis(120);
const HINTS_SEARCH: &str =
    "type to search · ←/→ page · ↑/↓ select · ^S sort · ^O order · ^A request · ^K cart · Esc quit";
const HINTS_CART: &str = "↑/↓ select · d remove · c clear · s submit · Esc back";
const HINTS_JUSTIFY: &str = "business justification · Enter confirm · Esc cancel";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Search,
    Cart,
    Justify,
}

/// Interactive marketplace browser: debounced search-as-you-type over the
/// catalog with a cart panel.
pub struct Tui {
    query: String,
    page: u32,
    sort_key: SortKey,
    sort_order: SortOrder,
    selected: usize,
    cart_selected: usize,
    mode: Mode,
    justification: String,
    status: String,
    results: Option<crate::app::BrowseResult>,
    debouncer: Debouncer<String>,
    guard: ResponseGuard,
}

struct SilentSink;

impl ProgressSink for SilentSink {
    fn event(&self, _event: ProgressEvent) {}
}

impl Default for Tui {
    fn default() -> Self {
        Self::new()
    }
}

impl Tui {
    pub fn new() -> Self {
        Self {
            query: String::new(),
            page: 1,
            sort_key: SortKey::Relevance,
            sort_order: SortOrder::Desc,
            selected: 0,
            cart_selected: 0,
            mode: Mode::Search,
            justification: String::new(),
            status: "ready".to_string(),
            results: None,
            debouncer: Debouncer::new(SEARCH_DEBOUNCE),
            guard: ResponseGuard::new(),
        }
    }

    pub fn run<C, O, P, S, I>(&mut self, app: &mut App<C, O, P, S, I>) -> miette::Result<()>
    where
        C: CatalogClient,
        O: OrganizationClient,
        P: ProfileClient,
        S: KeyValueStore,
        I: IdentityProvider,
    {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        // initial unfiltered view
        self.refresh(app);

        let result = self.event_loop(&mut terminal, app);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop<C, O, P, S, I>(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        app: &mut App<C, O, P, S, I>,
    ) -> miette::Result<()>
    where
        C: CatalogClient,
        O: OrganizationClient,
        P: ProfileClient,
        S: KeyValueStore,
        I: IdentityProvider,
    {
        loop {
            if let Some(query) = self.debouncer.poll(Instant::now()) {
                self.query = query;
                self.page = 1;
                self.refresh(app);
            }

            let cart = app.cart_view();
            terminal
                .draw(|frame| self.draw(frame, &cart))
                .into_diagnostic()?;

            if event::poll(TICK).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key, app) {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Returns true when the session should end.
    fn handle_key<C, O, P, S, I>(&mut self, key: KeyEvent, app: &mut App<C, O, P, S, I>) -> bool
    where
        C: CatalogClient,
        O: OrganizationClient,
        P: ProfileClient,
        S: KeyValueStore,
        I: IdentityProvider,
    {
        match self.mode {
            Mode::Search => self.handle_search_key(key, app),
            Mode::Cart => {
                self.handle_cart_key(key, app);
                false
            }
            Mode::Justify => {
                self.handle_justify_key(key, app);
                false
            }
        }
    }

    fn handle_search_key<C, O, P, S, I>(&mut self, key: KeyEvent, app: &mut App<C, O, P, S, I>) -> bool
    where
        C: CatalogClient,
        O: OrganizationClient,
        P: ProfileClient,
        S: KeyValueStore,
        I: IdentityProvider,
    {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match (key.code, ctrl) {
            (KeyCode::Esc, _) => return true,
            (KeyCode::Char('s'), true) => {
                self.sort_key = next_sort_key(self.sort_key);
                self.page = 1;
                self.refresh(app);
            }
            (KeyCode::Char('o'), true) => {
                self.sort_order = match self.sort_order {
                    SortOrder::Asc => SortOrder::Desc,
                    SortOrder::Desc => SortOrder::Asc,
                };
                self.refresh(app);
            }
            (KeyCode::Char('a'), true) => {
                if self.selected_item().is_some() {
                    self.mode = Mode::Justify;
                    self.justification.clear();
                }
            }
            (KeyCode::Char('k'), true) => {
                app.cart_open();
                self.cart_selected = 0;
                self.mode = Mode::Cart;
            }
            (KeyCode::Char(c), false) => {
                self.query.push(c);
                self.debouncer.schedule(self.query.clone(), Instant::now());
            }
            (KeyCode::Backspace, _) => {
                self.query.pop();
                self.debouncer.schedule(self.query.clone(), Instant::now());
            }
            (KeyCode::Enter, _) => {
                self.debouncer.cancel();
                self.page = 1;
                self.refresh(app);
            }
            (KeyCode::Up, _) => {
                self.selected = self.selected.saturating_sub(1);
            }
            (KeyCode::Down, _) => {
                let len = self.result_len();
                if len > 0 && self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            (KeyCode::Left, _) => {
                if self.page > 1 {
                    self.page -= 1;
                    self.refresh(app);
                }
            }
            (KeyCode::Right, _) => {
                let last = self.results.as_ref().map(|r| r.total_pages).unwrap_or(1);
                if self.page < last {
                    self.page += 1;
                    self.refresh(app);
                }
            }
            _ => {}
        }
        false
    }

    fn handle_cart_key<C, O, P, S, I>(&mut self, key: KeyEvent, app: &mut App<C, O, P, S, I>)
    where
        C: CatalogClient,
        O: OrganizationClient,
        P: ProfileClient,
        S: KeyValueStore,
        I: IdentityProvider,
    {
        let count = app.cart().len();
        match key.code {
            KeyCode::Esc => {
                app.cart_close();
                self.mode = Mode::Search;
            }
            KeyCode::Up => self.cart_selected = self.cart_selected.saturating_sub(1),
            KeyCode::Down => {
                if count > 0 && self.cart_selected + 1 < count {
                    self.cart_selected += 1;
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                let view = app.cart_view();
                if let Some(line) = view.items.get(self.cart_selected) {
                    app.cart_remove(&line.dataset_id);
                    self.cart_selected = self.cart_selected.saturating_sub(1);
                    self.status = "request removed".to_string();
                }
            }
            KeyCode::Char('c') => {
                app.cart_clear();
                self.cart_selected = 0;
                self.status = "cart cleared".to_string();
            }
            KeyCode::Char('s') => match app.submit_requests(&SilentSink) {
                Ok(result) => {
                    self.status = format!("{} request(s) submitted", result.submitted);
                    self.mode = Mode::Search;
                }
                Err(err) => self.status = err.to_string(),
            },
            _ => {}
        }
    }

    fn handle_justify_key<C, O, P, S, I>(&mut self, key: KeyEvent, app: &mut App<C, O, P, S, I>)
    where
        C: CatalogClient,
        O: OrganizationClient,
        P: ProfileClient,
        S: KeyValueStore,
        I: IdentityProvider,
    {
        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Search;
            }
            KeyCode::Char(c) => self.justification.push(c),
            KeyCode::Backspace => {
                self.justification.pop();
            }
            KeyCode::Enter => {
                let Some(item) = self.selected_item().cloned() else {
                    self.mode = Mode::Search;
                    return;
                };
                let id = match item.id.parse() {
                    Ok(id) => id,
                    Err(_) => {
                        self.mode = Mode::Search;
                        return;
                    }
                };
                match app.cart_add(
                    &id,
                    RequestType::Access,
                    Priority::Standard,
                    self.justification.clone(),
                    &SilentSink,
                ) {
                    Ok(view) => self.status = format!("added to cart ({} pending)", view.count),
                    Err(err) => self.status = err.to_string(),
                }
                self.mode = Mode::Search;
                self.refresh(app);
            }
            _ => {}
        }
    }

    /// Issues a guarded search; a stale response can never overwrite a
    /// fresher one.
    fn refresh<C, O, P, S, I>(&mut self, app: &App<C, O, P, S, I>)
    where
        C: CatalogClient,
        O: OrganizationClient,
        P: ProfileClient,
        S: KeyValueStore,
        I: IdentityProvider,
    {
        let seq = self.guard.begin();
        let request = BrowseRequest {
            query: self.query.clone(),
            sort_key: self.sort_key,
            sort_order: self.sort_order,
            page: self.page,
            ..BrowseRequest::default()
        };
        match app.browse(&request, &SilentSink) {
            Ok(result) => {
                if self.guard.commit(seq) {
                    self.selected = self.selected.min(result.items.len().saturating_sub(1));
                    self.status = format!("{} dataset(s)", result.total_count);
                    self.results = Some(result);
                }
            }
            Err(err) => {
                self.status = err.to_string();
            }
        }
    }

    fn result_len(&self) -> usize {
        self.results.as_ref().map(|r| r.items.len()).unwrap_or(0)
    }

    fn selected_item(&self) -> Option<&BrowseItem> {
        self.results.as_ref()?.items.get(self.selected)
    }

    fn draw(&self, frame: &mut ratatui::Frame, cart: &crate::app::CartViewResult) {
        let area = frame.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(area);

        self.draw_input(frame, rows[0], cart);
        match self.mode {
            Mode::Cart => self.draw_cart(frame, rows[1], cart),
            _ => self.draw_results(frame, rows[1]),
        }
        self.draw_footer(frame, rows[2]);
    }

    fn draw_input(&self, frame: &mut ratatui::Frame, area: Rect, cart: &crate::app::CartViewResult) {
        let title = format!(" datamart · cart: {} ", cart.count);
        let content = match self.mode {
            Mode::Justify => Line::from(vec![
                Span::styled("justification> ", Style::default().fg(Color::Yellow)),
                Span::raw(self.justification.as_str()),
                Span::styled("▌", Style::default().fg(Color::Yellow)),
            ]),
            _ => Line::from(vec![
                Span::styled("search> ", Style::default().fg(Color::Cyan)),
                Span::raw(self.query.as_str()),
                Span::styled("▌", Style::default().fg(Color::Cyan)),
            ]),
        };
        frame.render_widget(
            Paragraph::new(content).block(Block::default().borders(Borders::ALL).title(title)),
            area,
        );
    }

    fn draw_results(&self, frame: &mut ratatui::Frame, area: Rect) {
        let Some(results) = &self.results else {
            frame.render_widget(
                Paragraph::new("loading catalog...")
                    .block(Block::default().borders(Borders::ALL).title(" results ")),
                area,
            );
            return;
        };

        let header = Row::new(vec!["", "Name", "Domain", "Class", "Q", "★", "Updated"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let rows: Vec<Row> = results
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let marker = if item.in_cart {
                    "+"
                } else if item.bookmarked {
                    "*"
                } else {
                    " "
                };
                let style = if index == self.selected {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Line::raw(marker.to_string()),
                    highlighted_line(&item.name_highlights),
                    Line::raw(item.domain.clone()),
                    Line::raw(item.classification.clone()),
                    Line::raw(item.quality_score.to_string()),
                    Line::raw(format!("{:.1}", item.average_rating)),
                    Line::raw(item.updated_at.format("%Y-%m-%d").to_string()),
                ])
                .style(style)
            })
            .collect();

        let title = format!(
            " results · page {}/{} · {} total · sort {} {} ",
            results.page,
            results.total_pages.max(1),
            results.total_count,
            self.sort_key,
            self.sort_order,
        );
        let table = Table::new(
            rows,
            [
                Constraint::Length(1),
                Constraint::Percentage(34),
                Constraint::Percentage(18),
                Constraint::Percentage(16),
                Constraint::Length(4),
                Constraint::Length(4),
                Constraint::Length(10),
            ],
        )
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(table, area);
    }

    fn draw_cart(&self, frame: &mut ratatui::Frame, area: Rect, cart: &crate::app::CartViewResult) {
        let rows: Vec<Row> = cart
            .items
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let style = if index == self.cart_selected {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    line.name.clone(),
                    line.request_type.to_string(),
                    line.priority.to_string(),
                    line.business_justification.clone(),
                ])
                .style(style)
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(35),
                Constraint::Length(12),
                Constraint::Length(10),
                Constraint::Percentage(40),
            ],
        )
        .header(
            Row::new(vec!["Dataset", "Request", "Priority", "Justification"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" pending requests ({}) ", cart.count)),
        );
        frame.render_widget(table, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame, area: Rect) {
        let hints = match self.mode {
            Mode::Search => HINTS_SEARCH,
            Mode::Cart => HINTS_CART,
            Mode::Justify => HINTS_JUSTIFY,
        };
        let line = Line::from(vec![
            Span::styled(
                format!(" {} ", self.status),
                Style::default().fg(Color::Green),
            ),
            Span::raw("· "),
            Span::styled(hints, Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(
            Paragraph::new(line)
                .wrap(Wrap { trim: true })
                .block(Block::default().borders(Borders::ALL)),
            area,
        );
    }
}

fn highlighted_line(spans: &[HighlightSpan]) -> Line<'static> {
    Line::from(
        spans
            .iter()
            .map(|span| {
                if span.highlighted {
                    Span::styled(
                        span.text.clone(),
                        Style::default().fg(Color::Black).bg(Color::Yellow),
                    )
                } else {
                    Span::raw(span.text.clone())
                }
            })
            .collect::<Vec<_>>(),
    )
}

fn next_sort_key(key: SortKey) -> SortKey {
    match key {
        SortKey::Relevance => SortKey::Name,
        SortKey::Name => SortKey::Updated,
        SortKey::Updated => SortKey::Quality,
        SortKey::Quality => SortKey::Usage,
        SortKey::Usage => SortKey::Relevance,
    }
}
