use std::collections::VecDeque;
use std::io;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use rift_coach::assets::AssetUrls;
use rift_coach::cache::ReferenceDataCache;
use rift_coach::config::RefDataConfig;
use rift_coach::model::{CharacterRecord, Freshness, VersionTag};
use rift_coach::roster::default_roster;
use rift_coach::normalize::AliasTable;
use rift_coach::search::{self, SearchHit, SearchOptions};

const LOG_CAPACITY: usize = 6;

enum Delta {
    Characters {
        version: VersionTag,
        records: Arc<Vec<CharacterRecord>>,
        freshness: Freshness,
    },
    ItemCount(usize),
    Log(String),
}

enum ProviderCommand {
    Refresh,
}

struct App {
    query: String,
    version: Option<VersionTag>,
    freshness: Option<Freshness>,
    characters: Arc<Vec<CharacterRecord>>,
    item_count: usize,
    hits: Vec<SearchHit<usize>>,
    selected: usize,
    show_detail: bool,
    help_overlay: bool,
    should_quit: bool,
    logs: VecDeque<String>,
    opts: SearchOptions,
    assets: AssetUrls,
    cmd_tx: mpsc::Sender<ProviderCommand>,
}

impl App {
    fn new(cfg: &RefDataConfig, cmd_tx: mpsc::Sender<ProviderCommand>) -> Self {
        Self {
            query: String::new(),
            version: None,
            freshness: None,
            // Searchable before the first fetch lands.
            characters: Arc::new(default_roster(&AliasTable::builtin())),
            item_count: 0,
            hits: Vec::new(),
            selected: 0,
            show_detail: false,
            help_overlay: false,
            should_quit: false,
            logs: VecDeque::new(),
            opts: SearchOptions::from_config(cfg),
            assets: AssetUrls::from_config(cfg),
            cmd_tx,
        }
    }

    fn push_log(&mut self, line: impl Into<String>) {
        if self.logs.len() == LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(line.into());
    }

    fn apply(&mut self, delta: Delta) {
        match delta {
            Delta::Characters {
                version,
                records,
                freshness,
            } => {
                self.push_log(format!(
                    "[INFO] {} characters @ {version} ({})",
                    records.len(),
                    freshness_label(Some(freshness))
                ));
                if !records.is_empty() {
                    self.characters = records;
                }
                self.version = Some(version);
                self.freshness = Some(freshness);
                self.rerank();
            }
            Delta::ItemCount(count) => self.item_count = count,
            Delta::Log(line) => self.push_log(line),
        }
    }

    fn rerank(&mut self) {
        // Hits store indices so they stay valid across roster swaps.
        self.hits = search::search(&self.query, self.characters.as_slice(), &self.opts)
            .into_iter()
            .map(|hit| SearchHit {
                item: hit.index,
                index: hit.index,
                score: hit.score,
                quality: hit.quality,
            })
            .collect();
        self.selected = self.selected.min(self.hits.len().saturating_sub(1));
    }

    fn selected_record(&self) -> Option<&CharacterRecord> {
        let hit = self.hits.get(self.selected)?;
        self.characters.get(hit.item)
    }

    fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match key.code {
            KeyCode::Char(c) => {
                self.query.push(c);
                self.selected = 0;
                self.rerank();
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.rerank();
            }
            KeyCode::Down => {
                if self.selected + 1 < self.hits.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Enter => self.show_detail = !self.show_detail,
            KeyCode::F(1) => self.help_overlay = !self.help_overlay,
            KeyCode::F(5) => {
                if self.cmd_tx.send(ProviderCommand::Refresh).is_err() {
                    self.push_log("[WARN] Refresh request failed");
                } else {
                    self.push_log("[INFO] Refresh request sent");
                }
            }
            KeyCode::Esc => {
                if self.query.is_empty() {
                    self.should_quit = true;
                } else {
                    self.query.clear();
                    self.rerank();
                }
            }
            _ => {}
        }
    }
}

fn spawn_provider(
    cfg: RefDataConfig,
    tx: mpsc::Sender<Delta>,
    cmd_rx: mpsc::Receiver<ProviderCommand>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(err) => {
                let _ = tx.send(Delta::Log(format!("[WARN] Runtime unavailable: {err}")));
                return;
            }
        };
        let cache = match ReferenceDataCache::from_config(&cfg) {
            Ok(cache) => cache,
            Err(err) => {
                let _ = tx.send(Delta::Log(format!("[WARN] Reference data disabled: {err:#}")));
                return;
            }
        };

        runtime.block_on(load_all(&cache, &tx));
        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                ProviderCommand::Refresh => {
                    cache.clear();
                    runtime.block_on(load_all(&cache, &tx));
                }
            }
        }
    });
}

async fn load_all(cache: &ReferenceDataCache, tx: &mpsc::Sender<Delta>) {
    let (characters, items) = tokio::join!(cache.characters(), cache.items());
    let _ = tx.send(Delta::Characters {
        version: characters.version.clone(),
        records: characters.data,
        freshness: characters.freshness,
    });
    let _ = tx.send(Delta::ItemCount(items.data.len()));
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let cfg = RefDataConfig::from_env();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(cfg.clone(), tx, cmd_rx);

    let mut app = App::new(&cfg, cmd_tx);
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            app.apply(delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(LOG_CAPACITY as u16 + 1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let input = Paragraph::new(format!("> {}", app.query))
        .block(Block::default().borders(Borders::ALL).title("Search"));
    frame.render_widget(input, chunks[1]);

    if app.show_detail {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[2]);
        render_results(frame, cols[0], app);
        render_detail(frame, cols[1], app);
    } else {
        render_results(frame, chunks[2], app);
    }

    let log_text = app.logs.iter().cloned().collect::<Vec<_>>().join("\n");
    let logs = Paragraph::new(log_text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(logs, chunks[3]);

    let footer = Paragraph::new("type to search | ↑/↓ Move | Enter Detail | F5 Refresh | F1 Help | Esc Clear/Quit");
    frame.render_widget(footer, chunks[4]);

    if app.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let version = app
        .version
        .as_ref()
        .map(VersionTag::to_string)
        .unwrap_or_else(|| "resolving".to_string());
    format!(
        "RIFT COACH | patch {version} | {} | {} characters | {} items",
        freshness_label(app.freshness),
        app.characters.len(),
        app.item_count
    )
}

fn freshness_label(freshness: Option<Freshness>) -> &'static str {
    match freshness {
        Some(Freshness::Fresh) => "live",
        Some(Freshness::Stale) => "stale",
        Some(Freshness::Unavailable) => "offline roster",
        None => "loading",
    }
}

fn render_results(frame: &mut Frame, area: Rect, app: &App) {
    if app.hits.is_empty() {
        let hint = if app.query.trim().chars().count() < app.opts.min_query_chars {
            "Type at least two characters"
        } else {
            "No matches"
        };
        let empty = Paragraph::new(hint).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, area);
        return;
    }

    let visible = area.height as usize;
    let start = app.selected.saturating_sub(visible.saturating_sub(1));
    for (row, (idx, hit)) in app.hits.iter().enumerate().skip(start).take(visible).enumerate() {
        let Some(record) = app.characters.get(hit.item) else {
            continue;
        };
        let row_area = Rect {
            x: area.x,
            y: area.y + row as u16,
            width: area.width,
            height: 1,
        };
        let style = if idx == app.selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let line = format!(
            "{:<18} {:<16} {:.2} {}",
            record.name,
            record.id,
            hit.score,
            hit.quality.label()
        );
        frame.render_widget(Paragraph::new(line).style(style), row_area);
    }
}

fn render_detail(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::LEFT).title("Detail");
    let Some(record) = app.selected_record() else {
        frame.render_widget(Paragraph::new("Nothing selected").block(block), area);
        return;
    };
    let version = app
        .version
        .clone()
        .unwrap_or_else(|| VersionTag::new("unknown"));
    let tags = if record.tags.is_empty() {
        "-".to_string()
    } else {
        record.tags.iter().cloned().collect::<Vec<_>>().join(", ")
    };
    let text = format!(
        "{}\n{}\n\nid:     {}\nkey:    {}\ntags:   {}\nimage:  {}\nsplash: {}",
        record.name,
        if record.title.is_empty() { "-" } else { record.title.as_str() },
        record.id,
        record.key.map(|k| k.to_string()).unwrap_or_else(|| "-".to_string()),
        tags,
        app.assets.character_image_url(&version, &record.id),
        app.assets.character_splash_url(&record.id),
    );
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = area.width.min(60);
    let height = area.height.min(10);
    let popup = Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    };
    let text = "Search matches display names, asset ids and titles.\n\
                Scores: 1.00 exact, 0.90 prefix, 0.70+ substring,\n\
                below that typo-tolerant matches.\n\n\
                F5 drops the cache and refetches from upstream.\n\
                F1 closes this help.";
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL).title("Help")),
        popup,
    );
}
