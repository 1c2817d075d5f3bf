//! Interactive dataset browser
//!
//! Full-screen terminal shell over the same client the CLI uses: browse and
//! filter the portal's dataset table, inspect a dataset's file tree, and
//! run downloads with a live progress gauge.
//!
//! Run with: `cargo run --bin dashboard`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Row, Table},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use aihub_fetcher::app::listing::FileTree;
use aihub_fetcher::app::models::{format_bytes, DatasetEntry, FileSelection};
use aihub_fetcher::app::{archive, AihubClient};
use aihub_fetcher::auth::{resolve_api_key, ApiKeySource, CredentialStore};
use aihub_fetcher::config::AppConfig;
use aihub_fetcher::constants::files;

/// Events flowing from background tasks into the UI loop
#[derive(Debug)]
enum UiEvent {
    Datasets(Vec<DatasetEntry>),
    DatasetsFailed(String),
    FileTree { dataset: String, tree: FileTree },
    FileTreeFailed { dataset: String, error: String },
    DownloadProgress { received: u64, total: Option<u64> },
    DownloadFinished { dataset: String, merged: usize },
    DownloadFailed { dataset: String, error: String },
}

/// Which pane has keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Datasets,
    Files,
}

/// A download in flight
#[derive(Debug, Clone)]
struct ActiveDownload {
    dataset: String,
    received: u64,
    total: Option<u64>,
}

/// Application state for the terminal UI
struct AppState {
    /// All datasets as fetched
    datasets: Vec<DatasetEntry>,
    /// Indices into `datasets` matching the current filter
    visible: Vec<usize>,
    /// Dataset list selection
    dataset_list: ListState,
    /// File tree of the most recently opened dataset
    file_tree: Option<(String, FileTree)>,
    /// File pane scroll offset
    file_offset: usize,
    /// Focused pane
    focus: Pane,
    /// Live filter over the dataset table
    filter: String,
    /// Whether keystrokes currently edit the filter
    filter_editing: bool,
    /// Short event history, newest last
    events: Vec<String>,
    /// Download in flight, if any
    download: Option<ActiveDownload>,
    /// Whether an API key is configured, and where it came from
    key_source: Option<String>,
    /// Busy indicator for in-flight listing fetches
    loading: bool,
}

impl AppState {
    fn new(key_source: Option<String>) -> Self {
        let mut dataset_list = ListState::default();
        dataset_list.select(Some(0));
        Self {
            datasets: Vec::new(),
            visible: Vec::new(),
            dataset_list,
            file_tree: None,
            file_offset: 0,
            focus: Pane::Datasets,
            filter: String::new(),
            filter_editing: false,
            events: Vec::new(),
            download: None,
            key_source,
            loading: true,
        }
    }

    fn log(&mut self, message: impl Into<String>) {
        let timestamp = Utc::now().format("%H:%M:%S");
        self.events.push(format!("[{}] {}", timestamp, message.into()));
        if self.events.len() > 50 {
            self.events.remove(0);
        }
    }

    /// Recompute the visible subset after a filter or data change
    fn apply_filter(&mut self) {
        let needle = self.filter.to_lowercase();
        self.visible = self
            .datasets
            .iter()
            .enumerate()
            .filter(|(_, d)| {
                needle.is_empty()
                    || d.key.to_lowercase().contains(&needle)
                    || d.name.to_lowercase().contains(&needle)
            })
            .map(|(i, _)| i)
            .collect();

        let clamped = self
            .dataset_list
            .selected()
            .unwrap_or(0)
            .min(self.visible.len().saturating_sub(1));
        self.dataset_list.select(Some(clamped));
    }

    /// The dataset under the cursor, honoring the filter
    fn selected_dataset(&self) -> Option<&DatasetEntry> {
        let row = self.dataset_list.selected()?;
        let index = *self.visible.get(row)?;
        self.datasets.get(index)
    }

    fn move_selection(&mut self, delta: isize) {
        match self.focus {
            Pane::Datasets => {
                if self.visible.is_empty() {
                    return;
                }
                let current = self.dataset_list.selected().unwrap_or(0) as isize;
                let last = self.visible.len() as isize - 1;
                let next = (current + delta).clamp(0, last);
                self.dataset_list.select(Some(next as usize));
            }
            Pane::Files => {
                let rows = self
                    .file_tree
                    .as_ref()
                    .map(|(_, tree)| tree.nodes.len())
                    .unwrap_or(0);
                let last = rows.saturating_sub(1) as isize;
                let next = (self.file_offset as isize + delta).clamp(0, last);
                self.file_offset = next as usize;
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // No tracing subscriber here: log lines would tear the alternate screen
    dotenv::dotenv().ok();

    let config = AppConfig::load_or_init(None)?;
    let store = CredentialStore::default_location()?;
    let key = resolve_api_key(&store)?;

    let key_label = key.as_ref().map(|source| match source {
        ApiKeySource::Environment(_) => "key: environment".to_string(),
        ApiKeySource::Stored(_) => "key: credential file".to_string(),
    });
    let client = Arc::new(AihubClient::with_config(
        config.client_config(),
        key.as_ref().map(|source| source.key()),
    )?);

    let (tx, rx) = mpsc::unbounded_channel();
    spawn_dataset_fetch(Arc::clone(&client), tx.clone());

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_ui(&mut terminal, client, &config, key_label, tx, rx).await;

    // Restore terminal
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;
    println!("Dashboard closed.");
    Ok(())
}

async fn run_ui(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    client: Arc<AihubClient>,
    config: &AppConfig,
    key_label: Option<String>,
    tx: mpsc::UnboundedSender<UiEvent>,
    mut rx: mpsc::UnboundedReceiver<UiEvent>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut state = AppState::new(key_label);
    state.log("Fetching dataset list...");

    loop {
        // Drain background events
        while let Ok(event) = rx.try_recv() {
            handle_ui_event(&mut state, event);
        }

        terminal.draw(|f| draw(f, &mut state))?;

        if !handle_input(&mut state, &client, config, &tx)? {
            return Ok(());
        }
    }
}

fn handle_ui_event(state: &mut AppState, event: UiEvent) {
    match event {
        UiEvent::Datasets(datasets) => {
            state.log(format!("Loaded {} datasets", datasets.len()));
            state.datasets = datasets;
            state.loading = false;
            state.apply_filter();
        }
        UiEvent::DatasetsFailed(error) => {
            state.loading = false;
            state.log(format!("Dataset list failed: {}", error));
        }
        UiEvent::FileTree { dataset, tree } => {
            state.loading = false;
            state.log(format!(
                "Dataset {}: {} files",
                dataset,
                tree.files().len()
            ));
            state.file_offset = 0;
            state.file_tree = Some((dataset, tree));
            state.focus = Pane::Files;
        }
        UiEvent::FileTreeFailed { dataset, error } => {
            state.loading = false;
            state.log(format!("File tree for {} failed: {}", dataset, error));
        }
        UiEvent::DownloadProgress { received, total } => {
            if let Some(download) = &mut state.download {
                download.received = received;
                download.total = total;
            }
        }
        UiEvent::DownloadFinished { dataset, merged } => {
            state.download = None;
            state.log(format!(
                "Dataset {} downloaded ({} split files reassembled)",
                dataset, merged
            ));
        }
        UiEvent::DownloadFailed { dataset, error } => {
            state.download = None;
            state.log(format!("Download of {} failed: {}", dataset, error));
        }
    }
}

/// Handle one round of terminal input. Returns false to quit.
fn handle_input(
    state: &mut AppState,
    client: &Arc<AihubClient>,
    config: &AppConfig,
    tx: &mpsc::UnboundedSender<UiEvent>,
) -> Result<bool, Box<dyn std::error::Error>> {
    if !event::poll(Duration::from_millis(100))? {
        return Ok(true);
    }
    let Event::Key(key_event) = event::read()? else {
        return Ok(true);
    };
    if key_event.kind != KeyEventKind::Press {
        return Ok(true);
    }

    if state.filter_editing {
        match key_event.code {
            KeyCode::Esc => {
                state.filter.clear();
                state.filter_editing = false;
                state.apply_filter();
            }
            KeyCode::Enter => state.filter_editing = false,
            KeyCode::Backspace => {
                state.filter.pop();
                state.apply_filter();
            }
            KeyCode::Char(c) => {
                state.filter.push(c);
                state.apply_filter();
            }
            _ => {}
        }
        return Ok(true);
    }

    match key_event.code {
        KeyCode::Char('q') | KeyCode::Esc => return Ok(false),
        KeyCode::Tab => {
            state.focus = match state.focus {
                Pane::Datasets => Pane::Files,
                Pane::Files => Pane::Datasets,
            };
        }
        KeyCode::Up | KeyCode::Char('k') => state.move_selection(-1),
        KeyCode::Down | KeyCode::Char('j') => state.move_selection(1),
        KeyCode::PageUp => state.move_selection(-10),
        KeyCode::PageDown => state.move_selection(10),
        KeyCode::Char('/') => state.filter_editing = true,
        KeyCode::Char('r') => {
            state.loading = true;
            state.log("Reloading dataset list...");
            spawn_dataset_fetch(Arc::clone(client), tx.clone());
        }
        KeyCode::Enter => {
            if let Some(dataset) = state.selected_dataset() {
                let key = dataset.key.clone();
                state.loading = true;
                state.log(format!("Fetching file tree for {}...", key));
                spawn_file_tree_fetch(Arc::clone(client), key, tx.clone());
            }
        }
        KeyCode::Char('d') => {
            if state.download.is_some() {
                state.log("A download is already running");
            } else if state.key_source.is_none() {
                state.log("No API key configured - run 'aihub_fetcher auth login' first");
            } else if let Some(dataset) = state.selected_dataset() {
                let key = dataset.key.clone();
                state.download = Some(ActiveDownload {
                    dataset: key.clone(),
                    received: 0,
                    total: None,
                });
                state.log(format!("Downloading dataset {}...", key));
                spawn_download(Arc::clone(client), config, key, tx.clone());
            }
        }
        _ => {}
    }
    Ok(true)
}

fn spawn_dataset_fetch(client: Arc<AihubClient>, tx: mpsc::UnboundedSender<UiEvent>) {
    tokio::spawn(async move {
        let event = match client.fetch_dataset_list().await {
            Ok(listing) => UiEvent::Datasets(listing.value),
            Err(e) => UiEvent::DatasetsFailed(e.to_string()),
        };
        let _ = tx.send(event);
    });
}

fn spawn_file_tree_fetch(
    client: Arc<AihubClient>,
    dataset: String,
    tx: mpsc::UnboundedSender<UiEvent>,
) {
    tokio::spawn(async move {
        let event = match client.fetch_file_tree(&dataset).await {
            Ok(listing) => UiEvent::FileTree {
                dataset,
                tree: listing.value,
            },
            Err(e) => UiEvent::FileTreeFailed {
                dataset,
                error: e.to_string(),
            },
        };
        let _ = tx.send(event);
    });
}

fn spawn_download(
    client: Arc<AihubClient>,
    config: &AppConfig,
    dataset: String,
    tx: mpsc::UnboundedSender<UiEvent>,
) {
    let output_base = config
        .download
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let keep_archive = config.download.keep_archive;

    tokio::spawn(async move {
        let output_dir = output_base.join(&dataset);
        let archive_path = output_dir.join(files::ARCHIVE_FILE_NAME);

        let progress_tx = tx.clone();
        let mut on_progress = move |received: u64, total: Option<u64>| {
            let _ = progress_tx.send(UiEvent::DownloadProgress { received, total });
        };

        let download = client
            .download_dataset(
                &dataset,
                &FileSelection::All,
                &archive_path,
                false,
                &mut on_progress,
            )
            .await;
        if let Err(e) = download {
            let _ = tx.send(UiEvent::DownloadFailed {
                dataset,
                error: e.to_string(),
            });
            return;
        }

        let pipeline = tokio::task::spawn_blocking(move || {
            archive::extract_archive(&archive_path, &output_dir)?;
            let merged = archive::merge_all(&output_dir)?;
            if !keep_archive {
                std::fs::remove_file(&archive_path)?;
            }
            Ok::<usize, aihub_fetcher::errors::ExtractError>(merged)
        })
        .await;

        let event = match pipeline {
            Ok(Ok(merged)) => UiEvent::DownloadFinished { dataset, merged },
            Ok(Err(e)) => UiEvent::DownloadFailed {
                dataset,
                error: e.to_string(),
            },
            Err(e) => UiEvent::DownloadFailed {
                dataset,
                error: format!("extraction task failed: {}", e),
            },
        };
        let _ = tx.send(event);
    });
}

/// Render the dashboard
fn draw(f: &mut Frame, state: &mut AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Content
            Constraint::Length(7), // Events
            Constraint::Length(3), // Download gauge / help
        ])
        .split(f.size());

    draw_header(f, state, chunks[0]);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);
    draw_dataset_list(f, state, content[0]);
    draw_file_pane(f, state, content[1]);

    draw_events(f, state, chunks[2]);
    draw_footer(f, state, chunks[3]);
}

fn draw_header(f: &mut Frame, state: &AppState, area: Rect) {
    let key_status = state.key_source.as_deref().unwrap_or("no API key");
    let loading = if state.loading { "  (loading...)" } else { "" };
    let title = Paragraph::new(format!(
        "AIHub Fetcher - dataset browser  |  {}{}",
        key_status, loading
    ))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, area);
}

fn draw_dataset_list(f: &mut Frame, state: &mut AppState, area: Rect) {
    let items: Vec<ListItem> = state
        .visible
        .iter()
        .map(|&i| {
            let dataset = &state.datasets[i];
            ListItem::new(format!("{:>6}  {}", dataset.key, dataset.name))
        })
        .collect();

    let title = if state.filter.is_empty() && !state.filter_editing {
        format!("Datasets ({})", state.visible.len())
    } else {
        format!("Datasets ({}) /{}", state.visible.len(), state.filter)
    };

    let highlight = if state.focus == Pane::Datasets {
        Style::default()
            .bg(Color::Cyan)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::REVERSED)
    };

    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(highlight);

    f.render_stateful_widget(list, area, &mut state.dataset_list);
}

fn draw_file_pane(f: &mut Frame, state: &AppState, area: Rect) {
    let Some((dataset, tree)) = &state.file_tree else {
        let placeholder = Paragraph::new("Press Enter on a dataset to list its files")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Files").borders(Borders::ALL));
        f.render_widget(placeholder, area);
        return;
    };

    let rows: Vec<Row> = tree
        .nodes
        .iter()
        .skip(state.file_offset)
        .map(|node| match &node.file {
            Some(leaf) => Row::new(vec![
                leaf.key.clone(),
                format_bytes(leaf.size.display),
                node.path.clone(),
            ]),
            None => Row::new(vec!["-".to_string(), "-".to_string(), node.path.clone()]),
        })
        .collect();

    let files = tree.files();
    let total = FileTree::total_size(&files);
    let title = format!(
        "Files of {} ({} files, {})",
        dataset,
        files.len(),
        format_bytes(total.display)
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Min(20),
        ],
    )
    .header(
        Row::new(vec!["KEY", "SIZE", "PATH"]).style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().title(title).borders(Borders::ALL));

    f.render_widget(table, area);
}

fn draw_events(f: &mut Frame, state: &AppState, area: Rect) {
    let visible_rows = area.height.saturating_sub(2) as usize;
    let start = state.events.len().saturating_sub(visible_rows);
    let events: Vec<ListItem> = state.events[start..]
        .iter()
        .map(|event| ListItem::new(event.as_str()))
        .collect();

    let list = List::new(events)
        .block(Block::default().title("Events").borders(Borders::ALL))
        .style(Style::default().fg(Color::Yellow));
    f.render_widget(list, area);
}

fn draw_footer(f: &mut Frame, state: &AppState, area: Rect) {
    if let Some(download) = &state.download {
        match download.total {
            Some(total) if total > 0 => {
                let ratio = (download.received as f64 / total as f64).clamp(0.0, 1.0);
                let gauge = Gauge::default()
                    .block(
                        Block::default()
                            .title(format!("Downloading {}", download.dataset))
                            .borders(Borders::ALL),
                    )
                    .gauge_style(Style::default().fg(Color::Green))
                    .ratio(ratio)
                    .label(format!(
                        "{} / {}",
                        format_bytes(download.received),
                        format_bytes(total)
                    ));
                f.render_widget(gauge, area);
            }
            _ => {
                let progress = Paragraph::new(format!(
                    "Downloading {}: {}",
                    download.dataset,
                    format_bytes(download.received)
                ))
                .block(Block::default().borders(Borders::ALL));
                f.render_widget(progress, area);
            }
        }
        return;
    }

    let help = Paragraph::new(
        "q quit | tab switch pane | enter open files | d download | / filter | r reload",
    )
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, area);
}
