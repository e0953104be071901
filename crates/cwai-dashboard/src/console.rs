//! Interactive analysis console.
//!
//! A TUI where the user edits the analysis form with plain text and slash
//! commands, runs analyses against the backend, and browses reports. Network
//! calls run as tokio tasks and report back over a channel; the console is
//! the only owner of the controller.
//!
//! Launch with `cwai-dashboard` or `cwai-dashboard console`.

use std::io::{self, Stdout};
use std::str::FromStr;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use cwai_api::AnalysisApi;
use cwai_protocol::{AnalysisType, Catalog};
use cwai_state::{
    drive_submission, fetch_report, load_catalogs, load_recent_reports, AnalysisController,
    AnalysisEvent, Phase, SubmitError,
};

use crate::config::ConsoleSection;
use crate::format::threat_color;
use crate::render::{self, RenderLine, Tone};

const MAX_CONSOLE_MESSAGES: usize = 500;

/// The analysis console TUI state.
pub struct AnalysisConsole {
    controller: AnalysisController,
    api: Arc<dyn AnalysisApi>,
    events_tx: UnboundedSender<AnalysisEvent>,
    events_rx: UnboundedReceiver<AnalysisEvent>,
    /// Formatted tracing output, when logging is routed to the console.
    logs: Option<Receiver<String>>,
    recent_limit: u32,
    /// Current text in the input field.
    input: String,
    /// Cursor position within the input field, in characters.
    cursor_pos: usize,
    /// Command history for up/down arrow navigation.
    history: Vec<String>,
    history_pos: Option<usize>,
    result_scroll: u16,
    /// Frame counter driving the loading spinner.
    tick: u64,
    /// Messages displayed in the console output area.
    console_messages: Vec<(chrono::DateTime<chrono::Utc>, String, Color)>,
}

impl AnalysisConsole {
    pub fn new(catalog: Catalog, api: Arc<dyn AnalysisApi>, config: &ConsoleSection) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut console = Self {
            controller: AnalysisController::new(catalog),
            api,
            events_tx,
            events_rx,
            logs: None,
            recent_limit: config.recent_reports,
            input: String::new(),
            cursor_pos: 0,
            history: Vec::new(),
            history_pos: None,
            result_scroll: 0,
            tick: 0,
            console_messages: Vec::new(),
        };
        console.add_message(
            "Climate & Wildlife AI console ready. Type a research query and press Enter to set it.",
            Color::Cyan,
        );
        console.add_message(
            "Commands: /eco, /species, /type, /run, /report, /reports, /reset, /help, /quit",
            Color::DarkGray,
        );
        console
    }

    pub fn with_log_receiver(mut self, logs: Receiver<String>) -> Self {
        self.logs = Some(logs);
        self
    }

    /// Kick off the startup fetches: backend catalogs and recent reports.
    pub fn start(&mut self) {
        self.spawn_catalog_load();
        self.spawn_recent_reports();
    }

    fn spawn_catalog_load(&mut self) {
        let seq = self.controller.begin_catalog_load();
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match load_catalogs(api.as_ref()).await {
                Ok(remote) => AnalysisEvent::CatalogsLoaded { seq, remote },
                Err(error) => AnalysisEvent::CatalogsFailed { seq, error },
            };
            let _ = tx.send(event);
        });
    }

    fn spawn_recent_reports(&self) {
        let api = Arc::clone(&self.api);
        let tx = self.events_tx.clone();
        let limit = self.recent_limit;
        tokio::spawn(async move {
            let result = load_recent_reports(api.as_ref(), limit).await;
            let _ = tx.send(AnalysisEvent::RecentReports(result));
        });
    }

    /// Process the current input line.
    fn process_input(&mut self) {
        let input = self.input.trim().to_string();
        if input.is_empty() {
            return;
        }

        self.history.push(input.clone());
        self.history_pos = None;

        if input.starts_with('/') {
            self.process_command(&input);
        } else {
            self.controller.form_mut().set_query(input.as_str());
            self.add_message(&format!("Query set: {input}"), Color::Green);
        }

        self.input.clear();
        self.cursor_pos = 0;
    }

    /// Process a slash command.
    fn process_command(&mut self, cmd: &str) {
        let (command, args) = match cmd.split_once(' ') {
            Some((command, args)) => (command, args.trim()),
            None => (cmd, ""),
        };

        match command {
            "/help" => {
                self.add_message("Available commands:", Color::Cyan);
                for line in [
                    "  <text>            - Set the research query",
                    "  /type <eco|species> - Choose the analysis target type",
                    "  /eco [n|id]       - List ecosystems, or select one",
                    "  /species [n|id]   - List species of the selected ecosystem, or select one",
                    "  /run              - Validate the form and generate a report",
                    "  /report <id>      - Open an existing report",
                    "  /reports          - Refresh the recent reports list",
                    "  /catalog          - Show bundled ecosystems and species",
                    "  /reload           - Fetch backend catalogs again",
                    "  /reset            - Clear the form and result",
                    "  /status           - Show backend and analysis status",
                    "  /quit             - Exit the console",
                ] {
                    self.add_message(line, Color::White);
                }
            }
            "/type" => match AnalysisType::from_str(args) {
                Ok(analysis_type) => {
                    self.controller.form_mut().set_analysis_type(analysis_type);
                    self.add_message(&format!("Analysis type: {analysis_type}"), Color::Green);
                }
                Err(e) => self.add_message(&format!("{e}. Usage: /type <ecosystem|species>"), Color::Yellow),
            },
            "/eco" | "/ecosystem" => self.select_ecosystem(args),
            "/species" => self.select_species(args),
            "/run" | "/analyze" => self.submit(),
            "/report" => match args.parse::<i64>() {
                Ok(report_id) => self.open_report(report_id),
                Err(_) => self.add_message("Usage: /report <id>", Color::Yellow),
            },
            "/reports" => {
                self.spawn_recent_reports();
                self.add_message("Refreshing recent reports...", Color::DarkGray);
            }
            "/catalog" => {
                let lines = render::catalog_lines(self.controller.catalog());
                self.add_lines(lines);
            }
            "/reload" => {
                self.spawn_catalog_load();
                self.add_message("Reloading backend catalogs...", Color::DarkGray);
            }
            "/reset" => {
                self.controller.reset();
                self.result_scroll = 0;
                self.add_message("Form and result cleared.", Color::Green);
            }
            "/status" => {
                let (catalogs, _) = render::catalog_status(self.controller.remote_catalog());
                let (phase, _) = phase_label(self.controller.phase());
                self.add_message(&format!("Backend: {}", self.api.describe()), Color::Green);
                self.add_message(
                    &format!(
                        "Catalogs: {catalogs} | Phase: {phase} | Recent reports: {} | Request seq: {}",
                        self.controller.recent_reports().len(),
                        self.controller.latest_seq()
                    ),
                    Color::Green,
                );
            }
            _ => {
                self.add_message(
                    &format!("Unknown command: {command}. Type /help for available commands."),
                    Color::Red,
                );
            }
        }
    }

    fn select_ecosystem(&mut self, key: &str) {
        if key.is_empty() {
            let names: Vec<String> = self
                .controller
                .catalog()
                .ecosystems
                .iter()
                .enumerate()
                .map(|(i, e)| format!("  {}. {} {} ({})", i + 1, e.icon, e.label, e.id))
                .collect();
            self.add_message("Ecosystems:", Color::Cyan);
            for name in names {
                self.add_message(&name, Color::White);
            }
            return;
        }

        let Some(id) = self
            .controller
            .catalog()
            .find_ecosystem(key)
            .map(|e| e.id.clone())
        else {
            self.add_message(&format!("Unknown ecosystem: {key}"), Color::Yellow);
            return;
        };
        match self.controller.select_ecosystem(&id) {
            Ok(()) => self.add_message(&format!("Ecosystem: {id}"), Color::Green),
            Err(e) => self.add_message(&e.to_string(), Color::Yellow),
        }
    }

    fn select_species(&mut self, key: &str) {
        let options: Vec<(String, String, Color)> = self
            .controller
            .form()
            .available_species(self.controller.catalog())
            .into_iter()
            .map(|s| (s.id.clone(), format!("{} {} [{}]", s.icon, s.label, s.threat_level), threat_color(s.threat_level)))
            .collect();

        if key.is_empty() {
            if self.controller.form().selected_ecosystem().is_empty() {
                self.add_message("Select an ecosystem first to see available species.", Color::Yellow);
            } else if options.is_empty() {
                self.add_message("No species catalogued for this ecosystem.", Color::Yellow);
            } else {
                self.add_message("Species:", Color::Cyan);
                for (i, (_, label, color)) in options.iter().enumerate() {
                    self.add_message(&format!("  {}. {label}", i + 1), *color);
                }
            }
            return;
        }

        let id = match key.parse::<usize>() {
            Ok(n) if n >= 1 => match options.get(n - 1) {
                Some((id, _, _)) => id.clone(),
                None => {
                    self.add_message(&format!("No species number {n}"), Color::Yellow);
                    return;
                }
            },
            _ => key.to_string(),
        };

        match self.controller.select_species(&id) {
            Ok(()) => {
                if self.controller.form().analysis_type() != AnalysisType::Species {
                    self.controller.form_mut().set_analysis_type(AnalysisType::Species);
                }
                self.add_message(&format!("Species: {id}"), Color::Green);
            }
            Err(e) => self.add_message(&e.to_string(), Color::Yellow),
        }
    }

    fn submit(&mut self) {
        match self.controller.begin_submit() {
            Ok(submission) => {
                self.result_scroll = 0;
                self.add_message(
                    &format!(
                        "Analysing {} '{}'...",
                        submission.request.target_type, submission.request.target_name
                    ),
                    Color::Cyan,
                );
                tokio::spawn(drive_submission(
                    Arc::clone(&self.api),
                    submission,
                    self.events_tx.clone(),
                ));
            }
            Err(SubmitError::Invalid(errors)) => {
                for message in errors.values() {
                    self.add_message(message, Color::Yellow);
                }
            }
            Err(e @ SubmitError::CatalogUnavailable) => {
                self.add_message(&format!("{e} Use /reload to retry."), Color::Red);
            }
        }
    }

    fn open_report(&mut self, report_id: i64) {
        let ticket = self.controller.begin_open_report(report_id);
        self.result_scroll = 0;
        self.add_message(&format!("Opening report #{report_id}..."), Color::Cyan);
        tokio::spawn(fetch_report(
            Arc::clone(&self.api),
            ticket,
            report_id,
            self.events_tx.clone(),
        ));
    }

    /// Fold one background event into the controller and narrate it.
    fn handle_event(&mut self, event: AnalysisEvent) {
        let latest = self.controller.latest_seq();
        let catalog_seq = self.controller.catalog_seq();
        let mut announce_failure = false;

        let notice = match &event {
            AnalysisEvent::CatalogsLoaded { seq, remote } if *seq == catalog_seq => Some((
                format!(
                    "Backend catalogs loaded: {} ecosystems, {} species",
                    remote.ecosystems.len(),
                    remote.species.len()
                ),
                Color::Green,
            )),
            AnalysisEvent::CatalogsFailed { seq, error } if *seq == catalog_seq => Some((
                format!("{} ({error}) Use /reload to retry.", cwai_protocol::INITIAL_LOAD_FAILED_MSG),
                Color::Red,
            )),
            AnalysisEvent::Triggered { seq, response } if *seq == latest => Some((
                format!("Analysis accepted; fetching report #{}", response.report_id),
                Color::Cyan,
            )),
            AnalysisEvent::ReportFetched { seq, report } if *seq == latest => {
                self.result_scroll = 0;
                Some((format!("Report #{} ready.", report.id), Color::Green))
            }
            AnalysisEvent::Failed { seq, .. } if *seq == latest => {
                announce_failure = true;
                None
            }
            AnalysisEvent::RecentReports(Err(e)) => {
                Some((format!("Could not list recent reports: {e}"), Color::Yellow))
            }
            _ => None,
        };

        self.controller.apply(event);

        if let Some((message, color)) = notice {
            self.add_message(&message, color);
        }
        if announce_failure {
            if let Some(error) = self.controller.error() {
                self.add_message(&error.to_string(), Color::Red);
            }
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    fn drain_logs(&mut self) {
        let lines: Vec<String> = match &self.logs {
            Some(rx) => rx.try_iter().collect(),
            None => return,
        };
        for line in lines {
            let color = if line.contains("ERROR") {
                Color::Red
            } else if line.contains("WARN") {
                Color::Yellow
            } else {
                Color::DarkGray
            };
            self.add_message(line.trim(), color);
        }
    }

    fn add_message(&mut self, msg: &str, color: Color) {
        self.console_messages
            .push((chrono::Utc::now(), msg.to_string(), color));
        if self.console_messages.len() > MAX_CONSOLE_MESSAGES {
            self.console_messages.remove(0);
        }
    }

    fn add_lines(&mut self, lines: Vec<RenderLine>) {
        for line in lines {
            let color = tone_style(line.tone).fg.unwrap_or(Color::White);
            self.add_message(&line.text, color);
        }
    }

    /// Render the full console layout.
    fn render(&self, frame: &mut Frame) {
        let banner_height = if self.controller.error().is_some() { 3 } else { 0 };
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),             // Status bar
                Constraint::Length(banner_height), // Error banner
                Constraint::Min(8),                // Form + result
                Constraint::Length(5),             // Input area
            ])
            .split(frame.area());

        self.render_status_bar(frame, outer[0]);
        if banner_height > 0 {
            self.render_banner(frame, outer[1]);
        }
        self.render_main_area(frame, outer[2]);
        self.render_input(frame, outer[3]);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Climate & Wildlife AI Dashboard ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));

        let (catalogs, catalog_tone) = render::catalog_status(self.controller.remote_catalog());
        let (phase, phase_color) = phase_label(self.controller.phase());

        let status_line = Line::from(vec![
            Span::styled("  Backend: ", Style::default().fg(Color::Gray)),
            Span::styled(self.api.describe(), Style::default().fg(Color::White)),
            Span::styled("  |  Catalogs: ", Style::default().fg(Color::Gray)),
            Span::styled(catalogs, tone_style(catalog_tone)),
            Span::styled("  |  Analysis: ", Style::default().fg(Color::Gray)),
            Span::styled(phase, Style::default().fg(phase_color)),
            Span::styled("  |  Reports: ", Style::default().fg(Color::Gray)),
            Span::styled(
                self.controller.recent_reports().len().to_string(),
                Style::default().fg(Color::Magenta),
            ),
        ]);

        frame.render_widget(Paragraph::new(status_line).block(block), area);
    }

    fn render_banner(&self, frame: &mut Frame, area: Rect) {
        let message = self
            .controller
            .error()
            .map(|e| e.to_string())
            .unwrap_or_default();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));
        let text = Line::from(Span::styled(
            format!("  {message}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(Paragraph::new(text).block(block), area);
    }

    fn render_main_area(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(40), // Form + recent reports
                Constraint::Percentage(60), // Result + console output
            ])
            .split(area);

        let recent_height = (self.controller.recent_reports().len().max(1) + 2).min(12) as u16;
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(recent_height)])
            .split(columns[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(10)])
            .split(columns[1]);

        self.render_form(frame, left[0]);
        self.render_recent(frame, left[1]);
        self.render_result(frame, right[0]);
        self.render_console_output(frame, right[1]);
    }

    fn render_form(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Analysis ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        let lines = styled(render::form_lines(&self.controller));
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
            area,
        );
    }

    fn render_recent(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Recent Reports (/report <id>) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));
        let lines = styled(render::recent_lines(self.controller.recent_reports()));
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_result(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Report (PgUp/PgDn to scroll) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::LightBlue));
        let lines = styled(render::result_lines(&self.controller, self.tick));
        frame.render_widget(
            Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: false })
                .scroll((self.result_scroll, 0)),
            area,
        );
    }

    /// Render the console output area (console messages and log lines).
    fn render_console_output(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Console Output ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White));

        let inner_height = area.height.saturating_sub(2) as usize;
        let start = self.console_messages.len().saturating_sub(inner_height);

        let lines: Vec<Line> = self.console_messages[start..]
            .iter()
            .map(|(ts, msg, color)| {
                Line::from(vec![
                    Span::styled(
                        format!("  [{}] ", ts.format("%H:%M:%S")),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(msg.as_str(), Style::default().fg(*color)),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" Input (Enter = set query, /run = analyse, /help = commands) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green));

        let input_display = if self.input.is_empty() {
            Line::from(vec![
                Span::styled("  > ", Style::default().fg(Color::Green)),
                Span::styled(
                    "Type a research query or /command...",
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        } else {
            Line::from(vec![
                Span::styled("  > ", Style::default().fg(Color::Green)),
                Span::styled(self.input.as_str(), Style::default().fg(Color::White)),
            ])
        };

        let hint_line = Line::from(Span::styled(
            "  Ctrl+C or /quit to exit  |  Up/Down for history  |  Enter to submit",
            Style::default().fg(Color::DarkGray),
        ));

        frame.render_widget(
            Paragraph::new(vec![Line::from(""), input_display, hint_line]).block(block),
            area,
        );

        let cursor_x = area.x + 4 + self.cursor_pos as u16;
        frame.set_cursor_position((cursor_x, area.y + 2));
    }

    fn byte_pos(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    /// Handle keyboard input. Returns `true` if the console should exit.
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        let input_len = self.input.chars().count();
        match (code, modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => return true,
            (KeyCode::Char(c), _) => {
                let at = self.byte_pos();
                self.input.insert(at, c);
                self.cursor_pos += 1;
            }
            (KeyCode::Backspace, _) => {
                if self.cursor_pos > 0 {
                    self.cursor_pos -= 1;
                    let at = self.byte_pos();
                    self.input.remove(at);
                }
            }
            (KeyCode::Delete, _) => {
                if self.cursor_pos < input_len {
                    let at = self.byte_pos();
                    self.input.remove(at);
                }
            }
            (KeyCode::Left, _) => {
                self.cursor_pos = self.cursor_pos.saturating_sub(1);
            }
            (KeyCode::Right, _) => {
                if self.cursor_pos < input_len {
                    self.cursor_pos += 1;
                }
            }
            (KeyCode::Home, _) => self.cursor_pos = 0,
            (KeyCode::End, _) => self.cursor_pos = input_len,
            (KeyCode::Up, _) => {
                if !self.history.is_empty() {
                    let pos = match self.history_pos {
                        Some(p) => p.saturating_sub(1),
                        None => self.history.len() - 1,
                    };
                    self.history_pos = Some(pos);
                    self.input = self.history[pos].clone();
                    self.cursor_pos = self.input.chars().count();
                }
            }
            (KeyCode::Down, _) => {
                if let Some(pos) = self.history_pos {
                    if pos + 1 < self.history.len() {
                        self.history_pos = Some(pos + 1);
                        self.input = self.history[pos + 1].clone();
                        self.cursor_pos = self.input.chars().count();
                    } else {
                        self.history_pos = None;
                        self.input.clear();
                        self.cursor_pos = 0;
                    }
                }
            }
            (KeyCode::PageUp, _) => {
                self.result_scroll = self.result_scroll.saturating_sub(5);
            }
            (KeyCode::PageDown, _) => {
                self.result_scroll = self.result_scroll.saturating_add(5);
            }
            // Enter is handled by the event loop.
            _ => {}
        }
        false
    }
}

fn phase_label(phase: Phase) -> (String, Color) {
    match phase {
        Phase::Idle => ("idle".to_string(), Color::Gray),
        Phase::Submitting => ("generating".to_string(), Color::Yellow),
        Phase::AwaitingReport { report_id } => (format!("fetching #{report_id}"), Color::Yellow),
        Phase::Done => ("done".to_string(), Color::Green),
        Phase::Failed => ("failed".to_string(), Color::Red),
    }
}

fn tone_style(tone: Tone) -> Style {
    match tone {
        Tone::Heading => Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
        Tone::Label => Style::default().fg(Color::Yellow),
        Tone::Body => Style::default().fg(Color::White),
        Tone::Muted => Style::default().fg(Color::DarkGray),
        Tone::Good => Style::default().fg(Color::Green),
        Tone::Warning => Style::default().fg(Color::Yellow),
        Tone::Error => Style::default().fg(Color::Red),
        Tone::Threat(level) => Style::default().fg(threat_color(level)),
    }
}

fn styled(lines: Vec<RenderLine>) -> Vec<Line<'static>> {
    lines
        .into_iter()
        .map(|l| Line::from(Span::styled(l.text, tone_style(l.tone))))
        .collect()
}

fn is_quit(input: &str) -> bool {
    matches!(input.trim(), "/quit" | "/exit" | "/q")
}

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    console: &mut AnalysisConsole,
    tick_rate: Duration,
) -> io::Result<()> {
    loop {
        console.drain_events();
        console.drain_logs();
        console.tick = console.tick.wrapping_add(1);

        terminal.draw(|frame| console.render(frame))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind != KeyEventKind::Press {
                    continue;
                }
                if key_event.code == KeyCode::Enter {
                    if is_quit(&console.input) {
                        return Ok(());
                    }
                    console.process_input();
                } else if console.handle_key(key_event.code, key_event.modifiers) {
                    return Ok(()); // Ctrl+C
                }
            }
        }
    }
}

/// Run the analysis console until the user quits.
pub async fn run_console(
    api: Arc<dyn AnalysisApi>,
    catalog: Catalog,
    config: &ConsoleSection,
    logs: Receiver<String>,
) -> anyhow::Result<()> {
    use std::io::IsTerminal;
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        anyhow::bail!(
            "The console requires a terminal (TTY); use a subcommand such as `analyze` instead."
        );
    }

    // Restore the terminal if anything panics while raw mode is on.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut console = AnalysisConsole::new(catalog, api, config).with_log_receiver(logs);
    console.start();
    tracing::info!(backend = %console.api.describe(), "Console started");

    let mut terminal = setup_terminal()?;
    let outcome = event_loop(
        &mut terminal,
        &mut console,
        Duration::from_millis(config.tick_ms),
    );
    restore_terminal(&mut terminal)?;
    outcome?;
    Ok(())
}
