//! Terminal chat widget
//!
//! Renders the session store and drives the orchestrator from key events.
//! Requests run on their own task so the widget keeps drawing while one is
//! in flight; a finished task is reconciled before the next frame.

use crate::config::{Config, WidgetPosition};
use crate::orchestrator::Orchestrator;
use crate::rag::{QueryRequest, RagError, ResponsePayload};
use crate::session::{ClipboardSelection, Message, Role};
use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

const PANEL_WIDTH: u16 = 72;
const MINIMIZED_WIDTH: u16 = 24;
const MINIMIZED_HEIGHT: u16 = 3;

/// Run the widget until the user quits
pub async fn run(orchestrator: Orchestrator, config: &Config) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut cleanup = TerminalCleanup { enabled: true };

    let mut widget = ChatWidget::new(orchestrator, config);
    let result = widget.event_loop(&mut terminal).await;

    terminal.show_cursor()?;
    drop(terminal);
    cleanup.disable();
    result
}

struct TerminalCleanup {
    enabled: bool,
}

impl TerminalCleanup {
    fn disable(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        let _ = disable_raw_mode();
        let mut out = io::stdout();
        let _ = execute!(out, LeaveAlternateScreen);
    }
}

impl Drop for TerminalCleanup {
    fn drop(&mut self) {
        self.disable();
    }
}

enum AppAction {
    None,
    Quit,
    Submit(String),
    Retry,
}

struct ChatWidget {
    orchestrator: Orchestrator,
    composer: String,
    minimized: bool,
    position: WidgetPosition,
    /// Lines scrolled up from the live bottom of the transcript
    scroll_back: u16,
    pending: Option<JoinHandle<Result<ResponsePayload, RagError>>>,
    submit_started: Option<Instant>,
    clipboard: ClipboardSelection,
}

impl ChatWidget {
    fn new(orchestrator: Orchestrator, config: &Config) -> Self {
        Self {
            orchestrator,
            composer: String::new(),
            minimized: config.start_minimized,
            position: config.position,
            scroll_back: 0,
            pending: None,
            submit_started: None,
            clipboard: ClipboardSelection,
        }
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        loop {
            if let Some(finished) = self.pending.take_if(|handle| handle.is_finished()) {
                let result = match finished.await {
                    Ok(result) => result,
                    Err(err) => Err(RagError::unknown(format!("Worker task failed: {err}"))),
                };
                self.orchestrator.finish(result);
                self.submit_started = None;
                self.scroll_back = 0;
            }

            terminal.draw(|frame| self.render(frame))?;

            if !event::poll(Duration::from_millis(100))? {
                continue;
            }

            let action = match event::read()? {
                TermEvent::Key(key) => self.handle_key(key),
                _ => AppAction::None,
            };
            match action {
                AppAction::None => {}
                AppAction::Quit => break,
                AppAction::Submit(query) => {
                    if let Some(request) = self.orchestrator.begin_submit(&query) {
                        self.spawn_request(request);
                    }
                }
                AppAction::Retry => {
                    if let Some(request) = self.orchestrator.begin_retry() {
                        self.spawn_request(request);
                    }
                }
            }
        }
        Ok(())
    }

    fn spawn_request(&mut self, request: QueryRequest) {
        let client = self.orchestrator.client();
        self.submit_started = Some(Instant::now());
        self.pending = Some(tokio::spawn(
            async move { client.submit_query(&request).await },
        ));
    }

    fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.kind != KeyEventKind::Press {
            return AppAction::None;
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match (key.code, ctrl) {
            (KeyCode::Char('c'), true) => return AppAction::Quit,
            (KeyCode::Char('b'), true) => {
                self.minimized = !self.minimized;
                return AppAction::None;
            }
            (KeyCode::Esc, _) => {
                if self.orchestrator.store().error().is_some() {
                    self.orchestrator.dismiss_error();
                    return AppAction::None;
                }
                return AppAction::Quit;
            }
            _ => {}
        }

        if self.minimized {
            return AppAction::None;
        }

        match (key.code, ctrl) {
            (KeyCode::Char('r'), true) => {
                if self.pending.is_none() && self.orchestrator.can_retry() {
                    AppAction::Retry
                } else {
                    AppAction::None
                }
            }
            (KeyCode::Char('y'), true) => {
                self.orchestrator.capture_selection(&mut self.clipboard);
                AppAction::None
            }
            (KeyCode::Char('e'), true) => {
                self.composer = self.orchestrator.insert_selected_text(&self.composer);
                AppAction::None
            }
            (KeyCode::Char('l'), true) => {
                self.orchestrator.clear();
                AppAction::None
            }
            (KeyCode::Enter, _) => {
                // Disabled-input contract: no submission while one is in
                // flight. The state machine's guard backs this up.
                if self.pending.is_some() || !self.orchestrator.state().is_accepting() {
                    return AppAction::None;
                }
                AppAction::Submit(std::mem::take(&mut self.composer))
            }
            (KeyCode::Backspace, _) => {
                self.composer.pop();
                AppAction::None
            }
            (KeyCode::Up, _) => {
                self.scroll_back = self.scroll_back.saturating_add(1);
                AppAction::None
            }
            (KeyCode::Down, _) => {
                self.scroll_back = self.scroll_back.saturating_sub(1);
                AppAction::None
            }
            (KeyCode::Char(c), false) => {
                self.composer.push(c);
                AppAction::None
            }
            _ => AppAction::None,
        }
    }

    fn render(&self, frame: &mut Frame<'_>) {
        let area = frame.area();

        if self.minimized {
            let bar = anchored_rect(self.position, area, MINIMIZED_WIDTH, MINIMIZED_HEIGHT);
            let paragraph =
                Paragraph::new(Line::from("Ask the book (Ctrl+B)")).block(Block::bordered());
            frame.render_widget(paragraph, bar);
            return;
        }

        let panel = anchored_rect(self.position, area, PANEL_WIDTH.min(area.width), area.height);
        let banner_height = u16::from(self.orchestrator.store().error().is_some());
        let [transcript_area, banner_area, input_area, hint_area] = Layout::vertical([
            Constraint::Min(3),
            Constraint::Length(banner_height),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .areas(panel);

        self.render_transcript(frame, transcript_area);

        if let Some(error) = self.orchestrator.store().error() {
            let banner = Paragraph::new(Line::from(Span::styled(
                format!("{error}  (Esc to dismiss)"),
                Style::default().fg(Color::Red),
            )));
            frame.render_widget(banner, banner_area);
        }

        self.render_input(frame, input_area);
        self.render_hints(frame, hint_area);
    }

    fn render_transcript(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut lines: Vec<Line<'static>> = Vec::new();
        for message in self.orchestrator.store().transcript() {
            lines.extend(message_lines(message));
        }
        if self.orchestrator.store().loading() {
            let elapsed = self
                .submit_started
                .map_or(Duration::ZERO, |started| started.elapsed());
            lines.push(Line::from(Span::styled(
                thinking_line(elapsed),
                Style::default().fg(Color::DarkGray),
            )));
        }

        let inner_height = area.height.saturating_sub(2);
        let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        let bottom = total.saturating_sub(inner_height);
        let scroll_top = bottom.saturating_sub(self.scroll_back);

        let transcript = Paragraph::new(lines)
            .block(Block::bordered().title("flyleaf"))
            .wrap(Wrap { trim: false })
            .scroll((scroll_top, 0));
        frame.render_widget(transcript, area);
    }

    fn render_input(&self, frame: &mut Frame<'_>, area: Rect) {
        let loading = self.orchestrator.store().loading();
        let (title, style) = if loading {
            ("Waiting for answer", Style::default().fg(Color::DarkGray))
        } else {
            ("Ask about the book content", Style::default())
        };
        let input = Paragraph::new(self.composer.as_str())
            .style(style)
            .block(Block::bordered().title(title));
        frame.render_widget(input, area);

        if !loading {
            let cursor_offset = u16::try_from(self.composer.chars().count()).unwrap_or(u16::MAX);
            let x = (area.x + 1 + cursor_offset).min(area.right().saturating_sub(2));
            frame.set_cursor_position(Position::new(x, area.y + 1));
        }
    }

    fn render_hints(&self, frame: &mut Frame<'_>, area: Rect) {
        let mut hints = vec!["Enter send"];
        if self.orchestrator.can_retry() {
            hints.push("Ctrl+R retry");
        }
        hints.extend([
            "Ctrl+Y capture",
            "Ctrl+E context",
            "Ctrl+L clear",
            "Ctrl+B minimize",
            "Esc quit",
        ]);
        let line = Paragraph::new(Line::from(hints.join("  ")))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(line, area);
    }
}

// Rendering helpers, kept pure for testing

fn message_lines(message: &Message) -> Vec<Line<'static>> {
    let (badge, style) = role_badge(message.role);
    let mut lines = vec![Line::from(vec![
        Span::styled(badge, style),
        Span::raw(" "),
        Span::styled(
            message.timestamp.format("%H:%M:%S").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    ])];

    if let Some(error) = &message.error {
        lines.push(Line::from(Span::styled(
            format!("[{}] {}", error.code.code(), error.message),
            Style::default().fg(Color::Red),
        )));
    } else if message.content.is_empty() {
        // The placeholder slot while the answer is pending
        lines.push(Line::from(Span::styled(
            "...".to_string(),
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        for text_line in message.content.lines() {
            lines.push(Line::from(text_line.to_string()));
        }
    }

    for source in &message.sources {
        lines.push(Line::from(Span::styled(
            format!(
                "  {} ({}) - {}",
                source.label,
                source.url,
                relevance_label(source.relevance)
            ),
            Style::default().fg(Color::Cyan),
        )));
    }

    lines.push(Line::default());
    lines
}

fn role_badge(role: Role) -> (&'static str, Style) {
    match role {
        Role::User => (
            "you",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Role::Assistant => (
            "book",
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
        ),
        Role::System => ("system", Style::default().fg(Color::DarkGray)),
    }
}

fn relevance_label(score: f64) -> String {
    format!("Relevance: {:.0}%", score * 100.0)
}

fn thinking_line(elapsed: Duration) -> String {
    format!("Thinking... ({}s)", elapsed.as_secs())
}

fn anchored_rect(position: WidgetPosition, area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = match position {
        WidgetPosition::BottomLeft => area.x,
        WidgetPosition::BottomRight => area.right().saturating_sub(width),
    };
    let y = area.bottom().saturating_sub(height);
    Rect {
        x,
        y,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::{RagErrorKind, SourceRef};
    use crate::session::MessageError;
    use chrono::Utc;

    fn message(role: Role, content: &str) -> Message {
        Message {
            id: "msg-1".to_string(),
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
            sources: vec![],
            error: None,
        }
    }

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn relevance_is_a_rounded_percentage() {
        assert_eq!(relevance_label(0.92), "Relevance: 92%");
        assert_eq!(relevance_label(0.0), "Relevance: 0%");
        assert_eq!(relevance_label(1.0), "Relevance: 100%");
    }

    #[test]
    fn thinking_line_counts_whole_seconds() {
        assert_eq!(thinking_line(Duration::from_millis(2_600)), "Thinking... (2s)");
        assert_eq!(thinking_line(Duration::ZERO), "Thinking... (0s)");
    }

    #[test]
    fn sources_render_with_label_and_relevance() {
        let mut msg = message(Role::Assistant, "An answer.");
        msg.sources.push(SourceRef {
            url: "/docs/x".to_string(),
            label: "Intro".to_string(),
            relevance: 0.92,
        });

        let lines = message_lines(&msg);
        let rendered: Vec<String> = lines.iter().map(line_text).collect();
        assert!(rendered.iter().any(|l| l.contains("An answer.")));
        assert!(rendered
            .iter()
            .any(|l| l.contains("Intro (/docs/x) - Relevance: 92%")));
    }

    #[test]
    fn errored_messages_render_the_taxonomy_code() {
        let mut msg = message(Role::Assistant, "");
        msg.error = Some(MessageError {
            code: RagErrorKind::Timeout,
            message: "Request timeout after 50ms".to_string(),
        });

        let rendered: Vec<String> = message_lines(&msg).iter().map(line_text).collect();
        assert!(rendered
            .iter()
            .any(|l| l.contains("[TIMEOUT] Request timeout after 50ms")));
    }

    #[test]
    fn empty_placeholder_renders_a_pending_slot() {
        let rendered: Vec<String> = message_lines(&message(Role::Assistant, ""))
            .iter()
            .map(line_text)
            .collect();
        assert!(rendered.iter().any(|l| l == "..."));
    }

    #[test]
    fn anchored_rect_respects_the_configured_corner() {
        let area = Rect::new(0, 0, 100, 40);

        let right = anchored_rect(WidgetPosition::BottomRight, area, 24, 3);
        assert_eq!(right.x, 76);
        assert_eq!(right.y, 37);
        assert_eq!((right.width, right.height), (24, 3));

        let left = anchored_rect(WidgetPosition::BottomLeft, area, 24, 3);
        assert_eq!(left.x, 0);
        assert_eq!(left.y, 37);
    }

    #[test]
    fn anchored_rect_clamps_to_small_areas() {
        let area = Rect::new(0, 0, 10, 2);
        let rect = anchored_rect(WidgetPosition::BottomRight, area, 24, 3);
        assert_eq!((rect.width, rect.height), (10, 2));
        assert_eq!((rect.x, rect.y), (0, 0));
    }
}
