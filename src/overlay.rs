use std::io::{self, Stdout};

use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

pub const DEFAULT_MESSAGE: &str = "Mohon tunggu...";
pub const PROCESSING_MESSAGE: &str = "Memproses data...";

const SPINNER: &str = "◐";

/// Locks the page under the overlay so nothing scrolls behind it.
pub trait ScrollLock {
    fn lock(&mut self) -> io::Result<()>;
    fn unlock(&mut self) -> io::Result<()>;
}

/// Alternate screen with a hidden cursor: the shell's scrollback is untouched
/// until the overlay hides.
pub struct AlternateScreen;

impl ScrollLock for AlternateScreen {
    fn lock(&mut self) -> io::Result<()> {
        execute!(io::stdout(), EnterAlternateScreen, Hide)
    }

    fn unlock(&mut self) -> io::Result<()> {
        execute!(io::stdout(), Show, LeaveAlternateScreen)
    }
}

/// Full-screen "please wait" overlay shown while a request is running.
pub struct LoadingOverlay<B: Backend, L: ScrollLock> {
    make_backend: Box<dyn FnMut() -> B>,
    terminal: Option<Terminal<B>>,
    scroll_lock: L,
    message: String,
    visible: bool,
}

impl LoadingOverlay<CrosstermBackend<Stdout>, AlternateScreen> {
    pub fn stdout() -> Self {
        Self::new(|| CrosstermBackend::new(io::stdout()), AlternateScreen)
    }
}

impl<B: Backend, L: ScrollLock> LoadingOverlay<B, L> {
    /// The terminal is only created on the first `show`.
    pub fn new(make_backend: impl FnMut() -> B + 'static, scroll_lock: L) -> Self {
        Self {
            make_backend: Box::new(make_backend),
            terminal: None,
            scroll_lock,
            message: DEFAULT_MESSAGE.to_string(),
            visible: false,
        }
    }

    pub fn show(&mut self, message: &str) -> io::Result<()> {
        self.message = if message.is_empty() {
            DEFAULT_MESSAGE.to_string()
        } else {
            message.to_string()
        };

        if !self.visible {
            self.scroll_lock.lock()?;
            self.visible = true;
        }

        if self.terminal.is_none() {
            self.terminal = Some(Terminal::new((self.make_backend)())?);
        }
        if let Some(terminal) = &mut self.terminal {
            let message = &self.message;
            terminal.draw(|f| draw_overlay(f, message))?;
        }
        Ok(())
    }

    pub fn hide(&mut self) -> io::Result<()> {
        if !self.visible {
            return Ok(());
        }
        if let Some(terminal) = &mut self.terminal {
            terminal.clear()?;
        }
        self.visible = false;
        self.scroll_lock.unlock()
    }

    #[cfg(test)]
    fn terminal(&self) -> Option<&Terminal<B>> {
        self.terminal.as_ref()
    }
}

impl<B: Backend, L: ScrollLock> Drop for LoadingOverlay<B, L> {
    fn drop(&mut self) {
        let _ = self.hide();
    }
}

fn draw_overlay(frame: &mut Frame, message: &str) {
    let area = centered_rect(50, 40, frame.area());

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            SPINNER,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            message,
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];

    let overlay = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, frame.area());
    frame.render_widget(overlay, area);
}

/// Helper to create a centered rectangle
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

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct CountingLock {
        locks: Rc<Cell<u32>>,
        unlocks: Rc<Cell<u32>>,
    }

    impl ScrollLock for CountingLock {
        fn lock(&mut self) -> io::Result<()> {
            self.locks.set(self.locks.get() + 1);
            Ok(())
        }

        fn unlock(&mut self) -> io::Result<()> {
            self.unlocks.set(self.unlocks.get() + 1);
            Ok(())
        }
    }

    fn overlay() -> (
        LoadingOverlay<TestBackend, CountingLock>,
        CountingLock,
        Rc<Cell<u32>>,
    ) {
        let lock = CountingLock::default();
        let created = Rc::new(Cell::new(0));
        let c = created.clone();
        let overlay = LoadingOverlay::new(
            move || {
                c.set(c.get() + 1);
                TestBackend::new(60, 20)
            },
            lock.clone(),
        );
        (overlay, lock, created)
    }

    fn screen_text(overlay: &LoadingOverlay<TestBackend, CountingLock>) -> String {
        let buffer = overlay.terminal().unwrap().backend().buffer();
        buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>()
    }

    #[test]
    fn show_renders_message_and_locks_scrolling() {
        let (mut overlay, lock, _) = overlay();
        overlay.show(PROCESSING_MESSAGE).unwrap();

        assert!(overlay.visible);
        assert_eq!(lock.locks.get(), 1);
        assert!(screen_text(&overlay).contains(PROCESSING_MESSAGE));
    }

    #[test]
    fn show_twice_reuses_terminal_and_updates_message() {
        let (mut overlay, lock, created) = overlay();
        overlay.show("first").unwrap();
        overlay.show("second").unwrap();

        assert_eq!(created.get(), 1);
        assert_eq!(lock.locks.get(), 1);
        assert_eq!(overlay.message, "second");
        assert!(screen_text(&overlay).contains("second"));
    }

    #[test]
    fn empty_message_falls_back_to_default() {
        let (mut overlay, _, _) = overlay();
        overlay.show("").unwrap();
        assert_eq!(overlay.message, DEFAULT_MESSAGE);
    }

    #[test]
    fn hide_restores_scrolling_once() {
        let (mut overlay, lock, created) = overlay();
        overlay.hide().unwrap();
        assert_eq!(lock.unlocks.get(), 0);
        assert_eq!(created.get(), 0);

        overlay.show(DEFAULT_MESSAGE).unwrap();
        overlay.hide().unwrap();
        overlay.hide().unwrap();
        assert!(!overlay.visible);
        assert_eq!(lock.unlocks.get(), 1);

        overlay.show("again").unwrap();
        assert_eq!(created.get(), 1);
        assert_eq!(lock.locks.get(), 2);
    }

    #[test]
    fn drop_hides_visible_overlay() {
        let (mut overlay, lock, _) = overlay();
        overlay.show(DEFAULT_MESSAGE).unwrap();
        drop(overlay);
        assert_eq!(lock.unlocks.get(), 1);
    }
}
