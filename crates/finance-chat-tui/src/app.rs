use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::error;
use finance_chat_core::{ChatSession, Exchange, GenerateError, Submission};

/// Height used for scroll math before the first frame is drawn.
const FALLBACK_CHAT_HEIGHT: u16 = 20;

const INTERRUPTED_MESSAGE: &str = "request interrupted before an answer arrived";

/// The request currently running in the background.
pub struct PendingQuery {
    pub question: String,
    pub handle: JoinHandle<Exchange>,
}

pub struct App {
    pub should_quit: bool,
    pub session: ChatSession,

    // Input line
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of chat area for scroll calculations
    pub chat_width: u16,  // Inner width of chat area for wrap calculations
    pub chat_lines: u16,  // Wrapped line count of the last rendered chat
    pub follow_bottom: bool,
    pub chat_area: Option<Rect>,

    pub pending: Option<PendingQuery>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(session: ChatSession) -> Self {
        Self {
            should_quit: false,
            session,

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_lines: 0,
            follow_bottom: true,
            chat_area: None,

            pending: None,

            animation_frame: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_in_flight()
    }

    /// Mirrors the send button: disabled while loading or with blank input.
    pub fn can_submit(&self) -> bool {
        !self.is_loading() && !self.input.trim().is_empty()
    }

    /// Submit the input line. The question shows up immediately; the answer is
    /// picked up later by [`App::poll_pending`].
    pub fn submit(&mut self) {
        match self.session.begin(&self.input) {
            Submission::Pending(request) => {
                let question = request.question().to_string();
                let handle = tokio::spawn(request.send());
                self.pending = Some(PendingQuery { question, handle });
                self.input.clear();
                self.cursor = 0;
                self.follow_bottom = true;
            }
            Submission::MissingCredential => {
                self.follow_bottom = true;
            }
            Submission::Empty | Submission::Busy => {}
        }
    }

    /// Apply the background request's result once it has finished.
    pub async fn poll_pending(&mut self) {
        let finished = self
            .pending
            .as_ref()
            .map(|pending| pending.handle.is_finished())
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(pending) = self.pending.take() {
            let exchange = match pending.handle.await {
                Ok(exchange) => exchange,
                Err(e) => {
                    error!(error = %e, "request task failed");
                    Exchange {
                        question: pending.question,
                        outcome: Err(GenerateError::Other(format!("request task failed: {e}"))),
                    }
                }
            };
            self.session.complete(exchange);
            self.follow_bottom = true;
        }
    }

    /// Settle an unfinished request when quitting so the saved conversation
    /// never ends on an unanswered question.
    pub fn abandon_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
            self.session.complete(Exchange {
                question: pending.question,
                outcome: Err(GenerateError::Other(INTERRUPTED_MESSAGE.to_string())),
            });
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }

    // Chat scrolling
    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max_scroll = self.max_chat_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max_scroll);
        self.follow_bottom = self.chat_scroll >= max_scroll;
    }

    pub fn page_height(&self) -> u16 {
        if self.chat_height > 0 {
            self.chat_height
        } else {
            FALLBACK_CHAT_HEIGHT
        }
    }

    /// Scroll chat to bottom so the newest message (or "Thinking...") is visible
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    fn max_chat_scroll(&self) -> u16 {
        self.chat_lines.saturating_sub(self.page_height())
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
