//! Screen state: which screen is up, plus the decaying status line.
//!
//! This is a pure state holder. It never draws; the controller reads it
//! back, builds text lines, and hands them to
//! [`TextDisplay::render_lines`](crate::traits::TextDisplay::render_lines).
//! A redraw happens only when something here was marked dirty, so the
//! display bus stays quiet between input and network events.

use heapless::String as HString;

/// A status line shown under the main screen content.
pub type StatusLine = HString<32>;

/// Which screen the display currently shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Screen {
    /// The throttle operation screen.
    #[default]
    Operation,
    /// WiFi network list.
    SsidList,
    /// Password entry.
    PasswordEntry,
    /// Discovered server list.
    ServerList,
    /// Manual server address entry.
    ServerEntry,
    /// Roster list for acquisition.
    RosterList,
    /// Turnout list.
    TurnoutList {
        /// True when picking a turnout to throw, false to close.
        throw: bool,
    },
    /// Route list.
    RouteList,
    /// One page of the function list.
    FunctionList {
        /// Page of ten functions.
        page: u8,
    },
    /// Direct-command help.
    Help,
}

/// Screen plus redraw bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct ScreenState {
    screen: Screen,
    status: StatusLine,
    status_since_ms: u64,
    dirty: bool,
}

impl ScreenState {
    /// Start on the operation screen, needing a first draw.
    pub fn new() -> Self {
        Self {
            screen: Screen::Operation,
            status: StatusLine::new(),
            status_since_ms: 0,
            dirty: true,
        }
    }

    /// The active screen.
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Switch screens; a repeat of the current screen still redraws
    /// (list contents may have changed).
    pub fn show(&mut self, screen: Screen) {
        self.screen = screen;
        self.dirty = true;
    }

    /// The current status line, empty when decayed.
    pub fn status(&self) -> &str {
        &self.status
    }

    /// Put up a status line; it decays after the configured time.
    pub fn set_status(&mut self, text: &str, now_ms: u64) {
        self.status.clear();
        for c in text.chars() {
            if self.status.push(c).is_err() {
                break;
            }
        }
        self.status_since_ms = now_ms;
        self.dirty = true;
    }

    /// Mark the screen content stale without switching screens.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Decay the status line; call once per loop iteration.
    pub fn update(&mut self, now_ms: u64, decay_ms: u64) {
        if !self.status.is_empty() && now_ms.wrapping_sub(self.status_since_ms) >= decay_ms {
            self.status.clear();
            self.dirty = true;
        }
    }

    /// True when a redraw is due; clears the flag.
    pub fn take_dirty(&mut self) -> bool {
        let was = self.dirty;
        self.dirty = false;
        was
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_dirty_on_operation() {
        let mut state = ScreenState::new();
        assert_eq!(state.screen(), Screen::Operation);
        assert!(state.take_dirty());
        assert!(!state.take_dirty());
    }

    #[test]
    fn show_marks_dirty() {
        let mut state = ScreenState::new();
        state.take_dirty();
        state.show(Screen::RosterList);
        assert!(state.take_dirty());
        assert_eq!(state.screen(), Screen::RosterList);
    }

    #[test]
    fn status_decays_after_timeout() {
        let mut state = ScreenState::new();
        state.set_status("No servers found", 1_000);
        state.take_dirty();

        state.update(3_999, 3_000);
        assert_eq!(state.status(), "No servers found");

        state.update(4_000, 3_000);
        assert_eq!(state.status(), "");
        assert!(state.take_dirty());
    }

    #[test]
    fn long_status_is_truncated() {
        let mut state = ScreenState::new();
        let long = "x".repeat(64);
        state.set_status(&long, 0);
        assert_eq!(state.status().len(), 32);
    }

    #[test]
    fn screen_params_compare() {
        assert_ne!(
            Screen::TurnoutList { throw: true },
            Screen::TurnoutList { throw: false }
        );
        assert_ne!(
            Screen::FunctionList { page: 0 },
            Screen::FunctionList { page: 1 }
        );
    }
}
