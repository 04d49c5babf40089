//! Keypad and encoder input dispatcher.
//!
//! The [`Dispatcher`] turns raw key and encoder events into
//! [`InputEvent`]s for the controller, tracking the active
//! [`KeypadMode`] and the entry buffers (menu command, password, manual
//! server address). It never touches the model or the network: every
//! effect is an event the controller applies.
//!
//! # Key handling
//!
//! In operation mode each digit fires one [`Action`] from the
//! configured direct-action table. `*` opens a multi-digit menu
//! command committed by `#`; a bare `#` shows the direct-command help.
//! Selection modes consume a single digit and return to operation mode.
//!
//! # Encoder handling
//!
//! Rotation drives speed in operation mode, scaled by the step
//! multiplier; in password entry it cycles the pending character. The
//! encoder click is mode-specific: emergency stop in operation mode,
//! append-character in password entry.
//!
//! # Example
//!
//! ```rust
//! use wit_throttle::config::KeypadConfig;
//! use wit_throttle::input::{Dispatcher, InputEvent, KeypadMode};
//! use wit_throttle::traits::{Key, KeyEvent};
//!
//! let mut dispatcher = Dispatcher::new(KeypadConfig::default().direct_actions);
//!
//! // "*1#" opens roster selection
//! dispatcher.handle_key(KeyEvent::press(Key::Star));
//! dispatcher.handle_key(KeyEvent::press(Key::Digit(1)));
//! let event = dispatcher.handle_key(KeyEvent::press(Key::Hash));
//!
//! assert_eq!(event, Some(InputEvent::ShowRosterList));
//! assert_eq!(dispatcher.mode(), KeypadMode::SelectRoster);
//! ```

use heapless::String as HString;
use log::debug;

use crate::connection::ServerEntry;
use crate::protocol::FUNCTION_COUNT;
use crate::traits::hardware::{Key, KeyEvent, KeyPhase};
use crate::traits::network::ServerInfo;

/// Maximum password length in characters.
pub const MAX_PASSWORD: usize = 63;

/// An entered WiFi password.
pub type PasswordString = HString<64>;

/// Accumulated menu-command digits.
pub type MenuBuffer = HString<8>;

/// Characters the encoder cycles through in password entry.
const PASSWORD_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_!@#$%&*.";

/// What a digit key does in operation mode.
///
/// Bound per key through [`crate::config::KeypadConfig`]; every variant
/// is matched exhaustively by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Action {
    /// Key does nothing.
    None,
    /// Toggle function `n` on the current slot's lead locomotive.
    ToggleFunction(u8),
    /// Cycle to the next throttle slot.
    NextThrottle,
    /// Toggle the encoder step multiplier between 1 and 2.
    ToggleSpeedMultiplier,
    /// Set the current slot forward.
    DirectionForward,
    /// Set the current slot in reverse.
    DirectionReverse,
    /// Flip the current slot's direction.
    ToggleDirection,
    /// Speed 0 on the current slot, immediately.
    EmergencyStop,
    /// Release every locomotive on the current slot.
    ReleaseCurrent,
    /// Toggle track power.
    TrackPowerToggle,
}

/// Which input surface the keypad currently drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KeypadMode {
    /// Normal throttle operation.
    #[default]
    Operation,
    /// Picking a WiFi network by list digit.
    SelectSsid,
    /// Typing a WiFi password.
    EnterPassword,
    /// Picking a discovered server by list digit.
    SelectServer,
    /// Typing a manual server IP and port.
    EnterServerIp,
    /// Picking a roster entry by list digit.
    SelectRoster,
    /// Picking a turnout to throw.
    SelectTurnoutThrow,
    /// Picking a turnout to close.
    SelectTurnoutClose,
    /// Picking a route to activate.
    SelectRoute,
    /// Picking a function by list digit.
    SelectFunction,
}

/// What the controller should do in response to an input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Apply a direct action.
    Act(Action),
    /// A `*` menu command opened or changed; redraw the command line.
    MenuUpdated,
    /// The pending menu command was cancelled.
    MenuCancelled,
    /// Show the direct-command help screen.
    ShowHelp,
    /// Acquire this DCC address on the current slot.
    AcquireAddress(u16),
    /// Show the roster list (selection mode is now active).
    ShowRosterList,
    /// Show the turnout list for throwing or closing.
    ShowTurnoutList {
        /// True to throw, false to close.
        throw: bool,
    },
    /// Show the route list.
    ShowRouteList,
    /// Show one page of the function list.
    ShowFunctionList {
        /// Page of ten functions.
        page: u8,
    },
    /// A roster entry was picked by list position.
    RosterChosen(u8),
    /// A turnout was picked.
    TurnoutChosen {
        /// List position on the current page.
        index: u8,
        /// True to throw, false to close.
        throw: bool,
    },
    /// A route was picked.
    RouteChosen(u8),
    /// A function was picked (absolute index, page folded in).
    FunctionChosen(u8),
    /// A WiFi network was picked by list digit.
    SsidChosen(u8),
    /// A server was picked by list digit.
    ServerChosen(u8),
    /// The step multiplier changed.
    MultiplierChanged(u8),
    /// An entry buffer changed; redraw it.
    EntryUpdated,
    /// The typed password was committed.
    PasswordCommitted(PasswordString),
    /// A complete manual server address was committed.
    ServerEntered(ServerInfo),
    /// The manual address failed validation.
    EntryInvalid,
    /// Change the current slot speed by this many steps (already
    /// scaled by the multiplier).
    SpeedDelta(i32),
}

/// Keypad/encoder state machine.
pub struct Dispatcher {
    mode: KeypadMode,
    actions: [Action; 10],
    menu: Option<MenuBuffer>,
    password: PasswordString,
    pending_char: usize,
    server_entry: ServerEntry,
    function_page: u8,
    multiplier: u8,
}

impl Dispatcher {
    /// Create a dispatcher with the given direct-action table.
    pub fn new(actions: [Action; 10]) -> Self {
        Self {
            mode: KeypadMode::Operation,
            actions,
            menu: None,
            password: PasswordString::new(),
            pending_char: 0,
            server_entry: ServerEntry::new(),
            function_page: 0,
            multiplier: 1,
        }
    }

    /// The active keypad mode.
    pub fn mode(&self) -> KeypadMode {
        self.mode
    }

    /// Force a mode; entry buffers for the new mode start clean.
    ///
    /// The controller uses this for the WiFi startup flow (SSID,
    /// password, and server selection are entered from outside).
    pub fn set_mode(&mut self, mode: KeypadMode) {
        self.mode = mode;
        self.menu = None;
        match mode {
            KeypadMode::EnterPassword => {
                self.password.clear();
                self.pending_char = 0;
            }
            KeypadMode::EnterServerIp => self.server_entry.clear(),
            KeypadMode::SelectFunction => self.function_page = 0,
            _ => {}
        }
    }

    /// Current step multiplier (1 or 2).
    pub fn multiplier(&self) -> u8 {
        self.multiplier
    }

    /// Set the step multiplier, clamped to 1 or 2.
    pub fn set_multiplier(&mut self, multiplier: u8) {
        self.multiplier = multiplier.clamp(1, 2);
    }

    /// The pending `*` menu digits, if a command is open.
    pub fn menu_buffer(&self) -> Option<&str> {
        self.menu.as_deref()
    }

    /// The password typed so far plus the pending encoder character.
    pub fn password_preview(&self) -> PasswordString {
        let mut preview = self.password.clone();
        if self.mode == KeypadMode::EnterPassword {
            let _ = preview.push(PASSWORD_CHARSET[self.pending_char] as char);
        }
        preview
    }

    /// The manual-address template rendered with typed digits.
    pub fn server_entry_view(&self) -> crate::connection::EntryTemplate {
        self.server_entry.render()
    }

    /// The active function-list page.
    pub fn function_page(&self) -> u8 {
        self.function_page
    }

    // ------------------------------------------------------------------
    // Keypad
    // ------------------------------------------------------------------

    /// Process one key event. Only presses act; release and hold
    /// phases are ignored.
    pub fn handle_key(&mut self, event: KeyEvent) -> Option<InputEvent> {
        if event.phase != KeyPhase::Press {
            return None;
        }
        debug!("input: {:?} in {:?}", event.key, self.mode);
        match self.mode {
            KeypadMode::Operation => self.key_operation(event.key),
            KeypadMode::SelectRoster => {
                self.single_digit_pick(event.key, InputEvent::RosterChosen)
            }
            KeypadMode::SelectTurnoutThrow => self.single_digit_pick(event.key, |d| {
                InputEvent::TurnoutChosen {
                    index: d,
                    throw: true,
                }
            }),
            KeypadMode::SelectTurnoutClose => self.single_digit_pick(event.key, |d| {
                InputEvent::TurnoutChosen {
                    index: d,
                    throw: false,
                }
            }),
            KeypadMode::SelectRoute => self.single_digit_pick(event.key, InputEvent::RouteChosen),
            KeypadMode::SelectSsid => self.single_digit_pick(event.key, InputEvent::SsidChosen),
            KeypadMode::SelectServer => self.single_digit_pick(event.key, InputEvent::ServerChosen),
            KeypadMode::SelectFunction => self.key_select_function(event.key),
            KeypadMode::EnterPassword => self.key_enter_password(event.key),
            KeypadMode::EnterServerIp => self.key_enter_server(event.key),
        }
    }

    fn key_operation(&mut self, key: Key) -> Option<InputEvent> {
        match key {
            Key::Star => {
                // Opens (or restarts) a menu command
                self.menu = Some(MenuBuffer::new());
                Some(InputEvent::MenuUpdated)
            }
            Key::Digit(d) => {
                if let Some(menu) = self.menu.as_mut() {
                    let _ = menu.push((b'0' + d) as char);
                    Some(InputEvent::MenuUpdated)
                } else {
                    self.direct_action(d)
                }
            }
            Key::Hash => match self.menu.take() {
                Some(menu) => self.commit_menu(&menu),
                None => Some(InputEvent::ShowHelp),
            },
        }
    }

    fn direct_action(&mut self, digit: u8) -> Option<InputEvent> {
        match self.actions.get(digit as usize).copied()? {
            Action::None => None,
            Action::ToggleSpeedMultiplier => Some(self.toggle_multiplier()),
            action => Some(InputEvent::Act(action)),
        }
    }

    fn toggle_multiplier(&mut self) -> InputEvent {
        self.multiplier = if self.multiplier == 1 { 2 } else { 1 };
        InputEvent::MultiplierChanged(self.multiplier)
    }

    /// Commit a `*<command>[digits]#` menu string.
    fn commit_menu(&mut self, menu: &str) -> Option<InputEvent> {
        let mut chars = menu.chars();
        let Some(command) = chars.next().and_then(|c| c.to_digit(10)) else {
            // `*#` with nothing typed
            return Some(InputEvent::ShowHelp);
        };
        let argument: Option<u16> = {
            let rest = chars.as_str();
            if rest.is_empty() {
                None
            } else {
                rest.parse().ok()
            }
        };

        match command {
            1 => match argument {
                // `*1<addr>#` acquires directly; `*1#` opens the list
                Some(address) => Some(InputEvent::AcquireAddress(address)),
                None => {
                    self.mode = KeypadMode::SelectRoster;
                    Some(InputEvent::ShowRosterList)
                }
            },
            2 => Some(InputEvent::Act(Action::ReleaseCurrent)),
            3 => Some(InputEvent::Act(Action::ToggleDirection)),
            4 => Some(self.toggle_multiplier()),
            5 => {
                self.mode = KeypadMode::SelectTurnoutThrow;
                Some(InputEvent::ShowTurnoutList { throw: true })
            }
            6 => {
                self.mode = KeypadMode::SelectTurnoutClose;
                Some(InputEvent::ShowTurnoutList { throw: false })
            }
            7 => {
                self.mode = KeypadMode::SelectRoute;
                Some(InputEvent::ShowRouteList)
            }
            8 => Some(InputEvent::Act(Action::TrackPowerToggle)),
            0 => {
                self.mode = KeypadMode::SelectFunction;
                self.function_page = 0;
                Some(InputEvent::ShowFunctionList { page: 0 })
            }
            _ => Some(InputEvent::ShowHelp),
        }
    }

    /// Selection modes: one digit picks, `*` or `#` cancels.
    fn single_digit_pick(
        &mut self,
        key: Key,
        make: impl FnOnce(u8) -> InputEvent,
    ) -> Option<InputEvent> {
        match key {
            Key::Digit(d) => {
                self.mode = KeypadMode::Operation;
                Some(make(d))
            }
            Key::Star | Key::Hash => {
                self.mode = KeypadMode::Operation;
                Some(InputEvent::MenuCancelled)
            }
        }
    }

    fn key_select_function(&mut self, key: Key) -> Option<InputEvent> {
        match key {
            Key::Digit(d) => {
                let function = self.function_page * 10 + d;
                // The last page only reaches F31
                if function as usize >= FUNCTION_COUNT {
                    return None;
                }
                self.mode = KeypadMode::Operation;
                Some(InputEvent::FunctionChosen(function))
            }
            Key::Star => {
                // Pages of ten across F0-F31
                self.function_page = (self.function_page + 1) % 4;
                Some(InputEvent::ShowFunctionList {
                    page: self.function_page,
                })
            }
            Key::Hash => {
                self.mode = KeypadMode::Operation;
                Some(InputEvent::MenuCancelled)
            }
        }
    }

    fn key_enter_password(&mut self, key: Key) -> Option<InputEvent> {
        match key {
            Key::Digit(d) => {
                if self.password.len() < MAX_PASSWORD {
                    let _ = self.password.push((b'0' + d) as char);
                }
                Some(InputEvent::EntryUpdated)
            }
            Key::Star => {
                self.password.pop();
                Some(InputEvent::EntryUpdated)
            }
            Key::Hash => {
                self.mode = KeypadMode::Operation;
                Some(InputEvent::PasswordCommitted(self.password.clone()))
            }
        }
    }

    fn key_enter_server(&mut self, key: Key) -> Option<InputEvent> {
        match key {
            Key::Digit(d) => {
                self.server_entry.push_digit(d);
                Some(InputEvent::EntryUpdated)
            }
            Key::Star => {
                self.server_entry.delete_digit();
                Some(InputEvent::EntryUpdated)
            }
            Key::Hash => match self.server_entry.commit() {
                Some(server) => {
                    self.mode = KeypadMode::Operation;
                    Some(InputEvent::ServerEntered(server))
                }
                None => Some(InputEvent::EntryInvalid),
            },
        }
    }

    // ------------------------------------------------------------------
    // Encoder
    // ------------------------------------------------------------------

    /// Process encoder rotation.
    pub fn handle_encoder_delta(&mut self, delta: i32) -> Option<InputEvent> {
        if delta == 0 {
            return None;
        }
        match self.mode {
            KeypadMode::Operation => {
                Some(InputEvent::SpeedDelta(delta * self.multiplier as i32))
            }
            KeypadMode::EnterPassword => {
                let len = PASSWORD_CHARSET.len() as i32;
                let next = (self.pending_char as i32 + delta).rem_euclid(len);
                self.pending_char = next as usize;
                Some(InputEvent::EntryUpdated)
            }
            _ => None,
        }
    }

    /// Process an encoder click.
    pub fn handle_encoder_click(&mut self) -> Option<InputEvent> {
        match self.mode {
            KeypadMode::Operation => Some(InputEvent::Act(Action::EmergencyStop)),
            KeypadMode::EnterPassword => {
                if self.password.len() < MAX_PASSWORD {
                    let _ = self
                        .password
                        .push(PASSWORD_CHARSET[self.pending_char] as char);
                }
                Some(InputEvent::EntryUpdated)
            }
            _ => None,
        }
    }
}
