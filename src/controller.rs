//! Top-level controller: owns every subsystem and runs the cooperative
//! tick.
//!
//! The [`WitController`] composes the session, the roster model, the
//! input dispatcher, and the screen state, plus the platform handles
//! behind the traits. Everything is an owned field; there are no
//! globals anywhere in the crate.
//!
//! # Tick ordering
//!
//! Each [`tick`](WitController::tick) runs one cooperative pass:
//!
//! 1. keypad and encoder events → model mutation → outbound queue
//! 2. WiFi/session state machine progress
//! 3. received lines → model updates
//! 4. status decay → render when anything changed
//!
//! Nothing blocks; the caller loops and supplies the millisecond clock.
//!
//! # Example
//!
//! ```rust
//! use wit_throttle::config::Config;
//! use wit_throttle::controller::WitController;
//! use wit_throttle::hal::mock::*;
//!
//! let mut controller = WitController::new(
//!     Config::default(),
//!     MockTransport::new(),
//!     MockDiscovery::new(),
//!     MockWifi::new(),
//!     MockKeypad::new(),
//!     MockEncoder::new(),
//!     MockBattery::new(),
//!     MockStorage::new(),
//!     MockDisplay::new(),
//! );
//! controller.start(0);
//! controller.tick(0);
//! ```

use core::fmt::Write as _;

use heapless::{String as HString, Vec};
use log::{info, warn};

use crate::config::{BatteryShowMode, Config};
use crate::connection::{ConnectionState, Session, SessionError, SessionEvent};
use crate::input::{Action, Dispatcher, InputEvent, KeypadMode};
use crate::prefs::Preferences;
use crate::protocol::{Command, ServerMessage, TrackPower};
use crate::roster::{ModelError, Roster};
use crate::screen::{Screen, ScreenState};
use crate::traits::display::{TextDisplay, DISPLAY_LINES};
use crate::traits::hardware::{BatteryMonitor, EncoderInput, KeypadInput};
use crate::traits::network::{ServiceDiscovery, SsidInfo, Transport, WifiLink, MAX_SSIDS};
use crate::traits::storage::Storage;

type Line = HString<32>;

/// The handheld controller core.
///
/// Generic over every platform seam; see [`crate::hal::mock`] for the
/// desktop test doubles.
pub struct WitController<T, D, W, K, E, B, S, V>
where
    T: Transport,
    D: ServiceDiscovery,
    W: WifiLink,
    K: KeypadInput,
    E: EncoderInput,
    B: BatteryMonitor,
    S: Storage,
    V: TextDisplay,
{
    config: Config,
    session: Session<T, D>,
    wifi: W,
    keypad: K,
    encoder: E,
    battery: B,
    prefs: Preferences<S>,
    display: V,
    roster: Roster,
    dispatcher: Dispatcher,
    screen: ScreenState,
    ssids: Vec<SsidInfo, MAX_SSIDS>,
    pending_ssid: Option<HString<32>>,
    awaiting_association: bool,
    battery_alert: BatteryAlert,
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum BatteryAlert {
    None,
    Low,
    Critical,
}

impl<T, D, W, K, E, B, S, V> WitController<T, D, W, K, E, B, S, V>
where
    T: Transport,
    D: ServiceDiscovery,
    W: WifiLink,
    K: KeypadInput,
    E: EncoderInput,
    B: BatteryMonitor,
    S: Storage,
    V: TextDisplay,
{
    /// Build the controller from configuration and platform handles.
    ///
    /// Stored preferences override the runtime-adjustable settings
    /// (step multiplier, slot count); connection policy comes from the
    /// configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        transport: T,
        discovery: D,
        wifi: W,
        keypad: K,
        encoder: E,
        battery: B,
        storage: S,
        display: V,
    ) -> Self {
        let prefs = Preferences::new(storage);

        // Stored preferences win over the configured defaults.
        let mut config = config;
        config.throttle.speed_multiplier =
            prefs.speed_multiplier(config.throttle.speed_multiplier);
        config.throttle.max_throttles = prefs.max_throttles(config.throttle.max_throttles);
        config.display.battery_mode = prefs.battery_show_mode(config.display.battery_mode);

        let mut session = Session::new(transport, discovery);
        session.set_auto_connect(config.server.auto_connect);
        if let Some((ip, port)) = prefs.last_server() {
            session.set_preferred_server(ip, port);
        }
        session.set_heartbeat_enabled(config.server.heartbeat_enabled);
        session.set_leading_crlf(config.server.leading_crlf);
        for cmd in &config.server.startup_commands {
            session.add_startup_command(cmd);
        }

        let mut roster = Roster::new();
        roster.set_prefixes(&config.server.turnout_prefix, &config.server.route_prefix);
        roster.set_max_slots(config.throttle.max_throttles);

        let mut dispatcher = Dispatcher::new(config.keypad.direct_actions);
        dispatcher.set_multiplier(config.throttle.speed_multiplier);

        Self {
            config,
            session,
            wifi,
            keypad,
            encoder,
            battery,
            prefs,
            display,
            roster,
            dispatcher,
            screen: ScreenState::new(),
            ssids: Vec::new(),
            pending_ssid: None,
            awaiting_association: false,
            battery_alert: BatteryAlert::None,
        }
    }

    /// Begin the startup flow: join WiFi, then discover servers.
    ///
    /// With the link already up this goes straight to discovery. With
    /// configured credentials it joins and waits; otherwise it scans
    /// and asks the user to pick a network.
    pub fn start(&mut self, now_ms: u64) {
        if self.wifi.is_associated() {
            self.session.start_discovery();
            return;
        }

        if self.config.wifi.is_configured() {
            let ssid = self.config.wifi.ssid.clone();
            let password = self.config.wifi.password.clone();
            self.join_network(&ssid, &password, now_ms);
            return;
        }

        match self.wifi.scan() {
            Ok(networks) => {
                info!("controller: {} network(s) found", networks.len());
                self.ssids = networks;
                if self.ssids.is_empty() {
                    self.screen.set_status("No networks found", now_ms);
                } else if let Some(index) = self.remembered_network() {
                    self.apply(InputEvent::SsidChosen(index), now_ms);
                } else {
                    self.dispatcher.set_mode(KeypadMode::SelectSsid);
                    self.screen.show(Screen::SsidList);
                }
            }
            Err(_) => self.screen.set_status("WiFi scan failed", now_ms),
        }
    }

    /// Scan position of the last-joined network, when rejoining is on.
    fn remembered_network(&self) -> Option<u8> {
        if !self.config.wifi.rejoin_last {
            return None;
        }
        let last = self.prefs.last_ssid();
        if last.is_empty() {
            return None;
        }
        self.ssids
            .iter()
            .position(|n| n.ssid.as_str() == last.as_str())
            .map(|i| i as u8)
    }

    /// One cooperative pass; call continuously with a monotonic clock.
    pub fn tick(&mut self, now_ms: u64) {
        // Input first, so commands from this pass reach the queue
        // before the session drains it.
        while let Some(key) = self.keypad.poll_event() {
            if let Some(event) = self.dispatcher.handle_key(key) {
                self.apply(event, now_ms);
            }
        }
        let delta = self.encoder.read_delta();
        if let Some(event) = self.dispatcher.handle_encoder_delta(delta) {
            self.apply(event, now_ms);
        }
        if self.encoder.button_just_pressed() {
            if let Some(event) = self.dispatcher.handle_encoder_click() {
                self.apply(event, now_ms);
            }
        }

        self.check_battery(now_ms);

        // WiFi association completing kicks off discovery.
        if self.awaiting_association && self.wifi.is_associated() {
            self.awaiting_association = false;
            self.session.start_discovery();
        }

        match self.session.tick(now_ms) {
            Ok(Some(event)) => self.on_session_event(event, now_ms),
            Ok(None) => {}
            Err(_) => self.screen.set_status("Network error", now_ms),
        }

        // Receive after sending: inbound updates land in the model and
        // are rendered in the same pass.
        loop {
            match self.session.poll_message() {
                Ok(Some(message)) => self.on_message(message),
                Ok(None) => break,
                Err(_) => {
                    self.screen.set_status("Network error", now_ms);
                    break;
                }
            }
        }

        self.screen
            .update(now_ms, self.config.display.status_decay_ms as u64);
        if self.screen.take_dirty() {
            self.render();
        }
    }

    /// The roster/throttle model.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The WiThrottle session.
    pub fn session(&self) -> &Session<T, D> {
        &self.session
    }

    /// Mutably borrow the session (scripting mocks in tests).
    pub fn session_mut(&mut self) -> &mut Session<T, D> {
        &mut self.session
    }

    /// The screen state.
    pub fn screen(&self) -> &ScreenState {
        &self.screen
    }

    /// The input dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The display back-end (mock inspection in tests).
    pub fn display(&self) -> &V {
        &self.display
    }

    /// The keypad handle.
    pub fn keypad_mut(&mut self) -> &mut K {
        &mut self.keypad
    }

    /// The encoder handle.
    pub fn encoder_mut(&mut self) -> &mut E {
        &mut self.encoder
    }

    /// The WiFi handle.
    pub fn wifi_mut(&mut self) -> &mut W {
        &mut self.wifi
    }

    /// The preference layer.
    pub fn prefs(&self) -> &Preferences<S> {
        &self.prefs
    }

    // ------------------------------------------------------------------
    // Input events
    // ------------------------------------------------------------------

    fn apply(&mut self, event: InputEvent, now_ms: u64) {
        match event {
            InputEvent::Act(action) => self.apply_action(action, now_ms),
            InputEvent::MenuUpdated | InputEvent::EntryUpdated => self.screen.invalidate(),
            InputEvent::MenuCancelled => self.screen.show(Screen::Operation),
            InputEvent::ShowHelp => self.screen.show(Screen::Help),
            InputEvent::AcquireAddress(address) => {
                self.acquire(address, now_ms);
                self.screen.show(Screen::Operation);
            }
            InputEvent::ShowRosterList => self.screen.show(Screen::RosterList),
            InputEvent::ShowTurnoutList { throw } => {
                self.screen.show(Screen::TurnoutList { throw })
            }
            InputEvent::ShowRouteList => self.screen.show(Screen::RouteList),
            InputEvent::ShowFunctionList { page } => {
                self.screen.show(Screen::FunctionList { page })
            }
            InputEvent::RosterChosen(index) => {
                match self.roster.find_by_index(index as usize).map(|e| e.address) {
                    Some(address) => self.acquire(address, now_ms),
                    None => self.screen.set_status("No such entry", now_ms),
                }
                self.screen.show(Screen::Operation);
            }
            InputEvent::TurnoutChosen { index, throw } => {
                let command = self
                    .roster
                    .turnout_at(index as usize)
                    .map(|t| t.sys_name.clone())
                    .and_then(|sys| {
                        if throw {
                            self.roster.throw_turnout(&sys).ok()
                        } else {
                            self.roster.close_turnout(&sys).ok()
                        }
                    });
                match command {
                    Some(command) => self.send(command, now_ms),
                    None => self.screen.set_status("No such turnout", now_ms),
                }
                self.screen.show(Screen::Operation);
            }
            InputEvent::RouteChosen(index) => {
                let command = self
                    .roster
                    .route_at(index as usize)
                    .map(|r| r.sys_name.clone())
                    .and_then(|sys| self.roster.activate_route(&sys).ok());
                match command {
                    Some(command) => self.send(command, now_ms),
                    None => self.screen.set_status("No such route", now_ms),
                }
                self.screen.show(Screen::Operation);
            }
            InputEvent::FunctionChosen(function) => {
                self.toggle_function(function, now_ms);
                self.screen.show(Screen::Operation);
            }
            InputEvent::SsidChosen(index) => {
                match self.ssids.get(index as usize).cloned() {
                    Some(network) if network.open => {
                        let ssid = network.ssid.clone();
                        self.join_network(&ssid, "", now_ms);
                    }
                    Some(network) => {
                        let stored = self.prefs.wifi_password(&network.ssid);
                        if stored.is_empty() {
                            self.pending_ssid = Some(network.ssid.clone());
                            self.dispatcher.set_mode(KeypadMode::EnterPassword);
                            self.screen.show(Screen::PasswordEntry);
                        } else {
                            let ssid = network.ssid.clone();
                            self.join_network(&ssid, &stored, now_ms);
                        }
                    }
                    None => self.screen.set_status("No such network", now_ms),
                }
            }
            InputEvent::ServerChosen(index) => {
                if self.session.select_server(index as usize, now_ms).is_err() {
                    self.screen.set_status("No such server", now_ms);
                    self.dispatcher.set_mode(KeypadMode::SelectServer);
                } else {
                    self.screen.set_status("Connecting", now_ms);
                    self.screen.show(Screen::Operation);
                }
            }
            InputEvent::MultiplierChanged(multiplier) => {
                self.prefs.set_speed_multiplier(multiplier);
                let mut status = Line::new();
                let _ = write!(status, "Step x{}", multiplier);
                self.screen.set_status(&status, now_ms);
            }
            InputEvent::PasswordCommitted(password) => {
                if let Some(ssid) = self.pending_ssid.take() {
                    self.join_network(&ssid, &password, now_ms);
                }
                self.screen.show(Screen::Operation);
            }
            InputEvent::ServerEntered(server) => {
                if self.session.connect_to(server, now_ms).is_err() {
                    self.screen.set_status("Connect failed", now_ms);
                } else {
                    self.screen.set_status("Connecting", now_ms);
                }
                self.screen.show(Screen::Operation);
            }
            InputEvent::EntryInvalid => self.screen.set_status("Invalid address", now_ms),
            InputEvent::SpeedDelta(delta) => {
                let slot = self.roster.current_slot();
                if let Some(lead) = self.roster.slot(slot).and_then(|s| s.lead_address()) {
                    let current = self
                        .roster
                        .slot(slot)
                        .map(|s| s.current_speed as i32)
                        .unwrap_or(0);
                    if let Ok(command) = self.roster.set_speed(slot, lead, current + delta) {
                        self.send(command, now_ms);
                        self.screen.invalidate();
                    }
                }
            }
        }
    }

    fn apply_action(&mut self, action: Action, now_ms: u64) {
        let slot = self.roster.current_slot();
        match action {
            Action::None => {}
            Action::ToggleFunction(function) => self.toggle_function(function, now_ms),
            Action::NextThrottle => {
                self.roster.next_slot();
                self.screen.invalidate();
            }
            // Handled inside the dispatcher; nothing reaches here
            Action::ToggleSpeedMultiplier => {}
            Action::DirectionForward => {
                self.set_direction(crate::protocol::Direction::Forward, now_ms)
            }
            Action::DirectionReverse => {
                self.set_direction(crate::protocol::Direction::Reverse, now_ms)
            }
            Action::ToggleDirection => {
                let current = self
                    .roster
                    .slot(slot)
                    .map(|s| s.current_direction)
                    .unwrap_or_default();
                self.set_direction(current.toggled(), now_ms);
            }
            Action::EmergencyStop => {
                if let Ok(command) = self.roster.emergency_stop(slot) {
                    self.send(command, now_ms);
                }
                self.screen.set_status("STOP", now_ms);
            }
            Action::ReleaseCurrent => {
                if self.roster.slot_has_loco(slot) {
                    if let Ok(command) = self.roster.release_all(slot) {
                        self.send(command, now_ms);
                    }
                    self.screen.invalidate();
                } else {
                    self.screen.set_status("No loco", now_ms);
                }
            }
            Action::TrackPowerToggle => {
                let on = self.roster.track_power() != TrackPower::On;
                self.send(Command::SetTrackPower(on), now_ms);
            }
        }
    }

    fn acquire(&mut self, address: u16, now_ms: u64) {
        let slot = self.roster.current_slot();
        match self.roster.acquire_loco(slot, address) {
            Ok(command) => self.send(command, now_ms),
            // Re-acquiring a held loco is a no-op, not worth a status
            Err(ModelError::AlreadyAcquired) => {
                info!("controller: loco {} already on slot {}", address, slot);
            }
            Err(err) => {
                warn!("controller: acquire {} failed: {:?}", address, err);
                self.screen.set_status("Cannot acquire", now_ms);
            }
        }
    }

    fn toggle_function(&mut self, function: u8, now_ms: u64) {
        let slot = self.roster.current_slot();
        if !self.roster.slot_has_loco(slot) {
            self.screen.set_status("No loco", now_ms);
            return;
        }
        if let Ok(command) = self.roster.toggle_function(slot, function) {
            self.send(command, now_ms);
            self.screen.invalidate();
        }
    }

    fn set_direction(&mut self, direction: crate::protocol::Direction, now_ms: u64) {
        let slot = self.roster.current_slot();
        match self.roster.slot(slot).and_then(|s| s.lead_address()) {
            Some(lead) => {
                if let Ok(command) = self.roster.set_direction(slot, lead, direction) {
                    self.send(command, now_ms);
                    self.screen.invalidate();
                }
            }
            None => self.screen.set_status("No loco", now_ms),
        }
    }

    fn send(&mut self, command: Command, now_ms: u64) {
        match self.session.enqueue(command) {
            Ok(()) => {}
            Err(SessionError::QueueFull) => self.screen.set_status("Busy", now_ms),
            Err(_) => self.screen.set_status("Network error", now_ms),
        }
    }

    /// Surface low/critical charge on the status line, once per
    /// threshold crossing.
    fn check_battery(&mut self, now_ms: u64) {
        let level = if self.battery.is_critical() {
            BatteryAlert::Critical
        } else if self.battery.is_low() {
            BatteryAlert::Low
        } else {
            BatteryAlert::None
        };
        if level > self.battery_alert {
            match level {
                BatteryAlert::Critical => self.screen.set_status("Battery critical", now_ms),
                BatteryAlert::Low => self.screen.set_status("Battery low", now_ms),
                BatteryAlert::None => {}
            }
            warn!("controller: battery at {}%", self.battery.percentage());
        }
        self.battery_alert = level;
    }

    fn join_network(&mut self, ssid: &str, password: &str, now_ms: u64) {
        if self.wifi.join(ssid, password).is_err() {
            self.screen.set_status("Join failed", now_ms);
            return;
        }
        self.prefs.set_last_ssid(ssid);
        self.prefs.set_wifi_password(ssid, password);
        self.awaiting_association = true;
        self.screen.set_status("Joining WiFi", now_ms);
    }

    // ------------------------------------------------------------------
    // Session and server events
    // ------------------------------------------------------------------

    fn on_session_event(&mut self, event: SessionEvent, now_ms: u64) {
        match event {
            SessionEvent::ServersFound(count) => {
                if self.session.state() == ConnectionState::SelectionRequired {
                    self.dispatcher.set_mode(KeypadMode::SelectServer);
                    self.screen.show(Screen::ServerList);
                }
                let mut status = Line::new();
                let _ = write!(status, "{} server(s)", count);
                self.screen.set_status(&status, now_ms);
            }
            SessionEvent::EntryRequired => {
                self.dispatcher.set_mode(KeypadMode::EnterServerIp);
                self.screen.show(Screen::ServerEntry);
                self.screen.set_status("No servers found", now_ms);
            }
            SessionEvent::Connected => {
                if let Some(server) = self.session.selected_server() {
                    self.prefs.set_last_server(server.ip, server.port);
                }
                self.dispatcher.set_mode(KeypadMode::Operation);
                self.screen.show(Screen::Operation);
                self.screen.set_status("Connected", now_ms);
            }
            SessionEvent::ConnectTimeout => self.screen.set_status("Connect timeout", now_ms),
            SessionEvent::ConnectionLost => self.screen.set_status("Connection lost", now_ms),
            SessionEvent::Reconnecting => self.screen.set_status("Reconnecting", now_ms),
        }
    }

    fn on_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::TrackPower(state) => self.roster.set_track_power(state),
            ServerMessage::RosterEntry {
                address,
                name,
                length,
            } => {
                // Capacity overflows are logged inside the model
                let _ = self.roster.add_or_update_entry(address, &name, length);
            }
            ServerMessage::TurnoutEntry {
                sys_name,
                user_name,
                state,
            } => {
                let _ = self
                    .roster
                    .add_or_update_turnout(&sys_name, &user_name, state);
            }
            ServerMessage::RouteEntry {
                sys_name,
                user_name,
                state,
            } => {
                let _ = self.roster.add_or_update_route(&sys_name, &user_name, state);
            }
            ServerMessage::SlotSpeed { slot, speed } => self.roster.apply_slot_speed(slot, speed),
            ServerMessage::SlotDirection { slot, direction } => {
                self.roster.apply_slot_direction(slot, direction)
            }
            ServerMessage::SlotFunction { slot, function, on } => {
                self.roster.apply_slot_function(slot, function, on)
            }
        }
        self.screen.invalidate();
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    fn render(&mut self) {
        let mut lines: Vec<Line, DISPLAY_LINES> = Vec::new();
        let mut invert = [false; DISPLAY_LINES];
        let mut password_mode = false;
        let mut separator = false;

        match self.screen.screen() {
            Screen::Operation => self.render_operation(&mut lines, &mut invert),
            Screen::SsidList => {
                separator = true;
                push_line(&mut lines, "Select network");
                for (i, network) in self.ssids.iter().enumerate().take(DISPLAY_LINES - 1) {
                    let mut line = Line::new();
                    let _ = write!(line, "{} {}", i, network.ssid);
                    let _ = lines.push(line);
                }
            }
            Screen::PasswordEntry => {
                password_mode = true;
                push_line(&mut lines, "Password  #=OK *=del");
                let preview = self.dispatcher.password_preview();
                push_line(&mut lines, &preview);
            }
            Screen::ServerList => {
                separator = true;
                push_line(&mut lines, "Select server");
                for (i, server) in self
                    .session
                    .servers()
                    .iter()
                    .enumerate()
                    .take(DISPLAY_LINES - 1)
                {
                    let mut line = Line::new();
                    let _ = write!(line, "{} {}:{}", i, server.ip, server.port);
                    let _ = lines.push(line);
                }
            }
            Screen::ServerEntry => {
                push_line(&mut lines, "Server address");
                let view = self.dispatcher.server_entry_view();
                push_line(&mut lines, &view);
            }
            Screen::RosterList => {
                separator = true;
                push_line(&mut lines, "Select loco");
                for i in 0..(DISPLAY_LINES - 1) {
                    let Some(entry) = self.roster.find_by_index(i) else {
                        break;
                    };
                    let mut line = Line::new();
                    let _ = write!(line, "{} {}", i, entry.name);
                    let _ = lines.push(line);
                }
            }
            Screen::TurnoutList { throw } => {
                separator = true;
                push_line(
                    &mut lines,
                    if throw { "Throw turnout" } else { "Close turnout" },
                );
                for i in 0..(DISPLAY_LINES - 1) {
                    let Some(turnout) = self.roster.turnout_at(i) else {
                        break;
                    };
                    let mut line = Line::new();
                    let _ = write!(line, "{} {}", i, turnout.user_name);
                    let _ = lines.push(line);
                }
            }
            Screen::RouteList => {
                separator = true;
                push_line(&mut lines, "Select route");
                for i in 0..(DISPLAY_LINES - 1) {
                    let Some(route) = self.roster.route_at(i) else {
                        break;
                    };
                    let mut line = Line::new();
                    let _ = write!(line, "{} {}", i, route.user_name);
                    let _ = lines.push(line);
                }
            }
            Screen::FunctionList { page } => {
                separator = true;
                let mut heading = Line::new();
                let _ = write!(heading, "Functions p{} *=next", page);
                let _ = lines.push(heading);
                let slot = self.roster.current_slot();
                let lead = self.roster.slot(slot).and_then(|s| s.lead_address());
                for d in 0..(DISPLAY_LINES as u8 - 1) {
                    let function = page * 10 + d;
                    if function as usize >= crate::protocol::FUNCTION_COUNT {
                        break;
                    }
                    let mut line = Line::new();
                    match lead.and_then(|a| self.roster.find_by_address(a)) {
                        Some(entry) => {
                            let _ = write!(line, "{} {}", d, entry.function_label(function));
                        }
                        None => {
                            let _ = write!(line, "{} F{}", d, function);
                        }
                    }
                    let _ = lines.push(line);
                }
            }
            Screen::Help => {
                push_line(&mut lines, "0-4 F0-F4  5 next thr");
                push_line(&mut lines, "6 step x2  7 rev 9 fwd");
                push_line(&mut lines, "8 e-stop   *cmd#");
                push_line(&mut lines, "*1 loco *2 rel *3 dir");
                push_line(&mut lines, "*5/*6 turnout *7 route");
            }
        }

        // Status line goes on the last row when present.
        if !self.screen.status().is_empty() && lines.len() < DISPLAY_LINES {
            while lines.len() < DISPLAY_LINES - 1 {
                let _ = lines.push(Line::new());
            }
            let mut status = Line::new();
            let _ = status.push_str(self.screen.status());
            let _ = lines.push(status);
            invert[DISPLAY_LINES - 1] = true;
        }

        let refs: Vec<&str, DISPLAY_LINES> = lines.iter().map(|l| l.as_str()).collect();
        let _ = self
            .display
            .render_lines(&refs, &invert[..refs.len()], password_mode, separator);
    }

    fn render_operation(&mut self, lines: &mut Vec<Line, DISPLAY_LINES>, invert: &mut [bool]) {
        let slot = self.roster.current_slot();

        let mut header = Line::new();
        let _ = write!(
            header,
            "T{} {}",
            slot + 1,
            match self.session.state() {
                ConnectionState::Connected => "*",
                ConnectionState::Connecting | ConnectionState::Scanning => "~",
                _ => "-",
            }
        );
        match self.config.display.battery_mode {
            BatteryShowMode::None => {}
            BatteryShowMode::Icon => {
                let _ = write!(header, " [{}]", battery_bars(self.battery.percentage()));
            }
            BatteryShowMode::IconAndPercent => {
                let _ = write!(
                    header,
                    " [{}] {}%",
                    battery_bars(self.battery.percentage()),
                    self.battery.percentage()
                );
            }
        }
        let _ = lines.push(header);

        let mut loco_line = Line::new();
        match self.roster.slot(slot).and_then(|s| s.lead_address()) {
            Some(lead) => {
                let _ = write!(loco_line, "{}", self.roster.loco_name(lead));
                let extra = self.roster.slot(slot).map(|s| s.loco_count()).unwrap_or(0);
                if extra > 1 {
                    let _ = write!(loco_line, " +{}", extra - 1);
                }
            }
            None => {
                let _ = loco_line.push_str("No loco  *1# to pick");
            }
        }
        let _ = lines.push(loco_line);

        if let Some(state) = self.roster.slot(slot) {
            let mut speed_line = Line::new();
            let _ = write!(
                speed_line,
                "SPD {:>3} {}",
                state.current_speed,
                match state.current_direction {
                    crate::protocol::Direction::Forward => "FWD",
                    crate::protocol::Direction::Reverse => "REV",
                }
            );
            if self.dispatcher.multiplier() > 1 {
                let _ = write!(speed_line, " x{}", self.dispatcher.multiplier());
            }
            invert[lines.len()] = self.roster.slot_has_loco(slot);
            let _ = lines.push(speed_line);
        }

        let mut power_line = Line::new();
        let _ = write!(
            power_line,
            "Track {}",
            match self.roster.track_power() {
                TrackPower::On => "ON",
                TrackPower::Off => "OFF",
                TrackPower::Unknown => "?",
            }
        );
        let _ = lines.push(power_line);

        if let Some(menu) = self.dispatcher.menu_buffer() {
            let mut menu_line = Line::new();
            let _ = write!(menu_line, "Cmd: *{}", menu);
            let _ = lines.push(menu_line);
        }
    }
}

/// Battery icon fill, four characters wide.
fn battery_bars(percent: u8) -> &'static str {
    match percent {
        0..=12 => "    ",
        13..=37 => "=   ",
        38..=62 => "==  ",
        63..=87 => "=== ",
        _ => "====",
    }
}

fn push_line(lines: &mut Vec<Line, DISPLAY_LINES>, text: &str) {
    let mut line = Line::new();
    let _ = line.push_str(text);
    let _ = lines.push(line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::*;

    fn controller() -> WitController<
        MockTransport,
        MockDiscovery,
        MockWifi,
        MockKeypad,
        MockEncoder,
        MockBattery,
        MockStorage,
        MockDisplay,
    > {
        WitController::new(
            Config::default(),
            MockTransport::new(),
            MockDiscovery::new(),
            MockWifi::new(),
            MockKeypad::new(),
            MockEncoder::new(),
            MockBattery::new(),
            MockStorage::new(),
            MockDisplay::new(),
        )
    }

    #[test]
    fn battery_bars_span() {
        assert_eq!(battery_bars(0), "    ");
        assert_eq!(battery_bars(50), "==  ");
        assert_eq!(battery_bars(100), "====");
    }

    #[test]
    fn start_without_wifi_scans_and_asks() {
        let mut c = controller();
        c.start(0);
        // Empty scan results: status, no selection mode
        assert_eq!(c.dispatcher().mode(), KeypadMode::Operation);
        assert_eq!(c.screen().status(), "No networks found");
    }

    #[test]
    fn start_with_wifi_up_goes_to_discovery() {
        let mut c = controller();
        c.wifi.set_associated(true);
        c.start(0);
        assert_eq!(c.session().state(), ConnectionState::Scanning);
    }

    #[test]
    fn battery_thresholds_reach_the_status_line() {
        let mut c = controller();
        c.battery.set_percent(10);
        c.tick(0);
        assert_eq!(c.screen().status(), "Battery low");

        c.battery.set_percent(3);
        c.tick(100);
        assert_eq!(c.screen().status(), "Battery critical");

        // Recovery clears the latch so the next dip warns again
        c.battery.set_percent(80);
        c.tick(200);
        c.battery.set_percent(10);
        c.tick(300);
        assert_eq!(c.screen().status(), "Battery low");
    }

    #[test]
    fn remembered_open_network_rejoins_without_asking() {
        let mut c = controller();
        c.prefs.set_last_ssid("layout-net");
        c.wifi.add_network("layout-net", -50, true);
        c.wifi.add_network("other", -40, true);

        c.start(0);
        assert_eq!(c.wifi.join_calls[0].0, "layout-net");
        assert_eq!(c.dispatcher().mode(), KeypadMode::Operation);
    }

    #[test]
    fn remembered_protected_network_uses_stored_password() {
        let mut c = controller();
        c.prefs.set_last_ssid("layout-net");
        c.prefs.set_wifi_password("layout-net", "123456");
        c.wifi.add_network("layout-net", -50, false);

        c.start(0);
        assert_eq!(c.wifi.join_calls[0].0, "layout-net");
        assert_eq!(c.wifi.join_calls[0].1, "123456");
        assert_eq!(c.dispatcher().mode(), KeypadMode::Operation);
    }

    #[test]
    fn protected_network_without_stored_password_prompts() {
        let mut c = controller();
        c.prefs.set_last_ssid("layout-net");
        c.wifi.add_network("layout-net", -50, false);

        c.start(0);
        assert!(c.wifi.join_calls.is_empty());
        assert_eq!(c.dispatcher().mode(), KeypadMode::EnterPassword);
    }

    #[test]
    fn joining_saves_the_password_for_next_boot() {
        let mut c = controller();
        c.wifi.add_network("layout-net", -50, false);
        c.start(0);
        assert_eq!(c.dispatcher().mode(), KeypadMode::SelectSsid);

        c.keypad.type_keys("0");
        c.tick(0);
        assert_eq!(c.dispatcher().mode(), KeypadMode::EnterPassword);
        c.keypad.type_keys("123456#");
        c.tick(50);

        assert_eq!(c.prefs.wifi_password("layout-net").as_str(), "123456");
        assert_eq!(c.prefs.last_ssid().as_str(), "layout-net");
    }

    #[test]
    fn remembered_network_absent_falls_back_to_selection() {
        let mut c = controller();
        c.prefs.set_last_ssid("gone");
        c.wifi.add_network("other", -40, false);

        c.start(0);
        assert!(c.wifi.join_calls.is_empty());
        assert_eq!(c.dispatcher().mode(), KeypadMode::SelectSsid);
    }

    #[test]
    fn render_operation_screen_shows_no_loco_hint() {
        let mut c = controller();
        c.tick(0);
        assert!(c.display().shows("No loco"));
        assert!(c.display().shows("Track ?"));
    }
}
