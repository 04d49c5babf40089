//! WiThrottle wire protocol: outbound command encoding and inbound line
//! decoding.
//!
//! The protocol is line-oriented text over TCP. Outbound commands are
//! fixed templates keyed by a multi-throttle prefix (`MT<slot>`) and a
//! one-letter action code; inbound lines are classified by a short prefix
//! (`PPA`, `RL`, `PTL`, `PRL`, `MT<n>`).
//!
//! # Command Flow
//!
//! Model mutators return a [`Command`]; the session encodes it with
//! [`Command::encode`] and queues the resulting line. Inbound lines go
//! through [`parse_line`], and malformed lines surface as a
//! [`ProtocolError`] which the session logs and drops; a bad line is
//! never fatal.
//!
//! # Numeric semantics
//!
//! - Speed is 0–126 ([`MAX_SPEED`]); 127 is reserved for emergency-stop
//!   semantics and never emitted (the controller commands speed 0).
//! - Direction is one bit: 0 = reverse, 1 = forward.
//! - Function index is 0–31.
//!
//! # Example
//!
//! ```rust
//! use wit_throttle::protocol::{parse_line, Command, ServerMessage};
//!
//! let cmd = Command::SetSpeed { slot: 2, speed: 64 };
//! assert_eq!(cmd.encode().as_str(), "MT2*<;>V64");
//!
//! let msg = parse_line("RL2}|{3}|{Loco 3}|{S").unwrap();
//! assert!(matches!(msg, ServerMessage::RosterEntry { address: 3, .. }));
//! ```

use core::fmt::Write;

use heapless::String as HString;

/// Maximum DCC speed step.
pub const MAX_SPEED: u8 = 126;

/// Number of addressable functions per locomotive (F0–F31).
pub const FUNCTION_COUNT: usize = 32;

/// Default WiThrottle server port.
pub const DEFAULT_PORT: u16 = 12090;

/// An encoded outbound protocol line.
pub type CommandLine = HString<64>;

/// A turnout/route system name or user name.
pub type SysName = HString<24>;

/// Prefix prepended to turnout/route system names in accessory commands.
pub type AccessoryPrefix = HString<8>;

// ============================================================================
// Shared wire enums
// ============================================================================

/// Direction of travel, with the wire bit values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Wire bit 0.
    Reverse = 0,
    /// Wire bit 1.
    #[default]
    Forward = 1,
}

impl Direction {
    /// The single wire bit for this direction.
    pub const fn wire_bit(&self) -> u8 {
        *self as u8
    }

    /// Parse a wire bit; anything nonzero is forward.
    pub const fn from_wire_bit(bit: u8) -> Self {
        if bit == 0 {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }

    /// The opposite direction.
    pub const fn toggled(&self) -> Self {
        match self {
            Direction::Reverse => Direction::Forward,
            Direction::Forward => Direction::Reverse,
        }
    }
}

/// Track power state as reported by `PPA` lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackPower {
    /// Power off.
    Off,
    /// Power on.
    On,
    /// Not yet reported.
    #[default]
    Unknown,
}

/// Locomotive address length class.
///
/// `S` for short (≤127) addresses, `L` for long.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LengthClass {
    /// Short address.
    #[default]
    Short,
    /// Long address.
    Long,
}

impl LengthClass {
    /// Parse the roster-list length field; anything but `L` is short.
    pub fn from_char(c: char) -> Self {
        match c {
            'L' | 'l' => LengthClass::Long,
            _ => LengthClass::Short,
        }
    }

    /// Wire character for this class.
    pub const fn as_char(&self) -> char {
        match self {
            LengthClass::Short => 'S',
            LengthClass::Long => 'L',
        }
    }
}

/// Turnout position, with the list-message state digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TurnoutState {
    /// Closed (straight route).
    Closed,
    /// Thrown (diverging route).
    Thrown,
    /// Not yet reported.
    #[default]
    Unknown,
}

impl TurnoutState {
    fn from_digit(d: u8) -> Self {
        match d {
            0 => TurnoutState::Closed,
            1 => TurnoutState::Thrown,
            _ => TurnoutState::Unknown,
        }
    }
}

/// Route activation state, with the list-message state digits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RouteState {
    /// Not active.
    Inactive,
    /// Active.
    Active,
    /// Not yet reported.
    #[default]
    Unknown,
}

impl RouteState {
    fn from_digit(d: u8) -> Self {
        match d {
            0 => RouteState::Inactive,
            1 => RouteState::Active,
            _ => RouteState::Unknown,
        }
    }
}

// ============================================================================
// Outbound commands
// ============================================================================

/// An outbound protocol command.
///
/// Produced by the roster/throttle model and the input dispatcher,
/// encoded by the session just before sending. The variants map one to
/// one onto the wire templates; see the module docs for the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Acquire a locomotive on a throttle slot: `MT<slot>+*<;>L<addr>`.
    AcquireLoco {
        /// Throttle slot 0–5.
        slot: u8,
        /// DCC address.
        address: u16,
    },
    /// Release every locomotive on a slot: `MT<slot>-*<;>r`.
    ReleaseAll {
        /// Throttle slot 0–5.
        slot: u8,
    },
    /// Set slot speed: `MT<slot>*<;>V<speed>`.
    SetSpeed {
        /// Throttle slot 0–5.
        slot: u8,
        /// Speed step 0–126.
        speed: u8,
    },
    /// Set slot direction: `MT<slot>*<;>R<0|1>`.
    SetDirection {
        /// Throttle slot 0–5.
        slot: u8,
        /// New direction.
        direction: Direction,
    },
    /// Set a function on or off: `MT<slot>*<;>F<0|1><n>`.
    SetFunction {
        /// Throttle slot 0–5.
        slot: u8,
        /// Function index 0–31.
        function: u8,
        /// On or off.
        on: bool,
    },
    /// Throw a turnout: `PTA<prefix><name>T`.
    ThrowTurnout {
        /// Accessory prefix from configuration.
        prefix: AccessoryPrefix,
        /// Turnout system name.
        sys_name: SysName,
    },
    /// Close a turnout: `PTA<prefix><name>C`.
    CloseTurnout {
        /// Accessory prefix from configuration.
        prefix: AccessoryPrefix,
        /// Turnout system name.
        sys_name: SysName,
    },
    /// Activate a route: `PRA<prefix><name>A`.
    ActivateRoute {
        /// Accessory prefix from configuration.
        prefix: AccessoryPrefix,
        /// Route system name.
        sys_name: SysName,
    },
    /// Command track power: `PPA<0|1>`.
    SetTrackPower(bool),
    /// Request the roster list.
    RequestRoster,
    /// Request the turnout list.
    RequestTurnouts,
    /// Request the route list.
    RequestRoutes,
    /// Keep-alive: a bare `*`.
    Heartbeat,
    /// A preconfigured raw line (startup commands).
    Raw(CommandLine),
}

impl Command {
    /// Encode this command into its wire line (no terminator).
    pub fn encode(&self) -> CommandLine {
        let mut line = CommandLine::new();
        match self {
            Command::AcquireLoco { slot, address } => {
                let _ = write!(line, "MT{}+*<;>L{}", slot, address);
            }
            Command::ReleaseAll { slot } => {
                let _ = write!(line, "MT{}-*<;>r", slot);
            }
            Command::SetSpeed { slot, speed } => {
                let _ = write!(line, "MT{}*<;>V{}", slot, (*speed).min(MAX_SPEED));
            }
            Command::SetDirection { slot, direction } => {
                let _ = write!(line, "MT{}*<;>R{}", slot, direction.wire_bit());
            }
            Command::SetFunction { slot, function, on } => {
                let _ = write!(line, "MT{}*<;>F{}{}", slot, u8::from(*on), function);
            }
            Command::ThrowTurnout { prefix, sys_name } => {
                let _ = write!(line, "PTA{}{}T", prefix, sys_name);
            }
            Command::CloseTurnout { prefix, sys_name } => {
                let _ = write!(line, "PTA{}{}C", prefix, sys_name);
            }
            Command::ActivateRoute { prefix, sys_name } => {
                let _ = write!(line, "PRA{}{}A", prefix, sys_name);
            }
            Command::SetTrackPower(on) => {
                let _ = write!(line, "PPA{}", u8::from(*on));
            }
            Command::RequestRoster => {
                let _ = line.push_str("RL");
            }
            Command::RequestTurnouts => {
                let _ = line.push_str("PTL");
            }
            Command::RequestRoutes => {
                let _ = line.push_str("PRL");
            }
            Command::Heartbeat => {
                let _ = line.push('*');
            }
            Command::Raw(raw) => {
                let _ = line.push_str(raw.as_str());
            }
        }
        line
    }
}

// ============================================================================
// Inbound messages
// ============================================================================

/// A decoded inbound server line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    /// Track power report (`PPA` with the state at offset 3).
    TrackPower(TrackPower),
    /// One roster-list record.
    RosterEntry {
        /// DCC address.
        address: u16,
        /// Display name.
        name: HString<32>,
        /// Address length class.
        length: LengthClass,
    },
    /// One turnout-list record.
    TurnoutEntry {
        /// System name.
        sys_name: SysName,
        /// User-facing name.
        user_name: SysName,
        /// Reported position.
        state: TurnoutState,
    },
    /// One route-list record.
    RouteEntry {
        /// System name.
        sys_name: SysName,
        /// User-facing name.
        user_name: SysName,
        /// Reported activation state.
        state: RouteState,
    },
    /// Per-slot speed update.
    SlotSpeed {
        /// Throttle slot 0–5.
        slot: u8,
        /// Speed step 0–126.
        speed: u8,
    },
    /// Per-slot direction update.
    SlotDirection {
        /// Throttle slot 0–5.
        slot: u8,
        /// Reported direction.
        direction: Direction,
    },
    /// Per-slot function update.
    SlotFunction {
        /// Throttle slot 0–5.
        slot: u8,
        /// Function index 0–31.
        function: u8,
        /// On or off.
        on: bool,
    },
}

/// Why an inbound line could not be decoded.
///
/// Never fatal: the session logs the error and drops the line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// Empty line.
    Empty,
    /// Prefix not recognized.
    UnknownPrefix,
    /// A `}|{` record delimiter was missing.
    MissingDelimiter,
    /// A numeric field failed to parse or was out of range.
    BadNumber,
    /// The `MT` action code was not one of `V`, `R`, `F`.
    BadAction,
}

/// Record field delimiter used by list messages.
const FIELD_DELIM: &str = "}|{";

/// Copy `src` into a bounded string, truncating at capacity on a char
/// boundary.
fn push_truncated<const N: usize>(dst: &mut HString<N>, src: &str) {
    for c in src.chars() {
        if dst.push(c).is_err() {
            break;
        }
    }
}

/// Decode one inbound line.
///
/// Classification is by prefix: `PPA` → track power, `RL` → roster
/// record, `PTL`/`PRL` → turnout/route record, `MT<n>` → per-slot state.
/// Unknown prefixes and malformed fields are reported as errors for the
/// caller to log and drop.
pub fn parse_line(line: &str) -> Result<ServerMessage, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() {
        return Err(ProtocolError::Empty);
    }

    if let Some(rest) = line.strip_prefix("PPA") {
        let state = match rest.chars().next() {
            Some('1') => TrackPower::On,
            Some('0') => TrackPower::Off,
            _ => TrackPower::Unknown,
        };
        return Ok(ServerMessage::TrackPower(state));
    }

    if line.starts_with("RL") {
        return parse_roster_record(line);
    }

    if let Some(rest) = line.strip_prefix("PTL") {
        let (sys_name, user_name, digit) = parse_accessory_record(rest)?;
        return Ok(ServerMessage::TurnoutEntry {
            sys_name,
            user_name,
            state: TurnoutState::from_digit(digit),
        });
    }

    if let Some(rest) = line.strip_prefix("PRL") {
        let (sys_name, user_name, digit) = parse_accessory_record(rest)?;
        return Ok(ServerMessage::RouteEntry {
            sys_name,
            user_name,
            state: RouteState::from_digit(digit),
        });
    }

    if line.starts_with("MT") {
        return parse_slot_update(line);
    }

    Err(ProtocolError::UnknownPrefix)
}

/// Parse `RL<n>}|{<addr>}|{<name>}|{<length>`.
fn parse_roster_record(line: &str) -> Result<ServerMessage, ProtocolError> {
    let first = line.find(FIELD_DELIM).ok_or(ProtocolError::MissingDelimiter)?;
    let rest = &line[first + FIELD_DELIM.len()..];

    let addr_end = rest.find(FIELD_DELIM).ok_or(ProtocolError::MissingDelimiter)?;
    let address: u16 = rest[..addr_end]
        .parse()
        .map_err(|_| ProtocolError::BadNumber)?;

    let rest = &rest[addr_end + FIELD_DELIM.len()..];
    let name_end = rest.find(FIELD_DELIM).ok_or(ProtocolError::MissingDelimiter)?;
    let mut name = HString::new();
    push_truncated(&mut name, &rest[..name_end]);

    let length_field = &rest[name_end + FIELD_DELIM.len()..];
    let length = LengthClass::from_char(length_field.chars().next().unwrap_or('S'));

    Ok(ServerMessage::RosterEntry {
        address,
        name,
        length,
    })
}

/// Parse `<sys>}|{<user>}|{<state digit>` for turnout/route lists.
fn parse_accessory_record(rest: &str) -> Result<(SysName, SysName, u8), ProtocolError> {
    let sys_end = rest.find(FIELD_DELIM).ok_or(ProtocolError::MissingDelimiter)?;
    let mut sys_name = SysName::new();
    push_truncated(&mut sys_name, &rest[..sys_end]);

    let rest = &rest[sys_end + FIELD_DELIM.len()..];
    let user_end = rest.find(FIELD_DELIM).ok_or(ProtocolError::MissingDelimiter)?;
    let mut user_name = SysName::new();
    push_truncated(&mut user_name, &rest[..user_end]);

    let digit_field = &rest[user_end + FIELD_DELIM.len()..];
    let digit = digit_field
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .ok_or(ProtocolError::BadNumber)? as u8;

    Ok((sys_name, user_name, digit))
}

/// Parse `MT<slot>[+|-]*<;><action>` per-slot updates.
fn parse_slot_update(line: &str) -> Result<ServerMessage, ProtocolError> {
    let rest = &line[2..];
    let slot_len = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if slot_len == 0 {
        return Err(ProtocolError::BadNumber);
    }
    let slot: u8 = rest[..slot_len].parse().map_err(|_| ProtocolError::BadNumber)?;

    let sep = rest.find("<;>").ok_or(ProtocolError::MissingDelimiter)?;
    let action = &rest[sep + 3..];
    let code = action.chars().next().ok_or(ProtocolError::BadAction)?;
    let args = &action[code.len_utf8()..];

    match code {
        'V' => {
            let speed: u8 = args.parse().map_err(|_| ProtocolError::BadNumber)?;
            if speed > MAX_SPEED {
                return Err(ProtocolError::BadNumber);
            }
            Ok(ServerMessage::SlotSpeed { slot, speed })
        }
        'R' => {
            let bit: u8 = args.parse().map_err(|_| ProtocolError::BadNumber)?;
            Ok(ServerMessage::SlotDirection {
                slot,
                direction: Direction::from_wire_bit(bit),
            })
        }
        'F' => {
            let mut chars = args.chars();
            let state = chars
                .next()
                .and_then(|c| c.to_digit(10))
                .ok_or(ProtocolError::BadNumber)?;
            let function: u8 = chars.as_str().parse().map_err(|_| ProtocolError::BadNumber)?;
            if function as usize >= FUNCTION_COUNT {
                return Err(ProtocolError::BadNumber);
            }
            Ok(ServerMessage::SlotFunction {
                slot,
                function,
                on: state != 0,
            })
        }
        _ => Err(ProtocolError::BadAction),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Encoding
    // =========================================================================

    #[test]
    fn encode_acquire() {
        let cmd = Command::AcquireLoco {
            slot: 0,
            address: 3,
        };
        assert_eq!(cmd.encode().as_str(), "MT0+*<;>L3");
    }

    #[test]
    fn encode_release_all() {
        let cmd = Command::ReleaseAll { slot: 4 };
        assert_eq!(cmd.encode().as_str(), "MT4-*<;>r");
    }

    #[test]
    fn encode_speed_and_direction() {
        assert_eq!(
            Command::SetSpeed { slot: 1, speed: 126 }.encode().as_str(),
            "MT1*<;>V126"
        );
        assert_eq!(
            Command::SetDirection {
                slot: 1,
                direction: Direction::Reverse
            }
            .encode()
            .as_str(),
            "MT1*<;>R0"
        );
        assert_eq!(
            Command::SetDirection {
                slot: 1,
                direction: Direction::Forward
            }
            .encode()
            .as_str(),
            "MT1*<;>R1"
        );
    }

    #[test]
    fn encode_function() {
        let on = Command::SetFunction {
            slot: 1,
            function: 5,
            on: true,
        };
        assert_eq!(on.encode().as_str(), "MT1*<;>F15");

        let off = Command::SetFunction {
            slot: 1,
            function: 5,
            on: false,
        };
        assert_eq!(off.encode().as_str(), "MT1*<;>F05");
    }

    #[test]
    fn encode_accessories() {
        let mut prefix = AccessoryPrefix::new();
        let _ = prefix.push_str("LT");
        let mut name = SysName::new();
        let _ = name.push_str("12");

        let throw = Command::ThrowTurnout {
            prefix: prefix.clone(),
            sys_name: name.clone(),
        };
        assert_eq!(throw.encode().as_str(), "PTALT12T");

        let close = Command::CloseTurnout {
            prefix: prefix.clone(),
            sys_name: name.clone(),
        };
        assert_eq!(close.encode().as_str(), "PTALT12C");

        let route = Command::ActivateRoute {
            prefix,
            sys_name: name,
        };
        assert_eq!(route.encode().as_str(), "PRALT12A");
    }

    #[test]
    fn encode_heartbeat_and_power() {
        assert_eq!(Command::Heartbeat.encode().as_str(), "*");
        assert_eq!(Command::SetTrackPower(true).encode().as_str(), "PPA1");
        assert_eq!(Command::SetTrackPower(false).encode().as_str(), "PPA0");
    }

    #[test]
    fn encode_list_requests() {
        assert_eq!(Command::RequestRoster.encode().as_str(), "RL");
        assert_eq!(Command::RequestTurnouts.encode().as_str(), "PTL");
        assert_eq!(Command::RequestRoutes.encode().as_str(), "PRL");
    }

    // =========================================================================
    // Decoding
    // =========================================================================

    #[test]
    fn parse_roster_line() {
        let msg = parse_line("RL2}|{3}|{Loco 3}|{S").unwrap();
        match msg {
            ServerMessage::RosterEntry {
                address,
                name,
                length,
            } => {
                assert_eq!(address, 3);
                assert_eq!(name.as_str(), "Loco 3");
                assert_eq!(length, LengthClass::Short);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn parse_roster_long_address() {
        let msg = parse_line("RL1}|{4017}|{Big Boy}|{L").unwrap();
        match msg {
            ServerMessage::RosterEntry {
                address, length, ..
            } => {
                assert_eq!(address, 4017);
                assert_eq!(length, LengthClass::Long);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn parse_roster_missing_delimiter() {
        assert_eq!(
            parse_line("RL2|3|Loco 3|S"),
            Err(ProtocolError::MissingDelimiter)
        );
    }

    #[test]
    fn parse_roster_bad_address() {
        assert_eq!(
            parse_line("RL2}|{abc}|{Loco}|{S"),
            Err(ProtocolError::BadNumber)
        );
    }

    #[test]
    fn parse_track_power() {
        assert_eq!(
            parse_line("PPA1"),
            Ok(ServerMessage::TrackPower(TrackPower::On))
        );
        assert_eq!(
            parse_line("PPA0"),
            Ok(ServerMessage::TrackPower(TrackPower::Off))
        );
        assert_eq!(
            parse_line("PPA2"),
            Ok(ServerMessage::TrackPower(TrackPower::Unknown))
        );
    }

    #[test]
    fn parse_turnout_record() {
        let msg = parse_line("PTLLT12}|{Yard East}|{1").unwrap();
        match msg {
            ServerMessage::TurnoutEntry {
                sys_name,
                user_name,
                state,
            } => {
                assert_eq!(sys_name.as_str(), "LT12");
                assert_eq!(user_name.as_str(), "Yard East");
                assert_eq!(state, TurnoutState::Thrown);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn parse_route_record() {
        let msg = parse_line("PRLIR:AUTO:0001}|{Main Loop}|{0").unwrap();
        match msg {
            ServerMessage::RouteEntry { state, .. } => {
                assert_eq!(state, RouteState::Inactive);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn parse_slot_updates() {
        assert_eq!(
            parse_line("MT0*<;>V26"),
            Ok(ServerMessage::SlotSpeed { slot: 0, speed: 26 })
        );
        assert_eq!(
            parse_line("MT3*<;>R0"),
            Ok(ServerMessage::SlotDirection {
                slot: 3,
                direction: Direction::Reverse
            })
        );
        assert_eq!(
            parse_line("MT1*<;>F112"),
            Ok(ServerMessage::SlotFunction {
                slot: 1,
                function: 12,
                on: true
            })
        );
    }

    #[test]
    fn parse_slot_update_rejects_bad_action() {
        assert_eq!(parse_line("MT1*<;>Z1"), Err(ProtocolError::BadAction));
    }

    #[test]
    fn parse_slot_update_rejects_out_of_range() {
        assert_eq!(parse_line("MT1*<;>V200"), Err(ProtocolError::BadNumber));
        assert_eq!(parse_line("MT1*<;>F140"), Err(ProtocolError::BadNumber));
    }

    #[test]
    fn parse_unknown_prefix() {
        assert_eq!(parse_line("XYZ"), Err(ProtocolError::UnknownPrefix));
        assert_eq!(parse_line(""), Err(ProtocolError::Empty));
    }

    #[test]
    fn parse_strips_terminators() {
        assert_eq!(
            parse_line("PPA1\r\n"),
            Ok(ServerMessage::TrackPower(TrackPower::On))
        );
    }

    // =========================================================================
    // Round trips
    // =========================================================================

    #[test]
    fn function_command_round_trip() {
        let cmd = Command::SetFunction {
            slot: 1,
            function: 5,
            on: true,
        };
        let msg = parse_line(cmd.encode().as_str()).unwrap();
        assert_eq!(
            msg,
            ServerMessage::SlotFunction {
                slot: 1,
                function: 5,
                on: true
            }
        );
    }

    #[test]
    fn speed_command_round_trip() {
        let cmd = Command::SetSpeed { slot: 5, speed: 99 };
        let msg = parse_line(cmd.encode().as_str()).unwrap();
        assert_eq!(msg, ServerMessage::SlotSpeed { slot: 5, speed: 99 });
    }

    #[test]
    fn direction_helpers() {
        assert_eq!(Direction::Forward.wire_bit(), 1);
        assert_eq!(Direction::Reverse.wire_bit(), 0);
        assert_eq!(Direction::from_wire_bit(0), Direction::Reverse);
        assert_eq!(Direction::from_wire_bit(1), Direction::Forward);
        assert_eq!(Direction::Forward.toggled(), Direction::Reverse);
    }
}
