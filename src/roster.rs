//! Roster/throttle model: locomotives, turnouts, routes, and throttle slots.
//!
//! This module owns every bounded in-memory list the controller works
//! with, plus the six throttle slots. All mutators are pure-model: they
//! update state and *return* the [`Command`] to send, they never touch
//! the network themselves. That keeps model mutation decoupled from
//! connection availability; the session queues the command whenever it
//! can.
//!
//! # Capacities
//!
//! | List | Limit |
//! |------|-------|
//! | Roster entries | 70 |
//! | Turnouts | 60 |
//! | Routes | 60 |
//! | Throttle slots | 6 |
//! | Locomotives per slot (consist) | 6 |
//!
//! # Invariants
//!
//! - An address uniquely identifies an active roster entry; a duplicate
//!   add updates the existing entry in place.
//! - Each slot has at most one lead locomotive; releasing the lead
//!   promotes the next locomotive in acquisition order.
//! - Slot speed is always within 0–126; out-of-range inputs are clamped.
//!
//! # Example
//!
//! ```rust
//! use wit_throttle::roster::Roster;
//! use wit_throttle::protocol::LengthClass;
//!
//! let mut roster = Roster::new();
//! roster
//!     .add_or_update_entry(3, "Loco 3", LengthClass::Short)
//!     .unwrap();
//!
//! let cmd = roster.acquire_loco(0, 3).unwrap();
//! assert_eq!(cmd.encode().as_str(), "MT0+*<;>L3");
//!
//! let cmd = roster.set_speed(0, 3, 64).unwrap();
//! assert_eq!(cmd.encode().as_str(), "MT0*<;>V64");
//! ```

use heapless::{String as HString, Vec};
use log::{debug, warn};

use crate::protocol::{
    AccessoryPrefix, Command, Direction, LengthClass, RouteState, SysName, TrackPower,
    TurnoutState, FUNCTION_COUNT, MAX_SPEED,
};

/// Maximum number of roster entries.
pub const MAX_ROSTER_ENTRIES: usize = 70;

/// Maximum number of turnouts.
pub const MAX_TURNOUTS: usize = 60;

/// Maximum number of routes.
pub const MAX_ROUTES: usize = 60;

/// Number of throttle slots.
pub const MAX_SLOTS: usize = 6;

/// Maximum locomotives in one slot's consist.
pub const MAX_LOCOS_PER_SLOT: usize = 6;

/// A locomotive display name.
pub type LocoName = HString<32>;

/// A function label (e.g. "Bell", "Horn").
pub type FunctionLabel = HString<16>;

// ============================================================================
// Entries
// ============================================================================

/// One known locomotive from the server roster (or manual entry).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RosterEntry {
    /// DCC address; unique among active entries.
    pub address: u16,
    /// Display name.
    pub name: LocoName,
    /// Address length class.
    pub length: LengthClass,
    /// Function labels, sparse; missing slots fall back to `F<n>`.
    pub function_labels: Vec<FunctionLabel, FUNCTION_COUNT>,
}

impl RosterEntry {
    /// Label for function `n`, falling back to `F<n>`.
    pub fn function_label(&self, n: u8) -> FunctionLabel {
        if let Some(label) = self.function_labels.get(n as usize) {
            if !label.is_empty() {
                return label.clone();
            }
        }
        let mut label = FunctionLabel::new();
        let _ = core::fmt::Write::write_fmt(&mut label, format_args!("F{}", n));
        label
    }
}

/// One turnout from the server list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnoutEntry {
    /// System name (used in accessory commands).
    pub sys_name: SysName,
    /// User-facing name.
    pub user_name: SysName,
    /// Last reported position.
    pub state: TurnoutState,
}

/// One route from the server list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    /// System name (used in accessory commands).
    pub sys_name: SysName,
    /// User-facing name.
    pub user_name: SysName,
    /// Last reported activation state.
    pub state: RouteState,
}

// ============================================================================
// Throttle slots
// ============================================================================

/// One locomotive held by a throttle slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocoRef {
    /// DCC address.
    pub address: u16,
    /// Display name at acquisition time.
    pub name: LocoName,
    /// Current direction.
    pub direction: Direction,
    /// Current speed step 0–126.
    pub speed: u8,
    /// Function on/off flags.
    pub functions: [bool; FUNCTION_COUNT],
    /// True for the consist lead.
    pub lead: bool,
}

impl LocoRef {
    fn new(address: u16, name: LocoName, lead: bool) -> Self {
        Self {
            address,
            name,
            direction: Direction::Forward,
            speed: 0,
            functions: [false; FUNCTION_COUNT],
            lead,
        }
    }
}

/// One of the six independent throttle channels.
///
/// Never destroyed, only cleared. Aggregate speed/direction mirror the
/// last command issued for the slot as a whole.
#[derive(Clone, Debug, Default)]
pub struct ThrottleSlot {
    locos: Vec<LocoRef, MAX_LOCOS_PER_SLOT>,
    /// Aggregate speed for the slot.
    pub current_speed: u8,
    /// Aggregate direction for the slot.
    pub current_direction: Direction,
}

impl ThrottleSlot {
    /// Number of locomotives held, always within 0–6.
    pub fn loco_count(&self) -> usize {
        self.locos.len()
    }

    /// True once at least one locomotive is held.
    pub fn is_active(&self) -> bool {
        !self.locos.is_empty()
    }

    /// Address of the lead locomotive, if any.
    pub fn lead_address(&self) -> Option<u16> {
        self.locos.iter().find(|l| l.lead).map(|l| l.address)
    }

    /// The held locomotives in acquisition order.
    pub fn locos(&self) -> &[LocoRef] {
        &self.locos
    }

    fn clear(&mut self) {
        self.locos.clear();
        self.current_speed = 0;
        self.current_direction = Direction::Forward;
    }

    fn loco_mut(&mut self, address: u16) -> Option<&mut LocoRef> {
        self.locos.iter_mut().find(|l| l.address == address)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Constraint violations reported by the model.
///
/// Never propagated as panics; the input dispatcher consumes these and
/// surfaces a status line where relevant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelError {
    /// Roster already holds 70 entries.
    RosterFull,
    /// Turnout list already holds 60 entries.
    TurnoutListFull,
    /// Route list already holds 60 entries.
    RouteListFull,
    /// Slot already holds 6 locomotives.
    SlotFull,
    /// Address already held in that slot.
    AlreadyAcquired,
    /// Slot index out of range.
    NoSuchSlot,
    /// Slot holds no locomotives.
    EmptySlot,
    /// Address or system name not found.
    NotFound,
    /// Function index out of 0–31.
    BadFunction,
}

// ============================================================================
// The model
// ============================================================================

/// The roster/throttle model: exclusive owner of all entries and slots.
#[derive(Clone, Debug)]
pub struct Roster {
    entries: Vec<RosterEntry, MAX_ROSTER_ENTRIES>,
    turnouts: Vec<TurnoutEntry, MAX_TURNOUTS>,
    routes: Vec<RouteEntry, MAX_ROUTES>,
    slots: [ThrottleSlot; MAX_SLOTS],
    current_slot: u8,
    max_slots: u8,
    turnout_prefix: AccessoryPrefix,
    route_prefix: AccessoryPrefix,
    track_power: TrackPower,
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}

impl Roster {
    /// Create an empty model with all slots cleared.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            turnouts: Vec::new(),
            routes: Vec::new(),
            slots: Default::default(),
            current_slot: 0,
            max_slots: 2,
            turnout_prefix: AccessoryPrefix::new(),
            route_prefix: AccessoryPrefix::new(),
            track_power: TrackPower::Unknown,
        }
    }

    /// Set the accessory prefixes used in turnout/route commands.
    pub fn set_prefixes(&mut self, turnout: &str, route: &str) {
        self.turnout_prefix.clear();
        let _ = self.turnout_prefix.push_str(turnout);
        self.route_prefix.clear();
        let _ = self.route_prefix.push_str(route);
    }

    /// Set how many slots the next-throttle key cycles through (1–6).
    pub fn set_max_slots(&mut self, max: u8) {
        self.max_slots = max.clamp(1, MAX_SLOTS as u8);
        if self.current_slot >= self.max_slots {
            self.current_slot = 0;
        }
    }

    /// Configured slot count.
    pub fn max_slots(&self) -> u8 {
        self.max_slots
    }

    // ------------------------------------------------------------------
    // Roster entries
    // ------------------------------------------------------------------

    /// Insert a roster entry, or update name/length in place when the
    /// address is already known.
    ///
    /// Fails with [`ModelError::RosterFull`] at the 70-entry limit.
    pub fn add_or_update_entry(
        &mut self,
        address: u16,
        name: &str,
        length: LengthClass,
    ) -> Result<(), ModelError> {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.address == address) {
            existing.name.clear();
            let _ = existing.name.push_str(name);
            existing.length = length;
            debug!("roster: updated entry {}", address);
            return Ok(());
        }

        let mut entry_name = LocoName::new();
        let _ = entry_name.push_str(name);
        let entry = RosterEntry {
            address,
            name: entry_name,
            length,
            function_labels: Vec::new(),
        };
        self.entries.push(entry).map_err(|_| {
            warn!("roster: full, dropping entry {}", address);
            ModelError::RosterFull
        })?;
        debug!("roster: added entry {} ({})", address, name);
        Ok(())
    }

    /// Look up a roster entry by DCC address.
    pub fn find_by_address(&self, address: u16) -> Option<&RosterEntry> {
        self.entries.iter().find(|e| e.address == address)
    }

    /// Look up a roster entry by list position.
    pub fn find_by_index(&self, index: usize) -> Option<&RosterEntry> {
        self.entries.get(index)
    }

    /// Number of roster entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Display name for an address, falling back to `Loco <addr>`.
    pub fn loco_name(&self, address: u16) -> LocoName {
        if let Some(entry) = self.find_by_address(address) {
            return entry.name.clone();
        }
        let mut name = LocoName::new();
        let _ = core::fmt::Write::write_fmt(&mut name, format_args!("Loco {}", address));
        name
    }

    // ------------------------------------------------------------------
    // Turnouts / routes
    // ------------------------------------------------------------------

    /// Insert or update a turnout from a list message.
    pub fn add_or_update_turnout(
        &mut self,
        sys_name: &SysName,
        user_name: &SysName,
        state: TurnoutState,
    ) -> Result<(), ModelError> {
        if let Some(existing) = self.turnouts.iter_mut().find(|t| t.sys_name == *sys_name) {
            existing.user_name = user_name.clone();
            existing.state = state;
            return Ok(());
        }
        self.turnouts
            .push(TurnoutEntry {
                sys_name: sys_name.clone(),
                user_name: user_name.clone(),
                state,
            })
            .map_err(|_| {
                warn!("roster: turnout list full, dropping {}", sys_name);
                ModelError::TurnoutListFull
            })
    }

    /// Insert or update a route from a list message.
    pub fn add_or_update_route(
        &mut self,
        sys_name: &SysName,
        user_name: &SysName,
        state: RouteState,
    ) -> Result<(), ModelError> {
        if let Some(existing) = self.routes.iter_mut().find(|r| r.sys_name == *sys_name) {
            existing.user_name = user_name.clone();
            existing.state = state;
            return Ok(());
        }
        self.routes
            .push(RouteEntry {
                sys_name: sys_name.clone(),
                user_name: user_name.clone(),
                state,
            })
            .map_err(|_| {
                warn!("roster: route list full, dropping {}", sys_name);
                ModelError::RouteListFull
            })
    }

    /// Turnout at a list position.
    pub fn turnout_at(&self, index: usize) -> Option<&TurnoutEntry> {
        self.turnouts.get(index)
    }

    /// Route at a list position.
    pub fn route_at(&self, index: usize) -> Option<&RouteEntry> {
        self.routes.get(index)
    }

    /// Number of known turnouts.
    pub fn turnout_count(&self) -> usize {
        self.turnouts.len()
    }

    /// Number of known routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Throw a turnout by system name: `PTA<prefix><name>T`.
    ///
    /// The stored state is not changed; the server reports the new
    /// position through the list messages.
    pub fn throw_turnout(&self, sys_name: &str) -> Result<Command, ModelError> {
        let turnout = self
            .turnouts
            .iter()
            .find(|t| t.sys_name.as_str() == sys_name)
            .ok_or(ModelError::NotFound)?;
        Ok(Command::ThrowTurnout {
            prefix: self.turnout_prefix.clone(),
            sys_name: turnout.sys_name.clone(),
        })
    }

    /// Close a turnout by system name: `PTA<prefix><name>C`.
    pub fn close_turnout(&self, sys_name: &str) -> Result<Command, ModelError> {
        let turnout = self
            .turnouts
            .iter()
            .find(|t| t.sys_name.as_str() == sys_name)
            .ok_or(ModelError::NotFound)?;
        Ok(Command::CloseTurnout {
            prefix: self.turnout_prefix.clone(),
            sys_name: turnout.sys_name.clone(),
        })
    }

    /// Activate a route by system name: `PRA<prefix><name>A`.
    pub fn activate_route(&self, sys_name: &str) -> Result<Command, ModelError> {
        let route = self
            .routes
            .iter()
            .find(|r| r.sys_name.as_str() == sys_name)
            .ok_or(ModelError::NotFound)?;
        Ok(Command::ActivateRoute {
            prefix: self.route_prefix.clone(),
            sys_name: route.sys_name.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Slots
    // ------------------------------------------------------------------

    /// The slot currently under keypad/encoder control.
    pub fn current_slot(&self) -> u8 {
        self.current_slot
    }

    /// Select the active slot; out-of-range values are ignored.
    pub fn set_current_slot(&mut self, slot: u8) {
        if slot < self.max_slots {
            self.current_slot = slot;
        }
    }

    /// Cycle to the next slot, wrapping at the configured maximum.
    pub fn next_slot(&mut self) -> u8 {
        self.current_slot = (self.current_slot + 1) % self.max_slots;
        self.current_slot
    }

    /// Borrow a slot.
    pub fn slot(&self, slot: u8) -> Option<&ThrottleSlot> {
        self.slots.get(slot as usize)
    }

    /// Shared precondition for the loco-bound menu items (release,
    /// toggle direction, functions): does this slot hold a locomotive?
    pub fn slot_has_loco(&self, slot: u8) -> bool {
        self.slot(slot).is_some_and(ThrottleSlot::is_active)
    }

    fn slot_mut(&mut self, slot: u8) -> Result<&mut ThrottleSlot, ModelError> {
        self.slots
            .get_mut(slot as usize)
            .ok_or(ModelError::NoSuchSlot)
    }

    /// Acquire a locomotive on a slot: `MT<slot>+*<;>L<addr>`.
    ///
    /// The first locomotive in a slot becomes the lead. Re-acquiring an
    /// address already held in the slot is a logged no-op error; a
    /// seventh locomotive fails with [`ModelError::SlotFull`].
    pub fn acquire_loco(&mut self, slot: u8, address: u16) -> Result<Command, ModelError> {
        let name = self.loco_name(address);
        let state = self.slot_mut(slot)?;

        if state.locos.iter().any(|l| l.address == address) {
            debug!("slot {}: loco {} already acquired", slot, address);
            return Err(ModelError::AlreadyAcquired);
        }

        let lead = state.locos.is_empty();
        state
            .locos
            .push(LocoRef::new(address, name, lead))
            .map_err(|_| ModelError::SlotFull)?;
        debug!("slot {}: acquired loco {} (lead: {})", slot, address, lead);
        Ok(Command::AcquireLoco { slot, address })
    }

    /// Release one locomotive: emits `MT<slot>-*<;>r`.
    ///
    /// Releasing the lead promotes the next locomotive in order and its
    /// address becomes the slot's current locomotive.
    pub fn release_loco(&mut self, slot: u8, address: u16) -> Result<Command, ModelError> {
        let state = self.slot_mut(slot)?;
        let pos = state
            .locos
            .iter()
            .position(|l| l.address == address)
            .ok_or(ModelError::NotFound)?;

        let was_lead = state.locos[pos].lead;
        state.locos.remove(pos);
        if was_lead {
            if let Some(next) = state.locos.first_mut() {
                next.lead = true;
            }
        }
        if state.locos.is_empty() {
            state.current_speed = 0;
        }
        debug!("slot {}: released loco {}", slot, address);
        Ok(Command::ReleaseAll { slot })
    }

    /// Release everything on a slot and clear it: `MT<slot>-*<;>r`.
    pub fn release_all(&mut self, slot: u8) -> Result<Command, ModelError> {
        let state = self.slot_mut(slot)?;
        if state.locos.is_empty() {
            return Err(ModelError::EmptySlot);
        }
        state.clear();
        debug!("slot {}: released all locos", slot);
        Ok(Command::ReleaseAll { slot })
    }

    /// Set slot speed, clamped to 0–126: `MT<slot>*<;>V<speed>`.
    ///
    /// Updates the slot aggregate and the matching locomotive. Negative
    /// inputs clamp to 0, oversized to 126.
    pub fn set_speed(&mut self, slot: u8, address: u16, speed: i32) -> Result<Command, ModelError> {
        let clamped = speed.clamp(0, MAX_SPEED as i32) as u8;
        let state = self.slot_mut(slot)?;
        state.current_speed = clamped;
        if let Some(loco) = state.loco_mut(address) {
            loco.speed = clamped;
        }
        Ok(Command::SetSpeed {
            slot,
            speed: clamped,
        })
    }

    /// Set slot direction: `MT<slot>*<;>R<0|1>`.
    pub fn set_direction(
        &mut self,
        slot: u8,
        address: u16,
        direction: Direction,
    ) -> Result<Command, ModelError> {
        let state = self.slot_mut(slot)?;
        state.current_direction = direction;
        if let Some(loco) = state.loco_mut(address) {
            loco.direction = direction;
        }
        Ok(Command::SetDirection { slot, direction })
    }

    /// Set a function on the matching locomotive: `MT<slot>*<;>F<0|1><n>`.
    pub fn set_function(
        &mut self,
        slot: u8,
        address: u16,
        function: u8,
        on: bool,
    ) -> Result<Command, ModelError> {
        if function as usize >= FUNCTION_COUNT {
            return Err(ModelError::BadFunction);
        }
        let state = self.slot_mut(slot)?;
        if let Some(loco) = state.loco_mut(address) {
            loco.functions[function as usize] = on;
        }
        Ok(Command::SetFunction { slot, function, on })
    }

    /// Toggle a function on the slot's lead locomotive.
    pub fn toggle_function(&mut self, slot: u8, function: u8) -> Result<Command, ModelError> {
        if function as usize >= FUNCTION_COUNT {
            return Err(ModelError::BadFunction);
        }
        let lead = self
            .slot(slot)
            .ok_or(ModelError::NoSuchSlot)?
            .lead_address()
            .ok_or(ModelError::EmptySlot)?;
        let on = !self
            .slot(slot)
            .and_then(|s| s.locos.iter().find(|l| l.address == lead))
            .map(|l| l.functions[function as usize])
            .unwrap_or(false);
        self.set_function(slot, lead, function, on)
    }

    /// Stop a slot immediately: speed 0 on the aggregate and every held
    /// locomotive. Idempotent; safe on an empty slot.
    pub fn emergency_stop(&mut self, slot: u8) -> Result<Command, ModelError> {
        let state = self.slot_mut(slot)?;
        state.current_speed = 0;
        for loco in state.locos.iter_mut() {
            loco.speed = 0;
        }
        Ok(Command::SetSpeed { slot, speed: 0 })
    }

    // ------------------------------------------------------------------
    // Server-driven updates
    // ------------------------------------------------------------------

    /// Apply a per-slot speed report from the server.
    pub fn apply_slot_speed(&mut self, slot: u8, speed: u8) {
        if let Ok(state) = self.slot_mut(slot) {
            state.current_speed = speed.min(MAX_SPEED);
            for loco in state.locos.iter_mut() {
                loco.speed = state.current_speed;
            }
        }
    }

    /// Apply a per-slot direction report from the server.
    pub fn apply_slot_direction(&mut self, slot: u8, direction: Direction) {
        if let Ok(state) = self.slot_mut(slot) {
            state.current_direction = direction;
            for loco in state.locos.iter_mut() {
                loco.direction = direction;
            }
        }
    }

    /// Apply a per-slot function report from the server.
    pub fn apply_slot_function(&mut self, slot: u8, function: u8, on: bool) {
        if function as usize >= FUNCTION_COUNT {
            return;
        }
        if let Ok(state) = self.slot_mut(slot) {
            for loco in state.locos.iter_mut() {
                loco.functions[function as usize] = on;
            }
        }
    }

    /// Record the reported track power state.
    pub fn set_track_power(&mut self, state: TrackPower) {
        self.track_power = state;
    }

    /// Last reported track power state.
    pub fn track_power(&self) -> TrackPower {
        self.track_power
    }

    /// Drop all list contents and clear every slot.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.turnouts.clear();
        self.routes.clear();
        for slot in self.slots.iter_mut() {
            slot.clear();
        }
        self.current_slot = 0;
        self.track_power = TrackPower::Unknown;
        debug!("roster: cleared");
    }
}
