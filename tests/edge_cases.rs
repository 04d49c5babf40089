//! Boundary and failure behavior: capacity limits, clamping, queue
//! backpressure, and link loss.

use wit_throttle::config::{Config, ServerConfig};
use wit_throttle::connection::ConnectionState;
use wit_throttle::controller::WitController;
use wit_throttle::hal::mock::{
    MockBattery, MockDiscovery, MockDisplay, MockEncoder, MockKeypad, MockStorage, MockTransport,
    MockWifi,
};
use wit_throttle::traits::{ServerInfo, ServiceKind};

type TestController = WitController<
    MockTransport,
    MockDiscovery,
    MockWifi,
    MockKeypad,
    MockEncoder,
    MockBattery,
    MockStorage,
    MockDisplay,
>;

fn controller() -> TestController {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut discovery = MockDiscovery::new();
    let mut name = heapless::String::new();
    let _ = name.push_str("jmri");
    discovery.add_server(ServerInfo {
        ip: core::net::Ipv4Addr::new(192, 168, 1, 10),
        port: 12090,
        name,
        service: ServiceKind::WiThrottle,
    });
    let mut wifi = MockWifi::new();
    wifi.set_associated(true);

    let config =
        Config::default().with_server(ServerConfig::default().with_auto_connect(true));
    WitController::new(
        config,
        MockTransport::new(),
        discovery,
        wifi,
        MockKeypad::new(),
        MockEncoder::new(),
        MockBattery::new(),
        MockStorage::new(),
        MockDisplay::new(),
    )
}

fn settle(c: &mut TestController, t: &mut u64) {
    for _ in 0..64 {
        *t += 50;
        c.tick(*t);
        if c.session().queue_len() == 0 {
            break;
        }
    }
}

fn connected() -> (TestController, u64) {
    let mut c = controller();
    let mut t = 0;
    c.start(t);
    c.tick(t);
    c.tick(t);
    assert_eq!(c.session().state(), ConnectionState::Connected);
    settle(&mut c, &mut t);
    (c, t)
}

fn acquire(c: &mut TestController, address: u16, t: &mut u64) {
    let keys = format!("*1{}#", address);
    c.keypad_mut().type_keys(&keys);
    c.tick(*t);
    settle(c, t);
}

// =============================================================================
// Capacity limits
// =============================================================================

#[test]
fn seventh_loco_is_rejected() {
    let (mut c, mut t) = connected();
    for address in 100..106 {
        acquire(&mut c, address, &mut t);
    }
    assert_eq!(c.roster().slot(0).unwrap().loco_count(), 6);

    let sent_before = c.session().transport().sent_lines().len();
    acquire(&mut c, 106, &mut t);

    assert_eq!(c.roster().slot(0).unwrap().loco_count(), 6);
    assert_eq!(c.session().transport().sent_lines().len(), sent_before);
    assert_eq!(c.screen().status(), "Cannot acquire");
}

#[test]
fn duplicate_acquire_is_a_silent_no_op() {
    let (mut c, mut t) = connected();
    acquire(&mut c, 42, &mut t);
    let sent_before = c.session().transport().sent_lines().len();

    acquire(&mut c, 42, &mut t);

    assert_eq!(c.roster().slot(0).unwrap().loco_count(), 1);
    assert_eq!(c.session().transport().sent_lines().len(), sent_before);
    assert_ne!(c.screen().status(), "Cannot acquire");
}

#[test]
fn roster_list_overflow_keeps_first_seventy() {
    let (mut c, t) = connected();
    for address in 1..=75u16 {
        let line = format!("RL9}}|{{{}}}|{{Loco {}}}|{{S", address, address);
        c.session_mut().transport_mut().push_incoming(&line);
    }
    c.tick(t);

    assert_eq!(c.roster().entry_count(), 70);
    assert!(c.roster().find_by_address(70).is_some());
    assert!(c.roster().find_by_address(71).is_none());
}

// =============================================================================
// Speed clamping
// =============================================================================

#[test]
fn speed_never_goes_below_zero() {
    let (mut c, mut t) = connected();
    acquire(&mut c, 3, &mut t);

    c.encoder_mut().queue_delta(-5);
    t += 50;
    c.tick(t);
    settle(&mut c, &mut t);

    assert_eq!(c.roster().slot(0).unwrap().current_speed, 0);
    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0*<;>V0");
}

#[test]
fn speed_caps_at_126() {
    let (mut c, mut t) = connected();
    acquire(&mut c, 3, &mut t);

    c.encoder_mut().queue_delta(999);
    t += 50;
    c.tick(t);
    settle(&mut c, &mut t);

    assert_eq!(c.roster().slot(0).unwrap().current_speed, 126);
    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0*<;>V126");
}

// =============================================================================
// Queue backpressure
// =============================================================================

#[test]
fn overfull_queue_reports_busy() {
    let (mut c, mut t) = connected();
    acquire(&mut c, 3, &mut t);

    // 20 toggles land in one pass; the queue holds 16
    for _ in 0..4 {
        c.keypad_mut().type_keys("01234");
    }
    t += 50;
    c.tick(t);

    assert_eq!(c.screen().status(), "Busy");

    // The queued commands still drain in order
    settle(&mut c, &mut t);
    assert_eq!(c.session().queue_len(), 0);
}

// =============================================================================
// Link loss and recovery
// =============================================================================

#[test]
fn lost_link_reconnects_after_delay() {
    let (mut c, mut t) = connected();

    c.session_mut().transport_mut().drop_connection();
    t += 50;
    c.tick(t);
    assert_eq!(c.session().state(), ConnectionState::Disconnected);
    assert_eq!(c.screen().status(), "Connection lost");
    let loss_at = t;

    // Not yet: the retry delay is five seconds
    c.tick(loss_at + 4_999);
    assert_eq!(c.session().state(), ConnectionState::Disconnected);

    c.tick(loss_at + 5_001);
    assert_eq!(c.session().state(), ConnectionState::Connecting);

    c.tick(loss_at + 5_002);
    assert_eq!(c.session().state(), ConnectionState::Connected);
}

#[test]
fn user_disconnect_does_not_reconnect() {
    let (mut c, t) = connected();

    c.session_mut().disconnect();
    assert_eq!(c.session().state(), ConnectionState::Disconnected);

    c.tick(t + 60_000);
    assert_eq!(c.session().state(), ConnectionState::Disconnected);
    assert!(c.session().selected_server().is_none());
}

#[test]
fn connect_timeout_gives_up() {
    let mut c = controller();
    c.session_mut()
        .transport_mut()
        .set_accept_connections(false);
    c.start(0);
    c.tick(0);
    assert_eq!(c.session().state(), ConnectionState::Connecting);

    c.tick(29_999);
    assert_eq!(c.session().state(), ConnectionState::Connecting);

    c.tick(30_000);
    assert_eq!(c.session().state(), ConnectionState::Disconnected);
    assert_eq!(c.screen().status(), "Connect timeout");
}

// =============================================================================
// Slot behavior
// =============================================================================

#[test]
fn consist_commands_address_every_loco() {
    let (mut c, mut t) = connected();
    acquire(&mut c, 10, &mut t);
    acquire(&mut c, 11, &mut t);
    assert_eq!(c.roster().slot(0).unwrap().loco_count(), 2);

    // One release clears the whole slot
    c.keypad_mut().type_keys("*2#");
    c.tick(t);
    settle(&mut c, &mut t);

    assert!(!c.roster().slot_has_loco(0));
    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0-*<;>r");
}

#[test]
fn next_throttle_switches_command_slot() {
    let (mut c, mut t) = connected();
    acquire(&mut c, 10, &mut t);

    // Key 5 cycles to the second slot
    c.keypad_mut().type_keys("5");
    c.tick(t);
    assert_eq!(c.roster().current_slot(), 1);

    acquire(&mut c, 20, &mut t);
    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT1+*<;>L20");

    // And back around to the first
    c.keypad_mut().type_keys("5");
    c.tick(t);
    assert_eq!(c.roster().current_slot(), 0);
}

#[test]
fn direct_keys_without_loco_do_not_send() {
    let (mut c, t) = connected();
    let sent_before = c.session().transport().sent_lines().len();

    c.keypad_mut().type_keys("079");
    c.tick(t);

    assert_eq!(c.session().transport().sent_lines().len(), sent_before);
    assert_eq!(c.screen().status(), "No loco");
}

#[test]
fn estop_works_on_an_empty_slot() {
    let (mut c, mut t) = connected();

    c.keypad_mut().type_keys("8");
    t += 50;
    c.tick(t);
    settle(&mut c, &mut t);

    assert_eq!(c.screen().status(), "STOP");
    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0*<;>V0");
}
