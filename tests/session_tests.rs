//! Controller-level scenarios: startup, connection, and the keypad
//! flows a user actually exercises.

use wit_throttle::config::{Config, ServerConfig};
use wit_throttle::connection::ConnectionState;
use wit_throttle::controller::WitController;
use wit_throttle::hal::mock::{
    MockBattery, MockDiscovery, MockDisplay, MockEncoder, MockKeypad, MockStorage, MockTransport,
    MockWifi,
};
use wit_throttle::input::KeypadMode;
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

fn server(name: &str, last_octet: u8) -> ServerInfo {
    let mut n = heapless::String::new();
    let _ = n.push_str(name);
    ServerInfo {
        ip: core::net::Ipv4Addr::new(192, 168, 1, last_octet),
        port: 12090,
        name: n,
        service: ServiceKind::WiThrottle,
    }
}

fn controller(servers: &[ServerInfo], auto_connect: bool) -> TestController {
    controller_with_storage(servers, auto_connect, MockStorage::new())
}

fn controller_with_storage(
    servers: &[ServerInfo],
    auto_connect: bool,
    storage: MockStorage,
) -> TestController {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut discovery = MockDiscovery::new();
    for s in servers {
        discovery.add_server(s.clone());
    }
    let mut wifi = MockWifi::new();
    wifi.set_associated(true);

    let config = Config::default().with_server(
        ServerConfig::default()
            .with_auto_connect(auto_connect)
            .with_prefixes("LT", "IR"),
    );
    WitController::new(
        config,
        MockTransport::new(),
        discovery,
        wifi,
        MockKeypad::new(),
        MockEncoder::new(),
        MockBattery::new(),
        storage,
        MockDisplay::new(),
    )
}

/// Tick until the outbound queue drains, advancing 50 ms per pass.
fn settle(c: &mut TestController, t: &mut u64) {
    for _ in 0..32 {
        *t += 50;
        c.tick(*t);
        if c.session().queue_len() == 0 {
            break;
        }
    }
}

/// A controller that is connected with the handshake already sent.
fn connected(servers: &[ServerInfo]) -> (TestController, u64) {
    let mut c = controller(servers, true);
    let mut t = 0;
    c.start(t);
    c.tick(t); // discovery pass
    c.tick(t); // transport reports connected
    assert_eq!(c.session().state(), ConnectionState::Connected);
    settle(&mut c, &mut t);
    (c, t)
}

fn type_keys(c: &mut TestController, keys: &str, t: u64) {
    c.keypad_mut().type_keys(keys);
    c.tick(t);
}

// =============================================================================
// Startup and connection
// =============================================================================

#[test]
fn auto_connect_reaches_connected_without_selection() {
    let mut c = controller(&[server("jmri", 10)], true);
    c.start(0);
    c.tick(0);
    c.tick(0);

    assert_eq!(c.session().state(), ConnectionState::Connected);
    // Never asked the user to pick
    assert_eq!(c.dispatcher().mode(), KeypadMode::Operation);
}

#[test]
fn discovery_without_auto_connect_asks_user() {
    let mut c = controller(&[server("jmri", 10), server("dccex", 11)], false);
    c.start(0);
    c.tick(0);

    assert_eq!(c.session().state(), ConnectionState::SelectionRequired);
    assert_eq!(c.dispatcher().mode(), KeypadMode::SelectServer);

    // Pick the first server by digit
    type_keys(&mut c, "0", 0);
    c.tick(0);
    assert_eq!(c.session().state(), ConnectionState::Connected);
}

#[test]
fn no_servers_leads_to_manual_entry() {
    let mut c = controller(&[], false);
    c.start(0);
    c.tick(0);

    assert_eq!(c.session().state(), ConnectionState::EntryRequired);
    assert_eq!(c.dispatcher().mode(), KeypadMode::EnterServerIp);

    // Type 192.168.001.010:12090 and commit
    type_keys(&mut c, "19216800101012090#", 0);
    c.tick(0);
    assert_eq!(c.session().state(), ConnectionState::Connected);
    let selected = c.session().selected_server().unwrap();
    assert_eq!(selected.ip, core::net::Ipv4Addr::new(192, 168, 1, 10));
    assert_eq!(selected.port, 12090);
}

#[test]
fn handshake_requests_lists_on_connect() {
    let (c, _) = connected(&[server("jmri", 10)]);
    let sent = c.session().transport().sent_lines();
    assert!(sent.iter().any(|l| l == "RL"));
    assert!(sent.iter().any(|l| l == "PTL"));
    assert!(sent.iter().any(|l| l == "PRL"));
}

#[test]
fn connected_server_is_remembered() {
    let (c, _) = connected(&[server("jmri", 10)]);
    assert_eq!(
        c.prefs().last_server(),
        Some((core::net::Ipv4Addr::new(192, 168, 1, 10), 12090))
    );
}

#[test]
fn remembered_server_is_reconnected_after_restart() {
    // First run: the user picks the second server by hand.
    let mut first = controller(&[server("alpha", 10), server("zeta", 20)], false);
    first.start(0);
    first.tick(0);
    type_keys(&mut first, "1", 0);
    first.tick(0);
    assert_eq!(first.session().state(), ConnectionState::Connected);

    // Fresh instance over the same store auto-connects to it, not to
    // the first discovered server.
    let storage = first.prefs().store().clone();
    let mut second =
        controller_with_storage(&[server("alpha", 10), server("zeta", 20)], true, storage);
    second.start(0);
    second.tick(0);
    second.tick(0);

    assert_eq!(second.session().state(), ConnectionState::Connected);
    assert_eq!(
        second.session().selected_server().map(|s| s.ip),
        Some(core::net::Ipv4Addr::new(192, 168, 1, 20))
    );
}

#[test]
fn remembered_server_tried_when_discovery_is_empty() {
    use wit_throttle::traits::Storage;
    let mut storage = MockStorage::new();
    storage.put_str("lastServerIP", "192.168.1.30");
    storage.put_i32("lastServerPort", 12090);
    let mut c = controller_with_storage(&[], true, storage);
    c.start(0);
    c.tick(0);
    c.tick(0);

    assert_eq!(c.session().state(), ConnectionState::Connected);
    assert_eq!(
        c.session().selected_server().map(|s| (s.ip, s.port)),
        Some((core::net::Ipv4Addr::new(192, 168, 1, 30), 12090))
    );
}

// =============================================================================
// WiFi startup flow
// =============================================================================

#[test]
fn wifi_scan_select_password_join() {
    let mut c = controller(&[server("jmri", 10)], true);
    c.wifi_mut().set_associated(false);
    c.wifi_mut().add_network("layout-net", -50, false);

    c.start(0);
    assert_eq!(c.dispatcher().mode(), KeypadMode::SelectSsid);

    // Pick the network; it is protected, so password entry opens
    type_keys(&mut c, "0", 0);
    assert_eq!(c.dispatcher().mode(), KeypadMode::EnterPassword);

    // Type "123" and commit; the join happens and discovery follows
    type_keys(&mut c, "123#", 0);
    assert_eq!(c.wifi_mut().join_calls[0], ("layout-net".into(), "123".into()));

    c.tick(0); // association completes, discovery starts
    c.tick(0);
    c.tick(0);
    assert_eq!(c.session().state(), ConnectionState::Connected);
    assert_eq!(c.prefs().last_ssid().as_str(), "layout-net");
}

#[test]
fn open_network_joins_without_password() {
    let mut c = controller(&[], false);
    c.wifi_mut().set_associated(false);
    c.wifi_mut().add_network("cafe", -60, true);

    c.start(0);
    type_keys(&mut c, "0", 0);
    assert_eq!(c.wifi_mut().join_calls[0], ("cafe".into(), "".into()));
}

// =============================================================================
// Acquisition through the menu
// =============================================================================

#[test]
fn star_one_hash_opens_roster_and_digit_acquires() {
    let (mut c, mut t) = connected(&[server("jmri", 10)]);

    // Server sends a roster list
    c.session_mut()
        .transport_mut()
        .push_incoming("RL2}|{3}|{Loco 3}|{S");
    c.session_mut()
        .transport_mut()
        .push_incoming("RL2}|{4017}|{Big Boy}|{L");
    c.tick(t);
    assert_eq!(c.roster().entry_count(), 2);

    type_keys(&mut c, "*1#", t);
    assert_eq!(c.dispatcher().mode(), KeypadMode::SelectRoster);

    type_keys(&mut c, "1", t);
    settle(&mut c, &mut t);

    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0+*<;>L4017");
    assert_eq!(c.roster().slot(0).unwrap().lead_address(), Some(4017));
}

#[test]
fn menu_with_address_argument_acquires_directly() {
    let (mut c, mut t) = connected(&[server("jmri", 10)]);

    type_keys(&mut c, "*1442#", t);
    settle(&mut c, &mut t);

    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0+*<;>L442");
}

#[test]
fn release_menu_clears_slot() {
    let (mut c, mut t) = connected(&[server("jmri", 10)]);
    type_keys(&mut c, "*1442#", t);
    settle(&mut c, &mut t);

    type_keys(&mut c, "*2#", t);
    settle(&mut c, &mut t);

    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0-*<;>r");
    assert!(!c.roster().slot_has_loco(0));
}

// =============================================================================
// Driving
// =============================================================================

#[test]
fn encoder_turns_become_speed_commands() {
    let (mut c, mut t) = connected(&[server("jmri", 10)]);
    type_keys(&mut c, "*1442#", t);
    settle(&mut c, &mut t);

    c.encoder_mut().queue_delta(10);
    t += 50;
    c.tick(t);
    settle(&mut c, &mut t);

    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0*<;>V10");
    assert_eq!(c.roster().slot(0).unwrap().current_speed, 10);
}

#[test]
fn multiplier_doubles_encoder_steps() {
    let (mut c, mut t) = connected(&[server("jmri", 10)]);
    type_keys(&mut c, "*1442#", t);
    settle(&mut c, &mut t);

    // Key 6 toggles the step multiplier to 2
    type_keys(&mut c, "6", t);
    c.encoder_mut().queue_delta(5);
    t += 50;
    c.tick(t);
    settle(&mut c, &mut t);

    assert_eq!(c.roster().slot(0).unwrap().current_speed, 10);
}

#[test]
fn direction_keys_send_wire_bits() {
    let (mut c, mut t) = connected(&[server("jmri", 10)]);
    type_keys(&mut c, "*1442#", t);
    settle(&mut c, &mut t);

    type_keys(&mut c, "7", t); // reverse
    settle(&mut c, &mut t);
    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0*<;>R0");

    type_keys(&mut c, "9", t); // forward
    settle(&mut c, &mut t);
    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0*<;>R1");
}

#[test]
fn estop_key_zeroes_speed() {
    let (mut c, mut t) = connected(&[server("jmri", 10)]);
    type_keys(&mut c, "*1442#", t);
    settle(&mut c, &mut t);
    c.encoder_mut().queue_delta(60);
    t += 50;
    c.tick(t);
    settle(&mut c, &mut t);

    type_keys(&mut c, "8", t);
    settle(&mut c, &mut t);

    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0*<;>V0");
    assert_eq!(c.roster().slot(0).unwrap().current_speed, 0);
}

#[test]
fn function_key_toggles_on_then_off() {
    let (mut c, mut t) = connected(&[server("jmri", 10)]);
    type_keys(&mut c, "*1442#", t);
    settle(&mut c, &mut t);

    type_keys(&mut c, "0", t); // F0 on
    settle(&mut c, &mut t);
    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0*<;>F10");

    type_keys(&mut c, "0", t); // F0 off
    settle(&mut c, &mut t);
    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "MT0*<;>F00");
}

// =============================================================================
// Turnouts, routes, power
// =============================================================================

#[test]
fn turnout_menu_flow_sends_accessory_command() {
    let (mut c, mut t) = connected(&[server("jmri", 10)]);
    c.session_mut()
        .transport_mut()
        .push_incoming("PTL12}|{Yard East}|{0");
    c.tick(t);
    assert_eq!(c.roster().turnout_count(), 1);

    type_keys(&mut c, "*5#", t);
    type_keys(&mut c, "0", t);
    settle(&mut c, &mut t);

    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "PTALT12T");
}

#[test]
fn route_menu_flow_sends_activation() {
    let (mut c, mut t) = connected(&[server("jmri", 10)]);
    c.session_mut()
        .transport_mut()
        .push_incoming("PRL:AUTO:1}|{Main Loop}|{0");
    c.tick(t);

    type_keys(&mut c, "*7#", t);
    type_keys(&mut c, "0", t);
    settle(&mut c, &mut t);

    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "PRAIR:AUTO:1A");
}

#[test]
fn track_power_toggle_follows_reported_state() {
    let (mut c, mut t) = connected(&[server("jmri", 10)]);

    // Unknown state commands power on
    type_keys(&mut c, "*8#", t);
    settle(&mut c, &mut t);
    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "PPA1");

    // Server reports on; next toggle commands off
    c.session_mut().transport_mut().push_incoming("PPA1");
    c.tick(t);
    type_keys(&mut c, "*8#", t);
    settle(&mut c, &mut t);
    let sent = c.session().transport().sent_lines();
    assert_eq!(sent.last().unwrap(), "PPA0");
}

// =============================================================================
// Server-driven slot updates
// =============================================================================

#[test]
fn slot_updates_from_server_reach_the_model() {
    let (mut c, t) = connected(&[server("jmri", 10)]);
    {
        let transport = c.session_mut().transport_mut();
        transport.push_incoming("MT0*<;>V44");
        transport.push_incoming("MT0*<;>R0");
    }
    c.tick(t);

    let slot = c.roster().slot(0).unwrap();
    assert_eq!(slot.current_speed, 44);
    assert_eq!(
        slot.current_direction,
        wit_throttle::protocol::Direction::Reverse
    );
}

#[test]
fn malformed_lines_do_not_disturb_the_session() {
    let (mut c, t) = connected(&[server("jmri", 10)]);
    {
        let transport = c.session_mut().transport_mut();
        transport.push_incoming("RLgarbage-without-delimiters");
        transport.push_incoming("XYZ unknown");
        transport.push_incoming("PPA1");
    }
    c.tick(t);

    assert_eq!(c.session().state(), ConnectionState::Connected);
    assert_eq!(
        c.roster().track_power(),
        wit_throttle::protocol::TrackPower::On
    );
}
