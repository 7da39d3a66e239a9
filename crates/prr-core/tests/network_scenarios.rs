//! End-to-end scenarios through the network registry.
//!
//! Each test drives a small network through a realistic sequence and checks
//! states, histories and accounting on both sides.

use prr_core::{
    CommunicationStatus, InteractiveKind, Network, NetworkError, TerminalState,
};

fn two_basic_terminals() -> Network {
    let mut net = Network::default();
    net.register_client("C1", "First Client", 501_234_567).unwrap();
    net.register_terminal("BASIC", "910000", "C1").unwrap();
    net.register_terminal("BASIC", "910001", "C1").unwrap();
    net
}

/// Start between two idle terminals makes both BUSY and active, and the
/// destination cannot start a second one.
#[test]
fn start_between_idle_terminals() {
    let mut net = two_basic_terminals();

    let id = net
        .start_interactive_communication("910000", "910001", InteractiveKind::Voice)
        .expect("start should succeed");

    for key in ["910000", "910001"] {
        let terminal = net.terminal(key).unwrap();
        assert_eq!(terminal.state(), TerminalState::Busy, "{key} should be busy");
        assert!(terminal.has_activity(), "{key} should be active");
        assert_eq!(terminal.ongoing().map(|o| o.id), Some(id));
    }
    assert_eq!(net.terminal("910000").unwrap().made_communications().collect::<Vec<_>>(), vec![id]);
    assert_eq!(net.terminal("910001").unwrap().received_communications().collect::<Vec<_>>(), vec![id]);

    let second = net.start_interactive_communication("910001", "910000", InteractiveKind::Voice);
    assert!(matches!(second, Err(NetworkError::InvalidState { state: TerminalState::Busy, .. })));
    assert_eq!(net.communications().count(), 1);
}

/// A third terminal calling into a busy one is refused with TargetBusy.
#[test]
fn busy_destination_refuses() {
    let mut net = two_basic_terminals();
    net.register_terminal("BASIC", "910002", "C1").unwrap();
    net.start_interactive_communication("910000", "910001", InteractiveKind::Voice).unwrap();

    let result = net.start_interactive_communication("910002", "910001", InteractiveKind::Voice);
    assert_eq!(result, Err(NetworkError::TargetBusy("910001".to_string())));
    assert!(result.unwrap_err().is_target_unavailable());
    assert!(!net.terminal("910002").unwrap().has_activity());
}

/// A silent terminal refuses calls but still takes text.
#[test]
fn silent_terminal_receives_text_only() {
    let mut net = two_basic_terminals();
    net.set_silent("910001").unwrap();

    let call = net.start_interactive_communication("910000", "910001", InteractiveKind::Voice);
    assert_eq!(call, Err(NetworkError::TargetSilent("910001".to_string())));

    let id = net.send_text_communication("910000", "910001", "are you there?").unwrap();
    let silent = net.terminal("910001").unwrap();
    assert_eq!(silent.state(), TerminalState::Silent);
    assert_eq!(silent.state_name(), "SILENCE");
    assert!(silent.has_activity());
    assert_eq!(silent.received_communications().collect::<Vec<_>>(), vec![id]);

    let text = net.communication(id).unwrap();
    assert_eq!(text.status(), CommunicationStatus::Finished);
    assert_eq!(text.size(), 14);
    assert_eq!(net.terminal("910000").unwrap().debt(), text.cost());
}

/// A busy terminal still receives text without leaving its call.
#[test]
fn busy_terminal_receives_text() {
    let mut net = two_basic_terminals();
    net.register_terminal("BASIC", "910002", "C1").unwrap();
    let call = net.start_interactive_communication("910000", "910001", InteractiveKind::Voice).unwrap();

    net.send_text_communication("910002", "910001", "call me").unwrap();
    let busy = net.terminal("910001").unwrap();
    assert_eq!(busy.state(), TerminalState::Busy);
    assert_eq!(busy.ongoing().map(|o| o.id), Some(call));
}

/// Repeating the current state is a no-op that touches nothing.
#[test]
fn set_idle_on_idle_is_noop() {
    let mut net = two_basic_terminals();
    net.send_text_communication("910000", "910001", "hi").unwrap();
    let before = net.snapshot();

    net.set_idle("910000").unwrap();
    net.set_idle("910001").unwrap();

    assert_eq!(net.snapshot(), before);
}

/// Explicit state changes cannot pull a terminal out of a live call.
#[test]
fn cannot_leave_busy_during_call() {
    let mut net = two_basic_terminals();
    net.start_interactive_communication("910000", "910001", InteractiveKind::Voice).unwrap();

    for key in ["910000", "910001"] {
        assert!(matches!(net.turn_off(key), Err(NetworkError::InvalidState { .. })));
        assert!(matches!(net.set_idle(key), Err(NetworkError::InvalidState { .. })));
        assert!(matches!(net.set_silent(key), Err(NetworkError::InvalidState { .. })));
        net.set_busy(key).unwrap();
    }

    net.end_interactive_communication("910000", 1).unwrap();
    net.turn_off("910001").unwrap();
    assert_eq!(net.terminal("910001").unwrap().state(), TerminalState::Off);
}

/// Full lifecycle: call, hang up, pay; accounting adds up per client and
/// globally.
#[test]
fn call_end_and_pay() {
    let mut net = two_basic_terminals();
    net.register_client("C2", "Second Client", 509_876_543).unwrap();
    net.register_terminal("FANCY", "920000", "C2").unwrap();
    net.register_terminal("FANCY", "920001", "C2").unwrap();

    let video = net.start_interactive_communication("920000", "920001", InteractiveKind::Video).unwrap();
    let voice = net.start_interactive_communication("910000", "910001", InteractiveKind::Voice).unwrap();

    let video_cost = net.end_interactive_communication("920000", 3).unwrap();
    let voice_cost = net.end_interactive_communication("910000", 2).unwrap();
    assert_eq!(video_cost, 90);
    assert_eq!(voice_cost, 40);

    assert_eq!(net.client_debts("C1").unwrap(), 40);
    assert_eq!(net.client_debts("C2").unwrap(), 90);
    assert_eq!(net.global_debts(), 130);

    assert_eq!(net.pay_communication("920000", video).unwrap(), 90);
    assert_eq!(net.client_payments("C2").unwrap(), 90);
    assert_eq!(net.client_debts("C2").unwrap(), 0);
    assert_eq!(net.global_payments(), 90);

    let positive: Vec<_> =
        net.terminals_with_positive_balance().iter().map(|t| t.key().to_string()).collect();
    assert_eq!(positive, vec!["920000"]);
    assert_eq!(net.terminal("910000").unwrap().balance(), -40);

    let made = net.communications_made_by_client("C1").unwrap();
    assert_eq!(made.iter().map(|c| c.id()).collect::<Vec<_>>(), vec![voice]);
}

/// Terminals that never communicated are reported as unused.
#[test]
fn unused_terminals_report() {
    let mut net = two_basic_terminals();
    net.register_terminal("BASIC", "910002", "C1").unwrap();
    net.send_text_communication("910000", "910001", "x").unwrap();

    let unused: Vec<_> = net.unused_terminals().iter().map(|t| t.key().to_string()).collect();
    assert_eq!(unused, vec!["910002"]);
}

/// Unknown keys are reported as such, before any state checks.
#[test]
fn unknown_keys_are_reported() {
    let mut net = two_basic_terminals();

    let result = net.start_interactive_communication("910000", "999999", InteractiveKind::Voice);
    assert_eq!(result, Err(NetworkError::UnknownTerminalKey("999999".to_string())));
    assert!(result.unwrap_err().is_unknown_key());

    assert!(matches!(
        net.register_terminal("BASIC", "930000", "C9"),
        Err(NetworkError::UnknownClientKey(_))
    ));
    assert!(matches!(net.turn_off("999999"), Err(NetworkError::UnknownTerminalKey(_))));
    assert!(matches!(net.end_interactive_communication("999999", 1), Err(NetworkError::UnknownTerminalKey(_))));
}

/// Calling yourself is an invalid argument, not a busy signal.
#[test]
fn self_communication_rejected() {
    let mut net = two_basic_terminals();
    assert!(matches!(
        net.start_interactive_communication("910000", "910000", InteractiveKind::Voice),
        Err(NetworkError::InvalidArgument(_))
    ));
    assert!(matches!(
        net.send_text_communication("910000", "910000", "me"),
        Err(NetworkError::InvalidArgument(_))
    ));
    assert!(!net.terminal("910000").unwrap().has_activity());
}
