//! Property-based tests for terminals and the registry
//!
//! These tests verify rules that must hold for all inputs: key validation,
//! key uniqueness, refusals from switched-off terminals, and exact debt
//! accounting when an interactive communication ends.

use prr_core::{
    EndPolicy, FlatPriceTable, InteractiveKind, Network, NetworkConfig, NetworkError,
    TerminalKey, TerminalState,
};
use proptest::prelude::*;

fn kind_name(fancy: bool) -> &'static str {
    if fancy { "FANCY" } else { "BASIC" }
}

/// Network with one client "c1" owning FANCY terminals `a` and `b`.
fn pair(a: &str, b: &str) -> Network {
    let mut net = Network::default();
    net.register_client("c1", "Client One", 1).unwrap();
    net.register_terminal("FANCY", a, "c1").unwrap();
    net.register_terminal("FANCY", b, "c1").unwrap();
    net
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: Six ASCII digits always form a valid terminal key
    #[test]
    fn prop_six_digits_are_valid(key in "[0-9]{6}") {
        let parsed = TerminalKey::parse(&key);
        prop_assert!(parsed.is_ok());
        let parsed = parsed.unwrap();
        prop_assert_eq!(parsed.as_str(), key.as_str());
    }

    /// Property: Anything else is rejected with InvalidArgument
    #[test]
    fn prop_other_strings_are_invalid(key in "\\PC{0,10}") {
        prop_assume!(!(key.len() == 6 && key.bytes().all(|b| b.is_ascii_digit())));
        prop_assert!(matches!(TerminalKey::parse(&key), Err(NetworkError::InvalidArgument(_))));
    }

    /// Property: The second registration of a key always fails, whatever its
    /// type or owner
    #[test]
    fn prop_duplicate_terminal_always_fails(
        key in "[0-9]{6}",
        first_fancy in any::<bool>(),
        second_fancy in any::<bool>(),
        same_client in any::<bool>(),
    ) {
        let mut net = Network::default();
        net.register_client("c1", "One", 1)?;
        net.register_client("c2", "Two", 2)?;

        net.register_terminal(kind_name(first_fancy), &key, "c1")?;
        let owner = if same_client { "c1" } else { "c2" };
        let result = net.register_terminal(kind_name(second_fancy), &key, owner).map(|_| ());

        prop_assert_eq!(result, Err(NetworkError::DuplicateTerminalKey(key.clone())));
        prop_assert_eq!(net.terminal_count(), 1);
        prop_assert_eq!(net.client("c2")?.terminal_count(), 0);
    }

    /// Property: An OFF terminal rejects every communication attempt
    #[test]
    fn prop_off_terminal_rejects_everything(
        message in "[a-z ]{0,20}",
        video in any::<bool>(),
    ) {
        let mut net = pair("910000", "910001");
        net.turn_off("910000")?;
        let kind = if video { InteractiveKind::Video } else { InteractiveKind::Voice };

        let start = net.start_interactive_communication("910000", "910001", kind);
        prop_assert!(
            matches!(start, Err(NetworkError::InvalidState { state: TerminalState::Off, .. })),
            "start from OFF: {:?}", start
        );

        let receive = net.start_interactive_communication("910001", "910000", kind);
        prop_assert_eq!(receive, Err(NetworkError::TargetOff("910000".to_string())));

        let text = net.send_text_communication("910001", "910000", &message);
        prop_assert_eq!(text, Err(NetworkError::TargetOff("910000".to_string())));

        let off = net.terminal("910000")?;
        prop_assert!(!off.has_activity());
        prop_assert_eq!(net.terminal("910001")?.state(), TerminalState::Idle);
        prop_assert_eq!(net.communications().count(), 0);
    }

    /// Property: Start makes the originator BUSY and able to end; end returns
    /// it to IDLE with debt increased by exactly the price table's cost
    #[test]
    fn prop_end_charges_exact_cost(
        duration in 0u64..10_000,
        video in any::<bool>(),
        friends in any::<bool>(),
        discount in 0u8..=100,
    ) {
        let prices = FlatPriceTable { friend_discount_percent: discount, ..FlatPriceTable::default() };
        let config = NetworkConfig { default_price_table: prices.clone(), ..NetworkConfig::default() };
        let mut net = Network::new(config);
        net.register_client("c1", "One", 1)?;
        net.register_terminal("FANCY", "910000", "c1")?;
        net.register_terminal("FANCY", "910001", "c1")?;
        if friends {
            net.add_friend("910000", "910001")?;
        }

        let kind = if video { InteractiveKind::Video } else { InteractiveKind::Voice };
        net.start_interactive_communication("910000", "910001", kind)?;

        let origin = net.terminal("910000")?;
        prop_assert_eq!(origin.state(), TerminalState::Busy);
        prop_assert!(origin.can_end_current_communication());
        let debt_before = origin.debt();

        let rate = if video { prices.video_per_unit } else { prices.voice_per_unit };
        let base = duration * rate;
        let expected = if friends { base * u64::from(100 - discount) / 100 } else { base };

        let cost = net.end_interactive_communication("910000", duration)?;
        prop_assert_eq!(cost, expected);

        let origin = net.terminal("910000")?;
        prop_assert_eq!(origin.state(), TerminalState::Idle);
        prop_assert_eq!(origin.debt(), debt_before + expected);
        prop_assert_eq!(net.terminal("910001")?.debt(), 0);
    }

    /// Property: Under the default policy the destination can never end
    #[test]
    fn prop_destination_cannot_end(duration in any::<u64>()) {
        let mut net = pair("910000", "910001");
        net.start_interactive_communication("910000", "910001", InteractiveKind::Voice)?;

        prop_assert!(!net.terminal("910001")?.can_end_current_communication());
        let result = net.end_interactive_communication("910001", duration);
        let is_busy_error = matches!(result, Err(NetworkError::InvalidState { state: TerminalState::Busy, .. }));
        prop_assert!(is_busy_error);
        prop_assert_eq!(net.terminal("910000")?.state(), TerminalState::Busy);
    }

    /// Property: Friendship is irreflexive and adding twice fails
    #[test]
    fn prop_friendship_rules(a in "[0-9]{6}", b in "[0-9]{6}") {
        prop_assume!(a != b);
        let mut net = pair(&a, &b);

        prop_assert!(matches!(net.add_friend(&a, &a), Err(NetworkError::InvalidArgument(_))));
        net.add_friend(&a, &b)?;
        prop_assert!(matches!(net.add_friend(&a, &b), Err(NetworkError::InvalidArgument(_))));
        prop_assert!(net.terminal(&a)?.is_friend(&b));
        prop_assert!(!net.terminal(&b)?.is_friend(&a));
    }
}

#[test]
fn any_participant_policy_lets_destination_end() {
    let config = NetworkConfig { end_policy: EndPolicy::AnyParticipant, ..NetworkConfig::default() };
    let mut net = Network::new(config);
    net.register_client("c1", "One", 1).unwrap();
    net.register_terminal("BASIC", "910000", "c1").unwrap();
    net.register_terminal("BASIC", "910001", "c1").unwrap();

    net.start_interactive_communication("910000", "910001", InteractiveKind::Voice).unwrap();
    assert!(net.terminal("910001").unwrap().can_end_current_communication());
    net.end_interactive_communication("910001", 1).unwrap();

    assert_eq!(net.terminal("910000").unwrap().state(), TerminalState::Idle);
    assert_eq!(net.terminal("910001").unwrap().state(), TerminalState::Idle);
    assert_eq!(net.terminal("910000").unwrap().debt(), 20);
}
