//! Randomized property-based security tests.
//!
//! Uses proptest to verify the protocol's observable invariants hold across
//! random passwords, identities and contexts.

use jpake::{derive_s, Jpake, JpakeThreePass};
use proptest::prelude::*;

/// Run a complete two-round exchange, returning both derived keys
fn agree(
    password_a: &str,
    password_b: &str,
    id_a: &str,
    id_b: &str,
    context: &[String],
) -> ([u8; 32], [u8; 32]) {
    let mut alice = Jpake::with_context(id_a, context.to_vec()).unwrap();
    let mut bob = Jpake::with_context(id_b, context.to_vec()).unwrap();

    let s_a = derive_s(password_a).unwrap();
    let s_b = derive_s(password_b).unwrap();

    let alice_r1 = alice.round1().unwrap();
    let bob_r1 = bob.round1().unwrap();
    let alice_r2 = alice.round2(&bob_r1, &s_a, id_b).unwrap();
    let bob_r2 = bob.round2(&alice_r1, &s_b, id_a).unwrap();
    alice.set_round2_from_peer(&bob_r2).unwrap();
    bob.set_round2_from_peer(&alice_r2).unwrap();

    (
        alice.derive_shared_key().unwrap(),
        bob.derive_shared_key().unwrap(),
    )
}

proptest! {
    // every case is a full protocol run, keep the count modest
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn matching_passwords_always_agree(
        password in "[ -~]{1,48}",
        context in proptest::collection::vec("[ -~]{0,32}", 0..3),
    ) {
        let (alice_key, bob_key) = agree(&password, &password, "Alice", "Bob", &context);
        prop_assert_eq!(alice_key, bob_key);
    }

    #[test]
    fn distinct_passwords_never_agree(
        password in "[ -~]{1,48}",
        suffix in "[ -~]{1,8}",
    ) {
        let wrong = format!("{password}{suffix}");
        let (alice_key, bob_key) = agree(&password, &wrong, "Alice", "Bob", &[]);
        prop_assert_ne!(alice_key, bob_key);
    }

    #[test]
    fn repeated_runs_never_repeat_keys(password in "[ -~]{1,48}") {
        let (first, _) = agree(&password, &password, "Alice", "Bob", &[]);
        let (second, _) = agree(&password, &password, "Alice", "Bob", &[]);
        prop_assert_ne!(first, second);
    }

    #[test]
    fn the_three_pass_schedule_matches_the_two_round_one(password in "[ -~]{1,48}") {
        let s = derive_s(&password).unwrap();
        let mut initiator = JpakeThreePass::new("Alice").unwrap();
        let mut responder = JpakeThreePass::new("Bob").unwrap();

        let pass1 = initiator.pass1().unwrap();
        let pass2 = responder.pass2(&pass1, &s, "Alice").unwrap();
        let pass3 = initiator.pass3(&pass2, &s, "Bob").unwrap();
        responder.receive_pass3(&pass3).unwrap();

        prop_assert_eq!(
            initiator.derive_shared_key().unwrap(),
            responder.derive_shared_key().unwrap()
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn derive_s_is_a_pure_function_into_the_scalar_range(password in ".{1,64}") {
        let first = derive_s(&password).unwrap();
        let second = derive_s(&password).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_ne!(first, [0u8; 32]);

        // big-endian comparison against the group order n
        let order = hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141")
            .unwrap();
        prop_assert!(first.as_slice() < order.as_slice());
    }

    #[test]
    fn tampered_round1_messages_never_pass(byte in 0usize..200, bit in 0usize..8) {
        let mut alice = Jpake::new("Alice").unwrap();
        let mut bob = Jpake::new("Bob").unwrap();
        alice.round1().unwrap();
        let bob_r1 = bob.round1().unwrap();

        let mut wire = bob_r1.to_bytes();
        wire[byte] ^= 1 << bit;

        let s = derive_s("secretPassword123").unwrap();
        let outcome = jpake::Round1Result::from_bytes(&wire)
            .and_then(|tampered| alice.round2(&tampered, &s, "Bob"));
        prop_assert!(outcome.is_err());
    }
}
