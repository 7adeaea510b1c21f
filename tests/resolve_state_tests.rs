/// Resolve state tests
///
/// The transition table, end states and codes of the handle lifecycle.
/// Run with: cargo test --test resolve_state_tests

use objectsync::ResolveState;
use objectsync::ResolveState::*;

fn allowed_from(state: ResolveState) -> Vec<ResolveState> {
    match state {
        New => vec![Ghost, Transient, Value],
        Ghost => vec![Resolving, Destroyed, Updating],
        Transient => vec![Resolved],
        Resolving => vec![Resolved],
        Resolved => vec![Ghost, Destroyed, Updating],
        Updating => vec![Resolved],
        _ => vec![],
    }
}

#[test]
fn test_transition_table_is_exact() {
    for from in ResolveState::ALL {
        let allowed = allowed_from(from);
        for to in ResolveState::ALL {
            assert_eq!(
                from.is_valid_to_change_to(to),
                allowed.contains(&to),
                "{} -> {}",
                from,
                to
            );
        }
    }
}

#[test]
fn test_only_resolving_and_updating_are_transitional() {
    for state in ResolveState::ALL {
        match state {
            Resolving | Updating => {
                assert!(state.is_transitional());
                assert_eq!(state.end_state(), Some(Resolved));
            }
            _ => {
                assert!(!state.is_transitional());
                assert_eq!(state.end_state(), None);
            }
        }
    }
}

#[test]
fn test_value_and_destroyed_are_dead_ends() {
    for to in ResolveState::ALL {
        assert!(!Value.is_valid_to_change_to(to));
        assert!(!Destroyed.is_valid_to_change_to(to));
    }
}

#[test]
fn test_nothing_enters_serializing_states() {
    for from in ResolveState::ALL {
        for to in ResolveState::ALL.into_iter().filter(ResolveState::is_serializing) {
            assert!(!from.is_valid_to_change_to(to));
        }
    }
}

#[test]
fn test_codes() {
    assert_eq!(Resolving.code(), "~R");
    assert_eq!(PartResolved.code(), "Pr");
    assert_eq!(SerializingResolved.code(), "SR");
    for state in ResolveState::ALL {
        assert_eq!(ResolveState::from_code(state.code()), Some(state));
    }
    assert_eq!(ResolveState::from_code("X"), None);
}

#[test]
fn test_persistent_states() {
    assert!(Ghost.represents_persistent());
    assert!(Updating.represents_persistent());
    assert!(!Transient.represents_persistent());
    assert!(!Destroyed.represents_persistent());
    assert!(!Value.represents_persistent());
}
