//! Ledger invariants: balance == surviving history, atomic writes, exact undo.

use winledger_core::{
    config::LedgerLimits,
    error::{ConstraintViolation, LedgerError},
    ledger::{Award, LedgerService},
    store::{LedgerStore, Standing},
    Outcome, Rejection,
};

fn ledger_with(limits: LedgerLimits) -> LedgerService {
    let store = LedgerStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    LedgerService::new(store, limits)
}

fn ledger() -> LedgerService {
    ledger_with(LedgerLimits::default())
}

fn standings(pairs: &[(&str, i64)]) -> Vec<Standing> {
    pairs
        .iter()
        .map(|(a, p)| Standing { actor: a.to_string(), points: *p })
        .collect()
}

fn assert_balances_match_history(ledger: &LedgerService) {
    for (actor, balance) in ledger.get_all_balances().unwrap() {
        let total: i64 = ledger
            .get_history(Some(&actor))
            .unwrap()
            .iter()
            .map(|e| e.delta)
            .sum();
        assert_eq!(balance, total, "balance of {actor} drifted from its history");
    }
    assert!(ledger.verify_consistency().unwrap().is_empty());
}

/// Mixed awards, penalties, undos and a clear never break the central invariant.
#[test]
fn balance_equals_history_after_any_sequence() {
    let ledger = ledger();
    let steps: Vec<Box<dyn Fn(&LedgerService)>> = vec![
        Box::new(|l: &LedgerService| { l.award(&Award::win("alice", 1, "admin").by_admin()).unwrap(); }),
        Box::new(|l: &LedgerService| { l.award(&Award::new("alice", 5, None, "admin")).unwrap(); }),
        Box::new(|l: &LedgerService| { l.award(&Award::win("bob", 2, "admin").by_admin()).unwrap(); }),
        Box::new(|l: &LedgerService| { l.award(&Award::new("alice", -3, None, "admin")).unwrap(); }),
        Box::new(|l: &LedgerService| { let _ = l.undo_last().unwrap(); }),
        Box::new(|l: &LedgerService| { l.award(&Award::win("<@!42>", 3, "admin").by_admin()).unwrap(); }),
        Box::new(|l: &LedgerService| { let _ = l.undo_last().unwrap(); }),
        Box::new(|l: &LedgerService| { let _ = l.undo_last().unwrap(); }),
        Box::new(|l: &LedgerService| { l.award(&Award::new("carol", 7, Some(4), "admin")).unwrap(); }),
    ];
    for step in &steps {
        step(&ledger);
        assert_balances_match_history(&ledger);
    }

    ledger.clear_all().unwrap();
    assert_balances_match_history(&ledger);
    assert!(ledger.snapshot().unwrap().is_empty());
}

/// Clearing twice leaves the same empty state as clearing once.
#[test]
fn clear_all_is_idempotent() {
    let ledger = ledger();
    ledger.award(&Award::win("alice", 1, "admin")).unwrap();
    ledger.award(&Award::win("bob", 2, "admin")).unwrap();

    let first = ledger.clear_all().unwrap();
    assert_eq!((first.balances, first.entries, first.match_results), (2, 2, 2));
    let once = ledger.snapshot().unwrap();

    let second = ledger.clear_all().unwrap();
    assert_eq!((second.balances, second.entries, second.match_results), (0, 0, 0));
    assert_eq!(ledger.snapshot().unwrap(), once);
    assert!(once.is_empty());
}

/// award followed by undo_last restores balance, history and match index exactly.
#[test]
fn undo_is_the_exact_inverse_of_award() {
    let ledger = ledger();
    ledger.award(&Award::win("zed", 9, "admin")).unwrap();
    ledger.award(&Award::new("alice", 2, None, "admin")).unwrap();

    for actor in ["alice", "newcomer"] {
        let before = ledger.snapshot().unwrap();
        ledger.award(&Award::new(actor, 5, Some(12), "referee")).unwrap();
        assert_ne!(ledger.snapshot().unwrap(), before);

        let undone = ledger.undo_last().unwrap().done().expect("something to undo");
        assert_eq!(undone.entry.actor, actor);
        assert_eq!(undone.entry.delta, 5);
        assert_eq!(ledger.snapshot().unwrap(), before, "undo of {actor}'s award was not exact");
        assert!(ledger.get_match_result(12).unwrap().is_none());
    }
}

/// Undo on an empty log is a rejection, not an error.
#[test]
fn undo_with_empty_history_reports_nothing_to_undo() {
    let ledger = ledger();
    let outcome = ledger.undo_last().unwrap();
    assert_eq!(outcome, Outcome::Rejected(Rejection::NothingToUndo));
    assert_eq!(outcome.rejection().unwrap().to_string(), "No points to undo");
}

/// Undo walks back one entry per call, newest first.
#[test]
fn repeated_undo_reverses_in_sequence() {
    let ledger = ledger();
    ledger.award(&Award::win("a", 1, "admin")).unwrap();
    ledger.award(&Award::win("b", 2, "admin")).unwrap();
    ledger.award(&Award::win("c", 3, "admin")).unwrap();

    let order: Vec<String> = (0..3)
        .map(|_| ledger.undo_last().unwrap().done().unwrap().entry.actor)
        .collect();
    assert_eq!(order, vec!["c", "b", "a"]);
    assert!(!ledger.undo_last().unwrap().is_done());
}

/// A penalty larger than the balance is refused and nothing is written.
#[test]
fn negative_balance_is_refused_without_partial_write() {
    let ledger = ledger_with(LedgerLimits {
        max_points_per_update: 1_000_000,
        ..LedgerLimits::default()
    });
    let err = ledger
        .award(&Award::new("carol", -1_000_000, None, "admin").by_admin())
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Constraint(ConstraintViolation::NegativeBalance { ref actor, balance: 0, delta: -1_000_000 })
            if actor == "carol"
    ));
    assert_eq!(ledger.get_balance("carol").unwrap(), 0);
    assert!(ledger.get_history(Some("carol")).unwrap().is_empty());
    assert!(ledger.snapshot().unwrap().is_empty());
}

/// Same guard under default limits: a small overdraw on an existing balance.
#[test]
fn overdraw_of_existing_balance_is_refused() {
    let ledger = ledger();
    ledger.award(&Award::new("carol", 2, None, "admin")).unwrap();
    let before = ledger.snapshot().unwrap();

    let err = ledger.award(&Award::new("carol", -3, None, "admin")).unwrap_err();
    assert!(err.is_constraint());
    assert_eq!(ledger.get_balance("carol").unwrap(), 2);
    assert_eq!(ledger.snapshot().unwrap(), before);

    ledger.award(&Award::new("carol", -2, None, "admin")).unwrap();
    assert_eq!(ledger.get_balance("carol").unwrap(), 0);
}

/// Ties on the leaderboard keep first-seen order; undo removes the newest.
#[test]
fn leaderboard_scenario_with_undo() {
    let ledger = ledger();
    assert!(ledger.get_leaderboard().unwrap().is_empty());

    ledger.award(&Award::win("u1", 1, "admin")).unwrap();
    assert_eq!(ledger.get_leaderboard().unwrap(), standings(&[("u1", 1)]));

    ledger.award(&Award::win("u2", 2, "admin")).unwrap();
    assert_eq!(ledger.get_leaderboard().unwrap(), standings(&[("u1", 1), ("u2", 1)]));

    let undone = ledger.undo_last().unwrap().done().unwrap();
    assert_eq!(undone.entry.actor, "u2");
    assert_eq!(undone.description(), "Undid 1 point(s) for @u2 (Match 2)");
    assert!(ledger.get_match_result(2).unwrap().is_none());
    assert!(ledger.get_match_result(1).unwrap().is_some());
    assert_eq!(ledger.get_leaderboard().unwrap(), standings(&[("u1", 1)]));
}

/// Higher scores rank first regardless of arrival order.
#[test]
fn leaderboard_sorts_by_points_descending() {
    let ledger = ledger();
    ledger.award(&Award::new("early", 1, None, "admin")).unwrap();
    ledger.award(&Award::new("late", 4, None, "admin")).unwrap();
    ledger.award(&Award::new("middle", 1, None, "admin")).unwrap();
    assert_eq!(
        ledger.get_leaderboard().unwrap(),
        standings(&[("late", 4), ("early", 1), ("middle", 1)])
    );
}

/// Out-of-range match numbers are validation errors and change nothing.
#[test]
fn match_number_above_max_is_a_validation_error() {
    let ledger = ledger();
    ledger.award(&Award::win("alice", 1, "admin")).unwrap();
    let before = ledger.snapshot().unwrap();

    for bad in [99_999, 0, 75] {
        let err = ledger.award(&Award::win("alice", bad, "admin").by_admin()).unwrap_err();
        assert!(err.is_validation(), "match {bad}: {err}");
        assert_eq!(err.user_message(), "Invalid match number. Must be between 1 and 74.");
    }
    assert_eq!(ledger.snapshot().unwrap(), before);
}

/// Zero, oversized deltas and malformed names never reach the store.
#[test]
fn bad_award_inputs_are_rejected_up_front() {
    let ledger = ledger();
    assert!(ledger.award(&Award::new("alice", 0, None, "admin")).unwrap_err().is_validation());
    assert!(ledger.award(&Award::new("alice", 101, None, "admin")).unwrap_err().is_validation());
    assert!(ledger.award(&Award::new("al ice", 1, None, "admin")).unwrap_err().is_validation());
    assert!(ledger.award(&Award::new("alice", 1, None, "  ")).unwrap_err().is_validation());
    assert!(ledger.snapshot().unwrap().is_empty());
}

/// Mentions are stored in canonical form and queried either way.
#[test]
fn nickname_mentions_share_one_balance() {
    let ledger = ledger();
    ledger.award(&Award::win("<@!77>", 1, "admin")).unwrap();
    ledger.award(&Award::win("<@77>", 2, "admin")).unwrap();
    assert_eq!(ledger.get_balance("<@!77>").unwrap(), 2);
    assert_eq!(ledger.get_leaderboard().unwrap(), standings(&[("<@77>", 2)]));

    let stats = ledger.get_actor_stats("<@77>").unwrap();
    assert_eq!(stats.points, 2);
    assert_eq!(stats.matches_won, vec![1, 2]);
    assert_eq!(stats.entries.len(), 2);
}

/// Unknown actors read as zero, not as errors.
#[test]
fn unknown_actor_reads_as_zero() {
    let ledger = ledger();
    assert_eq!(ledger.get_balance("ghost").unwrap(), 0);
    assert!(ledger.get_history(Some("ghost")).unwrap().is_empty());
    assert!(ledger.get_actor_stats("ghost").unwrap().matches_won.is_empty());
}
