//! Command policy: who may record which win, and when.

use chrono::NaiveDate;
use winledger_core::{
    config::LedgerLimits,
    ledger::LedgerService,
    policy::{AdminList, Caller, CommandPolicy},
    schedule::Schedule,
    store::LedgerStore,
    Outcome, Rejection,
};

const SCHEDULE: &str = r#"{ "matches": [
    { "match_no": 1, "date": "2025-03-22", "day": "Sat", "start": "7:30 PM",
      "home": "Kolkata Knight Riders", "away": "Royal Challengers Bengaluru", "venue": "Kolkata" },
    { "match_no": 2, "date": "2025-03-23", "day": "Sun", "start": "3:30 PM",
      "home": "Sunrisers Hyderabad", "away": "Rajasthan Royals", "venue": "Hyderabad" },
    { "match_no": 3, "date": "2025-03-23", "day": "Sun", "start": "7:30 PM",
      "home": "Chennai Super Kings", "away": "Mumbai Indians", "venue": "Chennai" }
] }"#;

struct Fixture {
    ledger: LedgerService,
    schedule: Schedule,
    admins: AdminList,
}

impl Fixture {
    fn new() -> Self {
        let store = LedgerStore::in_memory().expect("in-memory store");
        store.migrate().expect("migration");
        Self {
            ledger: LedgerService::new(store, LedgerLimits::default()),
            schedule: Schedule::from_json(SCHEDULE).expect("schedule"),
            admins: AdminList::new(["900"]),
        }
    }

    fn policy(&self) -> CommandPolicy<'_, Schedule> {
        CommandPolicy::new(&self.ledger, &self.schedule, &self.admins)
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

fn member(id: &str) -> Caller {
    Caller::new(id, format!("user{id}"))
}

fn admin() -> Caller {
    Caller::new("900", "boss")
}

/// A member can record today's match once.
#[test]
fn member_records_todays_match() {
    let fx = Fixture::new();
    let receipt = fx
        .policy()
        .request_award(&member("1"), "alice", 1, day(22))
        .unwrap()
        .done()
        .expect("accepted");
    assert_eq!(receipt.entry.recorded_by, "user1");
    assert_eq!(receipt.balance, 1);
    assert_eq!(fx.ledger.get_match_result(1).unwrap().unwrap().winner, "alice");
}

/// Past and future matches are refused for members.
#[test]
fn member_cannot_record_other_days() {
    let fx = Fixture::new();
    let outcome = fx.policy().request_award(&member("1"), "alice", 2, day(22)).unwrap();
    assert_eq!(
        outcome,
        Outcome::Rejected(Rejection::NotToday { match_number: 2, scheduled: day(23), today: day(22) })
    );
    let outcome = fx.policy().request_award(&member("1"), "alice", 1, day(23)).unwrap();
    assert!(matches!(outcome.rejection(), Some(Rejection::NotToday { .. })));
    assert!(fx.ledger.snapshot().unwrap().is_empty());
}

/// A match missing from the schedule is refused for members.
#[test]
fn member_cannot_record_unscheduled_match() {
    let fx = Fixture::new();
    let outcome = fx.policy().request_award(&member("1"), "alice", 40, day(22)).unwrap();
    assert_eq!(outcome, Outcome::Rejected(Rejection::UnknownMatch { match_number: 40 }));
}

/// The claim gate is global per match: the second caller is refused even
/// though they never claimed anything.
#[test]
fn first_claim_wins_for_everyone() {
    let fx = Fixture::new();
    assert!(fx.policy().request_award(&member("1"), "alice", 2, day(23)).unwrap().is_done());

    let outcome = fx.policy().request_award(&member("2"), "bob", 2, day(23)).unwrap();
    assert_eq!(
        outcome,
        Outcome::Rejected(Rejection::AlreadyClaimed { match_number: 2, winner: "alice".into() })
    );
    assert_eq!(fx.ledger.get_balance("bob").unwrap(), 0);
}

/// Not a per-user daily quota: one caller may record both halves of a double-header.
#[test]
fn one_caller_may_record_every_match_of_the_day() {
    let fx = Fixture::new();
    let caller = member("1");
    assert!(fx.policy().request_award(&caller, "alice", 2, day(23)).unwrap().is_done());
    assert!(fx.policy().request_award(&caller, "bob", 3, day(23)).unwrap().is_done());
    assert_eq!(fx.ledger.get_match_results().unwrap().len(), 2);
}

/// Admins bypass every check, including the date and the duplicate gate.
#[test]
fn admin_bypasses_the_gate() {
    let fx = Fixture::new();
    assert_eq!(fx.policy().check(&admin(), 40, day(1)).unwrap(), None);

    assert!(fx.policy().request_award(&admin(), "alice", 3, day(22)).unwrap().is_done());
    let receipt = fx
        .policy()
        .request_award(&admin(), "bob", 3, day(22))
        .unwrap()
        .done()
        .unwrap();
    assert_eq!(receipt.replaced_winner.as_deref(), Some("alice"));
    assert_eq!(receipt.entry.recorded_by, "boss");
}

/// Ledger validation still applies behind the gate.
#[test]
fn validation_errors_pass_through_as_errors() {
    let fx = Fixture::new();
    let err = fx.policy().request_award(&admin(), "not valid!", 1, day(22)).unwrap_err();
    assert!(err.is_validation());
    let err = fx.policy().request_award(&admin(), "alice", 99_999, day(22)).unwrap_err();
    assert!(err.is_validation());
}

/// Out-of-range match numbers get the same validation error for members
/// and admins, before any schedule lookup.
#[test]
fn match_range_is_checked_before_the_schedule() {
    let fx = Fixture::new();
    for caller in [member("1"), admin()] {
        let err = fx.policy().request_award(&caller, "alice", 99_999, day(22)).unwrap_err();
        assert_eq!(err.user_message(), "Invalid match number. Must be between 1 and 74.");
        assert!(fx.policy().check(&caller, 0, day(22)).unwrap_err().is_validation());
    }
    assert!(fx.ledger.snapshot().unwrap().is_empty());
}

/// check() never writes.
#[test]
fn check_is_read_only() {
    let fx = Fixture::new();
    assert_eq!(fx.policy().check(&member("1"), 1, day(22)).unwrap(), None);
    assert!(fx.ledger.snapshot().unwrap().is_empty());
}
