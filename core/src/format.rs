//! Chat rendering. Pure functions from ledger data to message text.

use crate::{
    actor,
    ledger::{ActorStats, AwardReceipt, ClearReceipt},
    schedule::{team_acronym, MatchInfo, ScheduleLookup},
    store::{MatchResult, Standing},
};
use std::fmt::Write;

pub const OK: &str = "✅";
pub const FAIL: &str = "❌";

pub fn leaderboard(standings: &[Standing]) -> String {
    if standings.is_empty() {
        return "No points recorded yet!".to_string();
    }
    let mut out = String::from("🏆 Dream11 Leaderboard 🏆\n\n");
    for (rank, s) in standings.iter().enumerate() {
        let _ = writeln!(out, "{}. {}: {} point(s)", rank + 1, actor::display(&s.actor), s.points);
    }
    out
}

/// Leaderboard followed by who won each decided match.
pub fn leaderboard_with_winners<S: ScheduleLookup + ?Sized>(
    standings: &[Standing],
    results: &[MatchResult],
    schedule: &S,
) -> String {
    let mut out = leaderboard(standings);
    if results.is_empty() {
        return out;
    }
    out.push_str("\n📜 Match Winners 📜\n\n");
    for r in results {
        let fixture = schedule
            .lookup(r.match_number)
            .map(|m| format!(" ({})", m.fixture()))
            .unwrap_or_default();
        let _ = writeln!(out, "Match {}{fixture}: {}", r.match_number, actor::display(&r.winner));
    }
    out
}

pub fn admin_log(results: &[MatchResult]) -> String {
    if results.is_empty() {
        return "No match results recorded yet!".to_string();
    }
    let rule = "-".repeat(30);
    let mut out = String::from("Match Results Log:\n\n");
    for r in results {
        let _ = writeln!(out, "Match: {}", r.match_number);
        let _ = writeln!(out, "Winner: {}", r.winner);
        let _ = writeln!(out, "Recorded by: {}", r.recorded_by);
        let _ = writeln!(out, "Timestamp: {}", r.recorded_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "{rule}");
    }
    out
}

pub fn todays_matches(matches: &[MatchInfo]) -> String {
    if matches.is_empty() {
        return "No matches scheduled for today.".to_string();
    }
    let mut out = String::from("🏏 Today's Matches 🏏\n\n");
    let _ = writeln!(out, "{:<12}{:<25}Start Time", "Match #", "Teams");
    let _ = writeln!(out, "{}", "-".repeat(50));
    for m in matches {
        let teams = format!("{} vs {}", team_acronym(&m.home_team), team_acronym(&m.away_team));
        let _ = writeln!(
            out,
            "{:<12}{:<25}{}",
            format!("Match {}", m.match_number),
            teams,
            m.start_time.format("%-I:%M %p")
        );
    }
    out
}

pub fn award(receipt: &AwardReceipt) -> String {
    let who = actor::display(&receipt.entry.actor);
    let mut out = match receipt.entry.match_number {
        Some(m) => format!(
            "{OK} Added {} point(s) to {who} for winning Match {m}",
            receipt.entry.delta
        ),
        None => format!("{OK} Changed {who} by {} point(s)", receipt.entry.delta),
    };
    if let Some(previous) = &receipt.replaced_winner {
        let _ = write!(out, " (replacing {})", actor::display(previous));
    }
    out
}

pub fn cleared(receipt: &ClearReceipt) -> String {
    format!(
        "{OK} All Dream11 points have been cleared successfully. ({} history entr(ies) removed)",
        receipt.entries
    )
}

pub fn stats(stats: &ActorStats) -> String {
    let mut out = format!(
        "📊 {}: {} point(s)\n",
        actor::display(&stats.actor),
        stats.points
    );
    if stats.matches_won.is_empty() {
        out.push_str("No match wins recorded.");
    } else {
        let list: Vec<String> = stats.matches_won.iter().map(u32::to_string).collect();
        let _ = write!(out, "Matches won: {}", list.join(", "));
    }
    out
}

pub fn about() -> String {
    let lines = [
        "📋 Dream11 Bot Commands",
        "",
        "Regular Commands",
        "1. `!win <username> <match_number>` - Add 1 point to a user for winning a match. Mentions or plain usernames.",
        "2. `!d11` - Show Dream11 leaderboard and match winners log",
        "3. `!tdy` - Show today's scheduled matches",
        "4. `!stats <username>` - Show one user's points and wins",
        "5. `!about` - Show this help message",
        "",
        "Admin Commands",
        "1. `!undo` - Undo last point change",
        "2. `!clearpoints` - Clear all points",
        "3. `!adminlog` - Show detailed match results log",
        "4. `!export` - Dump the whole ledger as JSON",
    ];
    lines.join("\n")
}
