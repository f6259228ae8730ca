// src/services/ranking.rs

use std::cmp::Ordering;

use crate::models::attempt::{AttemptRecord, LeaderboardView};

/// Rows shown on the leaderboard.
pub const TOP_N: usize = 5;

/// Score descending, then percentage descending.
fn by_rank(a: &AttemptRecord, b: &AttemptRecord) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.percentage.total_cmp(&a.percentage))
}

/// Ranks every recorded attempt.
///
/// The sort is stable: rows that tie on both keys keep the order the store
/// returned them in. `player_rank` is the 1-based position of the first row
/// carrying `player_name` in the full ranking.
pub fn rank(records: &[AttemptRecord], player_name: &str) -> LeaderboardView {
    let mut sorted = records.to_vec();
    sorted.sort_by(by_rank);

    let player_rank = sorted
        .iter()
        .position(|r| r.name == player_name)
        .map(|i| i + 1);

    sorted.truncate(TOP_N);

    LeaderboardView {
        top5: sorted,
        player_rank,
    }
}
