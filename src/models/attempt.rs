// src/models/attempt.rs

use serde::{Deserialize, Serialize};

use crate::utils::score::percentage;

/// Column headers of the score sheet, in write order.
pub const SCORE_COLUMNS: [&str; 4] = ["Name", "Score", "Total", "Percentage"];

/// One persisted row: a player's cumulative score at a point in time.
/// Append-only; never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Score")]
    pub score: u32,
    #[serde(rename = "Total")]
    pub total: u32,
    /// `score / total * 100`, rounded to 2 decimals.
    #[serde(rename = "Percentage")]
    pub percentage: f64,
}

impl AttemptRecord {
    pub fn new(name: impl Into<String>, score: u32, total: u32) -> Self {
        AttemptRecord {
            name: name.into(),
            score,
            total,
            percentage: percentage(score, total),
        }
    }
}

/// Derived leaderboard: never stored.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LeaderboardView {
    pub top5: Vec<AttemptRecord>,
    /// 1-based position of the player's first row in the full ranking.
    pub player_rank: Option<usize>,
}

/// Query string for the standalone leaderboard endpoint.
#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub player: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_derives_percentage() {
        let record = AttemptRecord::new("Ada", 1, 3);
        assert_eq!(record.percentage, 33.33);
    }

    #[test]
    fn serializes_with_sheet_headers() {
        let json = serde_json::to_value(AttemptRecord::new("Ada", 2, 4)).unwrap();
        assert_eq!(json["Name"], "Ada");
        assert_eq!(json["Score"], 2);
        assert_eq!(json["Total"], 4);
        assert_eq!(json["Percentage"], 50.0);
    }
}
