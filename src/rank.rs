//! Rank calculation from accumulated counters

use serde::Serialize;

/// Counters handed to a [`RankCalculator`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankInput {
    /// Whether `commits` counts all commits rather than the contribution window
    pub all_commits: bool,
    pub commits: u64,
    pub prs: u64,
    pub reviews: u64,
    pub issues: u64,
    pub repos: u64,
    pub stars: u64,
    pub followers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rank {
    pub level: String,
    pub percentile: f64,
}

pub trait RankCalculator: Send + Sync {
    fn calculate(&self, input: &RankInput) -> Rank;
}

impl<F> RankCalculator for F
where
    F: Fn(&RankInput) -> Rank + Send + Sync,
{
    fn calculate(&self, input: &RankInput) -> Rank {
        self(input)
    }
}

const THRESHOLDS: [f64; 9] = [1.0, 12.5, 25.0, 37.5, 50.0, 62.5, 75.0, 87.5, 100.0];
const LEVELS: [&str; 9] = ["S", "A+", "A", "A-", "B+", "B", "B-", "C+", "C"];

/// Weighted mix of per-counter CDFs; a lower percentile is a better rank.
#[derive(Debug, Clone, Copy, Default)]
pub struct PercentileRank;

fn exponential_cdf(x: f64) -> f64 {
    1.0 - 2f64.powf(-x)
}

fn log_normal_cdf(x: f64) -> f64 {
    // approximation
    x / (1.0 + x)
}

impl RankCalculator for PercentileRank {
    fn calculate(&self, input: &RankInput) -> Rank {
        let commits_median = if input.all_commits { 1000.0 } else { 250.0 };

        // (weight, cdf value)
        let parts = [
            (2.0, exponential_cdf(input.commits as f64 / commits_median)),
            (3.0, exponential_cdf(input.prs as f64 / 50.0)),
            (1.0, exponential_cdf(input.issues as f64 / 25.0)),
            (1.0, exponential_cdf(input.reviews as f64 / 2.0)),
            (4.0, log_normal_cdf(input.stars as f64 / 50.0)),
            (1.0, log_normal_cdf(input.followers as f64 / 10.0)),
        ];

        let total_weight: f64 = parts.iter().map(|(w, _)| w).sum();
        let weighted: f64 = parts.iter().map(|(w, v)| w * v).sum();
        let percentile = (1.0 - weighted / total_weight) * 100.0;

        let level = THRESHOLDS
            .iter()
            .position(|t| percentile <= *t)
            .map(|i| LEVELS[i])
            .unwrap_or("C");

        Rank {
            level: level.to_string(),
            percentile,
        }
    }
}
