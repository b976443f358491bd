//! Market sentiment as consumed by the scoring pipeline.
//!
//! Scores live in [-1, 1]. Sentiment inference itself happens elsewhere;
//! this module only aggregates per-source scores, classifies them and
//! detects the direction of a score history.

use serde::Serialize;
use std::fmt;

const CLASSIFICATION_BAND: f64 = 0.2;
const TREND_SLOPE_THRESHOLD: f64 = 0.05;
const TREND_HALF_DIFF_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Positive,
    Neutral,
    Negative,
}

impl Classification {
    /// `> 0.2` positive, `< -0.2` negative, otherwise neutral.
    pub fn from_score(score: f64) -> Self {
        if score > CLASSIFICATION_BAND {
            Classification::Positive
        } else if score < -CLASSIFICATION_BAND {
            Classification::Negative
        } else {
            Classification::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentTrend {
    Rising,
    Falling,
    Stable,
}

impl SentimentTrend {
    /// Direction of a chronologically ordered score history.
    ///
    /// Rising needs a regression slope above 0.05 and the second half of the
    /// history averaging more than 0.1 above the first; falling mirrors it.
    pub fn detect(history: &[f64]) -> Self {
        if history.len() < 2 {
            return SentimentTrend::Stable;
        }

        let mid = history.len() / 2;
        let mean = |values: &[f64]| values.iter().sum::<f64>() / values.len() as f64;
        let half_diff = mean(&history[mid..]) - mean(&history[..mid]);
        let slope = crate::domain::patterns::linear_slope(history);

        if slope > TREND_SLOPE_THRESHOLD && half_diff > TREND_HALF_DIFF_THRESHOLD {
            SentimentTrend::Rising
        } else if slope < -TREND_SLOPE_THRESHOLD && half_diff < -TREND_HALF_DIFF_THRESHOLD {
            SentimentTrend::Falling
        } else {
            SentimentTrend::Stable
        }
    }
}

impl fmt::Display for SentimentTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SentimentTrend::Rising => "rising",
            SentimentTrend::Falling => "falling",
            SentimentTrend::Stable => "stable",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSource {
    pub name: String,
    pub score: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentScore {
    pub overall_score: f64,
    pub classification: Classification,
    pub trend: SentimentTrend,
    pub sources: Vec<SentimentSource>,
}

impl SentimentScore {
    pub fn new(overall_score: f64, trend: SentimentTrend) -> Self {
        let overall_score = overall_score.clamp(-1.0, 1.0);
        SentimentScore {
            overall_score,
            classification: Classification::from_score(overall_score),
            trend,
            sources: Vec::new(),
        }
    }

    /// Score 0, stable, no sources. Used wherever no sentiment is available.
    pub fn neutral() -> Self {
        SentimentScore::new(0.0, SentimentTrend::Stable)
    }

    /// Weighted average of the source scores. Sources with a non-positive
    /// weight are kept for reference but do not contribute.
    pub fn from_sources(sources: Vec<SentimentSource>, trend: SentimentTrend) -> Self {
        let (weighted, total_weight) = sources
            .iter()
            .filter(|s| s.weight > 0.0)
            .fold((0.0, 0.0), |(sum, weight), s| {
                (sum + s.score * s.weight, weight + s.weight)
            });
        let overall = if total_weight > 0.0 {
            weighted / total_weight
        } else {
            0.0
        };
        SentimentScore {
            sources,
            ..SentimentScore::new(overall, trend)
        }
    }
}

impl Default for SentimentScore {
    fn default() -> Self {
        SentimentScore::neutral()
    }
}
