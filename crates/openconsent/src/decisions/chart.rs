//! Bar geometry for the feedback chart on the decision detail view.
//!
//! Heights are scaled against the busiest category so the tallest bar fills the chart.
//! Every bar keeps a minimum height, so empty categories still draw a sliver.

use serde::Serialize;

use super::feedback::{FeedbackKind, FeedbackStats};

pub const MIN_BAR_HEIGHT: u32 = 2;
pub const DEFAULT_MAX_HEIGHT: u32 = 36;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bar {
    pub height: u32,
    /// Empty space drawn above the bar, `max_height - height`. Negative when the bar
    /// overflows the chart, which only the `all` bar can do.
    pub left: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SvgBars {
    pub max_height: u32,
    pub all: Bar,
    pub question: Bar,
    pub danger: Bar,
    pub concern: Bar,
    pub consensus: Bar,
}

impl SvgBars {
    pub fn bar(&self, kind: FeedbackKind) -> Bar {
        match kind {
            FeedbackKind::Question => self.question,
            FeedbackKind::Danger => self.danger,
            FeedbackKind::Concern => self.concern,
            FeedbackKind::Consensus => self.consensus,
        }
    }
}

pub fn calculate_svg_bars(stats: &FeedbackStats, max_height: u32) -> SvgBars {
    // No feedback at all would divide by zero.
    let max_count = stats.max_category().max(1);
    let ratio = f64::from(max_height) / max_count as f64;

    let bar = |count: usize| {
        let scaled = (count as f64 * ratio).round() as u32;
        let height = scaled.max(MIN_BAR_HEIGHT);
        Bar {
            height,
            left: i64::from(max_height) - i64::from(height),
        }
    };

    SvgBars {
        max_height,
        all: bar(stats.all),
        question: bar(stats.question),
        danger: bar(stats.danger),
        concern: bar(stats.concern),
        consensus: bar(stats.consensus),
    }
}
