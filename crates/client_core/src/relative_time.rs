//! Terse relative-time labels ("just now", "5 minutes ago").
//!
//! Labels come from a fixed rule table keyed on the elapsed duration, so the
//! "just now" collapse and the absence of "about"/"almost" qualifiers hold in
//! every locale.

use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelLocale {
    #[default]
    English,
    TraditionalChinese,
}

impl LabelLocale {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "en" | "en-us" | "en-gb" | "english" => Some(Self::English),
            "zh-tw" | "zh-hant" | "traditional-chinese" => Some(Self::TraditionalChinese),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    JustNow,
    Ago(u64, Unit),
}

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// Nearest whole `unit`, kept within `1..=cap` so rounding never reaches the
/// next bucket's value.
fn rounded(seconds: i64, unit: i64, cap: u64) -> u64 {
    let value = (seconds + unit / 2) / unit;
    (value.max(1) as u64).min(cap)
}

fn bucket(elapsed: Duration) -> Bucket {
    let secs = elapsed.num_seconds();
    match secs {
        s if s < MINUTE => Bucket::JustNow,
        s if s < 45 * MINUTE => Bucket::Ago(rounded(s, MINUTE, 44), Unit::Minute),
        s if s < 90 * MINUTE => Bucket::Ago(1, Unit::Hour),
        s if s < DAY => Bucket::Ago(rounded(s, HOUR, 23), Unit::Hour),
        s if s < 42 * HOUR => Bucket::Ago(1, Unit::Day),
        s if s < MONTH => Bucket::Ago(rounded(s, DAY, 29), Unit::Day),
        s if s < 45 * DAY => Bucket::Ago(1, Unit::Month),
        s if s < 60 * DAY => Bucket::Ago(2, Unit::Month),
        s if s < YEAR => Bucket::Ago(rounded(s, MONTH, 12), Unit::Month),
        s => Bucket::Ago((s / YEAR).max(1) as u64, Unit::Year),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelativeTimeLabels {
    locale: LabelLocale,
}

impl RelativeTimeLabels {
    pub fn new(locale: LabelLocale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> LabelLocale {
        self.locale
    }

    /// Negative durations (a peer clock running ahead) read as "just now".
    pub fn format(&self, elapsed: Duration) -> String {
        match (self.locale, bucket(elapsed)) {
            (LabelLocale::English, Bucket::JustNow) => "just now".to_string(),
            (LabelLocale::English, Bucket::Ago(n, unit)) => {
                let word = match unit {
                    Unit::Minute => "minute",
                    Unit::Hour => "hour",
                    Unit::Day => "day",
                    Unit::Month => "month",
                    Unit::Year => "year",
                };
                let plural = if n == 1 { "" } else { "s" };
                format!("{n} {word}{plural} ago")
            }
            (LabelLocale::TraditionalChinese, Bucket::JustNow) => "剛剛".to_string(),
            (LabelLocale::TraditionalChinese, Bucket::Ago(n, unit)) => {
                let word = match unit {
                    Unit::Minute => "分鐘",
                    Unit::Hour => "小時",
                    Unit::Day => "天",
                    Unit::Month => "個月",
                    Unit::Year => "年",
                };
                format!("{n} {word}前")
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/relative_time_tests.rs"]
mod tests;
