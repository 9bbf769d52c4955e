//! Measuring how long a block of code runs.

use gizmos_core::guards::{ensure_in_bounds, ensure_one_of, Bounds};
use gizmos_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Unit used to report elapsed time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    #[default]
    #[serde(rename = "ns")]
    Nanoseconds,
    #[serde(rename = "us")]
    Microseconds,
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "s")]
    Seconds,
}

impl TimeUnit {
    const NAMES: [&'static str; 4] = ["ns", "us", "ms", "s"];

    pub fn as_str(self) -> &'static str {
        match self {
            TimeUnit::Nanoseconds => "ns",
            TimeUnit::Microseconds => "us",
            TimeUnit::Milliseconds => "ms",
            TimeUnit::Seconds => "s",
        }
    }

    /// `duration` expressed in this unit
    pub fn convert(self, duration: Duration) -> f64 {
        let nanos = duration.as_nanos() as f64;
        match self {
            TimeUnit::Nanoseconds => nanos,
            TimeUnit::Microseconds => nanos / 1e3,
            TimeUnit::Milliseconds => nanos / 1e6,
            TimeUnit::Seconds => nanos / 1e9,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let unit = s.trim().to_ascii_lowercase();
        ensure_one_of("unit", &unit.as_str(), &Self::NAMES)?;
        Ok(match unit.as_str() {
            "ns" => TimeUnit::Nanoseconds,
            "us" => TimeUnit::Microseconds,
            "ms" => TimeUnit::Milliseconds,
            _ => TimeUnit::Seconds,
        })
    }
}

fn round_to(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(i32::try_from(precision).unwrap_or(i32::MAX));
    if scale.is_finite() {
        (value * scale).round() / scale
    } else {
        value
    }
}

/// Pausable stopwatch that reports through `tracing` when stopped
///
/// The report reads `[TIMER]: <label> RAN IN <elapsed> <unit>` unless a
/// template with `{label}`, `{elapsed}` and `{unit}` fields is set.
#[derive(Debug, Clone)]
pub struct Timer {
    label: String,
    unit: TimeUnit,
    precision: u32,
    template: Option<String>,
    last_unpaused: Instant,
    accumulated: Duration,
    paused: bool,
}

impl Timer {
    /// Start timing now
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            unit: TimeUnit::default(),
            precision: 3,
            template: None,
            last_unpaused: Instant::now(),
            accumulated: Duration::ZERO,
            paused: false,
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: TimeUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Decimal places kept in the report
    #[must_use]
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.accumulated += self.last_unpaused.elapsed();
            self.paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.last_unpaused = Instant::now();
            self.paused = false;
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Time spent running so far, excluding pauses
    pub fn elapsed(&self) -> Duration {
        if self.paused {
            self.accumulated
        } else {
            self.accumulated + self.last_unpaused.elapsed()
        }
    }

    /// Elapsed time in `unit`, rounded to `precision` decimal places
    pub fn elapsed_in(&self, unit: TimeUnit, precision: u32) -> f64 {
        round_to(unit.convert(self.elapsed()), precision)
    }

    /// Report line for the current elapsed time
    pub fn message(&self) -> String {
        let elapsed = self.elapsed_in(self.unit, self.precision);
        match &self.template {
            Some(template) => template
                .replace("{label}", &self.label)
                .replace("{elapsed}", &elapsed.to_string())
                .replace("{unit}", self.unit.as_str()),
            None => format!("[TIMER]: {} RAN IN {elapsed} {}", self.label, self.unit),
        }
    }

    /// Stop the timer, log the report and return the elapsed time
    pub fn stop(mut self) -> Duration {
        self.pause();
        tracing::info!(label = %self.label, elapsed = ?self.accumulated, "{}", self.message());
        self.accumulated
    }
}

/// Time `func`, log the report and return its value with the elapsed time
pub fn timed<R>(label: &str, unit: TimeUnit, func: impl FnOnce() -> R) -> (R, Duration) {
    let timer = Timer::start(label).with_unit(unit);
    let value = func();
    (value, timer.stop())
}

/// Timing summary of repeated runs, in the report's unit
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReport {
    pub label: String,
    pub trials: u32,
    pub unit: TimeUnit,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl BenchmarkReport {
    pub fn message(&self) -> String {
        format!(
            "[BENCHMARK]: RAN {} TRIALS ON {}; AVG: {} {unit}, MIN: {} {unit}, MAX: {} {unit}",
            self.trials,
            self.label,
            self.avg,
            self.min,
            self.max,
            unit = self.unit
        )
    }
}

/// Run `func` `trials` times, log the report and return the last value
///
/// Each trial is rounded to `precision` decimal places in `unit` before the
/// average, minimum and maximum are taken.
pub fn benchmark<R>(
    label: &str,
    trials: u32,
    unit: TimeUnit,
    precision: u32,
    mut func: impl FnMut() -> R,
) -> Result<(R, BenchmarkReport)> {
    ensure_in_bounds("trials", trials, Some(1), None, Bounds::Inclusive)?;

    let mut samples = Vec::with_capacity(trials as usize);
    let mut last = None;
    for _ in 0..trials {
        let start = Instant::now();
        let value = func();
        samples.push(round_to(unit.convert(start.elapsed()), precision));
        last = Some(value);
    }
    let last = last.ok_or_else(|| Error::invalid_argument("trials", "0 must be >= 1"))?;

    let report = BenchmarkReport {
        label: label.to_string(),
        trials,
        unit,
        avg: round_to(samples.iter().sum::<f64>() / f64::from(trials), precision),
        min: samples.iter().copied().fold(f64::INFINITY, f64::min),
        max: samples.iter().copied().fold(0.0, f64::max),
    };
    tracing::info!(label = %label, trials, "{}", report.message());
    Ok((last, report))
}
