//! Chart and label feed for the display
//!
//! The display never touches the series directly. On each timer tick the
//! [`PresentationFeed`] decides whether a chart and/or label refresh is due
//! and pulls a snapshot for it:
//!
//! - **Chart**: the last `chart_window` samples, transposed into a
//!   [`ChartWindow`] (one x series, one y series per channel) and handed to a
//!   [`ChartRenderer`]
//! - **Labels**: the latest value per channel, formatted as
//!   `Sensor1: 23.45 °C`
//!
//! Both only hold the series read lock while copying.

use crate::config::PresentationSettings;
use crate::ingest::Session;
use crate::types::{Channel, LatestValues, Sample, CHANNEL_COUNT};
use std::fmt::Write as _;
use std::time::Instant;

/// Placeholder shown before the first reading
pub const NO_READING: &str = "--";

/// Unit suffix for displayed values
pub const UNIT: &str = "°C";

/// A chart-ready window of samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartWindow {
    seconds: Vec<f64>,
    channels: [Vec<f64>; CHANNEL_COUNT],
}

impl ChartWindow {
    /// Transpose samples into per-channel series
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut window = Self {
            seconds: Vec::with_capacity(samples.len()),
            channels: Default::default(),
        };
        for sample in samples {
            window.seconds.push(sample.elapsed_seconds());
            for channel in Channel::ALL {
                window.channels[channel.index()].push(sample.value(channel));
            }
        }
        window
    }

    /// X axis values
    pub fn seconds(&self) -> &[f64] {
        &self.seconds
    }

    /// Y values of one channel
    pub fn series(&self, channel: Channel) -> &[f64] {
        &self.channels[channel.index()]
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.seconds.len()
    }

    /// Check whether the window has no points
    pub fn is_empty(&self) -> bool {
        self.seconds.is_empty()
    }

    /// First and last timestamp
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((*self.seconds.first()?, *self.seconds.last()?))
    }

    /// Minimum and maximum of one channel
    pub fn value_range(&self, channel: Channel) -> Option<(f64, f64)> {
        min_max(self.series(channel))
    }
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

/// Something that can draw a chart window
#[cfg_attr(test, mockall::automock)]
pub trait ChartRenderer {
    /// Draw the window, replacing the previous frame
    fn render(&mut self, window: &ChartWindow);
}

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Console renderer drawing one sparkline per channel
#[derive(Debug, Clone)]
pub struct TextChart {
    width: usize,
    frame: String,
}

impl TextChart {
    /// Create a renderer at most `width` characters wide
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            frame: String::new(),
        }
    }

    /// The most recently rendered frame
    pub fn last_frame(&self) -> &str {
        &self.frame
    }

    fn sparkline(values: &[f64], lo: f64, hi: f64) -> String {
        let span = hi - lo;
        values
            .iter()
            .map(|&v| {
                if span <= f64::EPSILON {
                    SPARK_LEVELS[SPARK_LEVELS.len() / 2]
                } else {
                    let level = ((v - lo) / span * (SPARK_LEVELS.len() - 1) as f64).round();
                    SPARK_LEVELS[(level as usize).min(SPARK_LEVELS.len() - 1)]
                }
            })
            .collect()
    }
}

impl ChartRenderer for TextChart {
    fn render(&mut self, window: &ChartWindow) {
        self.frame.clear();

        let Some((start, end)) = window.time_range() else {
            self.frame.push_str("(no data)");
            return;
        };
        let _ = writeln!(self.frame, "t = {:.2}s .. {:.2}s", start, end);

        let skip = window.len().saturating_sub(self.width);
        for channel in Channel::ALL {
            // Scale to the drawn points only
            let values = &window.series(channel)[skip..];
            let Some((lo, hi)) = min_max(values) else {
                continue;
            };
            let _ = writeln!(
                self.frame,
                "{:<8} {} min {:.2} max {:.2}",
                channel.name(),
                Self::sparkline(values, lo, hi),
                lo,
                hi
            );
        }
    }
}

/// Label text for the latest values, one line per channel
pub fn format_latest(latest: &LatestValues) -> Vec<String> {
    latest
        .iter()
        .map(|(channel, value)| match value {
            Some(v) => format!("{}: {:.2} {}", channel, v, UNIT),
            None => format!("{}: {}", channel, NO_READING),
        })
        .collect()
}

/// Timer-driven chart and label refresh
#[derive(Debug, Clone)]
pub struct PresentationFeed {
    settings: PresentationSettings,
    next_chart: Option<Instant>,
    next_labels: Option<Instant>,
}

impl PresentationFeed {
    /// Create a feed; the first tick refreshes both
    pub fn new(settings: PresentationSettings) -> Self {
        Self {
            settings,
            next_chart: None,
            next_labels: None,
        }
    }

    /// Settings in use
    pub fn settings(&self) -> &PresentationSettings {
        &self.settings
    }

    /// Snapshot the chart window from a session
    pub fn chart_window(&self, session: &Session) -> ChartWindow {
        ChartWindow::from_samples(&session.series().snapshot_tail(self.settings.chart_window))
    }

    /// Run whatever refreshes are due at `now`
    ///
    /// Draws into `renderer` when the chart is due and returns label lines
    /// when the labels are due.
    pub fn on_tick(
        &mut self,
        now: Instant,
        session: &Session,
        renderer: &mut dyn ChartRenderer,
    ) -> Option<Vec<String>> {
        if self.next_chart.map_or(true, |due| now >= due) {
            renderer.render(&self.chart_window(session));
            self.next_chart = Some(now + self.settings.chart_period());
        }

        if self.next_labels.map_or(true, |due| now >= due) {
            self.next_labels = Some(now + self.settings.label_period());
            return Some(format_latest(&session.latest()));
        }
        None
    }
}
