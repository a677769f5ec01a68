//! Test data builders

use thermolog::link::ReadOutcome;
use thermolog::Sample;

/// Builder for wire lines
pub struct LineBuilder {
    values: Vec<String>,
}

impl LineBuilder {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn value(mut self, v: f64) -> Self {
        self.values.push(v.to_string());
        self
    }

    pub fn raw(mut self, field: &str) -> Self {
        self.values.push(field.to_string());
        self
    }

    pub fn build(self) -> String {
        self.values.join(",")
    }
}

/// Wire line for a full reading
pub fn line(values: [f64; 4]) -> String {
    values
        .iter()
        .fold(LineBuilder::new(), |b, &v| b.value(v))
        .build()
}

/// Scripted read outcomes for raw lines
pub fn outcomes(lines: &[&str]) -> Vec<ReadOutcome> {
    lines
        .iter()
        .map(|l| ReadOutcome::Line(l.to_string()))
        .collect()
}

/// `n` readings with ramping values
pub fn ramp(n: usize) -> Vec<ReadOutcome> {
    (0..n)
        .map(|i| {
            let base = 20.0 + i as f64 * 0.25;
            ReadOutcome::Line(line([base, base + 1.0, base + 2.0, base + 3.0]))
        })
        .collect()
}

/// Sample at `t` with every channel set to `t`
pub fn flat_sample(t: f64) -> Sample {
    Sample::new(t, [t; 4])
}

