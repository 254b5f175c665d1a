//! Constant-memory reduction of scalar streams.
//!
//! # Invariants
//! - State is one `u128` sum and one `u64` count regardless of input size.
//! - An empty input yields [`Average::NoData`], never a division by zero.

use serde::Serialize;

/// Result of averaging a stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Average {
    Value(f64),
    NoData,
}

impl Average {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(value) => Some(value),
            Self::NoData => None,
        }
    }
}

/// Running sum and count of non-negative integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunningMean {
    sum: u128,
    count: u64,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: u64) {
        self.sum += u128::from(value);
        self.count += 1;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn finish(&self) -> Average {
        if self.count == 0 {
            Average::NoData
        } else {
            Average::Value(self.sum as f64 / self.count as f64)
        }
    }
}

/// Arithmetic mean of `values`, computed after the input is exhausted.
pub fn average<I>(values: I) -> Average
where
    I: IntoIterator,
    I::Item: Into<u64>,
{
    values
        .into_iter()
        .fold(RunningMean::new(), |mut mean, value| {
            mean.push(value.into());
            mean
        })
        .finish()
}

/// Like [`average`] over fallible items; stops at the first error.
pub fn try_average<I, T, E>(values: I) -> Result<Average, E>
where
    I: IntoIterator<Item = Result<T, E>>,
    T: Into<u64>,
{
    let mut mean = RunningMean::new();
    for value in values {
        mean.push(value?.into());
    }
    Ok(mean.finish())
}
