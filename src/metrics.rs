//! Per-creator metric extractors and the engine that turns them into a snapshot.

pub mod clicks;
pub mod content;
pub mod engine;
pub mod impression;
pub mod schedule;
pub mod viewing;

pub use engine::{decide, process, Action, Outcome};

/// The result of an extractor: either a value, or nothing usable for this creator.
///
/// A legitimate zero is a [Measured::Value]; a failed or empty query is [Measured::NoData].
#[derive(Debug, Clone, PartialEq)]
pub enum Measured<T> {
    NoData,
    Value(T),
}

impl<T> Measured<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Measured::NoData => None,
            Measured::Value(value) => Some(value),
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Measured::NoData)
    }

    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        self.value().unwrap_or_default()
    }
}

impl<T> From<Option<T>> for Measured<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Measured::NoData, Measured::Value)
    }
}

/// Round half away from zero to `digits` decimal places.
pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}

pub(crate) fn mean(values: impl ExactSizeIterator<Item = f64>) -> Option<f64> {
    let len = values.len();
    if len == 0 {
        return None;
    }

    Some(values.sum::<f64>() / len as f64)
}
