use tracing::instrument;

use super::round_to;
use crate::model::Creator;
use crate::store::Telemetry;
use crate::time::Lookback;

/// Samples per unit of airtime when estimating it for the impression ratio.
pub const SAMPLE_CORRECTION: f64 = 3.0;

pub fn airtime_estimate(samples: u64) -> u64 {
    (samples as f64 / SAMPLE_CORRECTION).round() as u64
}

/// Share of airtime covered by logged impressions, two decimals, capped at 1.
pub fn ratio(impressions: u64, airtime_estimate: u64) -> f64 {
    if airtime_estimate == 0 {
        return 0.0;
    }

    round_to(impressions as f64 / airtime_estimate as f64, 2).min(1.0)
}

/// Both counts fall back to zero on failure, so this never fails and a missing table yields a ratio of 0.
#[instrument(skip(telemetry), fields(creator_id = %creator.creator_id, platform_id = %creator.platform_id))]
pub async fn extract<T: Telemetry>(telemetry: &T, creator: &Creator, lookback: Lookback) -> f64 {
    let (samples, impressions) = futures::join!(
        telemetry.sample_count(&creator.platform_id, lookback),
        telemetry.impression_count(&creator.creator_id, lookback),
    );

    let samples = samples.unwrap_or_else(|error| {
        tracing::warn!(%error, "could not count samples for the impression ratio");
        0
    });
    let impressions = impressions.unwrap_or_else(|error| {
        tracing::warn!(%error, "could not count logged impressions");
        0
    });

    ratio(impressions, airtime_estimate(samples))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_is_capped() {
        assert_eq!(ratio(50, 40), 1.0);
        assert_eq!(ratio(40, 40), 1.0);
    }

    #[test]
    fn ratio_without_airtime_is_zero() {
        assert_eq!(ratio(50, 0), 0.0);
        assert_eq!(ratio(0, 0), 0.0);
    }

    #[test]
    fn ratio_keeps_two_decimals() {
        assert_eq!(ratio(1, 3), 0.33);
        assert_eq!(ratio(20, 40), 0.5);
    }

    #[test]
    fn airtime_estimate_rounds() {
        assert_eq!(airtime_estimate(0), 0);
        assert_eq!(airtime_estimate(1), 0);
        assert_eq!(airtime_estimate(2), 1);
        assert_eq!(airtime_estimate(120), 40);
    }
}
