use tracing::instrument;

use super::{mean, round_to, Measured};
use crate::model::Creator;
use crate::store::Telemetry;

/// Average number of landing clicks per active day, two decimals.
pub fn daily_average(days: &[u64]) -> Measured<f64> {
    mean(days.iter().map(|&clicks| clicks as f64))
        .map(|average| round_to(average, 2))
        .into()
}

#[instrument(skip(telemetry), fields(creator_id = %creator.creator_id))]
pub async fn extract<T: Telemetry>(telemetry: &T, creator: &Creator) -> Measured<f64> {
    match telemetry.daily_clicks(&creator.creator_id).await {
        Ok(days) => daily_average(&days),
        Err(error) => {
            tracing::error!(%error, "could not compute the click rate");
            Measured::NoData
        }
    }
}
