use std::cmp::Reverse;

use serde::Serialize;
use tracing::instrument;

use super::{round_to, Measured};
use crate::model::{CategoryCount, Creator};
use crate::platform::ContentCut;
use crate::store::Telemetry;
use crate::time::Lookback;

/// Categories are taken in order of airtime until this much of it is covered.
pub const PARETO_CUT: f64 = 0.8;

pub const REMAINDER_LABEL: &str = "other";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentShare {
    #[serde(rename = "gameName")]
    pub label: String,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentMix {
    /// label of the category with the most samples
    pub dominant: String,
    pub distribution: Vec<ContentShare>,
}

/// The inclusion test looks at the running total *before* a category is added, so the
/// category that crosses the cut is still part of the output.
pub fn distribute(categories: &[CategoryCount], cut: ContentCut) -> Measured<ContentMix> {
    let total: u64 = categories.iter().map(|category| category.samples).sum();
    if total == 0 {
        return Measured::NoData;
    }

    let mut ranked: Vec<&CategoryCount> = categories.iter().collect();
    ranked.sort_by_key(|category| Reverse(category.samples));

    let mut covered = 0.0;
    let mut distribution = Vec::new();
    for category in ranked {
        // shares carry two decimals, so rounding the sum keeps 0.5 + 0.3 equal to the cut
        if round_to(covered, 2) > PARETO_CUT {
            break;
        }

        let percent = round_to(category.samples as f64 / total as f64, 2);
        covered += percent;
        distribution.push(ContentShare {
            label: category.label().to_string(),
            percent,
        });
    }

    let dominant = distribution
        .first()
        .map(|share| share.label.clone())
        .unwrap_or_default();

    if cut == ContentCut::WithRemainder {
        distribution.push(ContentShare {
            label: REMAINDER_LABEL.to_string(),
            percent: round_to(1.0 - covered, 2),
        });
    }

    Measured::Value(ContentMix { dominant, distribution })
}

#[instrument(skip(telemetry), fields(creator_id = %creator.creator_id, platform_id = %creator.platform_id))]
pub async fn extract<T: Telemetry>(
    telemetry: &T,
    creator: &Creator,
    cut: ContentCut,
    lookback: Lookback,
) -> Measured<ContentMix> {
    match telemetry.category_counts(&creator.platform_id, lookback).await {
        Ok(categories) => distribute(&categories, cut),
        Err(error) => {
            tracing::error!(%error, "could not compute the content mix");
            Measured::NoData
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, name: &str, samples: u64) -> CategoryCount {
        CategoryCount::new(id.to_string(), Some(name.to_string()), None, samples)
    }

    fn fixture() -> Vec<CategoryCount> {
        vec![
            category("1", "Minecraft", 10),
            category("2", "Just Chatting", 50),
            category("3", "Valorant", 25),
            category("4", "Tetris", 15),
        ]
    }

    #[test]
    fn cut_includes_the_category_crossing_the_threshold() {
        let mix = distribute(&fixture(), ContentCut::TopOnly).value().unwrap();

        // 0.50, then 0.75, then 0.90 crosses the cut and is still included
        let labels: Vec<&str> = mix.distribution.iter().map(|share| share.label.as_str()).collect();
        assert_eq!(labels, ["Just Chatting", "Valorant", "Tetris"]);
        assert_eq!(mix.dominant, "Just Chatting");
    }

    #[test]
    fn remainder_completes_the_distribution() {
        let mix = distribute(&fixture(), ContentCut::WithRemainder).value().unwrap();

        let last = mix.distribution.last().unwrap();
        assert_eq!(last.label, REMAINDER_LABEL);
        assert_eq!(last.percent, 0.1);

        let sum: f64 = mix.distribution.iter().map(|share| share.percent).sum();
        assert!((sum - 1.0).abs() < 0.011, "shares sum to {sum}");
    }

    #[test]
    fn a_single_dominant_category_stops_the_walk() {
        let categories = vec![category("1", "Tetris", 9), category("2", "Chess", 1)];

        let mix = distribute(&categories, ContentCut::WithRemainder).value().unwrap();

        assert_eq!(mix.distribution.len(), 2);
        assert_eq!(mix.distribution[0].percent, 0.9);
        assert_eq!(mix.distribution[1].label, REMAINDER_LABEL);
        assert_eq!(mix.distribution[1].percent, 0.1);
    }

    #[test]
    fn reaching_the_cut_exactly_still_admits_the_next_category() {
        let categories = vec![
            category("1", "Tetris", 50),
            category("2", "Chess", 30),
            category("3", "Go", 20),
        ];

        let top = distribute(&categories, ContentCut::TopOnly).value().unwrap();
        let labels: Vec<&str> = top.distribution.iter().map(|share| share.label.as_str()).collect();
        assert_eq!(labels, ["Tetris", "Chess", "Go"]);

        let full = distribute(&categories, ContentCut::WithRemainder).value().unwrap();
        let labels: Vec<&str> = full.distribution.iter().map(|share| share.label.as_str()).collect();
        assert_eq!(labels, ["Tetris", "Chess", "Go", REMAINDER_LABEL]);
        assert_eq!(full.distribution[3].percent, 0.0);
    }

    #[test]
    fn nothing_watched_is_no_data() {
        assert!(distribute(&[], ContentCut::WithRemainder).is_no_data());
    }

    #[test]
    fn serializes_with_the_dashboard_field_names() {
        let share = ContentShare {
            label: "Tetris".into(),
            percent: 0.25,
        };

        assert_eq!(
            serde_json::to_string(&share).unwrap(),
            r#"{"gameName":"Tetris","percent":0.25}"#
        );
    }
}
