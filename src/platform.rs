use std::time::Duration;

use serde::Deserialize;

/// Which streaming platform a run targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    #[default]
    Twitch,
    Afreeca,
}

/// How the content-mix extractor finishes its distribution after the cumulative cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCut {
    /// Append a synthetic remainder category holding `1 - sum(included shares)`.
    WithRemainder,
    /// Publish only the categories that made the cut.
    TopOnly,
}

/// Where the follower count of a creator comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowerApi {
    /// Twitch Helix: a client-credentials token is exchanged once per run, then every
    /// channel is queried with it.
    Helix { id_url: String, api_url: String },
    /// Afreeca station page: an anonymous GET per creator.
    Station { api_url: String },
}

/// Table and column names of one platform's telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    pub sessions: &'static str,
    pub samples: &'static str,
    pub categories: &'static str,
    pub snapshots: &'static str,
    /// Column of the creator table holding the platform-side id.
    pub platform_id: &'static str,
}

/// Everything that differs between the two platforms, gathered so one pipeline serves both.
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub kind: PlatformKind,
    pub name: &'static str,
    /// How many telemetry samples a session produces per hour of broadcast.
    pub samples_per_hour: u32,
    pub content_cut: ContentCut,
    pub chunk_size: usize,
    pub metrics_cooldown: Duration,
    pub follower_cooldown: Duration,
    pub tables: Tables,
    pub follower_api: FollowerApi,
}

pub const DEFAULT_CHUNK_SIZE: usize = 30;

impl Platform {
    pub fn twitch() -> Self {
        Self {
            kind: PlatformKind::Twitch,
            name: "twitch",
            // three samples every ten minutes
            samples_per_hour: 18,
            content_cut: ContentCut::WithRemainder,
            chunk_size: DEFAULT_CHUNK_SIZE,
            metrics_cooldown: Duration::from_secs(10),
            follower_cooldown: Duration::from_secs(60),
            tables: Tables {
                sessions: "twitch_stream",
                samples: "twitch_stream_detail",
                categories: "twitch_game",
                snapshots: "creator_detail",
                platform_id: "twitch_id",
            },
            follower_api: FollowerApi::Helix {
                id_url: "https://id.twitch.tv".to_string(),
                api_url: "https://api.twitch.tv/helix".to_string(),
            },
        }
    }

    pub fn afreeca() -> Self {
        Self {
            kind: PlatformKind::Afreeca,
            name: "afreeca",
            // one sample every three minutes
            samples_per_hour: 20,
            content_cut: ContentCut::TopOnly,
            chunk_size: DEFAULT_CHUNK_SIZE,
            metrics_cooldown: Duration::from_secs(10),
            follower_cooldown: Duration::from_secs(60),
            tables: Tables {
                sessions: "afreeca_broad",
                samples: "afreeca_broad_detail",
                categories: "afreeca_category",
                snapshots: "creator_detail_afreeca",
                platform_id: "afreeca_id",
            },
            follower_api: FollowerApi::Station {
                api_url: "https://bjapi.afreecatv.com".to_string(),
            },
        }
    }

    pub fn for_kind(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::Twitch => Self::twitch(),
            PlatformKind::Afreeca => Self::afreeca(),
        }
    }
}
