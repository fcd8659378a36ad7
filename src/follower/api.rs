use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use snafu::{ensure, ResultExt as _};

use super::*;
use crate::config::TwitchCredentials;
use crate::platform::FollowerApi;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// The station endpoint rejects requests that don't look like they come from a browser.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ChannelFollowers {
    total: i64,
}

#[derive(Debug, Deserialize)]
struct StationPage {
    station: StationInfo,
}

#[derive(Debug, Deserialize)]
struct StationInfo {
    upd: StationUpdate,
}

#[derive(Debug, Deserialize)]
struct StationUpdate {
    fan_cnt: i64,
}

async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder, url: &str) -> Result<T, FollowerApiError> {
    let response = request.send().await.context(RequestSnafu { url })?;

    let status: StatusCode = response.status();
    ensure!(status.is_success(), StatusSnafu { url, status });

    response.json().await.context(BodySnafu { url })
}

/// Twitch Helix. Follower counts need an app access token from a client-credentials exchange.
#[derive(Debug, Clone)]
pub struct Helix {
    http: reqwest::Client,
    id_url: String,
    api_url: String,
    credentials: TwitchCredentials,
}

impl Helix {
    pub async fn token(&self) -> Result<String, FollowerApiError> {
        let (Some(client_id), Some(client_secret)) = (&self.credentials.client_id, &self.credentials.client_secret)
        else {
            return MissingCredentialsSnafu.fail();
        };

        let url = format!("{}/oauth2/token", self.id_url);
        let request = self.http.post(&url).query(&[
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("grant_type", "client_credentials"),
        ]);

        let response: TokenResponse = fetch_json(request, &url).await?;
        ensure!(!response.access_token.is_empty(), EmptyTokenSnafu);

        Ok(response.access_token)
    }

    pub async fn followers(&self, token: &str, broadcaster_id: &str) -> Result<i64, FollowerApiError> {
        let url = format!("{}/channels/followers", self.api_url);
        let request = self
            .http
            .get(&url)
            .query(&[("broadcaster_id", broadcaster_id)])
            .header("Client-Id", self.credentials.client_id.as_deref().unwrap_or_default())
            .bearer_auth(token);

        let page: ChannelFollowers = fetch_json(request, &url).await?;
        Ok(page.total)
    }
}

/// Afreeca station pages. Public, one GET per creator.
#[derive(Debug, Clone)]
pub struct Station {
    http: reqwest::Client,
    api_url: String,
}

impl Station {
    pub async fn followers(&self, station_id: &str) -> Result<i64, FollowerApiError> {
        let url = format!("{}/api/{station_id}/station", self.api_url);
        let request = self.http.get(&url).header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT);

        let page: StationPage = fetch_json(request, &url).await?;
        Ok(page.station.upd.fan_cnt)
    }
}

/// The follower API of the configured platform.
#[derive(Debug, Clone)]
pub enum FollowerClient {
    Helix(Helix),
    Station(Station),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Bearer(String),
    Anonymous,
}

impl FollowerClient {
    pub fn new(api: &FollowerApi, credentials: &TwitchCredentials) -> Result<Self, FollowerApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context(BuildClientSnafu)?;

        let client = match api {
            FollowerApi::Helix { id_url, api_url } => FollowerClient::Helix(Helix {
                http,
                id_url: id_url.clone(),
                api_url: api_url.clone(),
                credentials: credentials.clone(),
            }),
            FollowerApi::Station { api_url } => FollowerClient::Station(Station {
                http,
                api_url: api_url.clone(),
            }),
        };

        Ok(client)
    }
}

impl FollowerSource for FollowerClient {
    type Session = Session;

    async fn authenticate(&self) -> Result<Session, FollowerApiError> {
        match self {
            FollowerClient::Helix(helix) => helix.token().await.map(Session::Bearer),
            FollowerClient::Station(_) => Ok(Session::Anonymous),
        }
    }

    async fn followers(&self, session: &Session, platform_id: &str) -> Result<i64, FollowerApiError> {
        match (self, session) {
            (FollowerClient::Helix(helix), Session::Bearer(token)) => helix.followers(token, platform_id).await,
            (FollowerClient::Helix(_), Session::Anonymous) => UnauthenticatedSnafu.fail(),
            (FollowerClient::Station(station), _) => station.followers(platform_id).await,
        }
    }
}
