//! HTTP client for the game service
//!
//! One client is built at startup and shared read-only by both schedulers.
//! The authorization header is baked into the client's default headers, so no
//! request ever touches mutable state.

use crate::api::{Endpoint, GameApi};
use crate::auth;
use async_trait::async_trait;
use kombat_core::config::ApiConfig;
use kombat_core::{
    BattleResult, ClaimOutcome, EnergyStatus, HuntingRewardReceipt, HuntingSession, KombatError,
    Opponent, PlayerProfile, Result,
};
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, ORIGIN, REFERER, USER_AGENT,
};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Status the service uses for "already claimed in this window"
const ALREADY_CLAIMED_STATUS: StatusCode = StatusCode::BAD_REQUEST;

/// Every response wraps its payload in `data`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default = "Option::default")]
    data: Option<T>,
}

/// Raw response from the service
struct RawResponse {
    status: StatusCode,
    body: String,
}

/// reqwest-backed [`GameApi`]
#[derive(Debug, Clone)]
pub struct HttpGameClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGameClient {
    /// Build a client authenticated with the given query token
    pub fn new(config: &ApiConfig, query: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            AUTHORIZATION,
            header_value("authorization", &auth::auth_header(query))?,
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            header_value("accept-language", &config.accept_language)?,
        );
        headers.insert(ORIGIN, header_value("origin", &config.origin)?);
        headers.insert(REFERER, header_value("referer", &config.referer)?);
        headers.insert(USER_AGENT, header_value("user-agent", &config.user_agent)?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| KombatError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint, location: Option<&str>) -> String {
        match location {
            Some(location) => format!("{}{}/{}", self.base_url, endpoint.path(), location),
            None => format!("{}{}", self.base_url, endpoint.path()),
        }
    }

    #[instrument(skip_all, fields(endpoint = %endpoint))]
    async fn send(
        &self,
        method: Method,
        endpoint: Endpoint,
        location: Option<&str>,
    ) -> Result<RawResponse> {
        let url = self.url(endpoint, location);
        debug!("{} {}", method, url);

        let response = self
            .http
            .request(method, &url)
            .send()
            .await
            .map_err(|e| KombatError::Http(format!("{} request failed: {}", endpoint, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| KombatError::Http(format!("{} body read failed: {}", endpoint, e)))?;

        debug!(status = status.as_u16(), bytes = body.len(), "response received");
        Ok(RawResponse { status, body })
    }

    /// Send a request and decode `data`, failing on any non-2xx status
    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: Endpoint,
        location: Option<&str>,
    ) -> Result<Option<T>> {
        let raw = self.send(method, endpoint, location).await?;
        if !raw.status.is_success() {
            return Err(status_error(endpoint, &raw));
        }
        decode_data(endpoint, &raw.body)
    }

    async fn fetch_required<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: Endpoint,
        location: Option<&str>,
    ) -> Result<T> {
        self.fetch(method, endpoint, location)
            .await?
            .ok_or_else(|| KombatError::Decode {
                endpoint: endpoint.to_string(),
                message: "response has no data".to_string(),
            })
    }

    async fn claim(&self, endpoint: Endpoint) -> Result<ClaimOutcome> {
        let raw = self.send(Method::POST, endpoint, None).await?;

        if raw.status.is_success() {
            let payload = serde_json::from_str(&raw.body).unwrap_or(serde_json::Value::Null);
            return Ok(ClaimOutcome::Claimed(payload));
        }
        if raw.status == ALREADY_CLAIMED_STATUS {
            return Ok(ClaimOutcome::AlreadyClaimed);
        }
        Err(status_error(endpoint, &raw))
    }
}

#[async_trait]
impl GameApi for HttpGameClient {
    async fn profile(&self) -> Result<PlayerProfile> {
        self.fetch_required(Method::GET, Endpoint::Profile, None).await
    }

    async fn claim_daily(&self) -> Result<ClaimOutcome> {
        self.claim(Endpoint::ClaimDaily).await
    }

    async fn claim_rewards(&self) -> Result<ClaimOutcome> {
        self.claim(Endpoint::ClaimRewards).await
    }

    async fn find_opponent(&self) -> Result<Option<Opponent>> {
        self.fetch(Method::GET, Endpoint::FindOpponent, None).await
    }

    async fn fight(&self) -> Result<BattleResult> {
        self.fetch_required(Method::POST, Endpoint::Fight, None).await
    }

    async fn energy(&self) -> Result<EnergyStatus> {
        self.fetch_required(Method::GET, Endpoint::Energy, None).await
    }

    async fn hunting_status(&self) -> Result<Option<HuntingSession>> {
        let raw = self.send(Method::GET, Endpoint::HuntingStatus, None).await?;
        if raw.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !raw.status.is_success() {
            return Err(status_error(Endpoint::HuntingStatus, &raw));
        }
        decode_data(Endpoint::HuntingStatus, &raw.body)
    }

    async fn start_hunting(&self, location: &str) -> Result<Option<HuntingSession>> {
        let raw = self
            .send(Method::POST, Endpoint::StartHunting, Some(location))
            .await?;
        if !raw.status.is_success() {
            return Err(status_error(Endpoint::StartHunting, &raw));
        }

        // The start payload is only useful if it echoes the new session's end time
        let session = serde_json::from_str::<Envelope<HuntingSession>>(&raw.body)
            .ok()
            .and_then(|envelope| envelope.data)
            .filter(|session| session.end_time.is_some());
        Ok(session)
    }

    async fn claim_hunting(&self, location: &str) -> Result<HuntingRewardReceipt> {
        self.fetch_required(Method::POST, Endpoint::ClaimHunting, Some(location))
            .await
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        if name == "authorization" {
            KombatError::Auth("query token contains characters not allowed in a header".into())
        } else {
            KombatError::Config(format!("invalid value for header {}", name))
        }
    })
}

fn decode_data<T: DeserializeOwned>(endpoint: Endpoint, body: &str) -> Result<Option<T>> {
    let envelope: Envelope<T> =
        serde_json::from_str(body).map_err(|e| KombatError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
    Ok(envelope.data)
}

fn status_error(endpoint: Endpoint, raw: &RawResponse) -> KombatError {
    let body: String = raw.body.trim().chars().take(200).collect();
    KombatError::Status {
        endpoint: endpoint.to_string(),
        status: raw.status.as_u16(),
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kombat_core::{FightOutcome, HuntingStatus};
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpGameClient {
        let config = ApiConfig {
            base_url: format!("{}/api/v1/", server.uri()),
            ..ApiConfig::default()
        };
        HttpGameClient::new(&config, "user=42&hash=abc").unwrap()
    }

    #[tokio::test]
    async fn test_profile_sends_auth_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/combats/me"))
            .and(header("authorization", "tma user=42&hash=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"username": "rook", "rank": "Gold", "attack_level": 5, "pet": null}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client_for(&server).profile().await.unwrap();
        assert_eq!(profile.username, "rook");
        assert_eq!(profile.attack_level, 5);
    }

    #[tokio::test]
    async fn test_profile_failure_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/combats/me"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let err = client_for(&server).profile().await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_claim_outcomes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/daily"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"tok": 10}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/users/claim"))
            .respond_with(ResponseTemplate::new(400).set_body_string("already claimed"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.claim_daily().await.unwrap(),
            ClaimOutcome::Claimed(_)
        ));
        assert_eq!(
            client.claim_rewards().await.unwrap(),
            ClaimOutcome::AlreadyClaimed
        );
    }

    #[tokio::test]
    async fn test_claim_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/daily"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).claim_daily().await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_energy_and_fight() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/combats/energy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"current_energy": 0, "next_refill": "2030-01-01T00:00:00Z"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/combats/fight"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"winner": "attacker", "win_streak": {"no": 2, "streak_amount": 100}}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let energy = client.energy().await.unwrap();
        assert_eq!(energy.current_energy, 0);
        assert!(energy.next_refill.is_some());

        let result = client.fight().await.unwrap();
        assert_eq!(result.outcome(), FightOutcome::Win);
    }

    #[tokio::test]
    async fn test_find_opponent_null_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/combats/find"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
            .mount(&server)
            .await;

        assert!(client_for(&server).find_opponent().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hunting_status_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/hunting/me/hunting"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(client_for(&server).hunting_status().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hunting_status_in_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/hunting/me/hunting"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "status": "hunting",
                    "start_time": "2030-01-01T00:00:00Z",
                    "end_time": "2030-01-01T04:00:00Z"
                }
            })))
            .mount(&server)
            .await;

        let session = client_for(&server).hunting_status().await.unwrap().unwrap();
        assert_eq!(session.status, HuntingStatus::InProgress);
        assert!(session.end_time.is_some());
    }

    #[tokio::test]
    async fn test_start_and_claim_use_location() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/hunting/start/eternal-abyss-gate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/v1/hunting/claim/demonbane-keep"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"stars": 12, "reward_tok": 3400, "total_demon_killed": 87}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        // Acceptance without a session body
        assert!(client.start_hunting("eternal-abyss-gate").await.unwrap().is_none());

        let receipt = client.claim_hunting("demonbane-keep").await.unwrap();
        assert_eq!(receipt.total_demon_killed, 87);
    }

    #[tokio::test]
    async fn test_start_echoing_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/hunting/start/frost-hollow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"status": "hunting", "end_time": "2030-01-01T04:00:00Z"}
            })))
            .mount(&server)
            .await;

        let session = client_for(&server)
            .start_hunting("frost-hollow")
            .await
            .unwrap()
            .unwrap();
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/combats/energy"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).energy().await.unwrap_err();
        assert!(matches!(err, KombatError::Decode { .. }));
    }

    #[test]
    fn test_invalid_query_is_auth_error() {
        let err = HttpGameClient::new(&ApiConfig::default(), "bad\nquery").unwrap_err();
        assert!(matches!(err, KombatError::Auth(_)));
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = ApiConfig {
            base_url: "https://example.test/api/v1/".into(),
            ..ApiConfig::default()
        };
        let client = HttpGameClient::new(&config, "q").unwrap();
        assert_eq!(client.base_url(), "https://example.test/api/v1");
        assert_eq!(
            client.url(Endpoint::StartHunting, Some("gate")),
            "https://example.test/api/v1/hunting/start/gate"
        );
    }
}
