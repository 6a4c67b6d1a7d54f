use crate::config::Config;
use crate::error::{INVALID_RESPONSE_MESSAGE, VibeError};
use crate::models::{AnalysisResult, ErrorDetail, PlaylistSummary, PlaylistsPage, TokenPair};
use crate::session::Credential;
use serde_json::Value;
use ureq::{Agent, Response};
use urlencoding::encode;

/// Remote calls the vibe check depends on.
///
/// Every call is a single attempt; nothing here retries.
#[cfg_attr(test, mockall::automock)]
pub trait VibeGateway {
    /// List the signed-in user's playlists (first 50)
    fn list_playlists(&self, credential: &Credential) -> Result<Vec<PlaylistSummary>, VibeError>;

    /// Best-effort check that the analysis backend answers at all
    fn probe_backend(&self) -> bool;

    /// Ask the backend to analyze one playlist
    fn request_analysis(
        &self,
        credential: &Credential,
        playlist_id: &str,
    ) -> Result<AnalysisResult, VibeError>;

    /// Trade a one-time OAuth code for tokens
    fn exchange_token(&self, code: &str) -> Result<TokenPair, VibeError>;
}

/// Blocking client for the Spotify Web API and the analysis backend
pub struct VibeClient {
    agent: Agent,
    api_base: String,
    backend_url: String,
}

impl VibeClient {
    pub fn new(config: &Config) -> Self {
        let agent = Agent::new();

        VibeClient {
            agent,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            backend_url: config.backend_url.trim_end_matches('/').to_string(),
        }
    }

    fn backend(&self, path: &str) -> String {
        format!("{}{}", self.backend_url, path)
    }
}

impl VibeGateway for VibeClient {
    fn list_playlists(&self, credential: &Credential) -> Result<Vec<PlaylistSummary>, VibeError> {
        if credential.token().is_empty() {
            return Err(VibeError::missing_credential());
        }

        let url = format!("{}/v1/me/playlists?limit=50", self.api_base);
        log::debug!("[Gateway] Fetching playlists: {}", url);

        let response = match self
            .agent
            .get(&url)
            .set("Authorization", &credential.bearer_header())
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => {
                log::warn!("[Gateway] Playlist listing rejected with status {}", status);
                return Err(VibeError::Auth(format!(
                    "Failed to fetch playlists: {status}"
                )));
            }
            Err(ureq::Error::Transport(transport)) => return Err(transport.into()),
        };

        let body = read_body(response)?;
        let page: PlaylistsPage = serde_json::from_str(&body).map_err(|e| {
            VibeError::MalformedResponse(format!("Failed to parse playlists response: {e}"))
        })?;

        log::info!("[Gateway] Fetched {} playlists", page.items.len());
        Ok(page.items)
    }

    fn probe_backend(&self) -> bool {
        let url = self.backend("/");
        match self
            .agent
            .get(&url)
            .set("Content-Type", "application/json")
            .call()
        {
            Ok(_) => {
                log::debug!("[Gateway] Backend connectivity test passed");
                true
            }
            Err(e) => {
                log::error!("[Gateway] Backend connectivity test failed: {}", e);
                false
            }
        }
    }

    fn request_analysis(
        &self,
        credential: &Credential,
        playlist_id: &str,
    ) -> Result<AnalysisResult, VibeError> {
        if credential.token().is_empty() {
            return Err(VibeError::missing_credential());
        }

        let url = self.backend(&format!("/analyze/playlist/{}", encode(playlist_id)));
        log::info!("[Gateway] Requesting analysis: {}", url);

        let response = match self
            .agent
            .post(&url)
            .set("Authorization", &credential.bearer_header())
            .set("Content-Type", "application/json")
            .call()
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                let detail = error_detail(&body)
                    .unwrap_or_else(|| format!("Analysis failed: {status}"));
                log::warn!("[Gateway] Analysis failed with status {}: {}", status, detail);
                return Err(VibeError::Http { status, detail });
            }
            Err(ureq::Error::Transport(transport)) => return Err(transport.into()),
        };

        let body = read_body(response)?;
        parse_analysis(&body)
    }

    fn exchange_token(&self, code: &str) -> Result<TokenPair, VibeError> {
        let url = self.backend("/api/exchange-token");
        log::debug!("[Gateway] Exchanging authorization code");

        let response = match self
            .agent
            .post(&url)
            .send_json(serde_json::json!({ "code": code }))
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                let detail = error_detail(&body)
                    .unwrap_or_else(|| format!("Token exchange failed: {status}"));
                return Err(VibeError::Http { status, detail });
            }
            Err(ureq::Error::Transport(transport)) => return Err(transport.into()),
        };

        let body = read_body(response)?;
        serde_json::from_str(&body).map_err(|e| {
            VibeError::MalformedResponse(format!("Failed to parse token response: {e}"))
        })
    }
}

fn read_body(response: Response) -> Result<String, VibeError> {
    response
        .into_string()
        .map_err(|e| VibeError::Network(format!("Failed to read response body: {e}")))
}

/// Pull `detail` out of a JSON error body, if there is a non-empty one
pub fn error_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorDetail>(body)
        .ok()
        .and_then(|parsed| parsed.detail)
        .filter(|detail| !detail.is_empty())
}

/// Decode a 2xx analysis body, insisting on the two keys a report cannot do without
pub fn parse_analysis(body: &str) -> Result<AnalysisResult, VibeError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        log::error!("[Gateway] Analysis response is not JSON: {}", e);
        VibeError::MalformedResponse(INVALID_RESPONSE_MESSAGE.to_string())
    })?;

    let has_shape = value
        .as_object()
        .map(|fields| fields.contains_key("playlist_name") && fields.contains_key("quantitative_analysis"))
        .unwrap_or(false);
    if !has_shape {
        log::error!("[Gateway] Analysis response is missing required keys");
        return Err(VibeError::MalformedResponse(
            INVALID_RESPONSE_MESSAGE.to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        log::error!("[Gateway] Analysis response could not be decoded: {}", e);
        VibeError::MalformedResponse(INVALID_RESPONSE_MESSAGE.to_string())
    })
}
