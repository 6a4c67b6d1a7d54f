use crate::client::VibeGateway;
use crate::error::VibeError;
use crate::session::{Credential, Session};
use urlencoding::encode;

pub const AUTHORIZE_ENDPOINT: &str = "https://accounts.spotify.com/authorize";
pub const SCOPES: &str = "user-read-private user-read-email playlist-read-private";

/// Build the URL the browser is sent to for Spotify sign-in
pub fn authorize_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&scope={}",
        AUTHORIZE_ENDPOINT,
        encode(client_id),
        encode(redirect_uri),
        encode(SCOPES)
    )
}

/// Why a sign-in attempt did not produce a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// Spotify redirected back without a code
    AuthFailed,
    /// The backend refused the code
    TokenExchangeFailed,
    /// The backend could not be reached or answered nonsense
    ServerError,
}

impl AuthFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailure::AuthFailed => "auth_failed",
            AuthFailure::TokenExchangeFailed => "token_exchange_failed",
            AuthFailure::ServerError => "server_error",
        }
    }
}

/// Result of handling the OAuth redirect back to the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Authenticated,
    Failed(AuthFailure),
}

impl CallbackOutcome {
    /// Where the browser should be sent next, relative to the app URL
    pub fn redirect_path(&self) -> String {
        match self {
            CallbackOutcome::Authenticated => "/dashboard".to_string(),
            CallbackOutcome::Failed(failure) => format!("/?error={}", failure.as_str()),
        }
    }

    pub fn redirect_url(&self, app_url: &str) -> String {
        format!("{}{}", app_url.trim_end_matches('/'), self.redirect_path())
    }
}

/// Exchange the callback `code` for tokens and store the access token in `session`
pub fn handle_callback<G>(gateway: &G, session: &Session, code: Option<&str>) -> CallbackOutcome
where
    G: VibeGateway + ?Sized,
{
    let code = match code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => code,
        None => {
            log::warn!("[Auth] Callback received without a code");
            return CallbackOutcome::Failed(AuthFailure::AuthFailed);
        }
    };

    match gateway.exchange_token(code) {
        Ok(tokens) => {
            log::info!("[Auth] Token exchange succeeded");
            session.store(Credential::new(tokens.access_token));
            CallbackOutcome::Authenticated
        }
        Err(VibeError::Http { status, detail }) => {
            log::warn!("[Auth] Token exchange rejected ({}): {}", status, detail);
            CallbackOutcome::Failed(AuthFailure::TokenExchangeFailed)
        }
        Err(e) => {
            log::error!("[Auth] Token exchange error: {}", e);
            CallbackOutcome::Failed(AuthFailure::ServerError)
        }
    }
}

/// Pull the `code` parameter out of a request target like `/api/auth/callback?code=...`
pub fn code_from_request_target(target: &str) -> Option<String> {
    let (_, query) = target.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "code")
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
}

/// Split a plain `http://` redirect URI into the `host:port` to listen on and the callback path.
///
/// The local listener cannot terminate TLS, so `https://` redirect URIs are rejected.
pub fn callback_listener(redirect_uri: &str) -> Option<(String, String)> {
    let rest = redirect_uri.strip_prefix("http://")?;
    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, "/"),
    };
    if authority.is_empty() {
        return None;
    }
    let address = if authority.contains(':') {
        authority.to_string()
    } else {
        format!("{authority}:80")
    };
    Some((address, path.to_string()))
}
