//! OAuth 2.0 authorization flow with PKCE.
//!
//! This module implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) for a
//! public client: the code exchange is bound by the PKCE verifier alone and
//! no client secret is used.
//!
//! # Flow
//!
//! 1. [`Authorizer::begin_authorization`] generates PKCE material, persists
//!    the verifier and state across the redirect, and returns the
//!    authorization URL for the host to open.
//! 2. The provider redirects back with `code`/`state` (or `error`).
//! 3. [`Authorizer::complete_authorization`] verifies the state, exchanges
//!    the code, and erases the persisted material regardless of outcome.
//!
//! # Security
//!
//! - State is validated before any exchange to prevent CSRF.
//! - The verifier is consumed exactly once; it never survives a callback.
//! - Sensitive values (tokens, codes, verifiers) are never logged.

use crate::error::{AuthError, Result};
use crate::pkce::PkceMaterial;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::storage::KeyValueStore;
use core_runtime::config::CoreConfig;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Transient storage key for the PKCE verifier.
pub const VERIFIER_KEY: &str = "pkce_code_verifier";

/// Transient storage key for the OAuth state parameter.
pub const STATE_KEY: &str = "oauth_state";

/// Result of a successful code exchange.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds as reported by the provider.
    pub expires_in: i64,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Query parameters of the provider's redirect back to the client.
#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Token response from the OAuth provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    error: Option<String>,
    error_description: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// Drives the authorization-code flow for the single configured provider.
pub struct Authorizer {
    config: CoreConfig,
    store: Arc<dyn KeyValueStore>,
    http: Arc<dyn HttpClient>,
}

impl Authorizer {
    pub fn new(
        config: CoreConfig,
        store: Arc<dyn KeyValueStore>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            config,
            store,
            http,
        }
    }

    /// Start an authorization attempt.
    ///
    /// Generates PKCE material, persists the verifier and state for the
    /// callback, and returns the authorization URL the host must navigate
    /// the user agent to.
    #[instrument(skip(self))]
    pub async fn begin_authorization(&self) -> Result<String> {
        let material = PkceMaterial::generate();
        let challenge = material.challenge();

        self.store
            .set(VERIFIER_KEY, material.verifier())
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;
        self.store
            .set(STATE_KEY, material.state())
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::InvalidAuthUrl(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("response_type", "code");
            query.append_pair("redirect_uri", &self.config.redirect_uri);
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", material.state());
            query.append_pair("code_challenge_method", "S256");
            query.append_pair("code_challenge", &challenge);
        }

        info!("authorization URL generated");
        Ok(url.to_string())
    }

    /// Handle the provider's redirect back to the client.
    ///
    /// Returns `Ok(None)` when the query carries neither `code` nor `error`
    /// (a plain page load, not a callback). On any real callback the
    /// persisted PKCE material is consumed and erased before the outcome is
    /// returned.
    ///
    /// # Errors
    ///
    /// - [`AuthError::AuthorizationDenied`] when the provider reported an
    ///   error
    /// - [`AuthError::StateMismatch`] when the returned state does not match
    ///   the persisted one
    /// - [`AuthError::MissingVerifier`] when no verifier survived the
    ///   redirect
    /// - [`AuthError::TokenExchangeFailed`] / [`AuthError::NetworkError`]
    ///   for exchange failures
    #[instrument(skip(self, redirect_query))]
    pub async fn complete_authorization(&self, redirect_query: &str) -> Result<Option<TokenGrant>> {
        let query = redirect_query.trim_start_matches('?');
        let params: CallbackParams = serde_urlencoded::from_str(query).unwrap_or_default();

        if params.code.is_none() && params.error.is_none() {
            debug!("no authorization callback in query");
            return Ok(None);
        }

        let stored_verifier = self.take(VERIFIER_KEY).await?;
        let stored_state = self.take(STATE_KEY).await?;

        if let Some(error) = params.error {
            warn!(error = %error, "provider denied authorization");
            return Err(AuthError::AuthorizationDenied(error));
        }

        // error was handled above, so a callback carries a code here
        let Some(code) = params.code else {
            return Ok(None);
        };

        if let Some(expected) = stored_state {
            let actual = params.state.unwrap_or_default();
            if actual != expected {
                warn!("authorization state mismatch");
                return Err(AuthError::StateMismatch { expected, actual });
            }
        } else {
            warn!("no persisted state to correlate the callback with");
        }

        let verifier = stored_verifier.ok_or(AuthError::MissingVerifier)?;

        self.exchange_code(&code, &verifier).await.map(Some)
    }

    /// Exchange an authorization code for a token.
    ///
    /// The request authenticates via PKCE only; as a public client no
    /// secret is sent.
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenGrant> {
        let body = serde_urlencoded::to_string([
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier),
            ("client_id", self.config.client_id.as_str()),
        ])
        .map_err(|e| AuthError::TokenExchangeFailed(format!("request encoding failed: {}", e)))?;

        let request =
            HttpRequest::new(HttpMethod::Post, self.config.token_url.clone()).form(body);

        debug!("exchanging authorization code for token");
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        let parsed: Option<TokenResponse> = response.json().ok();

        if let Some(error) = parsed.as_ref().and_then(|p| p.error.as_deref()) {
            let message = parsed
                .as_ref()
                .and_then(|p| p.error_description.clone())
                .unwrap_or_else(|| error.to_string());
            warn!(status = response.status, "token endpoint reported an error");
            return Err(AuthError::TokenExchangeFailed(message));
        }

        if !response.is_success() {
            warn!(status = response.status, "token exchange failed");
            return Err(AuthError::TokenExchangeFailed(format!(
                "token endpoint returned {}",
                response.status
            )));
        }

        let token = parsed
            .and_then(|p| {
                p.access_token
                    .map(|access_token| (access_token, p.expires_in))
            })
            .ok_or_else(|| {
                AuthError::TokenExchangeFailed("response carried no access token".to_string())
            })?;

        info!(expires_in = token.1, "authorization code exchanged");
        Ok(TokenGrant {
            access_token: token.0,
            expires_in: token.1,
        })
    }

    /// Read and erase a transient key, mapping storage failures.
    async fn take(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .store
            .get(key)
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;
        self.store
            .remove(key)
            .await
            .map_err(|e| AuthError::StorageUnavailable(e.to_string()))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkce::challenge_for;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use bytes::Bytes;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    struct MemoryStore {
        values: Mutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                values: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl KeyValueStore for MemoryStore {
        async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
            Ok(self.values.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
            self.values
                .lock()
                .await
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> BridgeResult<()> {
            self.values.lock().await.remove(key);
            Ok(())
        }

        async fn clear(&self) -> BridgeResult<()> {
            self.values.lock().await.clear();
            Ok(())
        }
    }

    /// Replays a scripted response and records the request it received.
    struct ScriptedHttp {
        status: u16,
        body: &'static str,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttp {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttp {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.seen.lock().await.push(request);
            Ok(HttpResponse {
                status: self.status,
                status_text: String::new(),
                headers: HashMap::new(),
                body: Bytes::from(self.body),
            })
        }
    }

    fn config() -> CoreConfig {
        CoreConfig::builder()
            .client_id("client-1")
            .redirect_uri("http://127.0.0.1:5501/app/")
            .build()
            .unwrap()
    }

    fn authorizer(store: Arc<MemoryStore>, http: Arc<ScriptedHttp>) -> Authorizer {
        Authorizer::new(config(), store, http)
    }

    #[tokio::test]
    async fn begin_persists_material_and_builds_url() {
        let store = Arc::new(MemoryStore::new());
        let http = Arc::new(ScriptedHttp::new(200, "{}"));
        let auth = authorizer(store.clone(), http);

        let url = auth.begin_authorization().await.unwrap();

        let verifier = store.get(VERIFIER_KEY).await.unwrap().unwrap();
        let state = store.get(STATE_KEY).await.unwrap().unwrap();

        assert!(url.starts_with("https://accounts.spotify.com/authorize?"));
        assert!(url.contains("client_id=client-1"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("state={}", state)));
        assert!(url.contains(&format!("code_challenge={}", challenge_for(&verifier))));
        // scopes are space-joined, encoded as + or %20
        assert!(url.contains("scope=user-read-private"));
    }

    #[tokio::test]
    async fn plain_page_load_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let http = Arc::new(ScriptedHttp::new(200, "{}"));
        let auth = authorizer(store, http.clone());

        let outcome = auth.complete_authorization("").await.unwrap();
        assert!(outcome.is_none());
        assert!(http.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn provider_error_is_denied_and_material_erased() {
        let store = Arc::new(MemoryStore::new());
        store.set(VERIFIER_KEY, "v").await.unwrap();
        store.set(STATE_KEY, "s").await.unwrap();
        let http = Arc::new(ScriptedHttp::new(200, "{}"));
        let auth = authorizer(store.clone(), http);

        let err = auth
            .complete_authorization("?error=access_denied")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AuthorizationDenied(_)));
        assert!(store.get(VERIFIER_KEY).await.unwrap().is_none());
        assert!(store.get(STATE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn state_mismatch_is_rejected_before_exchange() {
        let store = Arc::new(MemoryStore::new());
        store.set(VERIFIER_KEY, "v").await.unwrap();
        store.set(STATE_KEY, "expected").await.unwrap();
        let http = Arc::new(ScriptedHttp::new(200, "{}"));
        let auth = authorizer(store, http.clone());

        let err = auth
            .complete_authorization("code=abc&state=attacker")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch { .. }));
        assert!(http.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn missing_verifier_fails() {
        let store = Arc::new(MemoryStore::new());
        store.set(STATE_KEY, "s1").await.unwrap();
        let http = Arc::new(ScriptedHttp::new(200, "{}"));
        let auth = authorizer(store, http);

        let err = auth
            .complete_authorization("code=abc&state=s1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingVerifier));
    }

    #[tokio::test]
    async fn successful_exchange_sends_pkce_form_without_secret() {
        let store = Arc::new(MemoryStore::new());
        store.set(VERIFIER_KEY, "the-verifier").await.unwrap();
        store.set(STATE_KEY, "s1").await.unwrap();
        let http = Arc::new(ScriptedHttp::new(
            200,
            r#"{"access_token":"tok","expires_in":3600}"#,
        ));
        let auth = authorizer(store.clone(), http.clone());

        let grant = auth
            .complete_authorization("?code=abc123&state=s1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(grant.access_token, "tok");
        assert_eq!(grant.expires_in, 3600);

        let seen = http.seen.lock().await;
        let request = &seen[0];
        assert_eq!(request.url, "https://accounts.spotify.com/api/token");
        assert_eq!(
            request.headers.get("Content-Type").unwrap(),
            "application/x-www-form-urlencoded"
        );
        // PKCE public client: no secret, no Basic auth header.
        assert!(!request.headers.contains_key("Authorization"));
        let body = String::from_utf8(request.body.clone().unwrap().to_vec()).unwrap();
        assert!(body.contains("grant_type=authorization_code"));
        assert!(body.contains("code=abc123"));
        assert!(body.contains("code_verifier=the-verifier"));
        assert!(body.contains("client_id=client-1"));
        assert!(!body.contains("client_secret"));

        // Material is single-use.
        assert!(store.get(VERIFIER_KEY).await.unwrap().is_none());
        assert!(store.get(STATE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn provider_reported_error_fails_exchange() {
        let store = Arc::new(MemoryStore::new());
        store.set(VERIFIER_KEY, "v").await.unwrap();
        store.set(STATE_KEY, "s1").await.unwrap();
        let http = Arc::new(ScriptedHttp::new(
            400,
            r#"{"error":"invalid_grant","error_description":"Invalid authorization code"}"#,
        ));
        let auth = authorizer(store.clone(), http);

        let err = auth
            .complete_authorization("code=bad&state=s1")
            .await
            .unwrap_err();
        match err {
            AuthError::TokenExchangeFailed(message) => {
                assert_eq!(message, "Invalid authorization code")
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(store.get(VERIFIER_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transport_failure_is_a_network_error() {
        struct FailingHttp;

        #[async_trait]
        impl HttpClient for FailingHttp {
            async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
                Err(bridge_traits::BridgeError::OperationFailed(
                    "connection refused".to_string(),
                ))
            }
        }

        let store = Arc::new(MemoryStore::new());
        store.set(VERIFIER_KEY, "v").await.unwrap();
        store.set(STATE_KEY, "s1").await.unwrap();
        let auth = Authorizer::new(config(), store, Arc::new(FailingHttp));

        let err = auth
            .complete_authorization("code=abc&state=s1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NetworkError(_)));
    }
}
