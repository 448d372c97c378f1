//! OAuth credential management for the Blogger account.
//!
//! The bot owns a single OAuth identity. Its token material lives in a
//! small binary cache file between runs:
//!
//! 1. a cached, unexpired credential is used as-is;
//! 2. an expired credential with a refresh token is refreshed in place
//!    (exactly one refresh call) and written back;
//! 3. with nothing usable cached, the client secrets supplied through the
//!    environment drive a one-time authorization-code exchange: the bot
//!    prints the consent URL, reads the code from stdin, and trades it for
//!    tokens;
//! 4. with no cache and no client secrets, authentication fails before any
//!    other network call is made.
//!
//! The cache is behind the [`TokenStore`] trait so tests can substitute an
//! in-memory stub for [`FileStore`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, instrument, warn};
use url::Url;

/// OAuth scope required to create posts.
pub const BLOGGER_SCOPE: &str = "https://www.googleapis.com/auth/blogger";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const OOB_REDIRECT: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Tokens within this many seconds of expiry count as expired.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Token material for the configured publishing account.
///
/// Carries the client identity alongside the tokens so a refresh needs
/// nothing beyond the cache file itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Expiry as unix seconds. Absent means the expiry is unknown and the
    /// credential is treated as expired.
    pub expires_at: Option<i64>,
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
}

impl Credential {
    /// Whether the access token is expired (or close enough) at `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now + EXPIRY_SKEW_SECS >= expires_at,
            None => true,
        }
    }
}

/// OAuth client secrets in Google's "installed app" JSON shape, supplied
/// through the `BLOGGER_CREDENTIALS` environment variable.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub installed: InstalledApp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstalledApp {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

impl ClientSecrets {
    pub fn from_json(raw: &str) -> Result<Self, Box<dyn Error>> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Where the credential blob lives between runs.
pub trait TokenStore {
    fn load(&self) -> Result<Option<Credential>, Box<dyn Error>>;
    fn save(&self, credential: &Credential) -> Result<(), Box<dyn Error>>;
}

/// Token cache backed by a local file holding a bincode-serialized
/// [`Credential`].
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStore for FileStore {
    fn load(&self) -> Result<Option<Credential>, Box<dyn Error>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)?;
        match bincode::deserialize(&bytes) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Token cache is unreadable; ignoring it"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), Box<dyn Error>> {
        let bytes = bincode::serialize(credential)?;
        std::fs::write(&self.path, bytes)?;
        info!(path = %self.path.display(), "Token cache written");
        Ok(())
    }
}

/// What [`Authenticator::obtain`] must do given the cache state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStep {
    UseCached,
    Refresh,
    Authorize,
}

/// Decide the authentication path from the cached credential and the
/// current time.
pub fn next_step(cached: Option<&Credential>, now: i64) -> AuthStep {
    match cached {
        Some(credential) if !credential.is_expired(now) => AuthStep::UseCached,
        Some(credential) if credential.refresh_token.is_some() => AuthStep::Refresh,
        _ => AuthStep::Authorize,
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Obtains a usable [`Credential`], hitting the token endpoint only when
/// the cache alone is not enough.
pub struct Authenticator<S> {
    store: S,
    secrets: Option<ClientSecrets>,
    http: reqwest::Client,
}

impl<S: TokenStore> Authenticator<S> {
    pub fn new(store: S, secrets: Option<ClientSecrets>) -> Self {
        Self {
            store,
            secrets,
            http: reqwest::Client::new(),
        }
    }

    /// Produce a valid credential, refreshing or authorizing as needed.
    ///
    /// Fails without touching the network when neither a usable cache nor
    /// client secrets are available.
    #[instrument(level = "info", skip_all)]
    pub async fn obtain(&self) -> Result<Credential, Box<dyn Error>> {
        let cached = self.store.load()?;
        let now = Utc::now().timestamp();

        match next_step(cached.as_ref(), now) {
            AuthStep::UseCached => {
                info!("Using cached Blogger credential");
                Ok(cached.expect("UseCached implies a cached credential"))
            }
            AuthStep::Refresh => {
                let credential = cached.expect("Refresh implies a cached credential");
                info!("Cached Blogger credential expired; refreshing");
                let refreshed = self.refresh(&credential).await?;
                self.store.save(&refreshed)?;
                Ok(refreshed)
            }
            AuthStep::Authorize => {
                let secrets = self.secrets.as_ref().ok_or(
                    "no usable token cache and BLOGGER_CREDENTIALS is not set; \
                     cannot authorize the Blogger account",
                )?;
                let credential = self.authorize(&secrets.installed).await?;
                self.store.save(&credential)?;
                Ok(credential)
            }
        }
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential, Box<dyn Error>> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or("credential has no refresh token")?;

        let params = [
            ("client_id", credential.client_id.as_str()),
            ("client_secret", credential.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let token = self.request_token(&credential.token_uri, &params).await?;

        Ok(Credential {
            access_token: token.access_token,
            // Refresh responses usually omit the refresh token; keep ours.
            refresh_token: token
                .refresh_token
                .or_else(|| credential.refresh_token.clone()),
            expires_at: token.expires_in.map(|s| Utc::now().timestamp() + s),
            client_id: credential.client_id.clone(),
            client_secret: credential.client_secret.clone(),
            token_uri: credential.token_uri.clone(),
        })
    }

    /// Interactive authorization-code exchange for the first run.
    async fn authorize(&self, app: &InstalledApp) -> Result<Credential, Box<dyn Error>> {
        let redirect_uri = app
            .redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or(OOB_REDIRECT);

        let consent_url = consent_url(app, redirect_uri)?;
        println!("Open this URL in a browser and authorize the blog account:");
        println!("\n  {consent_url}\n");
        print!("Paste the authorization code here: ");
        io::stdout().flush()?;

        let mut code = String::new();
        io::stdin().lock().read_line(&mut code)?;
        let code = code.trim();
        if code.is_empty() {
            return Err("no authorization code entered".into());
        }

        let params = [
            ("client_id", app.client_id.as_str()),
            ("client_secret", app.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ];
        let token = self.request_token(&app.token_uri, &params).await?;
        info!("Blogger account authorized");

        Ok(Credential {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_in.map(|s| Utc::now().timestamp() + s),
            client_id: app.client_id.clone(),
            client_secret: app.client_secret.clone(),
            token_uri: app.token_uri.clone(),
        })
    }

    async fn request_token(
        &self,
        token_uri: &str,
        params: &[(&str, &str)],
    ) -> Result<TokenResponse, Box<dyn Error>> {
        let response = self.http.post(token_uri).form(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(format!("token endpoint returned HTTP {status}: {body}").into());
        }
        Ok(response.json::<TokenResponse>().await?)
    }
}

/// Build the user-facing consent URL for the authorization-code flow.
fn consent_url(app: &InstalledApp, redirect_uri: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(
        &app.auth_uri,
        &[
            ("client_id", app.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", BLOGGER_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn credential(expires_at: Option<i64>, refresh: bool) -> Credential {
        Credential {
            access_token: "abc123".to_string(),
            refresh_token: refresh.then(|| "refresh456".to_string()),
            expires_at,
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        credential: Mutex<Option<Credential>>,
    }

    impl TokenStore for MemoryStore {
        fn load(&self) -> Result<Option<Credential>, Box<dyn Error>> {
            Ok(self.credential.lock().unwrap().clone())
        }

        fn save(&self, credential: &Credential) -> Result<(), Box<dyn Error>> {
            *self.credential.lock().unwrap() = Some(credential.clone());
            Ok(())
        }
    }

    #[test]
    fn test_is_expired_with_future_expiry() {
        let cred = credential(Some(1_000_000), true);
        assert!(!cred.is_expired(999_000));
    }

    #[test]
    fn test_is_expired_within_skew() {
        let cred = credential(Some(1_000_000), true);
        assert!(cred.is_expired(1_000_000 - EXPIRY_SKEW_SECS));
    }

    #[test]
    fn test_is_expired_when_expiry_unknown() {
        let cred = credential(None, true);
        assert!(cred.is_expired(0));
    }

    #[test]
    fn test_next_step_uses_valid_cache() {
        let cred = credential(Some(1_000_000), false);
        assert_eq!(next_step(Some(&cred), 0), AuthStep::UseCached);
    }

    #[test]
    fn test_next_step_refreshes_expired_cache_once_capable() {
        let cred = credential(Some(100), true);
        assert_eq!(next_step(Some(&cred), 1_000_000), AuthStep::Refresh);
    }

    #[test]
    fn test_next_step_authorizes_without_refresh_token() {
        let cred = credential(Some(100), false);
        assert_eq!(next_step(Some(&cred), 1_000_000), AuthStep::Authorize);
    }

    #[test]
    fn test_next_step_authorizes_with_empty_cache() {
        assert_eq!(next_step(None, 0), AuthStep::Authorize);
    }

    #[test]
    fn test_client_secrets_from_json() {
        let raw = r#"{
            "installed": {
                "client_id": "id.apps.googleusercontent.com",
                "client_secret": "s3cret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "redirect_uris": ["http://localhost"]
            }
        }"#;
        let secrets = ClientSecrets::from_json(raw).unwrap();
        assert_eq!(secrets.installed.client_id, "id.apps.googleusercontent.com");
        assert_eq!(secrets.installed.redirect_uris, vec!["http://localhost"]);
    }

    #[test]
    fn test_client_secrets_defaults_for_missing_uris() {
        let raw = r#"{"installed": {"client_id": "id", "client_secret": "s"}}"#;
        let secrets = ClientSecrets::from_json(raw).unwrap();
        assert_eq!(secrets.installed.token_uri, DEFAULT_TOKEN_URI);
        assert_eq!(secrets.installed.auth_uri, DEFAULT_AUTH_URI);
        assert!(secrets.installed.redirect_uris.is_empty());
    }

    #[test]
    fn test_client_secrets_rejects_garbage() {
        assert!(ClientSecrets::from_json("not json").is_err());
        assert!(ClientSecrets::from_json(r#"{"web": {}}"#).is_err());
    }

    #[test]
    fn test_credential_bincode_roundtrip() {
        let cred = credential(Some(1_234_567), true);
        let bytes = bincode::serialize(&cred).unwrap();
        let back: Credential = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, cred);
    }

    #[test]
    fn test_file_store_roundtrip_and_missing_file() {
        let path = std::env::temp_dir().join("vivimundo_bot_token_roundtrip.bin");
        let _ = std::fs::remove_file(&path);

        let store = FileStore::new(&path);
        assert!(store.load().unwrap().is_none());

        let cred = credential(Some(1_234_567), true);
        store.save(&cred).unwrap();
        assert_eq!(store.load().unwrap(), Some(cred));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_file_store_ignores_corrupt_cache() {
        let path = std::env::temp_dir().join("vivimundo_bot_token_corrupt.bin");
        std::fs::write(&path, b"\xff\xfe not a credential").unwrap();

        let store = FileStore::new(&path);
        assert!(store.load().unwrap().is_none());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_obtain_fails_fast_without_cache_or_secrets() {
        let authenticator = Authenticator::new(MemoryStore::default(), None);
        let err = authenticator.obtain().await.unwrap_err();
        assert!(err.to_string().contains("BLOGGER_CREDENTIALS"));
    }

    #[tokio::test]
    async fn test_obtain_returns_cached_credential_without_network() {
        let store = MemoryStore::default();
        let cred = credential(Some(i64::MAX), true);
        store.save(&cred).unwrap();

        let authenticator = Authenticator::new(store, None);
        assert_eq!(authenticator.obtain().await.unwrap(), cred);
    }

    #[test]
    fn test_consent_url_carries_scope_and_client() {
        let raw = r#"{"installed": {"client_id": "the-id", "client_secret": "s"}}"#;
        let secrets = ClientSecrets::from_json(raw).unwrap();
        let url = consent_url(&secrets.installed, OOB_REDIRECT).unwrap();
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("client_id".to_string(), "the-id".to_string())));
        assert!(query.contains(&("scope".to_string(), BLOGGER_SCOPE.to_string())));
        assert!(query.contains(&("access_type".to_string(), "offline".to_string())));
    }
}
