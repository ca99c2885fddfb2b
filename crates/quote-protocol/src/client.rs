//! Shoonya (Noren) REST Client
//!
//! Provides async HTTP access to the `QuickAuth` and `GetQuotes` endpoints.

use crate::error::QuoteError;
use crate::source::{Quote, QuoteSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use totp_rs::{Algorithm, Secret, TOTP};
use tracing::{debug, info, warn};

/// Default Noren REST endpoint for Shoonya
pub const DEFAULT_HOST: &str = "https://api.shoonya.com/NorenWClientTP/";

const APK_VERSION: &str = "1.0.0";
const LOGIN_SOURCE: &str = "API";

const TOTP_DIGITS: usize = 6;
const TOTP_STEP_SECS: u64 = 30;

/// Broker login credentials
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub user_id: String,
    pub password: String,
    /// Base32 TOTP secret; when set, the second factor is generated at login
    pub totp_secret: String,
    /// Fixed second factor, used only without a TOTP secret
    pub factor2: String,
    pub vendor_code: String,
    pub api_key: String,
    pub imei: String,
}

impl Credentials {
    /// Second login factor at `unix_time` (seconds)
    pub fn second_factor(&self, unix_time: u64) -> Result<String, QuoteError> {
        let secret = self.totp_secret.trim();
        if secret.is_empty() {
            return Ok(self.factor2.clone());
        }

        let bytes = Secret::Encoded(secret.to_string())
            .to_bytes()
            .map_err(|e| QuoteError::LoginFailed(format!("invalid TOTP secret: {:?}", e)))?;
        let totp = TOTP::new(Algorithm::SHA1, TOTP_DIGITS, 1, TOTP_STEP_SECS, bytes)
            .map_err(|e| QuoteError::LoginFailed(format!("invalid TOTP secret: {}", e)))?;
        Ok(totp.generate(unix_time))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("password", &"<redacted>")
            .field("totp_secret", &"<redacted>")
            .field("factor2", &"<redacted>")
            .field("vendor_code", &self.vendor_code)
            .field("api_key", &"<redacted>")
            .field("imei", &self.imei)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    source: &'a str,
    apkversion: &'a str,
    uid: &'a str,
    pwd: String,
    factor2: String,
    vc: &'a str,
    appkey: String,
    imei: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    stat: String,
    susertoken: Option<String>,
    emsg: Option<String>,
}

#[derive(Debug, Serialize)]
struct QuoteRequest<'a> {
    uid: &'a str,
    exch: &'a str,
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    stat: String,
    lp: Option<String>,
    emsg: Option<String>,
}

#[derive(Debug, Clone)]
struct Session {
    user_id: String,
    token: String,
}

/// Client for the Shoonya brokerage REST API
pub struct ShoonyaClient {
    /// Base URL, always ending in `/`
    host: String,
    http: reqwest::Client,
    /// Active session (None until login succeeds)
    session: RwLock<Option<Session>>,
    /// Credentials of the last successful login, reused to renew the session
    credentials: RwLock<Option<Credentials>>,
}

impl ShoonyaClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `host` - Base REST URL
    /// * `timeout` - Per-request timeout
    pub fn new(host: &str, timeout: Duration) -> Result<Self, QuoteError> {
        info!("Creating Shoonya client for {}", host);

        let mut host = host.to_string();
        if !host.ends_with('/') {
            host.push('/');
        }

        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            host,
            http,
            session: RwLock::new(None),
            credentials: RwLock::new(None),
        })
    }

    /// Log in and keep the session token for subsequent quote requests
    pub async fn login(&self, credentials: &Credentials) -> Result<(), QuoteError> {
        info!("Logging in to broker as {}", credentials.user_id);

        let body = login_body(credentials, unix_now())?;
        let text = self.post("QuickAuth", body).await?;
        let token = parse_login(&text)?;

        *self.session.write().await = Some(Session {
            user_id: credentials.user_id.clone(),
            token,
        });
        *self.credentials.write().await = Some(credentials.clone());

        info!("Broker login successful");
        Ok(())
    }

    /// Check if a session token is held
    pub async fn is_logged_in(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Log in again with the credentials of the last successful login
    async fn relogin(&self) -> Result<(), QuoteError> {
        let credentials = self
            .credentials
            .read()
            .await
            .clone()
            .ok_or(QuoteError::NotLoggedIn)?;
        self.login(&credentials).await
    }

    async fn drop_session(&self) {
        if self.session.write().await.take().is_some() {
            debug!("Broker session token dropped");
        }
    }

    async fn request_quote(&self, exchange: &str, symbol: &str) -> Result<Quote, QuoteError> {
        let session = self
            .session
            .read()
            .await
            .clone()
            .ok_or(QuoteError::NotLoggedIn)?;

        let request = QuoteRequest {
            uid: &session.user_id,
            exch: exchange,
            token: symbol,
        };
        let body = format!(
            "jData={}&jKey={}",
            serde_json::to_string(&request)?,
            session.token
        );

        let text = self.post("GetQuotes", body).await?;
        parse_quote(exchange, symbol, &text)
    }

    async fn post(&self, endpoint: &str, body: String) -> Result<String, QuoteError> {
        let url = format!("{}{}", self.host, endpoint);
        debug!("POST {}", url);

        let response = self.http.post(&url).body(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Noren reports most failures as JSON with a non-Ok stat, so only
        // give up on the body when it is not JSON at all.
        if !status.is_success() && serde_json::from_str::<serde_json::Value>(&text).is_err() {
            return Err(QuoteError::Http(format!("{} returned {}", endpoint, status)));
        }

        Ok(text)
    }
}

#[async_trait]
impl QuoteSource for ShoonyaClient {
    /// Quote an instrument, renewing the session once if it has lapsed
    async fn get_quote(&self, exchange: &str, symbol: &str) -> Result<Quote, QuoteError> {
        if !self.is_logged_in().await {
            self.relogin().await?;
        }

        match self.request_quote(exchange, symbol).await {
            Err(QuoteError::SessionExpired) => {
                warn!("Broker session expired, logging in again");
                self.drop_session().await;
                self.relogin().await?;
                self.request_quote(exchange, symbol).await
            }
            other => other,
        }
    }

    fn name(&self) -> &str {
        "shoonya"
    }
}

/// Lower-case hex SHA-256 digest, as the Noren API expects
fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn login_body(credentials: &Credentials, unix_time: u64) -> Result<String, QuoteError> {
    let request = LoginRequest {
        source: LOGIN_SOURCE,
        apkversion: APK_VERSION,
        uid: &credentials.user_id,
        pwd: sha256_hex(&credentials.password),
        factor2: credentials.second_factor(unix_time)?,
        vc: &credentials.vendor_code,
        appkey: sha256_hex(&format!("{}|{}", credentials.user_id, credentials.api_key)),
        imei: &credentials.imei,
    };
    Ok(format!("jData={}", serde_json::to_string(&request)?))
}

fn parse_login(text: &str) -> Result<String, QuoteError> {
    let response: LoginResponse = serde_json::from_str(text)?;
    if response.stat != "Ok" {
        return Err(QuoteError::LoginFailed(
            response.emsg.unwrap_or_else(|| "no reason given".to_string()),
        ));
    }
    response.susertoken.ok_or(QuoteError::MissingField("susertoken"))
}

fn parse_quote(exchange: &str, symbol: &str, text: &str) -> Result<Quote, QuoteError> {
    let response: QuoteResponse = serde_json::from_str(text)?;

    if response.stat != "Ok" {
        let reason = response.emsg.unwrap_or_else(|| "no reason given".to_string());
        if reason.contains("Session Expired") {
            return Err(QuoteError::SessionExpired);
        }
        return Err(QuoteError::QuoteUnavailable {
            exchange: exchange.to_string(),
            symbol: symbol.to_string(),
            reason,
        });
    }

    let lp = response.lp.ok_or(QuoteError::MissingField("lp"))?;
    let last_price = lp
        .trim()
        .parse::<f64>()
        .map_err(|_| QuoteError::InvalidResponse(format!("lp is not a number: {:?}", lp)))?;

    Ok(Quote { last_price })
}
