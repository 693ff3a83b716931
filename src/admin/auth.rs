use axum::{extract::FromRequestParts, http::HeaderMap, http::request::Parts};
use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::error::AdminError;
use crate::{AdminConfig, AppState};

type HmacSha256 = Hmac<Sha256>;

pub const AUTH_COOKIE: &str = "admin-auth";
pub const DEFAULT_ADMIN_PASSWORD: &str = "change-this-password";
const SIGNED_SUBJECT: &str = "admin";

/// How the session cookie value relates to the shared password.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieMode {
    /// The cookie holds the password itself.
    #[default]
    Plain,
    /// The cookie holds `admin:<hmac>` keyed by the password.
    Signed,
}

pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all("cookie")
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|header| header.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

pub fn create_signed_cookie(secret: &str, value: &str) -> Result<String, String> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "Invalid secret key")?;
    mac.update(value.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);
    Ok(format!("{}:{}", value, signature_b64))
}

pub fn verify_signed_cookie(secret: &str, signed_value: &str) -> bool {
    if let Some((value, signature_b64)) = signed_value.split_once(':')
        && value == SIGNED_SUBJECT
        && let Ok(signature) = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64)
        && let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes())
    {
        mac.update(value.as_bytes());
        return mac.verify_slice(&signature).is_ok();
    }
    false
}

// Compares digests so the timing does not depend on where the inputs differ.
fn secrets_match(candidate: &str, expected: &str) -> bool {
    let a = Sha256::digest(candidate.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Keep post-login redirects on this site.
pub fn safe_redirect(target: Option<&str>) -> String {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/admin".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct AdminAuth {
    password: String,
    mode: CookieMode,
    secure: bool,
    max_age_seconds: u64,
}

impl AdminAuth {
    pub fn new(password: impl Into<String>, mode: CookieMode, secure: bool, max_age_days: u64) -> Self {
        Self {
            password: password.into(),
            mode,
            secure,
            max_age_seconds: max_age_days * 24 * 60 * 60,
        }
    }

    /// `ADMIN_PASSWORD` wins over the config file, which wins over the
    /// built-in default.
    pub fn from_config(config: &AdminConfig) -> Self {
        let password = std::env::var("ADMIN_PASSWORD")
            .ok()
            .filter(|value| !value.is_empty())
            .or_else(|| config.password.clone().filter(|value| !value.is_empty()))
            .unwrap_or_else(|| DEFAULT_ADMIN_PASSWORD.to_string());

        Self::new(
            password,
            config.cookie_mode,
            config.secure_cookie,
            config.session_days,
        )
    }

    pub fn is_default_password(&self) -> bool {
        self.password == DEFAULT_ADMIN_PASSWORD
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        secrets_match(candidate, &self.password)
    }

    fn cookie_value(&self) -> Result<String, String> {
        match self.mode {
            CookieMode::Plain => Ok(urlencoding::encode(&self.password).into_owned()),
            CookieMode::Signed => create_signed_cookie(&self.password, SIGNED_SUBJECT),
        }
    }

    pub fn verify_cookie(&self, value: &str) -> bool {
        match self.mode {
            CookieMode::Plain => urlencoding::decode(value)
                .map(|decoded| secrets_match(&decoded, &self.password))
                .unwrap_or(false),
            CookieMode::Signed => verify_signed_cookie(&self.password, value),
        }
    }

    pub fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        get_cookie_value(headers, AUTH_COOKIE)
            .map(|value| self.verify_cookie(&value))
            .unwrap_or(false)
    }

    /// `Set-Cookie` value that starts a session.
    pub fn session_cookie(&self) -> Result<String, String> {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            AUTH_COOKIE,
            self.cookie_value()?,
            self.max_age_seconds
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        Ok(cookie)
    }

    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", AUTH_COOKIE);
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Extractor for handlers that only an admin session may call.
pub struct AdminSession;

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AdminError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if state.admin.is_authenticated(&parts.headers) {
            Ok(AdminSession)
        } else {
            debug!("Rejected admin API call to {} without session", parts.uri.path());
            Err(AdminError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_get_cookie_value() {
        let headers = headers_with_cookie("theme=dark; admin-auth=abc%20d ; other=1");
        assert_eq!(get_cookie_value(&headers, "admin-auth").as_deref(), Some("abc%20d"));
        assert_eq!(get_cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_plain_cookie_round_trip() {
        let auth = AdminAuth::new("s3cret pass", CookieMode::Plain, false, 7);
        let cookie = auth.session_cookie().unwrap();
        assert_eq!(
            cookie,
            "admin-auth=s3cret%20pass; Path=/; Max-Age=604800; HttpOnly; SameSite=Lax"
        );

        let value = cookie.split(';').next().unwrap();
        assert!(auth.is_authenticated(&headers_with_cookie(value)));
        assert!(!auth.is_authenticated(&headers_with_cookie("admin-auth=wrong")));
        assert!(!auth.is_authenticated(&HeaderMap::new()));
    }

    #[test]
    fn test_signed_cookie_does_not_expose_password() {
        let auth = AdminAuth::new("hunter2", CookieMode::Signed, true, 1);
        let cookie = auth.session_cookie().unwrap();
        assert!(!cookie.contains("hunter2"));
        assert!(cookie.ends_with("; Secure"));

        let value = cookie.split(';').next().unwrap();
        assert!(auth.is_authenticated(&headers_with_cookie(value)));

        let other = AdminAuth::new("different", CookieMode::Signed, true, 1);
        assert!(!other.is_authenticated(&headers_with_cookie(value)));
        assert!(!auth.is_authenticated(&headers_with_cookie("admin-auth=hunter2")));
    }

    #[test]
    fn test_signed_cookie_rejects_other_subjects() {
        let forged = create_signed_cookie("key", "someone").unwrap();
        assert!(!verify_signed_cookie("key", &forged));
        let genuine = create_signed_cookie("key", "admin").unwrap();
        assert!(verify_signed_cookie("key", &genuine));
    }

    #[test]
    fn test_check_password() {
        let auth = AdminAuth::new("pw", CookieMode::Plain, false, 7);
        assert!(auth.check_password("pw"));
        assert!(!auth.check_password("pw "));
        assert!(!auth.check_password(""));
        assert!(!auth.is_default_password());
        assert!(AdminAuth::new(DEFAULT_ADMIN_PASSWORD, CookieMode::Plain, false, 7).is_default_password());
    }

    #[test]
    fn test_clear_cookie_expires_session() {
        let auth = AdminAuth::new("pw", CookieMode::Plain, false, 7);
        assert_eq!(
            auth.clear_cookie(),
            "admin-auth=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/admin?tab=1")), "/admin?tab=1");
        assert_eq!(safe_redirect(Some("//evil.example")), "/admin");
        assert_eq!(safe_redirect(Some("https://evil.example")), "/admin");
        assert_eq!(safe_redirect(Some("/\\evil")), "/admin");
        assert_eq!(safe_redirect(None), "/admin");
    }
}
