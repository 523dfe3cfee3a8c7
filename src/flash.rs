// Parking Vecinal - One-shot flash messages
// A single success/error/info message rides a signed cookie across the
// redirect after a mutation and is consumed by the next rendered page.

use axum_extra::extract::cookie::{Cookie, Key, SignedCookieJar};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
    Info,
}

impl Level {
    /// CSS class used by the page layout.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
            Level::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
        }
    }
}

/// Derive the cookie signing key from the configured secret.
/// `Key::from` wants 64 bytes, so the secret is stretched with SHA-256.
pub fn signing_key(secret: &str) -> Key {
    let mut material = [0u8; 64];
    material[..32].copy_from_slice(Sha256::digest(format!("{secret}:sign")).as_slice());
    material[32..].copy_from_slice(Sha256::digest(format!("{secret}:verify")).as_slice());
    Key::from(&material)
}

/// Queue a flash message for the next rendered page.
pub fn set_flash(jar: SignedCookieJar, flash: &Flash) -> SignedCookieJar {
    // Percent-encode the JSON payload so it is always a valid cookie value
    let payload = serde_json::to_string(flash).unwrap_or_default();
    let value = urlencoding::encode(&payload).into_owned();

    jar.add(
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true),
    )
}

/// Consume the pending flash message, if any.
pub fn take_flash(jar: SignedCookieJar) -> (SignedCookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };

    let raw = cookie.value().to_string();
    let jar = jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/"));
    let flash = urlencoding::decode(&raw)
        .ok()
        .and_then(|json| serde_json::from_str(&json).ok());

    (jar, flash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    #[test]
    fn test_signing_key_is_deterministic() {
        assert_eq!(
            signing_key("dev-secret-key").master(),
            signing_key("dev-secret-key").master()
        );
        assert_ne!(
            signing_key("dev-secret-key").master(),
            signing_key("other").master()
        );
    }

    #[test]
    fn test_set_then_take_roundtrip() {
        let jar = SignedCookieJar::from_headers(&HeaderMap::new(), signing_key("test"));
        let jar = set_flash(jar, &Flash::success("Vecino registrado correctamente"));

        let (jar, flash) = take_flash(jar);
        assert_eq!(
            flash,
            Some(Flash::success("Vecino registrado correctamente"))
        );

        // Consumed: a second read comes back empty
        let (_, again) = take_flash(jar);
        assert!(again.is_none());
    }

    #[test]
    fn test_take_without_pending_flash() {
        let jar = SignedCookieJar::from_headers(&HeaderMap::new(), signing_key("test"));
        let (_, flash) = take_flash(jar);
        assert!(flash.is_none());
    }

    #[test]
    fn test_message_survives_accents_and_quotes() {
        let jar = SignedCookieJar::from_headers(&HeaderMap::new(), signing_key("test"));
        let original = Flash::error("Vehículo \"fantasma\" eliminado; á é í");
        let jar = set_flash(jar, &original);

        let (_, flash) = take_flash(jar);
        assert_eq!(flash, Some(original));
    }
}
