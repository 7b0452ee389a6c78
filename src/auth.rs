use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub username: &'static str,
    pub name: &'static str,
    /// `sha256$<salt>$<hex digest of salt + password>`
    pub password_hash: &'static str,
}

pub static USERS: &[User] = &[
    User {
        username: "jsmith",
        name: "John Smith",
        password_hash: "sha256$9f2c41d7b8e05a36$071fba57bd87111c0fa60ed39da4554a295fbaec4f1e00e0f17c8cdb6a47aba5",
    },
    User {
        username: "rbriggs",
        name: "Rebecca Briggs",
        password_hash: "sha256$4e81a0c3d97b2f15$1f270f8c99a651f2c4d394cf3d40176c85e547a50a2138c964b6ba9530c0d209",
    },
];

pub fn find_user(username: &str) -> Option<&'static User> {
    USERS.iter().find(|user| user.username == username)
}

pub fn hash_password(salt: &str, password: &str) -> String {
    let digest = Sha256::digest(format!("{}{}", salt, password).as_bytes());
    format!("sha256${}${:x}", salt, digest)
}

/// Hashes are demo credentials for the built-in users; compared in constant time.
pub fn verify_password(user: &User, password: &str) -> bool {
    match user.password_hash.split('$').collect::<Vec<_>>().as_slice() {
        ["sha256", salt, _] => hash_password(salt, password)
            .as_bytes()
            .ct_eq(user.password_hash.as_bytes())
            .into(),
        _ => false,
    }
}

/// Looks the user up and checks the password.
pub fn authenticate(username: &str, password: &str) -> Option<&'static User> {
    let user = find_user(username)?;
    if verify_password(user, password) {
        Some(user)
    } else {
        log::warn!("Rejected login for {}", username);
        None
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Login kept in the cookie file as an HS256 JWT signed with the cookie key.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCookie {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionCookie {
    pub fn issue(username: &str, expiry_days: i64, now: DateTime<Utc>) -> Self {
        Self {
            username: username.to_string(),
            expires_at: now + Duration::days(expiry_days),
        }
    }

    pub fn encode(&self, key: &str) -> anyhow::Result<String> {
        let claims = Claims {
            sub: self.username.clone(),
            exp: self.expires_at.timestamp(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(key.as_bytes()))
            .context("Failed to sign session cookie")
    }

    /// Verifies signature and expiry against the current time.
    pub fn decode(token: &str, key: &str) -> anyhow::Result<Self> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let claims = decode::<Claims>(token.trim(), &DecodingKey::from_secret(key.as_bytes()), &validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => anyhow::anyhow!("Session expired, please log in again"),
                _ => anyhow::anyhow!("Invalid session cookie: {}", err),
            })?
            .claims;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| anyhow::anyhow!("Invalid session cookie expiry"))?;
        Ok(Self { username: claims.sub, expires_at })
    }

    pub fn save(&self, path: &Path, key: &str) -> anyhow::Result<()> {
        std::fs::write(path, self.encode(key)?)
            .with_context(|| format!("Cannot write session cookie {}", path.display()))
    }

    /// `Ok(None)` when no cookie has been written.
    pub fn load(path: &Path, key: &str) -> anyhow::Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let token = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read session cookie {}", path.display()))?;
        Self::decode(&token, key).map(Some)
    }

    pub fn clear(path: &Path) -> anyhow::Result<bool> {
        if path.exists() {
            std::fs::remove_file(path)?;
            return Ok(true);
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_coded_passwords() {
        assert!(authenticate("jsmith", "abc").is_some());
        assert!(authenticate("rbriggs", "def").is_some());
        assert!(authenticate("jsmith", "def").is_none());
        assert!(authenticate("nobody", "abc").is_none());
    }

    #[test]
    fn test_hash_format() {
        let hash = hash_password("salt", "pw");
        assert!(hash.starts_with("sha256$salt$"));
        assert_eq!(hash.len(), "sha256$salt$".len() + 64);
    }

    #[test]
    fn test_password_mismatch_lengths() {
        let user = User { username: "x", name: "X", password_hash: "sha256$s$abc" };
        assert!(!verify_password(&user, "anything"));
        let malformed = User { username: "y", name: "Y", password_hash: "plain" };
        assert!(!verify_password(&malformed, "plain"));
    }

    #[test]
    fn test_cookie_round_trip() -> anyhow::Result<()> {
        let cookie = SessionCookie::issue("jsmith", 30, Utc::now());
        let token = cookie.encode("key")?;
        assert_eq!(token.split('.').count(), 3);
        let decoded = SessionCookie::decode(&token, "key")?;
        assert_eq!(decoded.username, "jsmith");
        assert_eq!(decoded.expires_at.timestamp(), cookie.expires_at.timestamp());
        Ok(())
    }

    #[test]
    fn test_cookie_is_hs256_jwt() -> anyhow::Result<()> {
        let token = SessionCookie::issue("jsmith", 1, Utc::now()).encode("key")?;
        let header = jsonwebtoken::decode_header(&token)?;
        assert_eq!(header.alg, jsonwebtoken::Algorithm::HS256);
        Ok(())
    }

    #[test]
    fn test_tampered_cookie_rejected() -> anyhow::Result<()> {
        let now = Utc::now();
        let token = SessionCookie::issue("jsmith", 30, now).encode("key")?;
        let forged_claims = SessionCookie::issue("rbriggs", 30, now).encode("key")?;
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = forged_claims.split('.').nth(1).unwrap();
        let forged = parts.join(".");

        assert!(SessionCookie::decode(&forged, "key").is_err());
        assert!(SessionCookie::decode(&token, "other-key").is_err());
        assert!(SessionCookie::decode("garbage", "key").is_err());
        Ok(())
    }

    #[test]
    fn test_expired_cookie_rejected() -> anyhow::Result<()> {
        let token = SessionCookie::issue("jsmith", -1, Utc::now()).encode("key")?;
        let err = SessionCookie::decode(&token, "key").unwrap_err();
        assert_eq!(err.to_string(), "Session expired, please log in again");

        let fresh = SessionCookie::issue("jsmith", 1, Utc::now()).encode("key")?;
        assert!(SessionCookie::decode(&fresh, "key").is_ok());
        Ok(())
    }

    #[test]
    fn test_cookie_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session");
        assert_eq!(SessionCookie::load(&path, "key")?, None);

        SessionCookie::issue("rbriggs", 1, Utc::now()).save(&path, "key")?;
        let loaded = SessionCookie::load(&path, "key")?;
        assert_eq!(loaded.map(|c| c.username), Some("rbriggs".to_string()));

        assert!(SessionCookie::clear(&path)?);
        assert!(!SessionCookie::clear(&path)?);
        Ok(())
    }
}
