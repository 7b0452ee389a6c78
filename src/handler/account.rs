use std::io::{self, Write};

use chrono::Utc;

use crate::auth::{self, SessionCookie};
use crate::Config;

pub fn login(config: &Config, username: &str, password: Option<String>) -> anyhow::Result<()> {
    let password = match password {
        Some(password) => password,
        None => {
            print!("Password: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            line.trim_end_matches(['\n', '\r']).to_string()
        }
    };

    let Some(user) = auth::authenticate(username, &password) else {
        anyhow::bail!("Username/password is incorrect");
    };
    let cookie = SessionCookie::issue(user.username, config.cookie_expiry_days, Utc::now());
    cookie.save(&config.cookie_file, &config.cookie_key)?;
    log::info!("{} logged in until {}", user.username, cookie.expires_at);
    println!("Welcome, {}!", user.name);
    Ok(())
}

pub fn logout(config: &Config) -> anyhow::Result<()> {
    if SessionCookie::clear(&config.cookie_file)? {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub fn whoami(config: &Config) -> anyhow::Result<()> {
    match SessionCookie::load(&config.cookie_file, &config.cookie_key)? {
        Some(cookie) => {
            let name = auth::find_user(&cookie.username).map(|u| u.name).unwrap_or("unknown user");
            println!("{} ({}), session valid until {}", cookie.username, name, cookie.expires_at);
        }
        None => println!("Not logged in."),
    }
    Ok(())
}

/// The user history is scoped to. `None` when the login gate is disabled.
pub fn current_user(config: &Config) -> anyhow::Result<Option<String>> {
    if !config.auth_enabled {
        return Ok(None);
    }
    let cookie = SessionCookie::load(&config.cookie_file, &config.cookie_key)?
        .ok_or_else(|| anyhow::anyhow!("Please log in first: docqa login <username>"))?;
    if auth::find_user(&cookie.username).is_none() {
        anyhow::bail!("Unknown user {}, please log in again", cookie.username);
    }
    Ok(Some(cookie.username))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(dir: &tempfile::TempDir, auth_enabled: bool) -> Config {
        let mut config = Config::default();
        config.auth_enabled = auth_enabled;
        config.cookie_file = dir.path().join("session");
        config
    }

    #[test]
    fn test_gate_disabled() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        assert_eq!(current_user(&config(&dir, false))?, None);
        Ok(())
    }

    #[test]
    fn test_gate_requires_login() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = config(&dir, true);
        assert!(current_user(&config).is_err());

        login(&config, "jsmith", Some("abc".to_string()))?;
        assert_eq!(current_user(&config)?, Some("jsmith".to_string()));

        logout(&config)?;
        assert!(current_user(&config).is_err());
        Ok(())
    }

    #[test]
    fn test_wrong_password() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = config(&dir, true);
        assert!(login(&config, "jsmith", Some("wrong".to_string())).is_err());
        assert!(!config.cookie_file.exists());
        Ok(())
    }
}
