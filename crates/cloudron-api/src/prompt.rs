//! Interactive credential prompts.

use std::io::{self, BufRead, Write};

use crate::error::{ApiError, Result};

/// Username and password typed by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Cloudron username.
    pub username: String,
    /// Cloudron password.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Source of credentials for (re-)authentication.
///
/// Prompting blocks the calling flow until the user answered.
pub trait CredentialPrompt: Send + Sync {
    /// Ask for the credentials of an account on `host`.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be read.
    fn credentials(&self, host: &str) -> Result<Credentials>;
}

/// Prompts on the controlling terminal; the password is read without echo.
#[derive(Debug, Clone, Default)]
pub struct TerminalPrompt {
    username: Option<String>,
}

impl TerminalPrompt {
    /// Creates a prompt that asks for both username and password.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a prompt that only asks for the password of `username`.
    #[must_use]
    pub fn for_user(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
        }
    }
}

impl CredentialPrompt for TerminalPrompt {
    fn credentials(&self, host: &str) -> Result<Credentials> {
        eprintln!("Enter credentials for {host}");
        let username = match &self.username {
            Some(name) => name.clone(),
            None => read_line("Username: ")?,
        };
        let password = rpassword::prompt_password("Password: ")
            .map_err(|e| ApiError::Prompt(e.to_string()))?;
        Ok(Credentials { username, password })
    }
}

/// Reads a non-empty line from stdin, asking again on empty input.
///
/// # Errors
///
/// Returns an error if stdin is closed or unreadable.
pub fn read_line(label: &str) -> Result<String> {
    let stdin = io::stdin();
    let mut stderr = io::stderr();
    loop {
        write!(stderr, "{label}")?;
        stderr.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            return Err(ApiError::Prompt("stdin closed".into()));
        }
        let line = line.trim();
        if !line.is_empty() {
            return Ok(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            username: "admin".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_for_user_keeps_username() {
        let prompt = TerminalPrompt::for_user("admin");
        assert_eq!(prompt.username.as_deref(), Some("admin"));
    }
}
