//! Wi-Fi credential data structures.
//!
//! Platform-independent credential type shared by the portal, the store,
//! and the connection controller. Password memory is zeroed on drop.
//!
//! # Example
//!
//! ```
//! use wifi_provisioner_esp32::creds::Credentials;
//!
//! let creds = Credentials::new("HomeNet", "secret").unwrap();
//! assert!(!creds.is_open());
//! assert!(Credentials::new("", "secret").is_err());
//! ```

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::{MAX_PASSWORD_LEN, MAX_SSID_LEN};

/// Wi-Fi credentials for joining a network as a station.
///
/// An empty password means an open network. The password is wiped from
/// memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    /// Network SSID (1-32 bytes).
    pub ssid: String,
    /// Network password (0-64 bytes, empty for open networks).
    pub password: String,
}

impl Credentials {
    /// Create validated credentials.
    ///
    /// Returns an error if the SSID is empty or either field exceeds its
    /// length bound.
    pub fn new(
        ssid: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let creds = Self {
            ssid: ssid.into(),
            password: password.into(),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Create credentials, clamping over-long fields to their bounds.
    ///
    /// Truncation lands on a character boundary so the result stays valid
    /// UTF-8. Only an empty SSID is rejected.
    pub fn truncated(ssid: &str, password: &str) -> Result<Self, CredentialError> {
        if ssid.is_empty() {
            return Err(CredentialError::SsidEmpty);
        }
        Ok(Self {
            ssid: truncate_on_char_boundary(ssid, MAX_SSID_LEN).to_string(),
            password: truncate_on_char_boundary(password, MAX_PASSWORD_LEN).to_string(),
        })
    }

    /// Validate the field bounds.
    pub fn validate(&self) -> Result<(), CredentialError> {
        if self.ssid.is_empty() {
            return Err(CredentialError::SsidEmpty);
        }
        if self.ssid.len() > MAX_SSID_LEN {
            return Err(CredentialError::SsidTooLong {
                len: self.ssid.len(),
                max: MAX_SSID_LEN,
            });
        }
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(CredentialError::PasswordTooLong {
                len: self.password.len(),
                max: MAX_PASSWORD_LEN,
            });
        }
        Ok(())
    }

    /// Check if this is an open network (no password).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// Manual Debug so the password never lands in a log line.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Truncate to at most `max_bytes`, backing up to a character boundary.
fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Errors from credential validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// SSID is empty.
    SsidEmpty,
    /// SSID exceeds maximum length.
    SsidTooLong { len: usize, max: usize },
    /// Password exceeds maximum length.
    PasswordTooLong { len: usize, max: usize },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SsidEmpty => write!(f, "SSID cannot be empty"),
            Self::SsidTooLong { len, max } => {
                write!(f, "SSID too long: {} bytes (max {})", len, max)
            }
            Self::PasswordTooLong { len, max } => {
                write!(f, "password too long: {} bytes (max {})", len, max)
            }
        }
    }
}

impl std::error::Error for CredentialError {}
