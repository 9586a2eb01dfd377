//! Urlencoded form parsing for the credential submission route.
//!
//! The submit body is `application/x-www-form-urlencoded` with an
//! `ssid` field and an optional `password` field. Decoding follows the
//! encoding browsers actually produce (`+` for space, `%XX` escapes);
//! malformed escapes pass through verbatim rather than failing the
//! whole submission, but a field that decodes to invalid UTF-8 is
//! rejected. For a repeated key the first occurrence wins.

use std::error::Error;
use std::fmt;

use crate::creds::{CredentialError, Credentials};

/// Why a submitted form could not be turned into credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// No `ssid` field in the body.
    MissingSsid,
    /// A field decoded to bytes that are not valid UTF-8.
    NotUtf8,
    /// The fields were present but fail credential validation.
    Credential(CredentialError),
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSsid => write!(f, "Missing 'ssid' parameter"),
            Self::NotUtf8 => write!(f, "Field is not valid UTF-8"),
            Self::Credential(e) => write!(f, "{}", e),
        }
    }
}

impl Error for FormError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MissingSsid | Self::NotUtf8 => None,
            Self::Credential(e) => Some(e),
        }
    }
}

impl From<CredentialError> for FormError {
    fn from(e: CredentialError) -> Self {
        Self::Credential(e)
    }
}

/// Parse a submit body into validated credentials.
///
/// A missing `password` field submits an open network; a missing
/// `ssid` field is an error.
pub fn parse_connect(body: &str) -> Result<Credentials, FormError> {
    let ssid = into_text(field(body, "ssid").ok_or(FormError::MissingSsid)?)?;
    let password = match field(body, "password") {
        Some(bytes) => into_text(bytes)?,
        None => String::new(),
    };
    Ok(Credentials::new(ssid, password)?)
}

/// First occurrence of `key` in the body, as decoded bytes. `None` if
/// the key is absent.
pub fn field(body: &str, key: &str) -> Option<Vec<u8>> {
    for pair in body.split('&') {
        let (k, v) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        if percent_decode(k) == key.as_bytes() {
            return Some(percent_decode(v));
        }
    }
    None
}

fn into_text(bytes: Vec<u8>) -> Result<String, FormError> {
    String::from_utf8(bytes).map_err(|_| FormError::NotUtf8)
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

fn percent_decode(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                match (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push(hi << 4 | lo);
                        i += 3;
                    }
                    _ => {
                        // Not a valid escape, keep the literal percent
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}
