//! Token codec: [`ViewState`] to a URL-safe string and back.
//!
//! Two token formats exist:
//! - **Plain**: JSON, base64, URL-escape
//! - **Deflate**: JSON, zlib deflate, base64, URL-escape
//!
//! Tokens carry no format tag, so the format is a build-time choice
//! ([`TokenFormat::BUILD`]) and a page can only read tokens written by a
//! build using the same format.

mod escape;

pub use escape::{EscapeError, escape_component, unescape_component};

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use miniz_oxide::inflate::TINFLStatus;
use thiserror::Error;

use crate::state::ViewState;

/// Upper bound on the inflated size of a deflate token.
pub const MAX_INFLATED_BYTES: usize = 4 * 1024 * 1024;

const DEFLATE_LEVEL: u8 = 9;

/// Why a token could not be turned back into a [`ViewState`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("token is empty")]
    Empty,
    #[error("bad URL escaping: {0}")]
    Escape(#[from] EscapeError),
    #[error("bad base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("inflate failed: {0}")]
    Inflate(String),
    #[error("inflated payload exceeds {MAX_INFLATED_BYTES} bytes")]
    TooLarge,
    #[error("bad state payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Encoding pipeline used for tokens.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFormat {
    Plain,
    Deflate,
}

impl TokenFormat {
    /// The format this build reads and writes.
    pub const BUILD: Self = if cfg!(feature = "compressed-token") {
        Self::Deflate
    } else {
        Self::Plain
    };
}

/// Opaque, URL-safe encoding of a [`ViewState`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    format: TokenFormat,
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(TokenFormat::BUILD)
    }
}

impl Codec {
    pub const fn new(format: TokenFormat) -> Self {
        Self { format }
    }

    pub const fn format(self) -> TokenFormat {
        self.format
    }

    /// Encode `state` into a token.
    ///
    /// # Panics
    ///
    /// Only if serde_json cannot serialize a struct of strings, which would
    /// be a bug rather than a runtime condition.
    pub fn encode(self, state: &ViewState) -> Token {
        let json = serde_json::to_vec(state).expect("view state is always serializable");
        let bytes = match self.format {
            TokenFormat::Plain => json,
            TokenFormat::Deflate => miniz_oxide::deflate::compress_to_vec_zlib(&json, DEFLATE_LEVEL),
        };
        Token(escape_component(&STANDARD.encode(bytes)))
    }

    /// Decode a token produced by [`Codec::encode`] with the same format.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] naming the first stage that rejected the input.
    pub fn decode(self, token: &str) -> Result<ViewState, DecodeError> {
        if token.is_empty() {
            return Err(DecodeError::Empty);
        }
        let base64_text = unescape_component(token)?;
        let raw = STANDARD.decode(base64_text.as_bytes())?;
        let json = match self.format {
            TokenFormat::Plain => raw,
            TokenFormat::Deflate => inflate(&raw)?,
        };
        Ok(serde_json::from_slice(&json)?)
    }
}

fn inflate(raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    miniz_oxide::inflate::decompress_to_vec_zlib_with_limit(raw, MAX_INFLATED_BYTES).map_err(
        |err| match err.status {
            TINFLStatus::HasMoreOutput => DecodeError::TooLarge,
            _ => DecodeError::Inflate(err.to_string()),
        },
    )
}
