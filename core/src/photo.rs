//! Embeddable photo representation.
//!
//! A photo travels as a `data:<mime>;base64,<payload>` URI, both on the wire
//! and in memory. The string is stored once when a file is attached and sent
//! back verbatim, so nothing is re-encoded between the form and the server.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::PhotoError;

const BASE64_MARKER: &str = ";base64,";

/// A self-contained image as a base64 data URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Photo(String);

impl Photo {
    /// Encode raw image file bytes, sniffing the MIME type from the content.
    pub fn encode(bytes: &[u8]) -> Result<Self, PhotoError> {
        if bytes.is_empty() {
            return Err(PhotoError::Empty);
        }
        let mime = sniff_mime(bytes).ok_or(PhotoError::UnsupportedFormat)?;
        Ok(Self(format!("data:{mime}{BASE64_MARKER}{}", STANDARD.encode(bytes))))
    }

    /// Encode on the blocking pool so large files never stall the caller's
    /// executor thread.
    pub async fn encode_in_background(bytes: Vec<u8>) -> Result<Self, PhotoError> {
        tokio::task::spawn_blocking(move || Self::encode(&bytes))
            .await
            .map_err(|e| PhotoError::Join(e.to_string()))?
    }

    /// Accept an existing data URI, e.g. one received from the server.
    pub fn parse(uri: &str) -> Result<Self, PhotoError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| PhotoError::InvalidDataUri("missing data: scheme".to_string()))?;
        let (mime, _) = rest
            .split_once(BASE64_MARKER)
            .ok_or_else(|| PhotoError::InvalidDataUri("payload is not base64".to_string()))?;
        if mime.is_empty() {
            return Err(PhotoError::InvalidDataUri("missing mime type".to_string()));
        }
        Ok(Self(uri.to_string()))
    }

    pub fn mime_type(&self) -> &str {
        self.0["data:".len()..]
            .split_once(BASE64_MARKER)
            .map(|(mime, _)| mime)
            .unwrap_or_default()
    }

    /// Decode the payload back to the original file bytes.
    pub fn decode(&self) -> Result<Vec<u8>, PhotoError> {
        let (_, payload) = self
            .0
            .split_once(BASE64_MARKER)
            .ok_or_else(|| PhotoError::InvalidDataUri("payload is not base64".to_string()))?;
        STANDARD
            .decode(payload)
            .map_err(|e| PhotoError::InvalidDataUri(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Photo {
    type Error = PhotoError;

    fn try_from(uri: String) -> Result<Self, Self::Error> {
        Self::parse(&uri)
    }
}

impl From<Photo> for String {
    fn from(photo: Photo) -> Self {
        photo.0
    }
}

impl fmt::Display for Photo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identify common web image formats by their magic bytes.
fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

    if bytes.starts_with(PNG) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"BM") && bytes.len() >= 14 {
        return Some("image/bmp");
    }
    if bytes.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        return Some("image/x-icon");
    }

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(512)]);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
        return Some("image/svg+xml");
    }
    None
}
