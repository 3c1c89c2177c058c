//! Identifier codec.
//!
//! Report file names are exposed to clients as opaque, URL-safe
//! identifiers: unpadded base64url of the UTF-8 file name. Decoding is
//! strict. Anything that is not a bare basename is rejected so an
//! identifier can never address a path outside the report directories.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use thiserror::Error;

use crate::channel::Channel;

/// Why an identifier failed to decode.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("identifier is not valid base64url")]
    Encoding,
    #[error("identifier does not decode to UTF-8 text")]
    NotText,
    #[error("identifier does not name a bare file: {0:?}")]
    NotBasename(String),
    #[error("'{file_name}' is not a {channel} report")]
    NotQualified { file_name: String, channel: Channel },
}

/// Encode a file name as a URL-safe identifier.
pub fn encode(file_name: &str) -> String {
    URL_SAFE_NO_PAD.encode(file_name.as_bytes())
}

/// Decode an identifier back into a bare file name.
pub fn decode(identifier: &str) -> Result<String, SlugError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(identifier.trim().as_bytes())
        .map_err(|_| SlugError::Encoding)?;
    let file_name = String::from_utf8(bytes).map_err(|_| SlugError::NotText)?;
    if basename(&file_name) != Some(file_name.as_str()) {
        return Err(SlugError::NotBasename(file_name));
    }
    Ok(file_name)
}

/// Decode an identifier and require that it names a report of `channel`.
pub fn decode_for(identifier: &str, channel: Channel) -> Result<String, SlugError> {
    let file_name = decode(identifier)?;
    if !channel.qualifies(&file_name) {
        return Err(SlugError::NotQualified { file_name, channel });
    }
    Ok(file_name)
}

/// Final path component of `path`, treating both `/` and `\` as separators.
///
/// Returns `None` for names that cannot be a file: empty, `.`, `..`, or
/// containing NUL.
pub fn basename(path: &str) -> Option<&str> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    if name.is_empty() || name == "." || name == ".." || name.contains('\0') {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for name in [
            "2024-05-02 - X 日报.md",
            "a.md",
            "spaces and ? & # chars.md",
            "emoji 🚀 日报.markdown",
        ] {
            let id = encode(name);
            assert_eq!(decode(&id).unwrap(), name);
        }
    }

    #[test]
    fn test_identifier_is_path_segment_safe() {
        let id = encode("2024-05-02 - X 日报??>>.md");
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_rejects_traversal() {
        for bad in ["../secret.md", "a/b.md", "..\\x.md", "..", ".", "", "/etc/passwd"] {
            let id = encode(bad);
            assert!(decode(&id).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(decode("***"), Err(SlugError::Encoding));
        let not_utf8 = URL_SAFE_NO_PAD.encode([0xff, 0xfe, 0x00]);
        assert_eq!(decode(&not_utf8), Err(SlugError::NotText));
    }

    #[test]
    fn test_decode_for_channel() {
        let id = encode("2024-05-02 - X 日报.md");
        assert!(decode_for(&id, Channel::Ai).is_ok());
        assert!(matches!(
            decode_for(&id, Channel::Crypto),
            Err(SlugError::NotQualified { .. })
        ));
        let html = encode("2024-05-02 - X 日报.html");
        assert!(decode_for(&html, Channel::Ai).is_err());
    }
}
