//! `data:` URI helpers for moving images around as plain strings.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::ACCEPTED_EXTENSIONS;

pub fn encode_data_uri(bytes: &[u8], mime_type: &str) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

/// Returns the MIME type and raw bytes of a base64 `data:` URI.
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| anyhow!("not a data uri"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| anyhow!("data uri has no payload separator"))?;
    let mime_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| anyhow!("only base64 data uris are supported"))?;
    let bytes = STANDARD
        .decode(payload.trim())
        .context("invalid base64 payload in data uri")?;
    Ok((mime_type.to_string(), bytes))
}

pub fn mime_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

pub fn is_accepted_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ACCEPTED_EXTENSIONS
                .iter()
                .any(|accepted| ext.eq_ignore_ascii_case(accepted))
        })
        .unwrap_or(false)
}

/// File extension matching a MIME type, for naming exported images.
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_what_it_encodes() {
        let uri = encode_data_uri(b"floor plan", "image/png");
        assert!(uri.starts_with("data:image/png;base64,"));

        let (mime, bytes) = decode_data_uri(&uri).expect("decode");
        assert_eq!(mime, "image/png");
        assert_eq!(bytes, b"floor plan");
    }

    #[test]
    fn rejects_non_base64_uris() {
        assert!(decode_data_uri("https://example.com/a.png").is_err());
        assert!(decode_data_uri("data:text/plain,hello").is_err());
        assert!(decode_data_uri("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn allowlist_is_case_insensitive() {
        assert!(is_accepted_image("plan.JPG"));
        assert!(is_accepted_image("plan.jpeg"));
        assert!(is_accepted_image("dir/plan.png"));
        assert!(!is_accepted_image("plan.gif"));
        assert!(!is_accepted_image("plan"));
    }

    #[test]
    fn guesses_mime_from_extension() {
        assert_eq!(mime_type_for("plan.jpg"), "image/jpeg");
        assert_eq!(mime_type_for("plan.png"), "image/png");
        assert_eq!(mime_type_for("plan"), "application/octet-stream");
    }
}
