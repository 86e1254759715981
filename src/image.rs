//! Data URLs: how images travel from the client to the gateway.

use anyhow::{Context, Result, bail};
use base64::{Engine, engine::general_purpose::STANDARD};
use std::path::Path;

const PREFIX: &str = "data:";

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    pub fn is_image(&self) -> bool {
        is_image_mime(&self.mime)
    }
}

pub fn is_data_url(s: &str) -> bool {
    s.get(..PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(PREFIX))
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.to_ascii_lowercase().starts_with("image/")
}

/// `data:<mime>;base64,<payload>`
pub fn encode(bytes: &[u8], mime: &str) -> String {
    format!("{PREFIX}{mime};base64,{}", STANDARD.encode(bytes))
}

/// Parse a data URL. Base64 payloads are decoded; anything else is taken
/// as literal bytes. A missing media type means `text/plain`.
pub fn decode(url: &str) -> Result<DataUrl> {
    if !is_data_url(url) {
        bail!("not a data URL");
    }
    let rest = &url[PREFIX.len()..];
    let (meta, payload) = rest
        .split_once(',')
        .context("data URL has no payload separator")?;

    let mut parts = meta.split(';');
    let mime = parts
        .next()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("text/plain")
        .to_string();
    let base64 = parts.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let bytes = if base64 {
        STANDARD
            .decode(payload.trim())
            .context("data URL payload is not valid base64")?
    } else {
        payload.as_bytes().to_vec()
    };
    Ok(DataUrl { mime, bytes })
}

/// Guess the media type from the content itself.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}

/// Read a photo from disk into a data URL. Non-images are refused.
pub fn load_image(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mime = sniff_mime(&bytes)
        .filter(|m| is_image_mime(m))
        .with_context(|| format!("{} is not an image", path.display()))?;
    Ok(encode(&bytes, mime))
}
