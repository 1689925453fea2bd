//! 媒体处理：自描述 base64 载荷解码与远程媒体抓取接口。
//!
//! Media helpers shared by the content encoder and the audio converter.
//!
//! A *self-describing payload* carries its format together with base64 data, either as a
//! data URI (`data:image/png;base64,iVBOR...`) or as bare base64 whose format is sniffed
//! from the decoded magic bytes. Anything else is a decode failure; the image path then
//! falls back to treating the string as a remote URL via [`MediaFetcher`].

use async_trait::async_trait;
use base64::Engine as _;

use crate::{Error, ErrorContext, Result};

/// Media resolved from a remote URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub mime_type: String,
    pub base64_data: String,
}

/// Fetches remote media referenced by URL. Implementations must be cheap to share.
#[async_trait]
pub trait MediaFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, url: &str) -> Result<FetchedMedia>;
}

/// Decode a self-describing payload into `(mime_type, base64_data)`.
pub fn decode_base64_file_data(payload: &str) -> Result<(String, String)> {
    let payload = payload.trim();
    if let Some(rest) = payload.strip_prefix("data:") {
        return decode_data_uri(rest);
    }
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| {
            Error::decode_with_context(
                "payload is neither a data URI nor valid base64",
                ErrorContext::new().with_details(e.to_string()),
            )
        })?;
    let mime_type = sniff_mime_type(&bytes)
        .ok_or_else(|| Error::decode("unable to detect the format of the base64 payload"))?;
    Ok((mime_type.to_string(), payload.to_string()))
}

// `rest` is everything after `data:`, i.e. `<mime>[;params];base64,<data>`.
fn decode_data_uri(rest: &str) -> Result<(String, String)> {
    let (header, data) = rest
        .split_once(',')
        .ok_or_else(|| Error::decode("data URI has no ',' separator"))?;
    let (mime_type, params) = header
        .split_once(';')
        .ok_or_else(|| Error::decode("data URI is not base64 encoded"))?;
    if !params.split(';').any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(Error::decode("data URI is not base64 encoded"));
    }
    if mime_type.is_empty() || data.is_empty() {
        return Err(Error::decode_with_context(
            "data URI is missing its media type or data",
            ErrorContext::new().with_details(header.to_string()),
        ));
    }
    Ok((mime_type.to_string(), data.to_string()))
}

/// MIME type from magic bytes.
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    infer::get(bytes).map(|kind| kind.mime_type())
}

/// MIME type from the extension of a URL path.
pub fn guess_mime_type_from_path(path: &str) -> Option<&'static str> {
    mime_guess::from_path(path).first_raw()
}
