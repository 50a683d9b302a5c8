use std::sync::LazyLock;

use regex::Regex;

/// `data:image/<subtype>;base64,` prefix of an uploaded image
static DATA_URI_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:(image/[a-zA-Z0-9]+);base64,").expect("data URI pattern is valid")
});

/// Image split out of a data URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

/// Parse `data:image/png;base64,AAAA` into its MIME type and payload
///
/// Returns `None` when the prefix is not an image data URI or the payload is empty.
pub fn parse_data_uri(uri: &str) -> Option<InlineImage> {
    let captures = DATA_URI_PREFIX.captures(uri)?;
    let mime_type = captures.get(1)?.as_str().to_string();
    let prefix_len = captures.get(0)?.end();

    let data = &uri[prefix_len..];
    if data.is_empty() {
        return None;
    }

    Some(InlineImage {
        mime_type,
        data: data.to_string(),
    })
}
