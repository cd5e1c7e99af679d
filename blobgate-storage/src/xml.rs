//! XML bodies exchanged with the Blob service

use serde::Deserialize;

/// Error body returned by the Blob service
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Parse an `<Error><Code/><Message/></Error>` body, if there is one
pub fn parse_error(body: &str) -> Option<ServiceErrorBody> {
    let body = body.trim_start_matches('\u{feff}').trim();
    if body.is_empty() {
        return None;
    }
    quick_xml::de::from_str(body).ok()
}

/// Format an error body the way the Blob service does
#[cfg(test)]
pub(crate) fn format_error(code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<Error>
  <Code>{}</Code>
  <Message>{}</Message>
</Error>"#,
        xml_escape(code),
        xml_escape(message)
    )
}

/// Format a Put Block List body committing `block_ids` in order
pub fn format_block_list<S: AsRef<str>>(block_ids: &[S]) -> String {
    let entries: String = block_ids
        .iter()
        .map(|id| format!("  <Latest>{}</Latest>\n", xml_escape(id.as_ref())))
        .collect();

    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<BlockList>\n{}</BlockList>",
        entries
    )
}

/// `Latest` block ids of a Put Block List body, in commit order
#[cfg(test)]
pub(crate) fn parse_block_list(body: &str) -> Result<Vec<String>, quick_xml::DeError> {
    #[derive(Deserialize)]
    struct BlockList {
        #[serde(rename = "Latest", default)]
        latest: Vec<String>,
    }

    let list: BlockList = quick_xml::de::from_str(body.trim_start_matches('\u{feff}'))?;
    Ok(list.latest)
}

/// XML escape special characters
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
