use crate::{IndexError, SearchIndex};

const ENVELOPE_PREFIX: &str = "Search.setIndex(";
const ENVELOPE_SUFFIX: &str = ")";

/// Parse a `searchindex.js` body: `Search.setIndex({...})`, optionally followed by `;`.
pub fn parse_js(src: &str) -> Result<SearchIndex, IndexError> {
    let trimmed = src.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    let payload = trimmed
        .strip_prefix(ENVELOPE_PREFIX)
        .and_then(|rest| rest.strip_suffix(ENVELOPE_SUFFIX))
        .ok_or(IndexError::MissingEnvelope)?;
    parse_json(payload)
}

/// Parse the bare JSON object carried inside the envelope.
pub fn parse_json(src: &str) -> Result<SearchIndex, IndexError> {
    let index: SearchIndex = serde_json::from_str(src)?;
    tracing::debug!(
        docs = index.num_docs(),
        terms = index.terms.len(),
        titleterms = index.titleterms.len(),
        "parsed search index"
    );
    Ok(index)
}

/// Accept either form: a leading `{` means bare JSON, anything else the JS envelope.
pub fn parse(src: &str) -> Result<SearchIndex, IndexError> {
    if src.trim_start().starts_with('{') {
        parse_json(src)
    } else {
        parse_js(src)
    }
}

pub fn to_json(index: &SearchIndex) -> Result<String, IndexError> {
    Ok(serde_json::to_string(index)?)
}

/// Render the index back into the envelope the search widget expects.
pub fn to_js(index: &SearchIndex) -> Result<String, IndexError> {
    Ok(format!("{ENVELOPE_PREFIX}{}{ENVELOPE_SUFFIX}", to_json(index)?))
}
