//! XML parser for prediction service responses.
//!
//! A response looks like:
//!
//! ```xml
//! <body copyright="...">
//!   <predictions agencyTitle="AC Transit" routeTag="210" stopTag="0702640">
//!     <direction title="To Ohlone College">
//!       <prediction epochTime="1487277081162" seconds="300" minutes="5" />
//!       <prediction epochTime="1487277381162" seconds="600" minutes="10" />
//!     </direction>
//!   </predictions>
//! </body>
//! ```
//!
//! Request problems come back as `<body><Error shouldRetry="false">...</Error></body>`.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::FetchError;

/// Extracts the `seconds` attribute of every `prediction` element, in
/// document order.
///
/// A well-formed document with no `prediction` elements yields an empty list.
///
/// # Errors
///
/// - [`FetchError::EmptyBody`] for a blank body.
/// - [`FetchError::Upstream`] if the service returned an `Error` element.
/// - [`FetchError::Malformed`] for invalid XML, a truncated document, or a
///   `prediction` without a non-negative integer `seconds`.
pub fn parse_predictions(bytes: &[u8]) -> Result<Vec<u32>, FetchError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| FetchError::Malformed(format!("body is not UTF-8: {e}")))?;
    if text.trim().is_empty() {
        return Err(FetchError::EmptyBody);
    }

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut arrivals = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;
    let mut upstream_error: Option<String> = None;
    let mut in_error = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            FetchError::Malformed(format!("at byte {}: {e}", reader.buffer_position()))
        })?;

        match event {
            Event::Start(e) => {
                saw_root = true;
                depth += 1;
                if is_error_element(&e) {
                    in_error = true;
                    upstream_error.get_or_insert_with(String::new);
                } else if e.local_name().as_ref() == b"prediction" {
                    arrivals.push(seconds_attr(&e)?);
                }
            }
            Event::Empty(e) => {
                saw_root = true;
                if is_error_element(&e) {
                    upstream_error.get_or_insert_with(String::new);
                } else if e.local_name().as_ref() == b"prediction" {
                    arrivals.push(seconds_attr(&e)?);
                }
            }
            Event::Text(t) if in_error => {
                let message = t
                    .unescape()
                    .map_err(|e| FetchError::Malformed(e.to_string()))?;
                if let Some(existing) = upstream_error.as_mut() {
                    existing.push_str(message.trim());
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if e.local_name().as_ref() == b"Error" {
                    in_error = false;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(FetchError::Malformed("no root element".into()));
    }
    if depth != 0 {
        return Err(FetchError::Malformed("truncated document".into()));
    }
    if let Some(message) = upstream_error {
        return Err(FetchError::Upstream(message));
    }

    Ok(arrivals)
}

fn is_error_element(e: &BytesStart<'_>) -> bool {
    e.local_name().as_ref() == b"Error"
}

fn seconds_attr(e: &BytesStart<'_>) -> Result<u32, FetchError> {
    let attr = e
        .try_get_attribute("seconds")
        .map_err(|err| FetchError::Malformed(err.to_string()))?
        .ok_or_else(|| FetchError::Malformed("prediction without seconds".into()))?;
    let value = attr
        .unescape_value()
        .map_err(|err| FetchError::Malformed(err.to_string()))?;

    value
        .trim()
        .parse::<u32>()
        .map_err(|_| FetchError::Malformed(format!("invalid seconds value {value:?}")))
}
