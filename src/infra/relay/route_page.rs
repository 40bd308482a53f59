//! Extraction of the ordered stop list from the relay's route page markup.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::services::route_stop_source::OrderedStop;

// Each stop is a link carrying `dkod=<code>` and a form-encoded
// `stationname=`, followed by `<p>N. Name</p>`.
static STOP_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)dkod=(\d+)[^"]*stationname=([^"&]+)[^>]*>.*?<p>(\d+)\.\s*([^<]+)"#)
        .expect("static regex")
});

/// Pulls `(seq, code, name)` triples out of a route page, in document order.
///
/// Markup that matches nothing yields an empty list.
pub fn extract_ordered_stops(html: &str) -> Vec<OrderedStop> {
    STOP_ENTRY
        .captures_iter(html)
        .filter_map(|caps| {
            let seq = caps[3].parse::<u32>().ok()?;
            let code = caps[1].to_string();
            let name = station_name(&caps[2], &caps[4]);
            Some(OrderedStop { seq, code, name })
        })
        .collect()
}

fn station_name(encoded: &str, fallback: &str) -> String {
    let plus_decoded = encoded.trim().replace('+', " ");
    let decoded = urlencoding::decode(&plus_decoded).unwrap_or(Cow::Borrowed(&plus_decoded));
    let name = decoded.trim();

    let name = if name.is_empty() { fallback.trim() } else { name };
    html_escape::decode_html_entities(name).into_owned()
}
