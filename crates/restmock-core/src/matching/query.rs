//! URL splitting and query-string parsing.

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Split a raw URL into path and query-string parts (no `?` included).
pub fn split_url(raw_url: &str) -> (&str, &str) {
    match raw_url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (raw_url, ""),
    }
}

/// Parse a query string into a map with percent-decoding.
///
/// Repeated keys accumulate comma-separated, which is also the shape the
/// index array filter consumes (`?id=1,3`).
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    let mut params: HashMap<String, String> = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = percent_decode(key);
        let value = percent_decode(value);
        match params.entry(key) {
            Entry::Occupied(mut slot) => {
                let joined = slot.get_mut();
                joined.push(',');
                joined.push_str(&value);
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }
    params
}

fn percent_decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.to_string())
}
