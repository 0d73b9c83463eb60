use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{header, HeaderMap, Method, Uri};
use folio_core::RequestSignals;

/// Collect the resolver inputs from request parts.
///
/// Non-UTF-8 header values are skipped and an unparseable query string
/// yields no parameters.
pub fn request_signals(method: &Method, uri: &Uri, headers: &HeaderMap) -> RequestSignals {
    let mut out = RequestSignals {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        host: host_of(uri, headers),
        headers: HashMap::new(),
        query: Query::<HashMap<String, String>>::try_from_uri(uri)
            .map(|Query(q)| q)
            .unwrap_or_default(),
    };

    for (k, v) in headers.iter() {
        if let Ok(s) = v.to_str() {
            out.headers.insert(k.as_str().to_string(), s.to_string());
        }
    }

    out
}

fn host_of(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.host().to_string()))
}
