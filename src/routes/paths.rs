//! Lenient path matching in front of the strict router.
//!
//! The site's URLs are registered with trailing slashes (`/admin/users/`),
//! but clients may omit the slash or change letter case (`/Admin/Users`).
//! [`PathTable`] remembers every registered pattern; [`normalize_path`]
//! rewrites a request path onto the registered spelling before routing.
//! Literal segments compare case-insensitively, captures keep the client's
//! spelling, and paths that match nothing are left alone for the 404
//! handler.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::Uri;
use axum::http::uri::PathAndQuery;
use axum::middleware::Next;
use axum::response::Response;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture,
}

/// Every path the router answers, in registration order.
#[derive(Debug, Clone, Default)]
pub struct PathTable {
    patterns: Vec<Vec<Segment>>,
}

/// `/a/b/` and `/a/b` both split to `["a", "b"]`; `/` splits to `[]`.
fn split(path: &str) -> Option<Vec<&str>> {
    let inner = path.strip_prefix('/')?;
    let inner = inner.strip_suffix('/').unwrap_or(inner);
    if inner.is_empty() {
        return Some(Vec::new());
    }
    Some(inner.split('/').collect())
}

impl PathTable {
    /// Register an axum route pattern such as `/admin/users/{id}/`.
    pub fn insert(&mut self, pattern: &str) {
        let segments = split(pattern)
            .unwrap_or_default()
            .into_iter()
            .map(|s| {
                if s.starts_with('{') && s.ends_with('}') {
                    Segment::Capture
                } else {
                    Segment::Literal(s.to_owned())
                }
            })
            .collect();
        self.patterns.push(segments);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Registered spelling of `path`, or `None` if no pattern matches.
    ///
    /// When several patterns match, the one with the most literal segments
    /// wins, mirroring the router's static-over-capture priority.
    #[must_use]
    pub fn canonicalize(&self, path: &str) -> Option<String> {
        let parts = split(path)?;
        let mut best: Option<(usize, &[Segment])> = None;

        for pattern in &self.patterns {
            if pattern.len() != parts.len() {
                continue;
            }
            let matches = pattern.iter().zip(&parts).all(|(segment, part)| match segment {
                Segment::Literal(literal) => literal.eq_ignore_ascii_case(part),
                Segment::Capture => !part.is_empty(),
            });
            if !matches {
                continue;
            }
            let literals = pattern.iter().filter(|s| matches!(s, Segment::Literal(_))).count();
            if best.is_none_or(|(n, _)| literals > n) {
                best = Some((literals, pattern.as_slice()));
            }
        }

        let (_, pattern) = best?;
        if pattern.is_empty() {
            return Some("/".to_owned());
        }
        let joined = pattern
            .iter()
            .zip(&parts)
            .map(|(segment, part)| match segment {
                Segment::Literal(literal) => literal.as_str(),
                Segment::Capture => *part,
            })
            .collect::<Vec<_>>()
            .join("/");
        Some(format!("/{joined}/"))
    }
}

fn with_path(uri: &Uri, path: &str) -> Option<Uri> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_owned(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query.parse::<PathAndQuery>().ok()?);
    Uri::from_parts(parts).ok()
}

/// Middleware: rewrite the request path onto its registered spelling.
///
/// `OriginalUri` is already set by the outer router, so guards and handlers
/// still see the URL the client sent.
pub async fn normalize_path(State(table): State<Arc<PathTable>>, mut req: Request, next: Next) -> Response {
    if let Some(canonical) = table.canonicalize(req.uri().path()) {
        if canonical != req.uri().path() {
            if let Some(uri) = with_path(req.uri(), &canonical) {
                tracing::trace!(from = %req.uri().path(), to = %canonical, "normalized path");
                *req.uri_mut() = uri;
            }
        }
    }
    next.run(req).await
}

#[cfg(test)]
#[path = "paths_test.rs"]
mod tests;
