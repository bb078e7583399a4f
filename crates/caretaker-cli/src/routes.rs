//! Route table of the maintenance client.

use caretaker_core::navigation::{RouteMeta, RouteRequest};

/// Known path patterns; `:id` matches one non-empty segment.
const ROUTES: &[(&str, RouteKind)] = &[
    ("/", RouteKind::Protected),
    ("/login", RouteKind::GuestOnly),
    ("/register", RouteKind::GuestOnly),
    ("/accommodations", RouteKind::Protected),
    ("/accommodations/:id", RouteKind::Protected),
    ("/tasks", RouteKind::Protected),
    ("/tasks/:id", RouteKind::Protected),
    ("/costs", RouteKind::Protected),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteKind {
    Protected,
    GuestOnly,
}

impl RouteKind {
    fn meta(self) -> RouteMeta {
        match self {
            RouteKind::Protected => RouteMeta::protected(),
            RouteKind::GuestOnly => RouteMeta::guest_only(),
        }
    }
}

/// Builds the request for `full_path`. Unknown paths resolve to the public
/// not-found view.
pub fn resolve(full_path: &str) -> RouteRequest {
    let path = full_path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let path = match path.trim_end_matches('/') {
        "" => "/",
        trimmed => trimmed,
    };

    let meta = ROUTES
        .iter()
        .find(|(pattern, _)| matches(pattern, path))
        .map(|(_, kind)| kind.meta())
        .unwrap_or_else(RouteMeta::public);

    RouteRequest::new(full_path, meta)
}

fn matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(p), Some(s)) if p.starts_with(':') && !s.is_empty() => {}
            (Some(p), Some(s)) if p == s => {}
            _ => return false,
        }
    }
}
