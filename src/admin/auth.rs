//! Admin token authentication.

use serde::Deserialize;

/// Query parameters accepted by the admin endpoints.
#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    pub token: Option<String>,
}

/// Exact, case-sensitive comparison against the configured token.
pub fn token_matches(query: &AdminQuery, expected: &str) -> bool {
    query.token.as_deref() == Some(expected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(token: Option<&str>) -> AdminQuery {
        AdminQuery {
            token: token.map(str::to_string),
        }
    }

    #[test]
    fn exact_match_required() {
        assert!(token_matches(&query(Some("secret")), "secret"));
        assert!(!token_matches(&query(Some("Secret")), "secret"));
        assert!(!token_matches(&query(Some("")), "secret"));
        assert!(!token_matches(&query(None), "secret"));
    }
}
