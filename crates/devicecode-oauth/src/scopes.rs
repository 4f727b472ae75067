//! Requested permission scopes.

use std::fmt;

/// OIDC scopes added to every request so the provider returns an ID token
/// and a refresh token.
pub const RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// Ordered set of scopes requested for one token acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scopes(Vec<String>);

impl Scopes {
    /// Creates a scope set, dropping blanks and duplicates while keeping order.
    #[must_use]
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for scope in scopes {
            let scope = scope.into().trim().to_string();
            if !scope.is_empty() && !out.iter().any(|s| s.eq_ignore_ascii_case(&scope)) {
                out.push(scope);
            }
        }
        Self(out)
    }

    /// Returns the scopes as given by the caller.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns true if no scope was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Space-separated `scope` form value, with the reserved OIDC scopes appended.
    #[must_use]
    pub fn to_request_string(&self) -> String {
        let mut all: Vec<&str> = self.0.iter().map(String::as_str).collect();
        for reserved in RESERVED_SCOPES {
            if !all.iter().any(|s| s.eq_ignore_ascii_case(reserved)) {
                all.push(reserved);
            }
        }
        all.join(" ")
    }

    /// Returns true if every requested scope (ignoring reserved ones) was granted.
    ///
    /// Matching is case-insensitive, and a resource-qualified scope such as
    /// `https://graph.microsoft.com/User.Read` matches `User.Read`.
    #[must_use]
    pub fn is_covered_by(&self, granted: &[String]) -> bool {
        self.0
            .iter()
            .filter(|s| !is_reserved(s))
            .all(|wanted| granted.iter().any(|g| scope_matches(wanted, g)))
    }
}

impl fmt::Display for Scopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl<S: Into<String>> FromIterator<S> for Scopes {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

fn is_reserved(scope: &str) -> bool {
    RESERVED_SCOPES.iter().any(|r| r.eq_ignore_ascii_case(scope))
}

fn scope_matches(a: &str, b: &str) -> bool {
    if a.eq_ignore_ascii_case(b) {
        return true;
    }
    let (a, b) = (a.to_ascii_lowercase(), b.to_ascii_lowercase());
    a.ends_with(&format!("/{b}")) || b.ends_with(&format!("/{a}"))
}
