//! Cookie-based session continuity.
//!
//! # Design
//! The server correlates authentication through cookies rather than an
//! explicit token. `SessionStore` keeps the `name=value` pairs from every
//! `Set-Cookie` header it has seen and replays them on the next request.
//! Values are parsed with the `cookie` crate. Attributes are ignored except
//! expiry: a non-positive `Max-Age` or an `Expires` date in the past removes
//! the cookie. Each client owns its own store; two clients never share a
//! session.

use cookie::time::{Duration, OffsetDateTime};
use cookie::{Cookie, ParseError};
use tracing::debug;

/// Cookies collected from server responses, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStore {
    cookies: Vec<(String, String)>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Merge one `Set-Cookie` header value into the store.
    ///
    /// A cookie with an existing name replaces the old value in place.
    pub fn merge(&mut self, set_cookie: &str) -> Result<(), ParseError> {
        let cookie = Cookie::parse(set_cookie)?;
        let (name, value) = (cookie.name(), cookie.value_trimmed());
        let expired = is_expired(&cookie, OffsetDateTime::now_utc());

        let existing = self.cookies.iter().position(|(n, _)| n == name);
        match (existing, expired) {
            (Some(index), true) => {
                self.cookies.remove(index);
            }
            (Some(index), false) => self.cookies[index].1 = value.to_string(),
            (None, true) => {}
            (None, false) => self.cookies.push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Merge every `Set-Cookie` value, skipping the ones that do not parse.
    ///
    /// By the time cookies are read the response body has already been
    /// decoded, so a malformed cookie must not fail the call.
    pub fn merge_all<'a>(&mut self, set_cookies: impl IntoIterator<Item = &'a str>) {
        for set_cookie in set_cookies {
            if let Err(err) = self.merge(set_cookie) {
                debug!(cookie = set_cookie, error = ?err, "skipping malformed Set-Cookie");
            }
        }
    }

    /// The `Cookie` request header, or `None` before any cookie was stored.
    ///
    /// Pairs are joined with `,`, which is what the web UI's server accepts.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        Some(pairs.join(","))
    }
}

fn is_expired(cookie: &Cookie<'_>, now: OffsetDateTime) -> bool {
    let max_age_spent = cookie.max_age().is_some_and(|age| age <= Duration::ZERO);
    let past_expiry = cookie.expires_datetime().is_some_and(|at| at <= now);
    max_age_spent || past_expiry
}
