//! Cache key generators for consistent key naming.
//!
//! Keys are colon-joined: the prefix first, then every argument in the order
//! given. Arguments are not escaped, so an identifier containing `:` can
//! produce a key that collides with a longer argument list.

use std::fmt::Display;

/// Active rankings (singleton).
pub const RANKING_ACTIVE: &str = "ranking:active";

/// Main dashboard (singleton).
pub const DASHBOARD_MAIN: &str = "dashboard:main";

/// Builds a key from a prefix and homogeneous arguments.
#[must_use]
pub fn build_key<I>(prefix: &str, args: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    let mut key = String::from(prefix);
    for arg in args {
        key.push(':');
        key.push_str(&arg.to_string());
    }
    key
}

/// Builds a key from a prefix and arguments of any `Display` types.
///
/// ```
/// use fature_cache::cache_key;
///
/// assert_eq!(cache_key!("affiliate:monthly", "a-1", 2025, 6), "affiliate:monthly:a-1:2025:6");
/// assert_eq!(cache_key!("ranking:active"), "ranking:active");
/// ```
#[macro_export]
macro_rules! cache_key {
    ($prefix:expr $(, $arg:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut key = ::std::string::String::from($prefix);
        $(
            key.push(':');
            key.push_str(&::std::string::ToString::to_string(&$arg));
        )*
        key
    }};
}

/// Escapes glob metacharacters so `component` matches only itself inside a
/// `SCAN MATCH` pattern.
#[must_use]
pub fn escape_pattern(component: &str) -> String {
    let mut escaped = String::with_capacity(component.len());
    for c in component.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Aggregate statistics of one affiliate.
#[must_use]
pub fn affiliate_stats(affiliate_id: &str) -> String {
    cache_key!("affiliate:stats", affiliate_id)
}

/// Referral hierarchy of one affiliate.
#[must_use]
pub fn affiliate_hierarchy(affiliate_id: &str) -> String {
    cache_key!("affiliate:hierarchy", affiliate_id)
}

/// Statistics of one affiliate for one month.
#[must_use]
pub fn affiliate_monthly(affiliate_id: &str, year: i32, month: u32) -> String {
    cache_key!("affiliate:monthly", affiliate_id, year, month)
}

/// Pattern matching every monthly key of one affiliate.
#[must_use]
pub fn affiliate_monthly_pattern(affiliate_id: &str) -> String {
    format!("affiliate:monthly:{}:*", escape_pattern(affiliate_id))
}

/// Commission calculated for one transaction.
#[must_use]
pub fn commission_calc(transaction_id: &str) -> String {
    cache_key!("commission:calc", transaction_id)
}

/// Pending commissions of one affiliate.
#[must_use]
pub fn commission_pending(affiliate_id: &str) -> String {
    cache_key!("commission:pending", affiliate_id)
}

/// Participants of one ranking.
#[must_use]
pub fn ranking_participants(ranking_id: &str) -> String {
    cache_key!("ranking:participants", ranking_id)
}

/// Daily activity sequence of one user.
#[must_use]
pub fn daily_sequence(user_id: &str) -> String {
    cache_key!("daily:sequence", user_id)
}

/// Session payload by token.
#[must_use]
pub fn session(token: &str) -> String {
    cache_key!("session", token)
}

/// Set of active session tokens of one user.
#[must_use]
pub fn user_sessions(user_id: &str) -> String {
    cache_key!("user:sessions", user_id)
}

/// Monthly report.
#[must_use]
pub fn report_monthly(year: i32, month: u32) -> String {
    cache_key!("report:monthly", year, month)
}
