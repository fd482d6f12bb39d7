//! Release-year validation.
//!
//! Tag years and scraped dates arrive in every imaginable shape ("2016",
//! "2016-05-01", "c. 2016", "16"). Only a bare 4-digit year between 1900 and
//! 2099 is ever written back; everything else is treated as "no year".

use regex::Regex;
use std::sync::LazyLock;

static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(19|20)\d{2}$").unwrap());

static YEAR_IN_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

/// Validate a candidate year string. Returns the (trimmed) year iff it is
/// exactly four digits starting with "19" or "20"; full dates are rejected —
/// callers split those first (see [`from_release_date`]).
pub fn validate(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    YEAR.is_match(trimmed).then_some(trimmed)
}

/// Extract a validated year from a `YYYY[-MM[-DD]]` release-date string.
pub fn from_release_date(date: &str) -> Option<&str> {
    date.trim().split('-').next().and_then(validate)
}

/// Find the first validated 4-digit year anywhere in a free-text blob.
/// Used by the web-search fallback miner.
pub fn scan_text(text: &str) -> Option<String> {
    YEAR_IN_TEXT
        .find(text)
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_years() {
        assert_eq!(validate("2016"), Some("2016"));
        assert_eq!(validate("1900"), Some("1900"));
        assert_eq!(validate("1999"), Some("1999"));
        assert_eq!(validate("2099"), Some("2099"));
        assert_eq!(validate(" 2019 "), Some("2019"));
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(validate("16"), None);
        assert_eq!(validate("1899"), None);
        assert_eq!(validate("2100"), None);
        assert_eq!(validate("20160"), None);
        assert_eq!(validate("2016-05-01"), None);
        assert_eq!(validate("May 2016"), None);
        assert_eq!(validate("abcd"), None);
        assert_eq!(validate(""), None);
        assert_eq!(validate("   "), None);
    }

    #[test]
    fn splits_release_dates() {
        assert_eq!(from_release_date("2019-03-01"), Some("2019"));
        assert_eq!(from_release_date("2019-03"), Some("2019"));
        assert_eq!(from_release_date("2019"), Some("2019"));
        assert_eq!(from_release_date("0000"), None);
        assert_eq!(from_release_date(""), None);
    }

    #[test]
    fn scans_free_text() {
        assert_eq!(
            scan_text("Released in 2003 on some label"),
            Some("2003".to_string())
        );
        // First hit wins.
        assert_eq!(
            scan_text("remastered 2011, original 1994"),
            Some("2011".to_string())
        );
        assert_eq!(scan_text("no dates here"), None);
        // Out-of-century numbers and digit runs are not years.
        assert_eq!(scan_text("catalog 1850, pressing 12016"), None);
    }
}
