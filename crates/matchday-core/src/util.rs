use chrono::NaiveDate;
use url::Url;

use crate::error::AppError;

/// Parse a caller-supplied date with the configured `chrono` format.
///
/// Example: `parse_date("15/07/2025", "%d/%m/%Y")`
pub fn parse_date(raw: &str, format: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), format)
        .map_err(|e| AppError::InvalidDate(format!("'{raw}' does not match {format}: {e}")))
}

/// Every calendar day from `start` to `end`, both inclusive.
///
/// Empty when `start` is after `end`.
pub fn date_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Resolve `href` against the configured base URL, path included.
///
/// Absolute `http`/`https` URLs pass through unchanged. Relative hrefs
/// always resolve under `base`. Hrefs that would leave it, and blank ones,
/// resolve to nothing.
pub fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("//") {
        return None;
    }
    if let Ok(url) = Url::parse(href) {
        return matches!(url.scheme(), "http" | "https").then(|| href.to_string());
    }

    let root = base.as_str().trim_end_matches('/');
    let resolved = match href.strip_prefix('/') {
        Some(path) => Url::parse(&format!("{root}/{path}")).ok()?,
        None => Url::parse(&format!("{root}/")).ok()?.join(href).ok()?,
    };
    let resolved = String::from(resolved);
    resolved
        .starts_with(&format!("{root}/"))
        .then_some(resolved)
}

/// Strip enclosing parentheses: `"(Nail Umyarov )"` → `"Nail Umyarov"`.
pub fn strip_parens(text: &str) -> String {
    text.replace(['(', ')'], "").trim().to_string()
}

/// Split a trailing `N-N` score off a line: `"Marquinhos 1-0"` →
/// `("Marquinhos", Some("1-0"))`.
pub fn split_score_suffix(line: &str) -> (&str, Option<&str>) {
    let line = line.trim();
    if let Some((head, tail)) = line.rsplit_once(char::is_whitespace)
        && is_score(tail)
    {
        return (head.trim_end(), Some(tail));
    }
    (line, None)
}

fn is_score(text: &str) -> bool {
    let Some((home, away)) = text.split_once('-') else {
        return false;
    };
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    digits(home) && digits(away)
}

/// Parse a timeline minute such as `"67'"` or `"45+2'"` into the minute and
/// the added time. `None` when no leading number is present.
pub fn parse_minute(raw: &str) -> Option<(u32, Option<u32>)> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, '\'' | '’' | '′')).collect();
    let cleaned = cleaned.trim();
    let (base, added) = match cleaned.split_once('+') {
        Some((base, added)) => (base.trim(), Some(added.trim())),
        None => (cleaned, None),
    };
    let minute = base.parse().ok()?;
    let stoppage = added.and_then(|a| a.parse().ok());
    Some((minute, stoppage))
}
