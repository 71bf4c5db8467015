// Lexical URL features.
//
// Everything here is computed from the raw URL string. The URL is split
// lexically rather than parsed and normalized: phishing URLs are often
// malformed on purpose, and normalizing them would hide exactly the quirks
// the model was trained to notice.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex_lite::Regex;

use super::traits::{FeatureExtractor, FeatureVector};

/// Feature names in the order the extractor emits them.
pub const FEATURE_NAMES: [&str; 23] = [
    "url_length",
    "hostname_length",
    "path_length",
    "query_length",
    "num_dots",
    "num_hyphens",
    "num_underscores",
    "num_slashes",
    "num_question_marks",
    "num_equals",
    "num_at",
    "num_ampersands",
    "num_percent",
    "num_digits",
    "digit_ratio",
    "num_subdomains",
    "has_ip_host",
    "uses_https",
    "has_port",
    "num_suspicious_words",
    "url_entropy",
    "tld_length",
    "has_redirect_slashes",
];

/// Words that show up disproportionately in credential-harvesting URLs.
const SUSPICIOUS_WORDS: [&str; 15] = [
    "login",
    "verify",
    "account",
    "secure",
    "update",
    "bank",
    "signin",
    "confirm",
    "password",
    "webscr",
    "ebayisapi",
    "paypal",
    "free",
    "lucky",
    "bonus",
];

fn ipv4_host() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").expect("valid IPv4 pattern"))
}

/// The lexical pieces of a URL. All slices borrow from the input.
#[derive(Debug, PartialEq)]
struct UrlParts<'a> {
    scheme: &'a str,
    /// Everything after `://` (the whole input when there is no scheme).
    after_scheme: &'a str,
    host: &'a str,
    port: Option<&'a str>,
    path: &'a str,
    query: &'a str,
}

fn split_url(url: &str) -> UrlParts<'_> {
    let (scheme, rest) = match url.find("://") {
        Some(idx) => (&url[..idx], &url[idx + 3..]),
        None => ("", url),
    };

    let authority_end = rest
        .find(|c: char| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    let authority = &rest[..authority_end];
    let tail = &rest[authority_end..];

    let path_end = tail
        .find(|c: char| matches!(c, '?' | '#'))
        .unwrap_or(tail.len());
    let path = &tail[..path_end];
    let query = match tail[path_end..].strip_prefix('?') {
        Some(q) => q.split('#').next().unwrap_or(""),
        None => "",
    };

    // Drop userinfo: the host starts after the last '@'
    let host_port = authority.rsplit('@').next().unwrap_or(authority);

    let (host, port) = if host_port.starts_with('[') {
        // Bracketed IPv6 literal; a port can only follow the closing bracket
        match host_port.find(']') {
            Some(close) => {
                let port = host_port[close + 1..]
                    .strip_prefix(':')
                    .filter(|p| !p.is_empty());
                (&host_port[..=close], port)
            }
            None => (host_port, None),
        }
    } else {
        match host_port.rsplit_once(':') {
            // "host:" with nothing after the colon has no port
            Some((h, p)) => (h, (!p.is_empty()).then_some(p)),
            None => (host_port, None),
        }
    };

    UrlParts {
        scheme,
        after_scheme: rest,
        host,
        port,
        path,
        query,
    }
}

fn is_ip_host(host: &str) -> bool {
    (host.starts_with('[') && host.ends_with(']')) || ipv4_host().is_match(host)
}

/// Shannon entropy of the character distribution, in bits.
///
/// Counts are summed in character order so the result is bit-for-bit stable.
fn shannon_entropy(text: &str) -> f64 {
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    let mut total = 0usize;
    for c in text.chars() {
        *counts.entry(c).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

fn count_char(text: &str, needle: char) -> f64 {
    text.chars().filter(|&c| c == needle).count() as f64
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Extracts the 23 lexical features listed in [`FEATURE_NAMES`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalFeatureExtractor;

impl FeatureExtractor for LexicalFeatureExtractor {
    fn feature_names(&self) -> &[&'static str] {
        &FEATURE_NAMES
    }

    fn extract(&self, url: &str) -> FeatureVector {
        let parts = split_url(url);
        let ip_host = is_ip_host(parts.host);

        let char_count = url.chars().count();
        let digits = url.chars().filter(|c| c.is_ascii_digit()).count();
        let digit_ratio = if char_count == 0 {
            0.0
        } else {
            digits as f64 / char_count as f64
        };

        let num_subdomains = if ip_host {
            0
        } else {
            parts
                .host
                .split('.')
                .filter(|label| !label.is_empty())
                .count()
                .saturating_sub(2)
        };

        let tld_length = if ip_host {
            0
        } else {
            parts
                .host
                .rsplit_once('.')
                .map(|(_, tld)| tld.chars().count())
                .unwrap_or(0)
        };

        let lowered = url.to_lowercase();
        let suspicious: usize = SUSPICIOUS_WORDS
            .iter()
            .map(|word| lowered.matches(word).count())
            .sum();

        let values = [
            char_count as f64,
            parts.host.chars().count() as f64,
            parts.path.chars().count() as f64,
            parts.query.chars().count() as f64,
            count_char(url, '.'),
            count_char(url, '-'),
            count_char(url, '_'),
            count_char(url, '/'),
            count_char(url, '?'),
            count_char(url, '='),
            count_char(url, '@'),
            count_char(url, '&'),
            count_char(url, '%'),
            digits as f64,
            digit_ratio,
            num_subdomains as f64,
            flag(ip_host),
            flag(parts.scheme.eq_ignore_ascii_case("https")),
            flag(parts.port.is_some()),
            suspicious as f64,
            shannon_entropy(url),
            tld_length as f64,
            flag(parts.after_scheme.contains("//")),
        ];

        FeatureVector::new(FEATURE_NAMES.iter().copied().zip(values).collect())
    }
}
