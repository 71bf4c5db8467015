// Output formatting — terminal lines and JSON reports.

pub mod json;
pub mod terminal;

/// The fixed URL list the `demo` command classifies, in report order.
pub const DEMO_URLS: [&str; 6] = [
    "https://www.google.com",
    "https://www.youtube.com",
    "https://www.facebook.com",
    "https://www.github.com",
    "http://phishing-test-example.com",
    "http://192.168.0.1",
];

/// Truncate a string to at most `max_chars` characters, appending "..." if truncated.
///
/// Unlike byte slicing, this respects UTF-8 character boundaries, so it is
/// safe on internationalized URLs.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
