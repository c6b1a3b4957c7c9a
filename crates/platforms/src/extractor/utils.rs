use rand::distr::{Alphanumeric, SampleString};
use regex::Regex;

#[inline]
pub fn capture_group_1<'a>(re: &Regex, input: &'a str) -> Option<&'a str> {
    re.captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Strip a channel page URL down to the bare channel name.
///
/// Inputs that do not match the platform URL pattern are returned trimmed.
pub fn strip_channel_url(re: &Regex, input: &str) -> String {
    let input = input.trim();
    capture_group_1(re, input)
        .unwrap_or(input)
        .trim_end_matches('/')
        .to_string()
}

/// Random query attribute appended to preview images so chat clients do
/// not keep showing a cached thumbnail from an earlier broadcast.
pub fn cache_buster() -> String {
    format!("?rnd={}", Alphanumeric.sample_string(&mut rand::rng(), 6))
}

/// Append [`cache_buster`] to an image URL.
pub fn with_cache_buster(url: &str) -> String {
    format!("{url}{}", cache_buster())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_channel_url() {
        let re = Regex::new(r"^(?:https?://)?(?:www\.)?twitch\.tv/([^/?#]+)").unwrap();
        assert_eq!(strip_channel_url(&re, "https://www.twitch.tv/foo"), "foo");
        assert_eq!(strip_channel_url(&re, "twitch.tv/foo?x=1"), "foo");
        assert_eq!(strip_channel_url(&re, "  bar "), "bar");
    }

    #[test]
    fn test_cache_buster() {
        let buster = cache_buster();
        assert!(buster.starts_with("?rnd="));
        assert_eq!(buster.len(), "?rnd=".len() + 6);
        assert!(with_cache_buster("https://x/img.jpg").starts_with("https://x/img.jpg?rnd="));
    }
}
