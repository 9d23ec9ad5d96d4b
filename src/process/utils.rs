/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        trimmed[1..trimmed.len() - 1].trim()
    } else {
        trimmed
    }
}

/// Header cleanup: surrounding whitespace only, the name is otherwise kept.
pub fn clean_headers(headers: &[String]) -> Vec<String> {
    headers.iter().map(|h| h.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_whitespace_and_quotes() {
        assert_eq!(clean_str("  \"2020-01-05\" "), "2020-01-05");
        assert_eq!(clean_str("\""), "\"");
        assert_eq!(clean_str(" plain "), "plain");
    }

    #[test]
    fn headers_are_trimmed() {
        let raw = vec![" Date ".to_string(), "\tCity Location".to_string()];
        assert_eq!(clean_headers(&raw), vec!["Date", "City Location"]);
    }
}
