use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("static year regex"));
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static whitespace regex"));

/// Replace characters that are illegal in file names
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// First 4-digit number in the text, or `fallback`
pub fn extract_year(text: &str, fallback: i32) -> i32 {
    YEAR_RE
        .find(text)
        .and_then(|m| m.as_str().parse::<i32>().ok())
        .unwrap_or(fallback)
}

/// Collapse runs of whitespace and trim, the way cell text reads on screen
pub fn squash_ws(text: &str) -> String {
    WS_RE.replace_all(text.trim(), " ").into_owned()
}

pub fn is_all_digits(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_year_takes_first_match() {
        assert_eq!(extract_year("B.Tech. 3rd Semester Examination, 2023 (Old)", 2024), 2023);
        assert_eq!(extract_year("B.Tech 5th Semester Exam 2022 held in 2023", 2024), 2022);
        assert_eq!(extract_year("B.Tech 5th Semester", 2024), 2024);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b:c"), "a_b_c");
    }

    #[test]
    fn test_squash_ws() {
        assert_eq!(squash_ws("  Engineering \n\t Mathematics "), "Engineering Mathematics");
        assert!(is_all_digits("101"));
        assert!(!is_all_digits("10a"));
        assert!(!is_all_digits(""));
    }
}
