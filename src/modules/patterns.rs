//! Ordered label patterns for the free-text fields of a result page.
//!
//! Each cascade is evaluated in priority order and stops at the first pattern
//! whose capture the extractor accepts.

use once_cell::sync::Lazy;
use regex::Regex;

/// One (pattern, extractor) step
pub struct LabelPattern {
    pub label: &'static str,
    pub regex: Regex,
    pub accept: fn(&str) -> Option<String>,
}

impl LabelPattern {
    fn new(label: &'static str, pattern: &str, accept: fn(&str) -> Option<String>) -> Self {
        Self {
            label,
            regex: Regex::new(pattern).expect("static label pattern"),
            accept,
        }
    }

    /// First accepted capture of this single pattern
    pub fn find(&self, text: &str) -> Option<String> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .find_map(|m| (self.accept)(m.as_str()))
    }
}

pub struct PatternCascade(Vec<LabelPattern>);

impl PatternCascade {
    /// Returns the matching pattern's label alongside the value
    pub fn first_match(&self, text: &str) -> Option<(&'static str, String)> {
        self.0
            .iter()
            .find_map(|p| p.find(text).map(|value| (p.label, value)))
    }
}

fn non_blank(capture: &str) -> Option<String> {
    let value = capture.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn upper(capture: &str) -> Option<String> {
    non_blank(capture).map(|v| v.to_ascii_uppercase())
}

// Under (?i) the "NAME" step repeats the first and "name of student" is
// shadowed by it. Keep the order: moving a step changes which capture wins.
pub static NAME_PATTERNS: Lazy<PatternCascade> = Lazy::new(|| {
    PatternCascade(vec![
        LabelPattern::new("name", r"(?i)Name\s*:?\s*([A-Za-z\s]+)", non_blank),
        LabelPattern::new("student name", r"(?i)Student\s*Name\s*:?\s*([A-Za-z\s]+)", non_blank),
        LabelPattern::new("NAME", r"(?i)NAME\s*:?\s*([A-Za-z\s]+)", non_blank),
        LabelPattern::new("name of student", r"(?i)Name of Student\s*:?\s*([A-Za-z\s]+)", non_blank),
    ])
});

pub static SGPA_PATTERNS: Lazy<PatternCascade> = Lazy::new(|| {
    PatternCascade(vec![
        LabelPattern::new("SGPA", r"(?i)SGPA\s*:?\s*([0-9.]+)", non_blank),
        LabelPattern::new("S.G.P.A", r"(?i)S\.G\.P\.A\s*:?\s*([0-9.]+)", non_blank),
        LabelPattern::new(
            "semester grade point average",
            r"(?i)Semester\s+Grade\s+Point\s+Average\s*:?\s*([0-9.]+)",
            non_blank,
        ),
    ])
});

pub static CGPA_PATTERNS: Lazy<PatternCascade> = Lazy::new(|| {
    PatternCascade(vec![
        LabelPattern::new("CGPA", r"(?i)CGPA\s*:?\s*([0-9.]+)", non_blank),
        LabelPattern::new("C.G.P.A", r"(?i)C\.G\.P\.A\s*:?\s*([0-9.]+)", non_blank),
        LabelPattern::new(
            "cumulative grade point average",
            r"(?i)Cumulative\s+Grade\s+Point\s+Average\s*:?\s*([0-9.]+)",
            non_blank,
        ),
    ])
});

pub static STATUS_PATTERNS: Lazy<PatternCascade> = Lazy::new(|| {
    PatternCascade(vec![
        LabelPattern::new("result", r"(?i)Result\s*:?\s*(PASS|FAIL|PROMOTED)", upper),
        LabelPattern::new("status", r"(?i)Status\s*:?\s*(PASS|FAIL|PROMOTED)", upper),
    ])
});

/// Header text of the cumulative-GPA column in the semester summary table
pub static CGPA_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Cur\.?\s*CGPA|Current\s*CGPA|CGPA").expect("static cgpa header regex"));

/// Cell value that reads as a decimal grade point
pub static DECIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+\.[0-9]+$").expect("static decimal regex"));

pub static MARKS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{1,3}$").expect("static marks regex"));

pub static GRADE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-F][+-]?$").expect("static grade regex"));

pub static NAME_LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Name").expect("static name label regex"));

pub static SGPA_LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)SGPA").expect("static sgpa label regex"));
