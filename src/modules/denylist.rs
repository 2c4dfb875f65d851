//! Row classifier for the subject table scan.
//!
//! Best-effort only: result pages carry personal and institutional details in
//! the same kind of `<tr>` as subject marks, and the only thing telling them
//! apart is the words they contain. The keyword sets are versioned
//! separately so they can be tuned without touching the extraction flow.

/// Bump whenever either keyword set changes.
pub const DENYLIST_VERSION: u32 = 2;

/// Words that mark header rows and student-detail rows.
pub const HEADER_KEYWORDS: &[&str] = &[
    "subject",
    "code",
    "sl",
    "sr",
    "paper",
    "name",
    "father",
    "mother",
    "college",
    "course",
    "registration",
];

/// Name fragments and institution/location words seen on detail rows.
/// Whole branch names are listed rather than bare "engineering" so that
/// subjects such as "Engineering Mathematics" survive.
pub const PERSONAL_KEYWORDS: &[&str] = &[
    "kumar",
    "devi",
    "engineering college",
    "college",
    "computer science & engineering",
    "computer science and engineering",
    "sasaram",
    "rohtas",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowVerdict {
    Candidate,
    Header(&'static str),
    Personal(&'static str),
}

/// Classify a row by its joined cell text (case-insensitive)
pub fn classify_row(cells: &[String]) -> RowVerdict {
    let row_text = cells.join(" ").to_lowercase();
    if let Some(kw) = HEADER_KEYWORDS.iter().find(|kw| row_text.contains(*kw)) {
        return RowVerdict::Header(kw);
    }
    if let Some(kw) = PERSONAL_KEYWORDS.iter().find(|kw| row_text.contains(*kw)) {
        return RowVerdict::Personal(kw);
    }
    RowVerdict::Candidate
}
