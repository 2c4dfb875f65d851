use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Date format used by the portal's "published on" column
pub const PUBLISHED_DATE_FORMAT: &str = "%d-%m-%Y";

static POSTBACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"doPostBack\('([^']+)','([^']*)'\)").expect("static postback regex"));

/// A `__doPostBack(target, argument)` call lifted out of a link's href
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Postback {
    pub target: String,
    pub argument: String,
}

impl Postback {
    pub fn parse(href: &str) -> Option<Self> {
        if !href.contains("doPostBack") {
            return None;
        }
        let caps = POSTBACK_RE.captures(href)?;
        Some(Self {
            target: caps[1].to_string(),
            argument: caps[2].to_string(),
        })
    }

    /// Script that replays the postback in the page context
    pub fn script(&self) -> String {
        // serde_json gives us properly escaped JS string literals
        let target = serde_json::to_string(&self.target).unwrap_or_else(|_| format!("\"{}\"", self.target));
        let argument =
            serde_json::to_string(&self.argument).unwrap_or_else(|_| format!("\"{}\"", self.argument));
        format!("__doPostBack({}, {})", target, argument)
    }
}

/// Where a catalog row leads: the anchor's text (for a synthetic click) and
/// its href, which is either a resolved URL or a postback descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTarget {
    pub link_text: String,
    pub href: Option<String>,
}

impl NavigationTarget {
    /// Href usable for direct navigation
    pub fn resolved_url(&self) -> Option<&str> {
        self.href
            .as_deref()
            .filter(|h| h.starts_with("http://") || h.starts_with("https://"))
    }

    pub fn postback(&self) -> Option<Postback> {
        self.href.as_deref().and_then(Postback::parse)
    }
}

/// One qualifying row of the portal's result listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultLinkCandidate {
    pub exam_text: String,
    pub semester: u8,
    pub year: i32,
    pub batch_session: String,
    pub inferred_admission_year: Option<i32>,
    pub published_date: String,
    pub is_special: bool,
    pub navigation_target: NavigationTarget,
}

impl ResultLinkCandidate {
    pub fn published_on(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.published_date.trim(), PUBLISHED_DATE_FORMAT).ok()
    }

    /// Identity used when re-resolving a candidate against a fresh catalog
    pub fn same_listing(&self, other: &ResultLinkCandidate) -> bool {
        self.exam_text == other.exam_text && self.batch_session == other.batch_session
    }
}

/// `YY` + branch(3) + college(3) + sequence(3)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationNumber(String);

impl RegistrationNumber {
    pub fn compose(admission_year: i32, branch_code: &str, college_code: &str, seq: u32) -> Self {
        let year_suffix = admission_year.rem_euclid(100);
        Self(format!("{:02}{}{}{:03}", year_suffix, branch_code, college_code, seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegistrationNumber {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMark {
    pub marks: String,
    pub grade: String,
}

/// Subject rows in first-seen order. Re-inserting a label overwrites the
/// value but keeps the original position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectTable(Vec<(String, SubjectMark)>);

impl SubjectTable {
    pub fn insert(&mut self, label: String, mark: SubjectMark) {
        match self.0.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, slot)) => *slot = mark,
            None => self.0.push((label, mark)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&SubjectMark> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, m)| m)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OverallResult {
    Pass,
    Fail,
    Promoted,
    #[default]
    Unknown,
}

impl OverallResult {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "PASS" => Self::Pass,
            "FAIL" => Self::Fail,
            "PROMOTED" => Self::Promoted,
            _ => Self::Unknown,
        }
    }

    /// PASS at SGPA >= 4.0, FAIL below, UNKNOWN when the value does not parse
    pub fn from_sgpa(sgpa: &str) -> Self {
        match sgpa.trim().parse::<f64>() {
            Ok(v) if v >= 4.0 => Self::Pass,
            Ok(_) => Self::Fail,
            Err(_) => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Promoted => "PROMOTED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for OverallResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a record should be read downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Found,
    /// Page parsed cleanly but carried neither data nor a "no record" marker
    NoData,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentResult {
    pub registration_number: RegistrationNumber,
    pub name: String,
    pub semester: u8,
    pub year: i32,
    pub subjects: SubjectTable,
    pub sgpa: String,
    pub cgpa: String,
    pub overall_result: OverallResult,
    pub error: Option<String>,
}

impl StudentResult {
    pub fn empty(registration_number: RegistrationNumber) -> Self {
        Self {
            registration_number,
            name: String::new(),
            semester: 0,
            year: 0,
            subjects: SubjectTable::default(),
            sgpa: String::new(),
            cgpa: String::new(),
            overall_result: OverallResult::Unknown,
            error: None,
        }
    }

    pub fn failed(registration_number: RegistrationNumber, reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::empty(registration_number)
        }
    }

    /// Stamp the semester context the page was fetched under
    pub fn for_semester(self, semester: u8, year: i32) -> Self {
        Self { semester, year, ..self }
    }

    pub fn outcome(&self) -> RecordOutcome {
        if self.error.is_some() {
            RecordOutcome::Errored
        } else if self.name.is_empty() && self.subjects.is_empty() {
            RecordOutcome::NoData
        } else {
            RecordOutcome::Found
        }
    }
}
