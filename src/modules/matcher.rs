use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::{debug, info, warn};

use crate::core::models::ResultLinkCandidate;

/// Matching strategies, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    /// Batch label parses to the requested admission year
    AdmissionYear,
    /// Batch label is literally `{admission}-{passout % 100}`
    BatchLabel,
    /// Batch label mentions the admission or passout year anywhere
    Substring,
}

impl MatchTier {
    pub const ALL: [MatchTier; 3] = [Self::AdmissionYear, Self::BatchLabel, Self::Substring];

    fn accepts(&self, candidate: &ResultLinkCandidate, admission_year: i32, passout_year: i32) -> bool {
        match self {
            Self::AdmissionYear => candidate.inferred_admission_year == Some(admission_year),
            Self::BatchLabel => {
                candidate.batch_session == format!("{}-{:02}", admission_year, passout_year.rem_euclid(100))
            }
            Self::Substring => {
                candidate.batch_session.contains(&admission_year.to_string())
                    || candidate.batch_session.contains(&passout_year.to_string())
            }
        }
    }
}

/// Pick the listing for one semester. The first tier that matches
/// anything wins; within it the latest publication date wins.
pub fn match_semester<'a>(
    candidates: &'a [ResultLinkCandidate],
    semester: u8,
    admission_year: i32,
    passout_year: i32,
) -> Option<(&'a ResultLinkCandidate, MatchTier)> {
    let for_semester: Vec<&ResultLinkCandidate> = candidates.iter().filter(|c| c.semester == semester).collect();

    for tier in MatchTier::ALL {
        let matched: Vec<&ResultLinkCandidate> = for_semester
            .iter()
            .copied()
            .filter(|c| tier.accepts(c, admission_year, passout_year))
            .collect();
        if matched.is_empty() {
            debug!("Semester {}: no candidates in tier {:?}", semester, tier);
            continue;
        }
        info!("Semester {}: {} candidate(s) in tier {:?}", semester, matched.len(), tier);
        return latest_published(&matched).map(|c| (c, tier));
    }
    None
}

/// Latest `published_date` wins and the earlier entry is kept on ties.
/// Unparsable dates rank below every real date; if nothing parses, the
/// first candidate is returned.
pub fn latest_published<'a>(matched: &[&'a ResultLinkCandidate]) -> Option<&'a ResultLinkCandidate> {
    let dated: Vec<(Option<NaiveDate>, &'a ResultLinkCandidate)> =
        matched.iter().map(|c| (c.published_on(), *c)).collect();

    for (date, candidate) in &dated {
        if date.is_none() {
            warn!(
                "Unparsable publication date {:?} for {:?}, ranking it earliest",
                candidate.published_date, candidate.exam_text
            );
        }
    }

    if dated.iter().all(|(date, _)| date.is_none()) {
        let first = dated.first().map(|(_, c)| *c);
        if let Some(first) = first {
            warn!("No parsable publication dates, taking the first candidate: {}", first.exam_text);
        }
        return first;
    }

    dated
        .into_iter()
        .fold(None, |best: Option<(Option<NaiveDate>, &'a ResultLinkCandidate)>, current| match best {
            Some(b) if current.0 <= b.0 => Some(b),
            _ => Some(current),
        })
        .map(|(_, c)| c)
}

/// Outcome of matching every requested semester
#[derive(Debug, Clone, Default)]
pub struct CohortMatch {
    pub resolved: BTreeMap<u8, ResultLinkCandidate>,
    pub unresolved: Vec<u8>,
}

impl CohortMatch {
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

pub fn match_semesters(
    candidates: &[ResultLinkCandidate],
    semesters: &[u8],
    admission_year: i32,
    passout_year: i32,
) -> CohortMatch {
    let mut cohort = CohortMatch::default();
    for &semester in semesters {
        match match_semester(candidates, semester, admission_year, passout_year) {
            Some((candidate, tier)) => {
                info!(
                    "Semester {} -> {} ({}, published {}) via {:?}",
                    semester, candidate.exam_text, candidate.batch_session, candidate.published_date, tier
                );
                cohort.resolved.insert(semester, candidate.clone());
            }
            None => {
                warn!("No result link matched semester {}", semester);
                cohort.unresolved.push(semester);
            }
        }
    }
    cohort
}

/// Everything the catalog offered, grouped by semester, so a caller can
/// see why a requested semester did not match.
pub fn describe_catalog(
    catalog: &[ResultLinkCandidate],
    semesters: &[u8],
    admission_year: i32,
    passout_year: i32,
) -> String {
    let mut by_semester: BTreeMap<u8, Vec<String>> = BTreeMap::new();
    for c in catalog {
        by_semester
            .entry(c.semester)
            .or_default()
            .push(format!("{} ({})", c.batch_session, c.published_date));
    }

    let mut out = format!(
        "Requested: admission {}, passout {}, semesters {:?}\n",
        admission_year, passout_year, semesters
    );
    if by_semester.is_empty() {
        out.push_str("The catalog listed no semester results.");
        return out;
    }
    out.push_str("Available semesters and batches:");
    for (semester, entries) in &by_semester {
        let _ = write!(out, "\n  Semester {}: {}", semester, entries.join(", "));
    }
    out
}
