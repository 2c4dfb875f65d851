use chrono::{Datelike, NaiveDate};

use crate::core::error::HarvestError;
use crate::core::models::RegistrationNumber;

/// Largest sequence that still fits the 3-digit slot
pub const MAX_SEQUENCE: u32 = 999;

/// Build the inclusive range of registration numbers for a cohort.
///
/// Numbers are generated, not looked up: a generated number may belong to
/// nobody. `start_seq > end_seq` yields an empty range.
pub fn generate(
    admission_year: i32,
    branch_code: &str,
    college_code: &str,
    start_seq: u32,
    end_seq: u32,
) -> Result<Vec<RegistrationNumber>, HarvestError> {
    if !is_three_digit_code(branch_code) {
        return Err(HarvestError::InvalidRequest(format!(
            "branch code must be 3 digits, got {:?}",
            branch_code
        )));
    }
    if !is_three_digit_code(college_code) {
        return Err(HarvestError::InvalidRequest(format!(
            "college code must be 3 digits, got {:?}",
            college_code
        )));
    }
    if end_seq > MAX_SEQUENCE {
        return Err(HarvestError::InvalidRequest(format!(
            "sequence {} does not fit in 3 digits",
            end_seq
        )));
    }

    Ok((start_seq..=end_seq)
        .map(|seq| RegistrationNumber::compose(admission_year, branch_code, college_code, seq))
        .collect())
}

fn is_three_digit_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_digit())
}

/// Semesters whose results should already be out for a cohort: two per
/// elapsed year, plus the odd one once July has passed. Capped at 8.
pub fn available_semesters(admission_year: i32, today: NaiveDate) -> Vec<u8> {
    let years_passed = today.year() - admission_year;
    let count = if today.month() >= 7 {
        years_passed * 2 + 1
    } else {
        years_passed * 2
    };
    let count = count.clamp(0, 8) as u8;
    (1..=count).collect()
}
