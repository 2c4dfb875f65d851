use anyhow::Result;
use std::collections::BTreeSet;
use std::io::Write;

use crate::core::models::StudentResult;

const FIXED_COLUMNS: [&str; 8] = [
    "Registration Number",
    "Name",
    "Semester",
    "Year",
    "SGPA",
    "CGPA",
    "Result",
    "Error",
];

/// Blank for the zero placeholders error records carry
fn non_zero<T: PartialEq + Default + ToString>(value: T) -> String {
    if value == T::default() {
        String::new()
    } else {
        value.to_string()
    }
}

/// One row per student-semester. Subject columns are the sorted union of
/// every subject seen, two columns each.
pub fn write_flat<W: Write>(writer: W, results: &[StudentResult]) -> Result<()> {
    let subjects: BTreeSet<&str> = results.iter().flat_map(|r| r.subjects.labels()).collect();

    let mut wtr = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
    for subject in &subjects {
        header.push(format!("{}_Marks", subject));
        header.push(format!("{}_Grade", subject));
    }
    wtr.write_record(&header)?;

    for result in results {
        let errored = result.error.is_some();
        let mut row = vec![
            result.registration_number.to_string(),
            if errored { "ERROR".to_string() } else { result.name.clone() },
            non_zero(result.semester),
            non_zero(result.year),
            result.sgpa.clone(),
            result.cgpa.clone(),
            if errored {
                String::new()
            } else {
                result.overall_result.to_string()
            },
            result.error.clone().unwrap_or_default(),
        ];
        for subject in &subjects {
            match result.subjects.get(subject) {
                Some(mark) => {
                    row.push(mark.marks.clone());
                    row.push(mark.grade.clone());
                }
                None => row.extend([String::new(), String::new()]),
            }
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
