use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use crate::app::tables::{branch_name, college_name};
use crate::core::models::{RegistrationNumber, StudentResult};

/// Title context for the grouped sheet
#[derive(Debug, Clone)]
pub struct GroupedLayout {
    pub college_code: String,
    pub branch_code: String,
    pub admission_year: i32,
}

/// One semester block: SGPA, CGPA, then its subjects in first-seen order
struct SemesterBlock {
    semester: u8,
    subjects: Vec<String>,
}

impl SemesterBlock {
    fn width(&self) -> usize {
        2 + self.subjects.len()
    }
}

fn semester_blocks(results: &[StudentResult]) -> Vec<SemesterBlock> {
    let semesters: BTreeSet<u8> = results.iter().map(|r| r.semester).filter(|s| *s != 0).collect();
    semesters
        .into_iter()
        .map(|semester| {
            let mut subjects: Vec<String> = Vec::new();
            for result in results.iter().filter(|r| r.semester == semester) {
                for label in result.subjects.labels() {
                    if !subjects.iter().any(|s| s == label) {
                        subjects.push(label.to_string());
                    }
                }
            }
            SemesterBlock { semester, subjects }
        })
        .collect()
}

/// One row per student, one column block per semester, under a two-line
/// title and a two-line header.
pub fn write_grouped<W: Write>(writer: W, layout: &GroupedLayout, results: &[StudentResult]) -> Result<()> {
    let blocks = semester_blocks(results);

    let mut by_student: BTreeMap<&RegistrationNumber, Vec<&StudentResult>> = BTreeMap::new();
    for result in results {
        by_student.entry(&result.registration_number).or_default().push(result);
    }

    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    wtr.write_record([format!(
        "{} - {}",
        layout.college_code,
        college_name(&layout.college_code)
    )])?;
    wtr.write_record([format!(
        "{} Multi-Semester Results {}",
        branch_name(&layout.branch_code),
        layout.admission_year
    )])?;
    wtr.write_record([""])?;

    let mut banner = vec!["Registration No.".to_string(), "Name of Student".to_string()];
    let mut columns = vec![String::new(), String::new()];
    for block in &blocks {
        banner.push(format!("SEMESTER {}", block.semester));
        banner.extend(std::iter::repeat_n(String::new(), block.width() - 1));
        columns.push("SGPA".to_string());
        columns.push("CGPA".to_string());
        columns.extend(block.subjects.iter().cloned());
    }
    wtr.write_record(&banner)?;
    wtr.write_record(&columns)?;

    for (reg, records) in &by_student {
        let name = records
            .iter()
            .map(|r| r.name.as_str())
            .find(|n| !n.is_empty())
            .unwrap_or_default();

        let mut row = vec![reg.to_string(), name.to_string()];
        for block in &blocks {
            match records.iter().find(|r| r.semester == block.semester) {
                Some(record) => {
                    row.push(record.sgpa.clone());
                    row.push(record.cgpa.clone());
                    for subject in &block.subjects {
                        row.push(record.subjects.get(subject).map(|m| m.marks.clone()).unwrap_or_default());
                    }
                }
                None => row.extend(std::iter::repeat_n(String::new(), block.width())),
            }
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::SubjectMark;

    fn record(reg: &str, semester: u8, name: &str, sgpa: &str, subjects: &[(&str, &str)]) -> StudentResult {
        let mut r = StudentResult::empty(RegistrationNumber::from(reg)).for_semester(semester, 2023);
        r.name = name.into();
        r.sgpa = sgpa.into();
        for (label, marks) in subjects {
            r.subjects.insert(
                label.to_string(),
                SubjectMark {
                    marks: marks.to_string(),
                    grade: "A".into(),
                },
            );
        }
        r
    }

    #[test]
    fn test_grouped_layout() {
        let layout = GroupedLayout {
            college_code: "124".into(),
            branch_code: "105".into(),
            admission_year: 2021,
        };
        let results = vec![
            record("21105124002", 3, "RAVI", "6.10", &[("Maths", "55")]),
            record("21105124001", 3, "", "7.40", &[("Maths", "78"), ("Physics", "65")]),
            record("21105124001", 5, "ASHA", "8.00", &[("DBMS", "81")]),
        ];

        let mut out = Vec::new();
        write_grouped(&mut out, &layout, &results).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "124 - Sher Shah Engineering College");
        assert_eq!(lines[1], "Computer Science & Engineering (CSE) Multi-Semester Results 2021");
        assert_eq!(lines[2], "\"\"");
        assert_eq!(lines[3], "Registration No.,Name of Student,SEMESTER 3,,,,SEMESTER 5,,");
        assert_eq!(lines[4], ",,SGPA,CGPA,Maths,Physics,SGPA,CGPA,DBMS");
        assert_eq!(lines[5], "21105124001,ASHA,7.40,,78,65,8.00,,81");
        assert_eq!(lines[6], "21105124002,RAVI,6.10,,55,,,,");
        assert_eq!(lines.len(), 7);
    }
}
