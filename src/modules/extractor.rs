use anyhow::{Result, anyhow};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::core::models::{OverallResult, RegistrationNumber, StudentResult, SubjectMark, SubjectTable};
use crate::modules::denylist::{RowVerdict, classify_row};
use crate::modules::patterns::{
    CGPA_HEADER_RE, CGPA_PATTERNS, DECIMAL_RE, GRADE_RE, MARKS_RE, NAME_LABEL_RE, NAME_PATTERNS, SGPA_LABEL_RE,
    SGPA_PATTERNS, STATUS_PATTERNS,
};
use crate::utils::text::{is_all_digits, squash_ws};

/// Lowercased page markers the portal shows for an unknown registration number
const NO_RESULT_MARKERS: &[&str] = &["not found", "invalid", "error", "no record"];

struct PageSelectors {
    table: Selector,
    row: Selector,
    cell: Selector,
}

impl PageSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            table: selector("table")?,
            row: selector("tr")?,
            cell: selector("td")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("failed to parse selector {}: {:?}", css, e))
}

fn element_text(el: ElementRef) -> String {
    squash_ws(&el.text().collect::<String>())
}

/// Direct `td`/`th` children of a row, as squashed text
fn row_cells(row: ElementRef) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .map(element_text)
        .collect()
}

/// Parse a rendered per-student result page.
///
/// Never fails: anything that goes wrong during parsing comes back as a
/// record with `error` set.
pub fn extract_result(page_content: &str, reg: &RegistrationNumber) -> StudentResult {
    match try_extract(page_content, reg) {
        Ok(result) => result,
        Err(e) => {
            warn!("Error extracting result for {}: {:#}", reg, e);
            StudentResult::failed(reg.clone(), format!("{:#}", e))
        }
    }
}

fn try_extract(page_content: &str, reg: &RegistrationNumber) -> Result<StudentResult> {
    let document = Html::parse_document(page_content);
    let selectors = PageSelectors::new()?;

    let mut result = StudentResult::empty(reg.clone());
    result.name = extract_name(page_content, &document, &selectors);
    result.subjects = extract_subjects(&document, &selectors);
    result.sgpa = extract_sgpa(page_content, &document, &selectors);
    result.cgpa = extract_cgpa(page_content, &document, &selectors);
    result.overall_result = extract_status(page_content, &result.sgpa);

    debug!(
        "{}: name={:?}, subjects={}, sgpa={:?}, cgpa={:?}, result={}",
        reg,
        result.name,
        result.subjects.len(),
        result.sgpa,
        result.cgpa,
        result.overall_result
    );

    if result.subjects.is_empty() && result.name.is_empty() {
        let page_text = page_content.to_lowercase();
        match NO_RESULT_MARKERS.iter().find(|m| page_text.contains(*m)) {
            Some(marker) => {
                debug!("{}: page shows no-result marker {:?}", reg, marker);
                result.error = Some(format!("No result found for registration number {}", reg));
            }
            None => warn!("{}: page has no name, no subjects and no no-result marker", reg),
        }
    }
    Ok(result)
}

fn extract_name(page_content: &str, document: &Html, selectors: &PageSelectors) -> String {
    if let Some((label, name)) = NAME_PATTERNS.first_match(page_content) {
        debug!("Name found via {:?} pattern", label);
        return name;
    }

    // label cell followed by the value cell
    document
        .select(&selectors.cell)
        .filter(|td| NAME_LABEL_RE.is_match(&element_text(*td)))
        .filter_map(|td| {
            td.next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sib| sib.value().name() == "td")
        })
        .map(element_text)
        .find(|text| text.chars().count() > 2 && !is_all_digits(text))
        .unwrap_or_default()
}

fn extract_subjects(document: &Html, selectors: &PageSelectors) -> SubjectTable {
    let mut subjects = SubjectTable::default();

    for row in document.select(&selectors.row) {
        let cells = row_cells(row);
        if cells.len() < 3 {
            continue;
        }
        match classify_row(&cells) {
            RowVerdict::Candidate => {}
            verdict => {
                debug!("Skipping row {:?}: {:?}", cells, verdict);
                continue;
            }
        }

        let first = &cells[0];
        if first.chars().count() <= 1 {
            continue;
        }

        let mut marks = None;
        let mut grade = None;
        for cell in &cells[1..] {
            if MARKS_RE.is_match(cell) && cell.parse::<u32>().is_ok_and(|m| m <= 100) {
                marks = Some(cell.as_str());
            }
            if GRADE_RE.is_match(cell) {
                grade = Some(cell.as_str());
            }
        }
        if marks.is_none() && grade.is_none() {
            continue;
        }

        // a bare serial number in front of the subject name
        let label = if is_all_digits(first) && !cells[1].is_empty() {
            cells[1].clone()
        } else {
            first.clone()
        };
        let mark = SubjectMark {
            marks: marks.unwrap_or_default().to_string(),
            grade: grade.unwrap_or_default().to_string(),
        };
        debug!("Subject {:?}: marks {:?}, grade {:?}", label, mark.marks, mark.grade);
        subjects.insert(label, mark);
    }
    subjects
}

fn extract_sgpa(page_content: &str, document: &Html, selectors: &PageSelectors) -> String {
    if let Some((label, sgpa)) = SGPA_PATTERNS.first_match(page_content) {
        debug!("SGPA found via {:?} pattern", label);
        return sgpa;
    }

    for label_cell in document
        .select(&selectors.cell)
        .filter(|td| SGPA_LABEL_RE.is_match(&element_text(*td)))
    {
        let Some(row) = label_cell
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "tr")
        else {
            continue;
        };
        if let Some(value) = row
            .select(&selectors.cell)
            .map(element_text)
            .find(|text| DECIMAL_RE.is_match(text))
        {
            debug!("SGPA found in table row");
            return value;
        }
    }
    String::new()
}

/// Column lookup first: the semester summary table has a "Cur. CGPA"
/// header whose column carries the value. Text patterns only after that.
fn extract_cgpa(page_content: &str, document: &Html, selectors: &PageSelectors) -> String {
    for table in document.select(&selectors.table) {
        let mut rows = table.select(&selectors.row);
        let Some(header_row) = rows.next() else {
            continue;
        };
        let Some(column) = row_cells(header_row)
            .iter()
            .position(|header| CGPA_HEADER_RE.is_match(header))
        else {
            continue;
        };

        if let Some(value) = rows
            .filter_map(|row| row_cells(row).into_iter().nth(column))
            .find(|text| DECIMAL_RE.is_match(text))
        {
            debug!("CGPA found in table column {}", column);
            return value;
        }
    }

    match CGPA_PATTERNS.first_match(page_content) {
        Some((label, cgpa)) => {
            debug!("CGPA found via {:?} pattern", label);
            cgpa
        }
        None => String::new(),
    }
}

fn extract_status(page_content: &str, sgpa: &str) -> OverallResult {
    if let Some((_, status)) = STATUS_PATTERNS.first_match(page_content) {
        return OverallResult::from_label(&status);
    }
    if sgpa.is_empty() {
        return OverallResult::Unknown;
    }
    OverallResult::from_sgpa(sgpa)
}
