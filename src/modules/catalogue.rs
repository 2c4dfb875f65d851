use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::app::config::AppConfig;
use crate::browser::http::HttpFetcher;
use crate::browser::session::PortalSession;
use crate::core::models::{NavigationTarget, ResultLinkCandidate};
use crate::utils::text::{extract_year, squash_ws};

static SEMESTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(?:st|nd|rd|th)\s+Semester").expect("static semester regex"));

/// Optional narrowing applied after a catalog is parsed
#[derive(Debug, Clone, Default)]
pub struct CatalogFilter {
    /// Drop candidates whose inferred admission year is known and differs
    pub admission_year: Option<i32>,
    /// Keep only candidates published on one of these dates (unparsable dates are kept)
    pub publication_dates: Vec<NaiveDate>,
}

impl CatalogFilter {
    pub fn keep(&self, candidate: &ResultLinkCandidate) -> bool {
        if let (Some(wanted), Some(inferred)) = (self.admission_year, candidate.inferred_admission_year) {
            if wanted != inferred {
                return false;
            }
        }
        if !self.publication_dates.is_empty() {
            if let Some(published) = candidate.published_on() {
                return self.publication_dates.contains(&published);
            }
        }
        true
    }

    pub fn apply(&self, candidates: Vec<ResultLinkCandidate>) -> Vec<ResultLinkCandidate> {
        candidates.into_iter().filter(|c| self.keep(c)).collect()
    }
}

/// Admission year from a batch label: "2021-25" and "21-25" both give 2021.
/// Hyphen-less labels and arrear batches give `None`.
pub fn infer_admission_year(batch_session: &str) -> Option<i32> {
    if !batch_session.contains('-') || batch_session.contains("Arrear") {
        return None;
    }
    let start = batch_session.split('-').next()?.trim();
    if !start.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match start.len() {
        4 => start.parse().ok(),
        2 => start.parse::<i32>().ok().map(|yy| 2000 + yy),
        _ => None,
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("failed to parse selector {}: {:?}", css, e))
}

fn element_text(el: ElementRef) -> String {
    squash_ws(&el.text().collect::<String>())
}

pub struct CatalogBuilder {
    portal_url: String,
    program_marker: String,
    fallback_year: i32,
    page_load_wait: std::time::Duration,
    http: HttpFetcher,
}

impl CatalogBuilder {
    pub fn new(config: &AppConfig, http: HttpFetcher) -> Self {
        Self {
            portal_url: config.portal_url.clone(),
            program_marker: config.program_marker.clone(),
            fallback_year: config.fallback_year,
            page_load_wait: config.page_load_wait(),
            http,
        }
    }

    /// Fetch and parse the homepage listing. Never fails: any fetch or parse
    /// problem is logged and yields an empty catalog.
    pub async fn fetch<S: PortalSession>(
        &self,
        session: Option<&S>,
        filter: &CatalogFilter,
    ) -> Vec<ResultLinkCandidate> {
        let html = match self.fetch_homepage(session).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Could not fetch result catalog: {:#}", e);
                return Vec::new();
            }
        };
        let candidates = filter.apply(self.parse(&html));
        info!("Found {} {} result links", candidates.len(), self.program_marker);
        candidates
    }

    async fn fetch_homepage<S: PortalSession>(&self, session: Option<&S>) -> Result<String> {
        if let Some(session) = session {
            let rendered = async {
                session.goto(&self.portal_url).await?;
                sleep(self.page_load_wait).await;
                session.content().await
            }
            .await;
            match rendered {
                Ok(html) => {
                    debug!("Using rendered homepage ({} bytes)", html.len());
                    return Ok(html);
                }
                Err(e) => warn!("Rendered fetch failed, falling back to plain HTTP: {}", e),
            }
        }
        let html = self.http.get_text(&self.portal_url).await?;
        debug!("Using plain HTTP homepage ({} bytes)", html.len());
        Ok(html)
    }

    /// Parse a homepage into candidates. Rows that do not look like a
    /// semester listing for the configured program are skipped silently.
    pub fn parse(&self, html: &str) -> Vec<ResultLinkCandidate> {
        match self.try_parse(html) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Could not parse result catalog: {:#}", e);
                Vec::new()
            }
        }
    }

    fn try_parse(&self, html: &str) -> Result<Vec<ResultLinkCandidate>> {
        let document = Html::parse_document(html);
        let row_selector = selector("tr")?;
        let anchor_selector = selector("a")?;

        let anchors: Vec<(String, Option<String>)> = document
            .select(&anchor_selector)
            .map(|a| (element_text(a), a.value().attr("href").map(str::to_string)))
            .collect();

        let rows: Vec<_> = document.select(&row_selector).collect();
        debug!("Found {} table rows", rows.len());

        let mut candidates = Vec::new();
        for row in rows {
            let cells: Vec<String> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| c.value().name() == "td")
                .map(element_text)
                .collect();
            if cells.len() < 3 {
                continue;
            }

            let exam_text = cells[0].clone();
            let batch_session = cells[1].clone();
            let published_date = cells[2].clone();

            if !(exam_text.contains(&self.program_marker) && exam_text.contains("Semester")) {
                continue;
            }
            let Some(semester) = SEMESTER_RE
                .captures(&exam_text)
                .and_then(|caps| caps[1].parse::<u8>().ok())
                .filter(|s| (1..=8).contains(s))
            else {
                debug!("Skipping row without a usable semester ordinal: {}", exam_text);
                continue;
            };

            let is_special =
                exam_text.contains("Special") || exam_text.contains("(S)") || batch_session.contains("Arrear");

            let href = anchors
                .iter()
                .find(|(text, _)| text.contains(&exam_text))
                .and_then(|(_, href)| href.as_deref())
                .map(|href| self.resolve_href(href));

            let candidate = ResultLinkCandidate {
                year: extract_year(&exam_text, self.fallback_year),
                inferred_admission_year: infer_admission_year(&batch_session),
                navigation_target: NavigationTarget {
                    link_text: exam_text.clone(),
                    href,
                },
                exam_text,
                semester,
                batch_session,
                published_date,
                is_special,
            };
            debug!(
                "Catalog entry: sem {} | year {} | batch {} (admission {:?}) | published {} | special {}",
                candidate.semester,
                candidate.year,
                candidate.batch_session,
                candidate.inferred_admission_year,
                candidate.published_date,
                candidate.is_special
            );
            candidates.push(candidate);
        }
        Ok(candidates)
    }

    /// Absolute URLs and `javascript:` postbacks pass through; relative
    /// paths are joined onto the portal URL.
    fn resolve_href(&self, href: &str) -> String {
        let href = href.trim();
        if href.starts_with("http") || href.starts_with("javascript:") {
            return href.to_string();
        }
        Url::parse(&self.portal_url)
            .and_then(|base| base.join(href))
            .map(|u| u.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.portal_url, href.trim_start_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::session::tests::FakeSession;

    const HOMEPAGE: &str = r#"
<html><body>
<table id="results">
  <tr><th>Examination</th><th>Session</th><th>Published On</th></tr>
  <tr>
    <td><a href="javascript:__doPostBack('ctl00$Main$gv$ctl02$lnk','')">B.Tech. 3rd Semester Examination, 2023</a></td>
    <td>2021-25</td><td>01-06-2024</td>
  </tr>
  <tr>
    <td><a href="ResultsBTech3rdSem2022.aspx">B.Tech. 3rd Semester Examination, 2022</a></td>
    <td>21-25</td><td>01-06-2023</td>
  </tr>
  <tr>
    <td><a href="https://results.beup.ac.in/BTech5thSem2023.aspx">B.Tech. 5th Semester Examination, 2023 (S)</a></td>
    <td>Arrear-2024</td><td>15-02-2024</td>
  </tr>
  <tr><td>M.Tech. 1st Semester Examination, 2023</td><td>2023-25</td><td>01-05-2024</td></tr>
  <tr><td>B.Tech. Semester Examination Notice</td><td>2021-25</td><td>01-05-2024</td></tr>
  <tr><td>B.Tech. 2nd Semester</td><td>2022</td></tr>
</table>
</body></html>
"#;

    fn builder() -> CatalogBuilder {
        let config = AppConfig::without_waits();
        let http = HttpFetcher::new(&config).unwrap();
        CatalogBuilder::new(&config, http)
    }

    #[test]
    fn test_infer_admission_year() {
        assert_eq!(infer_admission_year("2021-25"), Some(2021));
        assert_eq!(infer_admission_year("21-25"), Some(2021));
        assert_eq!(infer_admission_year("Arrear-2024"), None);
        assert_eq!(infer_admission_year("2021"), None);
        assert_eq!(infer_admission_year("abc-25"), None);
    }

    #[test]
    fn test_parse_homepage_rows() {
        let catalog = builder().parse(HOMEPAGE);
        assert_eq!(catalog.len(), 3);

        let first = &catalog[0];
        assert_eq!(first.semester, 3);
        assert_eq!(first.year, 2023);
        assert_eq!(first.batch_session, "2021-25");
        assert_eq!(first.inferred_admission_year, Some(2021));
        assert!(!first.is_special);
        assert!(first.navigation_target.postback().is_some());

        let second = &catalog[1];
        assert_eq!(second.inferred_admission_year, Some(2021));
        assert_eq!(
            second.navigation_target.resolved_url(),
            Some("https://results.beup.ac.in/ResultsBTech3rdSem2022.aspx")
        );

        let third = &catalog[2];
        assert_eq!(third.semester, 5);
        assert!(third.is_special);
        assert_eq!(third.inferred_admission_year, None);
    }

    #[tokio::test]
    async fn test_unreachable_portal_yields_empty_catalog() {
        let config = AppConfig {
            portal_url: "http://127.0.0.1:9/".into(),
            http_timeout_secs: 5,
            ..AppConfig::without_waits()
        };
        let builder = CatalogBuilder::new(&config, HttpFetcher::new(&config).unwrap());
        let session = FakeSession::new();

        let catalog = builder.fetch(Some(&session), &CatalogFilter::default()).await;
        assert!(catalog.is_empty());
        assert_eq!(session.calls(), vec!["goto http://127.0.0.1:9/".to_string()]);

        let catalog = builder.fetch::<FakeSession>(None, &CatalogFilter::default()).await;
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_garbage_yields_empty_catalog() {
        assert!(builder().parse("<html><p>maintenance</p></html>").is_empty());
    }

    #[test]
    fn test_filter_by_admission_and_date() {
        let catalog = builder().parse(HOMEPAGE);
        let filter = CatalogFilter {
            admission_year: Some(2022),
            publication_dates: vec![],
        };
        // only the arrear row has no inferred year and survives
        let kept = filter.apply(catalog.clone());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].batch_session, "Arrear-2024");

        let filter = CatalogFilter {
            admission_year: None,
            publication_dates: vec![NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()],
        };
        let kept = filter.apply(catalog);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].published_date, "01-06-2024");
    }

    #[tokio::test]
    async fn test_fetch_prefers_rendered_page() {
        let session = FakeSession::new().with_page("https://results.beup.ac.in/", HOMEPAGE);
        let catalog = builder().fetch(Some(&session), &CatalogFilter::default()).await;
        assert_eq!(catalog.len(), 3);
    }
}
