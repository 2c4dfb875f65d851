use anyhow::Result;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::app::cli::HarvestRequest;
use crate::app::config::AppConfig;
use crate::browser::{Capability, HttpFetcher, PortalSession};
use crate::core::error::HarvestError;
use crate::core::models::{RegistrationNumber, ResultLinkCandidate, StudentResult};
use crate::core::types::ProcessStats;
use crate::modules::catalogue::{CatalogBuilder, CatalogFilter};
use crate::modules::denylist::DENYLIST_VERSION;
use crate::modules::matcher::{describe_catalog, match_semesters};
use crate::modules::registration;
use crate::modules::storage::persist_results;
use crate::services::driver::SearchDriver;

/// One error record per registration number, stamped with the semester
fn error_records(regs: &[RegistrationNumber], semester: u8, year: i32, reason: &str) -> Vec<StudentResult> {
    regs.iter()
        .map(|reg| StudentResult::failed(reg.clone(), reason).for_semester(semester, year))
        .collect()
}

/// Walks matched semester links and registration numbers strictly in order
/// over a single session.
pub struct BatchOrchestrator<'a, S: PortalSession> {
    driver: SearchDriver<'a, S>,
    catalog: &'a CatalogBuilder,
}

impl<'a, S: PortalSession> BatchOrchestrator<'a, S> {
    pub fn new(session: &'a S, catalog: &'a CatalogBuilder, config: &AppConfig) -> Self {
        Self {
            driver: SearchDriver::new(session, config),
            catalog,
        }
    }

    /// Every (link, registration number) pair yields exactly one record.
    pub async fn run(&mut self, links: &[ResultLinkCandidate], regs: &[RegistrationNumber]) -> Vec<StudentResult> {
        let mut results = Vec::with_capacity(links.len() * regs.len());

        for link in links {
            info!("{}", "=".repeat(60));
            info!("📖 Semester {}: {}", link.semester, link.exam_text);
            let first = results.len();

            let Some(live) = self.refresh_link(link).await else {
                warn!("Semester link not found on the homepage any more: {}", link.exam_text);
                results.extend(error_records(
                    regs,
                    link.semester,
                    link.year,
                    &format!("Semester link not found: {}", link.exam_text),
                ));
                continue;
            };

            if !self.driver.navigate_to_semester(&live).await {
                results.extend(error_records(
                    regs,
                    link.semester,
                    link.year,
                    &format!("Could not open semester results: {}", link.exam_text),
                ));
                continue;
            }

            for (i, reg) in regs.iter().enumerate() {
                info!("Processing student {} ({}/{})", reg, i + 1, regs.len());
                results.push(self.driver.lookup(&live, reg).await);
            }

            debug!("Driver left semester {} in state {:?}", link.semester, self.driver.state());
            let stats = ProcessStats::tally(&results[first..]);
            info!(
                "✅ Semester {} done: found {}, no data {}, failed {}",
                link.semester, stats.found, stats.no_data, stats.failed
            );
        }
        results
    }

    /// Back to the homepage and find the same listing again; link targets
    /// can be bound to the page they were rendered on.
    async fn refresh_link(&mut self, link: &ResultLinkCandidate) -> Option<ResultLinkCandidate> {
        if let Err(e) = self.driver.return_home().await {
            warn!("{:#}", e);
            return None;
        }
        let html = match self.driver.read_page().await {
            Ok(html) => html,
            Err(e) => {
                warn!("Could not read homepage: {:#}", e);
                return None;
            }
        };
        self.catalog.parse(&html).into_iter().find(|c| c.same_listing(link))
    }
}

/// Match the fetched listing, then search. Request-level failures only;
/// everything per student is already folded into the records.
pub(crate) async fn harvest<S: PortalSession>(
    config: &AppConfig,
    request: &HarvestRequest,
    catalog: &CatalogBuilder,
    listing: Vec<ResultLinkCandidate>,
    session: Result<&S, &str>,
    regs: &[RegistrationNumber],
) -> Result<Vec<StudentResult>, HarvestError> {
    if listing.is_empty() {
        return Err(HarvestError::CatalogUnavailable);
    }

    let by_date = CatalogFilter {
        admission_year: None,
        publication_dates: request.publication_dates.clone(),
    };
    let candidates = by_date.apply(listing.clone());
    let cohort = match_semesters(
        &candidates,
        &request.semesters,
        request.admission_year,
        request.passout_year,
    );
    let diagnostic = || {
        describe_catalog(
            &listing,
            &request.semesters,
            request.admission_year,
            request.passout_year,
        )
    };

    if cohort.is_empty() {
        return Err(HarvestError::NoMatch {
            diagnostic: diagnostic(),
        });
    }
    if !cohort.unresolved.is_empty() {
        warn!(
            "Semesters {:?} have no matching listing, continuing with the rest.\n{}",
            cohort.unresolved,
            diagnostic()
        );
    }

    let session = session.map_err(|reason| HarvestError::InteractiveUnavailable(reason.to_string()))?;

    let links: Vec<ResultLinkCandidate> = cohort.resolved.values().cloned().collect();
    let mut orchestrator = BatchOrchestrator::new(session, catalog, config);
    let mut results = orchestrator.run(&links, regs).await;

    for &semester in &cohort.unresolved {
        results.extend(error_records(
            regs,
            semester,
            0,
            &format!(
                "No published result matched semester {} for admission year {}",
                semester, request.admission_year
            ),
        ));
    }

    if results.is_empty() {
        return Err(HarvestError::NoResults);
    }
    Ok(results)
}

#[derive(Debug)]
pub struct RunReport {
    pub results: Vec<StudentResult>,
    pub stats: ProcessStats,
    pub output: PathBuf,
}

/// Entry point for `harvest`: acquires the browser, runs the batch,
/// releases the browser on every path, then exports.
pub async fn run(config: &AppConfig, request: &HarvestRequest) -> Result<RunReport> {
    info!("🚀 Starting result harvest...");
    info!(
        "📊 Admission {} (passout {}), branch {}, semesters {:?}, sequence {}-{}",
        request.admission_year,
        request.passout_year,
        request.branch_code,
        request.semesters,
        request.start_seq,
        request.end_seq
    );
    debug!("Subject row denylist v{}", DENYLIST_VERSION);

    let regs = registration::generate(
        request.admission_year,
        &request.branch_code,
        &config.college_code,
        request.start_seq,
        request.end_seq,
    )?;
    if regs.is_empty() {
        return Err(HarvestError::InvalidRequest(format!(
            "start sequence {} is after end sequence {}",
            request.start_seq, request.end_seq
        ))
        .into());
    }
    info!("Generated {} registration numbers", regs.len());

    let catalog = CatalogBuilder::new(config, HttpFetcher::new(config)?);
    let capability = Capability::acquire(config).await;
    let listing = catalog.fetch(capability.session(), &CatalogFilter::default()).await;
    let outcome = harvest(config, request, &catalog, listing, capability.session_or_reason(), &regs).await;
    capability.release().await;
    let results = outcome?;

    let output = persist_results(&results, request, config)?;
    let stats = ProcessStats::tally(&results);
    info!("{}", "=".repeat(60));
    info!(
        "🎉 Done! {} records: {} successful ({} without data), {} failed",
        stats.total(),
        stats.successful(),
        stats.no_data,
        stats.failed
    );
    info!("📁 Saved to {}", output.display());

    Ok(RunReport { results, stats, output })
}

/// Entry point for `catalog`
pub async fn list_catalog(config: &AppConfig, filter: &CatalogFilter) -> Result<Vec<ResultLinkCandidate>> {
    let catalog = CatalogBuilder::new(config, HttpFetcher::new(config)?);
    let capability = Capability::acquire(config).await;
    let listing = catalog.fetch(capability.session(), filter).await;
    capability.release().await;
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::cli::ExportFormat;
    use crate::browser::session::tests::FakeSession;
    use crate::core::models::RecordOutcome;

    const HOME: &str = "https://results.beup.ac.in/";
    const SEM5: &str = "https://results.beup.ac.in/BTech5thSem2023.aspx";
    const HOMEPAGE: &str = r#"<table>
        <tr>
          <td><a href="BTech5thSem2023.aspx">B.Tech. 5th Semester Examination, 2023</a></td>
          <td>2021-25</td><td>10-03-2024</td>
        </tr>
    </table>"#;
    const STUDENT_PAGE: &str = r#"<table>
        <tr><td>Name</td><td>ASHA KUMARI</td></tr>
        <tr><td>101</td><td>Engineering Mathematics</td><td>78</td><td>A</td></tr>
    </table><p>SGPA: 7.40</p>"#;

    fn portal() -> FakeSession {
        FakeSession::new()
            .with_page(HOME, HOMEPAGE)
            .with_page(SEM5, "<html><form></form></html>")
            .with_search_form(SEM5, "//input[contains(@name,'reg')]", Some("//input[@type='submit']"))
            .with_student("21105124001", STUDENT_PAGE)
    }

    fn request(semesters: Vec<u8>) -> HarvestRequest {
        HarvestRequest {
            admission_year: 2021,
            passout_year: 2025,
            branch_code: "105".into(),
            semesters,
            start_seq: 1,
            end_seq: 2,
            publication_dates: vec![],
            format: ExportFormat::Csv,
        }
    }

    fn catalog(config: &AppConfig) -> CatalogBuilder {
        CatalogBuilder::new(config, HttpFetcher::new(config).unwrap())
    }

    fn regs() -> Vec<RegistrationNumber> {
        registration::generate(2021, "105", "124", 1, 2).unwrap()
    }

    #[tokio::test]
    async fn test_partial_match_still_succeeds() {
        let config = AppConfig::without_waits();
        let session = portal();
        let builder = catalog(&config);
        let listing = builder.fetch(Some(&session), &CatalogFilter::default()).await;
        let results = harvest(&config, &request(vec![3, 5]), &builder, listing, Ok(&session), &regs())
            .await
            .unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].outcome(), RecordOutcome::Found);
        assert_eq!(results[0].name, "ASHA KUMARI");
        assert_eq!((results[0].semester, results[0].year), (5, 2023));
        assert_eq!(results[1].outcome(), RecordOutcome::Errored);

        let sem3: Vec<_> = results.iter().filter(|r| r.semester == 3).collect();
        assert_eq!(sem3.len(), 2);
        assert!(sem3.iter().all(|r| r.error.as_deref().is_some_and(|e| e.contains("semester 3"))));
    }

    #[tokio::test]
    async fn test_no_semester_matched_fails_with_diagnostic() {
        let config = AppConfig::without_waits();
        let session = portal();
        let builder = catalog(&config);
        let listing = builder.parse(HOMEPAGE);
        let err = harvest(&config, &request(vec![3, 4]), &builder, listing, Ok(&session), &regs())
            .await
            .unwrap_err();
        match err {
            HarvestError::NoMatch { diagnostic } => {
                assert!(diagnostic.contains("Semester 5: 2021-25 (10-03-2024)"));
            }
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publication_date_filter_can_exclude_everything() {
        let config = AppConfig::without_waits();
        let session = portal();
        let builder = catalog(&config);
        let mut req = request(vec![5]);
        req.publication_dates = vec![chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()];
        let err = harvest(&config, &req, &builder, builder.parse(HOMEPAGE), Ok(&session), &regs())
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::NoMatch { .. }));
    }

    #[tokio::test]
    async fn test_empty_catalog_is_request_failure() {
        let config = AppConfig::without_waits();
        let session = portal();
        let err = harvest(&config, &request(vec![5]), &catalog(&config), vec![], Ok(&session), &regs())
            .await
            .unwrap_err();
        assert!(matches!(err, HarvestError::CatalogUnavailable));
    }

    #[tokio::test]
    async fn test_stateless_capability_cannot_search() {
        let config = AppConfig::without_waits();
        let builder = catalog(&config);
        let listing = builder.parse(HOMEPAGE);
        let err = harvest::<FakeSession>(
            &config,
            &request(vec![5]),
            &builder,
            listing,
            Err("chrome not installed"),
            &regs(),
        )
        .await
        .unwrap_err();
        match err {
            HarvestError::InteractiveUnavailable(reason) => assert_eq!(reason, "chrome not installed"),
            other => panic!("expected InteractiveUnavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stale_link_becomes_error_records() {
        let config = AppConfig::without_waits();
        let session = portal();
        let builder = catalog(&config);
        let mut stale = builder.parse(HOMEPAGE).remove(0);
        stale.batch_session = "2020-24".into();

        let mut orchestrator = BatchOrchestrator::new(&session, &builder, &config);
        let results = orchestrator.run(&[stale], &regs()).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| {
            r.error.as_deref() == Some("Semester link not found: B.Tech. 5th Semester Examination, 2023")
                && r.semester == 5
        }));
    }

    #[tokio::test]
    async fn test_unreachable_semester_becomes_error_records() {
        let config = AppConfig::without_waits();
        let session = FakeSession::new().with_page(HOME, HOMEPAGE);
        let builder = catalog(&config);
        let listing = builder.parse(HOMEPAGE);
        let regs = regs();

        let mut orchestrator = BatchOrchestrator::new(&session, &builder, &config);
        let results = orchestrator.run(&listing, &regs).await;
        assert_eq!(results.len(), regs.len());
        for (record, reg) in results.iter().zip(&regs) {
            assert_eq!(&record.registration_number, reg);
            assert_eq!((record.semester, record.year), (5, 2023));
            assert_eq!(
                record.error.as_deref(),
                Some("Could not open semester results: B.Tech. 5th Semester Examination, 2023")
            );
        }
        assert!(session.calls().contains(&format!("goto {}", SEM5)));
    }
}
