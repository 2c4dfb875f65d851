use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::app::config::AppConfig;
use crate::browser::session::PortalSession;
use crate::core::models::{RecordOutcome, RegistrationNumber, ResultLinkCandidate, StudentResult};
use crate::modules::extractor::extract_result;

/// Registration-number inputs, most specific first
pub const INPUT_SELECTORS: &[&str] = &[
    "//input[contains(@name,'reg')]",
    "//input[contains(@id,'reg')]",
    "//input[contains(@name,'RegNo')]",
    "//input[contains(@id,'RegNo')]",
    "//input[contains(@name,'txtRegNo')]",
    "//input[contains(@id,'txtRegNo')]",
    "//input[@type='text']",
];

pub const SUBMIT_SELECTORS: &[&str] = &[
    "//input[@type='submit']",
    "//button[@type='submit']",
    "//button[contains(text(),'Submit')]",
    "//button[contains(text(),'Search')]",
    "//button[contains(text(),'Get')]",
    "//button[contains(text(),'Show')]",
    "//input[@value='Submit']",
    "//input[@value='Search']",
    "//input[@value='Get Result']",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    AtHomepage,
    AtSemesterResults,
    AtStudentResult,
    /// Somewhere we did not navigate to on purpose
    Lost,
}

/// Drives one browser session through the portal's per-semester search form
pub struct SearchDriver<'a, S: PortalSession> {
    session: &'a S,
    portal_url: String,
    page_load_wait: Duration,
    back_wait: Duration,
    dump_dir: Option<PathBuf>,
    state: DriverState,
}

impl<'a, S: PortalSession> SearchDriver<'a, S> {
    pub fn new(session: &'a S, config: &AppConfig) -> Self {
        Self {
            session,
            portal_url: config.portal_url.clone(),
            page_load_wait: config.page_load_wait(),
            back_wait: config.back_wait(),
            dump_dir: config.dump_pages_dir.clone(),
            state: DriverState::Lost,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub async fn return_home(&mut self) -> Result<()> {
        debug!("Returning to homepage");
        if let Err(e) = self.session.goto(&self.portal_url).await {
            self.state = DriverState::Lost;
            return Err(e.context("failed to return to homepage"));
        }
        sleep(self.page_load_wait).await;
        self.state = DriverState::AtHomepage;
        Ok(())
    }

    pub async fn read_page(&self) -> Result<String> {
        self.session.content().await
    }

    /// Open a semester's search page: direct URL, then a click on the link
    /// text, then the postback. `false` once all three have failed.
    pub async fn navigate_to_semester(&mut self, link: &ResultLinkCandidate) -> bool {
        let target = &link.navigation_target;
        let mut method = None;

        if let Some(url) = target.resolved_url() {
            match self.session.goto(url).await {
                Ok(()) => method = Some("direct URL"),
                Err(e) => debug!("Direct navigation to {} failed: {:#}", url, e),
            }
        }

        if method.is_none() {
            match self.session.click_link_by_text(&target.link_text).await {
                Ok(true) => method = Some("link click"),
                Ok(false) => debug!("No link with text {:?} on the page", target.link_text),
                Err(e) => debug!("Clicking {:?} failed: {:#}", target.link_text, e),
            }
        }

        if method.is_none() {
            if let Some(postback) = target.postback() {
                match self.session.execute(&postback.script()).await {
                    Ok(()) => method = Some("postback"),
                    Err(e) => debug!("Postback {} failed: {:#}", postback.target, e),
                }
            }
        }

        match method {
            Some(method) => {
                sleep(self.page_load_wait).await;
                self.state = DriverState::AtSemesterResults;
                info!("Opened {} via {}", link.exam_text, method);
                true
            }
            None => {
                self.state = DriverState::Lost;
                warn!("Failed to navigate to semester results: {}", link.exam_text);
                false
            }
        }
    }

    async fn first_present(&self, xpaths: &'static [&'static str]) -> Option<&'static str> {
        for &xpath in xpaths {
            match self.session.element_exists(xpath).await {
                Ok(true) => return Some(xpath),
                Ok(false) => {}
                Err(e) => debug!("Lookup of {} failed: {:#}", xpath, e),
            }
        }
        None
    }

    /// Type the registration number and submit. Falls back to Enter on the
    /// input when the form has no recognisable submit control. Any failure
    /// leaves the driver `Lost` so the next step reopens the semester.
    pub async fn search_student(&mut self, reg: &RegistrationNumber) -> bool {
        let Some(input) = self.first_present(INPUT_SELECTORS).await else {
            warn!("Could not find registration number input field");
            self.state = DriverState::Lost;
            return false;
        };
        if let Err(e) = self.session.fill_input(input, reg.as_str()).await {
            warn!("Could not enter {} into {}: {:#}", reg, input, e);
            self.state = DriverState::Lost;
            return false;
        }

        let submitted = match self.first_present(SUBMIT_SELECTORS).await {
            Some(button) => self.session.click_element(button).await,
            None => {
                debug!("No submit control found, pressing Enter");
                self.session.press_enter(input).await
            }
        };
        if let Err(e) = submitted {
            warn!("Could not submit search for {}: {:#}", reg, e);
            self.state = DriverState::Lost;
            return false;
        }

        sleep(self.page_load_wait).await;
        self.state = DriverState::AtStudentResult;
        true
    }

    /// Back to the search form. A failed back navigation reopens the
    /// semester from the homepage instead.
    pub async fn return_to_search(&mut self, link: &ResultLinkCandidate) {
        match self.session.go_back().await {
            Ok(()) => {
                sleep(self.back_wait).await;
                self.state = DriverState::AtSemesterResults;
            }
            Err(e) => {
                warn!("Back navigation failed ({:#}), reopening {}", e, link.exam_text);
                self.reopen(link).await;
            }
        }
    }

    async fn reopen(&mut self, link: &ResultLinkCandidate) {
        if let Err(e) = self.return_home().await {
            warn!("{:#}", e);
        }
        self.navigate_to_semester(link).await;
    }

    /// One full search cycle for a student. Always yields a record and
    /// leaves the driver on the semester's search page when it can.
    pub async fn lookup(&mut self, link: &ResultLinkCandidate, reg: &RegistrationNumber) -> StudentResult {
        let record = if self.search_student(reg).await {
            match self.read_page().await {
                Ok(html) => {
                    self.dump_page(reg, &html);
                    extract_result(&html, reg)
                }
                Err(e) => StudentResult::failed(reg.clone(), format!("Could not read result page: {:#}", e)),
            }
        } else {
            StudentResult::failed(reg.clone(), "Could not search for student result")
        };

        match self.state {
            DriverState::AtStudentResult => self.return_to_search(link).await,
            DriverState::AtSemesterResults => {}
            DriverState::AtHomepage | DriverState::Lost => self.reopen(link).await,
        }

        let record = record.for_semester(link.semester, link.year);
        match record.outcome() {
            RecordOutcome::Found => info!("✓ {}: {} (SGPA {})", reg, record.name, record.sgpa),
            RecordOutcome::NoData => warn!("{}: result page carried no data", reg),
            RecordOutcome::Errored => warn!("✗ {}: {}", reg, record.error.as_deref().unwrap_or_default()),
        }
        record
    }

    fn dump_page(&self, reg: &RegistrationNumber, html: &str) {
        let Some(dir) = &self.dump_dir else {
            return;
        };
        let path = dir.join(format!("debug_page_{}.html", reg));
        let written = fs::create_dir_all(dir).and_then(|_| fs::write(&path, html));
        match written {
            Ok(()) => debug!("Saved page to {}", path.display()),
            Err(e) => warn!("Could not save page to {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::session::tests::FakeSession;
    use crate::core::models::NavigationTarget;

    const HOME: &str = "https://results.beup.ac.in/";
    const SEM3: &str = "https://results.beup.ac.in/BTech3rdSem2023.aspx";
    const STUDENT_PAGE: &str = r#"<table>
        <tr><td>Name</td><td>ASHA KUMARI</td></tr>
        <tr><td>Programming in C</td><td>81</td><td>A+</td></tr>
    </table><p>SGPA: 8.10</p>"#;

    fn link(href: Option<&str>) -> ResultLinkCandidate {
        let exam_text = "B.Tech. 3rd Semester Examination, 2023".to_string();
        ResultLinkCandidate {
            navigation_target: NavigationTarget {
                link_text: exam_text.clone(),
                href: href.map(str::to_string),
            },
            exam_text,
            semester: 3,
            year: 2023,
            batch_session: "2021-25".into(),
            inferred_admission_year: Some(2021),
            published_date: "01-06-2024".into(),
            is_special: false,
        }
    }

    fn portal() -> FakeSession {
        FakeSession::new()
            .with_page(HOME, "<html>home</html>")
            .with_page(SEM3, "<html><form></form></html>")
            .with_search_form(SEM3, "//input[contains(@id,'txtRegNo')]", Some("//input[@type='submit']"))
            .with_student("21105124001", STUDENT_PAGE)
    }

    #[tokio::test]
    async fn test_navigation_falls_back_to_click_then_postback() {
        let config = AppConfig::without_waits();

        let session = portal().with_broken_url(SEM3).with_link(&link(None).exam_text, SEM3);
        let mut driver = SearchDriver::new(&session, &config);
        assert!(driver.navigate_to_semester(&link(Some(SEM3))).await);
        assert_eq!(driver.state(), DriverState::AtSemesterResults);
        assert!(session.calls().iter().any(|c| c.starts_with("click ")));

        let session = portal().with_postback("ctl00$Main$lnk3", SEM3);
        let mut driver = SearchDriver::new(&session, &config);
        let postback = link(Some("javascript:__doPostBack('ctl00$Main$lnk3','')"));
        assert!(driver.navigate_to_semester(&postback).await);
        assert_eq!(session.current_url().as_deref(), Some(SEM3));

        let session = portal();
        let mut driver = SearchDriver::new(&session, &config);
        assert!(!driver.navigate_to_semester(&link(None)).await);
        assert_eq!(driver.state(), DriverState::Lost);
    }

    #[tokio::test]
    async fn test_lookup_cycle_returns_to_search() {
        let config = AppConfig::without_waits();
        let session = portal();
        let sem3 = link(Some(SEM3));
        let mut driver = SearchDriver::new(&session, &config);
        driver.return_home().await.unwrap();
        assert!(driver.navigate_to_semester(&sem3).await);

        let found = driver.lookup(&sem3, &RegistrationNumber::from("21105124001")).await;
        assert_eq!(found.name, "ASHA KUMARI");
        assert_eq!((found.semester, found.year), (3, 2023));
        assert_eq!(driver.state(), DriverState::AtSemesterResults);
        assert_eq!(session.current_url().as_deref(), Some(SEM3));

        let missing = driver.lookup(&sem3, &RegistrationNumber::from("21105124002")).await;
        assert_eq!(missing.outcome(), RecordOutcome::Errored);
        assert_eq!(missing.semester, 3);

        let calls = session.calls();
        assert!(calls.contains(&"fill //input[contains(@id,'txtRegNo')] 21105124002".to_string()));
        assert!(calls.contains(&"submit //input[@type='submit']".to_string()));
    }

    #[tokio::test]
    async fn test_enter_used_without_submit_control() {
        let config = AppConfig::without_waits();
        let session = FakeSession::new()
            .with_page(SEM3, "<html></html>")
            .with_search_form(SEM3, "//input[@type='text']", None);
        let mut driver = SearchDriver::new(&session, &config);
        assert!(driver.navigate_to_semester(&link(Some(SEM3))).await);
        assert!(driver.search_student(&RegistrationNumber::from("21105124003")).await);
        assert!(session.calls().contains(&"enter //input[@type='text']".to_string()));
    }

    #[tokio::test]
    async fn test_failed_back_reopens_semester() {
        let config = AppConfig::without_waits();
        let session = portal().failing_back();
        let sem3 = link(Some(SEM3));
        let mut driver = SearchDriver::new(&session, &config);
        assert!(driver.navigate_to_semester(&sem3).await);

        let record = driver.lookup(&sem3, &RegistrationNumber::from("21105124001")).await;
        assert_eq!(record.outcome(), RecordOutcome::Found);
        assert_eq!(driver.state(), DriverState::AtSemesterResults);
        let calls = session.calls();
        let back = calls.iter().position(|c| c == "back").unwrap();
        assert_eq!(calls[back + 1], format!("goto {}", HOME));
        assert_eq!(calls[back + 2], format!("goto {}", SEM3));
    }

    #[tokio::test]
    async fn test_missing_input_is_a_per_student_error() {
        let config = AppConfig::without_waits();
        let session = FakeSession::new().with_page(HOME, "<html></html>").with_page(SEM3, "<html></html>");
        let sem3 = link(Some(SEM3));
        let mut driver = SearchDriver::new(&session, &config);
        assert!(driver.navigate_to_semester(&sem3).await);
        let record = driver.lookup(&sem3, &RegistrationNumber::from("21105124001")).await;
        assert_eq!(record.error.as_deref(), Some("Could not search for student result"));
        assert_eq!(driver.state(), DriverState::AtSemesterResults);
    }

    #[tokio::test]
    async fn test_page_without_form_reopens_semester() {
        const NOTICE: &str = "https://results.beup.ac.in/Notice.aspx";
        let config = AppConfig::without_waits();
        let sem3 = link(None);
        let session = FakeSession::new()
            .with_page(HOME, "<html>home</html>")
            .with_page(NOTICE, "<html>Results are being updated</html>")
            .with_link(&sem3.exam_text, NOTICE);
        let mut driver = SearchDriver::new(&session, &config);
        driver.return_home().await.unwrap();
        assert!(driver.navigate_to_semester(&sem3).await);

        let record = driver.lookup(&sem3, &RegistrationNumber::from("21105124001")).await;
        assert_eq!(record.error.as_deref(), Some("Could not search for student result"));

        let click = format!("click {}", sem3.exam_text);
        let home = format!("goto {}", HOME);
        assert_eq!(session.calls(), vec![home.clone(), click.clone(), home, click]);
    }
}
