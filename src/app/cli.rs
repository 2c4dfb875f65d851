use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::app::config::{AppConfig, BrowserMode};
use crate::app::tables::resolve_branch_code;
use crate::core::error::HarvestError;
use crate::modules::catalogue::CatalogFilter;
use crate::modules::registration::available_semesters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// One row per student-semester, two columns per subject
    Csv,
    /// One row per student, grouped columns per semester
    Sheet,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv | Self::Sheet => "csv",
            Self::Json => "json",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "result_harvester", version, about = "Harvest semester results from the university results portal")]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape results for a registration range and export them
    Harvest(HarvestArgs),
    /// Print the result listings currently published on the portal
    Catalog(CatalogArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct BrowserArgs {
    /// Overrides `browser` from the config file
    #[arg(long, value_enum)]
    pub browser: Option<BrowserMode>,

    /// Overrides `debug_port` from the config file
    #[arg(long)]
    pub port: Option<u16>,
}

impl BrowserArgs {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(mode) = self.browser {
            config.browser = mode;
        }
        if let Some(port) = self.port {
            config.debug_port = port;
        }
    }
}

#[derive(Args, Debug)]
pub struct HarvestArgs {
    #[arg(long)]
    pub admission_year: i32,

    /// Branch display name or 3-digit branch code
    #[arg(long)]
    pub branch: String,

    /// Semesters to fetch; defaults to every semester published so far
    #[arg(long, value_delimiter = ',')]
    pub semesters: Vec<u8>,

    /// First registration sequence number (inclusive)
    #[arg(long)]
    pub start: u32,

    /// Last registration sequence number (inclusive)
    #[arg(long)]
    pub end: u32,

    /// Defaults to admission year + 4
    #[arg(long)]
    pub passout_year: Option<i32>,

    /// Only consider listings published on these dates (YYYY-MM-DD)
    #[arg(long = "publication-date")]
    pub publication_dates: Vec<NaiveDate>,

    #[arg(long, value_enum, default_value_t = ExportFormat::Sheet)]
    pub format: ExportFormat,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

#[derive(Args, Debug)]
pub struct CatalogArgs {
    /// Hide listings whose batch label names a different admission year
    #[arg(long)]
    pub admission_year: Option<i32>,

    #[arg(long = "publication-date")]
    pub publication_dates: Vec<NaiveDate>,

    #[command(flatten)]
    pub browser: BrowserArgs,
}

impl CatalogArgs {
    pub fn filter(&self) -> CatalogFilter {
        CatalogFilter {
            admission_year: self.admission_year,
            publication_dates: self.publication_dates.clone(),
        }
    }
}

/// Registration numbers carry a two-digit year, so only one century fits
const ADMISSION_YEARS: std::ops::RangeInclusive<i32> = 2000..=2099;

/// A validated harvesting request
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestRequest {
    pub admission_year: i32,
    pub passout_year: i32,
    pub branch_code: String,
    pub semesters: Vec<u8>,
    pub start_seq: u32,
    pub end_seq: u32,
    pub publication_dates: Vec<NaiveDate>,
    pub format: ExportFormat,
}

impl HarvestArgs {
    pub fn into_request(self, today: NaiveDate) -> Result<HarvestRequest, HarvestError> {
        if !ADMISSION_YEARS.contains(&self.admission_year) {
            return Err(HarvestError::InvalidRequest(format!(
                "admission year {} out of range {}..={}",
                self.admission_year,
                ADMISSION_YEARS.start(),
                ADMISSION_YEARS.end()
            )));
        }
        let branch_code = resolve_branch_code(&self.branch)
            .ok_or_else(|| HarvestError::InvalidRequest(format!("invalid branch selected: {}", self.branch)))?;

        let mut semesters = if self.semesters.is_empty() {
            available_semesters(self.admission_year, today)
        } else {
            self.semesters
        };
        semesters.sort_unstable();
        semesters.dedup();
        if semesters.is_empty() {
            return Err(HarvestError::InvalidRequest(format!(
                "no semesters published yet for admission year {}",
                self.admission_year
            )));
        }
        if let Some(bad) = semesters.iter().find(|s| !(1..=8).contains(*s)) {
            return Err(HarvestError::InvalidRequest(format!("semester {} out of range 1..=8", bad)));
        }

        Ok(HarvestRequest {
            admission_year: self.admission_year,
            passout_year: self.passout_year.unwrap_or(self.admission_year + 4),
            branch_code: branch_code.to_string(),
            semesters,
            start_seq: self.start,
            end_seq: self.end,
            publication_dates: self.publication_dates,
            format: self.format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 1).unwrap()
    }

    fn harvest_args(args: &[&str]) -> HarvestArgs {
        let argv = ["result_harvester", "harvest"].iter().chain(args.iter());
        match Cli::parse_from(argv).command {
            Command::Harvest(args) => args,
            other => panic!("expected harvest, got {:?}", other),
        }
    }

    #[test]
    fn test_request_defaults() {
        let req = harvest_args(&[
            "--admission-year",
            "2021",
            "--branch",
            "Civil Engineering",
            "--semesters",
            "5,3,3",
            "--start",
            "1",
            "--end",
            "60",
        ])
        .into_request(today())
        .unwrap();
        assert_eq!(req.branch_code, "101");
        assert_eq!(req.passout_year, 2025);
        assert_eq!(req.semesters, vec![3, 5]);
        assert_eq!(req.format, ExportFormat::Sheet);
    }

    #[test]
    fn test_semesters_default_to_available() {
        let req = harvest_args(&[
            "--admission-year",
            "2022",
            "--branch",
            "105",
            "--start",
            "1",
            "--end",
            "2",
            "--format",
            "csv",
            "--publication-date",
            "2024-06-01",
        ])
        .into_request(today())
        .unwrap();
        assert_eq!(req.semesters, vec![1, 2, 3, 4, 5]);
        assert_eq!(req.publication_dates, vec![NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()]);
    }

    #[test]
    fn test_unknown_branch_rejected() {
        let args = harvest_args(&["--admission-year", "2021", "--branch", "Astrology", "--start", "1", "--end", "2"]);
        assert!(matches!(args.into_request(today()), Err(HarvestError::InvalidRequest(_))));
    }

    #[test]
    fn test_admission_year_bounded() {
        for year in ["1999", "2100", "2147483647"] {
            let args = harvest_args(&["--admission-year", year, "--branch", "105", "--start", "1", "--end", "2"]);
            assert!(matches!(args.into_request(today()), Err(HarvestError::InvalidRequest(_))));
        }
        let args = harvest_args(&["--admission-year", "2099", "--branch", "105", "--start", "1", "--end", "2", "--semesters", "1"]);
        assert_eq!(args.into_request(today()).unwrap().passout_year, 2103);
    }

    #[test]
    fn test_browser_overrides() {
        let cli = Cli::parse_from(["result_harvester", "catalog", "--browser", "attach", "--port", "2001"]);
        let Command::Catalog(args) = cli.command else {
            panic!("expected catalog");
        };
        let mut config = AppConfig::default();
        args.browser.apply(&mut config);
        assert_eq!(config.browser, BrowserMode::Attach);
        assert_eq!(config.debug_port, 2001);
        assert!(args.filter().admission_year.is_none());
    }
}
