pub mod flat;
pub mod grouped;

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::app::cli::{ExportFormat, HarvestRequest};
use crate::app::config::AppConfig;
use crate::core::models::StudentResult;
use crate::utils::text::sanitize_filename;
use flat::write_flat;
use grouped::{GroupedLayout, write_grouped};

/// `results_{branch}_{timestamp}.{ext}`
pub fn export_file_name(branch_code: &str, format: ExportFormat) -> String {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    sanitize_filename(&format!("results_{}_{}.{}", branch_code, stamp, format.extension()))
}

pub fn write_results<W: Write>(
    writer: W,
    results: &[StudentResult],
    request: &HarvestRequest,
    config: &AppConfig,
) -> Result<()> {
    match request.format {
        ExportFormat::Csv => write_flat(writer, results),
        ExportFormat::Sheet => {
            let layout = GroupedLayout {
                college_code: config.college_code.clone(),
                branch_code: request.branch_code.clone(),
                admission_year: request.admission_year,
            };
            write_grouped(writer, &layout, results)
        }
        ExportFormat::Json => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, results)?;
            writer.flush()?;
            Ok(())
        }
    }
}

/// Write the batch under `output_dir` and return the file's path
pub fn persist_results(results: &[StudentResult], request: &HarvestRequest, config: &AppConfig) -> Result<PathBuf> {
    let output_dir = Path::new(&config.output_dir);
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;

    let path = output_dir.join(export_file_name(&request.branch_code, request.format));
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_results(BufWriter::new(file), results, request, config)?;

    info!("Saved {} records to {}", results.len(), path.display());
    Ok(path)
}
