use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::Session;
use crate::util::{human_format, offset_format};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "md",
        }
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize session: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to write marker table: {0}")]
    Csv(#[from] csv::Error),
}

/// Write a report for `session` into `dir`, one file per call, named
/// `session_<id>.<ext>`. Returns the path written.
pub fn export_session(
    session: &Session,
    dir: &Path,
    format: ExportFormat,
) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("session_{}.{}", session.id, format.extension()));

    match format {
        ExportFormat::Json => write_json(session, &path)?,
        ExportFormat::Csv => write_csv(session, &path)?,
        ExportFormat::Markdown => write_markdown(session, &path)?,
    }

    Ok(path)
}

fn write_json(session: &Session, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), session)?;
    Ok(())
}

/// One row per marker; timestamps as RFC 3339
fn write_csv(session: &Session, path: &Path) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["marker_id", "timestamp", "label", "notes"])?;

    for marker in &session.markers {
        writer.write_record([
            marker.id.as_str(),
            &marker.timestamp.to_rfc3339(),
            marker.label.as_str(),
            marker.notes.as_deref().unwrap_or(""),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn write_markdown(session: &Session, path: &Path) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);

    writeln!(out, "# Session Report: {}", session.title)?;
    writeln!(out)?;
    if !session.description.is_empty() {
        writeln!(out, "{}", session.description)?;
        writeln!(out)?;
    }
    writeln!(
        out,
        "- **Start Time**: {}",
        session.start_time.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(
        out,
        "- **End Time**: {}",
        session
            .end_time
            .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
    )?;
    writeln!(out, "- **Duration**: {}", human_format(session.duration_ms))?;

    writeln!(out, "\n## Markers\n")?;
    writeln!(out, "| Time | Timestamp | Label | Notes |")?;
    writeln!(out, "|------|-----------|-------|-------|")?;

    for marker in &session.markers {
        let offset_ms = (marker.timestamp - session.start_time).num_milliseconds();
        writeln!(
            out,
            "| {} | {} | {} | {} |",
            offset_format(offset_ms),
            marker.timestamp.format("%H:%M:%S"),
            marker.label,
            marker.notes.as_deref().unwrap_or("-")
        )?;
    }

    out.flush()?;
    Ok(())
}
