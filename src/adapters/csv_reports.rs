use crate::core::batch::{check_batch_size, BatchOutcome};
use crate::domain::assessment::AssessmentRequest;
use crate::domain::labels::DisasterType;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One row of a batch input CSV. Only `text` is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BatchReport {
    pub text: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub disaster_type: Option<String>,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl BatchReport {
    /// Relative image paths resolve against `base_dir`. An unreadable image
    /// is dropped with a warning and the report is assessed on its text.
    pub fn into_request(self, base_dir: Option<&Path>) -> AssessmentRequest {
        let mut request = AssessmentRequest::from_text(self.text.clone());

        if let Some(location) = non_blank(&self.location) {
            request = request.with_location(location);
        }
        if let Some(disaster_type) = non_blank(&self.disaster_type) {
            request = request.with_disaster_type(DisasterType::parse_lenient(disaster_type));
        }

        if let Some(image_path) = self.image_path.filter(|p| !p.as_os_str().is_empty()) {
            let resolved = match base_dir {
                Some(dir) if image_path.is_relative() => dir.join(&image_path),
                _ => image_path,
            };
            match std::fs::read(&resolved) {
                Ok(bytes) => request = request.with_image(bytes),
                Err(e) => tracing::warn!(
                    "⚠️ Cannot read image {}: {}, assessing text only",
                    resolved.display(),
                    e
                ),
            }
        }

        request
    }
}

pub fn read_reports_csv(path: impl AsRef<Path>) -> Result<Vec<BatchReport>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let mut reports = Vec::new();
    for row in reader.deserialize() {
        reports.push(row?);
    }
    tracing::info!(
        "📥 Read {} reports from {}",
        reports.len(),
        path.as_ref().display()
    );
    Ok(reports)
}

/// Reads the CSV and turns every row into a request, resolving image paths
/// relative to the CSV file. The row count is checked against `max_reports`
/// before any image is read.
pub fn load_requests(path: impl AsRef<Path>, max_reports: usize) -> Result<Vec<AssessmentRequest>> {
    let path = path.as_ref();
    let base_dir = path.parent();
    let reports = read_reports_csv(path)?;
    check_batch_size(reports.len(), max_reports)?;
    Ok(reports
        .into_iter()
        .map(|report| report.into_request(base_dir))
        .collect())
}

#[derive(Debug, Serialize)]
struct ResultRow<'a> {
    index: usize,
    text: &'a str,
    location: &'a str,
    disaster_type: &'a str,
    is_emergency: bool,
    urgency_level: &'static str,
    priority_score: u8,
    severity_level: &'static str,
    damage_detected: bool,
    requires_immediate_action: bool,
    used_fallback: bool,
    top_recommendation: &'a str,
    processing_time_ms: f64,
}

pub fn write_results_csv(path: impl AsRef<Path>, outcome: &BatchOutcome) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;

    for (index, result) in outcome.results.iter().enumerate() {
        writer.serialize(ResultRow {
            index: index + 1,
            text: result.text.as_deref().unwrap_or(""),
            location: result.location.as_deref().unwrap_or(""),
            disaster_type: result.disaster_type_label(),
            is_emergency: result.is_emergency,
            urgency_level: result.urgency_level.as_str(),
            priority_score: result.priority_score,
            severity_level: result.severity_level.as_str(),
            damage_detected: result.damage_detected,
            requires_immediate_action: result.requires_immediate_action,
            used_fallback: result.used_fallback(),
            top_recommendation: result
                .recommendations
                .first()
                .map(String::as_str)
                .unwrap_or(""),
            processing_time_ms: result.processing_info.processing_time_ms,
        })?;
    }
    writer.flush()?;

    tracing::info!(
        "📁 Wrote {} result rows to {}",
        outcome.results.len(),
        path.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::DEFAULT_MAX_REPORTS;
    use crate::utils::error::TriageError;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_read_reports_with_optional_columns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "text,location,disaster_type,image_path").unwrap();
        writeln!(file, "\"Trapped, need rescue\",Hualien,earthquake,").unwrap();
        writeln!(file, "Power is out,,,").unwrap();

        let reports = read_reports_csv(file.path()).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].text, "Trapped, need rescue");
        assert_eq!(reports[0].location.as_deref(), Some("Hualien"));

        let request = reports[1].clone().into_request(None);
        assert!(request.location.is_none());
        assert!(request.disaster_type.is_none());
        assert!(request.image.is_none());

        let request = reports[0].clone().into_request(None);
        assert_eq!(request.disaster_type, Some(DisasterType::Earthquake));
    }

    #[test]
    fn test_text_only_csv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "text").unwrap();
        writeln!(file, "Flooded basement").unwrap();

        let requests = load_requests(file.path(), DEFAULT_MAX_REPORTS).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].text_input(), Some("Flooded basement"));
    }

    #[test]
    fn test_relative_image_resolves_against_csv_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("scene.png"), b"fake-bytes").unwrap();
        let csv_path = dir.path().join("reports.csv");
        std::fs::write(
            &csv_path,
            "text,image_path\nroof gone,scene.png\nwall cracked,missing.png\n",
        )
        .unwrap();

        let requests = load_requests(&csv_path, DEFAULT_MAX_REPORTS).unwrap();
        assert_eq!(requests[0].image.as_deref(), Some(&b"fake-bytes"[..]));
        // 讀不到的影像只記錄警告
        assert!(requests[1].image.is_none());
    }

    #[test]
    fn test_missing_text_column_is_csv_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "location").unwrap();
        writeln!(file, "Taipei").unwrap();
        assert!(matches!(
            read_reports_csv(file.path()),
            Err(TriageError::CsvError(_))
        ));
    }

    #[test]
    fn test_oversized_batch_is_rejected_before_images_are_read() {
        let dir = TempDir::new().unwrap();
        // 影像路徑是一個目錄：若被讀取會產生警告並被丟棄
        std::fs::create_dir(dir.path().join("scene.png")).unwrap();
        let csv_path = dir.path().join("reports.csv");
        std::fs::write(
            &csv_path,
            "text,image_path
one,scene.png
two,scene.png
three,scene.png
",
        )
        .unwrap();

        match load_requests(&csv_path, 2) {
            Err(TriageError::BatchLimitExceeded { size, max }) => {
                assert_eq!(size, 3);
                assert_eq!(max, 2);
            }
            other => panic!("expected limit error, got {:?}", other.map(|r| r.len())),
        }
        assert_eq!(load_requests(&csv_path, 3).unwrap().len(), 3);
    }
}
