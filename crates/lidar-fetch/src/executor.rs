//! Pipeline execution against the remote archive.
//!
//! Point streaming, filtering and reprojection are done by an external point
//! cloud engine. [`PointCloudEngine`] is the seam; [`PdalEngine`] drives the
//! `pdal` command line application.

use crate::elevation::PointCloud;
use crate::pipeline::ExtractionPipeline;
use crate::{FetchError, Result};
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Raw per-point records returned by an engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPoints {
    /// Number of points the engine reported.
    pub count: usize,
    /// One record per point; the last three fields are X, Y, Z.
    pub records: Vec<Vec<f64>>,
}

/// Something that can run an extraction pipeline.
pub trait PointCloudEngine {
    /// Execute `pipeline` and return the raw point records.
    fn run(&self, pipeline: &ExtractionPipeline) -> Result<RawPoints>;
}

/// Runs pipelines through `pdal pipeline --stdin`.
///
/// A CSV text writer targeting standard output is appended to the pipeline,
/// and the emitted `X,Y,Z` rows are parsed back.
#[derive(Debug, Clone)]
pub struct PdalEngine {
    program: PathBuf,
}

impl Default for PdalEngine {
    fn default() -> Self {
        Self::new("pdal")
    }
}

impl PdalEngine {
    /// Use the given `pdal` executable.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn document(pipeline: &ExtractionPipeline) -> serde_json::Value {
        pipeline.to_pdal_json_with(Some(json!({
            "type": "writers.text",
            "filename": "STDOUT",
            "format": "csv",
            "order": "X,Y,Z",
            "keep_unspecified": false,
            "quote_header": false,
            "precision": 6,
        })))
    }
}

impl PointCloudEngine for PdalEngine {
    fn run(&self, pipeline: &ExtractionPipeline) -> Result<RawPoints> {
        let document = Self::document(pipeline);
        debug!("Running {} pipeline --stdin", self.program.display());

        let mut child = Command::new(&self.program)
            .args(["pipeline", "--stdin"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                FetchError::PipelineExecution(format!("failed to start {}: {}", self.program.display(), e))
            })?;

        // stdin is closed at the end of this block so the engine sees EOF
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(document.to_string().as_bytes()),
            None => Ok(()),
        };

        // Reap the child before reporting a failed write; stderr holds the cause.
        let output = child
            .wait_with_output()
            .map_err(|e| FetchError::PipelineExecution(format!("engine did not finish: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::PipelineExecution(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        sent.map_err(|e| FetchError::PipelineExecution(format!("failed to send pipeline: {}", e)))?;

        parse_text_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the CSV emitted by a text writer (header row, then numeric rows).
pub fn parse_text_output(text: &str) -> Result<RawPoints> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result
            .map_err(|e| FetchError::PipelineExecution(format!("malformed engine output: {}", e)))?;
        let values = record
            .iter()
            .map(|field| {
                field.parse::<f64>().map_err(|_| {
                    FetchError::PipelineExecution(format!(
                        "non-numeric value '{}' in output row {}",
                        field,
                        row + 1
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        records.push(values);
    }

    Ok(RawPoints {
        count: records.len(),
        records,
    })
}

/// Run `pipeline` on `engine` and keep the coordinates of every point.
///
/// Only the last three fields of each raw record are retained, as projected
/// X, Y and elevation Z. An empty result is an error.
pub fn execute(engine: &dyn PointCloudEngine, pipeline: &ExtractionPipeline) -> Result<PointCloud> {
    let raw = engine.run(pipeline)?;
    if raw.records.is_empty() {
        return Err(FetchError::PipelineExecution("pipeline returned no points".to_string()));
    }

    let cloud = PointCloud::from_records(&raw.records)?;
    info!("Retrieved {} points ({} reported by engine)", cloud.len(), raw.count);
    Ok(cloud)
}
