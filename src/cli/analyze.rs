// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use std::fmt::Write as _;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::info;

use super::annotate::save_annotated;
use crate::config::ServiceConfig;
use crate::pipeline::{
    AnalysisPipeline, AnalysisResult, AnalyzeRequest, DetectionNormalizer, DetectorService,
    PatientContext, Upload,
};
use crate::vision::image_utils::{decode_image_bytes, detect_format, format_to_media_type};

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Chest X-ray image to analyze
    pub image: PathBuf,

    /// ONNX weights (can also be set via HEALVISION_MODEL_PATH env var)
    #[arg(long, env = "HEALVISION_MODEL_PATH")]
    pub model: Option<PathBuf>,

    /// Bind the result to this patient and emit an audit hash
    #[arg(long)]
    pub patient_id: Option<String>,

    /// Skip the clinical explanation
    #[arg(long)]
    pub no_explanation: bool,

    /// Directory for the annotated image, text report and JSON result
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Run the full analysis on a local image
pub async fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let mut config = ServiceConfig::from_env();
    if let Some(model) = args.model {
        config.model_path = model;
    }
    config.validate().map_err(|e| anyhow!(e))?;

    if !args.image.is_file() {
        bail!("Image not found at {}", args.image.display());
    }

    info!("Loading model from: {}", config.model_path.display());
    let detector = DetectorService::load(&config.yolo_config())?;
    let pipeline = AnalysisPipeline::new(detector, DetectionNormalizer::new(config.label_table()))
        .with_max_upload_bytes(config.max_upload_bytes);

    info!("Running inference on image: {}", args.image.display());
    let bytes = tokio::fs::read(&args.image)
        .await
        .with_context(|| format!("Failed to read {}", args.image.display()))?;
    // kept only for the annotated copy
    let source_bytes = args.output.as_ref().map(|_| bytes.clone());
    let upload = upload_from_file(&args.image, bytes);

    let mut request = AnalyzeRequest::new(upload).with_explanation(!args.no_explanation);
    if let Some(patient_id) = args.patient_id {
        request = request.with_patient(PatientContext::new(patient_id)?);
    }

    let result = pipeline.analyze(request).await?;
    let report = format_report(&result)?;
    println!("{}", report);

    if let (Some(dir), Some(source_bytes)) = (args.output, source_bytes) {
        let (source, _) = decode_image_bytes(&source_bytes)?;
        let stem = args
            .image
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        write_outputs(&dir, &stem, &report, &result, source).await?;
    }

    Ok(())
}

/// Build an upload whose media type is sniffed from the file contents
pub fn upload_from_file(path: &Path, bytes: Vec<u8>) -> Upload {
    // non-images fall through to the same rejection as over HTTP
    let media_type = detect_format(&bytes)
        .map(format_to_media_type)
        .unwrap_or("application/octet-stream");

    let mut upload = Upload::new(bytes).with_content_type(media_type);
    if let Some(name) = path.file_name() {
        upload = upload.with_filename(name.to_string_lossy());
    }
    upload
}

/// Human-readable detection report
pub fn format_report(result: &AnalysisResult) -> Result<String, std::fmt::Error> {
    let size = result.image_metadata.image_size;
    let (w, h) = (f64::from(size.width.max(1)), f64::from(size.height.max(1)));
    let mut out = String::new();

    writeln!(out, "DETECTION RESULTS")?;
    writeln!(out, "==================")?;
    writeln!(
        out,
        "Image: {} ({}x{})",
        result.image_metadata.filename, size.width, size.height
    )?;

    if result.detections.is_empty() {
        writeln!(out, "No detections")?;
    }

    for (i, det) in result.detections.iter().enumerate() {
        let [x1, y1, x2, y2] = det.bbox;
        writeln!(out, "Detection {}:", i + 1)?;
        writeln!(out, "  Class: {}", det.label)?;
        writeln!(out, "  Confidence: {:.4}", det.confidence)?;
        writeln!(
            out,
            "  Bounding Box: [{:.2}, {:.2}, {:.2}, {:.2}]",
            x1, y1, x2, y2
        )?;
        writeln!(
            out,
            "  Normalized: [{:.4}, {:.4}, {:.4}, {:.4}]",
            (x1 + x2) / 2.0 / w,
            (y1 + y2) / 2.0 / h,
            (x2 - x1) / w,
            (y2 - y1) / h
        )?;
    }

    if let Some(audit) = &result.audit {
        let status = if audit.verify(result.detections.len()) {
            "verified"
        } else {
            "MISMATCH"
        };
        writeln!(out, "Timestamp: {}", audit.timestamp)?;
        writeln!(out, "Audit hash: {} ({})", audit.audit_hash, status)?;
    }
    if let Some(text) = &result.clinical_explanation {
        writeln!(out, "Explanation: {}", text)?;
    }

    Ok(out)
}

async fn write_outputs(
    dir: &Path,
    stem: &str,
    report: &str,
    result: &AnalysisResult,
    source: DynamicImage,
) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let image_path = dir.join(format!("inference_result_{}.jpg", stem));
    let detections = result.detections.clone();
    let target = image_path.clone();
    tokio::task::spawn_blocking(move || save_annotated(&source, &detections, &target)).await??;
    println!("Annotated image saved to: {}", image_path.display());

    let txt_path = dir.join(format!("detection_results_{}.txt", stem));
    tokio::fs::write(&txt_path, report).await?;
    println!("Detection results saved to: {}", txt_path.display());

    let json_path = dir.join(format!("analysis_{}.json", stem));
    tokio::fs::write(&json_path, serde_json::to_vec_pretty(result)?).await?;
    println!("JSON result saved to: {}", json_path.display());

    Ok(())
}
