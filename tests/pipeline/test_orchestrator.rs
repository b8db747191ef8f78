// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Orchestrator tests driving `AnalysisPipeline` without HTTP

use healvision_node::pipeline::{
    verify_audit_hash, AnalysisPipeline, AnalyzeRequest, Detection, DetectionNormalizer,
    DetectorService, ExplanationGenerator, LabelTable, PatientContext, PipelineError, Upload,
};
use healvision_node::vision::RawDetection;
use std::sync::Arc;

use crate::common::{fixed_clock, pipeline_with, png_bytes, raw, ScriptedDetector, FIXED_TIMESTAMP};

fn png_upload() -> Upload {
    Upload::new(png_bytes())
        .with_content_type("image/png")
        .with_filename("study.png")
}

struct CountingExplainer;

impl ExplanationGenerator for CountingExplainer {
    fn explain(&self, detections: &[Detection]) -> String {
        format!("{} finding(s)", detections.len())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

#[tokio::test]
async fn test_no_patient_no_audit_fields() {
    let pipeline = pipeline_with(Arc::new(ScriptedDetector::new(vec![raw(
        0.7,
        [1.0, 1.0, 5.0, 5.0],
    )])));

    let result = pipeline
        .analyze(AnalyzeRequest::new(png_upload()))
        .await
        .unwrap();
    assert!(result.audit.is_none());

    let value = serde_json::to_value(&result).unwrap();
    let object = value.as_object().unwrap();
    assert!(!object.contains_key("patient_metadata"));
    assert!(!object.contains_key("timestamp"));
    assert!(!object.contains_key("audit_hash"));
    assert!(object.contains_key("clinical_explanation"));
    assert_eq!(value["image_metadata"]["filename"], "study.png");
}

#[tokio::test]
async fn test_custom_explainer() {
    let pipeline = pipeline_with(Arc::new(ScriptedDetector::new(vec![
        raw(0.7, [1.0, 1.0, 5.0, 5.0]),
        raw(0.8, [6.0, 6.0, 9.0, 9.0]),
    ])))
    .with_explainer(Arc::new(CountingExplainer));

    let result = pipeline
        .analyze(AnalyzeRequest::new(png_upload()))
        .await
        .unwrap();
    assert_eq!(result.clinical_explanation.as_deref(), Some("2 finding(s)"));
}

#[tokio::test]
async fn test_reproducible_audit_with_fixed_clock() {
    let detector = Arc::new(ScriptedDetector::new(vec![raw(0.9, [1.0, 1.0, 5.0, 5.0])]));
    let pipeline = pipeline_with(detector);
    let patient = PatientContext::new("P-7").unwrap().with_age(Some(31));

    let first = pipeline
        .analyze(AnalyzeRequest::new(png_upload()).with_patient(patient.clone()))
        .await
        .unwrap();
    let second = pipeline
        .analyze(AnalyzeRequest::new(png_upload()).with_patient(patient))
        .await
        .unwrap();

    let first = first.audit.unwrap();
    let second = second.audit.unwrap();
    assert_eq!(first.timestamp, FIXED_TIMESTAMP);
    assert_eq!(first.audit_hash, second.audit_hash);
    assert!(first.verify(1));
    assert!(!first.verify(2));
    assert!(verify_audit_hash("P-7", 1, FIXED_TIMESTAMP, &first.audit_hash));
}

#[tokio::test]
async fn test_multi_class_labels() {
    let detector = Arc::new(ScriptedDetector::new(vec![
        RawDetection {
            class_id: 1,
            confidence: 0.66,
            bbox: [1.0, 1.0, 5.0, 5.0],
        },
        RawDetection {
            class_id: 0,
            confidence: 0.55,
            bbox: [2.0, 2.0, 6.0, 6.0],
        },
    ]));
    let pipeline = AnalysisPipeline::new(
        DetectorService::from_detector(detector),
        DetectionNormalizer::new(LabelTable::from_labels(&["lung_opacity", "nodule"])),
    )
    .with_clock(fixed_clock());

    let result = pipeline.predict(png_upload()).await.unwrap();
    let labels: Vec<&str> = result.detections.iter().map(|d| d.label.as_str()).collect();
    assert_eq!(labels, vec!["nodule", "lung_opacity"]);
}

#[tokio::test]
async fn test_unknown_class_is_internal() {
    let detector = Arc::new(ScriptedDetector::new(vec![RawDetection {
        class_id: 9,
        confidence: 0.5,
        bbox: [1.0, 1.0, 5.0, 5.0],
    }]));
    let pipeline = pipeline_with(detector.clone());

    let err = pipeline.predict(png_upload()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Internal(_)));

    let (path, existed) = &detector.seen_paths()[0];
    assert!(existed);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_oversized_upload_rejected_before_detection() {
    let detector = Arc::new(ScriptedDetector::new(vec![]));
    let pipeline = pipeline_with(detector.clone()).with_max_upload_bytes(16);

    let err = pipeline.predict(png_upload()).await.unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
    assert_eq!(detector.calls(), 0);
}
