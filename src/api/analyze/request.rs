// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Form fields accepted by POST /analyze

use crate::api::errors::ApiError;
use crate::api::multipart::FormData;
use crate::pipeline::{AnalyzeRequest, PatientContext};

/// Parse the analysis form into a pipeline request
///
/// Fields: `image` (file), `patient_id` (required), `age`, `gender`,
/// `study_id`, `clinical_indication`, `include_explanation` (default true).
pub fn analyze_request_from_form(mut form: FormData) -> Result<AnalyzeRequest, ApiError> {
    let upload = form.take_image()?;

    let patient_id = form
        .verbatim_text("patient_id")
        .ok_or_else(|| ApiError::InvalidRequest("patient_id is required".to_string()))?;

    let patient = PatientContext::new(patient_id)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?
        .with_age(form.optional_i64("age")?)
        .with_gender(form.verbatim_text("gender"))
        .with_study_id(form.verbatim_text("study_id"))
        .with_clinical_indication(form.verbatim_text("clinical_indication"));

    let include_explanation = form.bool_or("include_explanation", true)?;

    Ok(AnalyzeRequest::new(upload)
        .with_patient(patient)
        .with_explanation(include_explanation))
}
