// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Patient context and its binding to an analysis

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::errors::PipelineError;

/// Optional patient identifiers attached to an analysis
///
/// Immutable once built. `patient_id` is guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    patient_id: String,
    age: Option<i64>,
    gender: Option<String>,
    study_id: Option<String>,
    clinical_indication: Option<String>,
}

impl PatientContext {
    /// Create a context for `patient_id`, which must not be blank
    pub fn new(patient_id: impl Into<String>) -> Result<Self, PipelineError> {
        let patient_id = patient_id.into();
        if patient_id.trim().is_empty() {
            return Err(PipelineError::InvalidInput(
                "patient_id must be a non-empty string".to_string(),
            ));
        }

        Ok(Self {
            patient_id,
            age: None,
            gender: None,
            study_id: None,
            clinical_indication: None,
        })
    }

    pub fn with_age(mut self, age: Option<i64>) -> Self {
        self.age = age;
        self
    }

    pub fn with_gender(mut self, gender: Option<String>) -> Self {
        self.gender = gender;
        self
    }

    pub fn with_study_id(mut self, study_id: Option<String>) -> Self {
        self.study_id = study_id;
        self
    }

    pub fn with_clinical_indication(mut self, clinical_indication: Option<String>) -> Self {
        self.clinical_indication = clinical_indication;
        self
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn age(&self) -> Option<i64> {
        self.age
    }

    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }

    pub fn study_id(&self) -> Option<&str> {
        self.study_id.as_deref()
    }

    pub fn clinical_indication(&self) -> Option<&str> {
        self.clinical_indication.as_deref()
    }

    /// Patient id safe for logs: first 4 characters, rest masked
    pub fn masked_id(&self) -> String {
        let prefix: String = self.patient_id.chars().take(4).collect();
        if self.patient_id.chars().count() <= 4 {
            "****".to_string()
        } else {
            format!("{}****", prefix)
        }
    }
}

/// Source of the capture instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant, for reproducible runs
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// ISO-8601 UTC with microseconds and a `Z` suffix
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Patient context plus the instant it was bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientBinding {
    pub patient_metadata: PatientContext,
    pub timestamp: String,
}

/// Attaches optional patient context and a capture timestamp
#[derive(Clone)]
pub struct PatientContextBinder {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for PatientContextBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatientContextBinder").finish_non_exhaustive()
    }
}

impl Default for PatientContextBinder {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl PatientContextBinder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Bind `context` to the current instant. Absent context yields no binding.
    pub fn bind(&self, context: Option<PatientContext>) -> Option<PatientBinding> {
        context.map(|patient_metadata| PatientBinding {
            patient_metadata,
            timestamp: format_timestamp(self.clock.now()),
        })
    }
}
