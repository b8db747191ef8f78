// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Audit fingerprint binding a patient, a finding count and an instant
//!
//! The hash is `SHA-256("{patient_id}_{detection_count}_{timestamp}")`,
//! lowercase hex. It is recomputable by any consumer holding the three
//! inputs; it does not cover the detection payload itself.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::patient::{PatientBinding, PatientContext};

/// Length of the hex-encoded digest
pub const AUDIT_HASH_HEX_LEN: usize = 64;

/// Compute the audit hash for the given inputs
pub fn compute_audit_hash(patient_id: &str, detection_count: usize, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}_{}_{}", patient_id, detection_count, timestamp).as_bytes());
    hex::encode(hasher.finalize())
}

/// Recompute and compare against a previously issued hash
pub fn verify_audit_hash(
    patient_id: &str,
    detection_count: usize,
    timestamp: &str,
    audit_hash: &str,
) -> bool {
    compute_audit_hash(patient_id, detection_count, timestamp) == audit_hash
}

/// Patient-scoped part of an analysis result. Serialized flat into the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub patient_metadata: PatientContext,
    pub timestamp: String,
    pub audit_hash: String,
}

impl AuditRecord {
    /// Seal a patient binding against the number of findings
    pub fn seal(binding: PatientBinding, detection_count: usize) -> Self {
        let audit_hash = compute_audit_hash(
            binding.patient_metadata.patient_id(),
            detection_count,
            &binding.timestamp,
        );

        Self {
            patient_metadata: binding.patient_metadata,
            timestamp: binding.timestamp,
            audit_hash,
        }
    }

    /// Check the record against a finding count
    pub fn verify(&self, detection_count: usize) -> bool {
        verify_audit_hash(
            self.patient_metadata.patient_id(),
            detection_count,
            &self.timestamp,
            &self.audit_hash,
        )
    }
}
