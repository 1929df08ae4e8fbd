//! Patient Records
//!
//! Read-only patient information served next to the chat relay: a redacted
//! summary plus appointment, medication, test result, and billing views.

use crate::error::ApiError;
use crate::store::PatientStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistory {
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub allergies: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub date: DateTime<Utc>,
    pub doctor: String,
    pub department: String,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Appointment {
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.status == AppointmentStatus::Scheduled && self.date > now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Normal,
    Abnormal,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_name: String,
    pub date: DateTime<Utc>,
    /// Lab-specific values, kept as-is
    #[serde(default)]
    pub results: serde_json::Value,
    #[serde(default)]
    pub normal_range: String,
    pub status: TestStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insurance {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub policy_number: String,
    #[serde(default)]
    pub group_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub date: DateTime<Utc>,
    pub amount: f64,
    pub method: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Billing {
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub last_payment: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_history: Vec<Payment>,
}

/// Full patient record as imported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub patient_id: String,
    pub name: String,
    pub email: String,
    pub age: u32,
    pub gender: Gender,
    pub phone_number: String,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub medical_history: MedicalHistory,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub test_results: Vec<TestResult>,
    #[serde(default)]
    pub insurance: Option<Insurance>,
    #[serde(default)]
    pub billing: Option<Billing>,
}

/// Summary without contact details or clinical specifics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub patient_id: String,
    pub name: String,
    pub age: u32,
    pub upcoming_appointments: usize,
    pub current_medications: usize,
    pub account_balance: f64,
}

impl PatientSummary {
    pub fn from_record(record: &PatientRecord, now: DateTime<Utc>) -> Self {
        Self {
            patient_id: record.patient_id.clone(),
            name: record.name.clone(),
            age: record.age,
            upcoming_appointments: record
                .appointments
                .iter()
                .filter(|apt| apt.is_upcoming(now))
                .count(),
            current_medications: record.medical_history.medications.len(),
            account_balance: record.billing.as_ref().map(|b| b.balance).unwrap_or(0.0),
        }
    }
}

/// Require a non-blank patient id; returns it trimmed.
pub fn validate_patient_id(patient_id: &str) -> Result<&str, ApiError> {
    let trimmed = patient_id.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidRequest("Patient ID is required".to_string()));
    }
    Ok(trimmed)
}

/// Patient lookups over a `PatientStore`
#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn PatientStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn PatientStore>) -> Self {
        Self { store }
    }

    fn find(&self, patient_id: &str) -> Result<Option<PatientRecord>, ApiError> {
        let patient_id = validate_patient_id(patient_id)?;
        let record = self.store.get_patient(patient_id)?;
        debug!(patient_id, found = record.is_some(), "patient lookup");
        Ok(record)
    }

    pub fn summary(&self, patient_id: &str, now: DateTime<Utc>) -> Result<PatientSummary, ApiError> {
        self.find(patient_id)?
            .map(|record| PatientSummary::from_record(&record, now))
            .ok_or_else(|| ApiError::PatientNotFound(patient_id.to_string()))
    }

    pub fn appointments(&self, patient_id: &str) -> Result<Vec<Appointment>, ApiError> {
        Ok(self
            .find(patient_id)?
            .map(|record| record.appointments)
            .unwrap_or_default())
    }

    pub fn medications(&self, patient_id: &str) -> Result<Vec<Medication>, ApiError> {
        Ok(self
            .find(patient_id)?
            .map(|record| record.medical_history.medications)
            .unwrap_or_default())
    }

    pub fn test_results(&self, patient_id: &str) -> Result<Vec<TestResult>, ApiError> {
        Ok(self
            .find(patient_id)?
            .map(|record| record.test_results)
            .unwrap_or_default())
    }

    /// `None` when the patient or their billing section is missing.
    pub fn billing(&self, patient_id: &str) -> Result<Option<Billing>, ApiError> {
        Ok(self.find(patient_id)?.and_then(|record| record.billing))
    }

    /// Full record, for the CLI.
    pub fn record(&self, patient_id: &str) -> Result<PatientRecord, ApiError> {
        self.find(patient_id)?
            .ok_or_else(|| ApiError::PatientNotFound(patient_id.to_string()))
    }

    /// Insert or replace records; returns how many were written.
    pub fn import(&self, records: &[PatientRecord]) -> Result<usize, ApiError> {
        let mut cleaned = Vec::with_capacity(records.len());
        for record in records {
            let patient_id = validate_patient_id(&record.patient_id)?.to_string();
            cleaned.push(PatientRecord {
                patient_id,
                ..record.clone()
            });
        }
        for record in &cleaned {
            self.store.put_patient(record)?;
        }
        info!(count = records.len(), "imported patient records");
        Ok(records.len())
    }

    pub fn list_ids(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.store.list_patient_ids()?)
    }
}
