use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// Days a record still counts as recently added, and the lookahead for
/// medications about to end.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// A prescription on the patient record. Dates stay as the ISO strings the
/// server sends; helpers parse them on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: i64,
    pub patient_id: String,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub prescribed_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Medication {
    pub fn is_recently_added(&self, now: DateTime<Utc>) -> bool {
        match parse_wire_datetime(&self.created_at) {
            Some(created) => created >= now - Duration::days(RECENT_WINDOW_DAYS),
            None => false,
        }
    }

    /// Ends within the lookahead window and has not ended yet.
    pub fn is_expiring_soon(&self, now: DateTime<Utc>) -> bool {
        match self.end_date.as_deref().and_then(parse_wire_datetime) {
            Some(end) => end >= now && end <= now + Duration::days(RECENT_WINDOW_DAYS),
            None => false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.end_date.as_deref().and_then(parse_wire_datetime) {
            Some(end) => end < now,
            None => false,
        }
    }
}

/// Outbound medication payload for create and update.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct MedicationDraft {
    #[validate(length(min = 1, message = "Medication name is required"))]
    pub medication_name: String,
    #[validate(length(min = 1, message = "Dosage is required"))]
    pub dosage: String,
    #[validate(length(min = 1, message = "Frequency is required"))]
    pub frequency: String,
    #[validate(length(min = 1, message = "Start date is required"))]
    pub start_date: String,
    pub end_date: Option<String>,
    pub prescribed_by: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
}

impl MedicationDraft {
    pub(crate) fn normalized(&self) -> Self {
        Self {
            end_date: normalize_optional(&self.end_date),
            prescribed_by: normalize_optional(&self.prescribed_by),
            notes: normalize_optional(&self.notes),
            ..self.clone()
        }
    }
}

/// Aggregate counts shown on the dashboard medication card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MedicationSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub recently_added: usize,
}

pub fn summarize_medications(medications: &[Medication], now: DateTime<Utc>) -> MedicationSummary {
    let mut summary = MedicationSummary {
        total: medications.len(),
        ..MedicationSummary::default()
    };
    for medication in medications {
        if medication.is_active {
            summary.active += 1;
        } else {
            summary.inactive += 1;
        }
        if medication.is_recently_added(now) {
            summary.recently_added += 1;
        }
    }
    summary
}

/// A diagnosed allergy. Severity stays a server-defined code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allergy {
    pub id: i64,
    pub patient_id: String,
    pub allergen: String,
    pub severity_level: String,
    #[serde(default)]
    pub reaction_description: Option<String>,
    #[serde(default)]
    pub diagnosis_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct AllergyDraft {
    #[validate(length(min = 1, message = "Allergen is required"))]
    pub allergen: String,
    #[validate(length(min = 1, message = "Severity level is required"))]
    pub severity_level: String,
    pub reaction_description: Option<String>,
    pub diagnosis_date: Option<String>,
    pub notes: Option<String>,
}

impl AllergyDraft {
    pub(crate) fn normalized(&self) -> Self {
        Self {
            reaction_description: normalize_optional(&self.reaction_description),
            diagnosis_date: normalize_optional(&self.diagnosis_date),
            notes: normalize_optional(&self.notes),
            ..self.clone()
        }
    }
}

/// A past surgical procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surgery {
    pub id: i64,
    pub patient_id: String,
    pub procedure_name: String,
    pub surgery_date: String,
    #[serde(default)]
    pub hospital_name: Option<String>,
    #[serde(default)]
    pub surgeon_name: Option<String>,
    #[serde(default)]
    pub anesthesia_type: Option<String>,
    #[serde(default)]
    pub duration_hours: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub complications: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct SurgeryDraft {
    #[validate(length(min = 1, message = "Procedure name is required"))]
    pub procedure_name: String,
    #[validate(length(min = 1, message = "Surgery date is required"))]
    pub surgery_date: String,
    pub hospital_name: Option<String>,
    pub surgeon_name: Option<String>,
    pub anesthesia_type: Option<String>,
    pub duration_hours: Option<f64>,
    pub notes: Option<String>,
    pub complications: Option<String>,
}

impl SurgeryDraft {
    pub(crate) fn normalized(&self) -> Self {
        Self {
            hospital_name: normalize_optional(&self.hospital_name),
            surgeon_name: normalize_optional(&self.surgeon_name),
            anesthesia_type: normalize_optional(&self.anesthesia_type),
            notes: normalize_optional(&self.notes),
            complications: normalize_optional(&self.complications),
            ..self.clone()
        }
    }
}

/// Lifecycle of a diagnosed condition. Wire codes are the Spanish values the
/// records service defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IllnessStatus {
    #[serde(rename = "activa")]
    Active,
    #[serde(rename = "en_tratamiento")]
    InTreatment,
    #[serde(rename = "curada")]
    Cured,
    #[serde(rename = "cronica")]
    Chronic,
}

impl fmt::Display for IllnessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IllnessStatus::Active => write!(f, "activa"),
            IllnessStatus::InTreatment => write!(f, "en_tratamiento"),
            IllnessStatus::Cured => write!(f, "curada"),
            IllnessStatus::Chronic => write!(f, "cronica"),
        }
    }
}

/// A diagnosed illness on the patient record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Illness {
    pub id: i64,
    pub patient_id: String,
    pub illness_name: String,
    pub diagnosis_date: String,
    pub status: IllnessStatus,
    pub is_chronic: bool,
    #[serde(default)]
    pub treatment_description: Option<String>,
    #[serde(default)]
    pub cie10_code: Option<String>,
    #[serde(default)]
    pub diagnosed_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct IllnessDraft {
    #[validate(length(min = 1, message = "Illness name is required"))]
    pub illness_name: String,
    #[validate(length(min = 1, message = "Diagnosis date is required"))]
    pub diagnosis_date: String,
    pub status: IllnessStatus,
    pub is_chronic: bool,
    pub treatment_description: Option<String>,
    pub cie10_code: Option<String>,
    pub diagnosed_by: Option<String>,
    pub notes: Option<String>,
}

impl IllnessDraft {
    pub(crate) fn normalized(&self) -> Self {
        Self {
            treatment_description: normalize_optional(&self.treatment_description),
            cie10_code: normalize_optional(&self.cie10_code),
            diagnosed_by: normalize_optional(&self.diagnosed_by),
            notes: normalize_optional(&self.notes),
            ..self.clone()
        }
    }
}

/// Metadata for the patient's emergency QR code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QrMetadata {
    pub qr_uuid: String,
    pub qr_url: String,
    pub created_at: String,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// Condensed medical profile served to first responders scanning a QR code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmergencyProfile {
    pub full_name: String,
    #[serde(default)]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<String>,
    #[serde(default)]
    pub critical_allergies: Vec<String>,
    #[serde(default)]
    pub current_medications: Vec<String>,
    #[serde(default)]
    pub chronic_conditions: Vec<String>,
}

/// Trim an optional text field; blank entries become `None` so they serialize
/// as explicit nulls on the wire.
pub(crate) fn normalize_optional(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Accept the datetime spellings the records service uses: RFC 3339, naive
/// datetime, or a bare date.
fn parse_wire_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&parsed));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|datetime| Utc.from_utc_datetime(&datetime))
}
