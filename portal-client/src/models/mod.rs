pub mod records;
pub mod user;

pub use records::{
    Allergy, AllergyDraft, EmergencyProfile, Illness, IllnessDraft, IllnessStatus, Medication,
    MedicationDraft, MedicationSummary, QrMetadata, Surgery, SurgeryDraft,
};
pub use user::{AuthTokens, User, UserPayload, UserType};
