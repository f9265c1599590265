use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use validator::Validate;

use super::wire::{error_message, validation_message};
use crate::config::ApiSettings;
use crate::error::ApiError;
use crate::models::records::{
    summarize_medications, Allergy, AllergyDraft, EmergencyProfile, Illness, IllnessDraft,
    Medication, MedicationDraft, MedicationSummary, QrMetadata, Surgery, SurgeryDraft,
};
use crate::session::controller::SessionController;

/// Client for the patient-records routes.
///
/// Requests carry the current session's bearer token when there is one and
/// go out bare otherwise; the server decides. Failed responses pass through
/// the session controller, which tears the session down when the rejection
/// says the session itself is dead.
pub struct RecordsClient {
    client: Client,
    settings: ApiSettings,
    session: Arc<SessionController>,
}

impl RecordsClient {
    pub fn new(settings: ApiSettings, session: Arc<SessionController>) -> Self {
        Self {
            client: Client::new(),
            settings,
            session,
        }
    }

    // Medications

    pub async fn medications(&self) -> Result<Vec<Medication>, ApiError> {
        self.get_json("/medications/").await
    }

    pub async fn create_medication(&self, draft: &MedicationDraft) -> Result<Medication, ApiError> {
        draft
            .validate()
            .map_err(|e| ApiError::Validation(validation_message(&e)))?;
        self.post_json("/medications/", &draft.normalized()).await
    }

    pub async fn update_medication(
        &self,
        id: i64,
        draft: &MedicationDraft,
    ) -> Result<Medication, ApiError> {
        draft
            .validate()
            .map_err(|e| ApiError::Validation(validation_message(&e)))?;
        self.put_json(&format!("/medications/{}", id), &draft.normalized())
            .await
    }

    pub async fn delete_medication(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/medications/{}", id)).await
    }

    /// Flip a medication between active and inactive by re-submitting its
    /// current fields with the new flag.
    pub async fn set_medication_active(
        &self,
        id: i64,
        is_active: bool,
    ) -> Result<Medication, ApiError> {
        let medications = self.medications().await?;
        let current = medications
            .into_iter()
            .find(|medication| medication.id == id)
            .ok_or_else(|| ApiError::NotFound {
                message: format!("medication {} not found", id),
            })?;

        let draft = MedicationDraft {
            medication_name: current.medication_name,
            dosage: current.dosage,
            frequency: current.frequency,
            start_date: current.start_date,
            end_date: current.end_date,
            prescribed_by: current.prescribed_by,
            notes: current.notes,
            is_active,
        };
        self.update_medication(id, &draft).await
    }

    pub async fn medication_summary(&self) -> Result<MedicationSummary, ApiError> {
        let medications = self.medications().await?;
        Ok(summarize_medications(&medications, chrono::Utc::now()))
    }

    // Allergies

    pub async fn allergies(&self) -> Result<Vec<Allergy>, ApiError> {
        self.get_json("/allergies/").await
    }

    pub async fn create_allergy(&self, draft: &AllergyDraft) -> Result<Allergy, ApiError> {
        draft
            .validate()
            .map_err(|e| ApiError::Validation(validation_message(&e)))?;
        self.post_json("/allergies/", &draft.normalized()).await
    }

    pub async fn update_allergy(&self, id: i64, draft: &AllergyDraft) -> Result<Allergy, ApiError> {
        draft
            .validate()
            .map_err(|e| ApiError::Validation(validation_message(&e)))?;
        self.put_json(&format!("/allergies/{}", id), &draft.normalized())
            .await
    }

    pub async fn delete_allergy(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/allergies/{}", id)).await
    }

    // Surgeries

    pub async fn surgeries(&self) -> Result<Vec<Surgery>, ApiError> {
        self.get_json("/surgeries/").await
    }

    pub async fn create_surgery(&self, draft: &SurgeryDraft) -> Result<Surgery, ApiError> {
        draft
            .validate()
            .map_err(|e| ApiError::Validation(validation_message(&e)))?;
        self.post_json("/surgeries/", &draft.normalized()).await
    }

    pub async fn update_surgery(&self, id: i64, draft: &SurgeryDraft) -> Result<Surgery, ApiError> {
        draft
            .validate()
            .map_err(|e| ApiError::Validation(validation_message(&e)))?;
        self.put_json(&format!("/surgeries/{}", id), &draft.normalized())
            .await
    }

    pub async fn delete_surgery(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/surgeries/{}", id)).await
    }

    // Illnesses

    pub async fn illnesses(&self) -> Result<Vec<Illness>, ApiError> {
        self.get_json("/illnesses/").await
    }

    pub async fn create_illness(&self, draft: &IllnessDraft) -> Result<Illness, ApiError> {
        draft
            .validate()
            .map_err(|e| ApiError::Validation(validation_message(&e)))?;
        self.post_json("/illnesses/", &draft.normalized()).await
    }

    pub async fn update_illness(&self, id: i64, draft: &IllnessDraft) -> Result<Illness, ApiError> {
        draft
            .validate()
            .map_err(|e| ApiError::Validation(validation_message(&e)))?;
        self.put_json(&format!("/illnesses/{}", id), &draft.normalized())
            .await
    }

    pub async fn delete_illness(&self, id: i64) -> Result<(), ApiError> {
        self.delete(&format!("/illnesses/{}", id)).await
    }

    // Emergency QR

    pub async fn qr_metadata(&self) -> Result<QrMetadata, ApiError> {
        self.get_json("/qr/").await
    }

    /// Public endpoint for first responders: no bearer token, and failures
    /// never touch the session.
    pub async fn emergency_profile(&self, qr_uuid: &str) -> Result<EmergencyProfile, ApiError> {
        let path = format!("/emergency/{}", qr_uuid);
        let response = self
            .client
            .get(self.url(&path))
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("GET {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            return Err(api_error_from(status, &body));
        }

        response.json().await.map_err(|e| {
            ApiError::Transport(format!("GET {} response was not understood: {}", path, e))
        })
    }

    // Plumbing

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.settings.base_url, path)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_seconds)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.access_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.authorize(self.client.get(self.url(path)).timeout(self.timeout()));
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("GET {} failed: {}", path, e)))?;
        self.read_response("GET", path, response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.authorize(
            self.client
                .post(self.url(path))
                .timeout(self.timeout())
                .json(body),
        );
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("POST {} failed: {}", path, e)))?;
        self.read_response("POST", path, response).await
    }

    async fn put_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.authorize(
            self.client
                .put(self.url(path))
                .timeout(self.timeout())
                .json(body),
        );
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("PUT {} failed: {}", path, e)))?;
        self.read_response("PUT", path, response).await
    }

    async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let request = self.authorize(self.client.delete(self.url(path)).timeout(self.timeout()));
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("DELETE {} failed: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            let error = api_error_from(status, &body);
            return Err(self.session.handle_request_error(error));
        }
        Ok(())
    }

    async fn read_response<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            let error = api_error_from(status, &body);
            return Err(self.session.handle_request_error(error));
        }

        response.json().await.map_err(|e| {
            ApiError::Transport(format!(
                "{} {} response was not understood: {}",
                method, path, e
            ))
        })
    }
}

fn api_error_from(status: StatusCode, body: &Value) -> ApiError {
    let message = error_message(body, &format!("HTTP {}", status.as_u16()));
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized { message },
        StatusCode::FORBIDDEN => ApiError::Forbidden { message },
        StatusCode::NOT_FOUND => ApiError::NotFound { message },
        StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation(message),
        _ => ApiError::Server {
            status: status.as_u16(),
            message,
        },
    }
}
