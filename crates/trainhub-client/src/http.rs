//! reqwest implementation of `TrainingApi`.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use trainhub_core::model::{
    Assessment, AssessmentResult, AssessmentSubmission, Certificate, ContentItem, ContentProgress,
    Credentials, HealthStatus, LoginResponse, Module, NewAssessment, NewModule, NewProgram,
    NewQuestion, NewUnit, NewUser, Program, ProgramProgress, ProgramStructure, ProgressUpdate,
    Question, Unit, User, VerifyResponse,
};
use trainhub_core::traits::TrainingApi;

use crate::error::{status_error, transport_error, ApiError};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP+JSON client for the training backend.
///
/// Holds the bearer token of the current session; the `Session` decides
/// when it is set and cleared.
pub struct HttpClient {
    base_url: Url,
    timeout_secs: u64,
    client: reqwest::Client,
    token: RwLock<Option<String>>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout_secs", &self.timeout_secs)
            .field("token", &self.has_token().then_some("***"))
            .finish()
    }
}

impl HttpClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::Network(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Network(format!("invalid base URL '{base_url}'")));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            timeout_secs,
            client,
            token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Set or clear the bearer token attached to every request.
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// `base_url` + `/api/<segments...>`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Network(format!("invalid base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let mut req = self.client.request(method, self.endpoint(segments)?);
        let token = self
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        Ok(req)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let response = req
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "request failed");
        Err(status_error(status.as_u16(), &body))
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(req).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(format!("failed to parse response: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.json(self.request(Method::GET, segments)?).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        self.json(self.request(Method::POST, segments)?.json(body))
            .await
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        self.json(self.request(Method::PUT, segments)?.json(body))
            .await
    }

    async fn delete(&self, segments: &[&str]) -> Result<(), ApiError> {
        self.send(self.request(Method::DELETE, segments)?).await?;
        Ok(())
    }

    async fn bytes(&self, segments: &[&str]) -> Result<Vec<u8>, ApiError> {
        let response = self.send(self.request(Method::GET, segments)?).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;
        Ok(bytes.to_vec())
    }
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    verification_code: &'a str,
}

#[async_trait]
impl TrainingApi for HttpClient {
    #[instrument(skip(self))]
    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get(&["health"]).await
    }

    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        self.post(&["login"], credentials).await
    }

    #[instrument(skip(self, user), fields(username = %user.username, role = %user.role))]
    async fn register(&self, user: &NewUser) -> Result<User, ApiError> {
        self.post(&["register"], user).await
    }

    #[instrument(skip(self))]
    async fn me(&self) -> Result<User, ApiError> {
        self.get(&["me"]).await
    }

    #[instrument(skip(self))]
    async fn list_programs(&self) -> Result<Vec<Program>, ApiError> {
        self.get(&["programs"]).await
    }

    #[instrument(skip(self))]
    async fn get_program(&self, program_id: &str) -> Result<Program, ApiError> {
        self.get(&["programs", program_id]).await
    }

    #[instrument(skip(self, program), fields(title = %program.title))]
    async fn create_program(&self, program: &NewProgram) -> Result<Program, ApiError> {
        self.post(&["programs"], program).await
    }

    #[instrument(skip(self, program))]
    async fn update_program(
        &self,
        program_id: &str,
        program: &NewProgram,
    ) -> Result<Program, ApiError> {
        self.put(&["programs", program_id], program).await
    }

    #[instrument(skip(self))]
    async fn delete_program(&self, program_id: &str) -> Result<(), ApiError> {
        self.delete(&["programs", program_id]).await
    }

    #[instrument(skip(self))]
    async fn program_structure(&self, program_id: &str) -> Result<ProgramStructure, ApiError> {
        let structure: ProgramStructure = self.get(&["programs", program_id, "structure"]).await?;
        Ok(structure.sorted())
    }

    #[instrument(skip(self))]
    async fn program_progress(&self, program_id: &str) -> Result<ProgramProgress, ApiError> {
        self.get(&["programs", program_id, "progress"]).await
    }

    #[instrument(skip(self))]
    async fn list_modules(&self, program_id: &str) -> Result<Vec<Module>, ApiError> {
        let mut modules: Vec<Module> = self.get(&["programs", program_id, "modules"]).await?;
        modules.sort_by_key(|m| m.order);
        Ok(modules)
    }

    #[instrument(skip(self, module), fields(program_id = %module.program_id))]
    async fn create_module(&self, module: &NewModule) -> Result<Module, ApiError> {
        self.post(&["modules"], module).await
    }

    #[instrument(skip(self, module))]
    async fn update_module(&self, module_id: &str, module: &NewModule) -> Result<Module, ApiError> {
        self.put(&["modules", module_id], module).await
    }

    #[instrument(skip(self))]
    async fn delete_module(&self, module_id: &str) -> Result<(), ApiError> {
        self.delete(&["modules", module_id]).await
    }

    #[instrument(skip(self))]
    async fn list_units(&self, module_id: &str) -> Result<Vec<Unit>, ApiError> {
        let mut units: Vec<Unit> = self.get(&["modules", module_id, "units"]).await?;
        units.sort_by_key(|u| u.order);
        Ok(units)
    }

    #[instrument(skip(self, unit), fields(module_id = %unit.module_id))]
    async fn create_unit(&self, unit: &NewUnit) -> Result<Unit, ApiError> {
        self.post(&["units"], unit).await
    }

    #[instrument(skip(self, unit))]
    async fn update_unit(&self, unit_id: &str, unit: &NewUnit) -> Result<Unit, ApiError> {
        self.put(&["units", unit_id], unit).await
    }

    #[instrument(skip(self))]
    async fn delete_unit(&self, unit_id: &str) -> Result<(), ApiError> {
        self.delete(&["units", unit_id]).await
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn upload_content(
        &self,
        unit_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ContentItem, ApiError> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.essence_str())
            .map_err(|e| ApiError::Network(format!("invalid MIME type {mime}: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let req = self
            .request(Method::POST, &["units", unit_id, "content", "upload"])?
            .multipart(form);
        self.json(req).await
    }

    #[instrument(skip(self))]
    async fn list_unit_content(&self, unit_id: &str) -> Result<Vec<ContentItem>, ApiError> {
        self.get(&["units", unit_id, "content"]).await
    }

    #[instrument(skip(self))]
    async fn stream_content(&self, content_id: &str) -> Result<Vec<u8>, ApiError> {
        self.bytes(&["content", content_id, "stream"]).await
    }

    #[instrument(skip(self))]
    async fn delete_content(&self, content_id: &str) -> Result<(), ApiError> {
        self.delete(&["content", content_id]).await
    }

    #[instrument(skip(self))]
    async fn content_progress(&self, content_id: &str) -> Result<ContentProgress, ApiError> {
        self.get(&["content", content_id, "progress"]).await
    }

    #[instrument(skip(self, update), fields(percentage = update.progress_percentage))]
    async fn update_content_progress(
        &self,
        content_id: &str,
        update: &ProgressUpdate,
    ) -> Result<ContentProgress, ApiError> {
        let response = self
            .send(
                self.request(Method::POST, &["content", content_id, "progress"])?
                    .json(update),
            )
            .await?;
        // Some backends answer with a bare acknowledgement instead of the record.
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;
        Ok(serde_json::from_str::<ContentProgress>(&text)
            .ok()
            .filter(|p| !p.content_id.is_empty())
            .unwrap_or_else(|| update.to_progress(content_id)))
    }

    #[instrument(skip(self))]
    async fn list_questions(&self) -> Result<Vec<Question>, ApiError> {
        self.get(&["questions"]).await
    }

    #[instrument(skip(self, question), fields(question_type = %question.question_type))]
    async fn create_question(&self, question: &NewQuestion) -> Result<Question, ApiError> {
        self.post(&["questions"], question).await
    }

    #[instrument(skip(self))]
    async fn list_assessments(&self) -> Result<Vec<Assessment>, ApiError> {
        self.get(&["assessments"]).await
    }

    #[instrument(skip(self, assessment), fields(title = %assessment.title))]
    async fn create_assessment(&self, assessment: &NewAssessment) -> Result<Assessment, ApiError> {
        self.post(&["assessments"], assessment).await
    }

    #[instrument(skip(self))]
    async fn assessment_questions(&self, assessment_id: &str) -> Result<Vec<Question>, ApiError> {
        self.get(&["assessments", assessment_id, "questions"]).await
    }

    #[instrument(skip(self, submission), fields(answers = submission.answers.len()))]
    async fn submit_assessment(
        &self,
        assessment_id: &str,
        submission: &AssessmentSubmission,
    ) -> Result<AssessmentResult, ApiError> {
        self.post(&["assessments", assessment_id, "submit"], submission)
            .await
    }

    #[instrument(skip(self))]
    async fn list_certificates(&self) -> Result<Vec<Certificate>, ApiError> {
        self.get(&["certificates"]).await
    }

    #[instrument(skip(self))]
    async fn download_certificate(&self, certificate_id: &str) -> Result<Vec<u8>, ApiError> {
        self.bytes(&["certificates", certificate_id, "download"]).await
    }

    #[instrument(skip(self, verification_code))]
    async fn verify_certificate(&self, verification_code: &str) -> Result<VerifyResponse, ApiError> {
        self.post(
            &["certificates", "verify"],
            &VerifyRequest { verification_code },
        )
        .await
    }
}
