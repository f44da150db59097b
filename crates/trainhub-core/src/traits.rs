//! The backend seam.
//!
//! `TrainingApi` is implemented over HTTP by `trainhub-client` and in memory
//! by its mock backend. The assessment engine, the progress tracker and the
//! certificate verifier only ever see this trait.

use async_trait::async_trait;
use futures::future::try_join_all;

use crate::error::ApiError;
use crate::model::{
    Assessment, AssessmentResult, AssessmentSubmission, Certificate, ContentItem, ContentProgress,
    Credentials, HealthStatus, LoginResponse, Module, NewAssessment, NewModule, NewProgram,
    NewQuestion, NewUnit, NewUser, Program, ProgramProgress, ProgramStructure, ProgressUpdate,
    Question, Unit, User, VerifyResponse,
};

/// Operations offered by a training backend.
#[async_trait]
pub trait TrainingApi: Send + Sync {
    async fn health(&self) -> Result<HealthStatus, ApiError>;

    // -- accounts ----------------------------------------------------------

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError>;

    async fn register(&self, user: &NewUser) -> Result<User, ApiError>;

    /// The account the current bearer token belongs to.
    async fn me(&self) -> Result<User, ApiError>;

    // -- programs, modules, units ------------------------------------------

    async fn list_programs(&self) -> Result<Vec<Program>, ApiError>;

    async fn get_program(&self, program_id: &str) -> Result<Program, ApiError>;

    async fn create_program(&self, program: &NewProgram) -> Result<Program, ApiError>;

    async fn update_program(&self, program_id: &str, program: &NewProgram)
        -> Result<Program, ApiError>;

    /// Deletes the program with its modules and units.
    async fn delete_program(&self, program_id: &str) -> Result<(), ApiError>;

    async fn program_structure(&self, program_id: &str) -> Result<ProgramStructure, ApiError>;

    async fn program_progress(&self, program_id: &str) -> Result<ProgramProgress, ApiError>;

    async fn list_modules(&self, program_id: &str) -> Result<Vec<Module>, ApiError>;

    async fn create_module(&self, module: &NewModule) -> Result<Module, ApiError>;

    async fn update_module(&self, module_id: &str, module: &NewModule) -> Result<Module, ApiError>;

    async fn delete_module(&self, module_id: &str) -> Result<(), ApiError>;

    async fn list_units(&self, module_id: &str) -> Result<Vec<Unit>, ApiError>;

    async fn create_unit(&self, unit: &NewUnit) -> Result<Unit, ApiError>;

    async fn update_unit(&self, unit_id: &str, unit: &NewUnit) -> Result<Unit, ApiError>;

    async fn delete_unit(&self, unit_id: &str) -> Result<(), ApiError>;

    // -- content -----------------------------------------------------------

    async fn upload_content(
        &self,
        unit_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ContentItem, ApiError>;

    async fn list_unit_content(&self, unit_id: &str) -> Result<Vec<ContentItem>, ApiError>;

    async fn stream_content(&self, content_id: &str) -> Result<Vec<u8>, ApiError>;

    async fn delete_content(&self, content_id: &str) -> Result<(), ApiError>;

    async fn content_progress(&self, content_id: &str) -> Result<ContentProgress, ApiError>;

    async fn update_content_progress(
        &self,
        content_id: &str,
        update: &ProgressUpdate,
    ) -> Result<ContentProgress, ApiError>;

    // -- question bank and assessments --------------------------------------

    async fn list_questions(&self) -> Result<Vec<Question>, ApiError>;

    async fn create_question(&self, question: &NewQuestion) -> Result<Question, ApiError>;

    async fn list_assessments(&self) -> Result<Vec<Assessment>, ApiError>;

    async fn create_assessment(&self, assessment: &NewAssessment) -> Result<Assessment, ApiError>;

    /// Questions of an assessment in the order fixed for this attempt.
    async fn assessment_questions(&self, assessment_id: &str) -> Result<Vec<Question>, ApiError>;

    async fn submit_assessment(
        &self,
        assessment_id: &str,
        submission: &AssessmentSubmission,
    ) -> Result<AssessmentResult, ApiError>;

    // -- certificates ------------------------------------------------------

    async fn list_certificates(&self) -> Result<Vec<Certificate>, ApiError>;

    async fn download_certificate(&self, certificate_id: &str) -> Result<Vec<u8>, ApiError>;

    async fn verify_certificate(&self, verification_code: &str) -> Result<VerifyResponse, ApiError>;
}

/// Content items of every unit in `structure`, in tree order.
///
/// Units are fetched concurrently; the first failure wins.
pub async fn unit_content(
    api: &dyn TrainingApi,
    structure: &ProgramStructure,
) -> Result<Vec<Vec<ContentItem>>, ApiError> {
    let requests = structure
        .modules
        .iter()
        .flat_map(|node| &node.units)
        .map(|unit| api.list_unit_content(&unit.id));
    try_join_all(requests).await
}
