//! In-memory backend for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Months, Utc};
use uuid::Uuid;

use trainhub_core::model::{
    Assessment, AssessmentResult, AssessmentSubmission, Certificate, ContentItem, ContentProgress,
    ContentType, Credentials, HealthStatus, LoginResponse, Module, ModuleNode, NewAssessment,
    NewModule, NewProgram, NewQuestion, NewUnit, NewUser, Program, ProgramProgress,
    ProgramStructure, ProgressUpdate, Question, Role, Unit, User, VerifyResponse,
};
use trainhub_core::scoring;
use trainhub_core::traits::TrainingApi;

use crate::error::ApiError;

#[derive(Default)]
struct State {
    accounts: HashMap<String, (User, String)>,
    current: Option<User>,
    programs: Vec<Program>,
    modules: Vec<Module>,
    units: Vec<Unit>,
    content: Vec<(ContentItem, Vec<u8>)>,
    progress: HashMap<String, ContentProgress>,
    questions: Vec<Question>,
    assessments: Vec<Assessment>,
    certificates: Vec<Certificate>,
    revoked: HashSet<String>,
}

/// A training backend held entirely in memory.
///
/// Scores submissions with `trainhub_core::scoring`, issues a certificate
/// when a program-scoped assessment is passed, and records every progress
/// update in arrival order. Failures can be injected per operation.
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<State>,
    progress_log: Mutex<Vec<(String, ProgressUpdate)>>,
    call_count: AtomicU32,
    submit_count: AtomicU32,
    failing_submits: AtomicU32,
    fail_questions: AtomicBool,
    fail_progress: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn not_found(what: &str) -> ApiError {
    ApiError::NotFound(format!("{what} not found"))
}

fn unprocessable(message: impl ToString) -> ApiError {
    ApiError::Api {
        status: 422,
        message: message.to_string(),
    }
}

fn server_down() -> ApiError {
    ApiError::Api {
        status: 503,
        message: "service unavailable".into(),
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account that can log in.
    pub fn with_user(self, username: &str, password: &str, role: Role) -> Self {
        let user = User {
            id: new_id(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: username.to_string(),
            role,
        };
        lock(&self.state)
            .accounts
            .insert(username.to_string(), (user, password.to_string()));
        self
    }

    /// Put a question straight into the bank, keeping its id.
    pub fn seed_question(&self, question: Question) {
        lock(&self.state).questions.push(question);
    }

    pub fn seed_assessment(&self, assessment: Assessment) {
        lock(&self.state).assessments.push(assessment);
    }

    pub fn seed_program(&self, program: Program) {
        lock(&self.state).programs.push(program);
    }

    /// Make the certificate with this verification code invalid.
    pub fn revoke(&self, verification_code: &str) {
        lock(&self.state)
            .revoked
            .insert(verification_code.to_string());
    }

    /// Fail the next `n` submissions with a server error.
    pub fn fail_next_submits(&self, n: u32) {
        self.failing_submits.store(n, Ordering::Relaxed);
    }

    pub fn fail_question_loading(&self, fail: bool) {
        self.fail_questions.store(fail, Ordering::Relaxed);
    }

    pub fn fail_progress(&self, fail: bool) {
        self.fail_progress.store(fail, Ordering::Relaxed);
    }

    /// Total number of trait calls made.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Submissions received, failed ones included.
    pub fn submit_count(&self) -> u32 {
        self.submit_count.load(Ordering::Relaxed)
    }

    /// Progress updates received for `content_id`, in arrival order.
    pub fn progress_updates(&self, content_id: &str) -> Vec<ProgressUpdate> {
        lock(&self.progress_log)
            .iter()
            .filter(|(id, _)| id == content_id)
            .map(|(_, update)| update.clone())
            .collect()
    }

    pub fn certificates(&self) -> Vec<Certificate> {
        lock(&self.state).certificates.clone()
    }

    fn tick(&self) {
        self.call_count.fetch_add(1, Ordering::Relaxed);
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.tick();
        lock(&self.state)
    }
}

impl State {
    fn program(&self, program_id: &str) -> Result<&Program, ApiError> {
        self.programs
            .iter()
            .find(|p| p.id == program_id)
            .ok_or_else(|| not_found("Program"))
    }

    fn program_content_ids(&self, program_id: &str) -> Vec<String> {
        let modules: HashSet<&str> = self
            .modules
            .iter()
            .filter(|m| m.program_id == program_id)
            .map(|m| m.id.as_str())
            .collect();
        let units: HashSet<&str> = self
            .units
            .iter()
            .filter(|u| modules.contains(u.module_id.as_str()))
            .map(|u| u.id.as_str())
            .collect();
        self.content
            .iter()
            .filter(|(c, _)| units.contains(c.unit_id.as_str()))
            .map(|(c, _)| c.id.clone())
            .collect()
    }

    fn remove_units(&mut self, unit_ids: &HashSet<String>) {
        self.units.retain(|u| !unit_ids.contains(&u.id));
        self.content.retain(|(c, _)| !unit_ids.contains(&c.unit_id));
    }

    fn remove_modules(&mut self, module_ids: &HashSet<String>) {
        let unit_ids: HashSet<String> = self
            .units
            .iter()
            .filter(|u| module_ids.contains(&u.module_id))
            .map(|u| u.id.clone())
            .collect();
        self.remove_units(&unit_ids);
        self.modules.retain(|m| !module_ids.contains(&m.id));
    }

    fn issue_certificate(&mut self, program_id: &str) -> Result<(), ApiError> {
        let program = self.program(program_id)?.clone();
        let recipient = self
            .current
            .as_ref()
            .map(|u| u.full_name.clone())
            .unwrap_or_default();
        let issued = Utc::now();
        let number = Uuid::new_v4().simple().to_string()[..8].to_uppercase();

        self.certificates.push(Certificate {
            id: new_id(),
            program_title: program.title,
            recipient_name: recipient,
            certificate_number: format!("CERT-{number}"),
            verification_code: Uuid::new_v4().simple().to_string(),
            issued_date: Some(issued),
            expiry_date: issued.checked_add_months(Months::new(program.expiry_duration)),
            is_valid: true,
        });
        Ok(())
    }
}

fn is_expired(expiry: Option<DateTime<Utc>>) -> bool {
    expiry.is_some_and(|e| e < Utc::now())
}

#[async_trait]
impl TrainingApi for MockBackend {
    async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.tick();
        Ok(HealthStatus {
            status: "healthy".into(),
            message: "mock backend".into(),
        })
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let mut state = self.state();
        let user = match state.accounts.get(&credentials.username) {
            Some((user, password)) if *password == credentials.password => user.clone(),
            _ => return Err(ApiError::Unauthorized("Invalid credentials".into())),
        };
        state.current = Some(user.clone());
        Ok(LoginResponse {
            access_token: format!("mock-{}", new_id()),
            token_type: Some("bearer".into()),
            user,
        })
    }

    async fn register(&self, new_user: &NewUser) -> Result<User, ApiError> {
        let mut state = self.state();
        if state.accounts.contains_key(&new_user.username) {
            return Err(ApiError::Api {
                status: 400,
                message: "Username already registered".into(),
            });
        }
        let user = User {
            id: new_id(),
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            full_name: new_user.full_name.clone(),
            role: new_user.role,
        };
        state.accounts.insert(
            new_user.username.clone(),
            (user.clone(), new_user.password.clone()),
        );
        Ok(user)
    }

    async fn me(&self) -> Result<User, ApiError> {
        self.state()
            .current
            .clone()
            .ok_or_else(|| ApiError::Unauthorized("Not authenticated".into()))
    }

    async fn list_programs(&self) -> Result<Vec<Program>, ApiError> {
        Ok(self.state().programs.clone())
    }

    async fn get_program(&self, program_id: &str) -> Result<Program, ApiError> {
        self.state().program(program_id).cloned()
    }

    async fn create_program(&self, program: &NewProgram) -> Result<Program, ApiError> {
        let program = program.clone().validated().map_err(unprocessable)?;
        let now = Some(Utc::now());
        let created = Program {
            id: new_id(),
            title: program.title,
            description: program.description,
            learning_objectives: program.learning_objectives,
            expiry_duration: program.expiry_duration,
            renewal_requirements: program.renewal_requirements,
            created_at: now,
            updated_at: now,
        };
        self.state().programs.push(created.clone());
        Ok(created)
    }

    async fn update_program(
        &self,
        program_id: &str,
        program: &NewProgram,
    ) -> Result<Program, ApiError> {
        let update = program.clone().validated().map_err(unprocessable)?;
        let mut state = self.state();
        let existing = state
            .programs
            .iter_mut()
            .find(|p| p.id == program_id)
            .ok_or_else(|| not_found("Program"))?;
        existing.title = update.title;
        existing.description = update.description;
        existing.learning_objectives = update.learning_objectives;
        existing.expiry_duration = update.expiry_duration;
        existing.renewal_requirements = update.renewal_requirements;
        existing.updated_at = Some(Utc::now());
        Ok(existing.clone())
    }

    async fn delete_program(&self, program_id: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        state.program(program_id)?;
        let module_ids: HashSet<String> = state
            .modules
            .iter()
            .filter(|m| m.program_id == program_id)
            .map(|m| m.id.clone())
            .collect();
        state.remove_modules(&module_ids);
        state.programs.retain(|p| p.id != program_id);
        Ok(())
    }

    async fn program_structure(&self, program_id: &str) -> Result<ProgramStructure, ApiError> {
        let state = self.state();
        let program = state.program(program_id)?.clone();
        let modules = state
            .modules
            .iter()
            .filter(|m| m.program_id == program_id)
            .map(|m| ModuleNode {
                module: m.clone(),
                units: state
                    .units
                    .iter()
                    .filter(|u| u.module_id == m.id)
                    .cloned()
                    .collect(),
            })
            .collect();
        Ok(ProgramStructure { program, modules }.sorted())
    }

    async fn program_progress(&self, program_id: &str) -> Result<ProgramProgress, ApiError> {
        let state = self.state();
        state.program(program_id)?;
        let content: Vec<ContentProgress> = state
            .program_content_ids(program_id)
            .iter()
            .map(|id| {
                state.progress.get(id).cloned().unwrap_or(ContentProgress {
                    content_id: id.clone(),
                    progress_percentage: 0.0,
                    last_position: 0.0,
                    time_spent: 0,
                    completed: false,
                })
            })
            .collect();
        let total_items = content.len() as u32;
        let completed_items = content.iter().filter(|p| p.completed).count() as u32;
        Ok(ProgramProgress {
            program_id: program_id.to_string(),
            overall_percentage: scoring::percentage(completed_items, total_items),
            completed_items,
            total_items,
            content,
        })
    }

    async fn list_modules(&self, program_id: &str) -> Result<Vec<Module>, ApiError> {
        let mut modules: Vec<Module> = self
            .state()
            .modules
            .iter()
            .filter(|m| m.program_id == program_id)
            .cloned()
            .collect();
        modules.sort_by_key(|m| m.order);
        Ok(modules)
    }

    async fn create_module(&self, module: &NewModule) -> Result<Module, ApiError> {
        let module = module.clone().validated().map_err(unprocessable)?;
        let mut state = self.state();
        state.program(&module.program_id)?;
        let now = Some(Utc::now());
        let created = Module {
            id: new_id(),
            program_id: module.program_id,
            title: module.title,
            description: module.description,
            order: module.order,
            created_at: now,
            updated_at: now,
        };
        state.modules.push(created.clone());
        Ok(created)
    }

    async fn update_module(&self, module_id: &str, module: &NewModule) -> Result<Module, ApiError> {
        let update = module.clone().validated().map_err(unprocessable)?;
        let mut state = self.state();
        state.program(&update.program_id)?;
        let existing = state
            .modules
            .iter_mut()
            .find(|m| m.id == module_id)
            .ok_or_else(|| not_found("Module"))?;
        existing.program_id = update.program_id;
        existing.title = update.title;
        existing.description = update.description;
        existing.order = update.order;
        existing.updated_at = Some(Utc::now());
        Ok(existing.clone())
    }

    async fn delete_module(&self, module_id: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        if !state.modules.iter().any(|m| m.id == module_id) {
            return Err(not_found("Module"));
        }
        state.remove_modules(&HashSet::from([module_id.to_string()]));
        Ok(())
    }

    async fn list_units(&self, module_id: &str) -> Result<Vec<Unit>, ApiError> {
        let mut units: Vec<Unit> = self
            .state()
            .units
            .iter()
            .filter(|u| u.module_id == module_id)
            .cloned()
            .collect();
        units.sort_by_key(|u| u.order);
        Ok(units)
    }

    async fn create_unit(&self, unit: &NewUnit) -> Result<Unit, ApiError> {
        let unit = unit.clone().validated().map_err(unprocessable)?;
        let mut state = self.state();
        if !state.modules.iter().any(|m| m.id == unit.module_id) {
            return Err(not_found("Module"));
        }
        let now = Some(Utc::now());
        let created = Unit {
            id: new_id(),
            module_id: unit.module_id,
            title: unit.title,
            learning_objectives: unit.learning_objectives,
            order: unit.order,
            created_at: now,
            updated_at: now,
        };
        state.units.push(created.clone());
        Ok(created)
    }

    async fn update_unit(&self, unit_id: &str, unit: &NewUnit) -> Result<Unit, ApiError> {
        let update = unit.clone().validated().map_err(unprocessable)?;
        let mut state = self.state();
        if !state.modules.iter().any(|m| m.id == update.module_id) {
            return Err(not_found("Module"));
        }
        let existing = state
            .units
            .iter_mut()
            .find(|u| u.id == unit_id)
            .ok_or_else(|| not_found("Unit"))?;
        existing.module_id = update.module_id;
        existing.title = update.title;
        existing.learning_objectives = update.learning_objectives;
        existing.order = update.order;
        existing.updated_at = Some(Utc::now());
        Ok(existing.clone())
    }

    async fn delete_unit(&self, unit_id: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        if !state.units.iter().any(|u| u.id == unit_id) {
            return Err(not_found("Unit"));
        }
        state.remove_units(&HashSet::from([unit_id.to_string()]));
        Ok(())
    }

    async fn upload_content(
        &self,
        unit_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ContentItem, ApiError> {
        let mut state = self.state();
        if !state.units.iter().any(|u| u.id == unit_id) {
            return Err(not_found("Unit"));
        }
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let item = ContentItem {
            id: new_id(),
            unit_id: unit_id.to_string(),
            title: file_name.to_string(),
            content_type: ContentType::from_mime(mime.essence_str()),
            file_size: bytes.len() as u64,
            mime_type: mime.essence_str().to_string(),
            created_at: Some(Utc::now()),
        };
        state.content.push((item.clone(), bytes));
        Ok(item)
    }

    async fn list_unit_content(&self, unit_id: &str) -> Result<Vec<ContentItem>, ApiError> {
        Ok(self
            .state()
            .content
            .iter()
            .filter(|(c, _)| c.unit_id == unit_id)
            .map(|(c, _)| c.clone())
            .collect())
    }

    async fn stream_content(&self, content_id: &str) -> Result<Vec<u8>, ApiError> {
        self.state()
            .content
            .iter()
            .find(|(c, _)| c.id == content_id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| not_found("Content"))
    }

    async fn delete_content(&self, content_id: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        let before = state.content.len();
        state.content.retain(|(c, _)| c.id != content_id);
        if state.content.len() == before {
            return Err(not_found("Content"));
        }
        state.progress.remove(content_id);
        Ok(())
    }

    async fn content_progress(&self, content_id: &str) -> Result<ContentProgress, ApiError> {
        let state = self.state();
        if let Some(progress) = state.progress.get(content_id) {
            return Ok(progress.clone());
        }
        if state.content.iter().any(|(c, _)| c.id == content_id) {
            Ok(ProgressUpdate {
                progress_percentage: 0,
                last_position: 0.0,
                time_spent: 0,
                completed: false,
            }
            .to_progress(content_id))
        } else {
            Err(not_found("Content"))
        }
    }

    async fn update_content_progress(
        &self,
        content_id: &str,
        update: &ProgressUpdate,
    ) -> Result<ContentProgress, ApiError> {
        self.tick();
        if self.fail_progress.load(Ordering::Relaxed) {
            return Err(server_down());
        }
        lock(&self.progress_log).push((content_id.to_string(), update.clone()));
        let progress = update.to_progress(content_id);
        lock(&self.state)
            .progress
            .insert(content_id.to_string(), progress.clone());
        Ok(progress)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, ApiError> {
        Ok(self.state().questions.clone())
    }

    async fn create_question(&self, question: &NewQuestion) -> Result<Question, ApiError> {
        let question = question.clone().validated().map_err(unprocessable)?;
        let mut options = question.options;
        for option in &mut options {
            if option.id.is_empty() {
                option.id = new_id();
            }
        }
        let created = Question {
            id: new_id(),
            text: question.text,
            question_type: question.question_type,
            options,
            correct_answer: question.correct_answer,
            points: question.points,
            explanation: question.explanation,
        };
        self.state().questions.push(created.clone());
        Ok(created)
    }

    async fn list_assessments(&self) -> Result<Vec<Assessment>, ApiError> {
        Ok(self.state().assessments.clone())
    }

    async fn create_assessment(&self, assessment: &NewAssessment) -> Result<Assessment, ApiError> {
        let mut state = self.state();
        let assessment = assessment
            .clone()
            .validated(Some(state.questions.as_slice()))
            .map_err(unprocessable)?;
        let created = Assessment {
            id: new_id(),
            title: assessment.title,
            description: assessment.description,
            program_id: assessment.program_id,
            module_id: assessment.module_id,
            unit_id: assessment.unit_id,
            question_ids: assessment.question_ids,
            pass_mark: assessment.pass_mark,
            max_attempts: assessment.max_attempts,
            time_limit: assessment.time_limit,
            randomize_questions: assessment.randomize_questions,
        };
        state.assessments.push(created.clone());
        Ok(created)
    }

    async fn assessment_questions(&self, assessment_id: &str) -> Result<Vec<Question>, ApiError> {
        let state = self.state();
        if self.fail_questions.load(Ordering::Relaxed) {
            return Err(server_down());
        }
        let assessment = state
            .assessments
            .iter()
            .find(|a| a.id == assessment_id)
            .ok_or_else(|| not_found("Assessment"))?;
        Ok(assessment
            .question_ids
            .iter()
            .filter_map(|id| state.questions.iter().find(|q| &q.id == id).cloned())
            .collect())
    }

    async fn submit_assessment(
        &self,
        assessment_id: &str,
        submission: &AssessmentSubmission,
    ) -> Result<AssessmentResult, ApiError> {
        self.submit_count.fetch_add(1, Ordering::Relaxed);
        let failing = self
            .failing_submits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok();
        let mut state = self.state();
        if failing {
            return Err(server_down());
        }

        let assessment = state
            .assessments
            .iter()
            .find(|a| a.id == assessment_id)
            .cloned()
            .ok_or_else(|| not_found("Assessment"))?;
        let questions: Vec<Question> = assessment
            .question_ids
            .iter()
            .filter_map(|id| state.questions.iter().find(|q| &q.id == id).cloned())
            .collect();

        let mut result = scoring::score(&questions, &submission.answers, assessment.pass_mark);
        if let Some(program_id) = assessment.program_id.as_deref() {
            if result.is_passed {
                state.issue_certificate(program_id)?;
            }
            result.certificate_generated = Some(result.is_passed);
        }
        Ok(result)
    }

    async fn list_certificates(&self) -> Result<Vec<Certificate>, ApiError> {
        let state = self.state();
        Ok(state
            .certificates
            .iter()
            .map(|c| {
                let mut c = c.clone();
                c.is_valid = !state.revoked.contains(&c.verification_code)
                    && !is_expired(c.expiry_date);
                c
            })
            .collect())
    }

    async fn download_certificate(&self, certificate_id: &str) -> Result<Vec<u8>, ApiError> {
        let state = self.state();
        let certificate = state
            .certificates
            .iter()
            .find(|c| c.id == certificate_id)
            .ok_or_else(|| not_found("Certificate"))?;
        Ok(format!(
            "%PDF-1.4\n% {} {} {}\n",
            certificate.certificate_number, certificate.recipient_name, certificate.program_title
        )
        .into_bytes())
    }

    async fn verify_certificate(&self, verification_code: &str) -> Result<VerifyResponse, ApiError> {
        let state = self.state();
        let certificate = state
            .certificates
            .iter()
            .find(|c| c.verification_code == verification_code)
            .ok_or_else(|| not_found("Certificate"))?;

        if state.revoked.contains(verification_code) {
            return Ok(VerifyResponse {
                valid: false,
                certificate: None,
                message: Some("Certificate has been revoked".into()),
            });
        }
        if is_expired(certificate.expiry_date) {
            return Ok(VerifyResponse {
                valid: false,
                certificate: None,
                message: Some("Certificate has expired".into()),
            });
        }
        Ok(VerifyResponse {
            valid: true,
            certificate: Some(certificate.clone()),
            message: None,
        })
    }
}
