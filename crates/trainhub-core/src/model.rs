//! Core data model types for trainhub.
//!
//! These mirror the JSON documents exchanged with the training backend.
//! Entities are owned by the server; the client only ever holds transient,
//! re-fetchable copies.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Role assigned to an account at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Instructor,
    Learner,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Instructor => write!(f, "instructor"),
            Role::Learner => write!(f, "learner"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" | "administrator" => Ok(Role::Admin),
            "instructor" | "trainer" => Ok(Role::Instructor),
            "learner" | "student" => Ok(Role::Learner),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// An authenticated account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub role: Role,
}

/// Login form.
///
/// Note: Custom Debug impl masks the password to keep it out of logs.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Registration form.
#[derive(Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"***")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .finish()
    }
}

/// Response to `POST /api/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: User,
}

/// Response to `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Program structure
// ---------------------------------------------------------------------------

/// Top-level training curriculum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    /// Certificate validity in months.
    pub expiry_duration: u32,
    #[serde(default)]
    pub renewal_requirements: Option<String>,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Program create/update form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProgram {
    pub title: String,
    pub description: String,
    pub learning_objectives: Vec<String>,
    pub expiry_duration: u32,
    #[serde(default)]
    pub renewal_requirements: Option<String>,
}

/// Ordered grouping of units within a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub program_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub order: i32,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewModule {
    pub program_id: String,
    pub title: String,
    pub description: String,
    pub order: i32,
}

/// Smallest content-bearing grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    pub module_id: String,
    pub title: String,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    pub order: i32,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUnit {
    pub module_id: String,
    pub title: String,
    pub learning_objectives: Vec<String>,
    pub order: i32,
}

/// A module together with its units, as returned by the structure endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleNode {
    #[serde(flatten)]
    pub module: Module,
    #[serde(default)]
    pub units: Vec<Unit>,
}

/// Response to `GET /api/programs/{id}/structure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramStructure {
    pub program: Program,
    #[serde(default)]
    pub modules: Vec<ModuleNode>,
}

impl ProgramStructure {
    /// Sort modules and their units by `order`.
    ///
    /// The reference backend already sorts, but display order must not
    /// depend on it.
    pub fn sorted(mut self) -> Self {
        self.modules.sort_by_key(|m| m.module.order);
        for node in &mut self.modules {
            node.units.sort_by_key(|u| u.order);
        }
        self
    }

    /// Total number of units across all modules.
    pub fn unit_count(&self) -> usize {
        self.modules.iter().map(|m| m.units.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Kind of uploaded learning resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Pdf,
    Document,
    Video,
    Audio,
    Image,
    #[serde(other)]
    Unknown,
}

impl ContentType {
    /// Classify an upload by MIME type the same way the backend does.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("image/") {
            ContentType::Image
        } else if mime.starts_with("video/") {
            ContentType::Video
        } else if mime.starts_with("audio/") {
            ContentType::Audio
        } else if mime == "application/pdf" {
            ContentType::Pdf
        } else if mime == "application/msword"
            || mime == "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        {
            ContentType::Document
        } else {
            ContentType::Unknown
        }
    }

    /// Time-based media report progress continuously while playing.
    pub fn is_media(self) -> bool {
        matches!(self, ContentType::Video | ContentType::Audio)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentType::Pdf => "pdf",
            ContentType::Document => "document",
            ContentType::Video => "video",
            ContentType::Audio => "audio",
            ContentType::Image => "image",
            ContentType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Metadata of an uploaded file attached to a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub unit_id: String,
    pub title: String,
    pub content_type: ContentType,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Stored viewing progress for one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentProgress {
    #[serde(default)]
    pub content_id: String,
    #[serde(default)]
    pub progress_percentage: f64,
    /// Playback position in seconds (media only).
    #[serde(default)]
    pub last_position: f64,
    /// Seconds spent on the item.
    #[serde(default)]
    pub time_spent: u64,
    #[serde(default)]
    pub completed: bool,
}

/// Body of `POST /api/content/{id}/progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub progress_percentage: u8,
    pub last_position: f64,
    pub time_spent: u64,
    pub completed: bool,
}

impl ProgressUpdate {
    /// The progress record this update produces once stored.
    pub fn to_progress(&self, content_id: &str) -> ContentProgress {
        ContentProgress {
            content_id: content_id.to_string(),
            progress_percentage: f64::from(self.progress_percentage),
            last_position: self.last_position,
            time_spent: self.time_spent,
            completed: self.completed,
        }
    }
}

/// Response to `GET /api/programs/{id}/progress`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramProgress {
    #[serde(default)]
    pub program_id: String,
    #[serde(default, alias = "progress_percentage")]
    pub overall_percentage: f64,
    #[serde(default)]
    pub completed_items: u32,
    #[serde(default)]
    pub total_items: u32,
    #[serde(default)]
    pub content: Vec<ContentProgress>,
}

// ---------------------------------------------------------------------------
// Questions and assessments
// ---------------------------------------------------------------------------

/// Supported question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    Essay,
}

impl QuestionType {
    /// Whether the backend can grade this type without a human.
    pub fn is_auto_scored(self) -> bool {
        !matches!(self, QuestionType::Essay)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::MultipleChoice => write!(f, "multiple_choice"),
            QuestionType::TrueFalse => write!(f, "true_false"),
            QuestionType::Essay => write!(f, "essay"),
        }
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "multiple_choice" | "mc" => Ok(QuestionType::MultipleChoice),
            "true_false" | "tf" => Ok(QuestionType::TrueFalse),
            "essay" => Ok(QuestionType::Essay),
            other => Err(format!("unknown question type: {other}")),
        }
    }
}

/// One answer choice of a multiple choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Server-assigned; empty on create forms.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub text: String,
    /// Hidden from learners by some backends, hence the default.
    #[serde(default)]
    pub is_correct: bool,
}

impl QuestionOption {
    pub fn new(text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: String::new(),
            text: text.into(),
            is_correct,
        }
    }
}

/// A reusable question from the question bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "question_text", alias = "text")]
    pub text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    pub points: u32,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    /// Id used when submitting option `index`.
    ///
    /// Falls back to the positional index when the backend sent no ids.
    pub fn option_key(&self, index: usize) -> Option<String> {
        self.options.get(index).map(|o| {
            if o.id.is_empty() {
                index.to_string()
            } else {
                o.id.clone()
            }
        })
    }

    /// Look an option up by the key `option_key` produces.
    pub fn find_option(&self, key: &str) -> Option<&QuestionOption> {
        self.options
            .iter()
            .enumerate()
            .find(|(i, o)| o.id == key || (o.id.is_empty() && i.to_string() == key))
            .map(|(_, o)| o)
    }
}

/// Question create form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewQuestion {
    #[serde(rename = "question_text")]
    pub text: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    pub points: u32,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// A scored quiz composed from the question bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub program_id: Option<String>,
    #[serde(default)]
    pub module_id: Option<String>,
    #[serde(default)]
    pub unit_id: Option<String>,
    #[serde(default)]
    pub question_ids: Vec<String>,
    /// Percentage required to pass (1-100).
    pub pass_mark: u32,
    pub max_attempts: u32,
    /// Minutes.
    #[serde(default)]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub randomize_questions: bool,
}

/// Assessment create form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssessment {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<String>,
    pub question_ids: Vec<String>,
    pub pass_mark: u32,
    pub max_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(default)]
    pub randomize_questions: bool,
}

/// A learner's answer to one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Multiple choice: the chosen option's key.
    SelectedOption(String),
    /// True/false (`"true"` / `"false"`) or essay text.
    Text(String),
}

/// One entry of a submission payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    pub question_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_text: Option<String>,
}

impl AnswerEntry {
    pub fn new(question_id: impl Into<String>, answer: &Answer) -> Self {
        let question_id = question_id.into();
        match answer {
            Answer::SelectedOption(id) => Self {
                question_id,
                selected_option_id: Some(id.clone()),
                answer_text: None,
            },
            Answer::Text(text) => Self {
                question_id,
                selected_option_id: None,
                answer_text: Some(text.clone()),
            },
        }
    }
}

/// Body of `POST /api/assessments/{id}/submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentSubmission {
    pub assessment_id: String,
    pub answers: Vec<AnswerEntry>,
}

/// Score breakdown returned after a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub percentage: f64,
    pub is_passed: bool,
    pub total_points: u32,
    pub earned_points: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_generated: Option<bool>,
}

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

/// Proof-of-completion record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(default)]
    pub id: String,
    pub program_title: String,
    pub recipient_name: String,
    pub certificate_number: String,
    #[serde(default)]
    pub verification_code: String,
    #[serde(default, with = "timestamp")]
    pub issued_date: Option<DateTime<Utc>>,
    #[serde(default, with = "timestamp")]
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default = "default_true", alias = "valid")]
    pub is_valid: bool,
}

fn default_true() -> bool {
    true
}

/// Wire shape of `POST /api/certificates/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
    #[serde(default)]
    pub certificate: Option<Certificate>,
    #[serde(default)]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Timestamps arrive either as RFC 3339 or as naive ISO 8601 in UTC
/// (`2024-05-01T12:00:00.123456`).
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.is_empty() => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
        }
    }
}
