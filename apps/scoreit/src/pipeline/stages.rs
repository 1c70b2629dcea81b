//! Pipeline request layer: the parse, extract and match routes, plus the inputs
//! a run is built from.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api_client::ApiClient;
use crate::errors::ClientError;

const PDF_MAGIC: &[u8] = b"%PDF";

// ────────────────────────────────────────────────────────────────────────────
// Inputs
// ────────────────────────────────────────────────────────────────────────────

/// A résumé PDF loaded into memory, ready to upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeFile {
    pub file_name: String,
    pub bytes: Bytes,
}

impl ResumeFile {
    /// Accepts the file when it has a `.pdf` extension or starts with the PDF magic bytes.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Result<Self, ClientError> {
        let file_name = file_name.into();
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ClientError::Validation(format!("{file_name} is empty")));
        }
        let has_pdf_extension = Path::new(&file_name)
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if !has_pdf_extension && !bytes.starts_with(PDF_MAGIC) {
            return Err(ClientError::Validation(format!(
                "{file_name} is not a PDF. Please upload your resume as a PDF file."
            )));
        }
        Ok(Self { file_name, bytes })
    }

    pub fn from_path(path: &Path) -> Result<Self, ClientError> {
        let bytes = std::fs::read(path).map_err(|e| {
            ClientError::Validation(format!("Could not read {}: {e}", path.display()))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume.pdf".to_string());
        Self::new(file_name, bytes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResumeSource {
    RawText(String),
    UploadedFile(ResumeFile),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobSource {
    RawText(String),
    Link(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRequest {
    pub resume: ResumeSource,
    pub job: JobSource,
}

impl MatchRequest {
    pub fn new(resume: ResumeSource, job: JobSource) -> Self {
        Self { resume, job }
    }

    /// Both sources must carry something before any request is made.
    pub fn validate(&self) -> Result<(), String> {
        let resume_missing = match &self.resume {
            ResumeSource::RawText(text) => text.trim().is_empty(),
            ResumeSource::UploadedFile(file) => file.bytes.is_empty(),
        };
        if resume_missing {
            return Err("Please provide your resume as text or a PDF file.".to_string());
        }
        let job_missing = match &self.job {
            JobSource::RawText(text) | JobSource::Link(text) => text.trim().is_empty(),
        };
        if job_missing {
            return Err("Please provide the job description as text or a link.".to_string());
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stages
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ParseResume,
    ParseJd,
    ExtractResume,
    ExtractJd,
    Match,
    Persist,
}

impl Stage {
    /// Progress message shown while the stage runs.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::ParseResume => "Parsing Resume from PDF...",
            Stage::ParseJd => "Parsing Job Description from Link...",
            Stage::ExtractResume => "Extracting Resume Entities...",
            Stage::ExtractJd => "Extracting Job Description Entities...",
            Stage::Match => "Analyzing Match...",
            Stage::Persist => "Saving to history...",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ParseResume => "parse-resume",
            Stage::ParseJd => "parse-jd",
            Stage::ExtractResume => "extract-resume",
            Stage::ExtractJd => "extract-jd",
            Stage::Match => "match",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire bodies
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ParsedResume {
    #[serde(default)]
    pub resume_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ParsedJd {
    #[serde(default)]
    pub jd_text: Option<String>,
}

/// The backend spells the field `resume_entites`.
#[derive(Debug, Default, Deserialize)]
pub struct ExtractedResume {
    #[serde(default, rename = "resume_entites", alias = "resume_entities")]
    pub entities: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExtractedJd {
    #[serde(default, rename = "jd_entites", alias = "jd_entities")]
    pub entities: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MatchResponse {
    #[serde(default)]
    pub match_report: Option<Value>,
}

#[derive(Serialize)]
struct MatchBody<'a> {
    resume_json: &'a Value,
    jd_json: &'a Value,
}

/// One method per pipeline route. Implementations return the decoded body as-is;
/// deciding whether a payload is usable is the orchestrator's job.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    async fn parse_resume(&self, token: &str, file: &ResumeFile) -> Result<ParsedResume, ClientError>;

    async fn parse_jd(&self, token: &str, link: &str) -> Result<ParsedJd, ClientError>;

    async fn extract_resume(
        &self,
        token: &str,
        resume_text: &str,
        model_id: &str,
    ) -> Result<ExtractedResume, ClientError>;

    async fn extract_jd(
        &self,
        token: &str,
        jd_text: &str,
        model_id: &str,
    ) -> Result<ExtractedJd, ClientError>;

    async fn make_match(
        &self,
        token: &str,
        resume_entities: &Value,
        jd_entities: &Value,
    ) -> Result<MatchResponse, ClientError>;
}

#[async_trait]
impl PipelineApi for ApiClient {
    async fn parse_resume(&self, token: &str, file: &ResumeFile) -> Result<ParsedResume, ClientError> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str("application/pdf")?;
        let form = Form::new().part("resume_file", part);
        self.send(
            self.request(Method::POST, "parse_resume", Some(token))
                .multipart(form),
        )
        .await
    }

    async fn parse_jd(&self, token: &str, link: &str) -> Result<ParsedJd, ClientError> {
        let form = Form::new().text("jd_link", link.to_string());
        self.send(
            self.request(Method::POST, "parse_jd", Some(token))
                .multipart(form),
        )
        .await
    }

    async fn extract_resume(
        &self,
        token: &str,
        resume_text: &str,
        model_id: &str,
    ) -> Result<ExtractedResume, ClientError> {
        let form = Form::new()
            .text("resume_text", resume_text.to_string())
            .text("model_id", model_id.to_string());
        self.send(
            self.request(Method::POST, "extract_resume", Some(token))
                .multipart(form),
        )
        .await
    }

    async fn extract_jd(
        &self,
        token: &str,
        jd_text: &str,
        model_id: &str,
    ) -> Result<ExtractedJd, ClientError> {
        let form = Form::new()
            .text("jd_text", jd_text.to_string())
            .text("model_id", model_id.to_string());
        self.send(
            self.request(Method::POST, "extract_jd", Some(token))
                .multipart(form),
        )
        .await
    }

    async fn make_match(
        &self,
        token: &str,
        resume_entities: &Value,
        jd_entities: &Value,
    ) -> Result<MatchResponse, ClientError> {
        self.send(
            self.request(Method::POST, "make_match", Some(token))
                .json(&MatchBody {
                    resume_json: resume_entities,
                    jd_json: jd_entities,
                }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_resume_file_accepts_pdf_extension_or_magic() {
        assert!(ResumeFile::new("cv.PDF", b"anything".to_vec()).is_ok());
        assert!(ResumeFile::new("cv.bin", b"%PDF-1.7 ...".to_vec()).is_ok());
        let err = ResumeFile::new("cv.docx", b"PK\x03\x04".to_vec()).unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(ResumeFile::new("cv.pdf", Vec::<u8>::new()).is_err());
    }

    #[test]
    fn test_resume_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let file = ResumeFile::from_path(&path).unwrap();
        assert_eq!(file.file_name, "resume.pdf");

        let missing = ResumeFile::from_path(&dir.path().join("nope.pdf")).unwrap_err();
        assert!(matches!(missing, ClientError::Validation(_)));
    }

    #[test]
    fn test_request_validation() {
        let ok = MatchRequest::new(
            ResumeSource::RawText("X".into()),
            JobSource::Link("http://y".into()),
        );
        assert!(ok.validate().is_ok());

        let blank_resume = MatchRequest::new(
            ResumeSource::RawText("  ".into()),
            JobSource::RawText("JD".into()),
        );
        assert!(blank_resume.validate().is_err());

        let blank_job = MatchRequest::new(
            ResumeSource::RawText("X".into()),
            JobSource::Link(String::new()),
        );
        assert!(blank_job.validate().is_err());
    }

    #[test]
    fn test_extract_body_accepts_both_spellings() {
        let misspelled: ExtractedResume =
            serde_json::from_value(json!({"resume_entites": {"skills": []}})).unwrap();
        assert!(misspelled.entities.is_some());
        let corrected: ExtractedJd =
            serde_json::from_value(json!({"jd_entities": {"skills": []}})).unwrap();
        assert!(corrected.entities.is_some());
        let absent: ExtractedJd = serde_json::from_value(json!({})).unwrap();
        assert!(absent.entities.is_none());
    }

    #[tokio::test]
    async fn test_make_match_posts_entity_documents() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/make_match")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(json!({
                "resume_json": {"skills": ["rust"]},
                "jd_json": {"skills": ["go"]}
            })))
            .with_status(200)
            .with_body(r#"{"match_report": {"EDUCATION": 0.5}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        let response = client
            .make_match("tok", &json!({"skills": ["rust"]}), &json!({"skills": ["go"]}))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(response.match_report, Some(json!({"EDUCATION": 0.5})));
    }

    #[tokio::test]
    async fn test_extract_resume_sends_multipart_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/extract_resume")
            .match_header("authorization", "Bearer tok")
            .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="resume_text""#.into()),
                Matcher::Regex(r#"name="model_id""#.into()),
            ]))
            .with_status(200)
            .with_body(r#"{"resume_entites": {"name": "Ada"}}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        let response = client.extract_resume("tok", "Ada Lovelace", "2").await.unwrap();
        mock.assert_async().await;
        assert_eq!(response.entities, Some(json!({"name": "Ada"})));
    }

    #[tokio::test]
    async fn test_parse_jd_failure_maps_status() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/parse_jd")
            .with_status(500)
            .with_body(r#"{"error": "Failed to scrape link"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), Duration::from_secs(5));
        let err = client.parse_jd("tok", "http://y").await.unwrap_err();
        assert_eq!(err.user_message(), "Failed to scrape link");
    }
}
