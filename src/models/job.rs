use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Generation domain. The snake_case name doubles as the `{kind}` route segment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobKind {
    Presentation,
    BusinessReport,
}

impl JobKind {
    /// Completion rule the backend applies to this kind.
    pub fn default_rule(self) -> CompletionRule {
        match self {
            JobKind::Presentation => CompletionRule::ExportGated,
            JobKind::BusinessReport => CompletionRule::SingleStage,
        }
    }

    pub fn default_format(self) -> DownloadFormat {
        match self {
            JobKind::Presentation => DownloadFormat::Pptx,
            JobKind::BusinessReport => DownloadFormat::Pdf,
        }
    }

    /// Human-readable label used in notifications.
    pub fn label(self) -> &'static str {
        match self {
            JobKind::Presentation => "Presentation",
            JobKind::BusinessReport => "Business report",
        }
    }
}

/// Primary lifecycle status of a generation job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Ready,
    Error,
}

impl JobStatus {
    /// Position along `pending -> processing -> {ready, error}`.
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Processing => 1,
            JobStatus::Ready | JobStatus::Error => 2,
        }
    }

    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

/// Status of the post-processing export step for export-gated kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Pending,
    Processing,
    Ready,
    Error,
}

impl ExportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ExportStatus::Ready | ExportStatus::Error)
    }
}

/// Display-only progress fields. Never consulted for lifecycle decisions.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JobProgress {
    #[serde(default, alias = "current_slide", alias = "sections_completed")]
    pub completed: Option<u32>,

    #[serde(default, alias = "total_slides", alias = "total_sections")]
    pub total: Option<u32>,

    #[serde(default, alias = "current_step")]
    pub status_message: Option<String>,
}

/// One generation request and its tracked outcome, as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    #[serde(alias = "job_id")]
    pub id: String,

    /// Stamped by the API client; the backend does not echo it.
    #[serde(default)]
    pub kind: Option<JobKind>,

    pub status: JobStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_status: Option<ExportStatus>,

    #[serde(flatten)]
    pub progress: JobProgress,

    #[serde(default, alias = "error", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A fresh job record for an id the backend just handed out.
    pub fn pending(id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            id: id.into(),
            kind: Some(kind),
            status: JobStatus::Pending,
            export_status: None,
            progress: JobProgress::default(),
            error_message: None,
            export_error: None,
            created_at: None,
            completed_at: None,
        }
    }
}

/// Which terminal condition applies to a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionRule {
    /// Done once `status` is `ready` or `error`.
    SingleStage,
    /// `status = ready` must be followed by a terminal `export_status`.
    ExportGated,
}

/// Where a job sits relative to its kind's completion rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    InFlight,
    Finished,
    Failed(String),
    ExportFailed(String),
}

const GENERATION_FAILED: &str = "Generation failed";
const EXPORT_FAILED: &str = "Export failed";

impl CompletionRule {
    pub fn classify(self, job: &Job) -> Completion {
        match (self, job.status, job.export_status) {
            (_, JobStatus::Error, _) => Completion::Failed(
                job.error_message
                    .clone()
                    .unwrap_or_else(|| GENERATION_FAILED.to_string()),
            ),
            (_, JobStatus::Pending | JobStatus::Processing, _) => Completion::InFlight,
            (CompletionRule::SingleStage, JobStatus::Ready, _) => Completion::Finished,
            (CompletionRule::ExportGated, JobStatus::Ready, Some(ExportStatus::Ready)) => {
                Completion::Finished
            }
            (CompletionRule::ExportGated, JobStatus::Ready, Some(ExportStatus::Error)) => {
                Completion::ExportFailed(
                    job.export_error
                        .clone()
                        .or_else(|| job.error_message.clone())
                        .unwrap_or_else(|| EXPORT_FAILED.to_string()),
                )
            }
            (CompletionRule::ExportGated, JobStatus::Ready, _) => Completion::InFlight,
        }
    }

    pub fn is_terminal(self, job: &Job) -> bool {
        !matches!(self.classify(job), Completion::InFlight)
    }

    /// Fully complete and downloadable; the predicate for the finished list.
    pub fn is_finished(self, job: &Job) -> bool {
        matches!(self.classify(job), Completion::Finished)
    }

    /// Still owned by the backend pipeline and worth reattaching a poller to.
    ///
    /// A generated export-gated job with no export recorded is not terminal,
    /// but nothing is driving it either, so it is not in flight.
    pub fn is_in_flight(self, job: &Job) -> bool {
        match (self, job.status, job.export_status) {
            (_, JobStatus::Pending | JobStatus::Processing, _) => true,
            (
                CompletionRule::ExportGated,
                JobStatus::Ready,
                Some(ExportStatus::Pending | ExportStatus::Processing),
            ) => true,
            _ => false,
        }
    }
}

/// A kind together with the completion rule used to track it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindProfile {
    pub kind: JobKind,
    pub rule: CompletionRule,
}

impl KindProfile {
    pub fn new(kind: JobKind, rule: CompletionRule) -> Self {
        Self { kind, rule }
    }
}

impl From<JobKind> for KindProfile {
    fn from(kind: JobKind) -> Self {
        Self::new(kind, kind.default_rule())
    }
}

/// Artifact formats offered by the download endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DownloadFormat {
    Pptx,
    Pdf,
    Docx,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: JobStatus, export_status: Option<ExportStatus>) -> Job {
        Job {
            status,
            export_status,
            ..Job::pending("j1", JobKind::Presentation)
        }
    }

    #[test]
    fn test_status_rank_ordering() {
        assert!(JobStatus::Pending.rank() < JobStatus::Processing.rank());
        assert!(JobStatus::Processing.rank() < JobStatus::Ready.rank());
        assert_eq!(JobStatus::Ready.rank(), JobStatus::Error.rank());
    }

    #[test]
    fn test_single_stage_terminal_on_ready_or_error() {
        let rule = CompletionRule::SingleStage;
        assert!(!rule.is_terminal(&job(JobStatus::Processing, None)));
        assert!(rule.is_finished(&job(JobStatus::Ready, None)));
        assert!(rule.is_terminal(&job(JobStatus::Error, None)));
        assert!(!rule.is_finished(&job(JobStatus::Error, None)));
    }

    #[test]
    fn test_export_gated_waits_for_export() {
        let rule = CompletionRule::ExportGated;
        let generated = job(JobStatus::Ready, Some(ExportStatus::Processing));
        assert!(!rule.is_terminal(&generated));
        assert!(rule.is_in_flight(&generated));
        assert!(!rule.is_finished(&job(JobStatus::Ready, None)));
        assert!(rule.is_finished(&job(JobStatus::Ready, Some(ExportStatus::Ready))));
    }

    #[test]
    fn test_ready_without_export_is_not_in_flight() {
        let rule = CompletionRule::ExportGated;
        let orphan = job(JobStatus::Ready, None);
        assert!(!rule.is_terminal(&orphan));
        assert!(!rule.is_in_flight(&orphan));
        assert!(!rule.is_finished(&orphan));
        assert!(rule.is_in_flight(&job(JobStatus::Pending, None)));
        assert!(rule.is_in_flight(&job(JobStatus::Ready, Some(ExportStatus::Pending))));
        assert!(!CompletionRule::SingleStage.is_in_flight(&job(JobStatus::Ready, None)));
    }

    #[test]
    fn test_export_failure_is_distinct_from_generation_failure() {
        let rule = CompletionRule::ExportGated;
        let mut exported = job(JobStatus::Ready, Some(ExportStatus::Error));
        exported.export_error = Some("converter crashed".to_string());
        assert_eq!(
            rule.classify(&exported),
            Completion::ExportFailed("converter crashed".to_string())
        );

        let mut failed = job(JobStatus::Error, None);
        failed.error_message = Some("source empty".to_string());
        assert_eq!(rule.classify(&failed), Completion::Failed("source empty".to_string()));
    }

    #[test]
    fn test_kind_route_segment_and_defaults() {
        assert_eq!(JobKind::BusinessReport.as_ref(), "business_report");
        assert_eq!("presentation".parse::<JobKind>().unwrap(), JobKind::Presentation);
        assert_eq!(KindProfile::from(JobKind::Presentation).rule, CompletionRule::ExportGated);
        assert_eq!(JobKind::Presentation.default_format().as_ref(), "pptx");
    }

    #[test]
    fn test_job_deserializes_backend_shape() {
        let raw = serde_json::json!({
            "job_id": "42",
            "status": "processing",
            "export_status": "pending",
            "current_slide": 3,
            "total_slides": 10,
            "current_step": "Drafting slide 3"
        });
        let job: Job = serde_json::from_value(raw).unwrap();
        assert_eq!(job.id, "42");
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.export_status, Some(ExportStatus::Pending));
        assert_eq!(job.progress.completed, Some(3));
        assert_eq!(job.progress.total, Some(10));
        assert_eq!(job.kind, None);
    }
}
