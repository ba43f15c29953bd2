//! Job snapshots used across lifecycle tests

use genjob_tracker::models::job::{ExportStatus, Job, JobKind, JobProgress, JobStatus};

pub fn job(id: &str, status: JobStatus) -> Job {
    Job {
        status,
        ..Job::pending(id, JobKind::Presentation)
    }
}

pub fn pending(id: &str) -> Job {
    job(id, JobStatus::Pending)
}

pub fn processing(id: &str, completed: u32, total: u32) -> Job {
    Job {
        progress: JobProgress {
            completed: Some(completed),
            total: Some(total),
            status_message: Some(format!("Generating slide {completed} of {total}")),
        },
        ..job(id, JobStatus::Processing)
    }
}

/// Generated; export in the given state.
pub fn exported(id: &str, export: ExportStatus) -> Job {
    Job {
        export_status: Some(export),
        ..job(id, JobStatus::Ready)
    }
}

pub fn ready(id: &str) -> Job {
    job(id, JobStatus::Ready)
}

pub fn failed(id: &str, message: &str) -> Job {
    Job {
        error_message: Some(message.to_string()),
        ..job(id, JobStatus::Error)
    }
}
