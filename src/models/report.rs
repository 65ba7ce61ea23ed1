use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::ReportError;

/// A named query executed once per batch. The query text is opaque here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportJob {
    pub name: String,
    pub query: String,
}

impl ReportJob {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
        }
    }
}

/// Validate a single report definition.
pub fn validate_report(job: &ReportJob) -> Result<(), ReportError> {
    if job.name.trim().is_empty() {
        return Err(ReportError::Validation(
            "Report name cannot be empty".to_string(),
        ));
    }

    // The name is embedded in the destination object key
    if job.name.contains('/') {
        return Err(ReportError::Validation(format!(
            "Report name '{}' cannot contain '/'",
            job.name
        )));
    }

    if job.query.trim().is_empty() {
        return Err(ReportError::Validation(format!(
            "Report '{}' has an empty query",
            job.name
        )));
    }

    Ok(())
}

/// Validate the whole report list: every entry valid, names unique.
pub fn validate_reports(jobs: &[ReportJob]) -> Result<(), ReportError> {
    let mut seen = HashSet::new();
    for job in jobs {
        validate_report(job)?;
        if !seen.insert(job.name.as_str()) {
            return Err(ReportError::Validation(format!(
                "Duplicate report name '{}'",
                job.name
            )));
        }
    }
    Ok(())
}
