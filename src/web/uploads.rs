use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use axum::extract::Multipart;
use tokio::{fs::File, io::AsyncWriteExt};
use uuid::Uuid;

pub type UploadResult<T> = Result<T, UploadError>;

/// Error returned when validating or persisting uploaded files. The message
/// is user-facing.
#[derive(Debug)]
pub struct UploadError {
    message: String,
}

impl UploadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UploadError {}

/// Metadata describing a stored resume upload on disk.
#[derive(Debug, Clone)]
pub struct SavedUpload {
    pub original_name: String,
    pub stored_name: String,
    pub stored_path: PathBuf,
    pub file_size: u64,
}

/// Parsed resume submission form: at most one uploaded PDF plus whatever
/// text fields the form carried.
#[derive(Debug, Default)]
pub struct ResumeSubmission {
    pub file: Option<SavedUpload>,
    pub text_fields: HashMap<String, String>,
}

impl ResumeSubmission {
    pub fn text(&self, field_name: &str) -> Option<&str> {
        self.text_fields.get(field_name).map(|s| s.as_str())
    }
}

/// Field name the resume upload arrives under.
pub const RESUME_FILE_FIELD: &str = "resume_file";

/// Parses a resume submission form. Only PDF uploads are accepted; the
/// stored filename is prefixed with a fresh UUID so submissions never
/// collide.
pub async fn read_resume_form(
    mut multipart: Multipart,
    dest_dir: &Path,
) -> UploadResult<ResumeSubmission> {
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|err| UploadError::new(format!("Could not create upload directory: {err}")))?;

    let mut submission = ResumeSubmission::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| UploadError::new(format!("Could not parse the submitted form: {err}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        if field.file_name().is_none() {
            let value = field.text().await.map_err(|err| {
                UploadError::new(format!("Could not read form field `{field_name}`: {err}"))
            })?;
            submission.text_fields.insert(field_name, value);
            continue;
        }

        if field_name != RESUME_FILE_FIELD {
            return Err(UploadError::new(format!(
                "Unexpected file field `{field_name}`."
            )));
        }
        if submission.file.is_some() {
            return Err(UploadError::new("Only one resume file may be uploaded."));
        }

        let file_name = field.file_name().unwrap_or("resume.pdf").to_string();
        let extension = Path::new(&file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if extension != "pdf" {
            return Err(UploadError::new("Only PDF resumes are accepted."));
        }

        // Empty file parts are how browsers submit an untouched file input.
        let first_chunk = field
            .chunk()
            .await
            .map_err(|err| UploadError::new(format!("Could not read uploaded data: {err}")))?;
        let Some(first_chunk) = first_chunk else {
            continue;
        };

        let stored_name = stored_name_for(&file_name);
        let stored_path = dest_dir.join(&stored_name);
        let mut file = File::create(&stored_path)
            .await
            .map_err(|err| UploadError::new(format!("Could not save the uploaded file: {err}")))?;

        let mut total_bytes = first_chunk.len() as u64;
        file.write_all(&first_chunk)
            .await
            .map_err(|err| UploadError::new(format!("Could not write the uploaded file: {err}")))?;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|err| UploadError::new(format!("Could not read uploaded data: {err}")))?
        {
            total_bytes += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|err| UploadError::new(format!("Could not write the uploaded file: {err}")))?;
        }
        file.flush()
            .await
            .map_err(|err| UploadError::new(format!("Could not finish writing the file: {err}")))?;

        submission.file = Some(SavedUpload {
            original_name: file_name,
            stored_name,
            stored_path,
            file_size: total_bytes,
        });
    }

    Ok(submission)
}

fn stored_name_for(original: &str) -> String {
    let mut sanitized = sanitize_filename::sanitize(original);
    if sanitized.is_empty() {
        sanitized = "resume.pdf".to_string();
    }
    format!("{}_{}", Uuid::new_v4(), sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_names_keep_the_sanitized_original() {
        let name = stored_name_for("Jane Doe Resume.pdf");
        assert!(name.ends_with("Jane Doe Resume.pdf"));
        assert_ne!(name, "Jane Doe Resume.pdf");
    }

    #[test]
    fn stored_names_survive_hostile_filenames() {
        let name = stored_name_for("../../etc/passwd");
        assert!(!name.contains(".."));
        assert!(!name.contains('/'));
    }

    #[test]
    fn stored_names_never_collide() {
        let a = stored_name_for("resume.pdf");
        let b = stored_name_for("resume.pdf");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_original_gets_a_default() {
        let name = stored_name_for("");
        assert!(name.ends_with("resume.pdf"));
    }
}
