use axum::extract::multipart::{Multipart, MultipartError};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::media::UploadedFile;

/// A multipart body split into plain text fields and file parts. A part
/// counts as a file when it carries a file name.
#[derive(Debug, Default)]
pub struct MediaForm {
    text: HashMap<String, Vec<String>>,
    pub files: Vec<UploadedFile>,
}

impl MediaForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = MediaForm::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let name = field.name().unwrap_or_default().to_string();

            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(bad_multipart)?;
                // Browsers submit an empty part for an untouched file input.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                form.files.push(UploadedFile {
                    field: name,
                    file_name: Some(file_name),
                    content_type,
                    data,
                });
            } else {
                let value = field.text().await.map_err(bad_multipart)?;
                form.text.entry(name).or_default().push(value);
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.text
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn has_text(&self, name: &str) -> bool {
        self.text.contains_key(name)
    }

    /// All non-blank values sent under `name`.
    pub fn text_values(&self, name: &str) -> Vec<String> {
        self.text
            .get(name)
            .map(|values| {
                values
                    .iter()
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Take the files sent under `field`, leaving the rest in place.
    pub fn take_files(&mut self, field: &str) -> Vec<UploadedFile> {
        let (taken, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|file| file.field == field);
        self.files = rest;
        taken
    }
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::InvalidInput(format!("Malformed multipart body: {}", e))
}
