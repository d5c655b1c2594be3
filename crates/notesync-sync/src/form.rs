//! Note creation input and its validation.

use notesync_core::{sanitize_filename, validate_image, Error, NewNoteRecord, Result};

/// An image file attached to a [`NoteForm`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageFile {
    /// Name as submitted; may carry a client-side directory prefix.
    pub file_name: String,
    /// Content type declared by the client, if any.
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl ImageFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// An empty file input: no name and no bytes.
    pub fn is_empty(&self) -> bool {
        self.file_name.trim().is_empty() && self.data.is_empty()
    }
}

/// Fields submitted to create a note.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NoteForm {
    pub name: String,
    pub description: String,
    pub image: Option<ImageFile>,
}

impl NoteForm {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageFile) -> Self {
        self.image = Some(image);
        self
    }

    /// Check every field without touching a remote service.
    pub(crate) fn validate(self, max_image_bytes: usize) -> Result<ValidatedForm> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("name is required".to_string()));
        }
        let description = self.description.trim();
        if description.is_empty() {
            return Err(Error::Validation("description is required".to_string()));
        }

        let image = match self.image {
            Some(file) if !file.is_empty() => Some(validate_file(file, max_image_bytes)?),
            _ => None,
        };

        Ok(ValidatedForm {
            name: name.to_string(),
            description: description.to_string(),
            image,
        })
    }
}

fn validate_file(file: ImageFile, max_image_bytes: usize) -> Result<ValidatedImage> {
    if file.file_name.trim().is_empty() {
        return Err(Error::Validation(
            "image file name is required when image data is supplied".to_string(),
        ));
    }

    let file_name = sanitize_filename(&file.file_name);
    let check = validate_image(
        &file_name,
        &file.data,
        file.content_type.as_deref(),
        max_image_bytes,
    );
    if !check.allowed {
        return Err(Error::Validation(
            check
                .block_reason
                .unwrap_or_else(|| format!("image {} rejected", file_name)),
        ));
    }

    Ok(ValidatedImage {
        file_name,
        content_type: check.content_type,
        data: file.data,
    })
}

/// A form that passed validation.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedForm {
    pub name: String,
    pub description: String,
    pub image: Option<ValidatedImage>,
}

#[derive(Debug, Clone)]
pub(crate) struct ValidatedImage {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl ValidatedForm {
    /// Record fields; the image file name stands in until the upload lands.
    pub fn to_record(&self) -> NewNoteRecord {
        NewNoteRecord {
            name: self.name.clone(),
            description: self.description.clone(),
            image: self.image.as_ref().map(|i| i.file_name.clone()),
        }
    }
}
