use std::fs;
use std::io;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// A base64 encoded image sent alongside a user message
pub struct ImageContent {
    pub data: String,
    pub mime_type: String,
}

impl ImageContent {
    pub fn new<S: Into<String>, T: Into<String>>(data: S, mime_type: T) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Read an image from disk and embed it as base64
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let mime_type = mime_type_for(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported image type: {}", path.display()),
            )
        })?;
        let bytes = fs::read(path)?;
        Ok(Self::new(STANDARD.encode(bytes), mime_type))
    }

    /// The data URL form accepted by OpenAI style endpoints
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

fn mime_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from an LLM
///
/// Only the role and text content are serialized. Images are request-time
/// attachments and are not written to conversation logs.
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip)]
    pub images: Vec<ImageContent>,
}

impl Message {
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Message {
            role,
            content: content.into(),
            images: Vec::new(),
        }
    }

    pub fn system<S: Into<String>>(content: S) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attach an image to the message
    pub fn with_image(mut self, image: ImageContent) -> Self {
        self.images.push(image);
        self
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }
}
