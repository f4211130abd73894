use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::SessionStage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Per-room embedding-mode state. At most one session exists per room, and
/// its presence pre-empts normal chat handling for that room. Persisted in
/// the database so it survives cold starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSession {
    room_id: String,
    stage: SessionStage,
    header: Option<String>,
    body_text: Option<String>,
    images: Vec<SessionImage>,
    updated_at: DateTime<Utc>,
}

impl RoomSession {
    pub fn new(room_id: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            stage: SessionStage::Created,
            header: None,
            body_text: None,
            images: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn from_database(
        room_id: String,
        stage: SessionStage,
        header: Option<String>,
        body_text: Option<String>,
        images: Vec<SessionImage>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            room_id,
            stage,
            header,
            body_text,
            images,
            updated_at,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn stage(&self) -> SessionStage {
        self.stage
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn body_text(&self) -> Option<&str> {
        self.body_text.as_deref()
    }

    pub fn images(&self) -> &[SessionImage] {
        &self.images
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() - self.updated_at > ttl
    }

    fn transition_to(&mut self, next: SessionStage) -> Result<(), String> {
        if !self.stage.can_transition_to(&next) {
            return Err(format!(
                "Invalid session transition: {} -> {}",
                self.stage, next
            ));
        }
        self.stage = next;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// The keyword message is consumed as a pure mode switch; the session
    /// then waits for the header.
    pub fn begin_header_capture(&mut self) -> Result<(), String> {
        self.transition_to(SessionStage::AwaitingHeader)
    }

    pub fn capture_header(&mut self, header: impl Into<String>) -> Result<(), String> {
        if self.stage != SessionStage::AwaitingHeader {
            return Err(format!("Session is not awaiting a header: {}", self.stage));
        }
        self.header = Some(header.into());
        self.transition_to(SessionStage::AwaitingText)
    }

    pub fn capture_body_text(&mut self, text: impl Into<String>) -> Result<(), String> {
        if self.stage != SessionStage::AwaitingText {
            return Err(format!("Session is not awaiting body text: {}", self.stage));
        }
        self.body_text = Some(text.into());
        self.transition_to(SessionStage::AwaitingImages)
    }

    /// Attach image URLs, deduplicated by URL. Images arriving before the
    /// text stage force the session straight to the embed-ready stage.
    pub fn attach_images(&mut self, urls: &[String]) -> usize {
        if self.stage != SessionStage::AwaitingImages {
            self.stage = SessionStage::AwaitingImages;
        }
        let mut added = 0;
        for url in urls {
            if !self.images.iter().any(|img| &img.url == url) {
                self.images.push(SessionImage {
                    url: url.clone(),
                    description: None,
                });
                added += 1;
            }
        }
        self.touch();
        added
    }

    pub fn set_image_description(&mut self, url: &str, description: impl Into<String>) {
        if let Some(image) = self.images.iter_mut().find(|img| img.url == url) {
            image.description = Some(description.into());
        }
        self.touch();
    }

    pub fn images_without_description(&self) -> Vec<String> {
        self.images
            .iter()
            .filter(|img| img.description.is_none())
            .map(|img| img.url.clone())
            .collect()
    }

    /// A second keyword while the session is open starts it over.
    pub fn reset(&mut self) {
        self.stage = SessionStage::Created;
        self.header = None;
        self.body_text = None;
        self.images.clear();
        self.touch();
    }

    /// The single string that gets embedded: machine-readable prefix,
    /// header, per-image descriptions, then the body text.
    pub fn embeddable_text(&self, prefix: &str) -> String {
        let images_text = self
            .images
            .iter()
            .map(|img| {
                format!(
                    "{} image description: {}",
                    img.url,
                    img.description.as_deref().unwrap_or("No description found.")
                )
            })
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "{} header: {} {} text: {}",
            prefix,
            self.header.as_deref().unwrap_or(""),
            images_text,
            self.body_text.as_deref().unwrap_or(""),
        )
    }
}
