use serde::{Deserialize, Serialize};

/// Stage of an embedding session. Sessions only move forward:
/// Created -> AwaitingHeader -> AwaitingText -> AwaitingImages, then the
/// row is deleted once the content has been embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStage {
    /// The keyword message that opened the session has been consumed.
    Created,
    /// The next message is stored as the header.
    AwaitingHeader,
    /// The next message is stored as the body text.
    AwaitingText,
    /// Images may be attached, or the session finalized as-is.
    AwaitingImages,
}

impl SessionStage {
    pub fn as_i32(&self) -> i32 {
        match self {
            SessionStage::Created => 1,
            SessionStage::AwaitingHeader => 2,
            SessionStage::AwaitingText => 3,
            SessionStage::AwaitingImages => 4,
        }
    }

    pub fn from_i32(value: i32) -> Result<Self, String> {
        match value {
            1 => Ok(SessionStage::Created),
            2 => Ok(SessionStage::AwaitingHeader),
            3 => Ok(SessionStage::AwaitingText),
            4 => Ok(SessionStage::AwaitingImages),
            _ => Err(format!("Invalid session stage: {}", value)),
        }
    }

    pub fn is_ready_to_embed(&self) -> bool {
        matches!(self, SessionStage::AwaitingImages)
    }

    pub fn can_transition_to(&self, next: &SessionStage) -> bool {
        match (self, next) {
            (SessionStage::Created, SessionStage::AwaitingHeader) => true,
            (SessionStage::AwaitingHeader, SessionStage::AwaitingText) => true,
            (SessionStage::AwaitingText, SessionStage::AwaitingImages) => true,
            // Image arrival at an earlier stage jumps straight to the
            // embed-ready stage.
            (_, SessionStage::AwaitingImages) => !matches!(self, SessionStage::AwaitingImages),
            _ => false,
        }
    }
}

impl std::fmt::Display for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i32_round_trip() {
        for value in 1..=4 {
            let stage = SessionStage::from_i32(value).unwrap();
            assert_eq!(stage.as_i32(), value);
        }
    }

    #[test]
    fn test_invalid_stage_number() {
        assert!(SessionStage::from_i32(0).is_err());
        assert!(SessionStage::from_i32(5).is_err());
    }

    #[test]
    fn test_forward_transitions() {
        assert!(SessionStage::Created.can_transition_to(&SessionStage::AwaitingHeader));
        assert!(SessionStage::AwaitingHeader.can_transition_to(&SessionStage::AwaitingText));
        assert!(SessionStage::AwaitingText.can_transition_to(&SessionStage::AwaitingImages));
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!SessionStage::AwaitingText.can_transition_to(&SessionStage::AwaitingHeader));
        assert!(!SessionStage::AwaitingImages.can_transition_to(&SessionStage::AwaitingText));
        assert!(!SessionStage::AwaitingHeader.can_transition_to(&SessionStage::Created));
    }

    #[test]
    fn test_image_shortcut() {
        // Images arriving early force the embed-ready stage.
        assert!(SessionStage::Created.can_transition_to(&SessionStage::AwaitingImages));
        assert!(SessionStage::AwaitingHeader.can_transition_to(&SessionStage::AwaitingImages));
        assert!(!SessionStage::AwaitingImages.can_transition_to(&SessionStage::AwaitingImages));
    }
}
