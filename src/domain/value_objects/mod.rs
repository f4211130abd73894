pub mod document_type;
pub mod session_stage;

pub use document_type::DocumentType;
pub use session_stage::SessionStage;
