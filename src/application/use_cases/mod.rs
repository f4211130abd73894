pub mod ask_question;
pub mod embed_session;
pub mod search_sources;
pub mod submit_feedback;

pub use ask_question::AskQuestionUseCase;
pub use embed_session::EmbedSessionUseCase;
pub use search_sources::SearchSourcesUseCase;
pub use submit_feedback::SubmitFeedbackUseCase;
