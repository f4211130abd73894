pub mod chat_handler;
pub mod embed_handler;
pub mod feedback_handler;
pub mod history_handler;
pub mod search_handler;

pub use chat_handler::ChatHandler;
pub use embed_handler::EmbedHandler;
pub use feedback_handler::FeedbackHandler;
pub use history_handler::HistoryHandler;
pub use search_handler::SearchHandler;
