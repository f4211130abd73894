pub mod chat_history_repository;
pub mod qa_repository;
pub mod room_session_repository;
pub mod vector_repository;

pub use chat_history_repository::ChatHistoryRepository;
pub use qa_repository::QaRepository;
pub use room_session_repository::RoomSessionRepository;
pub use vector_repository::VectorRepository;
