pub mod pgvector_store;
pub mod postgres_chat_history_repository;
pub mod postgres_qa_repository;
pub mod postgres_room_session_repository;

pub use pgvector_store::PgvectorStore;
pub use postgres_chat_history_repository::PostgresChatHistoryRepository;
pub use postgres_qa_repository::PostgresQaRepository;
pub use postgres_room_session_repository::PostgresRoomSessionRepository;
