pub mod chat_history_model;
pub mod knowledge_vector_model;
pub mod qa_record_model;
pub mod room_session_model;

pub use chat_history_model::{ChatHistoryModel, NewChatHistoryModel};
pub use knowledge_vector_model::{KnowledgeVectorModel, NewKnowledgeVectorModel};
pub use qa_record_model::{NewQaRecordModel, QaRecordModel};
pub use room_session_model::{NewRoomSessionModel, RoomSessionModel};
