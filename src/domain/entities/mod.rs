pub mod conversation;
pub mod qa_record;
pub mod retrieved_document;
pub mod room_session;

pub use conversation::{ConversationRole, ConversationTurn};
pub use qa_record::QaRecord;
pub use retrieved_document::RetrievedDocument;
pub use room_session::{RoomSession, SessionImage};
