pub mod answer_chain;
pub mod history;
pub mod image;
pub mod input_processor;
pub mod language;
pub mod memory;
pub mod retriever;
pub mod room_locks;

pub use answer_chain::AnswerChain;
pub use image::ImageDescriptionService;
pub use input_processor::InputProcessor;
pub use language::LanguageService;
pub use memory::MemoryService;
pub use retriever::Retriever;
pub use room_locks::RoomLocks;
