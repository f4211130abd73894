pub mod chat_dto;
pub mod feedback_dto;
pub mod response_dto;
pub mod search_dto;

pub use chat_dto::{AskRequestDto, ChatStreamEvent, HistoryResponseDto};
pub use feedback_dto::FeedbackRequestDto;
pub use response_dto::{ApiResponse, HealthResponseDto, MessageResponseDto};
pub use search_dto::{ImageSearchRequestDto, SearchRequestDto, SearchResponseDto};
