pub mod chat_model;
pub mod embedding_provider;
pub mod image_fetcher;
pub mod room_notifier;

pub use chat_model::ChatModel;
pub use embedding_provider::EmbeddingProvider;
pub use image_fetcher::ImageContentFetcher;
pub use room_notifier::RoomNotifier;
