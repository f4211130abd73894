pub mod embeddings;
pub mod openai_chat;

pub use embeddings::create_embedding_provider;
pub use openai_chat::{OpenAiChatClient, OpenAiClientConfig};
