pub mod chat_routes;
pub mod embed_routes;
pub mod feedback_routes;
pub mod health_routes;
pub mod history_routes;
pub mod search_routes;

pub use chat_routes::chat_routes;
pub use embed_routes::embed_routes;
pub use feedback_routes::feedback_routes;
pub use health_routes::health_routes;
pub use history_routes::history_routes;
pub use search_routes::search_routes;
