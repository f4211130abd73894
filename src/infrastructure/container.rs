use std::sync::Arc;

use crate::application::ports::chat_model::ChatModel;
use crate::application::ports::embedding_provider::EmbeddingProvider;
use crate::application::services::{
    AnswerChain, ImageDescriptionService, InputProcessor, LanguageService, MemoryService,
    Retriever, RoomLocks,
};
use crate::application::use_cases::{
    AskQuestionUseCase, EmbedSessionUseCase, SearchSourcesUseCase, SubmitFeedbackUseCase,
};
use crate::config::AppConfig;
use crate::domain::repositories::{
    ChatHistoryRepository, QaRepository, RoomSessionRepository, VectorRepository,
};
use crate::infrastructure::database::{
    create_connection_pool, get_connection_from_pool,
    repositories::{
        PgvectorStore, PostgresChatHistoryRepository, PostgresQaRepository,
        PostgresRoomSessionRepository,
    },
    run_migrations,
};
use crate::infrastructure::external_services::{
    OpenAiChatClient, OpenAiClientConfig, create_embedding_provider,
    embeddings::HttpImageFetcher,
};
use crate::infrastructure::notifier::BroadcastRoomNotifier;
use crate::presentation::http::handlers::{
    ChatHandler, EmbedHandler, FeedbackHandler, HistoryHandler, SearchHandler,
};

pub struct AppContainer {
    // Repositories
    pub chat_history_repository: Arc<dyn ChatHistoryRepository>,
    pub qa_repository: Arc<dyn QaRepository>,
    pub room_session_repository: Arc<dyn RoomSessionRepository>,
    pub vector_store: Arc<dyn VectorRepository>,

    // External services
    pub embedding_provider: Arc<dyn EmbeddingProvider>,
    pub answer_model: Arc<dyn ChatModel>,
    pub utility_model: Arc<dyn ChatModel>,
    pub notifier: Arc<BroadcastRoomNotifier>,

    // Application services
    pub memory_service: Arc<MemoryService>,
    pub retriever: Arc<Retriever>,
    pub answer_chain: Arc<AnswerChain>,

    // Use cases
    pub ask_question_use_case: Arc<AskQuestionUseCase>,
    pub embed_session_use_case: Arc<EmbedSessionUseCase>,
    pub search_sources_use_case: Arc<SearchSourcesUseCase>,
    pub submit_feedback_use_case: Arc<SubmitFeedbackUseCase>,

    // HTTP handlers
    pub chat_handler: Arc<ChatHandler>,
    pub embed_handler: Arc<EmbedHandler>,
    pub search_handler: Arc<SearchHandler>,
    pub feedback_handler: Arc<FeedbackHandler>,
    pub history_handler: Arc<HistoryHandler>,
}

impl AppContainer {
    pub async fn new(config: &AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        // Database pool and migrations
        let db_pool = create_connection_pool(&config.database_url)?;
        {
            let mut conn = get_connection_from_pool(&db_pool)?;
            run_migrations(&mut conn)?;
        }

        // Repositories
        let chat_history_repository: Arc<dyn ChatHistoryRepository> = Arc::new(
            PostgresChatHistoryRepository::new(db_pool.clone(), config.tenant.clone()),
        );
        let qa_repository: Arc<dyn QaRepository> = Arc::new(PostgresQaRepository::new(
            db_pool.clone(),
            config.tenant.clone(),
        ));
        let room_session_repository: Arc<dyn RoomSessionRepository> = Arc::new(
            PostgresRoomSessionRepository::new(db_pool.clone(), config.tenant.clone()),
        );
        let vector_store: Arc<dyn VectorRepository> = Arc::new(PgvectorStore::new(
            db_pool,
            config.tenant.clone(),
            config.embedding.dimensions,
        ));

        // Model providers
        let embedding_provider = create_embedding_provider(&config.embedding)?;
        let answer_model: Arc<dyn ChatModel> = Arc::new(OpenAiChatClient::new(
            OpenAiClientConfig::for_model(&config.chat, &config.chat.model),
        )?);
        let utility_model: Arc<dyn ChatModel> = Arc::new(OpenAiChatClient::new(
            OpenAiClientConfig::for_model(&config.chat, &config.chat.utility_model),
        )?);

        let notifier = Arc::new(BroadcastRoomNotifier::new());
        let image_fetcher = Arc::new(HttpImageFetcher::new()?);
        let room_locks = Arc::new(RoomLocks::new());

        // Application services
        let memory_service = Arc::new(MemoryService::new(chat_history_repository.clone()));
        let language_service = Arc::new(LanguageService::new(
            utility_model.clone(),
            config.chain.product_name.clone(),
        ));
        let input_processor = Arc::new(InputProcessor::new(
            utility_model.clone(),
            language_service,
            config.chain.product_name.clone(),
        ));
        let image_service = Arc::new(ImageDescriptionService::new(utility_model.clone()));
        let retriever = Arc::new(Retriever::new(
            vector_store.clone(),
            embedding_provider.clone(),
            image_fetcher,
            config.retriever.clone(),
        ));

        let answer_chain = Arc::new(AnswerChain::new(
            retriever.clone(),
            answer_model.clone(),
            input_processor,
            image_service,
            memory_service.clone(),
            qa_repository.clone(),
            vector_store.clone(),
            embedding_provider.clone(),
            config.chain.clone(),
        ));

        // Use cases
        let ask_question_use_case = Arc::new(AskQuestionUseCase::new(
            answer_chain.clone(),
            memory_service.clone(),
            room_locks.clone(),
        ));
        let embed_session_use_case = Arc::new(EmbedSessionUseCase::new(
            room_session_repository.clone(),
            vector_store.clone(),
            embedding_provider.clone(),
            utility_model.clone(),
            notifier.clone(),
            room_locks,
            config.session.clone(),
        ));
        let search_sources_use_case = Arc::new(SearchSourcesUseCase::new(
            retriever.clone(),
            config.chain.clone(),
        ));
        let submit_feedback_use_case =
            Arc::new(SubmitFeedbackUseCase::new(qa_repository.clone()));

        // HTTP handlers
        let chat_handler = Arc::new(ChatHandler::new(
            ask_question_use_case.clone(),
            embed_session_use_case.clone(),
        ));
        let embed_handler = Arc::new(EmbedHandler::new(
            embed_session_use_case.clone(),
            notifier.clone(),
        ));
        let search_handler = Arc::new(SearchHandler::new(
            search_sources_use_case.clone(),
            retriever.clone(),
            config.retriever.clone(),
        ));
        let feedback_handler = Arc::new(FeedbackHandler::new(submit_feedback_use_case.clone()));
        let history_handler = Arc::new(HistoryHandler::new(chat_history_repository.clone()));

        Ok(Self {
            chat_history_repository,
            qa_repository,
            room_session_repository,
            vector_store,
            embedding_provider,
            answer_model,
            utility_model,
            notifier,
            memory_service,
            retriever,
            answer_chain,
            ask_question_use_case,
            embed_session_use_case,
            search_sources_use_case,
            submit_feedback_use_case,
            chat_handler,
            embed_handler,
            search_handler,
            feedback_handler,
            history_handler,
        })
    }
}
