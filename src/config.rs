use std::env;

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(name) => {
                write!(f, "Missing environment variable: {}", name)
            }
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Embedding vendors the factory can construct. Dimension must match the
/// vectors already stored in the index; a cross-provider mismatch is a
/// fatal misconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProviderKind {
    OpenAi,
    Cohere,
    HuggingFace,
    Jina,
}

impl EmbeddingProviderKind {
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(EmbeddingProviderKind::OpenAi),
            "cohere" => Ok(EmbeddingProviderKind::Cohere),
            "huggingface" => Ok(EmbeddingProviderKind::HuggingFace),
            "jina" => Ok(EmbeddingProviderKind::Jina),
            other => Err(ConfigError::InvalidValue(format!(
                "Unknown embedding provider: {}",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingProviderKind::OpenAi => "openai",
            EmbeddingProviderKind::Cohere => "cohere",
            EmbeddingProviderKind::HuggingFace => "huggingface",
            EmbeddingProviderKind::Jina => "jina",
        }
    }

    fn api_key_variable(&self) -> &'static str {
        match self {
            EmbeddingProviderKind::OpenAi => "OPENAI_API_KEY",
            EmbeddingProviderKind::Cohere => "COHERE_API_KEY",
            EmbeddingProviderKind::HuggingFace => "HUGGINGFACE_API_KEY",
            EmbeddingProviderKind::Jina => "JINA_API_KEY",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            EmbeddingProviderKind::OpenAi => "text-embedding-3-small",
            EmbeddingProviderKind::Cohere => "embed-v4.0",
            EmbeddingProviderKind::HuggingFace => "sentence-transformers/all-MiniLM-L6-v2",
            EmbeddingProviderKind::Jina => "jina-clip-v2",
        }
    }

    fn default_dimensions(&self) -> usize {
        match self {
            EmbeddingProviderKind::OpenAi => 1536,
            EmbeddingProviderKind::Cohere => 512,
            EmbeddingProviderKind::HuggingFace => 384,
            EmbeddingProviderKind::Jina => 512,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub dimensions: usize,
    pub api_key: String,
}

impl EmbeddingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider =
            EmbeddingProviderKind::from_str(&env_or("EMBEDDING_PROVIDER", "openai"))?;
        let model = env_or("EMBEDDING_MODEL", provider.default_model());
        let dimensions = parse_env("EMBEDDING_DIMENSIONS", provider.default_dimensions())?;

        let key_var = provider.api_key_variable();
        let api_key = env::var(key_var)
            .map_err(|_| ConfigError::MissingVariable(key_var.to_string()))?;

        let config = Self {
            provider,
            model,
            dimensions,
            api_key,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingVariable(
                self.provider.api_key_variable().to_string(),
            ));
        }
        if self.dimensions == 0 {
            return Err(ConfigError::InvalidValue(
                "EMBEDDING_DIMENSIONS must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ChatModelConfig {
    pub api_key: String,
    /// Model used for answer generation.
    pub model: String,
    /// Model used for input processing and vision calls.
    pub utility_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub base_url: String,
}

impl ChatModelConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVariable("OPENAI_API_KEY".to_string()))?;

        Ok(Self {
            api_key,
            model: env_or("MODEL_NAME", "gpt-4o"),
            utility_model: env_or("UTILITY_MODEL_NAME", "gpt-4o-mini"),
            temperature: parse_env("TEMPERATURE", 0.0)?,
            max_tokens: parse_env("MAX_TOKENS", 4000)?,
            base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    pub k: usize,
    pub similarity_threshold: f32,
    pub image_search_limit: i64,
    pub image_search_min_score: f32,
}

impl RetrieverSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            k: parse_env("K_EMBEDDINGS", 8)?,
            similarity_threshold: parse_env("SIMILARITY_THRESHOLD", 0.35)?,
            image_search_limit: parse_env("IMAGE_SEARCH_LIMIT", 10)?,
            image_search_min_score: parse_env("IMAGE_SEARCH_MIN_SCORE", 0.5)?,
        })
    }
}

impl Default for RetrieverSettings {
    fn default() -> Self {
        Self {
            k: 8,
            similarity_threshold: 0.35,
            image_search_limit: 10,
            image_search_min_score: 0.5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainSettings {
    pub product_name: String,
    /// Top image-typed result above this score triggers vision-first
    /// re-analysis.
    pub vision_escalation_threshold: f32,
    /// Inter-word delay of the simulated answer stream.
    pub stream_delay_ms: u64,
    pub model_type: String,
    pub sources_min_score: f32,
    pub sources_min_score_non_english: f32,
}

impl ChainSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            product_name: env_or("PRODUCT_NAME", "SolidCAM"),
            vision_escalation_threshold: parse_env("VISION_ESCALATION_THRESHOLD", 0.53)?,
            stream_delay_ms: parse_env("STREAM_DELAY_MS", 30)?,
            model_type: env_or("MODEL_TYPE", "openai"),
            sources_min_score: parse_env("MIN_SCORE_SOURCES_THRESHOLD", 0.78)?,
            sources_min_score_non_english: parse_env("MIN_SCORE_SOURCES_NON_ENGLISH", 0.45)?,
        })
    }
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            product_name: "SolidCAM".to_string(),
            vision_escalation_threshold: 0.53,
            stream_delay_ms: 30,
            model_type: "openai".to_string(),
            sources_min_score: 0.78,
            sources_min_score_non_english: 0.45,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Secret keyword that switches a room into embedding mode.
    pub keyword: String,
    /// Prefix baked into every operator-embedded text.
    pub embed_prefix: String,
    pub ttl_hours: i64,
}

impl SessionSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let keyword = env_or("EMBED_KEYWORD", "embed-4831-embed-4831");
        Ok(Self {
            embed_prefix: keyword.clone(),
            keyword,
            ttl_hours: parse_env("SESSION_TTL_HOURS", 24)?,
        })
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            keyword: "embed-4831-embed-4831".to_string(),
            embed_prefix: "embed-4831-embed-4831".to_string(),
            ttl_hours: 24,
        }
    }
}

/// Tenant identifier attached to every read and write. Storage is shared
/// across chatbots; isolation comes from this, not separate instances.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub chatbot_id: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub tenant: TenantContext,
    pub embedding: EmbeddingConfig,
    pub chat: ChatModelConfig,
    pub retriever: RetrieverSettings,
    pub chain: ChainSettings,
    pub session: SessionSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVariable("DATABASE_URL".to_string()))?;

        Ok(Self {
            database_url,
            port: parse_env("PORT", 3000)?,
            tenant: TenantContext {
                chatbot_id: env_or("CHATBOT_ID", "default"),
            },
            embedding: EmbeddingConfig::from_env()?,
            chat: ChatModelConfig::from_env()?,
            retriever: RetrieverSettings::from_env()?,
            chain: ChainSettings::from_env()?,
            session: SessionSettings::from_env()?,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{}={}", name, raw))),
        Err(_) => Ok(default),
    }
}
