pub mod config;
pub mod domain;
pub mod embedding;
pub mod errors;
pub mod recommend;

pub use domain::event::{Event, EventId, EventType};
pub use domain::friend::{Friend, FriendId};
pub use domain::product::{Product, ProductId};
pub use embedding::{cosine_distance, HashEmbedder};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use recommend::sources::{EmbeddingProvider, SemanticCandidateSource, SocialCandidateSource};
pub use recommend::{
    RankMode, RankingPipeline, RecommendationRequest, RecommendationResponse,
    RecommendationService, ScoredItem,
};
