//! Character index for the anime guesser.
//!
//! - [`engine::MatchEngine`]: analyze uploads, refresh the catalog, report health
//! - [`store::CharacterStore`]: vector storage seam, Qdrant-backed by default
//! - [`selection`] / [`fallback`]: pure post-search filtering and sample answers
//! - [`catalog`] / [`ingest`]: AniList fetch and image embedding

pub mod catalog;
pub mod engine;
pub mod errors;
pub mod fallback;
pub mod ingest;
pub mod selection;
pub mod store;
pub mod structs;
pub mod vector_db;

pub use engine::{EngineHealth, MatchEngine, RefreshStatus};
pub use errors::index_error::IndexError;
pub use store::{CharacterStore, QdrantCharacterStore};
pub use structs::character::{AnimeCharacter, CharacterRecord, MatchMode, MatchOutcome};
pub use structs::index_config::IndexConfig;
pub use structs::match_query::{MatchQuery, SearchType};
