pub mod character;
pub mod index_config;
pub mod match_query;
