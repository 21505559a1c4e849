pub mod refresh_db_response;
pub mod refresh_db_route;
