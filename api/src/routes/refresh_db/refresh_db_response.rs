use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct RefreshDbResponse {
    pub success: bool,
    pub message: String,
}
