use serde::Deserialize;

// ========== MEMBERSHIP ==========
#[derive(Debug, Deserialize)]
pub struct MembershipRequest {
    #[serde(rename = "eventId")]
    pub event_id: Option<String>,
}

// ========== USER ==========
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(rename = "user-id")]
    pub user_id: String,
    pub email: String,
}
