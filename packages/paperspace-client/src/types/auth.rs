use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub public_profile_image_url: Option<String>,
    pub is_user_team: bool,
    pub dt_created: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamMembership {
    pub team: Team,
    pub is_owner: bool,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub dt_created: String,
    pub dt_confirmed: Option<String>,
    pub team_memberships: Vec<TeamMembership>,
    pub is_phone_verified: bool,
    pub is_password_auth_enabled: bool,
    pub is_qr_code_based_mfa_enabled: bool,
    pub is_qr_code_based_mfa_confirmed: bool,
    pub preferences: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamInfo {
    pub id: String,
    pub namespace: String,
    pub is_private: bool,
    pub max_machines: i64,
}

/// Response of `GET /auth/session`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSession {
    pub user: User,
    pub team: TeamInfo,
}
