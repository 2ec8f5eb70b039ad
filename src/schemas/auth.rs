use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LoginRequest {
    #[serde(alias = "schoolId")]
    #[validate(length(min = 1, message = "school_id must not be empty"))]
    pub(crate) school_id: String,
    #[validate(length(min = 1, max = 64, message = "username must be 1-64 characters"))]
    pub(crate) username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub(crate) password: String,
}
