use serde::Serialize;

use crate::core::time::{format_date, format_primitive};
use crate::db::models::User;
use crate::db::types::UserRole;

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) school_id: String,
    pub(crate) role: UserRole,
    pub(crate) username: String,
    pub(crate) national_id: Option<String>,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) full_name: String,
    pub(crate) email: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) birth_date: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        let full_name = user.full_name();
        Self {
            id: user.id,
            school_id: user.school_id,
            role: user.role,
            username: user.username,
            national_id: user.national_id,
            first_name: user.first_name,
            last_name: user.last_name,
            full_name,
            email: user.email,
            phone: user.phone,
            birth_date: user.birth_date.map(format_date),
            is_active: user.is_active,
            created_at: format_primitive(user.created_at),
        }
    }
}
