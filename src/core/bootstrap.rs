use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::UserRole;
use crate::repositories;

/// Makes sure the configured first school and its principal exist so a fresh
/// deployment has an account that can run student imports.
pub(crate) async fn ensure_first_principal(state: &AppState) -> anyhow::Result<()> {
    let bootstrap = state.settings().bootstrap();
    if bootstrap.first_principal_password.is_empty() {
        tracing::warn!("FIRST_PRINCIPAL_PASSWORD not configured; skipping principal creation");
        return Ok(());
    }

    let now = primitive_now_utc();
    let school = match repositories::schools::find_by_name(state.db(), &bootstrap.first_school_name)
        .await?
    {
        Some(school) => school,
        None => {
            let school = repositories::schools::create(
                state.db(),
                &Uuid::new_v4().to_string(),
                &bootstrap.first_school_name,
                now,
            )
            .await?;
            tracing::info!(school_id = %school.id, "Created default school {}", school.name);
            school
        }
    };

    let username = &bootstrap.first_principal_username;
    let existing =
        repositories::users::find_by_school_username(state.db(), &school.id, username).await?;

    if let Some(user) = existing {
        let verified =
            security::verify_password(&bootstrap.first_principal_password, &user.hashed_password)
                .unwrap_or(false);

        if verified && user.role == UserRole::Principal && user.is_active {
            tracing::info!("Default principal already up to date");
            return Ok(());
        }

        let hashed_password = if verified {
            user.hashed_password.clone()
        } else {
            security::hash_password(&bootstrap.first_principal_password)?
        };
        repositories::users::reset_credentials(
            state.db(),
            &user.id,
            UserRole::Principal,
            &hashed_password,
            now,
        )
        .await?;

        tracing::info!(school_id = %school.id, "Updated default principal {username}");
        return Ok(());
    }

    let hashed_password = security::hash_password(&bootstrap.first_principal_password)?;
    repositories::users::create(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            school_id: &school.id,
            role: UserRole::Principal,
            username,
            national_id: None,
            first_name: "مدیر",
            last_name: "مدرسه",
            email: None,
            phone: None,
            birth_date: None,
            hashed_password: &hashed_password,
            now,
        },
    )
    .await?;

    tracing::info!(school_id = %school.id, "Created default principal {username}");
    Ok(())
}
