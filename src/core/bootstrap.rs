use uuid::Uuid;

use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::TeacherRole;
use crate::repositories;

/// Makes sure the configured first admin exists, has the admin role and the
/// configured password.
pub(crate) async fn ensure_admin(state: &AppState) -> anyhow::Result<()> {
    let admin = state.settings().admin();
    if admin.first_admin_password.is_empty() {
        tracing::warn!("FIRST_ADMIN_PASSWORD not configured; skipping admin creation");
        return Ok(());
    }

    let email = &admin.first_admin_email;
    let now = primitive_now_utc();

    if let Some(teacher) = repositories::teachers::find_by_email(state.db(), email).await? {
        let verified =
            security::verify_password(&admin.first_admin_password, &teacher.hashed_password)
                .unwrap_or(false);
        let hashed_password = if verified {
            None
        } else {
            Some(security::hash_password(&admin.first_admin_password)?)
        };
        let role = (teacher.role != TeacherRole::Admin).then_some(TeacherRole::Admin);

        if hashed_password.is_none() && role.is_none() {
            tracing::info!("Default admin already up to date");
            return Ok(());
        }

        repositories::teachers::update(
            state.db(),
            &teacher.id,
            repositories::teachers::UpdateTeacher {
                name: None,
                email: None,
                hashed_password,
                role,
                modified_at: now,
            },
        )
        .await?;
        tracing::info!("Updated default admin {email}");
        return Ok(());
    }

    let hashed_password = security::hash_password(&admin.first_admin_password)?;
    repositories::teachers::create(
        state.db(),
        repositories::teachers::CreateTeacher {
            id: &Uuid::new_v4().to_string(),
            name: "Administrator",
            email,
            hashed_password,
            role: TeacherRole::Admin,
            now,
        },
    )
    .await?;

    tracing::info!("Created default admin {email}");
    Ok(())
}
