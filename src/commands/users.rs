use serde_json::Value;

use crate::permissions::View;
use crate::users::{self, UserForm};
use crate::{auth, AppState};

use super::{ensure_view, parse_edit_form, parse_form, parse_id_payload, to_json};

pub async fn users_list(state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::UsersList)?;
    to_json(&users::list_users(&state.db)?)
}

pub async fn users_get(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::UsersList)?;
    let id = parse_id_payload(arg0, &["id", "userId", "user_id"], "Missing user id")?;
    to_json(&users::get_user(&state.db, &id)?)
}

pub async fn users_add(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_view(state, View::UsersList)?;
    let form: UserForm = parse_form(arg0, None, "user")?;
    let user = users::add_user(&state.db, state.config.hash_cost, &form)?;
    to_json(&user)
}

pub async fn users_update(
    arg0: Option<Value>,
    arg1: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_view(state, View::UsersList)?;
    let form: UserForm = parse_edit_form(arg0, arg1, "user")?;
    let user = users::update_user(&state.db, state.config.hash_cost, &form)?;
    auth::refresh_session(&state.auth, &user)?;
    to_json(&user)
}

#[cfg(test)]
mod tests {
    use crate::invoke;
    use crate::test_support::test_state;
    use serde_json::json;

    async fn login(state: &crate::AppState, user: &str, pass: &str) {
        invoke(state, "auth_login", Some(json!(user)), Some(json!(pass)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_users_screen_is_admin_only() {
        let state = test_state();
        login(&state, "admin", "admin1234").await;
        let created = invoke(
            &state,
            "users_add",
            Some(json!({ "usuario": "caja1", "email": "caja1@mentaverde.com", "password": "caja" })),
            None,
        )
        .await
        .unwrap();
        assert_eq!(created["role"], "USER");
        assert_eq!(
            invoke(&state, "users_list", None, None).await.unwrap().as_array().map(Vec::len),
            Some(2)
        );

        invoke(&state, "auth_logout", None, None).await.unwrap();
        login(&state, "caja1", "caja").await;
        let err = invoke(&state, "users_list", None, None).await.unwrap_err();
        assert_eq!(err, "No tienes permiso para acceder a esta sección.");
    }

    #[tokio::test]
    async fn test_update_refreshes_own_session() {
        let state = test_state();
        login(&state, "admin", "admin1234").await;
        invoke(
            &state,
            "users_update",
            Some(json!("1")),
            Some(json!({
                "username": "admin",
                "email": "admin@mentaverde.com",
                "name": "Dirección General",
                "password": ""
            })),
        )
        .await
        .unwrap();
        let session = invoke(&state, "auth_get_current_session", None, None).await.unwrap();
        assert_eq!(session["name"], "Dirección General");
        assert_eq!(session["role"], "ADMIN");

        invoke(&state, "auth_logout", None, None).await.unwrap();
        login(&state, "admin", "admin1234").await;
    }
}
