use serde_json::Value;

use crate::assistant::Persona;
use crate::error::AppError;
use crate::{auth, permissions, value_str, AppState};

use super::to_json;

/// The assistant is available on the login screen too, so only the flag
/// (or an admin session) gates it.
fn ensure_assistant(state: &AppState) -> Result<(), String> {
    let user = auth::current_user(&state.auth)?;
    let flags = permissions::load(&state.db)?;
    if permissions::assistant_visible(user.as_ref(), &flags) {
        Ok(())
    } else {
        Err(AppError::Forbidden.into())
    }
}

fn parse_message_payload(arg0: Option<Value>) -> String {
    match arg0 {
        Some(Value::String(text)) => text,
        Some(v @ Value::Object(_)) => {
            value_str(&v, &["message", "input", "content", "prompt"]).unwrap_or_default()
        }
        _ => String::new(),
    }
}

fn parse_persona_payload(arg1: Option<Value>) -> Result<Persona, String> {
    match arg1 {
        None | Some(Value::Null) => Ok(Persona::default()),
        Some(v @ Value::Object(_)) => match v.get("persona") {
            Some(p) => serde_json::from_value(p.clone()).map_err(|e| format!("Invalid persona: {e}")),
            None => Ok(Persona::default()),
        },
        Some(v) => serde_json::from_value(v).map_err(|e| format!("Invalid persona: {e}")),
    }
}

fn transcript_json(state: &AppState) -> Result<Value, String> {
    Ok(serde_json::json!({
        "messages": to_json(&state.assistant.transcript()?)?,
        "loading": state.assistant.is_loading(),
    }))
}

pub async fn assistant_get_transcript(state: &AppState) -> Result<Value, String> {
    ensure_assistant(state)?;
    transcript_json(state)
}

pub async fn assistant_send(arg0: Option<Value>, state: &AppState) -> Result<Value, String> {
    ensure_assistant(state)?;
    let message = parse_message_payload(arg0);
    state.assistant.send(&message).await?;
    transcript_json(state)
}

/// One-shot completion outside the chat transcript.
pub async fn assistant_generate(
    arg0: Option<Value>,
    arg1: Option<Value>,
    state: &AppState,
) -> Result<Value, String> {
    ensure_assistant(state)?;
    let prompt = parse_message_payload(arg0);
    if prompt.trim().is_empty() {
        return Err(AppError::MissingField("prompt").into());
    }
    let persona = parse_persona_payload(arg1)?;
    let text = state.assistant.client.generate(&prompt, persona).await;
    Ok(serde_json::json!({ "text": text }))
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn parse_persona_payload_defaults_to_security() {
        assert_eq!(parse_persona_payload(None).unwrap(), Persona::Security);
        assert_eq!(
            parse_persona_payload(Some(serde_json::json!("sql"))).unwrap(),
            Persona::Sql
        );
        assert_eq!(
            parse_persona_payload(Some(serde_json::json!({ "persona": "sql" }))).unwrap(),
            Persona::Sql
        );
        assert!(parse_persona_payload(Some(serde_json::json!("chef"))).is_err());
    }

    #[test]
    fn parse_message_payload_reads_known_keys() {
        assert_eq!(parse_message_payload(Some(serde_json::json!("hola"))), "hola");
        assert_eq!(
            parse_message_payload(Some(serde_json::json!({ "input": "ayuda" }))),
            "ayuda"
        );
        assert_eq!(parse_message_payload(None), "");
    }
}

#[cfg(test)]
mod tests {
    use crate::assistant::{GREETING, UNAVAILABLE_REPLY};
    use crate::invoke;
    use crate::test_support::test_state;
    use serde_json::json;

    #[tokio::test]
    async fn test_chat_falls_back_without_api_key() {
        let state = test_state();
        let before = invoke(&state, "assistant_get_transcript", None, None)
            .await
            .unwrap();
        assert_eq!(before["messages"][0]["content"], GREETING);
        assert_eq!(before["loading"], false);

        let after = invoke(&state, "assistant_send", Some(json!("No puedo entrar")), None)
            .await
            .unwrap();
        let messages = after["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["content"], UNAVAILABLE_REPLY);

        let blank = invoke(&state, "assistant_send", Some(json!("   ")), None)
            .await
            .unwrap();
        assert_eq!(blank["messages"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_hidden_assistant_is_forbidden() {
        let state = test_state();
        invoke(&state, "auth_login", Some(json!("admin")), Some(json!("admin1234")))
            .await
            .unwrap();
        invoke(&state, "permissions_toggle", Some(json!("showAIAssistant")), None)
            .await
            .unwrap();
        invoke(&state, "auth_logout", None, None).await.unwrap();
        assert!(invoke(&state, "assistant_get_transcript", None, None)
            .await
            .is_err());
        assert!(invoke(&state, "assistant_generate", Some(json!("hola")), None)
            .await
            .is_err());
    }
}
