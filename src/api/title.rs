use crate::api::{ChatRequest, ChatResponse};
use crate::core::conversation::Turn;
use crate::utils::url::construct_api_url;

/// Ask the backend to summarize a finished exchange into a short title.
///
/// The backend builds its own titling prompt from the submitted history, so
/// `user_input` stays empty here. The model is pinned server-side to a cheap
/// one; the field is still required by the request schema.
pub async fn fetch_chat_title(
    client: &reqwest::Client,
    base_url: &str,
    auth_token: Option<&str>,
    chat_history: Vec<Turn>,
) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let title_url = construct_api_url(base_url, "chat_title");
    let request = ChatRequest {
        user_input: String::new(),
        chat_history,
        chat_model: "gpt-4o-mini".to_string(),
        temperature: 0.8,
        chat_id: None,
    };

    let mut http_request = client
        .post(title_url)
        .header("Content-Type", "application/json");
    if let Some(token) = auth_token {
        http_request = http_request.bearer_auth(token);
    }

    let response = http_request.json(&request).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(format!("title request failed with status {status}: {error_text}").into());
    }

    let body = response.json::<ChatResponse>().await?;
    Ok(body.response.trim().to_string())
}
