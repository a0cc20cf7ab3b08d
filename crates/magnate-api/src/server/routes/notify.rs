#[derive(Debug, Deserialize)]
struct NotifyRequest {
    message: String,
    #[serde(default)]
    important: bool,
    #[serde(default)]
    min_income: Option<f64>,
}

#[derive(Debug, Serialize)]
struct NotifyResponse {
    schema_version: String,
    targeted: usize,
    pushed: usize,
    messaged: usize,
    failed: usize,
}

async fn send_notification(
    State(state): State<AppState>,
    Json(request): Json<NotifyRequest>,
) -> Result<Json<NotifyResponse>, HttpApiError> {
    let accounts = {
        let api = state.api.lock().await;
        api.accounts_with_min_income(request.min_income.unwrap_or(0.0))
            .map_err(HttpApiError::from_game)?
    };

    let notification = Notification {
        message: request.message,
        important: request.important,
    };
    let summary = state.dispatcher.broadcast(&accounts, &notification);

    Ok(Json(NotifyResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        targeted: summary.targeted,
        pushed: summary.pushed,
        messaged: summary.messaged,
        failed: summary.failed,
    }))
}
