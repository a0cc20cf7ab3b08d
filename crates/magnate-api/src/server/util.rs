fn apply_cors_headers(headers: &mut axum::http::HeaderMap) {
    headers.insert(
        HeaderName::from_static("access-control-allow-origin"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-methods"),
        HeaderValue::from_static("GET,POST,OPTIONS,PUT,PATCH,DELETE"),
    );
    headers.insert(
        HeaderName::from_static("access-control-allow-headers"),
        HeaderValue::from_static("*"),
    );
    headers.insert(
        HeaderName::from_static("access-control-max-age"),
        HeaderValue::from_static("3600"),
    );
}

fn parse_category(raw: &str) -> Result<Category, HttpApiError> {
    serde_json::from_str(&format!("\"{}\"", raw.trim().to_lowercase())).map_err(|_| {
        HttpApiError::invalid_query(
            "invalid category filter",
            Some(format!("category={raw}")),
        )
    })
}
