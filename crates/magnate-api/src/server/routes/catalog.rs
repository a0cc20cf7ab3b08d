#[derive(Debug, Deserialize, Default)]
struct CatalogQuery {
    category: Option<String>,
}

#[derive(Debug, Serialize)]
struct CatalogResponse {
    schema_version: String,
    count: usize,
    entries: Vec<InvestmentEntry>,
}

async fn list_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogResponse>, HttpApiError> {
    let entries = {
        let api = state.api.lock().await;
        match query.category.as_deref() {
            Some(raw) => api
                .catalog_by_category(parse_category(raw)?)
                .map_err(HttpApiError::from_game)?,
            None => api.list_active_catalog().map_err(HttpApiError::from_game)?,
        }
    };

    Ok(Json(CatalogResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        count: entries.len(),
        entries,
    }))
}

#[derive(Debug, Serialize)]
struct CatalogEntryResponse {
    schema_version: String,
    entry: InvestmentEntry,
}

async fn upsert_catalog_entry(
    Path(investment_id): Path<String>,
    State(state): State<AppState>,
    Json(mut entry): Json<InvestmentEntry>,
) -> Result<Json<CatalogEntryResponse>, HttpApiError> {
    if entry.investment_id.is_empty() {
        entry.investment_id = investment_id.clone();
    } else if entry.investment_id != investment_id {
        return Err(HttpApiError::invalid_query(
            "investment_id in body must match the path",
            Some(format!(
                "path={investment_id} body={}",
                entry.investment_id
            )),
        ));
    }

    let entry = {
        let mut api = state.api.lock().await;
        api.upsert_catalog_entry(&entry, Utc::now())
            .map_err(HttpApiError::from_game)?
    };

    Ok(Json(CatalogEntryResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        entry,
    }))
}
