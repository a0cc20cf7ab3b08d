#[derive(Debug, Deserialize, Default)]
struct RegisterAccountRequest {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    language_code: Option<String>,
}

#[derive(Debug, Serialize)]
struct AccountResponse {
    schema_version: String,
    account: Account,
}

async fn register_account(
    Path(account_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<RegisterAccountRequest>,
) -> Result<Json<AccountResponse>, HttpApiError> {
    let profile = AccountProfile {
        first_name: request.first_name,
        last_name: request.last_name,
        username: request.username,
        language_code: request.language_code,
    };

    let account = {
        let mut api = state.api.lock().await;
        api.register_account(&account_id, profile, Utc::now())
            .map_err(HttpApiError::from_game)?
    };

    Ok(Json(AccountResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        account,
    }))
}

async fn get_account(
    Path(account_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AccountResponse>, HttpApiError> {
    let account = {
        let api = state.api.lock().await;
        api.account(&account_id).map_err(HttpApiError::from_game)?
    };

    Ok(Json(AccountResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        account,
    }))
}

#[derive(Debug, Serialize)]
struct CollectIncomeResponse {
    schema_version: String,
    account_id: String,
    added: f64,
    balance: f64,
    contested: bool,
}

async fn collect_income(
    Path(account_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CollectIncomeResponse>, HttpApiError> {
    let outcome = {
        let mut api = state.api.lock().await;
        api.credit_elapsed_income(&account_id, Utc::now())
            .map_err(HttpApiError::from_game)?
    };

    Ok(Json(CollectIncomeResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        account_id,
        added: outcome.added(),
        balance: outcome.balance(),
        contested: outcome.is_contested(),
    }))
}

#[derive(Debug, Deserialize)]
struct PurchaseRequest {
    investment_id: String,
}

#[derive(Debug, Serialize)]
struct PurchaseResponse {
    schema_version: String,
    account_id: String,
    investment_id: String,
    balance: f64,
    passive_income: f64,
    new_level: u32,
    income: f64,
    next_cost: f64,
}

async fn purchase_investment(
    Path(account_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>, HttpApiError> {
    let receipt = {
        let mut api = state.api.lock().await;
        api.purchase_investment(&account_id, &request.investment_id, Utc::now())
            .map_err(HttpApiError::from_game)?
    };

    Ok(Json(PurchaseResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        account_id,
        investment_id: receipt.investment_id,
        balance: receipt.balance,
        passive_income: receipt.passive_income,
        new_level: receipt.new_level,
        income: receipt.income,
        next_cost: receipt.next_cost,
    }))
}
