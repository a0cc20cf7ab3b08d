#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "server io error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug)]
struct HttpApiError {
    status: StatusCode,
    error: ApiError,
}

impl HttpApiError {
    fn invalid_query(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::InvalidQuery, message, details),
        }
    }

    fn from_game(err: GameError) -> Self {
        match err {
            GameError::AccountNotFound(account_id) => Self {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new(
                    ErrorCode::AccountNotFound,
                    "account not found",
                    Some(format!("account_id={account_id}")),
                ),
            },
            GameError::InvestmentNotFound(investment_id) => Self {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new(
                    ErrorCode::InvestmentNotFound,
                    "investment not found",
                    Some(format!("investment_id={investment_id}")),
                ),
            },
            GameError::InvestmentInactive(investment_id) => Self {
                status: StatusCode::CONFLICT,
                error: ApiError::new(
                    ErrorCode::InvestmentInactive,
                    "investment is not active",
                    Some(format!("investment_id={investment_id}")),
                ),
            },
            GameError::InsufficientFunds { balance, required } => Self {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::new(
                    ErrorCode::InsufficientFunds,
                    "insufficient funds",
                    Some(format!("balance={balance} required={required}")),
                ),
            },
            GameError::UpdateContested(account_id) => Self {
                status: StatusCode::CONFLICT,
                error: ApiError::new(
                    ErrorCode::ConcurrentUpdateLost,
                    "account was updated concurrently; retry the request",
                    Some(format!("account_id={account_id}")),
                ),
            },
            GameError::Persistence(err) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::new(
                    ErrorCode::InternalError,
                    "operation failed; try again",
                    Some(err.to_string()),
                ),
            },
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}
