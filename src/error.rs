#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum FarmacoError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("API error from {api}: {message}")]
    Api { api: String, message: String },

    #[error("API JSON error from {api}: {source}")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{entity} '{id}' not found.\n\n{suggestion}")]
    NotFound {
        entity: String,
        id: String,
        suggestion: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Authentication required.\n\n{login_hint}")]
    AuthenticationRequired { login_hint: String },

    #[error(
        "Configuration missing: {env_var} is not set. {message}\n\nTo set:\n  export {env_var}=..."
    )]
    Configuration { env_var: String, message: String },

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
