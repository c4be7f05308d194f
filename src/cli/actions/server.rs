use crate::api;
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub token_secret: SecretString,
    pub token_ttl_seconds: i64,
    pub frontend_base_url: String,
    pub rate_limit_window_seconds: u64,
    pub rate_limit_max_requests: u32,
    pub login_limit_window_seconds: u64,
    pub login_limit_max_requests: u32,
}

/// Execute the server action.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = api::handlers::auth::AuthConfig::new(args.frontend_base_url)
        .with_token_ttl_seconds(args.token_ttl_seconds)
        .with_general_window(
            args.rate_limit_window_seconds,
            args.rate_limit_max_requests,
        )
        .with_login_window(
            args.login_limit_window_seconds,
            args.login_limit_max_requests,
        );

    api::new(args.port, args.dsn, auth_config, &args.token_secret).await
}
