use clap::{Arg, Command};

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_rate_limit_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("token-secret")
                .long("token-secret")
                .help("Secret used to sign bearer tokens")
                .env("MERCATO_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("token-ttl-seconds")
                .long("token-ttl-seconds")
                .help("Bearer token TTL in seconds")
                .env("MERCATO_TOKEN_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend origin allowed by CORS")
                .env("MERCATO_FRONTEND_BASE_URL")
                .default_value("https://shop.mercato.dev"),
        )
}

fn with_rate_limit_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("rate-limit-window-seconds")
                .long("rate-limit-window-seconds")
                .help("General rate limit window in seconds")
                .env("MERCATO_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("rate-limit-max-requests")
                .long("rate-limit-max-requests")
                .help("Requests allowed per IP per general window")
                .env("MERCATO_RATE_LIMIT_MAX_REQUESTS")
                .default_value("100")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("login-limit-window-seconds")
                .long("login-limit-window-seconds")
                .help("Login rate limit window in seconds")
                .env("MERCATO_LOGIN_LIMIT_WINDOW_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("login-limit-max-requests")
                .long("login-limit-max-requests")
                .help("Login attempts allowed per IP per login window")
                .env("MERCATO_LOGIN_LIMIT_MAX_REQUESTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
}
