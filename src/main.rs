//! Launchpad auth service entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Choose challenge/user storage (Redis when REDIS_URL is set, else memory)
//! 3. Build the auth service and router
//! 4. Apply CORS and request tracing
//! 5. Start Axum server
//!
//! Also supports `address` and `sign` subcommands for driving the login
//! flow from a shell with a raw private key.

use axum::http::{header, HeaderValue, Method};
use launchpad_auth::{
    auth::{
        login_message, sign_personal_message, verify::address_from_verifying_key, AppState,
        AuthService,
    },
    clock::{Clock, SystemClock},
    config::Config,
    routes,
    storage::{
        ChallengeStore, MemoryChallengeStore, MemoryUserStore, RedisChallengeStore,
        RedisUserStore, UserStore,
    },
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

fn parse_signing_key(hex_key: &str) -> Result<k256::ecdsa::SigningKey, String> {
    let digits = hex_key.strip_prefix("0x").unwrap_or(hex_key);
    let bytes = hex::decode(digits).map_err(|e| format!("Invalid key hex: {}", e))?;
    k256::ecdsa::SigningKey::from_slice(&bytes).map_err(|e| format!("Invalid private key: {}", e))
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  launchpad-auth                       run the server");
    eprintln!("  launchpad-auth address <privkey>     print the address for a private key");
    eprintln!("  launchpad-auth sign <privkey> <nonce>");
    eprintln!("                                       sign the login message for <nonce>");
}

/// Handle CLI subcommands. Returns `None` when the server should start.
fn run_subcommand(args: &[String]) -> Option<Result<String, String>> {
    match args.get(1).map(String::as_str) {
        Some("address") if args.len() == 3 => Some(
            parse_signing_key(&args[2])
                .map(|key| address_from_verifying_key(key.verifying_key()).to_string()),
        ),
        Some("sign") if args.len() == 4 => Some(parse_signing_key(&args[2]).and_then(|key| {
            sign_personal_message(&key, &login_message(&args[3]))
                .map_err(|e| format!("Signing failed: {}", e))
        })),
        Some("address") | Some("sign") | Some("help") | Some("--help") => {
            Some(Err(String::new()))
        }
        _ => None,
    }
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    if let Some(result) = run_subcommand(&args) {
        match result {
            Ok(output) => println!("{}", output),
            Err(e) => {
                if e.is_empty() {
                    print_usage();
                } else {
                    eprintln!("Error: {}", e);
                }
                std::process::exit(1);
            }
        }
        return;
    }

    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting launchpad-auth on {}", config.bind_addr);

    let (challenges, users): (Arc<dyn ChallengeStore>, Arc<dyn UserStore>) =
        match &config.redis_url {
            Some(url) => {
                let client = redis::Client::open(url.as_str()).expect("Invalid Redis URL");

                // Verify Redis connection
                client
                    .get_multiplexed_async_connection()
                    .await
                    .expect("Failed to connect to Redis");
                tracing::info!("Using Redis for challenges and users");

                (
                    Arc::new(RedisChallengeStore::new(client.clone())),
                    Arc::new(RedisUserStore::new(client)),
                )
            }
            None => {
                tracing::warn!(
                    "REDIS_URL not set; challenges and users are kept in memory (single instance only)"
                );
                (
                    Arc::new(MemoryChallengeStore::new()),
                    Arc::new(MemoryUserStore::new()),
                )
            }
        };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let state = AppState {
        auth: Arc::new(AuthService::from_config(&config, challenges, users, clock)),
    };

    let app = routes::api_router()
        .layer(build_cors_layer(&config.cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
