// src/main.rs

use chrono::Utc;
use exam_server::config::Config;
use exam_server::db;
use exam_server::error::AppError;
use exam_server::models::user::Role;
use exam_server::routes;
use exam_server::state::AppState;
use exam_server::utils::hash::hash_password;
use sqlx::SqlitePool;
use std::net::SocketAddr;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration from environment (.env included)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "exam-server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Server stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let pool = db::connect(&config.database_url).await?;
    tracing::info!("Database connected...");

    tracing::info!("Running migrations...");
    db::migrate(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    if let Err(e) = seed_admin_user(&pool, &config).await {
        tracing::error!("Failed to seed admin user: {:?}", e);
    }

    tracing::info!(
        "Exams last {} minutes with up to {} questions, scoring policy '{}'",
        config.exam.duration_minutes,
        config.exam.question_count,
        config.exam.scoring_policy
    );

    let addr: SocketAddr = config.bind_addr.parse()?;

    let state = AppState { pool, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Creates the admin account from `ADMIN_USERNAME` / `ADMIN_PASSWORD` when
/// it does not exist yet.
async fn seed_admin_user(pool: &SqlitePool, config: &Config) -> Result<(), AppError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
    else {
        return Ok(());
    };

    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;

    if exists.is_none() {
        tracing::info!("Seeding admin user: {}", username);
        let hashed_password = hash_password(password)?;
        let fullname = config.admin_fullname.as_deref().unwrap_or("Administrator");

        sqlx::query(
            "INSERT INTO users (fullname, username, password, role, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(fullname)
        .bind(username)
        .bind(hashed_password)
        .bind(Role::Admin.as_str())
        .bind(Utc::now())
        .execute(pool)
        .await?;
        tracing::info!("Admin user created successfully.");
    }

    Ok(())
}
