use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use headway::{
    application::{
        articles::ArticleMutations,
        auth::{MutationAuthorizer, StaticTokenAuthorizer},
        cache_admin::{CacheAdmin, format_expires_in},
        content::ContentQueries,
        error::AppError,
        repos::{ArticlesRepo, ArticlesWriteRepo, HealthRepo, ProductsRepo, TeamRepo},
        wordpress::{ContentOrigin, WordPressQueries},
    },
    cache::{CacheConfig, CacheStore, Invalidator},
    config,
    infra::{
        cache::build_store,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
        wordpress::WordPressClient,
    },
};
use tokio::{signal, sync::Notify};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Cache(args) => run_cache_command(settings, args.command).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let admin_token = settings
        .auth
        .admin_token
        .clone()
        .ok_or_else(|| InfraError::configuration("auth.admin_token is not configured"))
        .map_err(AppError::from)?;
    if settings.auth.api_tokens.is_empty() {
        warn!(
            target = "headway::serve",
            "no API tokens configured; article mutations will be rejected"
        );
    }

    let repositories = init_repositories(&settings).await?;
    let store = init_cache_store(&settings).await?;
    let origin: Arc<dyn ContentOrigin> = Arc::new(
        WordPressClient::from_settings(&settings.wordpress).map_err(AppError::from)?,
    );

    let state = build_api_state(
        repositories.clone(),
        Arc::clone(&store),
        origin,
        &settings.auth,
        admin_token,
    );

    let result = serve_http(&settings, state).await;

    store.close().await;
    repositories.close().await;
    info!(target = "headway::serve", "shutdown complete");

    result
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn init_cache_store(settings: &config::Settings) -> Result<Arc<CacheStore>, AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let store = build_store(&cache_config)
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    if cache_config.enabled && !store.connect_check().await {
        warn!(
            target = "headway::serve",
            backend = store.backend_name(),
            "cache store unreachable; requests will bypass the cache until it recovers"
        );
    }

    Ok(Arc::new(store))
}

fn build_api_state(
    repositories: Arc<PostgresRepositories>,
    store: Arc<CacheStore>,
    origin: Arc<dyn ContentOrigin>,
    auth: &config::AuthSettings,
    admin_token: String,
) -> ApiState {
    let articles_repo: Arc<dyn ArticlesRepo> = repositories.clone();
    let articles_write_repo: Arc<dyn ArticlesWriteRepo> = repositories.clone();
    let products_repo: Arc<dyn ProductsRepo> = repositories.clone();
    let team_repo: Arc<dyn TeamRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;

    let content = Arc::new(ContentQueries::new(
        Arc::clone(&store),
        articles_repo,
        products_repo,
        team_repo,
    ));
    let wordpress = Arc::new(WordPressQueries::new(Arc::clone(&store), origin));
    let articles = Arc::new(ArticleMutations::new(
        articles_write_repo,
        Invalidator::new(Arc::clone(&store)),
    ));
    let cache = Arc::new(CacheAdmin::new(
        store,
        Arc::clone(&content),
        Arc::clone(&wordpress),
    ));
    let authorizer: Arc<dyn MutationAuthorizer> =
        Arc::new(StaticTokenAuthorizer::new(&auth.api_tokens));

    ApiState {
        content,
        wordpress,
        articles,
        cache,
        authorizer,
        admin_token: Arc::from(admin_token),
        db: health_repo,
    }
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "headway::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let stopping = Arc::new(Notify::new());
    let signal_notify = Arc::clone(&stopping);
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal_notify.notify_one();
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        _ = drain_deadline(&stopping, grace) => {
            warn!(
                target = "headway::serve",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn drain_deadline(stopping: &Notify, grace: Duration) {
    stopping.notified().await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(target = "headway::serve", "received Ctrl+C"),
        _ = terminate => info!(target = "headway::serve", "received SIGTERM"),
    }
}

async fn run_cache_command(
    settings: config::Settings,
    command: config::CacheCommand,
) -> Result<(), AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let store = build_store(&cache_config)
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    let result = match command {
        config::CacheCommand::Status => cache_status(&store).await,
        config::CacheCommand::Clear => {
            if store.clear_all().await {
                println!("Cache cleared successfully");
                Ok(())
            } else {
                Err(AppError::unexpected("cache could not be cleared"))
            }
        }
        config::CacheCommand::Invalidate(args) => {
            let pattern = args.pattern.trim();
            if pattern.is_empty() {
                Err(AppError::validation("Pattern is required"))
            } else {
                let deleted = store.delete_pattern(pattern).await;
                println!("Invalidated {deleted} keys matching pattern");
                Ok(())
            }
        }
    };

    store.close().await;
    result
}

async fn cache_status(store: &CacheStore) -> Result<(), AppError> {
    if !store.connect_check().await {
        return Err(AppError::unexpected(format!(
            "{} cache is not available",
            store.backend_name()
        )));
    }

    println!("status: connected ({})", store.backend_name());
    match store.stats().await {
        Ok(stats) => {
            println!("total_commands_processed: {}", stats.total_commands_processed);
            println!("keyspace_hits: {}", stats.keyspace_hits);
            println!("keyspace_misses: {}", stats.keyspace_misses);
            println!("hit_rate: {:.2}%", stats.hit_rate());
        }
        Err(err) => println!("Connected but could not retrieve stats: {err}"),
    }

    match store.list_keys(&store.config().namespace_pattern()).await {
        Ok(listing) => {
            println!("keys in namespace: {}", listing.total);
            for key in listing.keys {
                println!("  {} ({})", key.key, format_expires_in(key.ttl));
            }
        }
        Err(err) => warn!(error = %err, "could not list cache keys"),
    }

    Ok(())
}
