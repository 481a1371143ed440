//! Service setup and lifecycle
//!
//! Builds the store, the bus and the fleet from configuration, then runs the
//! fleet core and the request listener until a shutdown signal arrives.

use std::sync::Arc;

use adwatch_bus::{RedisBus, RedisBusConfig, RedisPool};
use adwatch_common::{AppConfig, AppError};
use adwatch_core::ClientFactory;
use adwatch_db::{
    create_pool, run_migrations, PgChannelRepository, PgNewsRepository, PgPool,
    PgSessionRepository, PgSubscriptionRepository,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::admin::{CheckOutcome, SessionAdmin};
use crate::balancer::LoadBalancer;
use crate::client::default_factory;
use crate::context::FleetContext;
use crate::fleet::FleetCore;
use crate::listener::RequestListener;
use crate::subscription::SubscriptionHandler;

/// Connect to PostgreSQL and apply migrations when enabled
pub async fn connect_store(config: &AppConfig) -> Result<PgPool, AppError> {
    info!("Connecting to PostgreSQL...");
    let pool = create_pool(&adwatch_db::DatabaseConfig::from(&config.database))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    if config.database.run_migrations {
        run_migrations(&pool, &config.database.migrations_dir)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
    }
    Ok(pool)
}

/// Build the fleet context on top of PostgreSQL and Redis
pub async fn create_context(config: &AppConfig, pool: PgPool) -> Result<FleetContext, AppError> {
    info!("Connecting to Redis...");
    let redis_pool = RedisPool::from_config(&config.redis).map_err(|e| AppError::Bus(e.to_string()))?;
    redis_pool
        .health_check()
        .await
        .map_err(|e| AppError::Bus(e.to_string()))?;
    let bus = RedisBus::new(redis_pool, RedisBusConfig::from(&config.redis))
        .map_err(|e| AppError::Bus(e.to_string()))?;
    info!("Redis connection established");

    Ok(FleetContext::new(
        Arc::new(PgSessionRepository::new(
            pool.clone(),
            config.fleet.sessions_dir.clone(),
        )),
        Arc::new(PgChannelRepository::new(pool.clone())),
        Arc::new(PgSubscriptionRepository::new(pool.clone())),
        Arc::new(PgNewsRepository::new(pool)),
        Arc::new(bus),
        config.fleet.clone(),
    ))
}

/// Run the fleet core and the request listener until `shutdown` fires.
///
/// If either stops on its own, the other is cancelled too.
pub async fn serve(
    ctx: FleetContext,
    factory: Arc<dyn ClientFactory>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let core = FleetCore::new(ctx.clone(), factory);
    let fleet = core.handle();
    let balancer = LoadBalancer::new(ctx.sessions_arc());
    let handler = SubscriptionHandler::new(ctx.clone(), balancer, fleet);
    let listener = RequestListener::new(ctx.bus_arc(), handler);

    let core_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = core.run(shutdown.clone()).await;
            shutdown.cancel();
            result
        })
    };
    let listener_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let result = listener.run(shutdown.clone()).await;
            shutdown.cancel();
            result
        })
    };

    let (core_result, listener_result) = tokio::join!(core_task, listener_task);
    let mut outcome = Ok(());
    for (name, joined) in [("fleet core", core_result), ("listener", listener_result)] {
        match joined {
            Ok(Ok(())) => debug!(task = name, "Task finished"),
            Ok(Err(e)) => {
                error!(task = name, error = %e, "Task failed");
                outcome = Err(e.into());
            }
            Err(e) => {
                error!(task = name, error = %e, "Task panicked");
                outcome = Err(AppError::internal(e));
            }
        }
    }
    outcome
}

/// Run the complete service with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let factory = default_factory()?;
    let pool = connect_store(&config).await?;
    let ctx = create_context(&config, pool).await?;

    info!(app = %config.app.name, env = ?config.app.env, "Fleet service starting");
    serve(ctx, factory, install_signal_handler()).await?;
    info!("Fleet service stopped");
    Ok(())
}

/// Check every stored session once and report how many are usable
pub async fn check_sessions(config: AppConfig) -> Result<(), AppError> {
    let factory = default_factory()?;
    let pool = connect_store(&config).await?;
    let sessions = Arc::new(PgSessionRepository::new(pool, config.fleet.sessions_dir.clone()));

    let outcomes = SessionAdmin::new(sessions, factory).check_all().await?;
    let authorized = outcomes
        .iter()
        .filter(|(_, outcome)| outcome.is_authorized())
        .count();
    let banned = outcomes
        .iter()
        .filter(|(_, outcome)| matches!(outcome, CheckOutcome::Banned(_)))
        .count();
    info!(total = outcomes.len(), authorized, banned, "Session check complete");
    Ok(())
}

/// Cancel the returned token on SIGINT or SIGTERM
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received SIGINT, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                },
                Err(e) => {
                    warn!(error = %e, "Failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Received SIGINT, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received Ctrl+C, shutting down");
        }

        trigger.cancel();
    });

    token
}
