use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dotenvy::dotenv;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use common::actors::{Actor, ActorType};
use common::config::AppConfig;
use common::logger;
use common::models::MODEL_FEATURES;
use market_data::remote::OandaClient;
use storage::db::open_ledger;
use storage::repositories::TradesRepository;
use strategy::inference::OnnxScorer;
use strategy::planner::OrderPlanner;
use strategy::signal::SignalClassifier;

use crate::actors::supervisor::Supervisor;
use crate::actors::trading_cycle_actor::TradingCycleActor;
use crate::services::cycle_service::CycleService;
use crate::services::execution_service::ExecutionService;
use crate::services::telegram_service::TelegramService;

mod actors;
mod services;

/// Longest wait for an in-flight cycle after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logger::setup_logger();
    debug!("System starting up...");

    let config = AppConfig::from_env()?;
    let pool = open_ledger(&config.workdir).await?;
    let ledger = TradesRepository::load_all(&pool).await?;
    let awaiting = ledger.iter().filter(|entry| !entry.is_settled()).count();
    info!(
        "Ledger holds {} trades, {} awaiting settlement",
        ledger.len(),
        awaiting
    );

    let scorer = Arc::new(OnnxScorer::new(&config.model_path, MODEL_FEATURES.len()));
    if scorer.is_simulated() {
        warn!("No model loaded; every cycle will score a neutral 0.5 and never trade.");
    }

    let broker = Arc::new(OandaClient::new(&config.broker, config.bracket.price_precision)?);
    let (notify_tx, _) = broadcast::channel::<String>(64);

    let telegram = config.telegram.as_ref().map(|tg| {
        let svc = TelegramService::new(tg, &config.instrument);
        tokio::spawn(svc.start(notify_tx.subscribe()))
    });
    if telegram.is_none() {
        info!("Telegram not configured; notifications go to the log only.");
    }

    let service = CycleService::new(
        &config.feed_path,
        pool.clone(),
        scorer,
        SignalClassifier::new(config.thresholds),
        OrderPlanner::new(config.instrument.clone(), config.bracket),
        ExecutionService::new(broker),
    )
    .with_ledger_tail(config.ledger_tail)
    .with_notifier(notify_tx.clone());

    if config.run_once {
        let outcome = service.run_cycle(Utc::now().date_naive()).await;
        drop(service);
        drop(notify_tx);
        if let Some(handle) = telegram {
            let _ = handle.await;
        }
        pool.close().await;

        let report = outcome?;
        info!("Cycle complete\n{}", report);
        return Ok(());
    }

    let refresh = config.refresh_interval;
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut supervisor = Supervisor::new();
    supervisor.register_actor(
        ActorType::TradingCycleActor,
        Box::new(move || {
            Box::new(TradingCycleActor::new(service.clone(), refresh, stop_rx.clone()))
                as Box<dyn Actor>
        }),
    );
    let mut supervisor_task = tokio::spawn(async move { supervisor.start().await });

    let interrupted = tokio::select! {
        _ = &mut supervisor_task => {
            warn!("Supervisor exited");
            false
        }
        res = tokio::signal::ctrl_c() => {
            match res {
                Ok(()) => info!("Ctrl-C received, finishing the current cycle"),
                Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
            }
            true
        }
    };

    if interrupted {
        let _ = stop_tx.send(true);
        match tokio::time::timeout(SHUTDOWN_GRACE, supervisor_task).await {
            Ok(_) => info!("Trading cycle stopped"),
            Err(_) => {
                // the stuck cycle may still hold a pooled connection
                warn!("Trading cycle did not stop within {:?}", SHUTDOWN_GRACE);
                return Ok(());
            }
        }
    }

    pool.close().await;
    Ok(())
}
