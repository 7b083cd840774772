use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info};
use uuid::Uuid;

use crate::actors::{Actor, ActorType, ControlMessage};
use crate::services::cycle_service::CycleService;

/// Runs the trading cycle on a fixed refresh interval until `stop` flips to
/// true. A cycle already in progress always runs to completion.
pub struct TradingCycleActor {
    id: Uuid,
    service: CycleService,
    refresh: Duration,
    stop: watch::Receiver<bool>,
}

impl TradingCycleActor {
    pub fn new(service: CycleService, refresh: Duration, stop: watch::Receiver<bool>) -> Self {
        Self {
            id: Uuid::new_v4(),
            service,
            refresh,
            stop,
        }
    }

    async fn shut_down(&self, supervisor_tx: &mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        info!("Trading cycle stopping");
        supervisor_tx
            .send(ControlMessage::Shutdown(self.name()))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Actor for TradingCycleActor {
    fn name(&self) -> ActorType {
        ActorType::TradingCycleActor
    }

    fn id(&self) -> Uuid {
        self.id
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let _heartbeat = self.spawn_heartbeat(supervisor_tx.clone());
        info!("Trading cycle running every {:?}", self.refresh);

        let mut ticker = time::interval(self.refresh);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *self.stop.borrow() {
                return self.shut_down(&supervisor_tx).await;
            }
            tokio::select! {
                _ = ticker.tick() => {}
                changed = self.stop.changed() => {
                    // a dropped sender also means nobody wants more cycles
                    if changed.is_err() || *self.stop.borrow() {
                        return self.shut_down(&supervisor_tx).await;
                    }
                    continue;
                }
            }

            let today = Utc::now().date_naive();
            match self.service.run_cycle(today).await {
                Ok(report) => info!("Cycle complete\n{}", report),
                Err(e) => {
                    error!("Cycle aborted: {}", e);
                    let msg = ControlMessage::Error(self.name(), e.to_string());
                    if supervisor_tx.send(msg).await.is_err() {
                        anyhow::bail!("supervisor channel closed");
                    }
                }
            }

            if supervisor_tx.is_closed() {
                anyhow::bail!("supervisor channel closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::{BracketConfig, SignalThresholds};
    use common::traits::{MockOrderSubmitter, MockScorer};
    use std::sync::Arc;
    use storage::db::open_in_memory;
    use strategy::planner::OrderPlanner;
    use strategy::signal::SignalClassifier;

    use crate::services::execution_service::ExecutionService;

    async fn idle_service() -> CycleService {
        CycleService::new(
            "no/such/feed.csv",
            open_in_memory().await.unwrap(),
            Arc::new(MockScorer::new()),
            SignalClassifier::new(SignalThresholds::default()),
            OrderPlanner::new("EUR_USD", BracketConfig::default()),
            ExecutionService::new(Arc::new(MockOrderSubmitter::new())),
        )
    }

    #[tokio::test]
    async fn stop_signal_reports_shutdown() {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut actor =
            TradingCycleActor::new(idle_service().await, Duration::from_secs(3600), stop_rx);
        let (tx, mut rx) = mpsc::channel(16);

        let run = tokio::spawn(async move { actor.run(tx).await });

        // the first tick fires at once; the missing feed aborts that cycle
        loop {
            match rx.recv().await {
                Some(ControlMessage::Error(_, msg)) => {
                    assert!(msg.contains("no/such/feed.csv"));
                    break;
                }
                Some(_) => continue,
                None => panic!("actor exited before its first cycle"),
            }
        }

        stop_tx.send(true).unwrap();
        loop {
            match rx.recv().await {
                Some(ControlMessage::Shutdown(name)) => {
                    assert_eq!(name, ActorType::TradingCycleActor);
                    break;
                }
                Some(_) => continue,
                None => panic!("actor exited without reporting shutdown"),
            }
        }
        run.await.unwrap().unwrap();
    }
}
