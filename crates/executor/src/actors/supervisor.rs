use std::{collections::HashMap, time::Duration};
use tracing::{error, info, warn};

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, Instant},
};

use crate::actors::{Actor, ActorType, ControlMessage};

type ActorFactory = Box<dyn Fn() -> Box<dyn Actor> + Send + Sync>;

/// Restarts registered actors whose heartbeat goes quiet.
pub struct Supervisor {
    actor_factories: HashMap<ActorType, ActorFactory>,
    pulses: HashMap<ActorType, Instant>,
    handles: HashMap<ActorType, JoinHandle<()>>,
    check_every: Duration,
    timeout: Duration,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            actor_factories: HashMap::new(),
            pulses: HashMap::new(),
            handles: HashMap::new(),
            check_every: Duration::from_secs(1),
            timeout: Duration::from_secs(3),
        }
    }

    pub fn with_liveness(mut self, check_every: Duration, timeout: Duration) -> Self {
        self.check_every = check_every;
        self.timeout = timeout;
        self
    }

    pub fn register_actor(&mut self, actor_type: ActorType, factory: ActorFactory) {
        self.actor_factories.insert(actor_type, factory);
    }

    /// Runs until every actor has shut down on its own.
    pub async fn start(&mut self) {
        let mut check_interval = time::interval(self.check_every);

        let (supervisor_tx, mut supervisor_rx) = mpsc::channel::<ControlMessage>(512);

        let actors: Vec<ActorType> = self.actor_factories.keys().copied().collect();
        for actor in actors {
            self.spawn_actor(actor, supervisor_tx.clone());
        }

        while !self.handles.is_empty() {
            tokio::select! {
                Some(msg) = supervisor_rx.recv() => {
                    match msg {
                        ControlMessage::Heartbeat(actor_type) => {
                            if self.handles.contains_key(&actor_type) {
                                self.pulses.insert(actor_type, Instant::now());
                            }
                        }
                        ControlMessage::Shutdown(actor_type) => {
                            warn!("{:?} is shutting down gracefully.", actor_type);
                            self.pulses.remove(&actor_type);
                            if let Some(handle) = self.handles.remove(&actor_type) {
                                handle.abort();
                            }
                        },
                        ControlMessage::Error(actor_type, error_msg) => {
                            error!("Actor {:?} reported error: {}", actor_type, error_msg);
                        },
                    }
                }

                _ = check_interval.tick() => {
                    let dead_timeout = Instant::now() - self.timeout;

                    let dead_actors: Vec<ActorType> = self
                        .pulses
                        .iter()
                        .filter(|(_, last)| **last < dead_timeout)
                        .map(|(actor, _)| *actor)
                        .collect();

                    for actor in dead_actors {
                        warn!("{:?} is unresponsive! Restarting.", actor);
                        if let Some(handle) = self.handles.remove(&actor) {
                            handle.abort();
                        }
                        self.spawn_actor(actor, supervisor_tx.clone());
                    }
                }
            }
        }

        info!("All actors stopped; supervisor exiting.");
    }

    fn spawn_actor(&mut self, actor_type: ActorType, tx: mpsc::Sender<ControlMessage>) {
        let Some(factory) = self.actor_factories.get(&actor_type) else {
            error!("No factory registered for {:?}", actor_type);
            return;
        };
        let mut new_actor = factory();
        info!("Spawning {:?} ({})", actor_type, new_actor.id());
        let new_actor_handle = tokio::spawn(async move {
            if let Err(e) = new_actor.run(tx).await {
                error!("Actor {:?} crashed: {}", actor_type, e);
            }
        });
        self.handles.insert(actor_type, new_actor_handle);
        self.pulses.insert(actor_type, Instant::now());
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    /// Crashes on its first incarnations, then shuts down cleanly.
    struct Flaky {
        incarnation: usize,
    }

    #[async_trait]
    impl Actor for Flaky {
        fn name(&self) -> ActorType {
            ActorType::TradingCycleActor
        }

        fn id(&self) -> Uuid {
            Uuid::new_v4()
        }

        async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
            if self.incarnation < 2 {
                anyhow::bail!("boom #{}", self.incarnation);
            }
            supervisor_tx.send(ControlMessage::Shutdown(self.name())).await?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn silent_actor_is_restarted_until_it_shuts_down() {
        let spawned = Arc::new(AtomicUsize::new(0));
        let counter = spawned.clone();

        let mut supervisor = Supervisor::new()
            .with_liveness(Duration::from_millis(20), Duration::from_millis(60));
        supervisor.register_actor(
            ActorType::TradingCycleActor,
            Box::new(move || {
                let incarnation = counter.fetch_add(1, Ordering::SeqCst);
                Box::new(Flaky { incarnation }) as Box<dyn Actor>
            }),
        );

        time::timeout(Duration::from_secs(5), supervisor.start())
            .await
            .expect("supervisor should exit once the actor shuts down");
        assert_eq!(spawned.load(Ordering::SeqCst), 3);
    }
}
