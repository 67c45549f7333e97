use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use ddk_engine::{DispatchEngine, DispatchView, EngineCommand, MutationKind, OfferTicket};
use ddk_schemas::{Driver, DriverId, OfferResponse, Order, OrderId};
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::{ClientError, DispatchClient};

/// Cadence knobs for the run loop.
#[derive(Copy, Clone, Debug)]
pub struct RuntimeConfig {
    /// Engine tick period (lane/SLA/timer recomputation).
    pub tick_interval: Duration,
    /// Authoritative refetch period for orders and drivers.
    pub poll_interval: Duration,
}

impl RuntimeConfig {
    pub fn defaults() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Operator actions fed into the run loop by the host UI.
#[derive(Clone, Debug)]
pub enum OperatorCommand {
    Focus(Option<OrderId>),
    SetAutoRedispatch(bool),
    Offer { order_id: OrderId, driver_id: DriverId },
    Redispatch { order_id: OrderId },
    Reassign { order_id: OrderId },
    Cancel { order_id: OrderId, reason: Option<String> },
}

/// Completion of a spawned collaborator call, merged back into the engine
/// by the loop task.
enum Completion {
    Orders {
        result: Result<Vec<Order>, ClientError>,
        fetched_at: DateTime<Utc>,
    },
    Drivers {
        result: Result<Vec<Driver>, ClientError>,
        fetched_at: DateTime<Utc>,
    },
    Offer {
        ticket: OfferTicket,
        result: Result<OfferResponse, ClientError>,
    },
    Mutation {
        order_id: OrderId,
        kind: MutationKind,
        result: Result<(), ClientError>,
    },
}

/// Drive the engine against live collaborators.
///
/// The loop task is the single writer of engine state: ticks, push events,
/// operator commands, and network completions are all serialized through
/// this `select!`. Collaborator calls are spawned fire-and-forget; the tick
/// path never blocks on the network.
///
/// Returns when the operator channel closes (orderly shutdown) or with an
/// error when a collaborator reports an authorization failure, which is
/// surfaced, never swallowed.
pub async fn run_loop<C>(
    client: Arc<C>,
    cfg: RuntimeConfig,
    mut engine: DispatchEngine,
    mut push_rx: mpsc::Receiver<serde_json::Value>,
    mut ops_rx: mpsc::Receiver<OperatorCommand>,
    view_tx: watch::Sender<Option<DispatchView>>,
) -> anyhow::Result<()>
where
    C: DispatchClient + 'static,
{
    let (done_tx, mut done_rx) = mpsc::channel::<Completion>(256);
    let mut tick = tokio::time::interval(cfg.tick_interval);
    let mut poll = tokio::time::interval(cfg.poll_interval);
    let mut push_open = true;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let out = engine.tick(Utc::now());
                for command in &out.commands {
                    match command {
                        EngineCommand::Redispatch { order_id } => {
                            spawn_mutation(&client, &done_tx, *order_id, MutationKind::Redispatch, None);
                        }
                        EngineCommand::RefreshOrders => spawn_order_fetch(&client, &done_tx),
                        EngineCommand::RefreshDrivers => spawn_driver_fetch(&client, &done_tx),
                    }
                }
                let _ = view_tx.send(Some(out.view));
            }

            _ = poll.tick() => {
                spawn_order_fetch(&client, &done_tx);
                spawn_driver_fetch(&client, &done_tx);
            }

            raw = push_rx.recv(), if push_open => match raw {
                Some(raw) => engine.apply_push(&raw, Utc::now()),
                None => {
                    // Polling remains as the fallback signal source.
                    warn!("push channel closed; continuing on polls alone");
                    push_open = false;
                }
            },

            op = ops_rx.recv() => match op {
                Some(op) => handle_operator(&client, &done_tx, &mut engine, op),
                None => {
                    info!("operator channel closed; run loop stopping");
                    return Ok(());
                }
            },

            Some(done) = done_rx.recv() => {
                apply_completion(&mut engine, done)?;
            }
        }
    }
}

fn handle_operator<C>(
    client: &Arc<C>,
    done_tx: &mpsc::Sender<Completion>,
    engine: &mut DispatchEngine,
    op: OperatorCommand,
) where
    C: DispatchClient + 'static,
{
    match op {
        OperatorCommand::Focus(order_id) => engine.set_focus(order_id),
        OperatorCommand::SetAutoRedispatch(armed) => engine.set_auto_redispatch(armed),
        OperatorCommand::Offer { order_id, driver_id } => {
            let ticket = engine.stage_offer(order_id, driver_id, Utc::now());
            let client = Arc::clone(client);
            let tx = done_tx.clone();
            tokio::spawn(async move {
                let result = client.submit_offer(order_id, driver_id).await;
                let _ = tx.send(Completion::Offer { ticket, result }).await;
            });
        }
        OperatorCommand::Redispatch { order_id } => {
            spawn_mutation(client, done_tx, order_id, MutationKind::Redispatch, None);
        }
        OperatorCommand::Reassign { order_id } => {
            spawn_mutation(client, done_tx, order_id, MutationKind::Reassign, None);
        }
        OperatorCommand::Cancel { order_id, reason } => {
            spawn_mutation(client, done_tx, order_id, MutationKind::Cancel, reason);
        }
    }
}

fn apply_completion(engine: &mut DispatchEngine, done: Completion) -> anyhow::Result<()> {
    let now = Utc::now();
    match done {
        Completion::Orders { result, fetched_at } => match result {
            Ok(orders) => {
                engine.apply_orders(orders, fetched_at);
            }
            Err(err) if err.is_unauthorized() => {
                return Err(err).context("order refetch unauthorized")
            }
            Err(err) => warn!(%err, "order refetch failed; next poll retries"),
        },
        Completion::Drivers { result, fetched_at } => match result {
            Ok(drivers) => {
                engine.apply_drivers(drivers, fetched_at);
            }
            Err(err) if err.is_unauthorized() => {
                return Err(err).context("driver refetch unauthorized")
            }
            Err(err) => warn!(%err, "driver refetch failed; next poll retries"),
        },
        Completion::Offer { ticket, result } => match result {
            Ok(response) => engine.apply_offer_response(&ticket, &response, now),
            Err(err) if err.is_unauthorized() => {
                return Err(err).context("offer submission unauthorized")
            }
            Err(err) => {
                warn!(order_id = %ticket.order_id, %err, "offer submission failed");
                engine.fail_offer(&ticket, now);
            }
        },
        Completion::Mutation { order_id, kind, result } => match result {
            Ok(()) => engine.apply_mutation_ack(order_id, kind, now),
            Err(err) if err.is_unauthorized() => {
                return Err(err).context("mutation unauthorized")
            }
            // No automatic retry: for redispatch the controller cooldown
            // spaces the next qualifying attempt.
            Err(err) => warn!(%order_id, ?kind, %err, "mutation failed"),
        },
    }
    Ok(())
}

fn spawn_order_fetch<C>(client: &Arc<C>, tx: &mpsc::Sender<Completion>)
where
    C: DispatchClient + 'static,
{
    let client = Arc::clone(client);
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = client.list_orders().await;
        let fetched_at = Utc::now();
        let _ = tx.send(Completion::Orders { result, fetched_at }).await;
    });
}

fn spawn_driver_fetch<C>(client: &Arc<C>, tx: &mpsc::Sender<Completion>)
where
    C: DispatchClient + 'static,
{
    let client = Arc::clone(client);
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = client.list_drivers().await;
        let fetched_at = Utc::now();
        let _ = tx.send(Completion::Drivers { result, fetched_at }).await;
    });
}

fn spawn_mutation<C>(
    client: &Arc<C>,
    tx: &mpsc::Sender<Completion>,
    order_id: OrderId,
    kind: MutationKind,
    reason: Option<String>,
) where
    C: DispatchClient + 'static,
{
    let client = Arc::clone(client);
    let tx = tx.clone();
    tokio::spawn(async move {
        let result = match kind {
            MutationKind::Redispatch => client.submit_redispatch(order_id).await,
            MutationKind::Reassign => client.submit_reassign(order_id).await,
            MutationKind::Cancel => client.submit_cancel(order_id, reason).await,
        };
        let _ = tx.send(Completion::Mutation { order_id, kind, result }).await;
    });
}
