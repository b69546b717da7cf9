//! Quote Fetcher
//!
//! One-shot quotes plus a polling fetcher that keeps the quote for the
//! current (pool, token_in, amount_in) up to date.
//!
//! Requests may complete out of order. Every request is tagged with the
//! params generation it was issued for and a sequence number; a response is
//! applied only when its generation is still current and it is newer than
//! the last applied response. Everything else is dropped silently.
//!
//! At most one interval poll is outstanding per generation: a tick that finds
//! the previous read still in flight is skipped.

use std::sync::Arc;
use std::time::Duration;

use evm_client::{ChainClient, ReadCall};
use swiftswap_core::{Address, ClientError, U256};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

use crate::state::{PoolHandle, Quote, QuoteParams, QuoteState};

/// Result of a one-shot quote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteOutcome {
    /// Nothing to quote: no pool or zero amount. No call was made.
    Absent,
    Failed(String),
    Ready(Quote),
}

impl From<QuoteOutcome> for QuoteState {
    fn from(outcome: QuoteOutcome) -> Self {
        match outcome {
            QuoteOutcome::Absent => QuoteState::Idle,
            QuoteOutcome::Failed(reason) => QuoteState::Failed { reason },
            QuoteOutcome::Ready(quote) => QuoteState::Ready(quote),
        }
    }
}

/// Ask the pool for the output of `amount_in` of `token_in`
pub async fn fetch_quote(
    client: &dyn ChainClient,
    pool: Option<&PoolHandle>,
    token_in: Address,
    amount_in: U256,
) -> QuoteOutcome {
    let Some(pool) = pool else {
        return QuoteOutcome::Absent;
    };
    if amount_in.is_zero() {
        return QuoteOutcome::Absent;
    }

    let params = QuoteParams::new(pool, token_in, amount_in);
    match client.read(&params.read_call()).await {
        Ok(amount_out) => QuoteOutcome::Ready(quote_for(&params, amount_out)),
        Err(e) => QuoteOutcome::Failed(e.to_string()),
    }
}

fn quote_for(params: &QuoteParams, amount_out: U256) -> Quote {
    Quote {
        pool: params.pool,
        token_in: params.token_in,
        amount_in: params.amount_in,
        amount_out,
        fetched_at: Instant::now(),
    }
}

struct QuoteResponse {
    generation: u64,
    seq: u64,
    params: QuoteParams,
    result: Result<U256, ClientError>,
}

/// Background quote poller for the current params.
///
/// Dropping the fetcher stops polling.
#[derive(Debug)]
pub struct QuoteFetcher {
    params: watch::Sender<Option<QuoteParams>>,
    state: watch::Receiver<QuoteState>,
}

impl QuoteFetcher {
    /// Start the polling task. Must be called inside a Tokio runtime.
    pub fn spawn(client: Arc<dyn ChainClient>, interval: Duration) -> Self {
        let (params_tx, params_rx) = watch::channel(None);
        let (state_tx, state_rx) = watch::channel(QuoteState::Idle);

        tokio::spawn(poll_quotes(client, interval, params_rx, state_tx));

        Self {
            params: params_tx,
            state: state_rx,
        }
    }

    /// Change what is being quoted. Unchanged params keep the current cycle.
    pub fn set_params(&self, params: Option<QuoteParams>) {
        let params = params.filter(|p| !p.amount_in.is_zero());
        self.params.send_if_modified(|current| {
            if *current == params {
                return false;
            }
            *current = params;
            true
        });
    }

    pub fn params(&self) -> Option<QuoteParams> {
        self.params.borrow().clone()
    }

    pub fn current(&self) -> QuoteState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QuoteState> {
        self.state.clone()
    }

    /// Stop polling and return to `Idle`
    pub fn stop(&self) {
        self.set_params(None);
    }
}

async fn poll_quotes(
    client: Arc<dyn ChainClient>,
    interval: Duration,
    mut params_rx: watch::Receiver<Option<QuoteParams>>,
    state_tx: watch::Sender<QuoteState>,
) {
    let (resp_tx, mut resp_rx) = mpsc::unbounded_channel::<QuoteResponse>();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut current: Option<QuoteParams> = None;
    let mut generation = 0u64;
    let mut next_seq = 0u64;
    let mut last_applied: Option<u64> = None;
    // A read for the current generation has not answered yet
    let mut in_flight = false;

    let issue = |params: &QuoteParams, generation: u64, seq: u64| {
        let client = client.clone();
        let resp_tx = resp_tx.clone();
        let params = params.clone();
        tokio::spawn(async move {
            let result = client.read(&params.read_call()).await;
            let _ = resp_tx.send(QuoteResponse {
                generation,
                seq,
                params,
                result,
            });
        });
    };

    loop {
        tokio::select! {
            changed = params_rx.changed() => {
                if changed.is_err() {
                    tracing::debug!("Quote fetcher dropped, stopping");
                    break;
                }
                current = params_rx.borrow_and_update().clone();
                generation += 1;
                last_applied = None;
                in_flight = false;

                match &current {
                    None => {
                        state_tx.send_replace(QuoteState::Idle);
                    }
                    Some(params) => {
                        tracing::debug!(
                            "Quoting {} of {} on pool {}",
                            params.amount_in,
                            params.token_in,
                            params.pool
                        );
                        state_tx.send_replace(QuoteState::Pending);
                        issue(params, generation, next_seq);
                        next_seq += 1;
                        in_flight = true;
                        ticker.reset();
                    }
                }
            }
            _ = ticker.tick() => {
                let Some(params) = &current else { continue };
                if in_flight {
                    tracing::trace!("Previous quote read still in flight, skipping tick");
                    continue;
                }
                issue(params, generation, next_seq);
                next_seq += 1;
                in_flight = true;
            }
            Some(resp) = resp_rx.recv() => {
                if resp.generation == generation {
                    in_flight = false;
                }
                if resp.generation != generation
                    || last_applied.is_some_and(|seq| resp.seq < seq)
                {
                    tracing::trace!("Dropping superseded quote response #{}", resp.seq);
                    continue;
                }
                last_applied = Some(resp.seq);

                let state = match resp.result {
                    Ok(amount_out) => QuoteState::Ready(quote_for(&resp.params, amount_out)),
                    Err(e) => {
                        tracing::debug!("Quote failed: {}", e);
                        QuoteState::Failed { reason: e.to_string() }
                    }
                };
                state_tx.send_replace(state);
            }
        }
    }
}
