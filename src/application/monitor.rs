use crate::application::registry::FlightRegistry;
use crate::config::AutoPayConfig;
use crate::domain::flight::flight_key;
use crate::domain::payout::PayoutSummary;
use crate::domain::ports::{ContractGatewayRef, Notification, NotifierRef};
use crate::error::{FlightError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPhase {
    Disabled,
    Monitoring,
    Retrying,
}

/// What a single monitoring pass ended with.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Monitoring is disabled, or nothing was owed.
    Idle,
    /// Eligible flights were parked until `confirm_payouts` is called.
    AwaitingConfirmation(usize),
    Paid(PayoutSummary),
    /// Every attempt failed; `attempts` counts the first try plus retries.
    Failed { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorStatus {
    pub phase: MonitorPhase,
    pub enabled: bool,
    pub is_processing: bool,
    pub queue_length: usize,
    pub retry_count: u32,
    pub failed_cycles: u64,
    pub total_processed: usize,
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct MonitorState {
    config: AutoPayConfig,
    queue: Vec<String>,
    awaiting_confirmation: BTreeSet<String>,
    is_processing: bool,
    retrying: bool,
    retry_count: u32,
    failed_cycles: u64,
    total_processed: usize,
    last_run: Option<DateTime<Utc>>,
    stop_sender: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl MonitorState {
    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn phase(&self) -> MonitorPhase {
        if self.retrying {
            MonitorPhase::Retrying
        } else if self.is_running() {
            MonitorPhase::Monitoring
        } else {
            MonitorPhase::Disabled
        }
    }
}

struct Inner {
    registry: Arc<FlightRegistry>,
    gateway: ContractGatewayRef,
    notifier: NotifierRef,
    state: Mutex<MonitorState>,
}

/// Periodically pays out eligible flights without manual intervention.
///
/// `start` spawns a tokio task that runs `run_cycle` every poll interval.
/// `stop` only prevents future ticks: a cycle already in flight runs to
/// completion, and queue and retry bookkeeping are left as they are.
///
/// Cloning yields another handle to the same monitor.
#[derive(Clone)]
pub struct AutoPayMonitor {
    inner: Arc<Inner>,
}

impl AutoPayMonitor {
    pub fn new(
        registry: Arc<FlightRegistry>,
        gateway: ContractGatewayRef,
        notifier: NotifierRef,
        config: AutoPayConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                gateway,
                notifier,
                state: Mutex::new(MonitorState {
                    config,
                    ..MonitorState::default()
                }),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> AutoPayConfig {
        self.lock().config.clone()
    }

    /// Replaces the configuration. A new poll interval takes effect on the
    /// next `start`.
    pub fn configure(&self, config: AutoPayConfig) -> Result<()> {
        config.validate()?;
        self.lock().config = config;
        info!("auto-pay configuration updated");
        Ok(())
    }

    /// Toggles the enabled flag. While disabled, ticks are skipped and
    /// `run_cycle` returns `Idle`.
    pub fn set_enabled(&self, enabled: bool) {
        self.lock().config.enabled = enabled;
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_running()
    }

    /// Enables auto-pay and spawns the polling task.
    pub fn start(&self) -> Result<()> {
        let mut state = self.lock();
        if state.is_running() {
            return Err(FlightError::AlreadyRunning);
        }
        state.config.enabled = true;

        let (stop_sender, mut stop_receiver) = watch::channel(false);
        let period = state.config.poll_interval();
        let monitor = self.clone();
        let task = tokio::spawn(async move {
            let mut tick = interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = stop_receiver.changed() => break,
                    _ = tick.tick() => {
                        let outcome = monitor.run_cycle().await;
                        debug!(?outcome, "auto-pay tick");
                    }
                }
            }
            debug!("auto-pay task exited");
        });

        state.stop_sender = Some(stop_sender);
        state.task = Some(task);
        info!(interval_ms = period.as_millis() as u64, "auto-pay monitoring started");
        Ok(())
    }

    /// Disables auto-pay and prevents future ticks.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let mut state = self.lock();
        state.config.enabled = false;
        if let Some(stop_sender) = state.stop_sender.take() {
            let _ = stop_sender.send(true);
            info!("auto-pay monitoring stopped");
        }
        state.task.take()
    }

    /// Stops the monitor and waits for an in-flight cycle to finish.
    pub async fn shutdown(&self) {
        if let Some(task) = self.stop() {
            let _ = task.await;
        }
    }

    pub fn clear_retries(&self) {
        self.lock().retry_count = 0;
    }

    /// Flight numbers currently being evaluated.
    pub fn queue(&self) -> Vec<String> {
        self.lock().queue.clone()
    }

    pub fn awaiting_confirmation(&self) -> Vec<String> {
        self.lock().awaiting_confirmation.iter().cloned().collect()
    }

    pub fn status(&self) -> MonitorStatus {
        let state = self.lock();
        MonitorStatus {
            phase: state.phase(),
            enabled: state.config.enabled,
            is_processing: state.is_processing,
            queue_length: state.queue.len(),
            retry_count: state.retry_count,
            failed_cycles: state.failed_cycles,
            total_processed: state.total_processed,
            last_run: state.last_run,
        }
    }

    /// Runs one monitoring pass, retrying the whole pass on failure.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let config = {
            let mut state = self.lock();
            if !state.config.enabled {
                return CycleOutcome::Idle;
            }
            state.is_processing = true;
            state.last_run = Some(Utc::now());
            state.config.clone()
        };

        let outcome = self.cycle_with_retries(&config).await;

        let mut state = self.lock();
        state.is_processing = false;
        state.retrying = false;
        outcome
    }

    async fn cycle_with_retries(&self, config: &AutoPayConfig) -> CycleOutcome {
        let max_retries = config.retry_settings.max_retries;
        let mut retries = 0;
        loop {
            match self.attempt(config).await {
                Ok(outcome) => return outcome,
                Err(error) if retries < max_retries => {
                    retries += 1;
                    {
                        let mut state = self.lock();
                        state.retrying = true;
                        state.retry_count += 1;
                    }
                    warn!(
                        retry = retries,
                        max_retries,
                        %error,
                        "auto-pay attempt failed, retrying"
                    );
                    sleep(config.retry_settings.retry_delay()).await;
                }
                Err(error) => {
                    let attempts = retries + 1;
                    self.lock().failed_cycles += 1;
                    warn!(attempts, %error, "auto-pay cycle gave up");
                    self.notify(
                        config,
                        &Notification::CycleFailed {
                            attempts,
                            error: error.to_string(),
                        },
                    );
                    return CycleOutcome::Failed { attempts };
                }
            }
        }
    }

    async fn attempt(&self, config: &AutoPayConfig) -> Result<CycleOutcome> {
        let rules = config.rules();
        let pending: Vec<String> = self
            .inner
            .registry
            .flights_eligible_for_payout(rules.threshold_minutes)
            .await?
            .into_iter()
            .filter(|flight| flight.payable(rules.max_payouts_per_flight) > 0)
            .map(|flight| flight.flight_number)
            .collect();

        self.lock().queue = pending.clone();
        if pending.is_empty() {
            return Ok(CycleOutcome::Idle);
        }

        if config.require_confirmation {
            let (parked, newly_parked) = {
                let mut state = self.lock();
                let newly_parked: Vec<String> = pending
                    .iter()
                    .filter(|flight| state.awaiting_confirmation.insert((*flight).clone()))
                    .cloned()
                    .collect();
                (state.awaiting_confirmation.len(), newly_parked)
            };
            if !newly_parked.is_empty() {
                self.notify(
                    config,
                    &Notification::AwaitingConfirmation {
                        flights: newly_parked,
                    },
                );
            }
            return Ok(CycleOutcome::AwaitingConfirmation(parked));
        }

        if self.inner.gateway.is_paused().await? {
            return Err(FlightError::ContractPaused);
        }
        let summary = self.inner.registry.process_payouts(&rules).await?;
        self.settle(&summary).await;

        {
            let mut state = self.lock();
            state.queue.clear();
            state.total_processed += summary.processed;
        }
        self.notify_paid(config, &summary);
        Ok(CycleOutcome::Paid(summary))
    }

    /// Pays out a flight that was parked awaiting confirmation.
    pub async fn confirm_payouts(&self, flight_number: &str) -> Result<PayoutSummary> {
        let config = self.config();
        if self.inner.gateway.is_paused().await? {
            return Err(FlightError::ContractPaused);
        }
        let summary = self
            .inner
            .registry
            .trigger_payouts_with(flight_number, &config.rules())
            .await?;
        self.settle(&summary).await;

        {
            let mut state = self.lock();
            let key = flight_key(flight_number);
            state.awaiting_confirmation.remove(&key);
            state.queue.retain(|queued| *queued != key);
            state.total_processed += summary.processed;
        }
        self.notify_paid(&config, &summary);
        Ok(summary)
    }

    /// Settles processed payouts on the contract. A failed settlement is
    /// logged; the passenger stays paid.
    async fn settle(&self, summary: &PayoutSummary) {
        for payout in &summary.details {
            if let Err(error) = self.inner.gateway.settle_payout(payout).await {
                warn!(
                    flight = %payout.flight_number,
                    pnr = %payout.pnr,
                    %error,
                    "payout settlement failed"
                );
            }
        }
    }

    fn notify_paid(&self, config: &AutoPayConfig, summary: &PayoutSummary) {
        if summary.is_empty() {
            return;
        }
        self.notify(
            config,
            &Notification::PayoutsProcessed {
                processed: summary.processed,
                total_amount: summary.total_amount,
            },
        );
    }

    fn notify(&self, config: &AutoPayConfig, notification: &Notification) {
        for channel in config.notification_settings.channels() {
            self.inner.notifier.notify(channel, notification);
        }
    }
}
