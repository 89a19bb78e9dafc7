//! Async dispatch loop connecting the scheduler to executors.
//!
//! Admissions are handed to the [`WorkExecutor`] on spawned tasks; each
//! executor reports exactly one [`UnitOutcome`] back over an unbounded channel,
//! and a single loop applies outcomes to the scheduler. Progress pings travel
//! over the same channel and reset the unit's idle clock.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::core::{
    Admission, LaunchOutcome, LaunchTask, OrchestratorError, OrchestratorResult, Scheduler, Spawn,
    SplitAnalyzer, StatusSummary, TransitionReport, UnitId, UnitOutcome, WorkExecutor,
};

/// Message from an executor task to the dispatch loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitEvent {
    /// The single outcome of one admission.
    Outcome {
        /// Unit the outcome is for.
        unit_id: UnitId,
        /// Admission ticket the executor was started with.
        ticket: u64,
        /// What happened.
        outcome: UnitOutcome,
    },
    /// The unit is still making progress.
    Progress {
        /// Unit reporting progress.
        unit_id: UnitId,
    },
}

/// Drives admitted units through an executor.
pub struct Dispatcher<E, S> {
    scheduler: Arc<Scheduler>,
    executor: E,
    spawner: S,
    analyzer: Option<Arc<dyn SplitAnalyzer>>,
    events: UnboundedSender<UnitEvent>,
}

impl<E, S> Dispatcher<E, S>
where
    E: WorkExecutor,
    S: Spawn,
{
    /// Create a dispatcher and the receiving end of its event channel.
    pub fn new(
        scheduler: Arc<Scheduler>,
        executor: E,
        spawner: S,
    ) -> (Self, UnboundedReceiver<UnitEvent>) {
        let (events, rx) = unbounded_channel();
        (
            Self {
                scheduler,
                executor,
                spawner,
                analyzer: None,
                events,
            },
            rx,
        )
    }

    /// Split units the budget gate refuses, using `analyzer`.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn SplitAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    /// Scheduler being driven.
    #[must_use]
    pub const fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    /// Sender for progress pings from executors.
    #[must_use]
    pub fn events(&self) -> UnboundedSender<UnitEvent> {
        self.events.clone()
    }

    /// Request a launch and start the executor if the unit was admitted.
    ///
    /// When the budget gate refuses the unit and an analyzer is configured, the
    /// analyzer's plan is applied before returning; the replacement units are
    /// left `Pending` for the caller to launch.
    pub async fn launch(
        &self,
        unit_id: &str,
        task: LaunchTask,
        priority: i32,
    ) -> OrchestratorResult<LaunchOutcome> {
        let outcome = self.scheduler.request_launch(unit_id, task, priority)?;
        match &outcome {
            LaunchOutcome::Admitted(admission) => self.dispatch(admission.clone()),
            LaunchOutcome::SplitRequired(decision) => {
                if let Some(analyzer) = &self.analyzer {
                    let unit = self
                        .scheduler
                        .unit(unit_id)
                        .ok_or_else(|| OrchestratorError::UnknownUnit(unit_id.to_string()))?;
                    let plan = analyzer.plan_split(&unit, decision).await?;
                    let replaced_by = self.scheduler.apply_split(plan)?;
                    tracing::info!(
                        "split refused unit {} into {} units",
                        unit_id,
                        replaced_by.len()
                    );
                }
            }
            LaunchOutcome::Queued { .. } | LaunchOutcome::BlockedOnDependencies { .. } => {}
        }
        Ok(outcome)
    }

    /// Start the executor for an admission.
    pub fn dispatch(&self, admission: Admission) {
        let executor = self.executor.clone();
        let events = self.events.clone();
        let Admission {
            unit,
            task,
            resume,
            ticket,
        } = admission;
        tracing::debug!("dispatching unit {} (ticket {})", unit.id, ticket);
        self.spawner.spawn(async move {
            let unit_id = unit.id.clone();
            let outcome = executor.execute(unit, task, resume).await;
            let event = UnitEvent::Outcome {
                unit_id,
                ticket,
                outcome,
            };
            if let Err(e) = events.send(event) {
                tracing::warn!("dispatch loop gone, dropping outcome: {:?}", e.0);
            }
        });
    }

    /// Apply one event and dispatch anything it promoted.
    pub fn handle_event(&self, event: UnitEvent) -> OrchestratorResult<Option<TransitionReport>> {
        match event {
            UnitEvent::Progress { unit_id } => {
                if let Err(e) = self.scheduler.record_progress(&unit_id) {
                    tracing::debug!("ignoring progress for {}: {}", unit_id, e);
                }
                Ok(None)
            }
            UnitEvent::Outcome {
                unit_id,
                ticket,
                outcome,
            } => {
                let report = self.scheduler.apply_outcome(&unit_id, ticket, outcome)?;
                if let Some(report) = &report {
                    self.dispatch_all(&report.promoted);
                }
                Ok(report)
            }
        }
    }

    /// Expire idle units now and dispatch whatever took their slots.
    pub fn expire_idle(&self) -> OrchestratorResult<Vec<TransitionReport>> {
        let reports = self.scheduler.expire_idle(Instant::now())?;
        for report in &reports {
            self.dispatch_all(&report.promoted);
        }
        Ok(reports)
    }

    /// Process events and idle expiry until `shutdown` resolves.
    pub async fn run<F>(&self, mut events: UnboundedReceiver<UnitEvent>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(idle_check_interval(
            self.scheduler.limits().idle_timeout,
        ));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                Some(event) = events.recv() => {
                    if let Err(e) = self.handle_event(event) {
                        tracing::error!("failed to apply unit event: {}", e);
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.expire_idle() {
                        tracing::error!("idle expiry failed: {}", e);
                    }
                }
            }
        }
        tracing::info!("dispatcher stopped");
    }

    /// Process events until nothing is running, then return the final summary.
    pub async fn run_until_idle(&self, events: &mut UnboundedReceiver<UnitEvent>) -> StatusSummary {
        while self.scheduler.active_count() > 0 {
            let Some(event) = events.recv().await else {
                break;
            };
            if let Err(e) = self.handle_event(event) {
                tracing::error!("failed to apply unit event: {}", e);
            }
        }
        self.scheduler.status_summary()
    }

    fn dispatch_all(&self, admissions: &[Admission]) {
        for admission in admissions {
            self.dispatch(admission.clone());
        }
    }
}

fn idle_check_interval(idle_timeout: Duration) -> Duration {
    (idle_timeout / 4).clamp(Duration::from_millis(10), Duration::from_secs(30))
}
