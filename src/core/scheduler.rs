//! Admission control over work units.
//!
//! Every mutation of scheduler state (unit statuses, the running set, the
//! admission queue, the graph, and budget thresholds) happens under one
//! `parking_lot::Mutex`, so admissions and completions form a single
//! sequentially consistent stream of transitions. Executors run outside the
//! lock and report back through [`Scheduler::on_unit_completed`],
//! [`Scheduler::on_unit_failed`], and [`Scheduler::on_unit_suspended`].
//!
//! ```text
//! Pending -> Queued -> Running -> Complete
//!                         |-> Checkpointed -> (request_launch) -> Queued
//!                         '-> Failed -> Queued (retry) | Failed (terminal)
//! ```

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::audit::{build_audit_event, AuditAction, AuditSink};
use crate::core::budget::{BudgetAction, BudgetDecision, BudgetThresholds, BudgetTier, BudgetTracker};
use crate::core::checkpoint::{
    generate_resume_context, Checkpoint, CheckpointData, CheckpointStore, ResumeContext,
};
use crate::core::error::{OrchestratorError, OrchestratorResult};
use crate::core::executor::UnitOutcome;
use crate::core::graph::{DependencyGraph, LevelViolation, SplitPlan};
use crate::core::queue::AdmissionQueue;
use crate::core::registry::RegistryStore;
use crate::core::unit::{LaunchTask, UnitId, UnitStatus, WorkUnit};

/// Configuration values for admission control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerLimits {
    /// Maximum units running at once.
    pub concurrency_limit: usize,
    /// Automatic retries before a failure becomes terminal.
    pub max_retries: u32,
    /// A running unit with no progress for this long is expired.
    pub idle_timeout: Duration,
}

impl Default for SchedulerLimits {
    fn default() -> Self {
        Self {
            concurrency_limit: 3,
            max_retries: 2,
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl SchedulerLimits {
    /// Reject limits the scheduler cannot operate with.
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.concurrency_limit == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "concurrency_limit must be greater than 0".into(),
            ));
        }
        if self.idle_timeout.is_zero() {
            return Err(OrchestratorError::InvalidConfig(
                "idle_timeout must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// A unit moved into the running set, ready to hand to an executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Unit snapshot at admission.
    pub unit: WorkUnit,
    /// Task to execute.
    pub task: LaunchTask,
    /// Progress from the latest checkpoint, if any.
    pub resume: Option<ResumeContext>,
    /// Identifies this admission; outcomes from older admissions are stale.
    pub ticket: u64,
}

/// Result of a launch request. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The unit is running now.
    Admitted(Admission),
    /// Capacity is full; the unit waits at this zero-based position.
    Queued {
        /// Position in admission order.
        position: usize,
    },
    /// Dependencies are not complete; the unit stays pending.
    BlockedOnDependencies {
        /// Dependencies still outstanding.
        unmet: Vec<UnitId>,
    },
    /// The budget gate refused the launch; the unit must be split first.
    SplitRequired(BudgetDecision),
}

/// Result of applying an executor outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    /// Unit the outcome was for.
    pub unit_id: UnitId,
    /// Status of that unit after the transition and any promotion.
    pub status: UnitStatus,
    /// Queued units admitted into the freed capacity.
    pub promoted: Vec<Admission>,
}

/// Point-in-time view of every unit, taken under one lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    /// Running units.
    pub active: Vec<UnitId>,
    /// Queued units in admission order.
    pub queued: Vec<UnitId>,
    /// Completed units.
    pub completed: Vec<UnitId>,
    /// Terminally failed units.
    pub failed: Vec<UnitId>,
    /// Pending units.
    pub pending: Vec<UnitId>,
    /// Suspended units waiting to be relaunched.
    pub checkpointed: Vec<UnitId>,
    /// Configured concurrency limit.
    pub concurrency_limit: usize,
}

/// Budget and progress details for one unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    /// Unit snapshot.
    pub unit: WorkUnit,
    /// Tier of the declared size.
    pub tier: BudgetTier,
    /// Recommended action for that tier.
    pub action: BudgetAction,
    /// Whether the size is past the emergency threshold.
    pub emergency: bool,
    /// Latest checkpoint iteration, 0 if none.
    pub latest_iteration: u32,
    /// Dependencies not yet complete.
    pub unmet_dependencies: Vec<UnitId>,
}

struct RunningUnit {
    task: LaunchTask,
    ticket: u64,
    last_progress: Instant,
}

struct SchedulerState {
    limits: SchedulerLimits,
    graph: DependencyGraph,
    budget: BudgetTracker,
    queue: AdmissionQueue,
    running: BTreeMap<UnitId, RunningUnit>,
    next_ticket: u64,
    checkpoints: Box<dyn CheckpointStore>,
    registry: Box<dyn RegistryStore>,
    audit: Option<Box<dyn AuditSink>>,
}

impl SchedulerState {
    fn record(&mut self, unit_id: &str, action: AuditAction, detail: Option<String>) {
        if let Some(sink) = self.audit.as_mut() {
            sink.record(build_audit_event(unit_id, action, detail));
        }
    }

    fn persist(&mut self) {
        let records = self.graph.records();
        if let Err(e) = self.registry.flush(&records) {
            tracing::error!("failed to flush unit registry: {}", e);
        }
    }

    fn set_status(&mut self, unit_id: &str, status: UnitStatus) -> OrchestratorResult<()> {
        self.graph.unit_mut(unit_id)?.status = status;
        Ok(())
    }

    fn expect_running(&self, unit_id: &str, to: UnitStatus) -> OrchestratorResult<()> {
        let unit = self
            .graph
            .unit(unit_id)
            .ok_or_else(|| OrchestratorError::UnknownUnit(unit_id.to_string()))?;
        if unit.status != UnitStatus::Running || !self.running.contains_key(unit_id) {
            return Err(OrchestratorError::InvalidTransition {
                unit_id: unit_id.to_string(),
                from: unit.status,
                to,
            });
        }
        Ok(())
    }

    fn admit(&mut self, unit_id: &str, task: LaunchTask) -> OrchestratorResult<Admission> {
        let resume = self
            .checkpoints
            .load_latest(unit_id)?
            .map(|c| generate_resume_context(&c));
        let ticket = self.next_ticket;
        let unit = self.graph.unit_mut(unit_id)?;
        unit.status = UnitStatus::Running;
        let unit = unit.clone();
        self.next_ticket += 1;
        self.running.insert(
            unit_id.to_string(),
            RunningUnit {
                task: task.clone(),
                ticket,
                last_progress: Instant::now(),
            },
        );
        Ok(Admission {
            unit,
            task,
            resume,
            ticket,
        })
    }

    fn demote(&mut self, unit_id: &str, action: AuditAction, detail: String) {
        if let Ok(unit) = self.graph.unit_mut(unit_id) {
            unit.status = UnitStatus::Pending;
        }
        tracing::warn!("queued unit {} no longer eligible: {}", unit_id, detail);
        self.record(unit_id, action, Some(detail));
    }

    /// Fill free capacity from the queue, skipping entries that stopped being eligible.
    fn promote(&mut self) -> Vec<Admission> {
        let mut promoted = Vec::new();
        while self.running.len() < self.limits.concurrency_limit {
            let Some(next) = self.queue.pop() else {
                break;
            };
            let Some((status, size)) = self
                .graph
                .unit(&next.unit_id)
                .map(|u| (u.status, u.declared_size))
            else {
                tracing::debug!("dropping queued launch for removed unit {}", next.unit_id);
                continue;
            };
            if status != UnitStatus::Queued {
                tracing::debug!("dropping stale queue entry for {} ({})", next.unit_id, status);
                continue;
            }

            let unmet = self
                .graph
                .unmet_dependencies(&next.unit_id)
                .unwrap_or_default();
            if !unmet.is_empty() {
                self.demote(
                    &next.unit_id,
                    AuditAction::Block,
                    format!("waiting on {}", unmet.join(", ")),
                );
                continue;
            }
            let decision = self.budget.check(size, next.task.estimated_cost);
            if let Some(reason) = decision.refusal() {
                self.demote(&next.unit_id, AuditAction::SplitRequired, reason);
                continue;
            }

            let unit_id = next.unit_id.clone();
            match self.admit(&unit_id, next.task.clone()) {
                Ok(admission) => {
                    tracing::info!(
                        "promoted unit {} ({}/{} active)",
                        unit_id,
                        self.running.len(),
                        self.limits.concurrency_limit
                    );
                    self.record(&unit_id, AuditAction::Promote, None);
                    promoted.push(admission);
                }
                Err(e) => {
                    tracing::error!("failed to promote unit {}: {}", unit_id, e);
                    self.queue.requeue(next);
                    break;
                }
            }
        }
        promoted
    }

    /// Apply a graph edit that takes `unit_id` out of the live set.
    ///
    /// A queued launch is withdrawn first and put back in its original slot
    /// if the edit is refused.
    fn retire<T>(
        &mut self,
        unit_id: &str,
        edit: impl FnOnce(&mut DependencyGraph) -> OrchestratorResult<T>,
    ) -> OrchestratorResult<T> {
        let withdrawn = self.queue.remove(unit_id);
        if withdrawn.is_some() {
            self.set_status(unit_id, UnitStatus::Pending)?;
        }
        match edit(&mut self.graph) {
            Ok(value) => {
                if withdrawn.is_some() {
                    tracing::info!("withdrew queued launch for unit {}", unit_id);
                }
                Ok(value)
            }
            Err(e) => {
                if let Some(launch) = withdrawn {
                    self.set_status(unit_id, UnitStatus::Queued)?;
                    self.queue.requeue(launch);
                }
                Err(e)
            }
        }
    }

    fn report(&self, unit_id: &str, fallback: UnitStatus, promoted: Vec<Admission>) -> TransitionReport {
        TransitionReport {
            unit_id: unit_id.to_string(),
            status: self.graph.unit(unit_id).map_or(fallback, |u| u.status),
            promoted,
        }
    }

    fn suspend_running(
        &mut self,
        unit_id: &str,
        data: CheckpointData,
    ) -> OrchestratorResult<TransitionReport> {
        self.expect_running(unit_id, UnitStatus::Checkpointed)?;
        let iteration = self.checkpoints.latest_iteration(unit_id)? + 1;
        let checkpoint = Checkpoint::from_data(unit_id, iteration, data);
        let remaining = checkpoint.remaining_tasks.len();
        self.checkpoints.save(checkpoint)?;

        self.running.remove(unit_id);
        self.set_status(unit_id, UnitStatus::Checkpointed)?;
        tracing::info!(
            "unit {} suspended at iteration {} ({} tasks remaining)",
            unit_id,
            iteration,
            remaining
        );
        self.record(
            unit_id,
            AuditAction::Suspend,
            Some(format!("iteration {iteration}, {remaining} tasks remaining")),
        );
        let promoted = self.promote();
        self.persist();
        Ok(self.report(unit_id, UnitStatus::Checkpointed, promoted))
    }

    fn complete_running(&mut self, unit_id: &str) -> OrchestratorResult<TransitionReport> {
        self.expect_running(unit_id, UnitStatus::Complete)?;
        self.running.remove(unit_id);
        self.set_status(unit_id, UnitStatus::Complete)?;
        if let Err(e) = self.checkpoints.delete_all(unit_id) {
            tracing::error!("failed to delete checkpoints for completed unit {}: {}", unit_id, e);
        }
        tracing::info!("unit {} complete", unit_id);
        self.record(unit_id, AuditAction::Complete, None);
        let promoted = self.promote();
        self.persist();
        Ok(self.report(unit_id, UnitStatus::Complete, promoted))
    }

    fn fail_running(&mut self, unit_id: &str, reason: &str) -> OrchestratorResult<TransitionReport> {
        self.expect_running(unit_id, UnitStatus::Failed)?;
        let running = self
            .running
            .remove(unit_id)
            .ok_or_else(|| OrchestratorError::UnknownUnit(unit_id.to_string()))?;
        let max_retries = self.limits.max_retries;
        let unit = self.graph.unit_mut(unit_id)?;

        let status = if unit.retry_count < max_retries {
            unit.retry_count += 1;
            unit.status = UnitStatus::Queued;
            let (attempt, priority) = (unit.retry_count, unit.priority);
            self.queue.enqueue(unit_id, running.task, priority);
            tracing::warn!(
                "unit {} failed ({}), retry {}/{}",
                unit_id,
                reason,
                attempt,
                max_retries
            );
            self.record(
                unit_id,
                AuditAction::Retry,
                Some(format!("attempt {attempt}: {reason}")),
            );
            UnitStatus::Queued
        } else {
            unit.status = UnitStatus::Failed;
            tracing::error!(
                "unit {} failed permanently after {} retries: {}",
                unit_id,
                max_retries,
                reason
            );
            self.record(unit_id, AuditAction::Fail, Some(reason.to_string()));
            UnitStatus::Failed
        };

        let promoted = self.promote();
        self.persist();
        Ok(self.report(unit_id, status, promoted))
    }
}

/// Single-writer admission controller.
pub struct Scheduler {
    state: Mutex<SchedulerState>,
}

impl Scheduler {
    /// Create a scheduler with an empty graph.
    pub fn new(
        limits: SchedulerLimits,
        budget: BudgetTracker,
        checkpoints: Box<dyn CheckpointStore>,
        registry: Box<dyn RegistryStore>,
    ) -> OrchestratorResult<Self> {
        limits.validate()?;
        Ok(Self {
            state: Mutex::new(SchedulerState {
                limits,
                graph: DependencyGraph::new(),
                budget,
                queue: AdmissionQueue::new(),
                running: BTreeMap::new(),
                next_ticket: 1,
                checkpoints,
                registry,
                audit: None,
            }),
        })
    }

    /// Rebuild a scheduler from the persisted registry.
    ///
    /// No executor survives a restart, so units persisted as `Running` or
    /// `Queued` come back as `Checkpointed` when a checkpoint exists and as
    /// `Pending` otherwise. Structural problems are logged, not repaired;
    /// [`Scheduler::preflight`] reports them.
    pub fn restore(
        limits: SchedulerLimits,
        budget: BudgetTracker,
        checkpoints: Box<dyn CheckpointStore>,
        registry: Box<dyn RegistryStore>,
    ) -> OrchestratorResult<Self> {
        let mut units = registry.load()?;
        let mut interrupted = 0;
        for unit in &mut units {
            if !unit.archived && unit.status.is_active() {
                unit.status = if checkpoints.latest_iteration(&unit.id)? > 0 {
                    UnitStatus::Checkpointed
                } else {
                    UnitStatus::Pending
                };
                interrupted += 1;
            }
        }
        let graph = DependencyGraph::from_units(units)?;
        if let Err(e) = graph.validate() {
            tracing::warn!("restored registry needs operator attention: {}", e);
        }
        tracing::info!(
            "restored {} units from registry ({} interrupted)",
            graph.len(),
            interrupted
        );

        let scheduler = Self::new(limits, budget, checkpoints, registry)?;
        {
            let mut state = scheduler.state.lock();
            state.graph = graph;
            state.persist();
        }
        Ok(scheduler)
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Box<dyn AuditSink>) -> Self {
        self.state.get_mut().audit = Some(audit);
        self
    }

    /// Configured limits.
    pub fn limits(&self) -> SchedulerLimits {
        self.state.lock().limits.clone()
    }

    /// Copy of the current budget tracker.
    pub fn budget(&self) -> BudgetTracker {
        self.state.lock().budget.clone()
    }

    /// Declare a unit. Only `Pending` and `Complete` units may be declared.
    pub fn add_unit(&self, unit: WorkUnit) -> OrchestratorResult<()> {
        if !matches!(unit.status, UnitStatus::Pending | UnitStatus::Complete) {
            return Err(OrchestratorError::InvalidTransition {
                unit_id: unit.id,
                from: unit.status,
                to: UnitStatus::Pending,
            });
        }
        let mut state = self.state.lock();
        let unit_id = unit.id.clone();
        state.graph.add_unit(unit)?;
        state.record(&unit_id, AuditAction::Register, None);
        tracing::info!("registered unit {}", unit_id);
        state.persist();
        Ok(())
    }

    /// Declare that `from` depends on `to`.
    pub fn add_edge(&self, from: &str, to: &str) -> OrchestratorResult<()> {
        let mut state = self.state.lock();
        state.graph.add_edge(from, to)?;
        tracing::debug!("added dependency {} -> {}", from, to);
        state.persist();
        Ok(())
    }

    /// Record a re-measured size and return its tier.
    pub fn update_size(&self, unit_id: &str, size: u64) -> OrchestratorResult<BudgetTier> {
        let mut state = self.state.lock();
        let unit = state.graph.unit_mut(unit_id)?;
        unit.declared_size = size;
        let status = unit.status;
        let tier = state.budget.classify(size);
        if status == UnitStatus::Running && state.budget.is_emergency(size) {
            tracing::warn!(
                "running unit {} reached emergency size {} (threshold {}); it should suspend",
                unit_id,
                size,
                state.budget.thresholds().emergency
            );
        }
        state.persist();
        Ok(tier)
    }

    /// Replace the budget thresholds. Serialized with admission decisions.
    pub fn set_thresholds(&self, thresholds: BudgetThresholds) -> OrchestratorResult<()> {
        self.state.lock().budget.set_thresholds(thresholds)
    }

    /// Ask for `unit_id` to run `task` at `priority`.
    ///
    /// Gates, in order: dependencies complete, budget (projection under the hard
    /// limit and the size below the red tier), free capacity. Only `Pending` and `Checkpointed` units may be
    /// launched.
    pub fn request_launch(
        &self,
        unit_id: &str,
        task: LaunchTask,
        priority: i32,
    ) -> OrchestratorResult<LaunchOutcome> {
        let mut state = self.state.lock();
        let (status, size) = state
            .graph
            .unit(unit_id)
            .map(|u| (u.status, u.declared_size))
            .ok_or_else(|| OrchestratorError::UnknownUnit(unit_id.to_string()))?;
        if !matches!(status, UnitStatus::Pending | UnitStatus::Checkpointed) {
            return Err(OrchestratorError::InvalidTransition {
                unit_id: unit_id.to_string(),
                from: status,
                to: UnitStatus::Queued,
            });
        }
        state.graph.unit_mut(unit_id)?.priority = priority;

        let unmet = state.graph.unmet_dependencies(unit_id)?;
        if !unmet.is_empty() {
            state.set_status(unit_id, UnitStatus::Pending)?;
            let waiting = unmet.join(", ");
            tracing::info!("unit {} blocked on dependencies: {}", unit_id, waiting);
            state.record(unit_id, AuditAction::Block, Some(format!("waiting on {waiting}")));
            state.persist();
            return Ok(LaunchOutcome::BlockedOnDependencies { unmet });
        }

        let decision = state.budget.check(size, task.estimated_cost);
        if let Some(reason) = decision.refusal() {
            tracing::warn!(
                "unit {} refused: {} ({} tier, {:?})",
                unit_id,
                reason,
                decision.tier,
                decision.action
            );
            state.record(unit_id, AuditAction::SplitRequired, Some(reason));
            return Ok(LaunchOutcome::SplitRequired(decision));
        }
        if decision.tier > BudgetTier::Green {
            tracing::warn!(
                "unit {} launched in {} tier, recommended action {:?}",
                unit_id,
                decision.tier,
                decision.action
            );
        }

        if state.running.len() >= state.limits.concurrency_limit {
            state.set_status(unit_id, UnitStatus::Queued)?;
            state.queue.enqueue(unit_id, task, priority);
            let position = state.queue.position(unit_id).unwrap_or_default();
            tracing::info!("unit {} queued at position {}", unit_id, position);
            state.record(
                unit_id,
                AuditAction::Enqueue,
                Some(format!("position {position}")),
            );
            state.persist();
            return Ok(LaunchOutcome::Queued { position });
        }

        let admission = state.admit(unit_id, task)?;
        tracing::info!(
            "unit {} admitted ({}/{} active)",
            unit_id,
            state.running.len(),
            state.limits.concurrency_limit
        );
        state.record(unit_id, AuditAction::Admit, None);
        state.persist();
        Ok(LaunchOutcome::Admitted(admission))
    }

    /// A running unit stopped early: checkpoint it, free its slot, promote.
    ///
    /// The checkpoint is saved before any transition, so a storage failure
    /// leaves the unit `Running`.
    pub fn on_unit_suspended(
        &self,
        unit_id: &str,
        data: CheckpointData,
    ) -> OrchestratorResult<TransitionReport> {
        self.state.lock().suspend_running(unit_id, data)
    }

    /// A running unit finished: mark it complete, drop its checkpoints, promote.
    pub fn on_unit_completed(&self, unit_id: &str) -> OrchestratorResult<TransitionReport> {
        self.state.lock().complete_running(unit_id)
    }

    /// A running unit failed: retry it while the budget allows, else fail it for good.
    pub fn on_unit_failed(&self, unit_id: &str, reason: &str) -> OrchestratorResult<TransitionReport> {
        self.state.lock().fail_running(unit_id, reason)
    }

    /// Apply an executor outcome for the admission identified by `ticket`.
    ///
    /// Returns `Ok(None)` when the ticket is no longer current, e.g. the unit
    /// was expired and re-admitted while the executor was still running.
    pub fn apply_outcome(
        &self,
        unit_id: &str,
        ticket: u64,
        outcome: UnitOutcome,
    ) -> OrchestratorResult<Option<TransitionReport>> {
        let mut state = self.state.lock();
        if !state.running.get(unit_id).is_some_and(|r| r.ticket == ticket) {
            tracing::warn!("discarding stale outcome for unit {} (ticket {})", unit_id, ticket);
            return Ok(None);
        }
        let report = match outcome {
            UnitOutcome::Completed => state.complete_running(unit_id)?,
            UnitOutcome::Failed { reason } => state.fail_running(unit_id, &reason)?,
            UnitOutcome::Suspended { checkpoint } => state.suspend_running(unit_id, checkpoint)?,
        };
        Ok(Some(report))
    }

    /// Note that a running unit is still making progress.
    pub fn record_progress(&self, unit_id: &str) -> OrchestratorResult<()> {
        let mut state = self.state.lock();
        state.expect_running(unit_id, UnitStatus::Running)?;
        if let Some(running) = state.running.get_mut(unit_id) {
            running.last_progress = Instant::now();
        }
        Ok(())
    }

    /// Fail every running unit idle for longer than the configured timeout.
    pub fn expire_idle(&self, now: Instant) -> OrchestratorResult<Vec<TransitionReport>> {
        let mut state = self.state.lock();
        let timeout = state.limits.idle_timeout;
        let idle: Vec<UnitId> = state
            .running
            .iter()
            .filter(|(_, r)| now.saturating_duration_since(r.last_progress) > timeout)
            .map(|(id, _)| id.clone())
            .collect();

        let mut reports = Vec::with_capacity(idle.len());
        for unit_id in idle {
            tracing::warn!("unit {} idle for more than {:?}, expiring", unit_id, timeout);
            state.record(
                &unit_id,
                AuditAction::Expire,
                Some(format!("no progress for {timeout:?}")),
            );
            reports.push(state.fail_running(&unit_id, "idle timeout")?);
        }
        Ok(reports)
    }

    /// Whether `ticket` identifies the current admission of a running unit.
    pub fn is_current_ticket(&self, unit_id: &str, ticket: u64) -> bool {
        self.state
            .lock()
            .running
            .get(unit_id)
            .is_some_and(|r| r.ticket == ticket)
    }

    /// Consistent snapshot of every unit's state.
    pub fn status_summary(&self) -> StatusSummary {
        let state = self.state.lock();
        let mut summary = StatusSummary {
            active: state.running.keys().cloned().collect(),
            queued: state
                .queue
                .snapshot()
                .into_iter()
                .map(|l| l.unit_id)
                .filter(|id| {
                    state
                        .graph
                        .unit(id)
                        .is_some_and(|u| u.status == UnitStatus::Queued)
                })
                .collect(),
            concurrency_limit: state.limits.concurrency_limit,
            ..StatusSummary::default()
        };
        for unit in state.graph.units() {
            let bucket = match unit.status {
                UnitStatus::Complete => &mut summary.completed,
                UnitStatus::Failed => &mut summary.failed,
                UnitStatus::Pending => &mut summary.pending,
                UnitStatus::Checkpointed => &mut summary.checkpointed,
                UnitStatus::Queued | UnitStatus::Running => continue,
            };
            bucket.push(unit.id.clone());
        }
        summary
    }

    /// Number of running units.
    pub fn active_count(&self) -> usize {
        self.state.lock().running.len()
    }

    /// Snapshot of one unit.
    pub fn unit(&self, unit_id: &str) -> Option<WorkUnit> {
        self.state.lock().graph.unit(unit_id).cloned()
    }

    /// Deterministic dependency-first order of all units.
    pub fn build_order(&self) -> OrchestratorResult<Vec<UnitId>> {
        self.state.lock().graph.build_order()
    }

    /// Every dependency cycle.
    pub fn detect_cycles(&self) -> Vec<Vec<UnitId>> {
        self.state.lock().graph.detect_cycles()
    }

    /// Every edge violating level ordering.
    pub fn validate_levels(&self) -> Vec<LevelViolation> {
        self.state.lock().graph.validate_levels()
    }

    /// Surface structural graph errors before any scheduling.
    pub fn preflight(&self) -> OrchestratorResult<()> {
        self.state.lock().graph.validate()
    }

    /// Latest checkpoint for a unit.
    pub fn load_latest(&self, unit_id: &str) -> OrchestratorResult<Option<Checkpoint>> {
        self.state.lock().checkpoints.load_latest(unit_id)
    }

    /// Resume context from the latest checkpoint for a unit.
    pub fn resume_context(&self, unit_id: &str) -> OrchestratorResult<Option<ResumeContext>> {
        Ok(self
            .load_latest(unit_id)?
            .map(|c| generate_resume_context(&c)))
    }

    /// Recommended action for a unit's current size.
    pub fn recommend_action(&self, unit_id: &str) -> OrchestratorResult<BudgetAction> {
        let state = self.state.lock();
        let unit = state
            .graph
            .unit(unit_id)
            .ok_or_else(|| OrchestratorError::UnknownUnit(unit_id.to_string()))?;
        Ok(BudgetTracker::recommend_action(
            state.budget.classify(unit.declared_size),
        ))
    }

    /// Budget and progress details for one unit.
    pub fn unit_report(&self, unit_id: &str) -> OrchestratorResult<UnitReport> {
        let state = self.state.lock();
        let unit = state
            .graph
            .unit(unit_id)
            .cloned()
            .ok_or_else(|| OrchestratorError::UnknownUnit(unit_id.to_string()))?;
        let tier = state.budget.classify(unit.declared_size);
        Ok(UnitReport {
            tier,
            action: BudgetTracker::recommend_action(tier),
            emergency: state.budget.is_emergency(unit.declared_size),
            latest_iteration: state.checkpoints.latest_iteration(unit_id)?,
            unmet_dependencies: state.graph.unmet_dependencies(unit_id)?,
            unit,
        })
    }

    /// Pending or checkpointed units whose dependencies are all complete,
    /// by priority then id.
    pub fn launchable_units(&self) -> Vec<UnitId> {
        let state = self.state.lock();
        let mut ready: Vec<(i32, UnitId)> = state
            .graph
            .units()
            .filter(|u| matches!(u.status, UnitStatus::Pending | UnitStatus::Checkpointed))
            .filter(|u| state.graph.dependencies_satisfied(&u.id).unwrap_or(false))
            .map(|u| (u.priority, u.id.clone()))
            .collect();
        ready.sort();
        ready.into_iter().map(|(_, id)| id).collect()
    }

    /// Re-arm a terminally failed unit: back to `Pending` with its retries cleared.
    pub fn reset_failed(&self, unit_id: &str) -> OrchestratorResult<()> {
        let mut state = self.state.lock();
        let unit = state.graph.unit_mut(unit_id)?;
        if unit.status != UnitStatus::Failed {
            return Err(OrchestratorError::InvalidTransition {
                unit_id: unit_id.to_string(),
                from: unit.status,
                to: UnitStatus::Pending,
            });
        }
        unit.status = UnitStatus::Pending;
        unit.retry_count = 0;
        tracing::info!("unit {} reset by operator", unit_id);
        state.record(unit_id, AuditAction::Reset, None);
        state.persist();
        Ok(())
    }

    /// Remove a unit from scheduling; its id stays reserved.
    ///
    /// A queued launch is withdrawn. Refused with `UnitInUse` while the unit
    /// is running, and also while any live unit still depends on it: archiving
    /// never leaves a dependent pointing at an archived id. Use
    /// [`Scheduler::apply_split`] to replace a unit that has dependents.
    pub fn archive_unit(&self, unit_id: &str) -> OrchestratorResult<WorkUnit> {
        let mut state = self.state.lock();
        ensure_not_running(&state.graph, unit_id)?;
        let unit = state.retire(unit_id, |graph| graph.archive_unit(unit_id))?;
        tracing::info!("archived unit {}", unit_id);
        state.record(unit_id, AuditAction::Archive, None);
        state.persist();
        Ok(unit)
    }

    /// Atomically replace an oversized unit with a split plan's units.
    ///
    /// A queued launch of the original is withdrawn; a running original is
    /// refused with `UnitInUse`.
    pub fn apply_split(&self, plan: SplitPlan) -> OrchestratorResult<Vec<UnitId>> {
        let mut state = self.state.lock();
        ensure_not_running(&state.graph, &plan.original)?;
        let original = plan.original.clone();
        let new_ids = state.retire(&original, |graph| graph.apply_split(plan))?;
        let replaced_by = new_ids.join(", ");
        tracing::info!("split unit {} into {}", original, replaced_by);
        state.record(
            &original,
            AuditAction::Split,
            Some(format!("replaced by {replaced_by}")),
        );
        for id in &new_ids {
            state.record(id, AuditAction::Register, Some(format!("split from {original}")));
        }
        state.persist();
        Ok(new_ids)
    }

    /// Write the registry now, propagating storage errors.
    pub fn flush(&self) -> OrchestratorResult<()> {
        let mut state = self.state.lock();
        let records = state.graph.records();
        state.registry.flush(&records)
    }

    /// Flush state before the process exits. Running units are recovered by
    /// [`Scheduler::restore`] on the next start.
    pub fn shutdown(&self) -> OrchestratorResult<()> {
        tracing::info!(
            "scheduler shutting down with {} active units",
            self.active_count()
        );
        self.flush()
    }
}

fn ensure_not_running(graph: &DependencyGraph, unit_id: &str) -> OrchestratorResult<()> {
    let unit = graph
        .unit(unit_id)
        .ok_or_else(|| OrchestratorError::UnknownUnit(unit_id.to_string()))?;
    if unit.status == UnitStatus::Running {
        return Err(OrchestratorError::UnitInUse {
            unit_id: unit_id.to_string(),
            reason: "unit is running".into(),
        });
    }
    Ok(())
}
