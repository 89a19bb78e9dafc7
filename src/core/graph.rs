//! Dependency graph over work units.
//!
//! Edges point from a unit to the units it depends on. The graph never repairs
//! structural problems on its own: cycles and level violations are reported by
//! [`DependencyGraph::detect_cycles`] and [`DependencyGraph::validate_levels`] and
//! must be fixed by the operator.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{OrchestratorError, OrchestratorResult};
use crate::core::unit::{UnitId, UnitLevel, UnitStatus, WorkUnit};

/// An edge whose target sits on a higher level than its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelViolation {
    /// Dependent unit.
    pub from: UnitId,
    /// Level of the dependent unit.
    pub from_level: UnitLevel,
    /// Dependency unit.
    pub to: UnitId,
    /// Level of the dependency unit.
    pub to_level: UnitLevel,
}

impl fmt::Display for LevelViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} depends on {} at {}",
            self.from, self.from_level, self.to, self.to_level
        )
    }
}

/// Replacement of one oversized unit by several smaller ones, as produced by a split analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPlan {
    /// Unit being replaced.
    pub original: UnitId,
    /// New unit definitions. Dependencies among them are declared on each unit.
    pub units: Vec<WorkUnit>,
    /// For dependents of the original: which new units they should depend on instead.
    /// Dependents not listed here depend on every new unit.
    #[serde(default)]
    pub dependent_remap: BTreeMap<UnitId, BTreeSet<UnitId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Operator-authored units and their dependency edges.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    units: BTreeMap<UnitId, WorkUnit>,
    archived: BTreeMap<UnitId, WorkUnit>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load units as persisted, without level or cycle checks.
    ///
    /// Structural problems in persisted data are surfaced by the validation
    /// queries rather than rejected here. Duplicate ids and dangling
    /// dependencies are still refused.
    pub fn from_units(units: impl IntoIterator<Item = WorkUnit>) -> OrchestratorResult<Self> {
        let mut graph = Self::new();
        for unit in units {
            if graph.units.contains_key(&unit.id) || graph.archived.contains_key(&unit.id) {
                return Err(OrchestratorError::DuplicateUnit(unit.id));
            }
            if unit.archived {
                graph.archived.insert(unit.id.clone(), unit);
            } else {
                graph.units.insert(unit.id.clone(), unit);
            }
        }
        for unit in graph.units.values() {
            if let Some(missing) = unit
                .dependencies
                .iter()
                .find(|dep| !graph.units.contains_key(*dep))
            {
                return Err(OrchestratorError::UnknownUnit(missing.clone()));
            }
        }
        Ok(graph)
    }

    /// Add a unit together with its declared dependencies.
    pub fn add_unit(&mut self, mut unit: WorkUnit) -> OrchestratorResult<()> {
        unit.archived = false;
        if self.units.contains_key(&unit.id) || self.archived.contains_key(&unit.id) {
            return Err(OrchestratorError::DuplicateUnit(unit.id));
        }
        for dep in &unit.dependencies {
            self.check_edge(&unit.id, unit.level, dep)?;
        }
        self.units.insert(unit.id.clone(), unit);
        Ok(())
    }

    /// Declare that `from` depends on `to`.
    pub fn add_edge(&mut self, from: &str, to: &str) -> OrchestratorResult<()> {
        let from_level = self
            .units
            .get(from)
            .map(|unit| unit.level)
            .ok_or_else(|| OrchestratorError::UnknownUnit(from.to_string()))?;
        self.check_edge(from, from_level, to)?;
        if let Some(unit) = self.units.get_mut(from) {
            unit.dependencies.insert(to.to_string());
        }
        Ok(())
    }

    fn check_edge(&self, from: &str, from_level: UnitLevel, to: &str) -> OrchestratorResult<()> {
        let target = self
            .units
            .get(to)
            .ok_or_else(|| OrchestratorError::UnknownUnit(to.to_string()))?;
        if target.level > from_level {
            return Err(OrchestratorError::LevelViolation(LevelViolation {
                from: from.to_string(),
                from_level,
                to: to.to_string(),
                to_level: target.level,
            }));
        }
        Ok(())
    }

    /// Look up a live unit.
    #[must_use]
    pub fn unit(&self, id: &str) -> Option<&WorkUnit> {
        self.units.get(id)
    }

    pub(crate) fn unit_mut(&mut self, id: &str) -> OrchestratorResult<&mut WorkUnit> {
        self.units
            .get_mut(id)
            .ok_or_else(|| OrchestratorError::UnknownUnit(id.to_string()))
    }

    /// Look up a unit that was archived by removal or split.
    #[must_use]
    pub fn archived_unit(&self, id: &str) -> Option<&WorkUnit> {
        self.archived.get(id)
    }

    /// Every record worth persisting: live units, then archived ones.
    #[must_use]
    pub fn records(&self) -> Vec<WorkUnit> {
        self.units
            .values()
            .chain(self.archived.values())
            .cloned()
            .collect()
    }

    /// Live units in id order.
    pub fn units(&self) -> impl Iterator<Item = &WorkUnit> {
        self.units.values()
    }

    /// Whether a live unit carries this id.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.units.contains_key(id)
    }

    /// Number of live units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the graph has no live units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units that directly depend on `id`, in id order.
    #[must_use]
    pub fn dependents_of(&self, id: &str) -> Vec<UnitId> {
        self.units
            .values()
            .filter(|unit| unit.dependencies.contains(id))
            .map(|unit| unit.id.clone())
            .collect()
    }

    /// Dependencies of `id` that are not yet `Complete`.
    pub fn unmet_dependencies(&self, id: &str) -> OrchestratorResult<Vec<UnitId>> {
        let unit = self
            .units
            .get(id)
            .ok_or_else(|| OrchestratorError::UnknownUnit(id.to_string()))?;
        Ok(unit
            .dependencies
            .iter()
            .filter(|dep| {
                self.units
                    .get(*dep)
                    .is_none_or(|d| d.status != UnitStatus::Complete)
            })
            .cloned()
            .collect())
    }

    /// Whether every dependency of `id` is `Complete`.
    pub fn dependencies_satisfied(&self, id: &str) -> OrchestratorResult<bool> {
        Ok(self.unmet_dependencies(id)?.is_empty())
    }

    /// Every cycle reachable by depth-first search, one per back edge.
    ///
    /// Each cycle starts and ends with the same id and follows dependency edges,
    /// so `A -> B -> C -> A` means A depends on B, B on C, and C on A.
    #[must_use]
    pub fn detect_cycles(&self) -> Vec<Vec<UnitId>> {
        let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(self.units.len());
        let mut path: Vec<&str> = Vec::new();
        let mut cycles = Vec::new();
        for id in self.units.keys() {
            if !marks.contains_key(id.as_str()) {
                self.visit(id, &mut marks, &mut path, &mut cycles);
            }
        }
        cycles
    }

    fn visit<'a>(
        &'a self,
        id: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<UnitId>>,
    ) {
        marks.insert(id, Mark::Visiting);
        path.push(id);
        if let Some(unit) = self.units.get(id) {
            for dep in &unit.dependencies {
                match marks.get(dep.as_str()) {
                    Some(Mark::Visiting) => {
                        if let Some(start) = path.iter().position(|p| *p == dep.as_str()) {
                            let mut cycle: Vec<UnitId> =
                                path[start..].iter().map(|s| (*s).to_string()).collect();
                            cycle.push(dep.clone());
                            cycles.push(cycle);
                        }
                    }
                    Some(Mark::Done) => {}
                    None => {
                        if self.units.contains_key(dep) {
                            self.visit(dep, marks, path, cycles);
                        }
                    }
                }
            }
        }
        path.pop();
        marks.insert(id, Mark::Done);
    }

    /// Deterministic topological order, dependencies first.
    ///
    /// Kahn's algorithm; among ready units the lowest priority value wins, then the
    /// lexicographically smallest id. Fails with `CycleDetected` instead of
    /// returning a partial order.
    pub fn build_order(&self) -> OrchestratorResult<Vec<UnitId>> {
        let mut indegree: HashMap<&str, usize> = HashMap::with_capacity(self.units.len());
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for unit in self.units.values() {
            let mut count = 0;
            for dep in unit.dependencies.iter().filter(|d| self.units.contains_key(*d)) {
                dependents
                    .entry(dep.as_str())
                    .or_default()
                    .push(unit.id.as_str());
                count += 1;
            }
            indegree.insert(unit.id.as_str(), count);
        }

        let mut ready: BTreeSet<(i32, &str)> = self
            .units
            .values()
            .filter(|unit| indegree.get(unit.id.as_str()) == Some(&0))
            .map(|unit| (unit.priority, unit.id.as_str()))
            .collect();

        let mut order = Vec::with_capacity(self.units.len());
        while let Some((_, id)) = ready.pop_first() {
            order.push(id.to_string());
            let Some(children) = dependents.get(id) else {
                continue;
            };
            for child in children {
                if let Some(degree) = indegree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert((self.units[*child].priority, *child));
                    }
                }
            }
        }

        if order.len() < self.units.len() {
            return Err(OrchestratorError::CycleDetected(self.detect_cycles()));
        }
        Ok(order)
    }

    /// Every edge that points at a higher-level unit.
    #[must_use]
    pub fn validate_levels(&self) -> Vec<LevelViolation> {
        self.units
            .values()
            .flat_map(|unit| {
                unit.dependencies.iter().filter_map(move |dep| {
                    let target = self.units.get(dep)?;
                    (target.level > unit.level).then(|| LevelViolation {
                        from: unit.id.clone(),
                        from_level: unit.level,
                        to: target.id.clone(),
                        to_level: target.level,
                    })
                })
            })
            .collect()
    }

    /// Fail on the first structural problem: cycles, then level violations.
    pub fn validate(&self) -> OrchestratorResult<()> {
        let cycles = self.detect_cycles();
        if !cycles.is_empty() {
            return Err(OrchestratorError::CycleDetected(cycles));
        }
        if let Some(violation) = self.validate_levels().into_iter().next() {
            return Err(OrchestratorError::LevelViolation(violation));
        }
        Ok(())
    }

    /// Move a unit out of the live set. Refused while other units depend on it.
    pub fn archive_unit(&mut self, id: &str) -> OrchestratorResult<WorkUnit> {
        if !self.units.contains_key(id) {
            return Err(OrchestratorError::UnknownUnit(id.to_string()));
        }
        let dependents = self.dependents_of(id);
        if !dependents.is_empty() {
            return Err(OrchestratorError::UnitInUse {
                unit_id: id.to_string(),
                reason: format!("required by {}", dependents.join(", ")),
            });
        }
        let mut unit = self
            .units
            .remove(id)
            .ok_or_else(|| OrchestratorError::UnknownUnit(id.to_string()))?;
        unit.archived = true;
        self.archived.insert(unit.id.clone(), unit.clone());
        Ok(unit)
    }

    /// Atomically replace `plan.original` with the plan's units.
    ///
    /// The original is archived. Every new unit inherits the original's
    /// dependencies; dependents of the original are rewired onto the new units.
    /// The plan is applied to a copy first, so a rejected plan leaves the graph
    /// untouched. Returns the new unit ids.
    pub fn apply_split(&mut self, plan: SplitPlan) -> OrchestratorResult<Vec<UnitId>> {
        let original = self
            .units
            .get(&plan.original)
            .cloned()
            .ok_or_else(|| OrchestratorError::UnknownUnit(plan.original.clone()))?;
        if plan.units.is_empty() {
            return Err(OrchestratorError::InvalidSplitPlan(format!(
                "split of {} produced no units",
                plan.original
            )));
        }

        let new_ids: BTreeSet<UnitId> = plan.units.iter().map(|u| u.id.clone()).collect();
        if new_ids.len() != plan.units.len() {
            return Err(OrchestratorError::InvalidSplitPlan(
                "duplicate unit ids in plan".into(),
            ));
        }
        if let Some(taken) = new_ids
            .iter()
            .find(|id| self.units.contains_key(*id) || self.archived.contains_key(*id))
        {
            return Err(OrchestratorError::InvalidSplitPlan(format!(
                "unit {taken} already exists"
            )));
        }

        let dependents = self.dependents_of(&plan.original);
        for (dependent, targets) in &plan.dependent_remap {
            if !dependents.contains(dependent) {
                return Err(OrchestratorError::InvalidSplitPlan(format!(
                    "{dependent} does not depend on {}",
                    plan.original
                )));
            }
            if let Some(bad) = targets.iter().find(|t| !new_ids.contains(*t)) {
                return Err(OrchestratorError::InvalidSplitPlan(format!(
                    "remap target {bad} is not part of the plan"
                )));
            }
        }

        let mut candidate = self.clone();
        candidate.units.remove(&plan.original);
        let mut retired = original.clone();
        retired.archived = true;
        candidate.archived.insert(plan.original.clone(), retired);
        for mut unit in plan.units {
            unit.status = UnitStatus::Pending;
            unit.retry_count = 0;
            unit.archived = false;
            unit.dependencies
                .extend(original.dependencies.iter().cloned());
            candidate.units.insert(unit.id.clone(), unit);
        }
        for id in &new_ids {
            if let Some(missing) = candidate.units[id]
                .dependencies
                .iter()
                .find(|dep| !candidate.units.contains_key(*dep))
            {
                return Err(OrchestratorError::InvalidSplitPlan(format!(
                    "{id} depends on unknown unit {missing}"
                )));
            }
        }
        for dependent in &dependents {
            let replacement = plan
                .dependent_remap
                .get(dependent)
                .cloned()
                .unwrap_or_else(|| new_ids.clone());
            if let Some(unit) = candidate.units.get_mut(dependent) {
                unit.dependencies.remove(&plan.original);
                unit.dependencies.extend(replacement);
            }
        }

        if let Some(cycle) = candidate
            .detect_cycles()
            .into_iter()
            .find(|cycle| cycle.iter().any(|id| new_ids.contains(id)))
        {
            return Err(OrchestratorError::InvalidSplitPlan(format!(
                "plan introduces cycle {}",
                cycle.join(" -> ")
            )));
        }
        if let Some(violation) = candidate
            .validate_levels()
            .into_iter()
            .find(|v| new_ids.contains(&v.from) || new_ids.contains(&v.to))
        {
            return Err(OrchestratorError::InvalidSplitPlan(violation.to_string()));
        }

        *self = candidate;
        Ok(new_ids.into_iter().collect())
    }
}
