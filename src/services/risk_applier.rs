use crate::domain::distribution::DurationDistribution;
use crate::domain::risk::{LegacyImpact, RiskEvent};
use crate::services::cpm_scheduler::ScheduleNetwork;
use crate::services::duration_sampler::{ThreePointSampler, quantile};

#[derive(Debug, Clone)]
struct ResolvedImpact {
    node: usize,
    schedule: DurationDistribution,
    cost: DurationDistribution,
    correlate: bool,
    impact_ranges: bool,
    event_existence: bool,
}

#[derive(Debug, Clone)]
struct ResolvedLegacy {
    impact: LegacyImpact,
    nodes: Vec<usize>,
}

#[derive(Debug, Clone)]
struct ResolvedEvent {
    id: String,
    probability: f64,
    impacts: Vec<ResolvedImpact>,
    legacy: Option<ResolvedLegacy>,
}

/// Risk events bound to the nodes of one network.
///
/// Task ids are resolved once up front; impacts naming activities the
/// network does not know are dropped with a warning instead of failing
/// every iteration.
#[derive(Debug, Clone, Default)]
pub struct RiskRegister {
    events: Vec<ResolvedEvent>,
}

impl RiskRegister {
    pub fn new(events: &[RiskEvent], network: &ScheduleNetwork, use_mitigated: bool) -> Self {
        let resolve = |event: &RiskEvent, task_id: &str| {
            let node = network.node_index(task_id);
            if node.is_none() {
                tracing::warn!(event = %event.id, task = task_id, "risk impact targets unknown activity, skipping");
            }
            node
        };

        let events = events
            .iter()
            .filter(|event| event.quantified)
            .map(|event| {
                let impacts = event
                    .impacts
                    .iter()
                    .filter_map(|impact| {
                        let node = resolve(event, &impact.task_id)?;
                        Some(ResolvedImpact {
                            node,
                            schedule: impact.schedule_for(use_mitigated).normalized(),
                            cost: impact.cost.normalized(),
                            correlate: impact.correlate,
                            impact_ranges: impact.impact_ranges,
                            event_existence: impact.event_existence,
                        })
                    })
                    .collect();
                let legacy = event.legacy_impact.as_ref().map(|impact| ResolvedLegacy {
                    impact: impact.clone(),
                    nodes: impact
                        .activities()
                        .iter()
                        .filter_map(|id| resolve(event, id))
                        .collect(),
                });
                ResolvedEvent {
                    id: event.id.clone(),
                    probability: event.probability_for(use_mitigated) / 100.0,
                    impacts,
                    legacy,
                }
            })
            .collect();

        Self { events }
    }

    /// True when any impact carries a cost distribution.
    pub fn has_cost(&self) -> bool {
        self.events
            .iter()
            .flat_map(|event| &event.impacts)
            .any(|impact| !impact.cost.is_none() || impact.cost.most_likely != 0.0)
    }

    /// Applies one iteration of risk to `durations` (indexed by network
    /// node) and returns the iteration's risk cost.
    ///
    /// Every event consumes exactly one occurrence draw, in list order, so
    /// a given substream always lines up with the same events.
    pub fn apply<S: ThreePointSampler + ?Sized>(
        &self,
        sampler: &mut S,
        durations: &mut [f64],
        completed: &[bool],
    ) -> f64 {
        let mut cost = 0.0;
        for event in &self.events {
            let occurred = sampler.uniform() < event.probability;
            if occurred {
                tracing::trace!(event = %event.id, "risk event occurred");
            }

            for impact in &event.impacts {
                if impact.event_existence && !occurred {
                    continue;
                }
                let (schedule, impact_cost) = draw_impact(impact, sampler);
                if !completed[impact.node] {
                    durations[impact.node] += schedule;
                }
                cost += impact_cost;
            }

            if let (true, Some(legacy)) = (occurred, &event.legacy) {
                for &node in &legacy.nodes {
                    if !completed[node] {
                        durations[node] = legacy.impact.apply(durations[node]).max(0.0);
                    }
                }
            }
        }
        cost
    }
}

fn draw_impact<S: ThreePointSampler + ?Sized>(impact: &ResolvedImpact, sampler: &mut S) -> (f64, f64) {
    if !impact.impact_ranges {
        return (
            impact.schedule.most_likely.max(0.0),
            impact.cost.most_likely.max(0.0),
        );
    }
    if impact.correlate {
        let u = sampler.uniform();
        return (quantile(&impact.schedule, u), quantile(&impact.cost, u));
    }
    (sampler.sample(&impact.schedule), sampler.sample(&impact.cost))
}
