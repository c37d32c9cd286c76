use super::{Agent, AgentId, AgentPool};
use crate::config::CrashRules;
use std::collections::BTreeMap;

pub const TIME_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentState {
    #[default]
    Racing,
    Crashed,
    // Reserved, no transition enters it
    Recovering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Recover,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledEvent {
    pub agent: AgentId,
    pub kind: EventKind,
    pub fire_at: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    entries: BTreeMap<(AgentId, EventKind), f64>,
}

impl Scheduler {
    pub fn schedule(&mut self, agent: AgentId, kind: EventKind, fire_at: f64) -> Option<f64> {
        self.entries.insert((agent, kind), fire_at)
    }

    pub fn cancel(&mut self, agent: AgentId, kind: EventKind) -> Option<f64> {
        self.entries.remove(&(agent, kind))
    }

    pub fn pending(&self, agent: AgentId, kind: EventKind) -> Option<f64> {
        self.entries.get(&(agent, kind)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn take_due(&mut self, now: f64) -> Vec<ScheduledEvent> {
        let mut due: Vec<ScheduledEvent> = self
            .entries
            .iter()
            .filter(|(_, fire_at)| **fire_at <= now + TIME_EPSILON)
            .map(|(&(agent, kind), &fire_at)| ScheduledEvent { agent, kind, fire_at })
            .collect();

        for event in &due {
            self.entries.remove(&(event.agent, event.kind));
        }

        due.sort_by(|a, b| a.fire_at.total_cmp(&b.fire_at).then(a.agent.cmp(&b.agent)));
        due
    }
}

#[derive(Debug, Clone)]
pub struct AgentStateMachine {
    rules: CrashRules,
}

impl AgentStateMachine {
    pub fn new(rules: CrashRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CrashRules {
        &self.rules
    }

    pub fn is_crash(&self, relative_speed: f32) -> bool {
        relative_speed > self.rules.impact_threshold
    }

    // A crash while already crashed pushes recovery back
    pub fn on_collision(&self, agent: &mut Agent, relative_speed: f32, now: f64, scheduler: &mut Scheduler) -> bool {
        if !self.is_crash(relative_speed) {
            return false;
        }

        agent.state = AgentState::Crashed;
        let fire_at = now + self.rules.recovery_delay as f64;
        match scheduler.schedule(agent.id, EventKind::Recover, fire_at) {
            Some(previous) => log::debug!(
                "Agent {} crashed again at {:.2}s ({:.2} units/s), recovery moved from {:.2}s to {:.2}s",
                agent.id.0, now, relative_speed, previous, fire_at
            ),
            None => log::debug!(
                "Agent {} crashed at {:.2}s ({:.2} units/s), recovering at {:.2}s",
                agent.id.0, now, relative_speed, fire_at
            ),
        }
        true
    }

    pub fn fire_due(&self, pool: &mut AgentPool, scheduler: &mut Scheduler, now: f64) -> usize {
        let mut recovered = 0;
        for event in scheduler.take_due(now) {
            match event.kind {
                EventKind::Recover => {
                    if let Some(agent) = pool.get_mut(event.agent) {
                        agent.state = AgentState::Racing;
                        recovered += 1;
                        log::debug!("Agent {} back to racing at {:.2}s", agent.id.0, now);
                    }
                }
            }
        }
        recovered
    }
}
