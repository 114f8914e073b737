//! Replays an externally supplied decision stream keyed by bar timestamp.

use super::{Agent, AgentContext, AgentError};
use crate::domain::{Action, Decision, LookbackView};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct ScheduledAgent {
    name: String,
    schedule: BTreeMap<DateTime<Utc>, Decision>,
}

impl ScheduledAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schedule: BTreeMap::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>, action: Action) -> Self {
        self.schedule.insert(timestamp, Decision::new(action));
        self
    }

    pub fn with_decision(mut self, timestamp: DateTime<Utc>, decision: Decision) -> Self {
        self.schedule.insert(timestamp, decision);
        self
    }

    pub fn len(&self) -> usize {
        self.schedule.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedule.is_empty()
    }
}

impl FromIterator<(DateTime<Utc>, Action)> for ScheduledAgent {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, Action)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new("scheduled"), |agent, (ts, action)| agent.at(ts, action))
    }
}

impl Agent for ScheduledAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn analyze(&self, window: LookbackView<'_>, _context: &AgentContext) -> Result<Decision, AgentError> {
        Ok(self
            .schedule
            .get(&window.current().timestamp)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BarSeries;
    use crate::indicators::make_bars;

    #[test]
    fn replays_by_timestamp() {
        let series = BarSeries::new("T", make_bars(&[1.0, 2.0, 3.0])).unwrap();
        let agent: ScheduledAgent = [(series.get(1).unwrap().timestamp, Action::Buy)].into_iter().collect();
        let ctx = AgentContext::default();
        assert_eq!(agent.analyze(series.window(0).unwrap(), &ctx).unwrap().action, Action::Hold);
        assert_eq!(agent.analyze(series.window(1).unwrap(), &ctx).unwrap().action, Action::Buy);
        assert_eq!(agent.analyze(series.window(2).unwrap(), &ctx).unwrap().action, Action::Hold);
    }
}
