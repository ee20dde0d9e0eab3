//! Schedules describing when a polling endpoint fires next.

use {std::time::Duration, tokio::time::Instant};

/// What the poller knows about the previous cycle when asking for the next
/// fire time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerContext {
    /// When the last cycle was scheduled to fire.
    pub last_scheduled: Option<Instant>,
    /// When the last cycle actually started.
    pub last_actual: Option<Instant>,
    /// When the last cycle completed.
    pub last_completion: Option<Instant>,
}

/// A schedule source: produces the next allowed execution time.
pub trait Trigger: Send + Sync {
    /// Next fire time, or `None` when the schedule is exhausted.
    fn next_fire(&self, context: &TriggerContext) -> Option<Instant>;
}

/// Fires repeatedly with a fixed period.
///
/// Fixed-delay mode (the default) measures the period from the completion of
/// the previous cycle; fixed-rate mode measures it from the previous
/// scheduled fire time, so slow cycles do not push the schedule back.
#[derive(Debug, Clone)]
pub struct PeriodicTrigger {
    period: Duration,
    initial_delay: Duration,
    fixed_rate: bool,
}

impl PeriodicTrigger {
    /// Fixed-delay trigger.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            initial_delay: Duration::ZERO,
            fixed_rate: false,
        }
    }

    /// Fixed-rate trigger.
    #[must_use]
    pub fn fixed_rate(period: Duration) -> Self {
        Self {
            period,
            initial_delay: Duration::ZERO,
            fixed_rate: true,
        }
    }

    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }
}

impl Trigger for PeriodicTrigger {
    fn next_fire(&self, context: &TriggerContext) -> Option<Instant> {
        let anchor = if self.fixed_rate {
            context.last_scheduled
        } else {
            context.last_completion
        };
        Some(match anchor {
            Some(last) => last + self.period,
            None => Instant::now() + self.initial_delay,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_fire_honors_initial_delay() {
        let trigger =
            PeriodicTrigger::new(Duration::from_secs(5)).with_initial_delay(Duration::from_secs(2));
        let before = Instant::now();
        let fire = trigger.next_fire(&TriggerContext::default()).unwrap();
        assert!(fire >= before + Duration::from_secs(2));
    }

    #[tokio::test]
    async fn fixed_delay_anchors_on_completion() {
        let trigger = PeriodicTrigger::new(Duration::from_secs(5));
        let completed = Instant::now();
        let context = TriggerContext {
            last_scheduled: Some(completed - Duration::from_secs(30)),
            last_actual: Some(completed - Duration::from_secs(29)),
            last_completion: Some(completed),
        };
        assert_eq!(
            trigger.next_fire(&context),
            Some(completed + Duration::from_secs(5))
        );
    }

    #[tokio::test]
    async fn fixed_rate_anchors_on_schedule() {
        let trigger = PeriodicTrigger::fixed_rate(Duration::from_secs(5));
        let scheduled = Instant::now();
        let context = TriggerContext {
            last_scheduled: Some(scheduled),
            last_actual: Some(scheduled + Duration::from_secs(1)),
            last_completion: Some(scheduled + Duration::from_secs(4)),
        };
        assert_eq!(
            trigger.next_fire(&context),
            Some(scheduled + Duration::from_secs(5))
        );
    }
}
