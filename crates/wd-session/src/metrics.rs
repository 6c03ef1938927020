use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionMetricsSnapshot {
    pub commands: u64,
    pub command_failures: u64,
    pub command_latency_total_us: u64,
}

impl SessionMetricsSnapshot {
    pub fn average_latency(&self) -> Option<Duration> {
        (self.commands > 0)
            .then(|| Duration::from_micros(self.command_latency_total_us / self.commands))
    }
}

/// WebDriver command counters for one session.
#[derive(Default, Debug)]
pub struct SessionMetrics {
    commands: AtomicU64,
    command_failures: AtomicU64,
    command_latency_total_us: AtomicU64,
}

impl SessionMetrics {
    pub fn record(&self, elapsed: Duration, ok: bool) {
        self.commands.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.command_failures.fetch_add(1, Ordering::Relaxed);
        }
        let micros = elapsed.as_micros().min(u128::from(u64::MAX)) as u64;
        self.command_latency_total_us
            .fetch_add(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        SessionMetricsSnapshot {
            commands: self.commands.load(Ordering::Relaxed),
            command_failures: self.command_failures.load(Ordering::Relaxed),
            command_latency_total_us: self.command_latency_total_us.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_failures_and_latency() {
        let metrics = SessionMetrics::default();
        metrics.record(Duration::from_millis(4), true);
        metrics.record(Duration::from_millis(2), false);

        let snap = metrics.snapshot();
        assert_eq!(snap.commands, 2);
        assert_eq!(snap.command_failures, 1);
        assert_eq!(snap.command_latency_total_us, 6_000);
        assert_eq!(snap.average_latency(), Some(Duration::from_millis(3)));
    }

    #[test]
    fn empty_snapshot_has_no_average() {
        assert_eq!(SessionMetrics::default().snapshot().average_latency(), None);
    }
}
