//! Cross-client clock correlation from heartbeat pongs.
//!
//! The client stamps every [`HeartbeatPong`](crate::protocol::HeartbeatPong)
//! event with its local monotonic receipt time; the offset and round-trip
//! math lives here so playback engines don't re-derive it. Feed each pong
//! into [`SessionClock::on_pong`] and read the lowest-RTT estimate back via
//! [`SessionClock::best`].

use std::sync::OnceLock;
use std::time::Instant;

static CLOCK_BASE: OnceLock<Instant> = OnceLock::new();

/// Milliseconds elapsed on a process-wide monotonic clock.
///
/// The zero point is the first call in this process; only differences
/// between two readings are meaningful. This is the timestamp domain of
/// `clientElapsedRealtimeMs` in the heartbeat sub-protocol.
pub fn monotonic_ms() -> i64 {
    let base = CLOCK_BASE.get_or_init(Instant::now);
    i64::try_from(base.elapsed().as_millis()).unwrap_or(i64::MAX)
}

/// One offset/RTT estimate derived from a single ping/pong exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSnapshot {
    /// Estimated `server_clock - client_clock` in milliseconds, assuming the
    /// pong was generated at the midpoint of the round trip.
    pub estimated_offset_ms: i64,
    /// Observed round-trip time in milliseconds.
    pub estimated_rtt_ms: i64,
}

/// Running clock-correlation state for one session.
///
/// Keeps the latest sample and the best (lowest-RTT) sample seen so far;
/// low-RTT exchanges bound the offset error most tightly.
#[derive(Debug, Default)]
pub struct SessionClock {
    last: Option<ClockSnapshot>,
    best: Option<ClockSnapshot>,
}

impl SessionClock {
    /// Create a clock with no samples.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one completed ping/pong exchange.
    ///
    /// `sent_at_ms` and `received_at_ms` are the local monotonic timestamps
    /// at which the ping left and the pong arrived (see [`monotonic_ms`]);
    /// `server_elapsed_ms` is the server clock carried by the pong.
    pub fn on_pong(
        &mut self,
        sent_at_ms: i64,
        received_at_ms: i64,
        server_elapsed_ms: i64,
    ) -> ClockSnapshot {
        let rtt = (received_at_ms - sent_at_ms).max(0);
        let midpoint = sent_at_ms + rtt / 2;
        let snapshot = ClockSnapshot {
            estimated_offset_ms: server_elapsed_ms - midpoint,
            estimated_rtt_ms: rtt,
        };
        self.last = Some(snapshot);
        let better = match self.best {
            Some(best) => snapshot.estimated_rtt_ms <= best.estimated_rtt_ms,
            None => true,
        };
        if better {
            self.best = Some(snapshot);
        }
        snapshot
    }

    /// The most recent sample, if any exchange has completed.
    pub fn last(&self) -> Option<ClockSnapshot> {
        self.last
    }

    /// The lowest-RTT sample seen so far, if any.
    pub fn best(&self) -> Option<ClockSnapshot> {
        self.best
    }

    /// Shorthand for the best estimate's offset.
    pub fn estimated_offset_ms(&self) -> Option<i64> {
        self.best.map(|snapshot| snapshot.estimated_offset_ms)
    }
}
