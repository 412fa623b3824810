use std::time::Duration;

/// Where the debouncer stands between two frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebounceState {
    Armed,
    /// Suppressing triggers; `since` is the timestamp of the accepted trigger.
    Refractory { since: Duration },
}

/// Turns a stream of per-frame detections into at most one trigger per
/// refractory window.
#[derive(Debug)]
pub struct Debouncer {
    state: DebounceState,
    refractory: Duration,
    triggers: u64,
    last_trigger: Option<Duration>,
}

impl Debouncer {
    pub fn new(refractory: Duration) -> Self {
        Self {
            state: DebounceState::Armed,
            refractory,
            triggers: 0,
            last_trigger: None,
        }
    }

    #[allow(dead_code)]
    pub fn state(&self) -> DebounceState {
        self.state
    }

    pub fn triggers(&self) -> u64 {
        self.triggers
    }

    #[allow(dead_code)]
    pub fn last_trigger(&self) -> Option<Duration> {
        self.last_trigger
    }

    /// Re-arm once more than the refractory duration has passed since the
    /// last trigger. Call at the start of every cycle.
    pub fn tick(&mut self, now: Duration) {
        if let DebounceState::Refractory { since } = self.state {
            if now.saturating_sub(since) > self.refractory {
                log::debug!("Re-armed after {:?}", now.saturating_sub(since));
                self.state = DebounceState::Armed;
            }
        }
    }

    /// Feed this cycle's classifier result. Returns `true` when the
    /// detection is accepted as a new trigger.
    pub fn offer(&mut self, detected: bool, now: Duration) -> bool {
        match self.state {
            DebounceState::Armed if detected => {
                self.state = DebounceState::Refractory { since: now };
                self.triggers += 1;
                self.last_trigger = Some(now);
                true
            }
            DebounceState::Refractory { since } if detected => {
                log::trace!("Suppressed detection {:?} after trigger", now.saturating_sub(since));
                false
            }
            _ => false,
        }
    }
}
