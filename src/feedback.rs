use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Short confirmation that an action took effect
pub trait Feedback {
    fn impact(&self);
}

const PULSE_DURATION: Duration = Duration::from_millis(450);

/// Visual stand-in for a haptic tap: the map draws a fading ring while the
/// pulse is active. Clones share the same pulse.
#[derive(Clone, Default)]
pub struct PulseFeedback {
    started: Rc<Cell<Option<Instant>>>,
}

impl PulseFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining strength in (0, 1], or None once the pulse has faded
    pub fn intensity(&self, now: Instant) -> Option<f32> {
        let started = self.started.get()?;
        let elapsed = now.saturating_duration_since(started);
        if elapsed >= PULSE_DURATION {
            self.started.set(None);
            return None;
        }
        Some(1.0 - elapsed.as_secs_f32() / PULSE_DURATION.as_secs_f32())
    }

    fn trigger_at(&self, now: Instant) {
        self.started.set(Some(now));
    }
}

impl Feedback for PulseFeedback {
    fn impact(&self) {
        log::trace!("feedback pulse");
        self.trigger_at(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_fades_out() {
        let pulse = PulseFeedback::new();
        let t0 = Instant::now();
        assert_eq!(pulse.intensity(t0), None);

        pulse.trigger_at(t0);
        let shared = pulse.clone();
        assert_eq!(shared.intensity(t0), Some(1.0));

        let half = shared.intensity(t0 + PULSE_DURATION / 2).unwrap();
        assert!((half - 0.5).abs() < 0.01);

        assert_eq!(pulse.intensity(t0 + PULSE_DURATION), None);
        // Faded pulses stay off
        assert_eq!(pulse.intensity(t0 + PULSE_DURATION / 4), None);
    }
}
