//! [`GreetingLedger`] – proactive-greeting state machine.
//!
//! Two states per subject-present cycle: not-yet-greeted and greeted, with a
//! timed reset edge back to not-yet-greeted once the cooldown elapses or
//! every remembered person has left the memory window.  Mutated only by the
//! prompt composer when vision or badge modalities fire; this is the only
//! persistent cross-tick state inside the composer besides the static
//! context.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Tracks whether the agent has already greeted the people currently
/// present, and who has been seen recently.
#[derive(Debug, Default)]
pub struct GreetingLedger {
    pub(crate) has_greeted: bool,
    pub(crate) last_greeting_at: Option<Instant>,
    pub(crate) people: HashMap<String, Instant>,
}

impl GreetingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note the named people as present now, expire entries older than
    /// `memory_window`, and reset to not-yet-greeted when everyone has left.
    ///
    /// Returns the names not seen within the window before this call – the
    /// newly arrived.
    pub fn observe(&mut self, names: &[String], memory_window: Duration) -> Vec<String> {
        let now = Instant::now();
        self.people
            .retain(|_, last_seen| now.duration_since(*last_seen) <= memory_window);

        let mut fresh = Vec::new();
        for name in names {
            if self.people.insert(name.clone(), now).is_none() {
                fresh.push(name.clone());
            }
        }

        if self.people.is_empty() {
            // Subject-present cycle ended; the next arrival starts a new one.
            self.has_greeted = false;
        }
        fresh
    }

    /// Whether a proactive greeting is due: never greeted this cycle, or the
    /// cooldown has elapsed since the last one.
    pub fn should_greet(&self, cooldown: Duration) -> bool {
        if !self.has_greeted {
            return true;
        }
        match self.last_greeting_at {
            Some(at) => at.elapsed() > cooldown,
            None => true,
        }
    }

    /// Record that a greeting was just issued.
    pub fn mark_greeted(&mut self) {
        self.has_greeted = true;
        self.last_greeting_at = Some(Instant::now());
    }

    /// People currently within the memory window.
    pub fn present(&self) -> Vec<String> {
        self.people.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Sub-second spans keep the backdating arithmetic safe on any host.
    const WINDOW: Duration = Duration::from_millis(600);
    const COOLDOWN: Duration = Duration::from_millis(300);

    #[test]
    fn fresh_ledger_wants_to_greet() {
        let ledger = GreetingLedger::new();
        assert!(ledger.should_greet(COOLDOWN));
    }

    #[test]
    fn greeting_arms_the_cooldown() {
        let mut ledger = GreetingLedger::new();
        ledger.observe(&["Alice".to_string()], WINDOW);
        ledger.mark_greeted();
        assert!(!ledger.should_greet(COOLDOWN));
    }

    #[test]
    fn cooldown_expiry_re_enables_greeting() {
        let mut ledger = GreetingLedger::new();
        ledger.observe(&["Alice".to_string()], WINDOW);
        ledger.mark_greeted();
        // Backdate the greeting instead of sleeping through the cooldown.
        ledger.last_greeting_at = Some(Instant::now() - COOLDOWN - Duration::from_millis(1));
        assert!(ledger.should_greet(COOLDOWN));
    }

    #[test]
    fn observe_reports_newly_arrived_only() {
        let mut ledger = GreetingLedger::new();
        let fresh = ledger.observe(&["Alice".to_string()], WINDOW);
        assert_eq!(fresh, vec!["Alice"]);
        let fresh = ledger.observe(&["Alice".to_string(), "Bob".to_string()], WINDOW);
        assert_eq!(fresh, vec!["Bob"]);
    }

    #[test]
    fn everyone_leaving_resets_the_cycle() {
        let mut ledger = GreetingLedger::new();
        ledger.observe(&["Alice".to_string()], WINDOW);
        ledger.mark_greeted();

        // Backdate Alice past the memory window, then observe an empty scene.
        ledger
            .people
            .insert("Alice".to_string(), Instant::now() - WINDOW - Duration::from_millis(1));
        ledger.observe(&[], WINDOW);

        assert!(ledger.present().is_empty());
        assert!(ledger.should_greet(COOLDOWN), "new cycle must greet again");
    }
}
