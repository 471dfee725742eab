//! Change detector: reports each distinct skin name once.
//!
//! The detector is fed by two independent triggers (structural-change
//! notifications and a periodic timer), so it sees the same name many times
//! in a row.  It keeps the last reported observation and only produces a new
//! one when the name actually changes.
//!
//! ```text
//! sample: None     "Ahri"   "Ahri"   None     "Ahri"   "Foxfire"   reset   "Foxfire"
//! report:  -       Ahri       -       -        -       Foxfire       -     Foxfire
//! ```
//!
//! `None` samples (nothing rendered) never clear the remembered name; only an
//! explicit [`ChangeDetector::reset`] does, which the bridge triggers when a
//! new lobby starts so that picking the same skin again is reported.

use crate::domain::skin::SkinObservation;

/// Remembers the last reported skin and filters out repeats.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_logged: Option<SkinObservation>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one sample.
    ///
    /// Returns a fresh observation when `name` is present and differs from
    /// the last reported name; `None` otherwise.
    pub fn observe(&mut self, name: Option<String>) -> Option<SkinObservation> {
        let name = name?;
        if self
            .last_logged
            .as_ref()
            .is_some_and(|last| last.name == name)
        {
            return None;
        }

        let observation = SkinObservation::now(name);
        self.last_logged = Some(observation.clone());
        Some(observation)
    }

    /// Forgets the last reported skin.
    pub fn reset(&mut self) {
        self.last_logged = None;
    }

    /// The last reported observation, if any.
    pub fn last_logged(&self) -> Option<&SkinObservation> {
        self.last_logged.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(name: &str) -> Option<String> {
        Some(name.to_string())
    }

    #[test]
    fn test_first_name_is_reported() {
        let mut detector = ChangeDetector::new();
        let obs = detector.observe(some("Arcade Ahri")).expect("first sample must report");
        assert_eq!(obs.name, "Arcade Ahri");
        assert_eq!(detector.last_logged().map(|o| o.name.as_str()), Some("Arcade Ahri"));
    }

    #[test]
    fn test_none_is_never_reported() {
        let mut detector = ChangeDetector::new();
        assert!(detector.observe(None).is_none());
        assert!(detector.last_logged().is_none());
    }

    #[test]
    fn test_repeated_name_is_reported_once() {
        // Arrange
        let mut detector = ChangeDetector::new();

        // Act
        let reports: Vec<_> = (0..6)
            .filter_map(|_| detector.observe(some("Ahri")))
            .collect();

        // Assert
        assert_eq!(reports.len(), 1);
    }

    #[test]
    fn test_none_between_identical_names_does_not_re_report() {
        let mut detector = ChangeDetector::new();
        assert!(detector.observe(some("Ahri")).is_some());
        assert!(detector.observe(None).is_none());
        assert!(detector.observe(some("Ahri")).is_none());
    }

    #[test]
    fn test_each_transition_is_reported() {
        // Arrange
        let mut detector = ChangeDetector::new();
        let samples = ["Ahri", "Ahri", "Foxfire Ahri", "Ahri", "Ahri", "K/DA Ahri"];

        // Act
        let reported: Vec<String> = samples
            .iter()
            .filter_map(|s| detector.observe(some(s)))
            .map(|o| o.name)
            .collect();

        // Assert
        assert_eq!(reported, vec!["Ahri", "Foxfire Ahri", "Ahri", "K/DA Ahri"]);
    }

    #[test]
    fn test_reset_allows_same_name_again() {
        let mut detector = ChangeDetector::new();
        assert!(detector.observe(some("Ahri")).is_some());
        detector.reset();
        assert!(detector.last_logged().is_none());
        assert!(detector.observe(some("Ahri")).is_some());
    }

    #[test]
    fn test_names_are_compared_exactly() {
        let mut detector = ChangeDetector::new();
        assert!(detector.observe(some("Ahri")).is_some());
        assert!(detector.observe(some("ahri")).is_some());
    }
}
