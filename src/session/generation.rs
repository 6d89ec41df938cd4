//! Generation counter that lets suspended transitions detect they were superseded.

// self
use crate::_prelude::*;

/// Opaque token captured at the start of a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

/// Monotonic generation clock.
///
/// Every transition calls [`advance_with`](Self::advance_with) on entry. Side effects that follow a
/// suspension point run through [`run_if_current`](Self::run_if_current), which holds the
/// clock's lock while the effect executes so an advance cannot interleave with it.
#[derive(Debug, Default)]
pub struct GenerationClock(Mutex<u64>);
impl GenerationClock {
	/// Starts a new generation, invalidating every earlier one, and runs `f` before any other
	/// caller can observe it.
	pub fn advance_with<T>(&self, f: impl FnOnce(Generation) -> T) -> (Generation, T) {
		let mut current = self.0.lock();

		*current = current.wrapping_add(1);

		let generation = Generation(*current);

		(generation, f(generation))
	}

	/// Whether `generation` is still the latest one.
	pub fn is_current(&self, generation: Generation) -> bool {
		*self.0.lock() == generation.0
	}

	/// Runs `f` only if `generation` is still the latest one.
	pub fn run_if_current<T>(&self, generation: Generation, f: impl FnOnce() -> T) -> Option<T> {
		let current = self.0.lock();

		if *current == generation.0 { Some(f()) } else { None }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn advancing_invalidates_earlier_generations() {
		let clock = GenerationClock::default();
		let (first, ()) = clock.advance_with(|_| ());

		assert!(clock.is_current(first));
		assert_eq!(clock.run_if_current(first, || 1), Some(1));

		let (second, ()) = clock.advance_with(|_| ());

		assert!(!clock.is_current(first));
		assert_eq!(clock.run_if_current(first, || 1), None);
		assert!(clock.is_current(second));
	}

	#[test]
	fn advance_with_runs_under_new_generation() {
		let clock = GenerationClock::default();
		let (generation, observed) = clock.advance_with(|generation| generation);

		assert_eq!(generation, observed);
	}
}
