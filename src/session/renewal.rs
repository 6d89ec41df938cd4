//! Lifecycle-scoped credential renewal task.
//!
//! A [`RenewalTask`] is spawned for every sign-in transition and owns a tokio task that
//! re-fetches the credential with `force_fresh` every renewal period, or immediately when the
//! gateway raises its unauthorized signal. The task is aborted when cancelled or dropped, and
//! every install it performs is fenced by the generation of the transition that spawned it.
//! Failures are logged only; the next tick retries.

mod metrics;

pub use metrics::RenewalMetrics;

// crates.io
use tokio::{
	sync::Notify,
	task::JoinHandle,
	time::{self, Instant, MissedTickBehavior},
};
// self
use crate::{
	_prelude::*,
	auth::CredentialSource,
	http::RequestGateway,
	obs::{self, Phase, PhaseOutcome, PhaseSpan},
	session::{Generation, GenerationClock},
};

/// Shared collaborators a renewal task needs.
#[derive(Clone)]
pub(crate) struct RenewalContext {
	pub(crate) source: Arc<dyn CredentialSource>,
	pub(crate) gateway: Arc<RequestGateway>,
	pub(crate) clock: Arc<GenerationClock>,
	pub(crate) period: std::time::Duration,
	pub(crate) metrics: Arc<RenewalMetrics>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trigger {
	Tick,
	Unauthorized,
}

/// Handle to a running renewal task; aborts the task when dropped.
#[derive(Debug)]
pub struct RenewalTask {
	handle: JoinHandle<()>,
}
impl RenewalTask {
	pub(crate) fn spawn(context: RenewalContext, generation: Generation) -> Self {
		Self { handle: tokio::spawn(run(context, generation)) }
	}

	/// Whether the task is still scheduled.
	pub fn is_running(&self) -> bool {
		!self.handle.is_finished()
	}

	/// Aborts the task.
	pub fn cancel(self) {
		drop(self);
	}
}
impl Drop for RenewalTask {
	fn drop(&mut self) {
		self.handle.abort();
	}
}

async fn run(context: RenewalContext, generation: Generation) {
	let signal: Arc<Notify> = context.gateway.renewal_signal();
	let mut ticker = time::interval_at(Instant::now() + context.period, context.period);

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		let trigger = tokio::select! {
			_ = ticker.tick() => Trigger::Tick,
			_ = signal.notified() => {
				ticker.reset();

				Trigger::Unauthorized
			},
		};

		if !context.clock.is_current(generation) {
			break;
		}
		if !renew_once(&context, generation, trigger).await {
			break;
		}
	}
}

/// Returns `false` once the spawning transition has been superseded.
async fn renew_once(context: &RenewalContext, generation: Generation, trigger: Trigger) -> bool {
	const PHASE: Phase = Phase::Renewal;

	let span = PhaseSpan::new(PHASE, "renew");

	context.metrics.record_attempt();

	if trigger == Trigger::Unauthorized {
		context.metrics.record_signalled();
	}

	obs::record_phase_outcome(PHASE, PhaseOutcome::Attempt);

	match span.instrument(context.source.get_token(true)).await {
		Ok(credential) => {
			let installed = context
				.clock
				.run_if_current(generation, || context.gateway.install_credential(credential))
				.is_some();

			if installed {
				context.metrics.record_success();
				obs::record_phase_outcome(PHASE, PhaseOutcome::Success);
				obs::info(PHASE, "renew", &"Auth token refreshed.");
			} else {
				obs::record_phase_outcome(PHASE, PhaseOutcome::Superseded);
			}

			installed
		},
		Err(err) => {
			context.metrics.record_failure();
			obs::record_phase_outcome(PHASE, PhaseOutcome::Failure);
			obs::warn(PHASE, "renew", &err);

			true
		},
	}
}
