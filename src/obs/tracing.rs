// self
use crate::{_prelude::*, obs::Phase};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedPhase<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedPhase<F> = F;

/// A span builder used by lifecycle phases.
#[derive(Clone, Debug)]
pub struct PhaseSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl PhaseSpan {
	/// Creates a new span tagged with the provided phase + stage.
	pub fn new(phase: Phase, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("session_lifecycle.phase", phase = phase.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (phase, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedPhase<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits an informational event for a phase.
pub fn info(phase: Phase, stage: &'static str, message: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(phase = phase.as_str(), stage, "{message}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (phase, stage, message);
	}
}

/// Emits a warning for a recoverable failure; never used for fatal paths.
pub fn warn(phase: Phase, stage: &'static str, detail: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(phase = phase.as_str(), stage, "{detail}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (phase, stage, detail);
	}
}

/// Emits an error event; reserved for failures that surface to the user.
pub fn error(phase: Phase, stage: &'static str, detail: &dyn Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::error!(phase = phase.as_str(), stage, "{detail}");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (phase, stage, detail);
	}
}
