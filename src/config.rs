//! Startup configuration consumed when wiring the coordinator into an application.
//!
//! A [`CoordinatorConfig`] can only exist with a valid publishable key, so the coordinator
//! cannot be constructed without one. Build it explicitly with [`CoordinatorConfig::builder`] or
//! read it from the process environment with [`CoordinatorConfig::from_env`]:
//!
//! - `SESSION_PUBLISHABLE_KEY` (required)
//! - `SESSION_API_BASE` (default `http://localhost:5000/api/`)
//! - `SESSION_RENEWAL_SECS` (default `600`)
//! - `SESSION_UNAUTHORIZED_POLICY` (`log_only` or `request_renewal`, default `log_only`)

// self
use crate::{_prelude::*, auth::PublishableKey, error::ConfigError, http::UnauthorizedPolicy};

/// Environment variable holding the identity-provider publishable key.
pub const PUBLISHABLE_KEY_VAR: &str = "SESSION_PUBLISHABLE_KEY";
/// Environment variable overriding the API base URL.
pub const API_BASE_VAR: &str = "SESSION_API_BASE";
/// Environment variable overriding the renewal period, in seconds.
pub const RENEWAL_SECS_VAR: &str = "SESSION_RENEWAL_SECS";
/// Environment variable selecting the [`UnauthorizedPolicy`].
pub const UNAUTHORIZED_POLICY_VAR: &str = "SESSION_UNAUTHORIZED_POLICY";

/// Validated coordinator configuration.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
	/// Identity-provider publishable key.
	pub publishable_key: PublishableKey,
	/// Base URL every gateway path is joined onto; always ends with `/`.
	pub api_base: Url,
	/// Path of the authorization-check endpoint, relative to `api_base`.
	pub admin_check_path: String,
	/// Interval between credential renewals.
	pub renewal_period: Duration,
	/// Reaction to HTTP 401 responses observed by the gateway.
	pub unauthorized_policy: UnauthorizedPolicy,
}
impl CoordinatorConfig {
	/// Default API base used during local development.
	pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api/";
	/// Default authorization-check path.
	pub const DEFAULT_ADMIN_CHECK_PATH: &str = "admin/check";
	/// Default renewal period.
	pub const DEFAULT_RENEWAL_PERIOD: Duration = Duration::minutes(10);

	/// Creates a builder seeded with the provided publishable key.
	pub fn builder(publishable_key: impl Into<String>) -> CoordinatorConfigBuilder {
		CoordinatorConfigBuilder::new(publishable_key)
	}

	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|var| std::env::var(var).ok())
	}

	/// Reads the configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let key = lookup(PUBLISHABLE_KEY_VAR)
			.filter(|value| !value.is_empty())
			.ok_or(ConfigError::MissingPublishableKey { var: PUBLISHABLE_KEY_VAR })?;
		let mut builder = Self::builder(key);

		if let Some(raw) = lookup(API_BASE_VAR) {
			let url = Url::parse(&raw).map_err(|source| ConfigError::InvalidApiBase { source })?;

			builder = builder.api_base(url);
		}
		if let Some(raw) = lookup(RENEWAL_SECS_VAR) {
			let secs = raw
				.trim()
				.parse::<i64>()
				.map_err(|_| ConfigError::InvalidNumber { var: RENEWAL_SECS_VAR, value: raw })?;

			builder = builder.renewal_period(Duration::seconds(secs));
		}
		if let Some(raw) = lookup(UNAUTHORIZED_POLICY_VAR) {
			builder = builder.unauthorized_policy(raw.parse()?);
		}

		builder.build()
	}

	/// Renewal period as a std duration suitable for timers.
	pub fn renewal_interval(&self) -> std::time::Duration {
		self.renewal_period.unsigned_abs()
	}
}

/// Builder for [`CoordinatorConfig`] values.
#[derive(Debug)]
pub struct CoordinatorConfigBuilder {
	/// Raw publishable key, validated on build.
	pub publishable_key: String,
	/// Optional API base override.
	pub api_base: Option<Url>,
	/// Authorization-check path.
	pub admin_check_path: String,
	/// Renewal period.
	pub renewal_period: Duration,
	/// Unauthorized-response policy.
	pub unauthorized_policy: UnauthorizedPolicy,
}
impl CoordinatorConfigBuilder {
	/// Creates a new builder seeded with the provided publishable key.
	pub fn new(publishable_key: impl Into<String>) -> Self {
		Self {
			publishable_key: publishable_key.into(),
			api_base: None,
			admin_check_path: CoordinatorConfig::DEFAULT_ADMIN_CHECK_PATH.into(),
			renewal_period: CoordinatorConfig::DEFAULT_RENEWAL_PERIOD,
			unauthorized_policy: UnauthorizedPolicy::default(),
		}
	}

	/// Sets the API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Overrides the authorization-check path.
	pub fn admin_check_path(mut self, path: impl Into<String>) -> Self {
		self.admin_check_path = path.into();

		self
	}

	/// Overrides the renewal period.
	pub fn renewal_period(mut self, period: Duration) -> Self {
		self.renewal_period = period;

		self
	}

	/// Overrides the unauthorized-response policy.
	pub fn unauthorized_policy(mut self, policy: UnauthorizedPolicy) -> Self {
		self.unauthorized_policy = policy;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<CoordinatorConfig, ConfigError> {
		let publishable_key = PublishableKey::new(self.publishable_key)?;
		let api_base = match self.api_base {
			Some(url) => url,
			None => Url::parse(CoordinatorConfig::DEFAULT_API_BASE)
				.map_err(|source| ConfigError::InvalidApiBase { source })?,
		};
		let api_base = normalize_base(api_base)?;

		if !self.renewal_period.is_positive() {
			return Err(ConfigError::NonPositiveRenewalPeriod);
		}

		Ok(CoordinatorConfig {
			publishable_key,
			api_base,
			admin_check_path: self.admin_check_path.trim_start_matches('/').to_owned(),
			renewal_period: self.renewal_period,
			unauthorized_policy: self.unauthorized_policy,
		})
	}
}

fn normalize_base(mut url: Url) -> Result<Url, ConfigError> {
	if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
		return Err(ConfigError::UnsupportedApiBase { url: url.to_string() });
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	Ok(url)
}
