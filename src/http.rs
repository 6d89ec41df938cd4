//! Outbound request gateway shared by every REST call the client makes.
//!
//! [`RequestGateway`] owns the single installed bearer credential. Requests built through
//! [`RequestGateway::request`] are stamped with whatever credential is installed at build time,
//! so swapping the credential never affects requests already in flight. Responses sent through
//! [`RequestGateway::send`] are inspected for HTTP 401; the gateway never mutates session state
//! in reaction, it only applies the configured [`UnauthorizedPolicy`].

mod metrics;

pub use metrics::GatewayMetrics;
pub use reqwest::Method;

// std
use std::ops::Deref;
// crates.io
use reqwest::{RequestBuilder, Response, StatusCode, header::AUTHORIZATION};
use tokio::sync::Notify;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	config::CoordinatorConfig,
	error::{ConfigError, TransportError},
	obs::{self, Phase},
};

/// Reaction to an HTTP 401 observed by the gateway.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnauthorizedPolicy {
	/// Log the response and hand it back unchanged.
	#[default]
	LogOnly,
	/// Log the response and ask the renewal task for an immediate out-of-band renewal.
	RequestRenewal,
}
impl UnauthorizedPolicy {
	/// Returns a stable label suitable for config values and log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			UnauthorizedPolicy::LogOnly => "log_only",
			UnauthorizedPolicy::RequestRenewal => "request_renewal",
		}
	}
}
impl FromStr for UnauthorizedPolicy {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim() {
			"log_only" => Ok(Self::LogOnly),
			"request_renewal" => Ok(Self::RequestRenewal),
			other => Err(ConfigError::UnknownUnauthorizedPolicy { value: other.to_owned() }),
		}
	}
}
impl Display for UnauthorizedPolicy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Shared HTTP client that stamps the installed credential onto every outbound call.
pub struct RequestGateway {
	client: ReqwestClient,
	api_base: Url,
	admin_check_path: String,
	credential: RwLock<Option<Credential>>,
	policy: UnauthorizedPolicy,
	renewal_signal: Arc<Notify>,
	metrics: GatewayMetrics,
}
impl RequestGateway {
	/// Wraps an existing reqwest client rooted at `api_base`.
	///
	/// `api_base` should end with `/` so relative paths are appended rather than replacing the
	/// last segment; [`CoordinatorConfig`] normalizes this already.
	pub fn with_client(client: ReqwestClient, api_base: Url) -> Self {
		Self {
			client,
			api_base,
			admin_check_path: CoordinatorConfig::DEFAULT_ADMIN_CHECK_PATH.into(),
			credential: RwLock::new(None),
			policy: UnauthorizedPolicy::default(),
			renewal_signal: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Builds a gateway with its own reqwest client from a validated configuration.
	pub fn from_config(config: &CoordinatorConfig) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().build()?;

		Ok(Self::with_client(client, config.api_base.clone())
			.with_admin_check_path(config.admin_check_path.clone())
			.with_unauthorized_policy(config.unauthorized_policy))
	}

	/// Overrides the authorization-check path.
	pub fn with_admin_check_path(mut self, path: impl Into<String>) -> Self {
		self.admin_check_path = path.into();

		self
	}

	/// Overrides the unauthorized-response policy.
	pub fn with_unauthorized_policy(mut self, policy: UnauthorizedPolicy) -> Self {
		self.policy = policy;

		self
	}

	/// Replaces the installed credential; `None` makes subsequent calls unauthenticated.
	pub fn install_credential(&self, credential: Option<Credential>) {
		*self.credential.write() = credential;
	}

	/// Returns a clone of the installed credential.
	pub fn installed_credential(&self) -> Option<Credential> {
		self.credential.read().clone()
	}

	/// Base URL requests are resolved against.
	pub fn api_base(&self) -> &Url {
		&self.api_base
	}

	/// Path of the authorization-check endpoint.
	pub fn admin_check_path(&self) -> &str {
		&self.admin_check_path
	}

	/// Policy applied to HTTP 401 responses.
	pub fn unauthorized_policy(&self) -> UnauthorizedPolicy {
		self.policy
	}

	/// Counters for requests and unauthorized responses.
	pub fn metrics(&self) -> &GatewayMetrics {
		&self.metrics
	}

	/// Signal raised under [`UnauthorizedPolicy::RequestRenewal`]; the renewal task waits on it.
	pub fn renewal_signal(&self) -> Arc<Notify> {
		self.renewal_signal.clone()
	}

	/// Builds a request for `path`, stamped with the currently installed credential.
	pub fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, TransportError> {
		let url = self
			.api_base
			.join(path.trim_start_matches('/'))
			.map_err(|source| TransportError::InvalidPath { path: path.to_owned(), source })?;
		let builder = self.client.request(method, url);

		match self.credential.read().as_ref() {
			Some(credential) => Ok(builder.header(AUTHORIZATION, credential.bearer())),
			None => Ok(builder),
		}
	}

	/// Sends a request and inspects the response for authorization failure.
	pub async fn send(&self, request: RequestBuilder) -> Result<Response, TransportError> {
		self.metrics.record_request();

		let response = request.send().await.inspect_err(|_| {
			self.metrics.record_transport_failure();
		})?;

		if response.status() == StatusCode::UNAUTHORIZED {
			self.on_unauthorized(response.url());
		}

		Ok(response)
	}

	/// Shorthand for building and sending a `GET` request.
	pub async fn get(&self, path: &str) -> Result<Response, TransportError> {
		let request = self.request(Method::GET, path)?;

		self.send(request).await
	}

	fn on_unauthorized(&self, url: &Url) {
		self.metrics.record_unauthorized();
		obs::warn(Phase::Gateway, "unauthorized_response", &format_args!("{url} ({})", self.policy));

		// Wakes only a renewal task already waiting; nothing is stored for a later session.
		if self.policy == UnauthorizedPolicy::RequestRenewal {
			self.renewal_signal.notify_waiters();
		}
	}
}
impl AsRef<ReqwestClient> for RequestGateway {
	fn as_ref(&self) -> &ReqwestClient {
		&self.client
	}
}
impl Deref for RequestGateway {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.client
	}
}
impl Debug for RequestGateway {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestGateway")
			.field("api_base", &self.api_base.as_str())
			.field("credential_installed", &self.credential.read().is_some())
			.field("policy", &self.policy)
			.finish()
	}
}
