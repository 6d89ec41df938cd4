//! Sign-in snapshots and the watch-based feed that publishes their transitions.

// crates.io
use tokio::sync::watch;
// self
use crate::{_prelude::*, auth::UserId};

/// Sign-in snapshot reported by a credential source.
///
/// A signed-out session never carries an identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	signed_in: bool,
	identity: Option<UserId>,
}
impl Session {
	/// Builds a snapshot, dropping the identity when `signed_in` is false.
	pub fn new(signed_in: bool, identity: Option<UserId>) -> Self {
		Self { signed_in, identity: identity.filter(|_| signed_in) }
	}

	/// Signed-in session bound to `identity`.
	pub fn signed_in(identity: UserId) -> Self {
		Self { signed_in: true, identity: Some(identity) }
	}

	/// Signed-out session.
	pub fn signed_out() -> Self {
		Self::default()
	}

	/// Whether the user is signed in.
	pub fn is_signed_in(&self) -> bool {
		self.signed_in
	}

	/// Identity of the signed-in user, if known.
	pub fn identity(&self) -> Option<&UserId> {
		self.identity.as_ref()
	}
}

/// Publisher side of a sign-in subscription.
///
/// Credential sources embed a feed and call [`SessionFeed::publish`] whenever the identity
/// provider reports a change; coordinators consume [`SessionFeed::subscribe`]. Publishing a
/// value equal to the current one does not wake subscribers.
#[derive(Debug)]
pub struct SessionFeed(watch::Sender<Session>);
impl SessionFeed {
	/// Creates a feed seeded with `initial`.
	pub fn new(initial: Session) -> Self {
		Self(watch::Sender::new(initial))
	}

	/// Publishes a new snapshot; returns `true` when it differed from the previous one.
	pub fn publish(&self, session: Session) -> bool {
		self.0.send_if_modified(|current| {
			if *current == session {
				false
			} else {
				*current = session;

				true
			}
		})
	}

	/// Returns the latest snapshot.
	pub fn current(&self) -> Session {
		self.0.borrow().clone()
	}

	/// Subscribes to future snapshots.
	pub fn subscribe(&self) -> watch::Receiver<Session> {
		self.0.subscribe()
	}
}
impl Default for SessionFeed {
	fn default() -> Self {
		Self::new(Session::signed_out())
	}
}
