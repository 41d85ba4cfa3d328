//! Registry of authorization requests waiting for their callback.
//!
//! Every request is keyed by its `state` token and owns a `watch` channel that publishes the
//! attempt's status, so the UI side can await completion instead of polling. Entries are
//! claimed exactly once; claimed, cancelled, and expired entries stay visible for one extra TTL
//! so late callbacks and waiters observe the terminal status, then get pruned.

// crates.io
use tokio::sync::watch;
// self
use crate::{
	_prelude::*,
	auth::PortfolioId,
	callback::CompletionMode,
	error::ErrorKind,
	flows::{ConnectSummary, PendingCommit},
	platform::PlatformId,
};

/// An issued authorization request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
	/// Platform being linked.
	pub platform_id: PlatformId,
	/// Portfolio being linked.
	pub portfolio_id: PortfolioId,
	/// Redirect URI registered with the provider; replayed during the exchange.
	pub redirect_uri: Url,
	/// URL the popup should open.
	pub auth_url: Url,
	/// Correlation token sent as the OAuth `state` parameter.
	pub state: String,
	/// How the UI launched the authorization page.
	pub launch_mode: CompletionMode,
	/// Issue instant.
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	/// Instant after which callbacks are rejected.
	#[serde(with = "time::serde::rfc3339")]
	pub expires_at: OffsetDateTime,
}
impl AuthorizationRequest {
	/// Returns true once `now` is past the expiry.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now >= self.expires_at
	}
}

/// Status published for an attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttemptStatus {
	/// Waiting for the callback or still exchanging.
	Pending,
	/// Connection committed.
	Connected(ConnectSummary),
	/// Attempt ended with an error.
	Failed {
		/// Error classification.
		kind: ErrorKind,
		/// User-facing message.
		message: String,
		/// Write to replay when the attempt failed at the commit.
		#[serde(skip)]
		pending: Option<PendingCommit>,
	},
}
impl AttemptStatus {
	/// Returns true for every status except [`AttemptStatus::Pending`].
	pub fn is_terminal(&self) -> bool {
		!matches!(self, AttemptStatus::Pending)
	}
}

/// Why a request could not be claimed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ClaimError {
	Unknown,
	AlreadyClaimed,
	Cancelled,
	Expired,
	Failed(ErrorKind),
}

#[derive(Debug)]
struct PendingEntry {
	request: AuthorizationRequest,
	status: Arc<watch::Sender<AttemptStatus>>,
	claimed: bool,
}

/// Shared registry of in-flight authorization requests.
#[derive(Clone, Debug)]
pub(crate) struct PendingAuthorizations {
	entries: Arc<Mutex<HashMap<String, PendingEntry>>>,
	retention: Duration,
}
impl PendingAuthorizations {
	pub(crate) fn new(retention: Duration) -> Self {
		Self { entries: Default::default(), retention }
	}

	pub(crate) fn register(&self, request: AuthorizationRequest) {
		let now = OffsetDateTime::now_utc();
		let mut entries = self.entries.lock();

		self.prune_locked(&mut entries, now);

		let (status, _) = watch::channel(AttemptStatus::Pending);

		entries.insert(
			request.state.clone(),
			PendingEntry { request, status: Arc::new(status), claimed: false },
		);
	}

	/// Claims the request registered under `state`.
	pub(crate) fn claim(&self, state: &str, now: OffsetDateTime) -> Result<AttemptTicket, ClaimError> {
		let mut entries = self.entries.lock();
		let entry = entries.get_mut(state).ok_or(ClaimError::Unknown)?;

		Self::claim_entry(entry, now)
	}

	/// Claims the newest unclaimed request for the pair; used for callbacks without `state`.
	pub(crate) fn claim_pair(
		&self,
		portfolio_id: &PortfolioId,
		platform_id: PlatformId,
		now: OffsetDateTime,
	) -> Result<AttemptTicket, ClaimError> {
		let mut entries = self.entries.lock();
		let entry = entries
			.values_mut()
			.filter(|entry| {
				entry.request.portfolio_id == *portfolio_id
					&& entry.request.platform_id == platform_id
					&& !entry.claimed
					&& !entry.status.borrow().is_terminal()
			})
			.max_by_key(|entry| entry.request.issued_at)
			.ok_or(ClaimError::Unknown)?;

		Self::claim_entry(entry, now)
	}

	/// Cancels an unclaimed request. Returns false when nothing was pending under `state`.
	pub(crate) fn cancel(&self, state: &str, reason: &str) -> bool {
		let entries = self.entries.lock();
		let Some(entry) = entries.get(state) else {
			return false;
		};

		if entry.claimed || entry.status.borrow().is_terminal() {
			return false;
		}

		entry.status.send_replace(AttemptStatus::Failed {
			kind: ErrorKind::UserCancelled,
			message: reason.to_owned(),
			pending: None,
		});

		true
	}

	/// Status receiver and expiry for the request registered under `state`.
	pub(crate) fn subscribe(
		&self,
		state: &str,
	) -> Option<(watch::Receiver<AttemptStatus>, OffsetDateTime)> {
		self.entries
			.lock()
			.get(state)
			.map(|entry| (entry.status.subscribe(), entry.request.expires_at))
	}

	pub(crate) fn prune(&self, now: OffsetDateTime) {
		let mut entries = self.entries.lock();

		self.prune_locked(&mut entries, now);
	}

	fn prune_locked(&self, entries: &mut HashMap<String, PendingEntry>, now: OffsetDateTime) {
		entries.retain(|_, entry| now < entry.request.expires_at + self.retention);
	}

	fn claim_entry(entry: &mut PendingEntry, now: OffsetDateTime) -> Result<AttemptTicket, ClaimError> {
		if let AttemptStatus::Failed { kind, .. } = &*entry.status.borrow() {
			return Err(match kind {
				ErrorKind::UserCancelled => ClaimError::Cancelled,
				kind => ClaimError::Failed(*kind),
			});
		}
		if entry.claimed {
			return Err(ClaimError::AlreadyClaimed);
		}
		if entry.request.is_expired_at(now) {
			entry.status.send_replace(AttemptStatus::Failed {
				kind: ErrorKind::UserCancelled,
				message: "Authorization request expired.".into(),
				pending: None,
			});

			return Err(ClaimError::Expired);
		}

		entry.claimed = true;

		Ok(AttemptTicket { request: entry.request.clone(), status: entry.status.clone(), done: false })
	}
}

/// Exclusive right to finish a claimed attempt.
///
/// Dropping a ticket without finishing it publishes an internal failure so waiters never hang.
#[derive(Debug)]
pub(crate) struct AttemptTicket {
	pub(crate) request: AuthorizationRequest,
	status: Arc<watch::Sender<AttemptStatus>>,
	done: bool,
}
impl AttemptTicket {
	pub(crate) fn complete(mut self, summary: ConnectSummary) {
		self.finish(AttemptStatus::Connected(summary));
	}

	pub(crate) fn fail(mut self, kind: ErrorKind, message: impl Into<String>) {
		self.finish(AttemptStatus::Failed { kind, message: message.into(), pending: None });
	}

	/// Publishes `err`, keeping its pending commit for observers.
	pub(crate) fn fail_with(mut self, err: &Error) {
		self.finish(AttemptStatus::Failed {
			kind: err.kind(),
			message: err.user_message(),
			pending: err.pending_commit().cloned(),
		});
	}

	fn finish(&mut self, status: AttemptStatus) {
		self.done = true;
		self.status.send_replace(status);
	}
}
impl Drop for AttemptTicket {
	fn drop(&mut self) {
		if !self.done {
			self.status.send_replace(AttemptStatus::Failed {
				kind: ErrorKind::Internal,
				message: "Connection attempt was abandoned.".into(),
				pending: None,
			});
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn request(state: &str, issued_at: OffsetDateTime, ttl: Duration) -> AuthorizationRequest {
		let url = Url::parse("https://app.example.com/auth/callback").expect("Fixture URL should parse.");

		AuthorizationRequest {
			platform_id: PlatformId::Instagram,
			portfolio_id: PortfolioId::new("p1").expect("Portfolio fixture should be valid."),
			redirect_uri: url.clone(),
			auth_url: url,
			state: state.into(),
			launch_mode: CompletionMode::Popup,
			issued_at,
			expires_at: issued_at + ttl,
		}
	}

	#[test]
	fn requests_are_claimed_once() {
		let now = OffsetDateTime::now_utc();
		let pending = PendingAuthorizations::new(Duration::minutes(5));

		pending.register(request("s1", now, Duration::minutes(5)));

		let ticket = pending.claim("s1", now).expect("First claim should succeed.");

		assert_eq!(ticket.request.state, "s1");
		assert_eq!(pending.claim("s1", now).err(), Some(ClaimError::AlreadyClaimed));
		assert_eq!(pending.claim("nope", now).err(), Some(ClaimError::Unknown));
		assert!(!pending.cancel("s1", "closed"), "Claimed requests cannot be cancelled.");
	}

	#[test]
	fn cancelled_and_expired_requests_reject_claims() {
		let now = OffsetDateTime::now_utc();
		let pending = PendingAuthorizations::new(Duration::minutes(5));

		pending.register(request("cancel-me", now, Duration::minutes(5)));
		pending.register(request("stale", now - Duration::minutes(10), Duration::minutes(5)));

		assert!(pending.cancel("cancel-me", "Popup closed."));
		assert_eq!(pending.claim("cancel-me", now).err(), Some(ClaimError::Cancelled));
		assert_eq!(pending.claim("stale", now).err(), Some(ClaimError::Expired));
		assert_eq!(pending.claim("stale", now).err(), Some(ClaimError::Cancelled));
	}

	#[test]
	fn dropped_tickets_publish_failure() {
		let now = OffsetDateTime::now_utc();
		let pending = PendingAuthorizations::new(Duration::minutes(5));

		pending.register(request("s1", now, Duration::minutes(5)));

		let (receiver, _) = pending.subscribe("s1").expect("Registered state should subscribe.");

		drop(pending.claim("s1", now).expect("Claim should succeed."));

		assert!(matches!(
			&*receiver.borrow(),
			AttemptStatus::Failed { kind: ErrorKind::Internal, .. }
		));
	}

	#[test]
	fn legacy_claims_pick_the_newest_request_and_prune_drops_old_entries() {
		let now = OffsetDateTime::now_utc();
		let pending = PendingAuthorizations::new(Duration::minutes(5));

		pending.register(request("older", now - Duration::minutes(1), Duration::minutes(5)));
		pending.register(request("newer", now, Duration::minutes(5)));

		let portfolio = PortfolioId::new("p1").expect("Portfolio fixture should be valid.");
		let ticket = pending
			.claim_pair(&portfolio, PlatformId::Instagram, now)
			.expect("Pair claim should succeed.");

		assert_eq!(ticket.request.state, "newer");

		ticket.fail(ErrorKind::MissingCallbackData, "missing code");
		pending.prune(now + Duration::minutes(11));

		assert!(pending.subscribe("older").is_none());
	}

	#[test]
	fn persistence_failures_publish_the_pending_commit() {
		let now = OffsetDateTime::now_utc();
		let pending = PendingAuthorizations::new(Duration::minutes(5));

		pending.register(request("s1", now, Duration::minutes(5)));

		let (receiver, _) = pending.subscribe("s1").expect("Registered state should subscribe.");
		let update = crate::store::ConnectionUpdate::connected(
			PortfolioId::new("p1").expect("Portfolio fixture should be valid."),
			PlatformId::Instagram,
			420,
			None,
			None,
		);
		let err = Error::Persistence {
			source: crate::store::StoreError::Backend { message: "disk full".into() },
			pending: Box::new(PendingCommit::new(update.clone())),
		};

		pending.claim("s1", now).expect("Claim should succeed.").fail_with(&err);

		match &*receiver.borrow() {
			AttemptStatus::Failed { kind, pending: Some(commit), .. } => {
				assert_eq!(*kind, ErrorKind::Persistence);
				assert_eq!(commit.update(), &update);
			},
			status => panic!("Expected a persistence failure, got {status:?}."),
		}
	}
}
