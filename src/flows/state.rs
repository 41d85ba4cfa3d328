//! Link attempt state machine.
//!
//! ```text
//! Idle -> AuthorizationIssued -> CodeReceived -> TokenExchanged -> Committed
//!   \_____________\__________________\_______________\______-> Failed(kind)
//! ```
//!
//! `Committed` and `Failed` are terminal; they accept no further events.

// self
use crate::{_prelude::*, error::ErrorKind, obs, platform::PlatformId};

/// Raised when an event does not apply to the current state.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Event {event:?} is not valid in state {state:?}.")]
pub struct InvalidTransition {
	/// State the attempt was in.
	pub state: LinkState,
	/// Event that was rejected.
	pub event: LinkEvent,
}

/// Lifecycle state of one connect attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "kind", rename_all = "snake_case")]
pub enum LinkState {
	/// Nothing issued yet.
	Idle,
	/// Authorization URL handed to the UI.
	AuthorizationIssued,
	/// Callback correlated; the code is in hand.
	CodeReceived,
	/// Provider issued a token and resolved the account.
	TokenExchanged,
	/// Connection row written.
	Committed,
	/// Attempt ended with an error.
	Failed(ErrorKind),
}
impl LinkState {
	/// Returns true for `Committed` and `Failed`.
	pub const fn is_terminal(self) -> bool {
		matches!(self, LinkState::Committed | LinkState::Failed(_))
	}

	/// Applies `event`, returning the next state.
	pub fn on(self, event: LinkEvent) -> Result<LinkState, InvalidTransition> {
		let next = match (self, event) {
			(LinkState::Idle, LinkEvent::AuthorizationIssued) => LinkState::AuthorizationIssued,
			(LinkState::AuthorizationIssued, LinkEvent::CallbackAccepted) => LinkState::CodeReceived,
			(LinkState::CodeReceived, LinkEvent::TokenExchanged) => LinkState::TokenExchanged,
			(LinkState::TokenExchanged, LinkEvent::Committed) => LinkState::Committed,
			(state, LinkEvent::Failed(kind)) if !state.is_terminal() => LinkState::Failed(kind),
			(state, event) => return Err(InvalidTransition { state, event }),
		};

		Ok(next)
	}
}

/// Inputs that advance a [`LinkState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "kind", rename_all = "snake_case")]
pub enum LinkEvent {
	/// Authorization URL built and request registered.
	AuthorizationIssued,
	/// Callback matched a pending request and carried a code.
	CallbackAccepted,
	/// Token exchange and identity lookup succeeded.
	TokenExchanged,
	/// Store accepted the upsert.
	Committed,
	/// Attempt failed.
	Failed(ErrorKind),
}

/// Tracks one attempt's state and logs every transition.
#[derive(Clone, Debug)]
pub struct LinkAttempt {
	platform: PlatformId,
	state: LinkState,
}
impl LinkAttempt {
	/// Starts tracking an attempt in `state`.
	pub fn resume(platform: PlatformId, state: LinkState) -> Self {
		Self { platform, state }
	}

	/// Platform of the attempt.
	pub fn platform(&self) -> PlatformId {
		self.platform
	}

	/// Current state.
	pub fn state(&self) -> LinkState {
		self.state
	}

	/// Applies `event` and logs the transition.
	pub fn advance(&mut self, event: LinkEvent) -> Result<LinkState, InvalidTransition> {
		let next = self.state.on(event)?;

		obs::log_transition(self.platform, self.state, &event, next);

		self.state = next;

		Ok(next)
	}

	/// Moves to `Failed(kind)`; a no-op when the attempt is already terminal.
	pub fn fail(&mut self, kind: ErrorKind) -> LinkState {
		match self.advance(LinkEvent::Failed(kind)) {
			Ok(next) => next,
			Err(_) => self.state,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn happy_path_reaches_committed() {
		let mut attempt = LinkAttempt::resume(PlatformId::Instagram, LinkState::Idle);

		for event in [
			LinkEvent::AuthorizationIssued,
			LinkEvent::CallbackAccepted,
			LinkEvent::TokenExchanged,
			LinkEvent::Committed,
		] {
			attempt.advance(event).expect("Happy path transitions should be accepted.");
		}

		assert_eq!(attempt.state(), LinkState::Committed);
		assert!(attempt.state().is_terminal());
	}

	#[test]
	fn terminal_states_reject_further_events() {
		let err = LinkState::Committed
			.on(LinkEvent::Failed(ErrorKind::Persistence))
			.expect_err("Committed attempts cannot fail afterwards.");

		assert_eq!(err.state, LinkState::Committed);

		let failed = LinkState::CodeReceived
			.on(LinkEvent::Failed(ErrorKind::TokenExchange))
			.expect("Non-terminal states accept failures.");

		assert_eq!(failed, LinkState::Failed(ErrorKind::TokenExchange));
		assert!(failed.on(LinkEvent::TokenExchanged).is_err());
	}

	#[test]
	fn skipping_steps_is_rejected() {
		assert!(LinkState::AuthorizationIssued.on(LinkEvent::TokenExchanged).is_err());
		assert!(LinkState::Idle.on(LinkEvent::CallbackAccepted).is_err());

		let mut attempt = LinkAttempt::resume(PlatformId::Linkedin, LinkState::Committed);

		assert_eq!(attempt.fail(ErrorKind::Internal), LinkState::Committed);
	}
}
