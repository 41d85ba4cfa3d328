//! Strongly typed identifiers for portfolios and provider-side accounts.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (portfolio, provider user).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (portfolio, provider user).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (portfolio, provider user).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { PortfolioId, "Identifier of a portfolio owned by the external portfolio store.", "Portfolio" }
def_id! { ProviderUserId, "Account identifier returned by a provider's identity lookup.", "ProviderUser" }

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_padding_and_empty_values() {
		assert!(PortfolioId::new(" p1").is_err(), "Leading whitespace must be rejected.");
		assert!(PortfolioId::new("p1 ").is_err(), "Trailing whitespace must be rejected.");
		assert!(PortfolioId::new("").is_err());
		assert!(ProviderUserId::new("17841400000000000").is_ok());

		let portfolio = PortfolioId::new("p1").expect("Portfolio fixture should be valid.");

		assert_eq!(portfolio.as_ref(), "p1");
		assert_eq!(format!("{portfolio:?}"), "Portfolio(p1)");
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let portfolio: PortfolioId =
			serde_json::from_str("\"portfolio-42\"").expect("Portfolio should deserialize.");

		assert_eq!(portfolio.as_ref(), "portfolio-42");
		assert!(serde_json::from_str::<PortfolioId>("\"with space\"").is_err());
	}

	#[test]
	fn length_limit_is_inclusive() {
		let exact = "a".repeat(IDENTIFIER_MAX_LEN);

		PortfolioId::new(&exact).expect("Exact length should succeed.");

		let too_long = "a".repeat(IDENTIFIER_MAX_LEN + 1);

		assert!(matches!(
			PortfolioId::new(&too_long),
			Err(IdentifierError::TooLong { kind: "Portfolio", max: IDENTIFIER_MAX_LEN })
		));
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<PortfolioId, u8> = HashMap::from_iter([(
			PortfolioId::new("p1").expect("Portfolio used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("p1"), Some(&7));
	}
}
