//! Analytics snapshots served for connected platforms.
//!
//! Only followers come from the stored connection. Engagement figures are placeholders until a
//! real insights integration exists, and they sit behind [`AnalyticsSource`] so that
//! integration can be swapped in without touching the orchestrator.

// self
use crate::{_prelude::*, platform::PlatformId, store::PlatformConnection};

/// Per-platform analytics figures returned to the dashboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
	/// Followers from the stored connection.
	pub followers: u64,
	/// Engagement rate in percent.
	pub engagement_rate: f64,
	/// Published posts.
	pub posts: u64,
	/// Likes across posts.
	pub likes: u64,
	/// Comments across posts.
	pub comments: u64,
	/// Shares across posts.
	pub shares: u64,
}

/// Produces analytics for a connected platform.
pub trait AnalyticsSource
where
	Self: Send + Sync,
{
	/// Builds the snapshot for a row that is known to be connected.
	fn snapshot(&self, connection: &PlatformConnection) -> AnalyticsSnapshot;
}

/// Fixed engagement figures combined with the stored follower count.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaceholderAnalytics;
impl AnalyticsSource for PlaceholderAnalytics {
	fn snapshot(&self, connection: &PlatformConnection) -> AnalyticsSnapshot {
		let followers = connection.followers();

		match connection.platform_id {
			PlatformId::Instagram => AnalyticsSnapshot {
				followers,
				engagement_rate: 4.2,
				posts: 45,
				likes: 1250,
				comments: 89,
				shares: 23,
			},
			PlatformId::Linkedin => AnalyticsSnapshot {
				followers,
				engagement_rate: 3.8,
				posts: 28,
				likes: 890,
				comments: 156,
				shares: 67,
			},
		}
	}
}
