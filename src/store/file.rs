//! Simple file-backed [`ConnectionStore`] for lightweight deployments and demos.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::PortfolioId,
	platform::PlatformId,
	store::{
		ConnectionKey, ConnectionStore, ConnectionUpdate, PlatformConnection, StoreError,
		StoreFuture,
	},
};

/// Persists connection rows to a JSON file after each upsert.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<ConnectionKey, PlatformConnection>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<ConnectionKey, PlatformConnection>, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let rows: Vec<PlatformConnection> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(rows.into_iter().map(|row| (row.key(), row)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(
		&self,
		contents: &HashMap<ConnectionKey, PlatformConnection>,
	) -> Result<(), StoreError> {
		let mut rows = contents.values().collect::<Vec<_>>();

		rows.sort_by(|a, b| {
			(a.portfolio_id.as_ref(), a.platform_id).cmp(&(b.portfolio_id.as_ref(), b.platform_id))
		});

		let serialized = serde_json::to_vec_pretty(&rows).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize connection snapshot: {e}"),
		})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl ConnectionStore for FileStore {
	fn upsert(&self, update: ConnectionUpdate) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let key = update.key();
			let mut guard = self.inner.write();
			let previous = guard.insert(key.clone(), update.into_connection(OffsetDateTime::now_utc()));

			if let Err(e) = self.persist_locked(&guard) {
				match previous {
					Some(row) => guard.insert(key, row),
					None => guard.remove(&key),
				};

				return Err(e);
			}

			Ok(())
		})
	}

	fn get<'a>(
		&'a self,
		portfolio_id: &'a PortfolioId,
		platform_id: PlatformId,
	) -> StoreFuture<'a, Option<PlatformConnection>> {
		Box::pin(async move {
			let key = ConnectionKey::new(portfolio_id, platform_id);

			Ok(self.inner.read().get(&key).cloned())
		})
	}
}
