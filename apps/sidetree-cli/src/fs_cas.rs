use std::path::PathBuf;

use sidetree_core::cas::{content_address, CasClient, CasError};
use tracing::debug;

/// A [`CasClient`] that stores each blob as a file named by its address.
#[derive(Debug, Clone)]
pub struct FsCas {
	dir: PathBuf,
}

impl FsCas {
	/// Creates `dir` if it doesn't exist yet.
	pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
		let dir = dir.into();
		std::fs::create_dir_all(&dir)?;
		Ok(Self { dir })
	}

	fn path(&self, address: &str) -> Result<PathBuf, CasError> {
		// Addresses are base64url, anything else could escape the directory.
		let valid = !address.is_empty()
			&& address
				.bytes()
				.all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
		if !valid {
			return Err(CasError::NotFound(address.to_owned()));
		}
		Ok(self.dir.join(address))
	}
}

impl CasClient for FsCas {
	fn write(&self, content: &[u8]) -> Result<String, CasError> {
		let address = content_address(content);
		let path = self.path(&address)?;
		std::fs::write(&path, content)?;
		debug!(path = %path.display(), "wrote cas file");
		Ok(address)
	}

	fn read(&self, address: &str) -> Result<Vec<u8>, CasError> {
		let path = self.path(address)?;
		match std::fs::read(path) {
			Ok(content) => Ok(content),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				Err(CasError::NotFound(address.to_owned()))
			}
			Err(e) => Err(e.into()),
		}
	}
}
