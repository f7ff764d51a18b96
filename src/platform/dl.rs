use std::{
	ffi::{CStr, CString},
	os::{raw::c_void, unix::ffi::OsStrExt},
	path::{Path, PathBuf},
	ptr::NonNull
};

use thiserror::Error;

use crate::{ffi::SymbolSource, library::LoadError};

#[derive(Debug, Error)]
pub enum DlError {
	#[error("library path {0:?} contains a nul byte")]
	InvalidPath(PathBuf),
	#[error("dlopen({path:?}) failed: {message}")]
	Open { path: PathBuf, message: String }
}
impl From<DlError> for LoadError {
	fn from(err: DlError) -> Self {
		LoadError::PlatformError(Box::new(err))
	}
}

/// Shared object opened with `dlopen`.
///
/// The object is closed with `dlclose` on drop.
#[derive(Debug)]
pub struct DlLibrary {
	handle: NonNull<c_void>,
	path: PathBuf
}
impl DlLibrary {
	/// Opens the shared object at `path` binding all symbols immediately.
	///
	/// With `global` the symbols of the object become available for symbol resolution of
	/// subsequently loaded objects, which is what lets `vmm.so` bind to an already loaded `leechcore.so`.
	pub fn open(path: &Path, global: bool) -> Result<Self, DlError> {
		let c_path = CString::new(path.as_os_str().as_bytes())
			.map_err(|_| DlError::InvalidPath(path.to_path_buf()))?;

		let mode = libc::RTLD_NOW | if global { libc::RTLD_GLOBAL } else { libc::RTLD_LOCAL };
		let handle = unsafe { libc::dlopen(c_path.as_ptr(), mode) };

		match NonNull::new(handle) {
			None => Err(DlError::Open {
				path: path.to_path_buf(),
				message: Self::last_error().unwrap_or_else(|| "unknown error".to_string())
			}),
			Some(handle) => Ok(DlLibrary {
				handle,
				path: path.to_path_buf()
			})
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn last_error() -> Option<String> {
		// dlerror returns a thread local message and resets it
		let message = unsafe { libc::dlerror() };
		if message.is_null() {
			return None
		}

		Some(unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned())
	}
}
impl SymbolSource for DlLibrary {
	fn symbol(&self, name: &CStr) -> Option<*const c_void> {
		let symbol = unsafe { libc::dlsym(self.handle.as_ptr(), name.as_ptr()) };

		if symbol.is_null() {
			// clear the pending error so it does not leak into the next `open`
			Self::last_error();
			None
		} else {
			Some(symbol as *const c_void)
		}
	}
}
impl Drop for DlLibrary {
	fn drop(&mut self) {
		if unsafe { libc::dlclose(self.handle.as_ptr()) } != 0 {
			log::warn!(
				"dlclose({}) failed: {}",
				self.path.display(),
				Self::last_error().unwrap_or_default()
			);
		}
	}
}

#[cfg(test)]
mod test {
	use std::path::Path;

	use super::{DlError, DlLibrary};

	#[test]
	fn test_open_missing() {
		let err = DlLibrary::open(Path::new("/nonexistent/vmmdll/vmm.so"), false).unwrap_err();

		match err {
			DlError::Open { path, message } => {
				assert_eq!(path, Path::new("/nonexistent/vmmdll/vmm.so"));
				assert!(!message.is_empty());
			}
			other => panic!("unexpected error {}", other)
		}
	}

	#[test]
	fn test_open_nul_path() {
		let err = DlLibrary::open(Path::new("vmm\0.so"), false).unwrap_err();

		assert!(matches!(err, DlError::InvalidPath(_)));
	}
}
