use std::{
	ffi::CStr,
	os::{raw::c_void, windows::ffi::OsStrExt},
	path::{Path, PathBuf}
};

use thiserror::Error;
use windows_sys::Win32::{
	Foundation::{FreeLibrary, HMODULE},
	System::LibraryLoader::{GetProcAddress, LoadLibraryW}
};

use crate::{ffi::SymbolSource, library::LoadError};

#[derive(Debug, Error)]
pub enum Win32LibraryError {
	#[error("LoadLibraryW({path:?}) failed")]
	Open {
		path: PathBuf,
		#[source]
		source: std::io::Error
	}
}
impl From<Win32LibraryError> for LoadError {
	fn from(err: Win32LibraryError) -> Self {
		LoadError::PlatformError(Box::new(err))
	}
}

/// Dll loaded with `LoadLibraryW`.
///
/// The module is released with `FreeLibrary` on drop.
#[derive(Debug)]
pub struct Win32Library {
	module: HMODULE,
	path: PathBuf
}
impl Win32Library {
	/// Loads the dll at `path`.
	///
	/// Windows resolves imports against already loaded modules by name, so `global` has no meaning here.
	pub fn open(path: &Path, _global: bool) -> Result<Self, Win32LibraryError> {
		let wide: Vec<u16> = path.as_os_str().encode_wide().chain(std::iter::once(0)).collect();

		let module = unsafe { LoadLibraryW(wide.as_ptr()) };
		if module.is_null() {
			return Err(Win32LibraryError::Open {
				path: path.to_path_buf(),
				source: std::io::Error::last_os_error()
			})
		}

		Ok(Win32Library {
			module,
			path: path.to_path_buf()
		})
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}
impl SymbolSource for Win32Library {
	fn symbol(&self, name: &CStr) -> Option<*const c_void> {
		let proc = unsafe { GetProcAddress(self.module, name.as_ptr() as *const u8) }?;

		Some(proc as *const c_void)
	}
}
impl Drop for Win32Library {
	fn drop(&mut self) {
		if unsafe { FreeLibrary(self.module) } == 0 {
			log::warn!(
				"FreeLibrary({}) failed: {}",
				self.path.display(),
				std::io::Error::last_os_error()
			);
		}
	}
}
