//! Loading of the native library pair.

use std::{
	ffi::OsString,
	path::{Path, PathBuf},
	sync::Arc
};

use thiserror::Error;

use crate::{
	ffi::VmmFunctions,
	platform::simple::{SimpleLibrary, LEECHCORE_FILE_NAME, VMM_FILE_NAME}
};

#[derive(Debug, Error)]
pub enum LoadError {
	#[error("export {0} not found in the vmm library")]
	MissingSymbol(&'static str),
	#[error("platform specific error: {0}")]
	PlatformError(Box<dyn std::error::Error + Send + Sync>)
}

/// Where to find the native libraries.
///
/// By default both libraries are expected in the `lib` directory under the current working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
	directory: PathBuf,
	leechcore_name: String,
	vmm_name: String
}
impl LibraryConfig {
	/// Environment variable overriding the library directory.
	pub const DIRECTORY_ENV: &'static str = "VMMDLL_LIBRARY_DIR";

	pub fn new(directory: impl Into<PathBuf>) -> Self {
		LibraryConfig {
			directory: directory.into(),
			leechcore_name: LEECHCORE_FILE_NAME.to_string(),
			vmm_name: VMM_FILE_NAME.to_string()
		}
	}

	/// Default configuration with the directory taken from [`DIRECTORY_ENV`](LibraryConfig::DIRECTORY_ENV) if it is set.
	pub fn from_env() -> Self {
		Self::with_directory_override(std::env::var_os(Self::DIRECTORY_ENV))
	}

	fn with_directory_override(directory: Option<OsString>) -> Self {
		match directory {
			Some(directory) if !directory.is_empty() => Self::new(directory),
			_ => Self::default()
		}
	}

	pub fn directory(mut self, directory: impl Into<PathBuf>) -> Self {
		self.directory = directory.into();
		self
	}

	pub fn leechcore_name(mut self, name: impl Into<String>) -> Self {
		self.leechcore_name = name.into();
		self
	}

	pub fn vmm_name(mut self, name: impl Into<String>) -> Self {
		self.vmm_name = name.into();
		self
	}

	pub fn library_directory(&self) -> &Path {
		&self.directory
	}

	pub fn leechcore_path(&self) -> PathBuf {
		self.directory.join(&self.leechcore_name)
	}

	pub fn vmm_path(&self) -> PathBuf {
		self.directory.join(&self.vmm_name)
	}
}
impl Default for LibraryConfig {
	fn default() -> Self {
		let working_directory = std::env::current_dir().unwrap_or_default();

		Self::new(working_directory.join("lib"))
	}
}

/// The loaded native libraries together with the resolved entry points.
///
/// Shared through `Arc` by every [`Vmm`](crate::vmm::Vmm) so the code cannot be unloaded
/// while a handle is alive. Libraries are unloaded in reverse load order.
#[derive(Debug)]
pub struct VmmLibrary {
	functions: VmmFunctions,
	// field order is drop order
	vmm: Option<SimpleLibrary>,
	leechcore: Option<SimpleLibrary>
}
// The native library is internally synchronized and the table is immutable.
unsafe impl Send for VmmLibrary {}
unsafe impl Sync for VmmLibrary {}
impl VmmLibrary {
	/// Loads leechcore, then vmm, and resolves the vmm exports.
	///
	/// The acquisition library must be loaded first, the vmm library binds to it on load.
	pub fn load(config: &LibraryConfig) -> Result<Arc<Self>, LoadError> {
		let leechcore_path = config.leechcore_path();
		log::debug!("loading {}", leechcore_path.display());
		let leechcore = SimpleLibrary::open(&leechcore_path, true)?;

		let vmm_path = config.vmm_path();
		log::debug!("loading {}", vmm_path.display());
		let vmm = SimpleLibrary::open(&vmm_path, false)?;

		// Safe because the table is stored next to the library it was resolved from
		let functions = unsafe { VmmFunctions::resolve(&vmm)? };
		log::debug!(
			"resolved {} exports (VMMDLL_MemFree {})",
			VmmFunctions::REQUIRED_SYMBOLS.len(),
			if functions.mem_free.is_some() { "present" } else { "missing" }
		);

		Ok(Arc::new(VmmLibrary {
			functions,
			vmm: Some(vmm),
			leechcore: Some(leechcore)
		}))
	}

	/// Same as [`load`](VmmLibrary::load) with [`LibraryConfig::from_env`].
	pub fn load_default() -> Result<Arc<Self>, LoadError> {
		Self::load(&LibraryConfig::from_env())
	}

	/// Wraps an already resolved table, e.g. of a statically linked library.
	///
	/// ## Safety
	/// * The function pointers must stay valid for the lifetime of the returned value.
	pub unsafe fn from_functions(functions: VmmFunctions) -> Arc<Self> {
		Arc::new(VmmLibrary {
			functions,
			vmm: None,
			leechcore: None
		})
	}

	pub fn functions(&self) -> &VmmFunctions {
		&self.functions
	}

	/// Whether this value owns loaded libraries (as opposed to a table from [`from_functions`](VmmLibrary::from_functions)).
	pub fn owns_libraries(&self) -> bool {
		self.vmm.is_some() && self.leechcore.is_some()
	}

	/// Closes every handle opened through the native library, `VMMDLL_CloseAll`.
	///
	/// ## Safety
	/// * No [`Vmm`](crate::vmm::Vmm) or [`ScatterHandle`](crate::scatter::ScatterHandle) created from this
	///   library may be used afterwards, other than being dropped. The native library ignores closing of
	///   handles it no longer knows.
	pub unsafe fn close_all(&self) {
		log::debug!("closing all vmm handles");
		(self.functions.close_all)();
	}
}
