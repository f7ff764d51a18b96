//! This module contains best-effort abstraction over platform specific implementations
//! in the parent module.
//!
//! For each supported platform, this module exports uniformly named types and constants
//! for opening the native libraries.

#[cfg(unix)]
mod inner {
	use super::super::dl;

	pub type SimpleLibrary = dl::DlLibrary;
	pub type SimpleLibraryError = dl::DlError;
}

#[cfg(windows)]
mod inner {
	use super::super::win32;

	pub type SimpleLibrary = win32::Win32Library;
	pub type SimpleLibraryError = win32::Win32LibraryError;
}

pub use inner::{SimpleLibrary, SimpleLibraryError};

#[cfg(windows)]
pub const LEECHCORE_FILE_NAME: &str = "leechcore.dll";
#[cfg(windows)]
pub const VMM_FILE_NAME: &str = "vmm.dll";

#[cfg(target_os = "macos")]
pub const LEECHCORE_FILE_NAME: &str = "leechcore.dylib";
#[cfg(target_os = "macos")]
pub const VMM_FILE_NAME: &str = "vmm.dylib";

#[cfg(all(unix, not(target_os = "macos")))]
pub const LEECHCORE_FILE_NAME: &str = "leechcore.so";
#[cfg(all(unix, not(target_os = "macos")))]
pub const VMM_FILE_NAME: &str = "vmm.so";
