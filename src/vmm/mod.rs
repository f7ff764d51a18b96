//! Safe wrapper around a native VMM handle.

use std::{
	ffi::CString,
	os::raw::c_void,
	ptr::NonNull,
	sync::Arc
};

use thiserror::Error;

pub mod args;
pub mod module;

pub use args::InitArgs;
pub use module::{ModuleInfo, ModuleType};

use crate::{
	common::{Address, Pid},
	ffi::{self, RawVmmHandle, VmmFunctions},
	library::VmmLibrary,
	memory::{
		access::{native_size, ReadError, WriteError},
		flags::ReadFlags
	},
	process::Process,
	scatter::{ScatterError, ScatterHandle}
};

#[derive(Debug, Error)]
pub enum VmmError {
	#[error("VMMDLL_Initialize failed")]
	InitializeFailed,
	#[error("argument {0:?} contains a nul byte")]
	InvalidArgument(String),
	#[error("process {0:?} not found")]
	ProcessNotFound(String),
	#[error("module {name:?} not found in process {pid}")]
	ModuleNotFound { pid: Pid, name: String },
	#[error("symbol {module}!{function} not found in process {pid}")]
	SymbolNotFound {
		pid: Pid,
		module: String,
		function: String
	},
	#[error(transparent)]
	Read(#[from] ReadError),
	#[error(transparent)]
	Write(#[from] WriteError)
}

fn c_string(value: &str) -> Result<CString, VmmError> {
	CString::new(value).map_err(|_| VmmError::InvalidArgument(value.to_string()))
}

/// An initialized native VMM handle.
///
/// Every method is a direct call of the matching native export. The handle is closed on drop.
pub struct Vmm {
	library: Arc<VmmLibrary>,
	handle: NonNull<c_void>
}
// The native library accepts concurrent calls on one handle.
unsafe impl Send for Vmm {}
unsafe impl Sync for Vmm {}
impl Vmm {
	/// Initializes a new handle, `VMMDLL_Initialize`.
	pub fn initialize(library: Arc<VmmLibrary>, args: &InitArgs) -> Result<Self, VmmError> {
		let mut native = args.to_native()?;
		log::debug!("initializing vmm with {:?}", &args.args()[1 ..]);

		let handle = unsafe { (library.functions().initialize)(native.argc(), native.argv()) };
		match NonNull::new(handle) {
			None => {
				log::warn!("VMMDLL_Initialize returned a null handle");
				Err(VmmError::InitializeFailed)
			}
			Some(handle) => {
				log::debug!("vmm handle {:p} initialized", handle);
				Ok(Vmm { library, handle })
			}
		}
	}

	/// Takes ownership of an existing native handle.
	///
	/// Returns `None` if `handle` is null.
	///
	/// ## Safety
	/// * `handle` must have been returned by `VMMDLL_Initialize` of `library` and not be closed yet.
	/// * Nothing else may close `handle`.
	pub unsafe fn from_raw(library: Arc<VmmLibrary>, handle: RawVmmHandle) -> Option<Self> {
		Some(Vmm {
			library,
			handle: NonNull::new(handle)?
		})
	}

	/// Releases ownership of the native handle without closing it.
	pub fn into_raw(self) -> RawVmmHandle {
		let this = std::mem::ManuallyDrop::new(self);
		// Safe because `this` is never dropped, so the `Arc` is moved out exactly once
		drop(unsafe { std::ptr::read(&this.library) });

		this.handle.as_ptr()
	}

	pub fn as_raw(&self) -> RawVmmHandle {
		self.handle.as_ptr()
	}

	pub fn library(&self) -> &Arc<VmmLibrary> {
		&self.library
	}

	/// Closes the handle, `VMMDLL_Close`. Same as dropping it.
	pub fn close(self) {
		drop(self)
	}

	fn functions(&self) -> &VmmFunctions {
		self.library.functions()
	}

	/// Looks up a process id by process name, `VMMDLL_PidGetFromName`.
	pub fn pid_from_name(&self, name: &str) -> Result<Pid, VmmError> {
		let c_name = c_string(name)?;

		let mut pid = 0u32;
		let ok = unsafe { (self.functions().pid_get_from_name)(self.as_raw(), c_name.as_ptr(), &mut pid) };
		if ok == ffi::FALSE {
			return Err(VmmError::ProcessNotFound(name.to_string()))
		}

		Ok(Pid::new(pid))
	}

	/// Looks up a module of process `pid` by module name, `VMMDLL_Map_GetModuleFromNameU`.
	///
	/// The native entry is copied and released with `VMMDLL_MemFree` if the library exports it.
	pub fn module_from_name(&self, pid: Pid, name: &str) -> Result<ModuleInfo, VmmError> {
		let c_name = c_string(name)?;

		let mut entry: *mut ffi::ModuleEntry = std::ptr::null_mut();
		let ok = unsafe {
			(self.functions().map_get_module_from_name)(
				self.as_raw(),
				pid.get(),
				c_name.as_ptr(),
				&mut entry,
				ffi::VMMDLL_MODULE_FLAG_NORMAL
			)
		};

		let info = match (ok, entry.is_null()) {
			(ffi::FALSE, _) | (_, true) => None,
			// Safe because the native library returned a valid entry
			_ => Some(unsafe { ModuleInfo::from_entry(&*entry) })
		};

		if !entry.is_null() {
			if let Some(mem_free) = self.functions().mem_free {
				unsafe { mem_free(entry as *mut c_void) };
			}
		}

		info.ok_or_else(|| {
			log::warn!("module {} not found in process {}", name, pid);
			VmmError::ModuleNotFound {
				pid,
				name: name.to_string()
			}
		})
	}

	/// Looks up the address of an exported function, `VMMDLL_ProcessGetProcAddressU`.
	pub fn proc_address(&self, pid: Pid, module: &str, function: &str) -> Result<Address, VmmError> {
		let c_module = c_string(module)?;
		let c_function = c_string(function)?;

		let address = unsafe {
			(self.functions().process_get_proc_address)(
				self.as_raw(),
				pid.get(),
				c_module.as_ptr(),
				c_function.as_ptr()
			)
		};

		Address::non_null(address).ok_or_else(|| VmmError::SymbolNotFound {
			pid,
			module: module.to_string(),
			function: function.to_string()
		})
	}

	/// Reads exactly `buffer.len()` bytes, `VMMDLL_MemRead`.
	pub fn mem_read(&self, pid: Pid, address: Address, buffer: &mut [u8]) -> Result<(), ReadError> {
		let size = native_size(buffer.len()).ok_or(ReadError::TooLarge(buffer.len()))?;
		log::trace!("read {} bytes at {}:{}", size, pid, address);

		let ok = unsafe {
			(self.functions().mem_read)(self.as_raw(), pid.get(), address.get(), buffer.as_mut_ptr(), size)
		};
		if ok == ffi::FALSE {
			return Err(ReadError::Failed {
				address,
				len: buffer.len()
			})
		}

		Ok(())
	}

	/// Reads with explicit cache and paging `flags`, `VMMDLL_MemReadEx`.
	///
	/// Returns the number of bytes read.
	pub fn mem_read_ex(
		&self,
		pid: Pid,
		address: Address,
		buffer: &mut [u8],
		flags: ReadFlags
	) -> Result<usize, ReadError> {
		let size = native_size(buffer.len()).ok_or(ReadError::TooLarge(buffer.len()))?;
		log::trace!("read {} bytes at {}:{} flags {:#x}", size, pid, address, flags.bits());

		let mut read = 0u32;
		let ok = unsafe {
			(self.functions().mem_read_ex)(
				self.as_raw(),
				pid.get(),
				address.get(),
				buffer.as_mut_ptr(),
				size,
				&mut read,
				flags.bits()
			)
		};

		match (ok, read as usize) {
			(ffi::FALSE, 0) => Err(ReadError::Failed {
				address,
				len: buffer.len()
			}),
			(ffi::FALSE, read) => Err(ReadError::Partial {
				address,
				read: read.min(buffer.len()),
				len: buffer.len()
			}),
			(_, read) => Ok(read.min(buffer.len()))
		}
	}

	/// Writes all of `data`, `VMMDLL_MemWrite`.
	pub fn mem_write(&self, pid: Pid, address: Address, data: &[u8]) -> Result<(), WriteError> {
		let size = native_size(data.len()).ok_or(WriteError::TooLarge(data.len()))?;
		log::trace!("write {} bytes at {}:{}", size, pid, address);

		let ok = unsafe {
			(self.functions().mem_write)(self.as_raw(), pid.get(), address.get(), data.as_ptr(), size)
		};
		if ok == ffi::FALSE {
			return Err(WriteError::Failed {
				address,
				len: data.len()
			})
		}

		Ok(())
	}

	/// Starts a scatter session on process `pid`, `VMMDLL_Scatter_Initialize`.
	pub fn scatter<'buf>(&self, pid: Pid, flags: ReadFlags) -> Result<ScatterHandle<'_, 'buf>, ScatterError> {
		ScatterHandle::initialize(self, pid, flags)
	}

	/// View of process `pid`.
	pub fn process(&self, pid: Pid) -> Process<'_> {
		Process::new(self, pid)
	}

	/// View of the process called `name`.
	pub fn process_by_name(&self, name: &str) -> Result<Process<'_>, VmmError> {
		self.pid_from_name(name).map(|pid| self.process(pid))
	}
}
impl Drop for Vmm {
	fn drop(&mut self) {
		log::debug!("closing vmm handle {:p}", self.handle);

		unsafe { (self.functions().close)(self.as_raw()) };
	}
}
impl std::fmt::Debug for Vmm {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("Vmm").field("handle", &self.handle).finish()
	}
}
