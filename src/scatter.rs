//! Scatter sessions batch many small memory accesses into one device round trip.
//!
//! Reads are first prepared, then executed together, then picked up one by one:
//! ```no_run
//! # use vmmdll::prelude::*;
//! # fn scan(process: Process) -> Result<(), ScatterError> {
//! let mut scatter = process.scatter(ReadFlags::NOCACHE)?;
//! scatter.prepare(Address::new(0x7ff6_1000), 8)?;
//! scatter.prepare(Address::new(0x7ff6_2000), 8)?;
//! scatter.execute_read()?;
//!
//! let first: u64 = scatter.read_value(Address::new(0x7ff6_1000))?;
//! # Ok(())
//! # }
//! ```

use std::{marker::PhantomData, os::raw::c_void, ptr::NonNull};

use thiserror::Error;

use crate::{
	common::{Address, Pid, RawBytes},
	ffi::{self, RawScatterHandle, VmmFunctions},
	memory::{access::native_size, flags::ReadFlags},
	vmm::Vmm
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScatterError {
	#[error("VMMDLL_Scatter_Initialize failed for process {0}")]
	InitializeFailed(Pid),
	#[error("could not prepare read of {len} bytes at 0x{address}")]
	PrepareFailed { address: Address, len: usize },
	#[error("could not prepare write of {len} bytes at 0x{address}")]
	PrepareWriteFailed { address: Address, len: usize },
	#[error("scatter execute failed")]
	ExecuteFailed,
	#[error("could not read {len} bytes at 0x{address} from the scatter session")]
	ReadFailed { address: Address, len: usize },
	#[error("could not clear the scatter session")]
	ClearFailed,
	#[error("scatter access of {0} bytes exceeds the native size limit")]
	TooLarge(usize)
}

fn scatter_size(len: usize) -> Result<u32, ScatterError> {
	native_size(len).ok_or(ScatterError::TooLarge(len))
}

/// Native scatter session, closed on drop.
///
/// Buffers handed to [`prepare_ex`](ScatterHandle::prepare_ex) are filled by the native library during
/// execute, so they stay borrowed for `'buf` until the session is dropped.
///
/// The session is confined to the thread that created it.
pub struct ScatterHandle<'vmm, 'buf> {
	vmm: &'vmm Vmm,
	handle: NonNull<c_void>,
	pid: Pid,
	_buffers: PhantomData<&'buf mut [u8]>
}
impl<'vmm, 'buf> ScatterHandle<'vmm, 'buf> {
	pub(crate) fn initialize(vmm: &'vmm Vmm, pid: Pid, flags: ReadFlags) -> Result<Self, ScatterError> {
		let handle = unsafe {
			(vmm.library().functions().scatter_initialize)(vmm.as_raw(), pid.get(), flags.scatter_bits())
		};

		match NonNull::new(handle) {
			None => Err(ScatterError::InitializeFailed(pid)),
			Some(handle) => {
				log::debug!("scatter session {:p} on process {} flags {:#x}", handle, pid, flags.bits());

				Ok(ScatterHandle {
					vmm,
					handle,
					pid,
					_buffers: PhantomData
				})
			}
		}
	}

	fn functions(&self) -> &VmmFunctions {
		self.vmm.library().functions()
	}

	pub fn as_raw(&self) -> RawScatterHandle {
		self.handle.as_ptr()
	}

	/// Process the session currently targets.
	pub fn pid(&self) -> Pid {
		self.pid
	}

	/// Queues a read of `len` bytes, `VMMDLL_Scatter_Prepare`.
	///
	/// The data is picked up with [`read`](ScatterHandle::read) after execution.
	pub fn prepare(&mut self, address: Address, len: usize) -> Result<(), ScatterError> {
		let size = scatter_size(len)?;

		let ok = unsafe { (self.functions().scatter_prepare)(self.as_raw(), address.get(), size) };
		if ok == ffi::FALSE {
			return Err(ScatterError::PrepareFailed { address, len })
		}

		Ok(())
	}

	/// Queues a read directly into `buffer`, `VMMDLL_Scatter_PrepareEx`.
	///
	/// `bytes_read` receives the number of bytes actually read on execute.
	pub fn prepare_ex(
		&mut self,
		address: Address,
		buffer: &'buf mut [u8],
		bytes_read: Option<&'buf mut u32>
	) -> Result<(), ScatterError> {
		let size = scatter_size(buffer.len())?;
		let bytes_read = bytes_read.map_or(std::ptr::null_mut(), |r| r as *mut u32);

		let ok = unsafe {
			(self.functions().scatter_prepare_ex)(
				self.as_raw(),
				address.get(),
				size,
				buffer.as_mut_ptr(),
				bytes_read
			)
		};
		if ok == ffi::FALSE {
			return Err(ScatterError::PrepareFailed {
				address,
				len: buffer.len()
			})
		}

		Ok(())
	}

	/// Queues a write of `data`, `VMMDLL_Scatter_PrepareWrite`.
	///
	/// The native library copies `data`, it is only written on [`execute`](ScatterHandle::execute).
	pub fn prepare_write(&mut self, address: Address, data: &[u8]) -> Result<(), ScatterError> {
		let size = scatter_size(data.len())?;

		let ok = unsafe {
			(self.functions().scatter_prepare_write)(self.as_raw(), address.get(), data.as_ptr(), size)
		};
		if ok == ffi::FALSE {
			return Err(ScatterError::PrepareWriteFailed {
				address,
				len: data.len()
			})
		}

		Ok(())
	}

	/// Executes all prepared reads and writes, `VMMDLL_Scatter_Execute`.
	pub fn execute(&mut self) -> Result<(), ScatterError> {
		log::trace!("scatter {:p} execute", self.handle);

		match unsafe { (self.functions().scatter_execute)(self.as_raw()) } {
			ffi::FALSE => Err(ScatterError::ExecuteFailed),
			_ => Ok(())
		}
	}

	/// Executes only the prepared reads, `VMMDLL_Scatter_ExecuteRead`.
	pub fn execute_read(&mut self) -> Result<(), ScatterError> {
		log::trace!("scatter {:p} execute read", self.handle);

		match unsafe { (self.functions().scatter_execute_read)(self.as_raw()) } {
			ffi::FALSE => Err(ScatterError::ExecuteFailed),
			_ => Ok(())
		}
	}

	/// Copies executed data into `buffer`, `VMMDLL_Scatter_Read`.
	///
	/// Returns the number of bytes read, which may be less than `buffer.len()`.
	pub fn read(&self, address: Address, buffer: &mut [u8]) -> Result<usize, ScatterError> {
		let size = scatter_size(buffer.len())?;

		let mut read = 0u32;
		let ok = unsafe {
			(self.functions().scatter_read)(self.as_raw(), address.get(), size, buffer.as_mut_ptr(), &mut read)
		};
		if ok == ffi::FALSE {
			return Err(ScatterError::ReadFailed {
				address,
				len: buffer.len()
			})
		}

		Ok(read as usize)
	}

	/// Like [`read`](ScatterHandle::read) into a new vector truncated to the bytes read.
	pub fn read_vec(&self, address: Address, len: usize) -> Result<Vec<u8>, ScatterError> {
		scatter_size(len)?;

		let mut buffer = vec![0u8; len];
		let read = self.read(address, &mut buffer)?;
		buffer.truncate(read);

		Ok(buffer)
	}

	/// Reads one plain data value, partial reads are an error.
	pub fn read_value<T: RawBytes>(&self, address: Address) -> Result<T, ScatterError> {
		let mut value = T::zeroed();
		let len = std::mem::size_of::<T>();

		match self.read(address, value.as_raw_bytes_mut())? {
			read if read == len => Ok(value),
			_ => Err(ScatterError::ReadFailed { address, len })
		}
	}

	/// Drops all prepared accesses and retargets the session, `VMMDLL_Scatter_Clear`.
	pub fn clear(&mut self, pid: Pid, flags: ReadFlags) -> Result<(), ScatterError> {
		let ok = unsafe { (self.functions().scatter_clear)(self.as_raw(), pid.get(), flags.scatter_bits()) };
		if ok == ffi::FALSE {
			return Err(ScatterError::ClearFailed)
		}
		self.pid = pid;

		Ok(())
	}

	/// Closes the session, `VMMDLL_Scatter_CloseHandle`. Same as dropping it.
	pub fn close(self) {
		drop(self)
	}
}
impl Drop for ScatterHandle<'_, '_> {
	fn drop(&mut self) {
		log::debug!("closing scatter session {:p}", self.handle);

		unsafe { (self.functions().scatter_close_handle)(self.as_raw()) };
	}
}
impl std::fmt::Debug for ScatterHandle<'_, '_> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("ScatterHandle")
			.field("handle", &self.handle)
			.field("pid", &self.pid)
			.finish()
	}
}
