use thiserror::Error;

use crate::common::{slice_as_raw_bytes, Address, RawBytes};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadError {
	#[error("could not read {len} bytes at 0x{address}")]
	Failed { address: Address, len: usize },
	#[error("read {read} of {len} bytes at 0x{address}")]
	Partial {
		address: Address,
		read: usize,
		len: usize
	},
	#[error("read of {0} bytes exceeds the native size limit")]
	TooLarge(usize)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WriteError {
	#[error("could not write {len} bytes at 0x{address}")]
	Failed { address: Address, len: usize },
	#[error("write of {0} bytes exceeds the native size limit")]
	TooLarge(usize)
}

/// Converts a buffer length to the native 32-bit size argument.
pub(crate) fn native_size(len: usize) -> Option<u32> {
	u32::try_from(len).ok()
}

/// Trait implemented on abstractions over reading and writing target memory.
pub trait MemoryAccess {
	/// Read exact amount of bytes to fill the `buffer` from `address`.
	fn read(&self, address: Address, buffer: &mut [u8]) -> Result<(), ReadError>;

	/// Write exact amount of bytes from `data` into memory starting at `address`.
	fn write(&self, address: Address, data: &[u8]) -> Result<(), WriteError>;

	/// Reads `len` bytes at `address` into a new vector.
	fn read_vec(&self, address: Address, len: usize) -> Result<Vec<u8>, ReadError> {
		native_size(len).ok_or(ReadError::TooLarge(len))?;

		let mut buffer = vec![0u8; len];
		self.read(address, &mut buffer)?;

		Ok(buffer)
	}

	/// Reads one plain data value at `address`.
	fn read_value<T: RawBytes>(&self, address: Address) -> Result<T, ReadError>
	where
		Self: Sized
	{
		let mut value = T::zeroed();
		self.read(address, value.as_raw_bytes_mut())?;

		Ok(value)
	}

	/// Writes one plain data value at `address`.
	fn write_value<T: RawBytes>(&self, address: Address, value: &T) -> Result<(), WriteError>
	where
		Self: Sized
	{
		self.write(address, value.as_raw_bytes())
	}

	/// Writes consecutive plain data values starting at `address`.
	fn write_values<T: RawBytes>(&self, address: Address, values: &[T]) -> Result<(), WriteError>
	where
		Self: Sized
	{
		self.write(address, slice_as_raw_bytes(values))
	}
}
