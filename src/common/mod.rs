//! Common definitions used across this library.

mod raw_bytes;

pub use raw_bytes::{slice_as_raw_bytes, RawBytes};

/// Process identifier as reported by the native library.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[repr(transparent)]
pub struct Pid(u32);
impl Pid {
	/// Pseudo-process which addresses physical memory instead of a virtual address space.
	pub const PHYSICAL: Pid = Pid(u32::MAX);

	/// Bit which tells the native library to include kernel memory in the process address space.
	pub const KERNEL_MEMORY_FLAG: u32 = 0x8000_0000;

	pub const fn new(pid: u32) -> Self {
		Pid(pid)
	}

	pub const fn get(&self) -> u32 {
		self.0
	}

	/// Returns the same process with kernel memory mapped in.
	///
	/// Has no effect on [`Pid::PHYSICAL`].
	pub const fn with_kernel_memory(&self) -> Pid {
		Pid(self.0 | Self::KERNEL_MEMORY_FLAG)
	}

	pub const fn is_physical(&self) -> bool {
		self.0 == Self::PHYSICAL.0
	}
}
impl From<u32> for Pid {
	fn from(pid: u32) -> Self {
		Pid(pid)
	}
}
impl From<Pid> for u32 {
	fn from(pid: Pid) -> Self {
		pid.0
	}
}
impl std::fmt::Display for Pid {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Type to represent an address in the target address space.
///
/// The native library always uses 64-bit addresses regardless of the host pointer width.
/// Zero is a valid address to read from (physical memory starts there), it is only
/// treated as a failure sentinel by lookups.
#[derive(Debug, Copy, Clone, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[repr(transparent)]
pub struct Address(u64);
impl Address {
	pub const NULL: Address = Address(0);

	pub const fn new(address: u64) -> Self {
		Address(address)
	}

	/// Returns `None` for the zero sentinel.
	pub const fn non_null(address: u64) -> Option<Self> {
		match address {
			0 => None,
			a => Some(Address(a))
		}
	}

	pub const fn get(&self) -> u64 {
		self.0
	}

	pub const fn is_null(&self) -> bool {
		self.0 == 0
	}

	pub const fn saturating_add(&self, rhs: u64) -> Address {
		Address(self.0.saturating_add(rhs))
	}

	pub const fn checked_add(&self, rhs: u64) -> Option<Address> {
		match self.0.checked_add(rhs) {
			None => None,
			Some(a) => Some(Address(a))
		}
	}

	/// Distance from `base` to `self`, or `None` if `self` lies below `base`.
	pub const fn offset_from(&self, base: Address) -> Option<u64> {
		self.0.checked_sub(base.0)
	}
}
impl From<u64> for Address {
	fn from(address: u64) -> Self {
		Address(address)
	}
}
impl From<Address> for u64 {
	fn from(address: Address) -> Self {
		address.0
	}
}
impl std::str::FromStr for Address {
	type Err = std::num::ParseIntError;

	/// Parses a hexadecimal address, with or without the `0x` prefix.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let digits = s
			.strip_prefix("0x")
			.or_else(|| s.strip_prefix("0X"))
			.unwrap_or(s);

		u64::from_str_radix(digits, 16).map(Address)
	}
}
impl std::fmt::Display for Address {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "{:x}", self.0)
	}
}
impl std::fmt::LowerHex for Address {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		std::fmt::LowerHex::fmt(&self.0, f)
	}
}
impl std::fmt::UpperHex for Address {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		std::fmt::UpperHex::fmt(&self.0, f)
	}
}
