use bitflags::bitflags;

use crate::ffi;

bitflags! {
	/// Cache and paging behavior of a read, `VMMDLL_FLAG_*`.
	///
	/// The value is handed to the native library unchanged, bits unknown to this crate are kept.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct ReadFlags: u64 {
		/// Do not use the data cache, always read from the acquisition device.
		const NOCACHE = ffi::VMMDLL_FLAG_NOCACHE;
		/// Zero pad failed physical reads and report success if within physical memory.
		const ZEROPAD_ON_FAIL = ffi::VMMDLL_FLAG_ZEROPAD_ON_FAIL;
		/// Only read from the cache, fail non-cached pages.
		const FORCECACHE_READ = ffi::VMMDLL_FLAG_FORCECACHE_READ;
		/// Do not retrieve paged out memory from the pagefile or compressed memory.
		const NOPAGING = ffi::VMMDLL_FLAG_NOPAGING;
		/// Do not retrieve paged out memory if it would incur additional I/O.
		const NOPAGING_IO = ffi::VMMDLL_FLAG_NOPAGING_IO;
		/// Do not write back to the cache after a successful device read.
		const NOCACHEPUT = ffi::VMMDLL_FLAG_NOCACHEPUT;
		/// Only use the most recent cache region.
		const CACHE_RECENT_ONLY = ffi::VMMDLL_FLAG_CACHE_RECENT_ONLY;
		/// Do not perform predictive page reads.
		const NO_PREDICTIVE_READ = ffi::VMMDLL_FLAG_NO_PREDICTIVE_READ;
		/// Override any use of `FORCECACHE_READ`.
		const FORCECACHE_READ_DISABLE = ffi::VMMDLL_FLAG_FORCECACHE_READ_DISABLE;

		const _ = !0;
	}
}
impl ReadFlags {
	/// Value for the 32-bit flags argument of the scatter functions.
	///
	/// All known flags fit, unknown high bits are truncated.
	pub const fn scatter_bits(&self) -> u32 {
		self.bits() as u32
	}

	/// Parses a flag by its lowercase name as used in the examples, e.g. `nocache`.
	pub fn from_short_name(name: &str) -> Option<Self> {
		let flag = match name {
			"nocache" => Self::NOCACHE,
			"zeropad" => Self::ZEROPAD_ON_FAIL,
			"forcecache" => Self::FORCECACHE_READ,
			"nopaging" => Self::NOPAGING,
			"nopagingio" => Self::NOPAGING_IO,
			"nocacheput" => Self::NOCACHEPUT,
			"recentonly" => Self::CACHE_RECENT_ONLY,
			"nopredictive" => Self::NO_PREDICTIVE_READ,
			"forcecachedisable" => Self::FORCECACHE_READ_DISABLE,
			_ => return None
		};

		Some(flag)
	}
}
