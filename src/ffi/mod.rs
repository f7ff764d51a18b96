//! Raw mirror of the native VMM library ABI.
//!
//! Everything in here matches the native headers byte for byte, safe wrappers live in
//! [`vmm`](crate::vmm) and [`scatter`](crate::scatter).

use std::os::raw::{c_char, c_int, c_void};

mod functions;
#[cfg(test)]
pub(crate) mod fake;

pub use functions::{SymbolSource, VmmFunctions};

/// Opaque `VMM_HANDLE`.
pub type RawVmmHandle = *mut c_void;
/// Opaque `VMMDLL_SCATTER_HANDLE`.
pub type RawScatterHandle = *mut c_void;
/// Win32 style `BOOL`, any non-zero value is success.
pub type BOOL = c_int;

pub const FALSE: BOOL = 0;
pub const TRUE: BOOL = 1;

pub const VMMDLL_FLAG_NOCACHE: u64 = 0x0001;
pub const VMMDLL_FLAG_ZEROPAD_ON_FAIL: u64 = 0x0002;
pub const VMMDLL_FLAG_FORCECACHE_READ: u64 = 0x0008;
pub const VMMDLL_FLAG_NOPAGING: u64 = 0x0010;
pub const VMMDLL_FLAG_NOPAGING_IO: u64 = 0x0020;
pub const VMMDLL_FLAG_NOCACHEPUT: u64 = 0x0100;
pub const VMMDLL_FLAG_CACHE_RECENT_ONLY: u64 = 0x0200;
pub const VMMDLL_FLAG_NO_PREDICTIVE_READ: u64 = 0x0400;
pub const VMMDLL_FLAG_FORCECACHE_READ_DISABLE: u64 = 0x0800;

pub const VMMDLL_MODULE_FLAG_NORMAL: u32 = 0;

pub const VMMDLL_MODULE_TP_NORMAL: c_int = 0;
pub const VMMDLL_MODULE_TP_DATA: c_int = 1;
pub const VMMDLL_MODULE_TP_NOTLINKED: c_int = 2;
pub const VMMDLL_MODULE_TP_INJECTED: c_int = 3;

/// `VMMDLL_MAP_MODULEENTRY`.
///
/// Returned by `VMMDLL_Map_GetModuleFromNameU`, the strings are owned by the same native allocation.
#[derive(Debug)]
#[repr(C)]
pub struct ModuleEntry {
	pub va_base: u64,
	pub va_entry: u64,
	pub image_size: u32,
	pub wow64: BOOL,
	pub text: *const c_char,
	pub _reserved3: u32,
	pub _reserved4: u32,
	pub full_name: *const c_char,
	pub module_type: c_int,
	pub file_size_raw: u32,
	pub section_count: u32,
	pub eat_count: u32,
	pub iat_count: u32,
	pub _reserved2: u32,
	pub _reserved1: [u64; 2]
}

pub type InitializeFn = unsafe extern "C" fn(argc: u32, argv: *mut *mut c_char) -> RawVmmHandle;
pub type CloseFn = unsafe extern "C" fn(vmm: RawVmmHandle);
pub type CloseAllFn = unsafe extern "C" fn();
pub type PidGetFromNameFn =
	unsafe extern "C" fn(vmm: RawVmmHandle, name: *const c_char, pid: *mut u32) -> BOOL;
pub type MapGetModuleFromNameFn = unsafe extern "C" fn(
	vmm: RawVmmHandle,
	pid: u32,
	module_name: *const c_char,
	entry: *mut *mut ModuleEntry,
	flags: u32
) -> BOOL;
pub type ProcessGetProcAddressFn = unsafe extern "C" fn(
	vmm: RawVmmHandle,
	pid: u32,
	module_name: *const c_char,
	function_name: *const c_char
) -> u64;
pub type MemReadFn =
	unsafe extern "C" fn(vmm: RawVmmHandle, pid: u32, address: u64, buffer: *mut u8, size: u32) -> BOOL;
pub type MemWriteFn =
	unsafe extern "C" fn(vmm: RawVmmHandle, pid: u32, address: u64, data: *const u8, size: u32) -> BOOL;
pub type MemReadExFn = unsafe extern "C" fn(
	vmm: RawVmmHandle,
	pid: u32,
	address: u64,
	buffer: *mut u8,
	size: u32,
	bytes_read: *mut u32,
	flags: u64
) -> BOOL;
pub type MemFreeFn = unsafe extern "C" fn(memory: *mut c_void);

pub type ScatterInitializeFn =
	unsafe extern "C" fn(vmm: RawVmmHandle, pid: u32, flags: u32) -> RawScatterHandle;
pub type ScatterPrepareFn =
	unsafe extern "C" fn(scatter: RawScatterHandle, address: u64, size: u32) -> BOOL;
pub type ScatterPrepareExFn = unsafe extern "C" fn(
	scatter: RawScatterHandle,
	address: u64,
	size: u32,
	buffer: *mut u8,
	bytes_read: *mut u32
) -> BOOL;
pub type ScatterPrepareWriteFn =
	unsafe extern "C" fn(scatter: RawScatterHandle, address: u64, data: *const u8, size: u32) -> BOOL;
pub type ScatterExecuteFn = unsafe extern "C" fn(scatter: RawScatterHandle) -> BOOL;
pub type ScatterReadFn = unsafe extern "C" fn(
	scatter: RawScatterHandle,
	address: u64,
	size: u32,
	buffer: *mut u8,
	bytes_read: *mut u32
) -> BOOL;
pub type ScatterClearFn = unsafe extern "C" fn(scatter: RawScatterHandle, pid: u32, flags: u32) -> BOOL;
pub type ScatterCloseHandleFn = unsafe extern "C" fn(scatter: RawScatterHandle);
