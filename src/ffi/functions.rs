use std::{ffi::CStr, os::raw::c_void};

use super::*;
use crate::library::LoadError;

/// Trait implemented on anything exported symbols can be looked up in.
pub trait SymbolSource {
	/// Returns the address of the exported symbol `name`, or `None` if it is not exported.
	fn symbol(&self, name: &CStr) -> Option<*const c_void>;
}

/// Table of the native entry points this crate binds.
///
/// The fields are the raw function pointers, calling them is only sound with
/// arguments satisfying the native contracts. Prefer the wrappers on [`Vmm`](crate::vmm::Vmm).
#[derive(Debug, Clone, Copy)]
pub struct VmmFunctions {
	pub initialize: InitializeFn,
	pub close: CloseFn,
	pub close_all: CloseAllFn,
	pub pid_get_from_name: PidGetFromNameFn,
	pub map_get_module_from_name: MapGetModuleFromNameFn,
	pub process_get_proc_address: ProcessGetProcAddressFn,
	pub mem_read: MemReadFn,
	pub mem_write: MemWriteFn,
	pub mem_read_ex: MemReadExFn,
	/// Not exported by older library versions, buffers are leaked there.
	pub mem_free: Option<MemFreeFn>,

	pub scatter_initialize: ScatterInitializeFn,
	pub scatter_prepare: ScatterPrepareFn,
	pub scatter_prepare_ex: ScatterPrepareExFn,
	pub scatter_prepare_write: ScatterPrepareWriteFn,
	pub scatter_execute: ScatterExecuteFn,
	pub scatter_execute_read: ScatterExecuteFn,
	pub scatter_read: ScatterReadFn,
	pub scatter_clear: ScatterClearFn,
	pub scatter_close_handle: ScatterCloseHandleFn
}
impl VmmFunctions {
	/// Names of all exports which must be present for [`resolve`](VmmFunctions::resolve) to succeed.
	pub const REQUIRED_SYMBOLS: [&'static str; 18] = [
		"VMMDLL_Initialize",
		"VMMDLL_Close",
		"VMMDLL_CloseAll",
		"VMMDLL_PidGetFromName",
		"VMMDLL_Map_GetModuleFromNameU",
		"VMMDLL_ProcessGetProcAddressU",
		"VMMDLL_MemRead",
		"VMMDLL_MemWrite",
		"VMMDLL_MemReadEx",
		"VMMDLL_Scatter_Initialize",
		"VMMDLL_Scatter_Prepare",
		"VMMDLL_Scatter_PrepareEx",
		"VMMDLL_Scatter_PrepareWrite",
		"VMMDLL_Scatter_Execute",
		"VMMDLL_Scatter_ExecuteRead",
		"VMMDLL_Scatter_Read",
		"VMMDLL_Scatter_Clear",
		"VMMDLL_Scatter_CloseHandle"
	];

	/// Resolves the whole table from `source`.
	///
	/// ## Safety
	/// * Every symbol exported under the names in [`REQUIRED_SYMBOLS`](VmmFunctions::REQUIRED_SYMBOLS)
	///   (and `VMMDLL_MemFree`) must be a function with the matching native signature.
	/// * The returned pointers are only valid as long as `source` stays loaded.
	pub unsafe fn resolve(source: &impl SymbolSource) -> Result<Self, LoadError> {
		macro_rules! resolve {
			($name: literal => $fn_type: ty) => {
				match source.symbol(Self::c_name(concat!($name, "\0"))) {
					None => return Err(LoadError::MissingSymbol($name)),
					Some(ptr) => {
						log::trace!("resolved {} at {:p}", $name, ptr);
						std::mem::transmute::<*const c_void, $fn_type>(ptr)
					}
				}
			};
			(optional $name: literal => $fn_type: ty) => {
				match source.symbol(Self::c_name(concat!($name, "\0"))) {
					None => {
						log::debug!("optional export {} not found", $name);
						None
					}
					Some(ptr) => Some(std::mem::transmute::<*const c_void, $fn_type>(ptr))
				}
			};
		}

		Ok(VmmFunctions {
			initialize: resolve!("VMMDLL_Initialize" => InitializeFn),
			close: resolve!("VMMDLL_Close" => CloseFn),
			close_all: resolve!("VMMDLL_CloseAll" => CloseAllFn),
			pid_get_from_name: resolve!("VMMDLL_PidGetFromName" => PidGetFromNameFn),
			map_get_module_from_name: resolve!("VMMDLL_Map_GetModuleFromNameU" => MapGetModuleFromNameFn),
			process_get_proc_address: resolve!("VMMDLL_ProcessGetProcAddressU" => ProcessGetProcAddressFn),
			mem_read: resolve!("VMMDLL_MemRead" => MemReadFn),
			mem_write: resolve!("VMMDLL_MemWrite" => MemWriteFn),
			mem_read_ex: resolve!("VMMDLL_MemReadEx" => MemReadExFn),
			mem_free: resolve!(optional "VMMDLL_MemFree" => MemFreeFn),

			scatter_initialize: resolve!("VMMDLL_Scatter_Initialize" => ScatterInitializeFn),
			scatter_prepare: resolve!("VMMDLL_Scatter_Prepare" => ScatterPrepareFn),
			scatter_prepare_ex: resolve!("VMMDLL_Scatter_PrepareEx" => ScatterPrepareExFn),
			scatter_prepare_write: resolve!("VMMDLL_Scatter_PrepareWrite" => ScatterPrepareWriteFn),
			scatter_execute: resolve!("VMMDLL_Scatter_Execute" => ScatterExecuteFn),
			scatter_execute_read: resolve!("VMMDLL_Scatter_ExecuteRead" => ScatterExecuteFn),
			scatter_read: resolve!("VMMDLL_Scatter_Read" => ScatterReadFn),
			scatter_clear: resolve!("VMMDLL_Scatter_Clear" => ScatterClearFn),
			scatter_close_handle: resolve!("VMMDLL_Scatter_CloseHandle" => ScatterCloseHandleFn)
		})
	}

	fn c_name(name: &'static str) -> &'static CStr {
		// names are literals terminated by the macro above
		match CStr::from_bytes_with_nul(name.as_bytes()) {
			Ok(name) => name,
			Err(_) => unreachable!("export name {:?} is not nul terminated", name)
		}
	}
}
