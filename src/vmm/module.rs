use std::{ffi::CStr, os::raw::c_char};

use crate::{common::Address, ffi};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ModuleType {
	Normal,
	Data,
	/// Module found in memory but not linked into the loader lists.
	NotLinked,
	Injected,
	Unknown(i32)
}
impl From<i32> for ModuleType {
	fn from(value: i32) -> Self {
		match value {
			ffi::VMMDLL_MODULE_TP_NORMAL => ModuleType::Normal,
			ffi::VMMDLL_MODULE_TP_DATA => ModuleType::Data,
			ffi::VMMDLL_MODULE_TP_NOTLINKED => ModuleType::NotLinked,
			ffi::VMMDLL_MODULE_TP_INJECTED => ModuleType::Injected,
			other => ModuleType::Unknown(other)
		}
	}
}

/// Owned copy of a native module map entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
	pub base: Address,
	pub entry: Address,
	pub image_size: u32,
	pub wow64: bool,
	/// Module name, e.g. `kernel32.dll`.
	pub name: String,
	/// Full path of the module image.
	pub full_name: String,
	pub module_type: ModuleType,
	pub file_size_raw: u32,
	pub section_count: u32,
	pub eat_count: u32,
	pub iat_count: u32
}
impl ModuleInfo {
	/// Copies the native entry.
	///
	/// ## Safety
	/// * The string pointers of `entry` must be null or point to nul terminated strings.
	pub(crate) unsafe fn from_entry(entry: &ffi::ModuleEntry) -> Self {
		ModuleInfo {
			base: Address::new(entry.va_base),
			entry: Address::new(entry.va_entry),
			image_size: entry.image_size,
			wow64: entry.wow64 != ffi::FALSE,
			name: Self::copy_string(entry.text),
			full_name: Self::copy_string(entry.full_name),
			module_type: ModuleType::from(entry.module_type),
			file_size_raw: entry.file_size_raw,
			section_count: entry.section_count,
			eat_count: entry.eat_count,
			iat_count: entry.iat_count
		}
	}

	unsafe fn copy_string(ptr: *const c_char) -> String {
		if ptr.is_null() {
			return String::new()
		}

		CStr::from_ptr(ptr).to_string_lossy().into_owned()
	}

	/// One past the last address of the image.
	pub fn end(&self) -> Address {
		self.base.saturating_add(self.image_size as u64)
	}

	pub fn contains(&self, address: Address) -> bool {
		address >= self.base && address < self.end()
	}
}
impl std::fmt::Display for ModuleInfo {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(
			f,
			"{}-{} {} (entry {}) {}",
			self.base,
			self.end(),
			self.name,
			self.entry,
			self.full_name
		)
	}
}
