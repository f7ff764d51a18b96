/// Trait for plain data types that can safely be represented, read and written as raw bytes.
///
/// Most notably it is UB to read padding bytes and to create invalid bit patterns
/// (e.g. reading `2u8` as `bool`), so this trait cannot just be implemented for any type.
///
/// ## Safety
/// * The type memory representation must be safe to read in its entirety - i.e. no padding bytes
/// * Every bit pattern of the type's size must be a valid value of the type
pub unsafe trait RawBytes: Copy + Sized + 'static {
	/// Returns the all-zero value of the type.
	fn zeroed() -> Self {
		// Safe because all bit patterns are valid for implementors
		unsafe { std::mem::zeroed() }
	}

	/// Returns a view of the memory covered by `self` as raw bytes.
	fn as_raw_bytes(&self) -> &[u8] {
		unsafe {
			std::slice::from_raw_parts(
				self as *const Self as *const u8,
				std::mem::size_of::<Self>()
			)
		}
	}

	/// Returns a mutable view of the memory covered by `self` as raw bytes.
	fn as_raw_bytes_mut(&mut self) -> &mut [u8] {
		unsafe {
			std::slice::from_raw_parts_mut(
				self as *mut Self as *mut u8,
				std::mem::size_of::<Self>()
			)
		}
	}

	/// Reads a value from the start of `bytes`, returns `None` if there are not enough bytes.
	fn from_raw_bytes(bytes: &[u8]) -> Option<Self> {
		let mut value = Self::zeroed();
		let raw = value.as_raw_bytes_mut();
		raw.copy_from_slice(bytes.get(.. raw.len())?);

		Some(value)
	}
}
macro_rules! impl_raw_bytes {
	(
		$(
			$raw_type: ty
		),+ $(,)?
	) => {
		$(
			unsafe impl RawBytes for $raw_type {}
		)+
	};
}
impl_raw_bytes!(
	u8, i8, u16, i16, u32, i32, u64, i64, u128, i128, usize, isize,
	f32, f64,
	super::Address
);
// arrays have no padding between elements
unsafe impl<T: RawBytes, const N: usize> RawBytes for [T; N] {}

/// Returns a view of a slice of plain data values as raw bytes.
pub fn slice_as_raw_bytes<T: RawBytes>(values: &[T]) -> &[u8] {
	unsafe {
		std::slice::from_raw_parts(
			values.as_ptr() as *const u8,
			std::mem::size_of_val(values)
		)
	}
}
