#[cfg(unix)]
pub mod dl;

#[cfg(windows)]
pub mod win32;

pub mod simple;
