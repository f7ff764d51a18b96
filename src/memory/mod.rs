pub mod access;
pub mod flags;
