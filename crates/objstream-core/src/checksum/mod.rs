//! CRC32C integrity primitives shared by the upload and download paths.
//!
//! A [`Crc32cValue`] knows how many bytes it covers, which is what makes two
//! adjacent values combinable without rescanning the first range.

mod file;
mod hasher;
mod value;

pub use file::crc32c_path;
pub use hasher::{Crc32cHasher, Hasher, NoopHasher};
pub use value::Crc32cValue;
