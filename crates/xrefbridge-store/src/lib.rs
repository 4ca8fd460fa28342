//! # xrefbridge store
//!
//! Reference backends behind the [`IdMapper`](xrefbridge_kernel::IdMapper)
//! contract:
//!
//! - [`MemoryMapper`]: directed links and attributes held in memory
//! - [`text`]: tab-delimited flat files, served as `idmapper-text:<path>`

pub mod memory;
pub mod text;

pub use memory::MemoryMapper;
pub use text::{TEXT_SCHEME, TextDriver, TextMapperError, read_mapping, read_mapping_from_path};
