//! Image assembly
//!
//! [`Assembler`] owns the output canvas and places decoded tiles by their
//! planned offsets, independent of arrival order.

mod canvas;
mod error;

pub use canvas::Assembler;
pub use error::AssemblyError;
