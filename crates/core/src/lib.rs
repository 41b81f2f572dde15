//! Stax Core: foundation of a stack-based concatenative VM
//!
//! This crate provides the two primitives everything else is built on:
//!
//! - Cell: a 32-bit NaN-boxed tagged value (the unit of stack storage)
//! - Memory: a contiguous byte image split into STACK, RSTACK, STRING,
//!   and CODE segments with bounds-checked accessors
//!
//! It deliberately knows nothing about opcodes, symbols, or syntax; those
//! live in stax-vm and stax-compiler.
//!
//! # Modules
//!
//! - `cell`: NaN-boxed cell codec (tags, encode/decode, spans)
//! - `memory`: segmented memory image and typed accessors
//! - `error`: structural runtime error type

pub mod cell;
pub mod error;
pub mod memory;

// Re-export key types
pub use cell::{CANONICAL_NAN, CELL_SIZE, Cell, Tag};
pub use error::VmError;
pub use memory::{DEFAULT_IMAGE_SIZE, Memory, SegmentId, SegmentLayout};
