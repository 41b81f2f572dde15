//! Interned String Arena
//!
//! The STRING segment is an append-only arena of interned strings. Each
//! entry is a u16 length prefix followed by the UTF-8 bytes; a STRING or
//! SYMBOL cell's value field is the entry's starting offset.
//!
//! Interning is idempotent: the same text always yields the same handle.
//! Entries persist for the life of the VM.

use std::collections::HashMap;

use stax_core::{Memory, SegmentId, VmError};

/// Bump allocator plus dedup index over the STRING segment.
#[derive(Default)]
pub struct StringArena {
    /// Next free byte in the STRING segment.
    top: usize,
    /// Text -> entry offset, for idempotent interning.
    index: HashMap<String, u16>,
}

impl StringArena {
    pub fn new() -> Self {
        StringArena::default()
    }

    /// Intern `text`, returning its handle offset. Re-interning returns the
    /// original handle without touching the segment.
    pub fn intern(&mut self, memory: &mut Memory, text: &str) -> Result<u16, VmError> {
        if let Some(&offset) = self.index.get(text) {
            return Ok(offset);
        }

        let bytes = text.as_bytes();
        if bytes.len() > usize::from(u16::MAX) {
            return Err(VmError::StringSpace);
        }

        let entry_len = 2 + bytes.len();
        let size = memory.layout().size(SegmentId::Strings);
        if self.top + entry_len > size {
            return Err(VmError::StringSpace);
        }
        let offset = self.top as u16;

        memory.write16(SegmentId::Strings, self.top, bytes.len() as u16)?;
        for (i, &b) in bytes.iter().enumerate() {
            memory.write8(SegmentId::Strings, self.top + 2 + i, b)?;
        }
        self.top += entry_len;
        self.index.insert(text.to_string(), offset);
        Ok(offset)
    }

    /// Read the text stored at `offset`.
    ///
    /// Handles only ever come from `intern`, so entries are always valid
    /// UTF-8; only a segment overrun can fail.
    pub fn lookup(&self, memory: &Memory, offset: u16) -> Result<String, VmError> {
        let offset = usize::from(offset);
        let len = usize::from(memory.read16(SegmentId::Strings, offset)?);
        let bytes = memory.slice(SegmentId::Strings, offset + 2, len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Bytes currently in use.
    pub fn used(&self) -> usize {
        self.top
    }
}
