//! Segmented Memory Image
//!
//! One contiguous byte buffer partitioned into four fixed-offset segments:
//!
//! ```text
//! ┌────────────┬────────────┬────────────┬────────────┐
//! │   STACK    │   RSTACK   │   STRING   │    CODE    │
//! │ (operands) │  (frames)  │  (interns) │ (bytecode) │
//! └────────────┴────────────┴────────────┴────────────┘
//! 0            stack        +rstack      +strings     total
//! ```
//!
//! - STACK and RSTACK hold 4-byte cells and grow upward.
//! - STRING is an append-only arena of interned strings.
//! - CODE holds emitted bytecode (CP while compiling, IP while running).
//!
//! Addresses are byte offsets within a segment. Every accessor bounds-checks
//! against its segment; out-of-range access is a structural error, never UB.

use crate::error::VmError;

/// Canonical total image size: 64 KiB.
pub const DEFAULT_IMAGE_SIZE: usize = 64 * 1024;

/// The four segments of the memory image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentId {
    Stack,
    RStack,
    Strings,
    Code,
}

impl SegmentId {
    /// Short segment name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            SegmentId::Stack => "STACK",
            SegmentId::RStack => "RSTACK",
            SegmentId::Strings => "STRING",
            SegmentId::Code => "CODE",
        }
    }
}

/// Byte sizes of the four segments.
///
/// The default layout fills the canonical 64 KiB image. CODE is capped at
/// 32 KiB so every bytecode address fits the 15-bit direct-call encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLayout {
    pub stack: usize,
    pub rstack: usize,
    pub strings: usize,
    pub code: usize,
}

impl Default for SegmentLayout {
    fn default() -> Self {
        SegmentLayout {
            stack: 16 * 1024,
            rstack: 4 * 1024,
            strings: 12 * 1024,
            code: 32 * 1024,
        }
    }
}

impl SegmentLayout {
    /// Total image size in bytes.
    pub fn total(&self) -> usize {
        self.stack + self.rstack + self.strings + self.code
    }

    /// Base offset of a segment within the image.
    pub fn base(&self, segment: SegmentId) -> usize {
        match segment {
            SegmentId::Stack => 0,
            SegmentId::RStack => self.stack,
            SegmentId::Strings => self.stack + self.rstack,
            SegmentId::Code => self.stack + self.rstack + self.strings,
        }
    }

    /// Byte size of a segment.
    pub fn size(&self, segment: SegmentId) -> usize {
        match segment {
            SegmentId::Stack => self.stack,
            SegmentId::RStack => self.rstack,
            SegmentId::Strings => self.strings,
            SegmentId::Code => self.code,
        }
    }
}

/// The memory image: one owned byte buffer plus its segment layout.
pub struct Memory {
    bytes: Vec<u8>,
    layout: SegmentLayout,
}

impl Memory {
    /// Allocate an image with the canonical 64 KiB layout.
    pub fn new() -> Self {
        Self::with_layout(SegmentLayout::default())
    }

    /// Allocate an image with a caller-provided layout.
    pub fn with_layout(layout: SegmentLayout) -> Self {
        Memory {
            bytes: vec![0; layout.total()],
            layout,
        }
    }

    pub fn layout(&self) -> &SegmentLayout {
        &self.layout
    }

    /// Translate a segment-relative offset to an image index, verifying that
    /// `len` bytes starting there stay inside the segment.
    #[inline]
    fn index(&self, segment: SegmentId, offset: usize, len: usize) -> Result<usize, VmError> {
        let size = self.layout.size(segment);
        if offset.checked_add(len).is_none_or(|end| end > size) {
            return Err(VmError::OutOfBounds {
                segment: segment.name(),
                offset,
                len,
                size,
            });
        }
        Ok(self.layout.base(segment) + offset)
    }

    pub fn read8(&self, segment: SegmentId, offset: usize) -> Result<u8, VmError> {
        let i = self.index(segment, offset, 1)?;
        Ok(self.bytes[i])
    }

    pub fn write8(&mut self, segment: SegmentId, offset: usize, value: u8) -> Result<(), VmError> {
        let i = self.index(segment, offset, 1)?;
        self.bytes[i] = value;
        Ok(())
    }

    pub fn read16(&self, segment: SegmentId, offset: usize) -> Result<u16, VmError> {
        let i = self.index(segment, offset, 2)?;
        Ok(u16::from_le_bytes([self.bytes[i], self.bytes[i + 1]]))
    }

    pub fn write16(&mut self, segment: SegmentId, offset: usize, value: u16) -> Result<(), VmError> {
        let i = self.index(segment, offset, 2)?;
        self.bytes[i..i + 2].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn read32(&self, segment: SegmentId, offset: usize) -> Result<u32, VmError> {
        let i = self.index(segment, offset, 4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.bytes[i..i + 4]);
        Ok(u32::from_le_bytes(raw))
    }

    pub fn write32(&mut self, segment: SegmentId, offset: usize, value: u32) -> Result<(), VmError> {
        let i = self.index(segment, offset, 4)?;
        self.bytes[i..i + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn read_f32(&self, segment: SegmentId, offset: usize) -> Result<f32, VmError> {
        Ok(f32::from_bits(self.read32(segment, offset)?))
    }

    pub fn write_f32(&mut self, segment: SegmentId, offset: usize, value: f32) -> Result<(), VmError> {
        self.write32(segment, offset, value.to_bits())
    }

    /// Borrow a byte range of a segment (used by the string arena).
    pub fn slice(&self, segment: SegmentId, offset: usize, len: usize) -> Result<&[u8], VmError> {
        let i = self.index(segment, offset, len)?;
        Ok(&self.bytes[i..i + len])
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
