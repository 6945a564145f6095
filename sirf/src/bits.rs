//! Big-endian field access.
//!
//! Every multi-byte quantity in a SiRF payload is big-endian. The free
//! functions return `None` when the requested bytes are not all inside the
//! buffer; [`Fields`] wraps a payload and turns such reads into zero while
//! remembering that the payload was shorter than its decoder expected.

use core::cell::Cell;

fn read<const N: usize>(buf: &[u8], off: usize) -> Option<[u8; N]> {
    let end = off.checked_add(N)?;
    buf.get(off..end)?.try_into().ok()
}

pub fn get_u8(buf: &[u8], off: usize) -> Option<u8> {
    buf.get(off).copied()
}

pub fn get_i8(buf: &[u8], off: usize) -> Option<i8> {
    read::<1>(buf, off).map(i8::from_be_bytes)
}

pub fn get_be_u16(buf: &[u8], off: usize) -> Option<u16> {
    read::<2>(buf, off).map(u16::from_be_bytes)
}

pub fn get_be_i16(buf: &[u8], off: usize) -> Option<i16> {
    read::<2>(buf, off).map(i16::from_be_bytes)
}

pub fn get_be_u32(buf: &[u8], off: usize) -> Option<u32> {
    read::<4>(buf, off).map(u32::from_be_bytes)
}

pub fn get_be_i32(buf: &[u8], off: usize) -> Option<i32> {
    read::<4>(buf, off).map(i32::from_be_bytes)
}

/// Stores `value` at `off`. Returns `false`, leaving the buffer untouched,
/// when the byte lies outside of it.
pub fn put_u8(buf: &mut [u8], off: usize, value: u8) -> bool {
    match buf.get_mut(off) {
        Some(b) => {
            *b = value;
            true
        },
        None => false,
    }
}

pub fn put_be_u16(buf: &mut [u8], off: usize, value: u16) -> bool {
    write(buf, off, value.to_be_bytes())
}

pub fn put_be_u32(buf: &mut [u8], off: usize, value: u32) -> bool {
    write(buf, off, value.to_be_bytes())
}

fn write<const N: usize>(buf: &mut [u8], off: usize, bytes: [u8; N]) -> bool {
    let Some(end) = off.checked_add(N) else {
        return false;
    };
    match buf.get_mut(off..end) {
        Some(dst) => {
            dst.copy_from_slice(&bytes);
            true
        },
        None => false,
    }
}

/// Zero-filling reader over one message payload.
///
/// Reads past the end of the payload yield zero and mark the view as
/// overrun, so a truncated message still renders every field it does carry.
#[derive(Debug)]
pub struct Fields<'a> {
    buf: &'a [u8],
    overrun: Cell<bool>,
}

impl<'a> Fields<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            overrun: Cell::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.buf
    }

    /// Whether any read so far fell outside of the payload.
    pub fn overrun(&self) -> bool {
        self.overrun.get()
    }

    fn or_zero<T: Default>(&self, value: Option<T>, off: usize, width: usize) -> T {
        match value {
            Some(v) => v,
            None => {
                if !self.overrun.replace(true) {
                    tracing::debug!(
                        "field read of {} bytes at offset {} overruns payload of {} bytes",
                        width,
                        off,
                        self.buf.len()
                    );
                }
                T::default()
            },
        }
    }

    pub fn u8(&self, off: usize) -> u8 {
        self.or_zero(get_u8(self.buf, off), off, 1)
    }

    pub fn i8(&self, off: usize) -> i8 {
        self.or_zero(get_i8(self.buf, off), off, 1)
    }

    pub fn be_u16(&self, off: usize) -> u16 {
        self.or_zero(get_be_u16(self.buf, off), off, 2)
    }

    pub fn be_i16(&self, off: usize) -> i16 {
        self.or_zero(get_be_i16(self.buf, off), off, 2)
    }

    pub fn be_u32(&self, off: usize) -> u32 {
        self.or_zero(get_be_u32(self.buf, off), off, 4)
    }

    pub fn be_i32(&self, off: usize) -> i32 {
        self.or_zero(get_be_i32(self.buf, off), off, 4)
    }

    /// Bytes from `off` up to the first NUL, or to the end of the payload.
    pub fn c_str(&self, off: usize) -> &'a [u8] {
        let tail = self.buf.get(off..).unwrap_or(&[]);
        match tail.iter().position(|&b| b == 0) {
            Some(end) => &tail[..end],
            None => tail,
        }
    }
}
