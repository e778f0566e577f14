//! PS-X EXE parsing.
//!
//! An executable is a 2 KiB header followed by the text segment. Only the start of the header
//! carries anything the loader needs.

use bytemuck::{Pod, Zeroable};

use std::fs;
use std::io;
use std::mem;
use std::path::Path;

const HEADER_SIZE: usize = 0x800;

#[derive(thiserror::Error, Debug)]
pub enum ExeError {
    #[error("failed to read exe: {0}")]
    Io(#[from] io::Error),

    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

/// A parsed executable, ready to be copied into memory.
#[derive(Debug)]
pub struct Exe {
    /// Text segment data.
    pub text: Box<[u8]>,
    /// Entry point.
    pub pc: u32,
    /// Initial global pointer.
    pub gp: u32,
    /// Address the text segment is copied to.
    pub text_base: u32,
    /// Base address of the zero initialized bss segment.
    pub bss_base: u32,
    pub bss_size: u32,
    /// Initial stack pointer. `None` if the stack pointer shouldn't be touched.
    pub sp: Option<u32>,
}

impl Exe {
    pub fn load(path: &Path) -> Result<Self, ExeError> {
        let data = fs::read(path)?;
        Self::parse(&data)
    }

    pub fn parse(data: &[u8]) -> Result<Self, ExeError> {
        if data.len() < HEADER_SIZE {
            return Err(ExeError::InvalidHeader(format!(
                "must be at least {HEADER_SIZE} bytes, is {} bytes",
                data.len(),
            )));
        }

        let header: Header = bytemuck::pod_read_unaligned(&data[..mem::size_of::<Header>()]);

        if &header.magic != b"PS-X EXE" {
            return Err(ExeError::InvalidHeader(
                String::from("invalid magic value, must be 'PS-X EXE'")
            ));
        }

        if header.pc & 0x3 != 0 {
            return Err(ExeError::InvalidHeader(format!(
                "misaligned entry point {:08x}",
                header.pc,
            )));
        }

        let available = data.len() - HEADER_SIZE;
        let text_size = (header.text_size as usize).min(available);

        if text_size < header.text_size as usize {
            warn!(
                "text segment truncated from {} to {} bytes",
                header.text_size,
                text_size,
            );
        }

        let sp = if header.sp_base == 0 {
            None
        } else {
            Some(header.sp_base.wrapping_add(header.sp_offset))
        };

        Ok(Self {
            sp,
            pc: header.pc,
            gp: header.gp,
            text_base: header.text_base,
            bss_base: header.bss_base,
            bss_size: header.bss_size,
            text: Box::from(&data[HEADER_SIZE..HEADER_SIZE + text_size]),
        })
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Header {
    magic: [u8; 8],
    _pad0: [u8; 8],
    pc: u32,
    gp: u32,
    text_base: u32,
    text_size: u32,
    _pad1: [u8; 8],
    bss_base: u32,
    bss_size: u32,
    sp_base: u32,
    sp_offset: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(text: &[u8]) -> Vec<u8> {
        let mut data = vec![0_u8; HEADER_SIZE];
        data[..8].copy_from_slice(b"PS-X EXE");
        data[0x10..0x14].copy_from_slice(&0x8001_0000_u32.to_le_bytes());
        data[0x14..0x18].copy_from_slice(&0x8002_0000_u32.to_le_bytes());
        data[0x18..0x1c].copy_from_slice(&0x8001_0000_u32.to_le_bytes());
        data[0x1c..0x20].copy_from_slice(&(text.len() as u32).to_le_bytes());
        data[0x30..0x34].copy_from_slice(&0x801f_ff00_u32.to_le_bytes());
        data[0x34..0x38].copy_from_slice(&0xf0_u32.to_le_bytes());
        data.extend_from_slice(text);
        data
    }

    #[test]
    fn parse_header() {
        let exe = Exe::parse(&image(&[1, 2, 3, 4])).unwrap();
        assert_eq!(exe.pc, 0x8001_0000);
        assert_eq!(exe.gp, 0x8002_0000);
        assert_eq!(exe.text_base, 0x8001_0000);
        assert_eq!(exe.sp, Some(0x801f_fff0));
        assert_eq!(&exe.text[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn bad_magic() {
        let mut data = image(&[]);
        data[0] = b'X';
        assert!(matches!(Exe::parse(&data), Err(ExeError::InvalidHeader(_))));
    }

    #[test]
    fn too_short() {
        assert!(Exe::parse(&[0; 16]).is_err());
    }
}
