//! Block header fields read by the chains

use crate::params::{BITS_OFFSET, HEADER_SIZE, NONCE_OFFSET, TIMESTAMP_OFFSET};

/// An 80-byte block header
pub type Header = [u8; HEADER_SIZE];

fn read_u32(header: &Header, offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&header[offset..offset + 4]);
    u32::from_le_bytes(word)
}

/// The timestamp word (bytes 68..72)
pub fn timestamp(header: &Header) -> u32 {
    read_u32(header, TIMESTAMP_OFFSET)
}

/// The compact difficulty target (bytes 72..76)
pub fn bits(header: &Header) -> u32 {
    read_u32(header, BITS_OFFSET)
}

/// The nonce word (bytes 76..80)
pub fn nonce(header: &Header) -> u32 {
    read_u32(header, NONCE_OFFSET)
}

pub fn set_timestamp(header: &mut Header, timestamp: u32) {
    header[TIMESTAMP_OFFSET..TIMESTAMP_OFFSET + 4].copy_from_slice(&timestamp.to_le_bytes());
}

pub fn set_nonce(header: &mut Header, nonce: u32) {
    header[NONCE_OFFSET..NONCE_OFFSET + 4].copy_from_slice(&nonce.to_le_bytes());
}

/// Copy of `header` carrying `nonce`
pub fn with_nonce(header: &Header, nonce: u32) -> Header {
    let mut copy = *header;
    set_nonce(&mut copy, nonce);
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_little_endian_words() {
        let mut header = [0u8; HEADER_SIZE];
        header[68..72].copy_from_slice(&[0x13, 0x3d, 0xfd, 0x58]);
        header[72..76].copy_from_slice(&[0xff, 0xff, 0x00, 0x1d]);
        header[76..80].copy_from_slice(&[1, 0, 0, 0]);
        assert_eq!(timestamp(&header), 0x58fd_3d13);
        assert_eq!(bits(&header), 0x1d00_ffff);
        assert_eq!(nonce(&header), 1);
    }

    #[test]
    fn test_setters_touch_only_their_field() {
        let header = [0xaau8; HEADER_SIZE];
        let mut edited = with_nonce(&header, 0x0102_0304);
        assert_eq!(&edited[76..], &[4, 3, 2, 1]);
        assert_eq!(&edited[..76], &header[..76]);

        set_timestamp(&mut edited, 7);
        assert_eq!(timestamp(&edited), 7);
        assert_eq!(&edited[..68], &header[..68]);
        assert_eq!(&edited[72..76], &header[72..76]);
    }
}
