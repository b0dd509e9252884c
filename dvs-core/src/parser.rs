#![allow(clippy::unusual_byte_groupings)]
//! Low-level parsing of raw 4-byte DVS protocol words.
//!
//! This module provides functions to extract fields from each packet type
//! using bitwise operations. The masks, shifts, and the x1000 reference
//! timestamp scale are fixed by the sensor hardware.

/// Header code for a column address + sub-timestamp packet.
pub const HDR_COLUMN_ADDRESS: u8 = 0x04;

/// Header code for a reference timestamp packet.
pub const HDR_REFERENCE_TIMESTAMP: u8 = 0x08;

/// Header code for a packet ID packet.
pub const HDR_PACKET_ID: u8 = 0x40;

/// Header code for a padding packet.
pub const HDR_PADDING: u8 = 0x00;

/// Returns true when the word is a group packet (high bit of b0 set).
#[inline]
pub fn is_group_packet(word: [u8; 4]) -> bool {
    word[0] & 0x80 != 0
}

/// Extracts the 5-bit header field used to dispatch normal packets.
#[inline]
pub fn header(word: [u8; 4]) -> u8 {
    word[0] & 0x7C
}

// ============================================================================
// Group packet (b0 bit 7 set)
// Bits: 1OOO OO** | GGGG GGPp | bbbb bbbb | aaaa aaaa
// G = group address, O = group address offset for the second bitmask,
// P/p = polarities for the b2/b3 bitmasks, a/b = row validity bitmasks
// ============================================================================

/// Extracts the 6-bit group address from a group packet.
#[inline]
pub fn group_address(word: [u8; 4]) -> u16 {
    ((word[1] & 0xFC) >> 2) as u16
}

/// Extracts the group address offset applied before the b2 bitmask.
#[inline]
pub fn group_address_offset(word: [u8; 4]) -> u16 {
    ((word[0] & 0x7C) >> 2) as u16
}

/// Polarity for events encoded in the b3 bitmask.
#[inline]
pub fn group_polarity_b3(word: [u8; 4]) -> bool {
    word[1] & 0x01 != 0
}

/// Polarity for events encoded in the b2 bitmask.
#[inline]
pub fn group_polarity_b2(word: [u8; 4]) -> bool {
    word[1] & 0x02 != 0
}

// ============================================================================
// Column address + sub-timestamp (header 0x04)
// Bits: 0000 01** | ---T TTTT | TTTT T-XX | XXXX XXXX
// ============================================================================

/// Extracts the 10-bit sub-timestamp from a column address packet.
#[inline]
pub fn column_sub_timestamp(word: [u8; 4]) -> u16 {
    (((word[1] & 0x1F) as u16) << 5) | (((word[2] & 0xF8) as u16) >> 3)
}

/// Extracts the raw (unflipped) 10-bit column address.
#[inline]
pub fn column_address_raw(word: [u8; 4]) -> u16 {
    (((word[2] & 0x03) as u16) << 8) | word[3] as u16
}

// ============================================================================
// Reference timestamp (header 0x08)
// Bits: 0000 10** | --TT TTTT | TTTT TTTT | TTTT TTTT
// ============================================================================

/// Extracts the 22-bit reference timestamp in milliseconds.
#[inline]
pub fn reference_timestamp_ms(word: [u8; 4]) -> u32 {
    (((word[1] & 0x3F) as u32) << 16) | ((word[2] as u32) << 8) | word[3] as u32
}

// ============================================================================
// Packet ID (header 0x40)
// Bits: 0100 00** | --II IIII | IIII IIII | IIII IIII
// ============================================================================

/// Extracts the 22-bit packet ID.
#[inline]
pub fn packet_id(word: [u8; 4]) -> u32 {
    (((word[1] & 0x3F) as u32) << 16) | ((word[2] as u32) << 8) | word[3] as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_packet_detection() {
        assert!(is_group_packet([0x80, 0, 0, 0]));
        assert!(is_group_packet([0xFF, 0, 0, 0]));
        assert!(!is_group_packet([0x7F, 0, 0, 0]));
        assert!(!is_group_packet([0x04, 0, 0, 0]));
    }

    #[test]
    fn test_header_dispatch_field() {
        assert_eq!(header([0x04, 0, 0, 0]), HDR_COLUMN_ADDRESS);
        assert_eq!(header([0x08, 0, 0, 0]), HDR_REFERENCE_TIMESTAMP);
        assert_eq!(header([0x40, 0, 0, 0]), HDR_PACKET_ID);
        assert_eq!(header([0x00, 0, 0, 0]), HDR_PADDING);
        // Low two bits do not participate in dispatch
        assert_eq!(header([0x07, 0, 0, 0]), HDR_COLUMN_ADDRESS);
    }

    #[test]
    fn test_group_fields() {
        // grpAddr=9 (0b001001 << 2 = 0x24), pol bits set on both masks
        let word = [0x80 | 0x14, 0x24 | 0x03, 0xAA, 0x55];
        assert_eq!(group_address(word), 9);
        assert_eq!(group_address_offset(word), 5);
        assert!(group_polarity_b3(word));
        assert!(group_polarity_b2(word));
    }

    #[test]
    fn test_column_address_fields() {
        // subTs = 0b10101_01010 = 682, column = 0b10_11001100 = 716
        let word = [0x04, 0b000_10101, 0b01010_0_10, 0b11001100];
        assert_eq!(column_sub_timestamp(word), 682);
        assert_eq!(column_address_raw(word), 716);
    }

    #[test]
    fn test_reference_timestamp_field() {
        // 22-bit value 0x2ABCDE
        let word = [0x08, 0x2A, 0xBC, 0xDE];
        assert_eq!(reference_timestamp_ms(word), 0x2ABCDE);
        // High two bits of b1 are masked off
        let word2 = [0x08, 0xEA, 0xBC, 0xDE];
        assert_eq!(reference_timestamp_ms(word2), 0x2ABCDE);
    }

    #[test]
    fn test_packet_id_field() {
        let word = [0x40, 0x01, 0x02, 0x03];
        assert_eq!(packet_id(word), 0x010203);
    }
}
