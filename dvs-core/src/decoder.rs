//! Stateful DVS packet decoder.
//!
//! This module implements the decoding state machine that reconstructs
//! event timestamps and column addresses across raw buffers. The protocol
//! interleaves infrequent 22-bit reference timestamps (milliseconds) with
//! frequent 10-bit sub-timestamps, so decoder state must persist for the
//! lifetime of the stream, not per buffer.

use crate::parser;
use crate::types::{Event, SENSOR_X_EXTENT, SENSOR_Y_EXTENT};

/// Stateful decoder for the 4-byte DVS packet stream.
///
/// Decoding is deterministic given the buffer contents and the incoming
/// state, and it never fails: malformed or unrecognized input degrades to
/// fewer events. Buffers must be fed in arrival order, since timestamp
/// reconstruction depends on it.
#[derive(Debug, Default)]
pub struct PacketDecoder {
    // Timestamp state: reference timestamp (scaled to us) plus the most
    // recent sub-timestamp offset.
    long_ts: u32,
    short_ts: u16,
    time_stamp: u32,

    // Column address shared by subsequent group packets.
    pos_x: u16,

    // Packet ID observability counters. The sensor numbers its packets so
    // hosts can detect loss; nothing here acts on a gap.
    last_packet_id: u32,
    packet_id_count: u64,
}

impl PacketDecoder {
    /// Creates a decoder with zeroed state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current reconstructed timestamp in microseconds.
    pub fn timestamp(&self) -> u32 {
        self.time_stamp
    }

    /// Current column address applied to group packets.
    pub fn pos_x(&self) -> u16 {
        self.pos_x
    }

    /// The most recently decoded 22-bit packet ID.
    pub fn last_packet_id(&self) -> u32 {
        self.last_packet_id
    }

    /// Number of packet ID words seen since the decoder was created.
    pub fn packet_id_count(&self) -> u64 {
        self.packet_id_count
    }

    /// Decodes a raw buffer into `events`, threading decoder state across
    /// calls.
    ///
    /// The buffer is processed in 4-byte units; a trailing partial unit is
    /// silently discarded. Unknown headers are skipped.
    pub fn decode_buffer(&mut self, buf: &[u8], events: &mut Vec<Event>) {
        for chunk in buf.chunks_exact(4) {
            let word = [chunk[0], chunk[1], chunk[2], chunk[3]];

            if parser::is_group_packet(word) {
                self.decode_group(word, events);
            } else {
                match parser::header(word) {
                    parser::HDR_COLUMN_ADDRESS => {
                        self.short_ts = parser::column_sub_timestamp(word);
                        self.time_stamp = self.long_ts.wrapping_add(self.short_ts as u32);
                        // The sensor is mounted rotated, so the column
                        // address is flipped across the x extent.
                        self.pos_x =
                            (SENSOR_X_EXTENT - 1).saturating_sub(parser::column_address_raw(word));
                    }
                    parser::HDR_REFERENCE_TIMESTAMP => {
                        self.long_ts = parser::reference_timestamp_ms(word).wrapping_mul(1000);
                        self.time_stamp = self.long_ts.wrapping_add(self.short_ts as u32);
                    }
                    parser::HDR_PACKET_ID => {
                        self.last_packet_id = parser::packet_id(word);
                        self.packet_id_count += 1;
                    }
                    parser::HDR_PADDING => {}
                    _ => {
                        // Unknown header: skip, forward-compatible
                    }
                }
            }
        }
    }

    /// Decodes a group packet, which encodes up to 16 simultaneous events
    /// at the current timestamp and column address via two 8-row bitmasks.
    #[inline]
    fn decode_group(&mut self, word: [u8; 4], events: &mut Vec<Event>) {
        let mut grp_addr = parser::group_address(word);

        if word[3] != 0 {
            let polarity = parser::group_polarity_b3(word);
            self.emit_bitmask(grp_addr, word[3], polarity, events);
        }

        if word[2] != 0 {
            grp_addr += parser::group_address_offset(word);
            let polarity = parser::group_polarity_b2(word);
            self.emit_bitmask(grp_addr, word[2], polarity, events);
        }
    }

    /// Emits one event per set bit in `mask`, at rows flipped across the
    /// sensor's y extent. Rows that fall outside the sensor are skipped.
    #[inline]
    fn emit_bitmask(&self, grp_addr: u16, mask: u8, polarity: bool, events: &mut Vec<Event>) {
        let base = grp_addr * 8;
        for n in 0..8u16 {
            if (mask >> n) & 0x01 != 0 {
                let pos_y = base + n;
                if pos_y < SENSOR_Y_EXTENT {
                    let y = SENSOR_Y_EXTENT - 1 - pos_y;
                    events.push(Event::new(self.pos_x, y, polarity, self.time_stamp));
                }
            }
        }
    }
}
