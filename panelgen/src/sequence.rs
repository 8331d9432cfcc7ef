//! Decoder for the packed DSI command streams found in panel device
//! trees (qcom,mdss-dsi-on-command and friends).
//!
//! Each record is a 7 byte header followed by the payload:
//!
//! ```text
//! +-------+------+----+-----+------+----------+---------+
//! | dtype | last | vc | ack | wait | dlen(BE) | payload |
//! +-------+------+----+-----+------+----------+---------+
//!     1       1    1     1     1        2        dlen
//! ```

use thiserror::Error;
use tracing::debug;

use crate::mipi::Transaction;

#[derive(Debug, Error)]
#[error("command stream '{phase}' at offset {offset:#x}: {what}")]
pub struct SequenceError {
    pub phase: String,
    pub offset: usize,
    pub what: &'static str,
}

/// Whether a command stream is sent in low-power or high-speed mode,
/// from the qcom,mdss-dsi-*-command-state property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitMode {
    LowPower,
    HighSpeed,
}

impl TransmitMode {
    pub fn parse(state: &str) -> Option<Self> {
        match state {
            "dsi_lp_mode" => Some(Self::LowPower),
            "dsi_hs_mode" => Some(Self::HighSpeed),
            _ => None,
        }
    }
}

/// A single decoded DSI command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsiCommand {
    pub kind: Transaction,
    /// DMA batching flag. Set on the final command of a batch; most
    /// device trees set it on every command.
    pub last: bool,
    /// Virtual channel.
    pub vc: u8,
    pub ack: bool,
    /// Delay after transmission, in milliseconds.
    pub wait_ms: u8,
    pub payload: Vec<u8>,
}

/// A decoded command stream together with its transmit mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSequence {
    pub mode: TransmitMode,
    pub commands: Vec<DsiCommand>,
}

impl CommandSequence {
    /// Decode a packed command stream. `phase` names the source
    /// property for diagnostics.
    pub fn decode(phase: &str, mode: TransmitMode, blob: &[u8]) -> Result<Self, SequenceError> {
        let err = |offset, what| SequenceError {
            phase: phase.to_owned(),
            offset,
            what,
        };

        let mut commands = Vec::new();
        let mut at = 0;

        while at < blob.len() {
            let rec = &blob[at..];
            if rec.len() < 7 {
                return Err(err(at, "truncated record header"));
            }

            let kind = Transaction::from_u8(rec[0])
                .ok_or_else(|| err(at, "unknown transaction type"))?;
            let dlen = u16::from_be_bytes([rec[5], rec[6]]) as usize;
            if rec.len() < 7 + dlen {
                return Err(err(at, "payload extends past end of property"));
            }

            let mut payload = rec[7..7 + dlen].to_vec();
            // Some vendors pad the payload beyond what the transaction
            // can carry; trim to what actually goes on the wire.
            if let Some(max) = kind.max_args() {
                payload.truncate(max + 1);
            }

            commands.push(DsiCommand {
                kind,
                last: rec[1] != 0,
                vc: rec[2],
                ack: rec[3] != 0,
                wait_ms: rec[4],
                payload,
            });
            at += 7 + dlen;
        }

        debug!("decoded {} commands from '{}'", commands.len(), phase);
        Ok(CommandSequence { mode, commands })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_short_and_long_records() {
        #[rustfmt::skip]
        let blob = [
            // DCS_SHORT_WRITE, last, vc 0, no ack, 120 ms, 1 byte: exit sleep
            0x05, 0x01, 0x00, 0x00, 0x78, 0x00, 0x01, 0x11,
            // DCS_LONG_WRITE, 3 bytes
            0x39, 0x01, 0x00, 0x00, 0x00, 0x00, 0x03, 0x51, 0xff, 0x03,
        ];

        let seq = CommandSequence::decode("on", TransmitMode::LowPower, &blob).unwrap();
        assert_eq!(seq.commands.len(), 2);

        assert_eq!(seq.commands[0].kind, Transaction::DcsShortWrite);
        assert_eq!(seq.commands[0].wait_ms, 120);
        assert!(seq.commands[0].last);
        assert_eq!(seq.commands[0].payload, [0x11]);

        assert_eq!(seq.commands[1].kind, Transaction::DcsLongWrite);
        assert_eq!(seq.commands[1].payload, [0x51, 0xff, 0x03]);
    }

    #[test]
    fn oversized_short_payloads_are_trimmed() {
        // DCS_SHORT_WRITE_PARAM carries at most cmd + 1 argument, but
        // the record claims 4 payload bytes.
        let blob = [0x15, 0x01, 0x00, 0x00, 0x00, 0x00, 0x04, 0x36, 0x00, 0xde, 0xad];
        let seq = CommandSequence::decode("on", TransmitMode::LowPower, &blob).unwrap();
        assert_eq!(seq.commands[0].payload, [0x36, 0x00]);
    }

    #[test]
    fn truncation_errors_carry_the_record_offset() {
        let blob = [
            0x05, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01, 0x11, // good record
            0x39, 0x01, 0x00, // cut off mid-header
        ];
        let e = CommandSequence::decode("off", TransmitMode::HighSpeed, &blob).unwrap_err();
        assert_eq!(e.offset, 8);
        assert_eq!(e.what, "truncated record header");
        assert_eq!(e.phase, "off");
    }

    #[test]
    fn payload_overrun_is_an_error() {
        let blob = [0x39, 0x01, 0x00, 0x00, 0x00, 0x00, 0x10, 0x51];
        let e = CommandSequence::decode("on", TransmitMode::LowPower, &blob).unwrap_err();
        assert_eq!(e.what, "payload extends past end of property");
    }

    #[test]
    fn unknown_transaction_types_are_rejected() {
        let blob = [0xff, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
        let e = CommandSequence::decode("on", TransmitMode::LowPower, &blob).unwrap_err();
        assert_eq!(e.what, "unknown transaction type");
        assert_eq!(e.offset, 0);
    }

    #[test]
    fn empty_blob_decodes_to_no_commands() {
        let seq = CommandSequence::decode("on", TransmitMode::LowPower, &[]).unwrap();
        assert!(seq.commands.is_empty());
    }
}
