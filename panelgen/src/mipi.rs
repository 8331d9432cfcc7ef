//! MIPI DSI transaction types, the DCS command table and per-command C
//! fragment generation.
//!
//! Transaction values come from the MIPI Display Working Group
//! specifications (see include/video/mipi_display.h in the kernel);
//! the generated fragments target the mipi_dsi_*_multi helper API in
//! drivers/gpu/drm/drm_mipi_dsi.c.

use thiserror::Error;
use tracing::warn;

use crate::options::Options;
use crate::wrap;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("{0} is not supported")]
    UnsupportedTransaction(&'static str),
    #[error("payload too long for short packet: {0} bytes")]
    PayloadTooLong(usize),
}

/// How a transaction's payload is rendered into C source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Generator {
    GenericWrite,
    DcsWrite,
    Peripheral,
    Compression,
    Ignore,
    Unsupported,
}

macro_rules! transactions {
    (@max) => { None };
    (@max $m:literal) => { Some($m) };
    (@gen) => { Generator::Unsupported };
    (@gen $g:ident) => { Generator::$g };

    ($($variant:ident = $value:literal, $label:literal
        $(, max_args = $max:literal)? $(, gen = $gen:ident)?;)*) => {
        /// MIPI DSI processor-to-peripheral transaction types.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Transaction {
            $($variant,)*
        }

        impl Transaction {
            pub fn from_u8(value: u8) -> Option<Self> {
                match value {
                    $($value => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Wire value of the transaction type byte.
            pub fn value(self) -> u8 {
                match self {
                    $(Self::$variant => $value,)*
                }
            }

            /// Specification name, as spelled in mipi_display.h.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)*
                }
            }

            /// Maximum number of payload bytes after the command byte
            /// that the transaction can actually transmit, or `None`
            /// when unbounded (long packets).
            pub fn max_args(self) -> Option<usize> {
                match self {
                    $(Self::$variant => transactions!(@max $($max)?),)*
                }
            }

            fn generator(self) -> Generator {
                match self {
                    $(Self::$variant => transactions!(@gen $($gen)?),)*
                }
            }
        }
    };
}

transactions! {
    VSyncStart = 0x01, "V_SYNC_START";
    VSyncEnd = 0x11, "V_SYNC_END";
    HSyncStart = 0x21, "H_SYNC_START";
    HSyncEnd = 0x31, "H_SYNC_END";

    CompressionMode = 0x07, "COMPRESSION_MODE", max_args = 1, gen = Compression;
    EndOfTransmission = 0x08, "END_OF_TRANSMISSION";

    ColorModeOff = 0x02, "COLOR_MODE_OFF";
    ColorModeOn = 0x12, "COLOR_MODE_ON";
    ShutdownPeripheral = 0x22, "SHUTDOWN_PERIPHERAL", max_args = 0, gen = Peripheral;
    TurnOnPeripheral = 0x32, "TURN_ON_PERIPHERAL", max_args = 0, gen = Peripheral;

    GenericShortWrite0 = 0x03, "GENERIC_SHORT_WRITE_0_PARAM", max_args = 0, gen = GenericWrite;
    GenericShortWrite1 = 0x13, "GENERIC_SHORT_WRITE_1_PARAM", max_args = 1, gen = GenericWrite;
    GenericShortWrite2 = 0x23, "GENERIC_SHORT_WRITE_2_PARAM", max_args = 2, gen = GenericWrite;

    GenericReadRequest0 = 0x04, "GENERIC_READ_REQUEST_0_PARAM";
    GenericReadRequest1 = 0x14, "GENERIC_READ_REQUEST_1_PARAM";
    GenericReadRequest2 = 0x24, "GENERIC_READ_REQUEST_2_PARAM";

    DcsShortWrite = 0x05, "DCS_SHORT_WRITE", max_args = 0, gen = DcsWrite;
    DcsShortWriteParam = 0x15, "DCS_SHORT_WRITE_PARAM", max_args = 1, gen = DcsWrite;

    DcsRead = 0x06, "DCS_READ";
    ExecuteQueue = 0x16, "EXECUTE_QUEUE";

    SetMaximumReturnPacketSize = 0x37, "SET_MAXIMUM_RETURN_PACKET_SIZE", gen = Ignore;

    NullPacket = 0x09, "NULL_PACKET", gen = Ignore;
    BlankingPacket = 0x19, "BLANKING_PACKET";
    GenericLongWrite = 0x29, "GENERIC_LONG_WRITE", gen = GenericWrite;
    DcsLongWrite = 0x39, "DCS_LONG_WRITE", gen = DcsWrite;

    PictureParameterSet = 0x0a, "PICTURE_PARAMETER_SET";
    CompressedPixelStream = 0x0b, "COMPRESSED_PIXEL_STREAM";

    LooselyPackedPixelStreamYcbcr20 = 0x0c, "LOOSELY_PACKED_PIXEL_STREAM_YCBCR20";
    PackedPixelStreamYcbcr24 = 0x1c, "PACKED_PIXEL_STREAM_YCBCR24";
    PackedPixelStreamYcbcr16 = 0x2c, "PACKED_PIXEL_STREAM_YCBCR16";

    PackedPixelStream30 = 0x0d, "PACKED_PIXEL_STREAM_30";
    PackedPixelStream36 = 0x1d, "PACKED_PIXEL_STREAM_36";
    PackedPixelStreamYcbcr12 = 0x3d, "PACKED_PIXEL_STREAM_YCBCR12";

    PackedPixelStream16 = 0x0e, "PACKED_PIXEL_STREAM_16";
    PackedPixelStream18 = 0x1e, "PACKED_PIXEL_STREAM_18";
    PixelStream3Byte18 = 0x2e, "PIXEL_STREAM_3BYTE_18";
    PackedPixelStream24 = 0x3e, "PACKED_PIXEL_STREAM_24";
}

impl Transaction {
    /// Whether the transaction is a long packet, per
    /// mipi_dsi_packet_format_is_long().
    pub fn is_long(self) -> bool {
        matches!(
            self,
            Transaction::NullPacket
                | Transaction::BlankingPacket
                | Transaction::GenericLongWrite
                | Transaction::DcsLongWrite
                | Transaction::PictureParameterSet
                | Transaction::CompressedPixelStream
                | Transaction::LooselyPackedPixelStreamYcbcr20
                | Transaction::PackedPixelStreamYcbcr24
                | Transaction::PackedPixelStreamYcbcr16
                | Transaction::PackedPixelStream30
                | Transaction::PackedPixelStream36
                | Transaction::PackedPixelStreamYcbcr12
                | Transaction::PackedPixelStream16
                | Transaction::PackedPixelStream18
                | Transaction::PixelStream3Byte18
                | Transaction::PackedPixelStream24
        )
    }

    /// Render the C statement(s) transmitting this transaction.
    pub fn generate(self, payload: &[u8], options: &Options) -> Result<String, EmitError> {
        match self.generator() {
            Generator::GenericWrite => Ok(generate_generic_write(payload)),
            Generator::DcsWrite => Ok(generate_dcs_write(payload, options)),
            Generator::Peripheral => Ok(generate_peripheral(self)),
            Generator::Compression => Ok(generate_compression_mode(payload)),
            Generator::Ignore => {
                warn!("ignoring weird {}", self.name());
                Ok(format!("\t// WARNING: Ignoring weird {}", self.name()))
            }
            Generator::Unsupported => Err(EmitError::UnsupportedTransaction(self.name())),
        }
    }
}

fn hex_fill(value: u64, size: usize) -> String {
    format!("{:#0width$x}", value, width = size * 2 + 2)
}

fn hex_params(payload: &[u8]) -> Vec<String> {
    payload.iter().map(|&b| hex_fill(b as u64, 1)).collect()
}

/// Render `size`-byte integers; a short payload becomes one value of
/// whatever bytes are present. Trailing bytes that do not fill a whole
/// integer are dropped.
fn int_params(payload: &[u8], size: usize, little_endian: bool) -> Vec<String> {
    let from_bytes = |chunk: &[u8]| -> u64 {
        chunk.iter().enumerate().fold(0u64, |acc, (i, &b)| {
            let shift = if little_endian {
                i * 8
            } else {
                (chunk.len() - 1 - i) * 8
            };
            acc | (b as u64) << shift
        })
    };

    if payload.len() < size {
        return vec![hex_fill(from_bytes(payload), size)];
    }
    payload
        .chunks_exact(size)
        .map(|c| hex_fill(from_bytes(c), size))
        .collect()
}

fn tear_mode_params(payload: &[u8]) -> Result<Vec<String>, ()> {
    match payload.first() {
        Some(0) => Ok(vec!["MIPI_DSI_DCS_TEAR_MODE_VBLANK".into()]),
        Some(1) => Ok(vec!["MIPI_DSI_DCS_TEAR_MODE_VHBLANK".into()]),
        _ => Err(()),
    }
}

#[derive(Debug, Clone, Copy)]
enum ParamStyle {
    Hex,
    Int { size: usize, little_endian: bool },
    Tear,
}

/// One entry of the DCS command schema: wire value, specification name,
/// accepted argument counts (empty = unchecked), the mainline helper to
/// call when one exists, and how arguments render.
struct DcsInfo {
    value: u8,
    name: &'static str,
    nargs: &'static [usize],
    method: Option<&'static str>,
    style: ParamStyle,
}

impl DcsInfo {
    fn identifier(&self) -> String {
        format!("MIPI_DCS_{}", self.name)
    }

    fn params(&self, payload: &[u8]) -> Result<Vec<String>, ()> {
        match self.style {
            ParamStyle::Hex => Ok(hex_params(payload)),
            ParamStyle::Int { size, little_endian } => {
                Ok(int_params(payload, size, little_endian))
            }
            ParamStyle::Tear => tear_mode_params(payload),
        }
    }
}

const fn dcs(value: u8, name: &'static str, nargs: &'static [usize]) -> DcsInfo {
    DcsInfo {
        value,
        name,
        nargs,
        method: None,
        style: ParamStyle::Hex,
    }
}

const fn dcs_m(
    value: u8,
    name: &'static str,
    nargs: &'static [usize],
    method: &'static str,
) -> DcsInfo {
    DcsInfo {
        value,
        name,
        nargs,
        method: Some(method),
        style: ParamStyle::Hex,
    }
}

const fn dcs_ms(
    value: u8,
    name: &'static str,
    nargs: &'static [usize],
    method: &'static str,
    style: ParamStyle,
) -> DcsInfo {
    DcsInfo {
        value,
        name,
        nargs,
        method: Some(method),
        style,
    }
}

const BE16: ParamStyle = ParamStyle::Int {
    size: 2,
    little_endian: false,
};
const LE16: ParamStyle = ParamStyle::Int {
    size: 2,
    little_endian: true,
};

/// MIPI DCS commands this generator understands.
static DCS_COMMANDS: &[DcsInfo] = &[
    dcs_m(0x00, "NOP", &[0], "mipi_dsi_dcs_nop_multi"),
    dcs_m(0x01, "SOFT_RESET", &[0], "mipi_dsi_dcs_soft_reset_multi"),
    dcs_m(0x10, "ENTER_SLEEP_MODE", &[0], "mipi_dsi_dcs_enter_sleep_mode_multi"),
    dcs_m(0x11, "EXIT_SLEEP_MODE", &[0], "mipi_dsi_dcs_exit_sleep_mode_multi"),
    dcs(0x12, "ENTER_PARTIAL_MODE", &[0]),
    dcs(0x13, "ENTER_NORMAL_MODE", &[0]),
    dcs(0x20, "EXIT_INVERT_MODE", &[0]),
    dcs(0x21, "ENTER_INVERT_MODE", &[0]),
    dcs(0x26, "SET_GAMMA_CURVE", &[1]),
    dcs_m(0x28, "SET_DISPLAY_OFF", &[0], "mipi_dsi_dcs_set_display_off_multi"),
    dcs_m(0x29, "SET_DISPLAY_ON", &[0], "mipi_dsi_dcs_set_display_on_multi"),
    dcs_ms(0x2a, "SET_COLUMN_ADDRESS", &[4], "mipi_dsi_dcs_set_column_address_multi", BE16),
    dcs_ms(0x2b, "SET_PAGE_ADDRESS", &[4], "mipi_dsi_dcs_set_page_address_multi", BE16),
    dcs(0x2c, "WRITE_MEMORY_START", &[]),
    dcs(0x2d, "WRITE_LUT", &[]),
    dcs(0x2e, "READ_MEMORY_START", &[]),
    dcs(0x30, "SET_PARTIAL_ROWS", &[]),
    dcs(0x31, "SET_PARTIAL_COLUMNS", &[]),
    dcs(0x33, "SET_SCROLL_AREA", &[6]),
    dcs_m(0x34, "SET_TEAR_OFF", &[0], "mipi_dsi_dcs_set_tear_off_multi"),
    dcs_ms(0x35, "SET_TEAR_ON", &[1], "mipi_dsi_dcs_set_tear_on_multi", ParamStyle::Tear),
    dcs(0x36, "SET_ADDRESS_MODE", &[1]),
    dcs(0x37, "SET_SCROLL_START", &[2]),
    dcs(0x38, "EXIT_IDLE_MODE", &[0]),
    dcs(0x39, "ENTER_IDLE_MODE", &[0]),
    dcs_m(0x3a, "SET_PIXEL_FORMAT", &[1], "mipi_dsi_dcs_set_pixel_format_multi"),
    dcs(0x3c, "WRITE_MEMORY_CONTINUE", &[]),
    dcs(0x3d, "SET_3D_CONTROL", &[]),
    dcs(0x3e, "READ_MEMORY_CONTINUE", &[]),
    dcs(0x40, "SET_VSYNC_TIMING", &[]),
    dcs_ms(0x44, "SET_TEAR_SCANLINE", &[2], "mipi_dsi_dcs_set_tear_scanline_multi", BE16),
    dcs(0x45, "GET_SCANLINE", &[]),
    dcs_ms(0x51, "SET_DISPLAY_BRIGHTNESS", &[1, 2], "mipi_dsi_dcs_set_display_brightness_multi", LE16),
    dcs(0x53, "WRITE_CONTROL_DISPLAY", &[1]),
    dcs(0x55, "WRITE_POWER_SAVE", &[1]),
    dcs(0x5e, "SET_CABC_MIN_BRIGHTNESS", &[]),
    dcs(0xa1, "READ_DDB_START", &[]),
    dcs(0xa2, "READ_PPS_START", &[]),
    dcs(0xa8, "READ_DDB_CONTINUE", &[]),
    dcs(0xa9, "READ_PPS_CONTINUE", &[]),
];

/// Commands still interpreted in dumb-DCS mode: any panel should
/// implement these per the specification.
const DUMB_ALLOWED: &[u8] = &[0x10, 0x11, 0x29, 0x28];

/// Look up a DCS command by the first payload byte, rejecting entries
/// whose argument count or argument values do not fit.
fn find_dcs(payload: &[u8], dumb: bool) -> Option<&'static DcsInfo> {
    let value = *payload.first()?;
    let info = DCS_COMMANDS.iter().find(|d| d.value == value)?;

    if dumb && !DUMB_ALLOWED.contains(&info.value) {
        return None;
    }

    if !info.nargs.is_empty() && !info.nargs.contains(&(payload.len() - 1)) {
        let expected = info
            .nargs
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        warn!(
            "DCS command {} with incorrect argument count (expected: {}, is: {}). \
             Consider using --dumb-dcs",
            info.name,
            expected,
            payload.len() - 1
        );
        return None;
    }

    if info.params(&payload[1..]).is_err() {
        warn!(
            "DCS command {} with invalid arguments {:02x?}. Consider using --dumb-dcs",
            info.name,
            &payload[1..]
        );
        return None;
    }

    Some(info)
}

fn generate_call(method: &str, args: &[String]) -> String {
    wrap::join(&format!("\t{method}("), ",", ");", args, None)
}

fn generate_generic_write(payload: &[u8]) -> String {
    let mut params = hex_params(payload);
    params.insert(0, "&dsi_ctx".into());
    wrap::join(
        "\tmipi_dsi_generic_write_seq_multi(",
        ",",
        ");",
        &params,
        Some(2),
    )
}

fn generate_dcs_write(payload: &[u8], options: &Options) -> String {
    let dcs = find_dcs(payload, options.dumb_dcs);

    if let Some(info) = dcs {
        if let (Some(method), Ok(mut params)) = (info.method, info.params(&payload[1..])) {
            params.insert(0, "&dsi_ctx".into());
            return generate_call(method, &params);
        }
    }

    let mut params = hex_params(payload);
    if let Some(info) = dcs {
        params[0] = info.identifier();
    }
    params.insert(0, "&dsi_ctx".into());

    wrap::join(
        "\tmipi_dsi_dcs_write_seq_multi(",
        ",",
        ");",
        &params,
        Some(2),
    )
}

fn generate_peripheral(t: Transaction) -> String {
    let method = match t {
        Transaction::TurnOnPeripheral => "mipi_dsi_turn_on_peripheral_multi",
        Transaction::ShutdownPeripheral => "mipi_dsi_shutdown_peripheral_multi",
        _ => unreachable!("not a peripheral transaction"),
    };
    generate_call(method, &["&dsi_ctx".into()])
}

fn generate_compression_mode(payload: &[u8]) -> String {
    let enable = payload.first().map(|&b| b != 0).unwrap_or(false);
    generate_call(
        "mipi_dsi_compression_mode_ext_multi",
        &[
            "&dsi_ctx".into(),
            enable.to_string(),
            "MIPI_DSI_COMPRESSION_DSC".into(),
            "0".into(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> Options {
        Options::default()
    }

    #[test]
    fn transaction_round_trips_wire_values() {
        for (value, t) in [
            (0x05, Transaction::DcsShortWrite),
            (0x15, Transaction::DcsShortWriteParam),
            (0x29, Transaction::GenericLongWrite),
            (0x39, Transaction::DcsLongWrite),
        ] {
            assert_eq!(Transaction::from_u8(value), Some(t));
            assert_eq!(t.value(), value);
        }
        assert_eq!(Transaction::from_u8(0xff), None);
    }

    #[test]
    fn known_dcs_commands_use_helpers() {
        // 0x11 = EXIT_SLEEP_MODE, no arguments
        let out = Transaction::DcsShortWrite.generate(&[0x11], &opts()).unwrap();
        assert_eq!(out, "\tmipi_dsi_dcs_exit_sleep_mode_multi(&dsi_ctx);");
    }

    #[test]
    fn brightness_arguments_render_little_endian() {
        let out = Transaction::DcsLongWrite
            .generate(&[0x51, 0xff, 0x03], &opts())
            .unwrap();
        assert_eq!(
            out,
            "\tmipi_dsi_dcs_set_display_brightness_multi(&dsi_ctx, 0x03ff);"
        );
    }

    #[test]
    fn unknown_dcs_commands_fall_back_to_raw_writes() {
        let out = Transaction::DcsLongWrite
            .generate(&[0xf0, 0x5a, 0x5a], &opts())
            .unwrap();
        assert_eq!(
            out,
            "\tmipi_dsi_dcs_write_seq_multi(&dsi_ctx, 0xf0, 0x5a, 0x5a);"
        );
    }

    #[test]
    fn named_dcs_without_helper_uses_identifier() {
        // 0x36 = SET_ADDRESS_MODE has no mainline helper
        let out = Transaction::DcsShortWriteParam
            .generate(&[0x36, 0x00], &opts())
            .unwrap();
        assert_eq!(
            out,
            "\tmipi_dsi_dcs_write_seq_multi(&dsi_ctx, MIPI_DCS_SET_ADDRESS_MODE, 0x00);"
        );
    }

    #[test]
    fn dumb_mode_only_interprets_the_safe_subset() {
        let mut options = opts();
        options.dumb_dcs = true;

        let out = Transaction::DcsShortWriteParam
            .generate(&[0x36, 0x00], &options)
            .unwrap();
        assert_eq!(out, "\tmipi_dsi_dcs_write_seq_multi(&dsi_ctx, 0x36, 0x00);");

        let out = Transaction::DcsShortWrite.generate(&[0x11], &options).unwrap();
        assert_eq!(out, "\tmipi_dsi_dcs_exit_sleep_mode_multi(&dsi_ctx);");
    }

    #[test]
    fn argument_count_mismatch_disables_interpretation() {
        // SET_TEAR_ON expects exactly one argument
        let out = Transaction::DcsLongWrite
            .generate(&[0x35, 0x00, 0x00], &opts())
            .unwrap();
        assert!(out.starts_with("\tmipi_dsi_dcs_write_seq_multi("), "{out}");
    }

    #[test]
    fn read_transactions_are_unsupported() {
        assert!(Transaction::DcsRead.generate(&[0x0a], &opts()).is_err());
    }
}
