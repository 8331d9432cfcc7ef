//! Generate Linux DRM panel drivers from (downstream) MDSS DSI device
//! tree blobs.
//!
//! The pipeline is a pure transformation: a parsed device tree
//! ([`fdt_parser::Fdt`]) is interpreted into a [`panel::Panel`]
//! descriptor, its raw command blobs are normalized into ordered
//! [`sequence::DsiCommand`] lists, and the emitters render deterministic
//! driver source text from the result. Identical descriptors always
//! produce byte-identical output, so regenerated drivers diff cleanly.

pub mod driver;
pub mod dtsi;
pub mod lk;
pub mod mipi;
pub mod options;
pub mod panel;
pub mod sequence;
pub mod simple;

mod wrap;

#[cfg(test)]
pub(crate) mod testing {
    use crate::panel::{Axis, LaneMap, Mode, Panel, TrafficMode};
    use crate::sequence::{CommandSequence, TransmitMode};

    /// A plain 720p video mode panel, the baseline for emitter tests.
    pub(crate) fn test_panel() -> Panel {
        Panel {
            name: "test panel".into(),
            node_name: "qcom,mdss_dsi_test_720p_video".into(),
            id: "test_720p_video".into(),
            short_id: "test".into(),
            h: Axis {
                px: 720,
                front_porch: 100,
                back_porch: 90,
                pulse_width: 10,
                size_mm: 62,
            },
            v: Axis {
                px: 1280,
                front_porch: 14,
                back_porch: 12,
                pulse_width: 2,
                size_mm: 110,
            },
            framerate: 60,
            bpp: 24,
            mode: Mode::Video,
            traffic_mode: TrafficMode::SyncPulse,
            backlight: None,
            max_brightness: None,
            lanes: 4,
            lane_map: LaneMap::Map0123,
            flags: vec!["MIPI_DSI_MODE_VIDEO", "MIPI_DSI_MODE_VIDEO_SYNC_PULSE"],
            reset_seq: vec![(1, 10), (0, 10), (1, 20)],
            on: CommandSequence {
                mode: TransmitMode::LowPower,
                commands: Vec::new(),
            },
            off: CommandSequence {
                mode: TransmitMode::LowPower,
                commands: Vec::new(),
            },
            format: "MIPI_DSI_FMT_RGB888",
            cphy_mode: false,
            ldo_mode: false,
            timings: vec![0xb0, 0x23],
            tclk_post: 4,
            tclk_pre: 0x1b,
            hsync_skew: 0,
            bllp_power_mode: true,
            bllp_eof_power_mode: true,
            lp11_init: false,
            init_delay_us: 0,
            dsc: None,
        }
    }
}
