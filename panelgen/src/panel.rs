//! Panel model parsed from a qcom MDSS DSI device tree.
//!
//! The downstream schema spreads a panel over one node (plus an optional
//! per-timing subnode on newer SoCs); everything the emitters need is
//! pulled into [`Panel`] up front so generation itself cannot fail on
//! missing data.

use std::collections::BTreeSet;

use fdt_parser::{Fdt, NodeId, Property, SchemaError};
use thiserror::Error;
use tracing::{info, warn};

use crate::sequence::{CommandSequence, SequenceError, TransmitMode};

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("required property '{0}' is missing")]
    MissingProperty(String),
    #[error("phandle {0:#x} does not resolve to any node")]
    UnresolvedPhandle(u32),
    #[error("qcom,mdss-dsi-display-timings has no timing subnodes")]
    NoDisplayTimings,
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    #[error("unsupported bpp: {0}")]
    UnsupportedBpp(u32),
    #[error("unknown {what}: '{value}'")]
    UnknownValue {
        what: &'static str,
        value: String,
    },
}

fn require<'a, 'b>(
    fdt: &'b Fdt<'a>,
    node: NodeId,
    name: &str,
) -> Result<&'b Property<'a>, PanelError> {
    fdt.prop(node, name)
        .ok_or_else(|| PanelError::MissingProperty(name.to_owned()))
}

fn prop_u32_opt(fdt: &Fdt, node: NodeId, name: &str) -> Result<Option<u32>, SchemaError> {
    fdt.prop(node, name).map(|p| p.as_u32()).transpose()
}

/// DSI operating mode, from qcom,mdss-dsi-panel-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Video,
    Command,
}

impl Mode {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "dsi_video_mode" => Some(Mode::Video),
            "dsi_cmd_mode" => Some(Mode::Command),
            _ => None,
        }
    }

    fn flags(self) -> &'static [&'static str] {
        match self {
            Mode::Video => &["MIPI_DSI_MODE_VIDEO"],
            Mode::Command => &[],
        }
    }
}

/// Video mode traffic pattern, from qcom,mdss-dsi-traffic-mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrafficMode {
    SyncPulse,
    SyncEvent,
    Burst,
}

impl TrafficMode {
    const ALL: [TrafficMode; 3] = [
        TrafficMode::SyncPulse,
        TrafficMode::SyncEvent,
        TrafficMode::Burst,
    ];

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "non_burst_sync_pulse" => Some(TrafficMode::SyncPulse),
            "non_burst_sync_event" => Some(TrafficMode::SyncEvent),
            "burst_mode" => Some(TrafficMode::Burst),
            _ => None,
        }
    }

    fn flags(self) -> &'static [&'static str] {
        match self {
            TrafficMode::SyncPulse => &["MIPI_DSI_MODE_VIDEO_SYNC_PULSE"],
            TrafficMode::SyncEvent => &[],
            TrafficMode::Burst => &["MIPI_DSI_MODE_VIDEO_BURST"],
        }
    }

    /// Position in the downstream traffic mode table, used by the LK
    /// emitter.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&t| t == self).unwrap_or(0)
    }

    fn parse(prop: &Property) -> Result<Self, PanelError> {
        if prop.is_str() {
            let s = prop.as_str()?;
            return Self::from_str(s).ok_or_else(|| PanelError::UnknownValue {
                what: "traffic mode",
                value: s.to_owned(),
            });
        }

        warn!(
            "qcom,mdss-dsi-traffic-mode is not a null terminated string: {:02x?}",
            prop.value
        );

        // Some Samsung panels store the traffic mode as numeric index.
        if prop.len() == 4 {
            let i = prop.as_u32()? as usize;
            if let Some(&mode) = Self::ALL.get(i) {
                info!("interpreting qcom,mdss-dsi-traffic-mode as numeric index: {i} == {mode:?}");
                return Ok(mode);
            }
        }

        // Default in mdss_dsi_panel.c
        warn!("falling back to MIPI_DSI_MODE_VIDEO_SYNC_PULSE");
        Ok(TrafficMode::SyncPulse)
    }
}

/// Logical-to-physical DSI lane assignment, from qcom,mdss-dsi-lane-map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneMap {
    Map0123,
    Map3012,
    Map2301,
    Map1230,
    Map0321,
    Map1032,
    Map2103,
    Map3210,
}

impl LaneMap {
    const ALL: [LaneMap; 8] = [
        LaneMap::Map0123,
        LaneMap::Map3012,
        LaneMap::Map2301,
        LaneMap::Map1230,
        LaneMap::Map0321,
        LaneMap::Map1032,
        LaneMap::Map2103,
        LaneMap::Map3210,
    ];

    /// Logical lane -> physical lane (the downstream direction).
    pub fn log2phys(self) -> [usize; 4] {
        match self {
            LaneMap::Map0123 => [0, 1, 2, 3],
            LaneMap::Map3012 => [3, 0, 1, 2],
            LaneMap::Map2301 => [2, 3, 0, 1],
            LaneMap::Map1230 => [1, 2, 3, 0],
            LaneMap::Map0321 => [0, 3, 2, 1],
            LaneMap::Map1032 => [1, 0, 3, 2],
            LaneMap::Map2103 => [2, 1, 0, 3],
            LaneMap::Map3210 => [3, 2, 1, 0],
        }
    }

    /// Physical lane -> logical lane (the mainline direction).
    pub fn phys2log(self) -> [usize; 4] {
        let log2phys = self.log2phys();
        let mut out = [0; 4];
        for (logical, &physical) in log2phys.iter().enumerate() {
            out[physical] = logical;
        }
        out
    }

    /// Position in the downstream lane map table, used by the LK emitter.
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&m| m == self).unwrap_or(0)
    }

    fn from_str(value: &str) -> Option<Self> {
        let digits = value.strip_prefix("lane_map_")?;
        Self::ALL.iter().copied().find(|m| {
            m.log2phys()
                .iter()
                .map(|n| char::from(b'0' + *n as u8))
                .eq(digits.chars())
        })
    }

    fn parse(prop: Option<&Property>) -> Result<Self, PanelError> {
        let Some(prop) = prop else {
            return Ok(LaneMap::Map0123);
        };
        if prop.is_str() {
            let s = prop.as_str()?;
            return Self::from_str(s).ok_or_else(|| PanelError::UnknownValue {
                what: "lane map",
                value: s.to_owned(),
            });
        }

        warn!(
            "qcom,mdss-dsi-lane-map is not a null terminated string: {:02x?}",
            prop.value
        );
        Ok(LaneMap::Map0123)
    }
}

/// Backlight control interface, from qcom,mdss-dsi-bl-pmic-control-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklightControl {
    Pwm,
    Dcs,
    Wled,
    SamsungPwm,
}

impl BacklightControl {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "bl_ctrl_pwm" => Some(BacklightControl::Pwm),
            "bl_ctrl_dcs" => Some(BacklightControl::Dcs),
            "bl_ctrl_wled" => Some(BacklightControl::Wled),
            "bl_ctrl_ss_pwm" => Some(BacklightControl::SamsungPwm),
            _ => None,
        }
    }

    /// Interface name in the LK BL_* spelling.
    pub fn lk_name(self) -> &'static str {
        match self {
            BacklightControl::Pwm => "PWM",
            BacklightControl::Dcs => "DCS",
            BacklightControl::Wled => "WLED",
            BacklightControl::SamsungPwm => "SAMSUNG_PWM",
        }
    }
}

/// Timing values along one axis of the panel.
#[derive(Debug, Clone, Copy)]
pub struct Axis {
    /// Visible pixels.
    pub px: u32,
    pub front_porch: u32,
    pub back_porch: u32,
    pub pulse_width: u32,
    /// Physical dimension in millimeters, 0 when unknown.
    pub size_mm: u32,
}

impl Axis {
    fn parse(
        fdt: &Fdt,
        panel_node: NodeId,
        mode_node: NodeId,
        prefix: char,
        size: &str,
    ) -> Result<Axis, PanelError> {
        let u32_of = |name: String| -> Result<u32, PanelError> {
            Ok(require(fdt, mode_node, &name)?.as_u32()?)
        };
        Ok(Axis {
            px: u32_of(format!("qcom,mdss-dsi-panel-{size}"))?,
            front_porch: u32_of(format!("qcom,mdss-dsi-{prefix}-front-porch"))?,
            back_porch: u32_of(format!("qcom,mdss-dsi-{prefix}-back-porch"))?,
            pulse_width: u32_of(format!("qcom,mdss-dsi-{prefix}-pulse-width"))?,
            size_mm: fdt.prop_u32_or(
                panel_node,
                &format!("qcom,mdss-pan-physical-{size}-dimension"),
                0,
            )?,
        })
    }
}

/// Display Stream Compression parameters from the timing node.
#[derive(Debug, Clone, Copy)]
pub struct Dsc {
    pub slice_height: u32,
    pub slice_width: u32,
    pub slice_per_pkt: u32,
    pub bit_per_component: u32,
    pub bit_per_pixel: u32,
    pub block_prediction: bool,
    pub version: u32,
    pub scr_version: u32,
}

fn remove_prefixes<'s>(mut text: &'s str, prefixes: &[&str]) -> &'s str {
    for prefix in prefixes {
        if let Some(rest) = text.strip_prefix(prefix) {
            text = rest;
        }
    }
    text
}

fn remove_before(text: &str, sub: char) -> &str {
    match text.find(sub) {
        Some(i) => &text[i + 1..],
        None => text,
    }
}

fn replace_all(text: &str, subs: &[&str]) -> String {
    let mut s = text.to_owned();
    for sub in subs {
        s = s.replace(sub, "");
    }
    s
}

/// Newer SoCs describe panel modes (resolution, refresh rate) in timing
/// subnodes. Only a single mode is supported; use the first.
fn find_mode_node(fdt: &Fdt, node: NodeId) -> Result<NodeId, PanelError> {
    let Some(timings) = fdt.subnode(node, "qcom,mdss-dsi-display-timings") else {
        return Ok(node);
    };

    let mut subnodes = fdt.children(timings);
    let mode_node = subnodes.next().ok_or(PanelError::NoDisplayTimings)?;
    if subnodes.next().is_some() {
        warn!("multiple display timings are not supported yet, using the first");
    }
    Ok(mode_node)
}

/// Read one command sequence (on or off), chaining in the vendor
/// specific extra streams some trees split out of the on sequence.
fn decode_sequence(fdt: &Fdt, node: NodeId, cmd: &str) -> Result<CommandSequence, PanelError> {
    let state_name = format!("qcom,mdss-dsi-{cmd}-command-state");
    let state = require(fdt, node, &state_name)?.as_str()?;
    let mode = TransmitMode::parse(state).ok_or_else(|| PanelError::UnknownValue {
        what: "command state",
        value: state.to_owned(),
    })?;

    let main = format!("qcom,mdss-dsi-{cmd}-command");
    let mut phases: Vec<&str> = Vec::new();
    if fdt.has_prop(node, &main) {
        if cmd == "on" {
            // Sony puts part of the init sequence in its own property...
            if fdt.has_prop(node, "somc,mdss-dsi-init-command") {
                phases.push("somc,mdss-dsi-init-command");
            }
            phases.push(&main);
            // ...and other vendors append extra streams after power on.
            for extra in [
                "qcom,mdss-dsi-post-panel-on-command",
                "qcom,mdss-dsi-post-on-backlight",
                "lge,display-on-cmds",
            ] {
                if fdt.has_prop(node, extra) {
                    phases.push(extra);
                }
            }
        } else {
            phases.push(&main);
        }
    } else {
        warn!("{main} does not exist");
    }

    let mut commands = Vec::new();
    for phase in phases {
        let prop = require(fdt, node, phase)?;
        commands.extend(CommandSequence::decode(phase, mode, prop.value)?.commands);
    }
    Ok(CommandSequence { mode, commands })
}

/// Everything the emitters need to know about one panel.
#[derive(Debug, Clone)]
pub struct Panel {
    pub name: String,
    pub node_name: String,
    /// Cleaned up node name, used as output directory and in LK symbols.
    pub id: String,
    /// [`Panel::id`] without resolution/mode suffixes, used as C symbol
    /// prefix in the DRM driver.
    pub short_id: String,
    pub h: Axis,
    pub v: Axis,
    pub framerate: u32,
    pub bpp: u32,
    pub mode: Mode,
    pub traffic_mode: TrafficMode,
    pub backlight: Option<BacklightControl>,
    pub max_brightness: Option<u32>,
    pub lanes: u32,
    pub lane_map: LaneMap,
    pub flags: Vec<&'static str>,
    /// (gpio state, sleep in ms) pairs from qcom,mdss-dsi-reset-sequence.
    pub reset_seq: Vec<(u32, u32)>,
    pub on: CommandSequence,
    pub off: CommandSequence,
    pub format: &'static str,
    pub cphy_mode: bool,
    pub ldo_mode: bool,
    /// Raw PHY timings, used by downstream and LK only.
    pub timings: Vec<u8>,
    pub tclk_post: u32,
    pub tclk_pre: u32,
    pub hsync_skew: u32,
    pub bllp_power_mode: bool,
    pub bllp_eof_power_mode: bool,
    pub lp11_init: bool,
    pub init_delay_us: u32,
    pub dsc: Option<Dsc>,
}

impl Panel {
    /// [`Panel::short_id`] with dashes, used in file names and the
    /// compatible string.
    pub fn dash_id(&self) -> String {
        self.short_id.replace('_', "-")
    }

    /// Command sequences in transmit order, with their names.
    pub fn cmds(&self) -> [(&'static str, &CommandSequence); 2] {
        [("on", &self.on), ("off", &self.off)]
    }

    /// Parse the panel described by `node`. Returns `None` when the node
    /// is not a panel description at all (no panel name).
    pub fn parse(fdt: &Fdt, node: NodeId) -> Result<Option<Panel>, PanelError> {
        let Some(name) = fdt.prop(node, "qcom,mdss-dsi-panel-name") else {
            return Ok(None);
        };
        let name = name.as_str()?.to_owned();

        let node_name = fdt.name(node).to_owned();
        let id = remove_before(
            &remove_prefixes(&node_name, &["qcom,mdss_dsi_", "ss_dsi_panel_", "mot_"])
                .to_lowercase(),
            ',',
        )
        .to_owned();
        info!("parsing: {id} ({name})");

        let short_id = replace_all(
            &id,
            &[
                "_panel", "_video", "_vid", "_cmd", "_fhd", "_hd", "_qhd", "_720p", "_1080p",
                "_wvga", "_fwvga", "_qvga", "_xga", "_wxga",
            ],
        );

        let mode_node = find_mode_node(fdt, node)?;
        let mut h = Axis::parse(fdt, node, mode_node, 'h', "width")?;
        let mut v = Axis::parse(fdt, node, mode_node, 'v', "height")?;
        let framerate = require(fdt, mode_node, "qcom,mdss-dsi-panel-framerate")?.as_u32()?;
        let bpp = require(fdt, node, "qcom,mdss-dsi-bpp")?.as_u32()?;

        let panel_type = require(fdt, node, "qcom,mdss-dsi-panel-type")?.as_str()?;
        let mode = Mode::parse(panel_type).ok_or_else(|| PanelError::UnknownValue {
            what: "panel type",
            value: panel_type.to_owned(),
        })?;
        let traffic_mode =
            TrafficMode::parse(require(fdt, node, "qcom,mdss-dsi-traffic-mode")?)?;

        let mut backlight = match fdt.prop(node, "qcom,mdss-dsi-bl-pmic-control-type") {
            Some(p) => {
                let s = p.as_str()?;
                Some(
                    BacklightControl::parse(s).ok_or_else(|| PanelError::UnknownValue {
                        what: "backlight control type",
                        value: s.to_owned(),
                    })?,
                )
            }
            None => None,
        };
        let max_brightness = prop_u32_opt(fdt, node, "qcom,mdss-dsi-bl-max-level")?;
        if backlight == Some(BacklightControl::Dcs) && max_brightness.is_none() {
            warn!("DCS backlight without maximum brightness, ignoring");
            backlight = None;
        }

        let mut lanes = 0u32;
        while fdt.has_prop(node, &format!("qcom,mdss-dsi-lane-{lanes}-state")) {
            lanes += 1;
        }
        let lane_map = LaneMap::parse(fdt.prop(node, "qcom,mdss-dsi-lane-map"))?;

        let mut flags: Vec<&'static str> = Vec::new();
        flags.extend_from_slice(mode.flags());
        flags.extend_from_slice(traffic_mode.flags());

        if fdt.prop_u32_or(node, "qcom,mdss-dsi-h-sync-pulse", 0)? != 0 {
            flags.push("MIPI_DSI_MODE_VIDEO_HSE");
        }

        if !fdt.has_prop(node, "qcom,mdss-dsi-tx-eot-append") {
            flags.push("MIPI_DSI_MODE_NO_EOT_PACKET");
        }

        let force_clk_lane_hs = fdt.has_prop(node, "qcom,mdss-dsi-force-clock-lane-hs")
            || fdt.has_prop(node, "qcom,mdss-dsi-force-clk-lane-hs")
            || match fdt.prop(node, "qcom,mdss-force-clk-lane-hs") {
                // An empty property counts as absent here.
                Some(p) if p.is_empty() => false,
                Some(p) => p.as_u32()? != 0,
                None => false,
            };
        if !force_clk_lane_hs {
            flags.push("MIPI_DSI_CLOCK_NON_CONTINUOUS");
        }

        if fdt.has_prop(node, "qcom,mdss-dsi-hfp-power-mode") {
            flags.push("MIPI_DSI_MODE_VIDEO_NO_HFP");
        }
        if fdt.has_prop(node, "qcom,mdss-dsi-hbp-power-mode") {
            flags.push("MIPI_DSI_MODE_VIDEO_NO_HBP");
        }
        if fdt.has_prop(node, "qcom,mdss-dsi-hsa-power-mode") {
            flags.push("MIPI_DSI_MODE_VIDEO_NO_HSA");
        }

        let reset_seq = match fdt.prop(node, "qcom,mdss-dsi-reset-sequence") {
            Some(p) => p
                .as_u32_array()?
                .chunks_exact(2)
                .map(|pair| (pair[0], pair[1]))
                .collect(),
            None => Vec::new(),
        };

        let on = decode_sequence(fdt, mode_node, "on")?;
        let off = decode_sequence(fdt, mode_node, "off")?;

        // If all commands are sent in LPM, add the flag globally.
        if on.mode == TransmitMode::LowPower && off.mode == TransmitMode::LowPower {
            flags.push("MIPI_DSI_MODE_LPM");
        }

        let format = match bpp {
            24 => "MIPI_DSI_FMT_RGB888",
            other => return Err(PanelError::UnsupportedBpp(other)),
        };

        // Sony stores the physical size in its own property.
        if let Some(p) = fdt.prop(node, "somc,mdss-phy-size-mm") {
            match p.as_u32_array()?.as_slice() {
                [width, height, ..] => {
                    h.size_mm = *width;
                    v.size_mm = *height;
                }
                _ => {
                    return Err(PanelError::Schema(SchemaError::Mismatch {
                        name: "somc,mdss-phy-size-mm".to_owned(),
                        expected: fdt_parser::PropertyType::U32Array,
                        len: p.len(),
                    }))
                }
            }
        }

        let cphy_mode = fdt.has_prop(node, "qcom,panel-cphy-mode");

        // The DSI PHY regulator runs in LDO mode when the controller
        // node says so.
        let mut ldo_mode = false;
        if let Some(p) = fdt.prop(node, "qcom,mdss-dsi-panel-controller") {
            let token = p.as_phandle()?;
            let ctrl = fdt
                .node_by_phandle(token)
                .ok_or(PanelError::UnresolvedPhandle(token))?;
            ldo_mode = fdt.has_prop(ctrl, "qcom,regulator-ldo-mode");
        }

        // PHY timings are calculated by the mainline driver; downstream
        // and LK want the raw values.
        let timings = fdt
            .prop(node, "qcom,mdss-dsi-panel-timings")
            .map(|p| p.value.to_vec())
            .unwrap_or_default();
        let tclk_post = fdt.prop_u32_or(node, "qcom,mdss-dsi-t-clk-post", 0)?;
        let tclk_pre = fdt.prop_u32_or(node, "qcom,mdss-dsi-t-clk-pre", 0)?;

        let hsync_skew = fdt.prop_u32_or(node, "qcom,mdss-dsi-h-sync-skew", 0)?;
        let bllp_power_mode = fdt.has_prop(node, "qcom,mdss-dsi-bllp-power-mode");
        let bllp_eof_power_mode = fdt.has_prop(node, "qcom,mdss-dsi-bllp-eof-power-mode");
        let lp11_init = fdt.has_prop(node, "qcom,mdss-dsi-lp11-init");
        let init_delay_us = fdt.prop_u32_or(node, "qcom,mdss-dsi-init-delay-us", 0)?;

        let dsc = match fdt.prop(mode_node, "qcom,compression-mode") {
            Some(p) => {
                let s = p.as_str()?;
                if s != "dsc" {
                    return Err(PanelError::UnknownValue {
                        what: "compression mode",
                        value: s.to_owned(),
                    });
                }
                Some(Dsc {
                    slice_height: require(fdt, mode_node, "qcom,mdss-dsc-slice-height")?
                        .as_u32()?,
                    slice_width: require(fdt, mode_node, "qcom,mdss-dsc-slice-width")?
                        .as_u32()?,
                    slice_per_pkt: require(fdt, mode_node, "qcom,mdss-dsc-slice-per-pkt")?
                        .as_u32()?,
                    bit_per_component: require(
                        fdt,
                        mode_node,
                        "qcom,mdss-dsc-bit-per-component",
                    )?
                    .as_u32()?,
                    bit_per_pixel: require(fdt, mode_node, "qcom,mdss-dsc-bit-per-pixel")?
                        .as_u32()?,
                    block_prediction: fdt
                        .has_prop(mode_node, "qcom,mdss-dsc-block-prediction-enable"),
                    version: fdt.prop_u32_or(mode_node, "qcom,mdss-dsc-version", 0x11)?,
                    scr_version: fdt.prop_u32_or(mode_node, "qcom,mdss-dsc-scr-version", 0)?,
                })
            }
            None => None,
        };

        Ok(Some(Panel {
            name,
            node_name,
            id,
            short_id,
            h,
            v,
            framerate,
            bpp,
            mode,
            traffic_mode,
            backlight,
            max_brightness,
            lanes,
            lane_map,
            flags,
            reset_seq,
            on,
            off,
            format,
            cphy_mode,
            ldo_mode,
            timings,
            tclk_post,
            tclk_pre,
            hsync_skew,
            bllp_power_mode,
            bllp_eof_power_mode,
            lp11_init,
            init_delay_us,
            dsc,
        }))
    }

    /// Locate candidate panel nodes in a device tree.
    ///
    /// Older trees put them below the MDP node; newer trees reference
    /// them by phandle from qcom,dsi-display (possibly indirected
    /// through qcom,dsi-display-list).
    pub fn find(fdt: &Fdt) -> Result<Vec<NodeId>, PanelError> {
        let mut nodes = Vec::new();
        for compatible in ["qcom,mdss_mdp", "qcom,mdss_mdp3", "qcom,sde-kms"] {
            for mdp in fdt.find_compatible(compatible) {
                nodes.extend(fdt.children(mdp));
            }
        }

        let mut panel_phandles = BTreeSet::new();
        for display in fdt.find_compatible("qcom,dsi-display") {
            match fdt.prop(display, "qcom,dsi-display-list") {
                Some(list) => {
                    for token in list.as_u32_array()? {
                        let display = fdt
                            .node_by_phandle(token)
                            .ok_or(PanelError::UnresolvedPhandle(token))?;
                        panel_phandles
                            .insert(require(fdt, display, "qcom,dsi-panel")?.as_phandle()?);
                    }
                }
                None => {
                    if let Some(p) = fdt.prop(display, "qcom,dsi-panel") {
                        panel_phandles.insert(p.as_phandle()?);
                    }
                }
            }
        }

        for token in panel_phandles {
            nodes.push(
                fdt.node_by_phandle(token)
                    .ok_or(PanelError::UnresolvedPhandle(token))?,
            );
        }

        Ok(nodes)
    }
}
