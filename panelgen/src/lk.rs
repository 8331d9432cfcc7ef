//! Emitter for an LK (Little Kernel) bootloader panel header.
//!
//! LK wants the commands back in packed form, but laid out for the DMA
//! engine rather than as the device tree records them.

use crate::mipi::EmitError;
use crate::panel::{Mode, Panel};
use crate::sequence::CommandSequence;
use crate::wrap;

pub fn file_name(p: &Panel) -> String {
    format!("lk_panel_{}.h", p.id)
}

fn commands(p: &Panel, name: &str, seq: &CommandSequence) -> Result<String, EmitError> {
    let mut cmds = String::new();
    let mut strct = format!(
        "static struct mipi_dsi_cmd {id}_{name}_command[] = {{\n",
        id = p.id
    );

    for (i, c) in seq.commands.iter().enumerate() {
        let mut b: Vec<u8> = Vec::new();
        let long = c.kind.is_long();
        if long {
            // Word count (WC)
            b.extend_from_slice(&(c.payload.len() as u16).to_le_bytes());
        } else {
            if c.payload.len() > 2 {
                return Err(EmitError::PayloadTooLong(c.payload.len()));
            }
            b.push(c.payload.first().copied().unwrap_or(0));
            b.push(c.payload.get(1).copied().unwrap_or(0));
        }

        b.push(c.kind.value() | c.vc << 6);
        b.push(u8::from(c.ack) << 5 | u8::from(long) << 6 | u8::from(c.last) << 7);

        if long {
            b.extend_from_slice(&c.payload);

            // DMA command size must be a multiple of 4
            let rem = b.len() % 4;
            if rem != 0 {
                b.resize(b.len() + 4 - rem, 0xff);
            }
        }

        let sym = format!("{}_{}_cmd_{}", p.id, name, i);
        let bytes: Vec<String> = b.iter().map(|byte| format!("{byte:#04x}")).collect();
        cmds.push_str(&format!("static char {sym}[] = {{\n"));
        cmds.push_str(&wrap::join_width("\t", ",", "", &bytes, None, 54));
        cmds.push_str("\n};\n");

        strct.push_str(&format!("\t{{ sizeof({sym}), {sym}, {} }},\n", c.wait_ms));
    }

    strct.push_str("};");
    Ok(cmds + "\n" + &strct)
}

fn cmd_info(p: &Panel) -> String {
    let mut s = format!(
        "static struct commandpanel_info {}_command_panel = {{\n",
        p.id
    );
    if p.mode != Mode::Command {
        s.push_str("\t/* Unused, this is a video mode panel */\n");
    } else {
        s.push_str("\t/* FIXME: This is a command mode panel */\n");
    }
    s + "};"
}

fn video_info(p: &Panel) -> String {
    let flag = |name: &str| u32::from(p.flags.contains(&name));
    let bllp_eof = u32::from(p.bllp_eof_power_mode);
    let bllp = u32::from(p.bllp_power_mode);

    format!(
        "\
static struct videopanel_info {id}_video_panel = {{
\t.hsync_pulse = {hsync},
\t.hfp_power_mode = {hfp},
\t.hbp_power_mode = {hbp},
\t.hsa_power_mode = {hsa},
\t.bllp_eof_power_mode = {bllp_eof},
\t.bllp_power_mode = {bllp},
\t.traffic_mode = {traffic},
\t/* This is bllp_eof_power_mode and bllp_power_mode combined */
\t.bllp_eof_power = {bllp_eof} << 3 | {bllp} << 0,
}};",
        id = p.id,
        hsync = flag("MIPI_DSI_MODE_VIDEO_HSE"),
        hfp = flag("MIPI_DSI_MODE_VIDEO_NO_HFP"),
        hbp = flag("MIPI_DSI_MODE_VIDEO_NO_HBP"),
        hsa = flag("MIPI_DSI_MODE_VIDEO_NO_HSA"),
        traffic = p.traffic_mode.index(),
    )
}

fn reset_seq(p: &Panel) -> String {
    if p.reset_seq.is_empty() {
        return String::new();
    }

    let states: Vec<String> = p.reset_seq.iter().map(|&(s, _)| s.to_string()).collect();
    let sleeps: Vec<String> = p.reset_seq.iter().map(|&(_, ms)| ms.to_string()).collect();

    format!(
        "
static struct panel_reset_sequence {id}_reset_seq = {{
\t.pin_state = {{ {states} }},
\t.sleep = {{ {sleeps} }},
\t.pin_direction = 2,
}};
",
        id = p.id,
        states = states.join(", "),
        sleeps = sleeps.join(", "),
    )
}

fn backlight(p: &Panel) -> String {
    let Some(bl) = p.backlight else {
        return String::new();
    };

    format!(
        "
static struct backlight {id}_backlight = {{
\t.bl_interface_type = BL_{interface},
\t.bl_min_level = 1,
\t.bl_max_level = {max},
}};
",
        id = p.id,
        interface = bl.lk_name(),
        max = p.max_brightness.unwrap_or(255),
    )
}

/// Render the LK header, `None` for simulator panels which LK does not
/// need.
pub fn render(p: &Panel) -> Result<Option<String>, EmitError> {
    if p.id.contains("sim") {
        return Ok(None);
    }

    let id = &p.id;
    let define = format!("_PANEL_{}_H_", id.to_uppercase());

    let select_sig = wrap::join(
        &format!("static inline void panel_{id}_select("),
        ",",
        ")",
        &[
            "struct panel_struct *panel".to_owned(),
            "struct msm_panel_info *pinfo".to_owned(),
            "struct mdss_dsi_phy_ctrl *phy_db".to_owned(),
        ],
        None,
    );

    let timings: Vec<String> = p.timings.iter().map(|b| format!("{b:#04x}")).collect();

    Ok(Some(format!(
        "\
// SPDX-License-Identifier: GPL-2.0-only
// Copyright (c) FIXME
// Generated with panelgen from vendor device tree:
//   Copyright (c) 2014, The Linux Foundation. All rights reserved. (FIXME)

#ifndef {define}
#define {define}

#include <mipi_dsi.h>
#include <panel_display.h>
#include <panel.h>
#include <string.h>

static struct panel_config {id}_panel_data = {{
\t.panel_node_id = \"{node_name}\",
\t.panel_controller = \"dsi:0:\",
\t.panel_compatible = \"qcom,mdss-dsi-panel\",
\t.panel_type = {panel_type},
\t.panel_destination = \"DISPLAY_1\",
\t/* .panel_orientation not supported yet */
\t.panel_framerate = {framerate},
\t.panel_lp11_init = {lp11},
\t.panel_init_delay = {init_delay},
}};

static struct panel_resolution {id}_panel_res = {{
\t.panel_width = {hpx},
\t.panel_height = {vpx},
\t.hfront_porch = {hfp},
\t.hback_porch = {hbp},
\t.hpulse_width = {hpw},
\t.hsync_skew = {hsync_skew},
\t.vfront_porch = {vfp},
\t.vback_porch = {vbp},
\t.vpulse_width = {vpw},
\t/* Borders not supported yet */
}};

static struct color_info {id}_color = {{
\t.color_format = {bpp},
\t.color_order = DSI_RGB_SWAP_RGB,
\t.underflow_color = 0xff,
\t/* Borders and pixel packing not supported yet */
}};

{on_cmds}

{off_cmds}

static struct command_state {id}_state = {{
\t.oncommand_state = {on_state},
\t.offcommand_state = {off_state},
}};

{cmd_info}

{video_info}

static struct lane_configuration {id}_lane_config = {{
\t.dsi_lanes = {lanes},
\t.dsi_lanemap = {lanemap},
\t.lane0_state = {l0},
\t.lane1_state = {l1},
\t.lane2_state = {l2},
\t.lane3_state = {l3},
\t.force_clk_lane_hs = {force_clk},
}};

static const uint32_t {id}_timings[] = {{
\t{timings}
}};

static struct panel_timing {id}_timing_info = {{
\t.tclk_post = {tclk_post:#04x},
\t.tclk_pre = {tclk_pre:#04x},
}};
{reset_seq}{backlight}
{select_sig}
{{
\tpanel->paneldata = &{id}_panel_data;
\tpanel->panelres = &{id}_panel_res;
\tpanel->color = &{id}_color;
\tpanel->videopanel = &{id}_video_panel;
\tpanel->commandpanel = &{id}_command_panel;
\tpanel->state = &{id}_state;
\tpanel->laneconfig = &{id}_lane_config;
\tpanel->paneltiminginfo = &{id}_timing_info;
\tpanel->panelresetseq = {resetseq_ref};
\tpanel->backlightinfo = {backlight_ref};
\tpinfo->mipi.panel_on_cmds = {id}_on_command;
\tpinfo->mipi.num_of_panel_on_cmds = ARRAY_SIZE({id}_on_command);
\tmemcpy(phy_db->timing, {id}_timings, TIMING_SIZE);
\tphy_db->regulator_mode = {regulator_mode};
}}

#endif /* {define} */
",
        node_name = p.node_name,
        panel_type = u32::from(p.mode == Mode::Command),
        framerate = p.framerate,
        lp11 = u32::from(p.lp11_init),
        init_delay = p.init_delay_us,
        hpx = p.h.px,
        vpx = p.v.px,
        hfp = p.h.front_porch,
        hbp = p.h.back_porch,
        hpw = p.h.pulse_width,
        hsync_skew = p.hsync_skew,
        vfp = p.v.front_porch,
        vbp = p.v.back_porch,
        vpw = p.v.pulse_width,
        bpp = p.bpp,
        on_cmds = commands(p, "on", &p.on)?,
        off_cmds = commands(p, "off", &p.off)?,
        on_state = u32::from(p.on.mode == crate::sequence::TransmitMode::HighSpeed),
        off_state = u32::from(p.off.mode == crate::sequence::TransmitMode::HighSpeed),
        cmd_info = cmd_info(p),
        video_info = video_info(p),
        lanes = p.lanes,
        lanemap = p.lane_map.index(),
        l0 = u32::from(p.lanes > 0),
        l1 = u32::from(p.lanes > 1),
        l2 = u32::from(p.lanes > 2),
        l3 = u32::from(p.lanes > 3),
        force_clk = u32::from(!p.flags.contains(&"MIPI_DSI_CLOCK_NON_CONTINUOUS")),
        timings = timings.join(", "),
        tclk_post = p.tclk_post,
        tclk_pre = p.tclk_pre,
        reset_seq = reset_seq(p),
        backlight = backlight(p),
        resetseq_ref = if p.reset_seq.is_empty() {
            "NULL".to_owned()
        } else {
            format!("&{id}_reset_seq")
        },
        backlight_ref = if p.backlight.is_some() {
            format!("&{id}_backlight")
        } else {
            "NULL".to_owned()
        },
        regulator_mode = if p.ldo_mode {
            "DSI_PHY_REGULATOR_LDO_MODE"
        } else {
            "DSI_PHY_REGULATOR_DCDC_MODE"
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mipi::Transaction;
    use crate::sequence::{DsiCommand, TransmitMode};
    use crate::testing::test_panel;

    #[test]
    fn short_commands_pack_into_four_bytes() {
        let mut p = test_panel();
        p.on.commands.push(DsiCommand {
            kind: Transaction::DcsShortWrite,
            last: true,
            vc: 0,
            ack: false,
            wait_ms: 120,
            payload: vec![0x11],
        });

        let s = render(&p).unwrap().unwrap();
        // payload byte, zero pad, type, flags (last | !long)
        assert!(s.contains(
            "static char test_720p_video_on_cmd_0[] = {\n\t0x11, 0x00, 0x05, 0x80\n};"
        ));
        assert!(s.contains("{ sizeof(test_720p_video_on_cmd_0), test_720p_video_on_cmd_0, 120 },"));
    }

    #[test]
    fn long_commands_carry_word_count_and_padding() {
        let mut p = test_panel();
        p.on.commands.push(DsiCommand {
            kind: Transaction::DcsLongWrite,
            last: true,
            vc: 0,
            ack: false,
            wait_ms: 0,
            payload: vec![0xf0, 0x5a, 0x5a],
        });

        let s = render(&p).unwrap().unwrap();
        // le16 WC = 3, type 0x39, flags long | last, payload padded to 4
        assert!(s.contains(
            "static char test_720p_video_on_cmd_0[] = {\n\
             \t0x03, 0x00, 0x39, 0xc0, 0xf0, 0x5a, 0x5a, 0xff\n};"
        ));
    }

    #[test]
    fn oversized_short_payload_is_an_error() {
        let mut p = test_panel();
        p.on.commands.push(DsiCommand {
            kind: Transaction::DcsShortWriteParam,
            last: true,
            vc: 0,
            ack: false,
            wait_ms: 0,
            payload: vec![0x36, 0x00, 0xde],
        });
        assert!(matches!(render(&p), Err(EmitError::PayloadTooLong(3))));
    }

    #[test]
    fn simulator_panels_are_skipped() {
        let mut p = test_panel();
        p.id = "sim_video_panel".into();
        assert!(render(&p).unwrap().is_none());
    }

    #[test]
    fn header_reflects_panel_configuration() {
        let p = test_panel();
        let s = render(&p).unwrap().unwrap();
        assert!(s.contains("#ifndef _PANEL_TEST_720P_VIDEO_H_"));
        assert!(s.contains(".panel_node_id = \"qcom,mdss_dsi_test_720p_video\","));
        assert!(s.contains(".traffic_mode = 0,"));
        assert!(s.contains(".dsi_lanes = 4,"));
        assert!(s.contains(".force_clk_lane_hs = 1,"));
        assert!(s.contains(".tclk_post = 0x04,"));
        assert!(s.contains("phy_db->regulator_mode = DSI_PHY_REGULATOR_DCDC_MODE;"));
        assert!(s.contains("\t0xb0, 0x23\n};"));
    }
}
