//! Emitter for a panel-simple style descriptor, useful as a starting
//! point when the panel needs no init sequence.

use crate::panel::Panel;
use crate::wrap;

/// The drm_display_mode definition, shared with the full driver.
pub fn mode_struct(p: &Panel) -> String {
    format!(
        "\
static const struct drm_display_mode {id}_mode = {{
\t.clock = ({hpx} + {hfp} + {hpw} + {hbp}) * ({vpx} + {vfp} + {vpw} + {vbp}) * {fps} / 1000,
\t.hdisplay = {hpx},
\t.hsync_start = {hpx} + {hfp},
\t.hsync_end = {hpx} + {hfp} + {hpw},
\t.htotal = {hpx} + {hfp} + {hpw} + {hbp},
\t.vdisplay = {vpx},
\t.vsync_start = {vpx} + {vfp},
\t.vsync_end = {vpx} + {vfp} + {vpw},
\t.vtotal = {vpx} + {vfp} + {vpw} + {vbp},
\t.width_mm = {hsize},
\t.height_mm = {vsize},
}};
",
        id = p.short_id,
        hpx = p.h.px,
        hfp = p.h.front_porch,
        hpw = p.h.pulse_width,
        hbp = p.h.back_porch,
        vpx = p.v.px,
        vfp = p.v.front_porch,
        vpw = p.v.pulse_width,
        vbp = p.v.back_porch,
        fps = p.framerate,
        hsize = p.h.size_mm,
        vsize = p.v.size_mm,
    )
}

pub fn file_name(p: &Panel) -> String {
    format!("panel-simple-{}.c", p.dash_id())
}

pub fn render(p: &Panel) -> String {
    let flags: Vec<String> = p.flags.iter().map(|f| f.to_string()).collect();

    format!(
        "\
// SPDX-License-Identifier: GPL-2.0-only
// Copyright (c) 2013, The Linux Foundation. All rights reserved.

{mode}
static const struct panel_desc_dsi {id} = {{
\t.desc = {{
\t\t.modes = &{id}_mode,
\t\t.num_modes = 1,
\t\t.bpc = {bpc},
\t\t.size = {{
\t\t\t.width = {hsize},
\t\t\t.height = {vsize},
\t\t}},
\t\t.connector_type = DRM_MODE_CONNECTOR_DSI,
\t}},
{flags}
\t.format = {format},
\t.lanes = {lanes},
}};
",
        mode = mode_struct(p),
        id = p.short_id,
        bpc = p.bpp / 3,
        hsize = p.h.size_mm,
        vsize = p.v.size_mm,
        flags = wrap::join("\t.flags = ", " |", ",", &flags, None),
        format = p.format,
        lanes = p.lanes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_panel;

    #[test]
    fn mode_struct_sums_porches() {
        let s = mode_struct(&test_panel());
        assert!(s.contains(".clock = (720 + 100 + 10 + 90) * (1280 + 14 + 2 + 12) * 60 / 1000,"));
        assert!(s.contains(".hsync_end = 720 + 100 + 10,"));
        assert!(s.contains(".width_mm = 62,"));
    }

    #[test]
    fn descriptor_lists_flags_and_format() {
        let p = test_panel();
        let s = render(&p);
        assert!(s.contains(
            "\t.flags = MIPI_DSI_MODE_VIDEO | MIPI_DSI_MODE_VIDEO_SYNC_PULSE,"
        ));
        assert!(s.contains(".bpc = 8,"));
        assert!(s.contains(".lanes = 4,"));
        assert_eq!(file_name(&p), "panel-simple-test.c");
    }
}
