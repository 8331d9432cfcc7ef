//! Emitter for a mainline DRM panel driver.

use std::collections::BTreeSet;

use crate::mipi::EmitError;
use crate::options::{Bindings, GpioFlag, Options};
use crate::panel::{BacklightControl, Panel};
use crate::sequence::{CommandSequence, TransmitMode};
use crate::{simple, wrap};

pub fn file_name(p: &Panel) -> String {
    format!("panel-{}.c", p.dash_id())
}

/// msleep() below 20 ms can sleep up to 20 ms, use usleep_range there.
fn msleep(m: u32) -> String {
    if m >= 20 {
        format!("msleep({m})")
    } else {
        let u = m * 1000;
        format!("usleep_range({u}, {})", u + 1000)
    }
}

/// One command sequence with its C fragments, rendered up front so the
/// rest of the driver can check what the fragments reference.
struct Rendered<'p> {
    name: &'static str,
    seq: &'p CommandSequence,
    fragments: Vec<String>,
    all: String,
}

fn render_sequences<'p>(p: &'p Panel, options: &Options) -> Result<Vec<Rendered<'p>>, EmitError> {
    p.cmds()
        .into_iter()
        .map(|(name, seq)| {
            let fragments = seq
                .commands
                .iter()
                .map(|c| c.kind.generate(&c.payload, options))
                .collect::<Result<Vec<_>, _>>()?;
            let all = fragments.concat();
            Ok(Rendered {
                name,
                seq,
                fragments,
                all,
            })
        })
        .collect()
}

fn includes(p: &Panel, options: &Options, rendered: &[Rendered]) -> String {
    let mut linux: BTreeSet<&str> = ["module.h", "delay.h", "of.h"].into();
    let mut video: BTreeSet<&str> = BTreeSet::new();
    let mut drm: BTreeSet<&str> = ["drm_mipi_dsi.h", "drm_modes.h", "drm_panel.h"].into();

    if !p.reset_seq.is_empty() {
        linux.insert("gpio/consumer.h");
    }
    if !options.regulators.is_empty() {
        linux.insert("regulator/consumer.h");
    }
    if p.backlight == Some(BacklightControl::Dcs) {
        linux.insert("backlight.h");
    }
    if p.dsc.is_some() {
        drm.insert("display/drm_dsc.h");
        drm.insert("display/drm_dsc_helper.h");
    }
    if rendered.iter().any(|r| r.all.contains("MIPI_DCS_")) {
        video.insert("mipi_display.h");
    }

    let mut lines = Vec::new();
    for (group, headers) in [("linux", &linux), ("video", &video), ("drm", &drm)] {
        if headers.is_empty() {
            continue;
        }
        lines.push(String::new());
        for header in headers {
            lines.push(format!("#include <{group}/{header}>"));
        }
    }
    lines.join("\n")
}

fn struct_def(p: &Panel, options: &Options, bindings: &Bindings) -> String {
    let mut variables = vec![
        "struct drm_panel panel".to_owned(),
        "struct mipi_dsi_device *dsi".to_owned(),
    ];

    if p.dsc.is_some() {
        variables.push("struct drm_dsc_config dsc".to_owned());
    }

    if options.regulators.len() > 1 {
        variables.push(format!(
            "struct regulator_bulk_data supplies[{}]",
            options.regulators.len()
        ));
    } else if options.regulators.len() == 1 {
        variables.push("struct regulator *supply".to_owned());
    }
    for (name, _) in &bindings.gpios {
        variables.push(format!("struct gpio_desc *{name}_gpio"));
    }
    variables.push("bool prepared".to_owned());

    let mut s = format!("struct {} {{", p.short_id);
    for v in variables {
        s.push_str("\n\t");
        s.push_str(&v);
        s.push(';');
    }
    s.push_str("\n};");
    s
}

fn reset_fn(p: &Panel, bindings: &Bindings) -> String {
    if p.reset_seq.is_empty() {
        return String::new();
    }

    let active_low = bindings
        .gpios
        .iter()
        .any(|&(name, flag)| name == "reset" && flag == GpioFlag::ActiveLow);

    let mut s = format!(
        "\nstatic void {id}_reset(struct {id} *ctx)\n{{\n",
        id = p.short_id
    );
    for &(state, sleep) in &p.reset_seq {
        // Invert the sequence if the GPIO is active low.
        let state = if active_low {
            u32::from(state == 0)
        } else {
            state
        };
        s.push_str(&format!(
            "\tgpiod_set_value_cansleep(ctx->reset_gpio, {state});\n"
        ));
        if sleep != 0 {
            s.push_str(&format!("\t{};\n", msleep(sleep)));
        }
    }
    s.push_str("}\n");
    s
}

fn commands_fn(p: &Panel, r: &Rendered, options: &Options) -> String {
    let id = &p.short_id;
    let mut s = format!("static int {id}_{name}(struct {id} *ctx)\n{{\n", name = r.name);

    let mut variables = vec!["struct mipi_dsi_device *dsi = ctx->dsi".to_owned()];
    if r.all.contains("(dev, ") {
        variables.push("struct device *dev = &dsi->dev".to_owned());
    }
    if r.all.contains("ret = ") {
        variables.push("int ret".to_owned());
    }
    for v in variables {
        s.push_str(&format!("\t{v};\n"));
    }

    if p.on.mode != p.off.mode {
        match r.seq.mode {
            TransmitMode::LowPower => s.push_str("\n\tdsi->mode_flags |= MIPI_DSI_MODE_LPM;\n"),
            TransmitMode::HighSpeed => s.push_str("\n\tdsi->mode_flags &= ~MIPI_DSI_MODE_LPM;\n"),
        }
    }

    let mut block = true;
    for (c, generated) in r.seq.commands.iter().zip(&r.fragments) {
        if block || generated.contains('{') {
            s.push('\n');
        }
        block = generated.contains('{');

        s.push_str(generated);
        s.push('\n');
        if c.wait_ms != 0 && c.wait_ms > options.ignore_wait {
            s.push_str(&format!("\t{};\n", msleep(c.wait_ms.into())));
        }
    }

    s.push_str("\n\treturn 0;\n}\n");
    s
}

fn cleanup(p: &Panel, options: &Options, indent: usize) -> String {
    let mut cleanup: Vec<&str> = Vec::new();
    if !p.reset_seq.is_empty() {
        cleanup.push("gpiod_set_value_cansleep(ctx->reset_gpio, 1);");
    }
    if options.regulators.len() > 1 {
        cleanup.push("regulator_bulk_disable(ARRAY_SIZE(ctx->supplies), ctx->supplies);");
    } else if options.regulators.len() == 1 {
        cleanup.push("regulator_disable(ctx->supply);");
    }

    if cleanup.is_empty() {
        return String::new();
    }
    let sep = format!("\n{}", "\t".repeat(indent));
    format!("{sep}{}", cleanup.join(&sep))
}

fn prepare_fn(p: &Panel, options: &Options) -> String {
    let id = &p.short_id;
    let mut s = format!(
        "\
static int {id}_prepare(struct drm_panel *panel)
{{
\tstruct {id} *ctx = to_{id}(panel);
\tstruct device *dev = &ctx->dsi->dev;
"
    );

    if p.dsc.is_some() {
        s.push_str("\tstruct drm_dsc_picture_parameter_set pps;\n");
    }

    s.push_str(
        "\tint ret;

\tif (ctx->prepared)
\t\treturn 0;
",
    );

    if options.regulators.len() > 1 {
        s.push_str(
            "
\tret = regulator_bulk_enable(ARRAY_SIZE(ctx->supplies), ctx->supplies);
\tif (ret < 0) {
\t\tdev_err(dev, \"Failed to enable regulators: %d\\n\", ret);
\t\treturn ret;
\t}
",
        );
    } else if options.regulators.len() == 1 {
        s.push_str(
            "
\tret = regulator_enable(ctx->supply);
\tif (ret < 0) {
\t\tdev_err(dev, \"Failed to enable regulator: %d\\n\", ret);
\t\treturn ret;
\t}
",
        );
    }

    if !p.reset_seq.is_empty() {
        s.push_str(&format!("\n\t{id}_reset(ctx);\n"));
    }

    s.push_str(&format!(
        "
\tret = {id}_on(ctx);
\tif (ret < 0) {{
\t\tdev_err(dev, \"Failed to initialize panel: %d\\n\", ret);{cleanup}
\t\treturn ret;
\t}}
",
        cleanup = cleanup(p, options, 2)
    ));

    if p.dsc.is_some() {
        s.push_str(
            "
\tdrm_dsc_pps_payload_pack(&pps, &ctx->dsc);

\tret = mipi_dsi_picture_parameter_set(ctx->dsi, &pps);
\tif (ret < 0) {
\t\tdev_err(panel->dev, \"failed to transmit PPS: %d\\n\", ret);
\t\treturn ret;
\t}

\tret = mipi_dsi_compression_mode(ctx->dsi, true);
\tif (ret < 0) {
\t\tdev_err(dev, \"failed to enable compression mode: %d\\n\", ret);
\t\treturn ret;
\t}

\tmsleep(28); /* TODO: Is this panel-dependent? */
",
        );
    }

    s.push_str(
        "
\tctx->prepared = true;
\treturn 0;
}
",
    );
    s
}

fn unprepare_fn(p: &Panel, options: &Options) -> String {
    let id = &p.short_id;
    format!(
        "\
static int {id}_unprepare(struct drm_panel *panel)
{{
\tstruct {id} *ctx = to_{id}(panel);
\tstruct device *dev = &ctx->dsi->dev;
\tint ret;

\tif (!ctx->prepared)
\t\treturn 0;

\tret = {id}_off(ctx);
\tif (ret < 0)
\t\tdev_err(dev, \"Failed to un-initialize panel: %d\\n\", ret);{cleanup}

\tctx->prepared = false;
\treturn 0;
}}
",
        cleanup = cleanup(p, options, 1)
    )
}

fn backlight_fns(p: &Panel, options: &Options) -> String {
    if p.backlight != Some(BacklightControl::Dcs) {
        return String::new();
    }

    let max_brightness = p.max_brightness.unwrap_or(255);
    let brightness_mask = if max_brightness > 255 { "" } else { " & 0xff" };
    let brightness_variant = if max_brightness > 255 { "_large" } else { "" };
    let id = &p.short_id;

    let mut s = format!(
        "\
static int {id}_bl_update_status(struct backlight_device *bl)
{{
\tstruct mipi_dsi_device *dsi = bl_get_data(bl);
"
    );
    if options.backlight_gpio {
        s.push_str(&format!(
            "\tstruct {id} *ctx = mipi_dsi_get_drvdata(dsi);\n"
        ));
    }
    s.push_str(
        "\tu16 brightness = backlight_get_brightness(bl);
\tint ret;
",
    );
    if options.backlight_gpio {
        s.push_str("\n\tgpiod_set_value_cansleep(ctx->backlight_gpio, !!brightness);\n");
    }
    s.push_str(&format!(
        "
\tdsi->mode_flags &= ~MIPI_DSI_MODE_LPM;

\tret = mipi_dsi_dcs_set_display_brightness{brightness_variant}(dsi, brightness);
\tif (ret < 0)
\t\treturn ret;

\tdsi->mode_flags |= MIPI_DSI_MODE_LPM;

\treturn 0;
}}
"
    ));

    let get_brightness = if options.dcs_get_brightness {
        s.push_str(&format!(
            "
// TODO: Check if /sys/class/backlight/.../actual_brightness actually returns
// correct values. If not, remove this function.
static int {id}_bl_get_brightness(struct backlight_device *bl)
{{
\tstruct mipi_dsi_device *dsi = bl_get_data(bl);
\tu16 brightness;
\tint ret;

\tdsi->mode_flags &= ~MIPI_DSI_MODE_LPM;

\tret = mipi_dsi_dcs_get_display_brightness{brightness_variant}(dsi, &brightness);
\tif (ret < 0)
\t\treturn ret;

\tdsi->mode_flags |= MIPI_DSI_MODE_LPM;

\treturn brightness{brightness_mask};
}}
"
        ));
        format!("\n\t.get_brightness = {id}_bl_get_brightness,")
    } else {
        String::new()
    };

    s.push_str(&format!(
        "
static const struct backlight_ops {id}_bl_ops = {{
\t.update_status = {id}_bl_update_status,{get_brightness}
}};

static struct backlight_device *
{id}_create_backlight(struct mipi_dsi_device *dsi)
{{
\tstruct device *dev = &dsi->dev;
\tconst struct backlight_properties props = {{
\t\t.type = BACKLIGHT_RAW,
\t\t.brightness = {max_brightness},
\t\t.max_brightness = {max_brightness},
\t}};

\treturn devm_backlight_device_register(dev, dev_name(dev), dev, dsi,
\t\t\t\t\t      &{id}_bl_ops, &props);
}}

"
    ));
    s
}

fn probe_fn(p: &Panel, options: &Options, bindings: &Bindings) -> String {
    let id = &p.short_id;
    let mut s = format!(
        "\
static int {id}_probe(struct mipi_dsi_device *dsi)
{{
\tstruct device *dev = &dsi->dev;
\tstruct {id} *ctx;
\tint ret;

\tctx = devm_kzalloc(dev, sizeof(*ctx), GFP_KERNEL);
\tif (!ctx)
\t\treturn -ENOMEM;
"
    );

    if options.regulators.len() > 1 {
        for (i, r) in options.regulators.iter().enumerate() {
            s.push_str(&format!("\n\tctx->supplies[{i}].supply = \"{r}\";"));
        }
        s.push_str(
            "
\tret = devm_regulator_bulk_get(dev, ARRAY_SIZE(ctx->supplies),
\t\t\t\t      ctx->supplies);
\tif (ret < 0)
\t\treturn dev_err_probe(dev, ret, \"Failed to get regulators\\n\");
",
        );
    } else if let [regulator] = options.regulators.as_slice() {
        s.push_str(&format!(
            "
\tctx->supply = devm_regulator_get(dev, \"{regulator}\");
\tif (IS_ERR(ctx->supply))
\t\treturn dev_err_probe(dev, PTR_ERR(ctx->supply),
\t\t\t\t     \"Failed to get {regulator} regulator\\n\");
"
        ));
    }

    for (name, _) in &bindings.gpios {
        // TODO: consider GPIOD_ASIS to keep an already lit panel alive
        let init = if *name == "reset" {
            "GPIOD_OUT_HIGH"
        } else {
            "GPIOD_OUT_LOW"
        };
        s.push_str(&format!(
            "
\tctx->{name}_gpio = devm_gpiod_get(dev, \"{name}\", {init});
\tif (IS_ERR(ctx->{name}_gpio))
\t\treturn dev_err_probe(dev, PTR_ERR(ctx->{name}_gpio),
\t\t\t\t     \"Failed to get {name}-gpios\\n\");
"
        ));
    }

    let flags: Vec<String> = p.flags.iter().map(|f| f.to_string()).collect();
    s.push_str(&format!(
        "
\tctx->dsi = dsi;
\tmipi_dsi_set_drvdata(dsi, ctx);

\tdsi->lanes = {lanes};
\tdsi->format = {format};
{mode_flags}

\tdrm_panel_init(&ctx->panel, dev, &{id}_panel_funcs,
\t\t       DRM_MODE_CONNECTOR_DSI);
\tctx->panel.prepare_prev_first = true;
",
        lanes = p.lanes,
        format = p.format,
        mode_flags = wrap::join("\tdsi->mode_flags = ", " |", ";", &flags, None),
    ));

    if p.backlight == Some(BacklightControl::Dcs) {
        s.push_str(&format!(
            "
\tctx->panel.backlight = {id}_create_backlight(dsi);
\tif (IS_ERR(ctx->panel.backlight))
\t\treturn dev_err_probe(dev, PTR_ERR(ctx->panel.backlight),
\t\t\t\t     \"Failed to create backlight\\n\");
"
        ));
    } else if p.backlight.is_some() {
        s.push_str(
            "
\tret = drm_panel_of_backlight(&ctx->panel);
\tif (ret)
\t\treturn dev_err_probe(dev, ret, \"Failed to get backlight\\n\");
",
        );
    }

    s.push_str("\n\tdrm_panel_add(&ctx->panel);\n");

    if let Some(dsc) = &p.dsc {
        s.push_str(&format!(
            "
\t/* This panel only supports DSC; unconditionally enable it */
\tdsi->dsc = &ctx->dsc;

\tctx->dsc.dsc_version_major = {major};
\tctx->dsc.dsc_version_minor = {minor};

\t/* TODO: Pass slice_per_pkt = {slice_per_pkt} */
\tctx->dsc.slice_height = {slice_height};
\tctx->dsc.slice_width = {slice_width};
\t/*
\t * TODO: hdisplay should be read from the selected mode once
\t * it is passed back to drm_panel (in prepare?)
\t */
\tWARN_ON({hpx} % ctx->dsc.slice_width);
\tctx->dsc.slice_count = {hpx} / ctx->dsc.slice_width;
\tctx->dsc.bits_per_component = {bpc};
\tctx->dsc.bits_per_pixel = {bpp} << 4; /* 4 fractional bits */
\tctx->dsc.block_pred_enable = {block_pred};
",
            major = (dsc.version >> 4) & 0xf,
            minor = dsc.version & 0xf,
            slice_per_pkt = dsc.slice_per_pkt,
            slice_height = dsc.slice_height,
            slice_width = dsc.slice_width,
            hpx = p.h.px,
            bpc = dsc.bit_per_component,
            bpp = dsc.bit_per_pixel,
            block_pred = dsc.block_prediction,
        ));
    }

    s.push_str(
        "
\tret = mipi_dsi_attach(dsi);
\tif (ret < 0) {
\t\tdev_err(dev, \"Failed to attach to DSI host: %d\\n\", ret);
\t\tdrm_panel_remove(&ctx->panel);
\t\treturn ret;
\t}

\treturn 0;
}
",
    );
    s
}

pub fn render(p: &Panel, options: &Options, bindings: &Bindings) -> Result<String, EmitError> {
    let rendered = render_sequences(p, options)?;
    let id = &p.short_id;
    let module = format!("panel-{}", p.dash_id());

    let to_fn = wrap::simple(&[
        "static inline",
        &format!("struct {id} *to_{id}(struct drm_panel *panel)"),
    ]);
    let get_modes_sig = wrap::join(
        &format!("static int {id}_get_modes("),
        ",",
        ")",
        &[
            "struct drm_panel *panel".to_owned(),
            "struct drm_connector *connector".to_owned(),
        ],
        None,
    );

    Ok(format!(
        "\
// SPDX-License-Identifier: GPL-2.0-only
// Copyright (c) FIXME
// Generated with panelgen from vendor device tree:
//   Copyright (c) 2013, The Linux Foundation. All rights reserved. (FIXME)
{includes}

{struct_def}

{to_fn}
{{
\treturn container_of(panel, struct {id}, panel);
}}
{reset}
{on}
{off}
{prepare}
{unprepare}
{mode}
{get_modes_sig}
{{
\tstruct drm_display_mode *mode;

\tmode = drm_mode_duplicate(connector->dev, &{id}_mode);
\tif (!mode)
\t\treturn -ENOMEM;

\tdrm_mode_set_name(mode);

\tmode->type = DRM_MODE_TYPE_DRIVER | DRM_MODE_TYPE_PREFERRED;
\tconnector->display_info.width_mm = mode->width_mm;
\tconnector->display_info.height_mm = mode->height_mm;
\tdrm_mode_probed_add(connector, mode);

\treturn 1;
}}

static const struct drm_panel_funcs {id}_panel_funcs = {{
\t.prepare = {id}_prepare,
\t.unprepare = {id}_unprepare,
\t.get_modes = {id}_get_modes,
}};

{backlight}{probe}
static void {id}_remove(struct mipi_dsi_device *dsi)
{{
\tstruct {id} *ctx = mipi_dsi_get_drvdata(dsi);
\tint ret;

\tret = mipi_dsi_detach(dsi);
\tif (ret < 0)
\t\tdev_err(&dsi->dev, \"Failed to detach from DSI host: %d\\n\", ret);

\tdrm_panel_remove(&ctx->panel);
}}

static const struct of_device_id {id}_of_match[] = {{
\t{{ .compatible = \"{compatible}\" }}, // FIXME
\t{{ /* sentinel */ }}
}};
MODULE_DEVICE_TABLE(of, {id}_of_match);

static struct mipi_dsi_driver {id}_driver = {{
\t.probe = {id}_probe,
\t.remove = {id}_remove,
\t.driver = {{
\t\t.name = \"{module}\",
\t\t.of_match_table = {id}_of_match,
\t}},
}};
module_mipi_dsi_driver({id}_driver);

MODULE_AUTHOR(\"panelgen <fix@me>\"); // FIXME
MODULE_DESCRIPTION(\"DRM driver for {name}\");
MODULE_LICENSE(\"GPL\");
",
        includes = includes(p, options, &rendered),
        struct_def = struct_def(p, options, bindings),
        reset = reset_fn(p, bindings),
        on = commands_fn(p, &rendered[0], options),
        off = commands_fn(p, &rendered[1], options),
        prepare = prepare_fn(p, options),
        unprepare = unprepare_fn(p, options),
        mode = simple::mode_struct(p),
        backlight = backlight_fns(p, options),
        probe = probe_fn(p, options, bindings),
        compatible = bindings.compatible,
        name = p.name,
    ))
}
