//! Emitter for a device tree include snippet wiring the panel up to
//! the mainline MDSS nodes. GPIO numbers are left as XY placeholders
//! for the porter to fill in.

use crate::options::{Bindings, GpioFlag, Options};
use crate::panel::{BacklightControl, Panel};

pub fn file_name(p: &Panel) -> String {
    format!("panel-{}.dtsi", p.dash_id())
}

fn backlight(p: &Panel) -> &'static str {
    if p.backlight == Some(BacklightControl::Dcs) {
        ""
    } else {
        "\t\tbacklight = <&backlight>;\n"
    }
}

fn supplies(options: &Options) -> String {
    let mut s = String::new();
    for r in &options.regulators {
        s.push_str(&format!("\t\t{r}-supply = <&...>;\n"));
    }
    s
}

fn gpios(bindings: &Bindings) -> String {
    let mut s = String::new();
    for (name, flag) in &bindings.gpios {
        s.push_str(&format!(
            "\t\t{name}-gpios = <&tlmm XY {}>;\n",
            flag.as_str()
        ));
    }

    if has_backlight_gpio(bindings) {
        s.push_str(
            "
\t\tpinctrl-0 = <&lcd_bl_en_default>;
\t\tpinctrl-names = \"default\";
",
        );
    }
    s
}

fn has_backlight_gpio(bindings: &Bindings) -> bool {
    bindings.gpios.iter().any(|&(name, _)| name == "backlight")
}

fn tlmm(bindings: &Bindings) -> String {
    let mut s = String::from("&tlmm {");
    if has_backlight_gpio(bindings) {
        s.push_str(
            "
\tlcd_bl_en_default: lcd-bl-en-default-state {
\t\tpins = \"gpioXY\";
\t\tfunction = \"gpio\";
\t\tdrive-strength = <2>;
\t\tbias-disable;
\t};
",
        );
    }

    s.push_str(
        "
\tmdss_default: mdss-default-state {
\t\tpins = \"gpioXY\";
\t\tfunction = \"gpio\";
\t\tdrive-strength = <8>;
\t\tbias-disable;
\t};

\tmdss_sleep: mdss-sleep-state {
\t\tpins = \"gpioXY\";
\t\tfunction = \"gpio\";
\t\tdrive-strength = <2>;
\t\tbias-pull-down;
\t};
};
",
    );
    s
}

pub fn render(p: &Panel, options: &Options, bindings: &Bindings) -> String {
    let mut s = String::new();

    if p.cphy_mode {
        s.push_str("#include <dt-bindings/phy/phy.h>\n\n");
    }

    let data_lanes = p.lane_map.phys2log()[..p.lanes as usize]
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ");

    s.push_str(&format!(
        "\
&mdss_dsi0 {{
\tpinctrl-0 = <&mdss_default>;
\tpinctrl-1 = <&mdss_sleep>;
\tpinctrl-names = \"default\", \"sleep\";

\tpanel@0 {{
\t\tcompatible = \"{compatible}\";
\t\treg = <0>;

{backlight}{supplies}{gpios}
\t\tport {{
\t\t\tpanel_in: endpoint {{
\t\t\t\tremote-endpoint = <&mdss_dsi0_out>;
\t\t\t}};
\t\t}};
\t}};
}};

&mdss_dsi0_out {{
\tdata-lanes = <{data_lanes}>;
\tremote-endpoint = <&panel_in>;
}};
",
        compatible = bindings.compatible,
        backlight = backlight(p),
        supplies = supplies(options),
        gpios = gpios(bindings),
    ));

    if p.ldo_mode {
        s.push_str(
            "
&mdss_dsi0_phy {
\tqcom,dsi-phy-regulator-ldo-mode;
};
",
        );
    }
    if p.cphy_mode {
        s.push_str(
            "
&mdss_dsi0_phy {
    phy-type = <PHY_TYPE_CPHY>;
};
",
        );
    }

    s.push_str(&tlmm(bindings));
    s
}
