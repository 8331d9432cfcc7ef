//! Generation options and the derived devicetree binding description.

use crate::panel::Panel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioFlag {
    ActiveHigh,
    ActiveLow,
}

impl GpioFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            GpioFlag::ActiveHigh => "GPIO_ACTIVE_HIGH",
            GpioFlag::ActiveLow => "GPIO_ACTIVE_LOW",
        }
    }
}

/// Command line options that shape the generated drivers.
#[derive(Debug, Clone)]
pub struct Options {
    /// Regulator supply names to request in the driver.
    pub regulators: Vec<String>,
    /// Generate backlight handling when the panel uses DCS backlight.
    pub backlight: bool,
    /// Also toggle a backlight GPIO.
    pub backlight_gpio: bool,
    /// Implement .get_brightness via DCS read.
    pub dcs_get_brightness: bool,
    /// Drop delays of this many milliseconds or less from sequences.
    pub ignore_wait: u8,
    /// Only interpret the DCS commands every panel must implement.
    pub dumb_dcs: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            regulators: Vec::new(),
            backlight: true,
            backlight_gpio: false,
            dcs_get_brightness: true,
            ignore_wait: 0,
            dumb_dcs: false,
        }
    }
}

/// What the generated driver expects to find in the device tree.
#[derive(Debug, Clone)]
pub struct Bindings {
    pub compatible: String,
    pub gpios: Vec<(&'static str, GpioFlag)>,
}

/// Derive the devicetree bindings for a panel. The compatible string is
/// a guess based on the panel id and needs review.
pub fn bindings(p: &Panel, options: &Options) -> Bindings {
    let id = p.dash_id();
    // Guess a vendor prefix when the id starts with a plausible vendor
    // name (e.g. booyi-otm8019a); otherwise fall back to mdss.
    let vendor = id.split('-').next().unwrap_or("");
    let compatible = if !vendor.is_empty() && vendor.chars().all(|c| c.is_ascii_alphabetic()) {
        match id.split_once('-') {
            Some((vendor, rest)) => format!("{vendor},{rest}"),
            None => id.clone(),
        }
    } else {
        format!("mdss,{id}")
    };

    let mut gpios = Vec::new();
    if !p.reset_seq.is_empty() {
        // Active low when the sequence leaves the line asserted high.
        let flag = if p.reset_seq.last().map(|&(state, _)| state) == Some(1) {
            GpioFlag::ActiveLow
        } else {
            GpioFlag::ActiveHigh
        };
        gpios.push(("reset", flag));
    }
    if options.backlight_gpio {
        gpios.push(("backlight", GpioFlag::ActiveHigh));
    }

    Bindings { compatible, gpios }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_panel;

    #[test]
    fn compatible_guesses_vendor_prefixes() {
        for (short_id, compatible) in [
            ("booyi_otm8019a", "booyi,otm8019a"),
            ("s6e8aa5x01_ams561ra01", "mdss,s6e8aa5x01-ams561ra01"),
            ("test", "test"),
        ] {
            let mut p = test_panel();
            p.short_id = short_id.to_owned();
            assert_eq!(bindings(&p, &Options::default()).compatible, compatible);
        }
    }

    #[test]
    fn reset_gpio_polarity_follows_the_final_state() {
        let mut p = test_panel();
        let options = Options::default();

        // Ends high: the line is presumably active low.
        assert_eq!(
            bindings(&p, &options).gpios,
            vec![("reset", GpioFlag::ActiveLow)]
        );

        p.reset_seq = vec![(1, 10), (0, 0)];
        assert_eq!(
            bindings(&p, &options).gpios,
            vec![("reset", GpioFlag::ActiveHigh)]
        );

        p.reset_seq.clear();
        assert!(bindings(&p, &options).gpios.is_empty());
    }

    #[test]
    fn backlight_gpio_is_requested_on_demand() {
        let p = test_panel();
        let mut options = Options::default();
        options.backlight_gpio = true;
        assert!(bindings(&p, &options)
            .gpios
            .contains(&("backlight", GpioFlag::ActiveHigh)));
    }
}
