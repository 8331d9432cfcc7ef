use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use fdt_parser::Fdt;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use panelgen::options::{bindings, Options};
use panelgen::panel::Panel;
use panelgen::{driver, dtsi, lk, simple};

const USAGE: &str = "\
Usage: panelgen [OPTIONS] DTB...

Generate Linux DRM panel drivers from (downstream) MDSS DSI device tree blobs.

Options:
  -r, --regulator[=NAME]   request a power supply regulator in the driver
                           (default name: power); repeat for multiple supplies
      --backlight-gpio     enable/disable backlight with an extra GPIO
                           (works only for MIPI DCS backlight)
      --no-backlight       do not generate any backlight/brightness code
      --dcs-no-get-brightness
                           do not generate get_brightness() for DCS backlight;
                           some panels do not implement the DCS command correctly
      --ignore-wait=MS     ignore waits of MS milliseconds or less in command
                           sequences
      --dumb-dcs           only interpret the DCS commands any panel should
                           support (sleep mode, display on/off)
  -h, --help               show this help
";

fn parse_args(args: impl Iterator<Item = String>) -> Result<Option<(Options, Vec<String>)>> {
    let mut options = Options::default();
    let mut paths = Vec::new();

    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => {
                print!("{USAGE}");
                return Ok(None);
            }
            "-r" | "--regulator" => options.regulators.push("power".to_owned()),
            "--backlight-gpio" => options.backlight_gpio = true,
            "--no-backlight" => options.backlight = false,
            "--dcs-no-get-brightness" => options.dcs_get_brightness = false,
            "--dumb-dcs" => options.dumb_dcs = true,
            _ => {
                if let Some(name) = arg.strip_prefix("--regulator=") {
                    options.regulators.push(name.to_owned());
                } else if let Some(ms) = arg.strip_prefix("--ignore-wait=") {
                    options.ignore_wait = ms
                        .parse()
                        .with_context(|| format!("invalid --ignore-wait value: {ms}"))?;
                } else if arg.starts_with('-') {
                    bail!("unknown option: {arg}");
                } else {
                    paths.push(arg);
                }
            }
        }
    }

    if paths.is_empty() {
        bail!("no device tree blobs given (try --help)");
    }
    Ok(Some((options, paths)))
}

/// Write all output files for one panel into a directory named after it.
fn generate(p: &Panel, options: &Options) -> Result<()> {
    info!("generating: {} ({})", p.id, p.name);

    let dir = Path::new(&p.id);
    if dir.exists() {
        fs::remove_dir_all(dir).with_context(|| format!("failed to clear {}", p.id))?;
    }
    fs::create_dir(dir).with_context(|| format!("failed to create {}", p.id))?;

    let bindings = bindings(p, options);

    fs::write(dir.join(simple::file_name(p)), simple::render(p))?;
    fs::write(
        dir.join(driver::file_name(p)),
        driver::render(p, options, &bindings)?,
    )?;
    fs::write(dir.join(dtsi::file_name(p)), dtsi::render(p, options, &bindings))?;
    if let Some(header) = lk::render(p)? {
        fs::write(dir.join(lk::file_name(p)), header)?;
    }
    Ok(())
}

/// Process one blob, returning how many panels were generated. A broken
/// candidate only skips that candidate.
fn process(path: &str, options: &Options) -> Result<u32> {
    info!("parsing: {path}");
    let data = fs::read(path).with_context(|| format!("failed to read {path}"))?;
    let fdt = Fdt::parse(&data).with_context(|| format!("failed to parse {path}"))?;

    let candidates =
        Panel::find(&fdt).with_context(|| format!("failed to locate panels in {path}"))?;

    let mut generated = 0;
    for node in candidates {
        let mut panel = match Panel::parse(&fdt, node) {
            Ok(Some(panel)) => panel,
            Ok(None) => continue,
            Err(e) => {
                error!("skipping {}: {e}", fdt.path(node));
                continue;
            }
        };

        if !options.backlight {
            panel.backlight = None;
        }

        match generate(&panel, options) {
            Ok(()) => generated += 1,
            Err(e) => error!("failed to generate {}: {e:#}", panel.id),
        }
    }

    if generated == 0 {
        warn!("{path} does not contain any panel specifications");
    }
    Ok(generated)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let (options, paths) = match parse_args(env::args().skip(1)) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let mut generated = 0;
    for path in &paths {
        match process(path, &options) {
            Ok(n) => generated += n,
            Err(e) => error!("{e:#}"),
        }
    }

    if generated == 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
