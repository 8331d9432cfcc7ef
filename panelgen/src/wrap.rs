//! Line wrapping for generated C source.
//!
//! Widths are measured with tabs expanded to 8 columns, matching the
//! kernel style the output is reviewed against.

fn width(s: &str) -> usize {
    s.len() + s.matches('\t').count() * 7
}

const WRAP: usize = 80;

/// Join items with spaces, breaking to a new line when the running width
/// would exceed 80 columns. No continuation alignment.
pub(crate) fn simple(items: &[&str]) -> String {
    let mut s = String::new();
    for item in items {
        if width(&s) + item.len() + 1 > WRAP {
            s.push('\n');
        } else if !s.is_empty() {
            s.push(' ');
        }
        s.push_str(item);
    }
    s
}

/// Join an argument list, wrapping and aligning continuation lines under
/// the opening delimiter.
///
/// `join("\tfoo(", ",", ");", ...)` renders `\tfoo(a, b);` on one line,
/// or aligns every continuation under the `(` when the result would be
/// wider than 80 columns. `force` breaks unconditionally before the
/// item with that index once wrapping kicks in.
pub(crate) fn join(
    prefix: &str,
    sep: &str,
    end: &str,
    items: &[String],
    force: Option<usize>,
) -> String {
    join_width(prefix, sep, end, items, force, WRAP)
}

pub(crate) fn join_width(
    prefix: &str,
    sep: &str,
    end: &str,
    items: &[String],
    force: Option<usize>,
    wrap: usize,
) -> String {
    let oneline = format!("{prefix}{}{end}", items.join(&format!("{sep} ")));
    if width(&oneline) <= wrap {
        return oneline;
    }

    let align = width(prefix);
    let wrap = wrap.saturating_sub(align);
    let indent = "\t".repeat(align / 8) + &" ".repeat(align % 8);

    let mut s = String::new();
    let mut line = String::new();
    let mut prefix = prefix.to_owned();

    let last = items.len() - 1;
    for (i, item) in items.iter().enumerate() {
        let sep = if i == last { end } else { sep };

        if !line.is_empty() {
            if force == Some(i) || width(&line) + item.len() + sep.len() > wrap {
                s.push_str(&prefix);
                s.push_str(&line);
                s.push('\n');
                prefix = indent.clone();
                line.clear();
            } else {
                line.push(' ');
            }
        }
        line.push_str(item);
        line.push_str(sep);
    }

    s.push_str(&prefix);
    s.push_str(&line);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn short_lists_stay_on_one_line() {
        assert_eq!(
            join("\tfoo(", ",", ");", &args(&["a", "b"]), None),
            "\tfoo(a, b);"
        );
    }

    #[test]
    fn long_lists_align_under_the_delimiter() {
        let out = join(
            "static int panel_get_modes(",
            ",",
            ")",
            &args(&["struct drm_panel *panel", "struct drm_connector *connector"]),
            None,
        );
        assert_eq!(
            out,
            "static int panel_get_modes(struct drm_panel *panel,\n\
             \t\t\t   struct drm_connector *connector)"
        );
    }

    #[test]
    fn force_breaks_before_the_given_index() {
        let items = args(&["&dsi_ctx", "0x01", "0x02", "0x03"]);
        // Narrow width so wrapping engages, then the break lands at item 2.
        let out = join_width("\twrite(", ",", ");", &items, Some(2), 40);
        assert_eq!(out.lines().next().unwrap(), "\twrite(&dsi_ctx, 0x01,");
    }

    #[test]
    fn simple_wraps_without_alignment() {
        let long = "a".repeat(70);
        let out = simple(&["static inline", &long]);
        assert_eq!(out, format!("static inline\n{long}"));
    }
}
