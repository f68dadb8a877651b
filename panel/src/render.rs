//! Plain-text rendering of one page, printed after each refresh

use crate::panel::Panel;
use crate::presentation::ControlKind;
use std::fmt::Write as _;

const LABEL_WIDTH: usize = 28;
const VALUE_WIDTH: usize = 18;

/// Render page `index`, or `None` when the panel has no such page
pub fn render_page(panel: &Panel, index: usize) -> Option<String> {
    let view = panel.view();
    let page = view.pages.get(index)?;
    let mut out = String::new();

    let mode = if panel.is_simulating() { "SIM" } else { "LIVE" };
    let color = match &page.color_name {
        Some(name) => format!("{} {}", name, page.color),
        None => page.color.clone(),
    };
    let _ = writeln!(
        out,
        "== {} | {} [{}] | {}/{} | step {} | {} | {}",
        panel.kind().name(),
        page.title,
        color,
        index + 1,
        view.pages.len(),
        panel.step(),
        mode,
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
    );

    for row in page.rows.iter().flatten() {
        let Some(value) = view.values.get(&row.key) else {
            continue;
        };
        let _ = write!(
            out,
            "{:<lw$} {:>vw$} {:<8}",
            row.label,
            value.text,
            value.style.marker(),
            lw = LABEL_WIDTH,
            vw = VALUE_WIDTH,
        );
        if let Some(control) = view.controls.get(&row.key) {
            let _ = match &control.kind {
                ControlKind::Slider(spec) => write!(
                    out,
                    " slider [{}..{}] at {} {}",
                    spec.lower,
                    spec.upper,
                    control.lcd.unwrap_or(spec.value),
                    control.widget.style.marker()
                ),
                ControlKind::RadioGroup(choices) => write!(
                    out,
                    " radio ({})",
                    choices
                        .iter()
                        .map(|c| c.display())
                        .collect::<Vec<_>>()
                        .join("|")
                ),
                ControlKind::LineEdit => write!(out, " edit '{}'", control.widget.text),
            };
        }
        out.push('\n');
    }

    let banner = panel.banner();
    if !banner.text.is_empty() {
        let _ = writeln!(out, "-- {} [{}]", banner.text, if banner.ok { "OK" } else { "ERROR" });
    }
    Some(out)
}
