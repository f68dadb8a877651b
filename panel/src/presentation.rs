//! Presentation model
//!
//! The panel never touches a real toolkit. Each page is a list of rows and
//! each laid-out key owns a value widget (and, on control panels, a control
//! widget). The `key -> widget` maps are rebuilt on every layout.

use crate::catalog::{random_color, ALL_MODULE};
use crate::paginate::Pagination;
use crate::property::{DataRange, DataType, Style, Value};
use crate::table::{Module, PropertyRecord};
use std::collections::HashMap;

/// Which kind of panel is being laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Status,
    Control,
}

impl PanelKind {
    pub fn name(self) -> &'static str {
        match self {
            PanelKind::Status => "MAPS Status GUI",
            PanelKind::Control => "MAPS Control GUI",
        }
    }

    /// Control panels only offer records the device accepts writes for
    pub fn writable_only(self) -> bool {
        matches!(self, PanelKind::Control)
    }
}

/// Slider geometry derived from a numeric interval
#[derive(Debug, Clone, PartialEq)]
pub struct SliderGeometry {
    pub lower: i64,
    pub upper: i64,
    pub value: i64,
    pub step: i64,
    pub tick_interval: i64,
}

impl SliderGeometry {
    /// Bounds extend the range by 10% of its span on both sides; the slider
    /// starts at the midpoint and moves in steps of 10% of the span
    pub fn from_interval(min: f64, max: f64) -> Self {
        let span = max - min;
        let tenth = span / 10.0;
        let step = (tenth.round() as i64).max(1);
        Self {
            lower: (min - tenth).round() as i64,
            upper: (max + tenth).round() as i64,
            value: (min + span / 2.0).round() as i64,
            step,
            tick_interval: step,
        }
    }
}

/// Control offered for a writable record
#[derive(Debug, Clone, PartialEq)]
pub enum ControlKind {
    Slider(SliderGeometry),
    RadioGroup(Vec<Value>),
    LineEdit,
}

impl ControlKind {
    pub fn for_record(record: &PropertyRecord) -> Self {
        match &record.datarange {
            Some(DataRange::Interval { min, max }) if record.datatype.is_numeric() => {
                ControlKind::Slider(SliderGeometry::from_interval(*min, *max))
            }
            Some(DataRange::Choices(choices)) if !choices.is_empty() => {
                ControlKind::RadioGroup(choices.clone())
            }
            _ => ControlKind::LineEdit,
        }
    }
}

/// Text + style of a display element; `redraws` counts text rewrites
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Widget {
    pub text: String,
    pub style: Style,
    pub redraws: u64,
}

impl Widget {
    pub fn new(text: String) -> Self {
        Self {
            text,
            ..Default::default()
        }
    }

    pub fn set_text(&mut self, text: String) {
        self.text = text;
        self.redraws += 1;
    }

    /// Rewrite numeric text only when the shown number differs from `value`
    pub fn refresh(&mut self, datatype: DataType, value: &Value) -> bool {
        let unchanged = match (datatype, value) {
            (DataType::Float, Value::Float(v)) => self.text.trim().parse::<f64>().ok() == Some(*v),
            (DataType::Int, Value::Int(v)) => self.text.trim().parse::<i64>().ok() == Some(*v),
            _ => false,
        };
        if unchanged {
            return false;
        }
        self.set_text(value.display());
        true
    }
}

/// Control widget plus its current state
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub kind: ControlKind,
    pub widget: Widget,
    /// LCD readout next to a slider
    pub lcd: Option<i64>,
}

impl Control {
    fn new(kind: ControlKind, record: &PropertyRecord) -> Self {
        let (text, lcd) = match &kind {
            ControlKind::Slider(spec) => (spec.value.to_string(), Some(spec.value)),
            ControlKind::RadioGroup(_) | ControlKind::LineEdit => (record.actval.display(), None),
        };
        Self {
            kind,
            widget: Widget::new(text),
            lcd,
        }
    }
}

/// One labelled row of a page
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: String,
    pub label: String,
    pub tooltip: String,
}

/// One laid-out page; `None` rows are placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub title: String,
    pub color: String,
    pub color_name: Option<String>,
    pub rows: Vec<Option<Row>>,
}

/// Status line shown under the pages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Banner {
    pub text: String,
    pub ok: bool,
}

impl Banner {
    pub fn stylesheet(&self) -> &'static str {
        if self.ok {
            "background-color: lightgreen; color: #000000;"
        } else {
            "background-color: red; color: #FFFFFF;"
        }
    }
}

/// Pages plus the `key -> widget` maps
#[derive(Debug, Clone, Default)]
pub struct Presentation {
    pub pages: Vec<Page>,
    pub values: HashMap<String, Widget>,
    pub controls: HashMap<String, Control>,
}

impl Presentation {
    /// Lay out paginated records; a failed pagination lays out nothing
    pub fn build(
        kind: PanelKind,
        module: &Module,
        pagination: &Pagination<PropertyRecord>,
    ) -> Self {
        let mut view = Presentation::default();
        if pagination.is_failed() {
            tracing::error!(
                "Failed to paginate module '{}' (pages={}, chunk={})",
                module.name,
                pagination.page_count,
                pagination.chunk
            );
            return view;
        }

        let mut rng = rand::thread_rng();
        for (p, slice) in pagination.pages.iter().enumerate() {
            let (color, color_name) = if module.name == ALL_MODULE {
                let (name, code) = random_color(&mut rng);
                (code.to_string(), Some(name.to_string()))
            } else {
                (module.color.clone(), None)
            };

            let mut rows = Vec::with_capacity(slice.len());
            for (key, record) in slice {
                if key.is_empty() {
                    rows.push(None);
                    continue;
                }
                view.values
                    .insert(key.clone(), Widget::new(record.actval.display()));
                if kind == PanelKind::Control {
                    view.controls.insert(
                        key.clone(),
                        Control::new(ControlKind::for_record(record), record),
                    );
                }
                rows.push(Some(Row {
                    key: key.clone(),
                    label: record.display_label(key),
                    tooltip: record.tooltip.clone(),
                }));
            }

            view.pages.push(Page {
                title: format!("{} {}", module.title, p),
                color,
                color_name,
                rows,
            });
        }
        view
    }

    /// Background colour of the page holding `key`
    pub fn page_color(&self, key: &str) -> Option<&str> {
        self.pages
            .iter()
            .find(|page| page.rows.iter().flatten().any(|row| row.key == key))
            .map(|page| page.color.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paginate::paginate;
    use maps_indi::IndiPermission;

    fn module() -> Module {
        let mut m = Module::new("hexapod", "Hexapod", "#E2FDDB");
        m.insert(
            "hexapod.position.x",
            PropertyRecord {
                label: "X".into(),
                unit: "um".into(),
                datatype: DataType::Float,
                datarange: Some(DataRange::Interval { min: 10.0, max: 20.0 }),
                actval: Value::Float(12.0),
                permission: IndiPermission::ReadWrite,
                ..Default::default()
            },
        )
        .unwrap();
        m.insert(
            "hexapod.status.mode",
            PropertyRecord {
                datarange: Some(DataRange::Choices(vec![
                    Value::Text("idle".into()),
                    Value::Text("track".into()),
                ])),
                actval: Value::Text("idle".into()),
                permission: IndiPermission::ReadWrite,
                ..Default::default()
            },
        )
        .unwrap();
        m.insert(
            "hexapod.note.text",
            PropertyRecord {
                permission: IndiPermission::ReadWrite,
                ..Default::default()
            },
        )
        .unwrap();
        m
    }

    #[test]
    fn test_slider_geometry() {
        let spec = SliderGeometry::from_interval(10.0, 20.0);
        assert_eq!(spec.lower, 9);
        assert_eq!(spec.upper, 21);
        assert_eq!(spec.value, 15);
        assert_eq!(spec.step, 1);
        assert_eq!(spec.tick_interval, 1);

        let spec = SliderGeometry::from_interval(-1000.0, 1000.0);
        assert_eq!((spec.lower, spec.upper, spec.value, spec.step), (-1200, 1200, 0, 200));
    }

    #[test]
    fn test_control_kinds() {
        let m = module();
        let kinds: Vec<_> = m
            .records
            .iter()
            .map(|(_, r)| ControlKind::for_record(r))
            .collect();
        assert!(matches!(kinds[0], ControlKind::Slider(_)));
        assert!(matches!(&kinds[1], ControlKind::RadioGroup(c) if c.len() == 2));
        assert_eq!(kinds[2], ControlKind::LineEdit);
    }

    #[test]
    fn test_build_control_layout() {
        let m = module();
        let pagination = paginate(m.records.entries(true), 1, 2);
        let view = Presentation::build(PanelKind::Control, &m, &pagination);

        assert_eq!(view.pages.len(), 2);
        assert_eq!(view.pages[0].title, "Hexapod 0");
        assert_eq!(view.pages[1].title, "Hexapod 1");
        assert_eq!(view.pages[0].color, "#E2FDDB");
        assert_eq!(
            view.pages[0].rows[0].as_ref().unwrap().label,
            "X [um]"
        );
        assert_eq!(
            view.pages[0].rows[1].as_ref().unwrap().label,
            "hexapod.status.mode"
        );
        assert!(view.pages[1].rows[1].is_none());

        assert_eq!(view.values["hexapod.position.x"].text, "12.0");
        assert_eq!(view.controls["hexapod.position.x"].lcd, Some(15));
        assert_eq!(view.controls.len(), 3);
        assert_eq!(view.page_color("hexapod.note.text"), Some("#E2FDDB"));
    }

    #[test]
    fn test_status_layout_has_no_controls() {
        let m = module();
        let pagination = paginate(m.records.entries(false), 1, 25);
        let view = Presentation::build(PanelKind::Status, &m, &pagination);
        assert_eq!(view.pages.len(), 1);
        assert_eq!(view.values.len(), 3);
        assert!(view.controls.is_empty());
    }

    #[test]
    fn test_failed_pagination_lays_out_nothing() {
        let m = module();
        let pagination = paginate(m.records.entries(false), 1, 0);
        let view = Presentation::build(PanelKind::Status, &m, &pagination);
        assert!(view.pages.is_empty());
        assert!(view.values.is_empty());
    }

    #[test]
    fn test_widget_refresh_skips_unchanged_numbers() {
        let mut w = Widget::new("15.0".into());
        assert!(!w.refresh(DataType::Float, &Value::Float(15.0)));
        assert_eq!(w.redraws, 0);
        assert!(w.refresh(DataType::Float, &Value::Float(15.5)));
        assert_eq!(w.text, "15.5");
        assert_eq!(w.redraws, 1);

        let mut w = Widget::new("idle".into());
        assert!(w.refresh(DataType::Text, &Value::Text("idle".into())));
        assert_eq!(w.redraws, 1);
    }
}
