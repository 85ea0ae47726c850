//! Chart drawing.
//!
//! The backend returns an opaque figure document `{"data": [...], "layout": {...}}`.
//! The renderer parses it, overlays the interaction settings, and hands the
//! pieces to a [`RenderSink`]. Series data is passed through untouched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::RenderError;

/// What the chart area currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChartView {
    /// Initial message; also the state after any failure or reset.
    #[default]
    Placeholder,
    Loading,
    Chart { stock_count: usize, index_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageExportOptions {
    pub format: String,
    pub filename: String,
    pub height: u32,
    pub width: u32,
    pub scale: u32,
}

/// Sink configuration for pan/zoom interaction and image export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionOptions {
    pub responsive: bool,
    pub display_mode_bar: bool,
    pub displaylogo: bool,
    pub mode_bar_buttons_to_remove: Vec<String>,
    pub scroll_zoom: bool,
    pub double_click: String,
    /// Milliseconds; separates one-finger from two-finger gestures.
    pub touch_delay: u32,
    pub show_tips: bool,
    pub to_image_button_options: ImageExportOptions,
}

impl Default for InteractionOptions {
    fn default() -> Self {
        Self {
            responsive: true,
            display_mode_bar: true,
            displaylogo: false,
            mode_bar_buttons_to_remove: vec![String::from("lasso2d"), String::from("autoScale2d")],
            scroll_zoom: true,
            double_click: String::from("reset"),
            touch_delay: 150,
            show_tips: false,
            to_image_button_options: ImageExportOptions {
                format: String::from("png"),
                filename: String::from("stock_chart"),
                height: 600,
                width: 1200,
                scale: 2,
            },
        }
    }
}

/// Pan by default, zoom with the wheel or pinch.
pub fn apply_interaction_overlay(layout: &mut Map<String, Value>) {
    layout.insert(String::from("dragmode"), Value::from("pan"));
    layout.insert(String::from("scrollZoom"), Value::from(true));
}

/// Split a figure document into `(series, layout)` with the overlay applied.
pub fn prepare_figure(payload: &str) -> Result<(Value, Value), RenderError> {
    let mut figure: Value = serde_json::from_str(payload)?;
    let object = figure
        .as_object_mut()
        .ok_or(RenderError::MissingField { field: "data" })?;

    let series = object
        .remove("data")
        .ok_or(RenderError::MissingField { field: "data" })?;
    let mut layout = match object.remove("layout") {
        Some(Value::Object(layout)) => layout,
        _ => return Err(RenderError::MissingField { field: "layout" }),
    };
    apply_interaction_overlay(&mut layout);
    Ok((series, Value::Object(layout)))
}

/// Destination for finished figures.
pub trait RenderSink: Send {
    fn draw(
        &mut self,
        container: &str,
        series: &Value,
        layout: &Value,
        options: &InteractionOptions,
    ) -> Result<(), String>;

    /// Remove anything drawn into `container`.
    fn clear(&mut self, container: &str);
}

/// Writes the final figure (`data`, `layout`, `config`) as JSON.
#[derive(Debug, Clone)]
pub struct FigureFileSink {
    path: PathBuf,
}

impl FigureFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RenderSink for FigureFileSink {
    fn draw(
        &mut self,
        container: &str,
        series: &Value,
        layout: &Value,
        options: &InteractionOptions,
    ) -> Result<(), String> {
        let figure = json!({
            "container": container,
            "data": series,
            "layout": layout,
            "config": options,
        });
        let text = serde_json::to_string_pretty(&figure).map_err(|error| error.to_string())?;
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|error| format!("failed to create {}: {error}", parent.display()))?;
        }
        fs::write(&self.path, text)
            .map_err(|error| format!("failed to write {}: {error}", self.path.display()))?;
        info!(path = %self.path.display(), "figure written");
        Ok(())
    }

    fn clear(&mut self, _container: &str) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "figure removed"),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => warn!(path = %self.path.display(), %error, "failed to remove figure"),
        }
    }
}

/// One call recorded by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Draw {
        container: String,
        series: Value,
        layout: Value,
        options: InteractionOptions,
    },
    Clear { container: String },
}

/// Records every call; clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn draw_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, SinkCall::Draw { .. }))
            .count()
    }

    fn record(&self, call: SinkCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl RenderSink for MemorySink {
    fn draw(
        &mut self,
        container: &str,
        series: &Value,
        layout: &Value,
        options: &InteractionOptions,
    ) -> Result<(), String> {
        self.record(SinkCall::Draw {
            container: container.to_owned(),
            series: series.clone(),
            layout: layout.clone(),
            options: options.clone(),
        });
        Ok(())
    }

    fn clear(&mut self, container: &str) {
        self.record(SinkCall::Clear {
            container: container.to_owned(),
        });
    }
}

/// Drives a [`RenderSink`] and tracks the [`ChartView`].
pub struct ChartRenderer {
    sink: Box<dyn RenderSink>,
    container: String,
    options: InteractionOptions,
    view: ChartView,
}

impl ChartRenderer {
    pub fn new(sink: Box<dyn RenderSink>, container: impl Into<String>) -> Self {
        Self {
            sink,
            container: container.into(),
            options: InteractionOptions::default(),
            view: ChartView::Placeholder,
        }
    }

    pub fn view(&self) -> &ChartView {
        &self.view
    }

    pub fn options(&self) -> &InteractionOptions {
        &self.options
    }

    /// Draw `payload`. On any failure the placeholder is restored.
    pub fn render(
        &mut self,
        payload: &str,
        stock_count: usize,
        index_name: &str,
    ) -> Result<(), RenderError> {
        let drawn = prepare_figure(payload).and_then(|(series, layout)| {
            self.sink
                .draw(&self.container, &series, &layout, &self.options)
                .map_err(RenderError::Sink)
        });

        match drawn {
            Ok(()) => {
                self.view = ChartView::Chart {
                    stock_count,
                    index_name: index_name.to_owned(),
                };
                Ok(())
            }
            Err(error) => {
                warn!(%error, "chart render failed");
                self.show_placeholder();
                Err(error)
            }
        }
    }

    /// Replace whatever is drawn with the loading indicator.
    pub fn show_loading(&mut self) {
        self.clear_drawn();
        self.view = ChartView::Loading;
    }

    pub fn show_placeholder(&mut self) {
        self.clear_drawn();
        self.view = ChartView::Placeholder;
    }

    // The sink only holds a figure while the view is `Chart`.
    fn clear_drawn(&mut self) {
        if matches!(self.view, ChartView::Chart { .. }) {
            self.sink.clear(&self.container);
        }
    }
}
