//! Chart rendering
//!
//! Charts requested by the agent are declarative: a [`ChartSpec`] names the
//! chart type, axes and series, and fixed plotters code draws it. The agent may
//! also send a short matplotlib-style script, which [`script`] parses into a
//! `ChartSpec`. Nothing the model writes is ever executed.

pub mod script;

use std::path::Path;

use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::types::{AppError, AppResult};

pub const CHART_WIDTH: u32 = 800;
pub const CHART_HEIGHT: u32 = 500;

pub const MAX_SERIES: usize = 10;
pub const MAX_POINTS: usize = 10_000;

pub const MAX_ABS_VALUE: f64 = 1e15;

// matplotlib "tab10"
const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    #[serde(alias = "plot")]
    Line,
    Bar,
    Scatter,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub name: Option<String>,
    /// Empty means 0, 1, 2, ...
    #[serde(default)]
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn points(&self) -> Vec<(f64, f64)> {
        if self.x.is_empty() {
            self.y.iter().enumerate().map(|(i, y)| (i as f64, *y)).collect()
        } else {
            self.x.iter().copied().zip(self.y.iter().copied()).collect()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    #[serde(default)]
    pub chart_type: ChartType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub x_label: Option<String>,
    #[serde(default)]
    pub y_label: Option<String>,
    /// Bar labels, one per bar position
    #[serde(default)]
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

/// Argument of the `render_chart` tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartRequest {
    Script {
        #[serde(alias = "code")]
        script: String,
    },
    Spec(ChartSpec),
}

impl ChartRequest {
    /// Resolve to a spec, parsing script requests
    pub fn to_spec(&self) -> AppResult<ChartSpec> {
        match self {
            ChartRequest::Spec(spec) => Ok(spec.clone()),
            ChartRequest::Script { script } => Ok(script::parse_script(script)?),
        }
    }

    /// Text shown next to a render failure
    pub fn source_text(&self) -> String {
        match self {
            ChartRequest::Script { script } => script.clone(),
            ChartRequest::Spec(spec) => {
                serde_json::to_string_pretty(spec).unwrap_or_else(|_| format!("{:?}", spec))
            }
        }
    }
}

/// `(x_min, x_max), (y_min, y_max)`
type Ranges = ((f64, f64), (f64, f64));

#[derive(Debug, Clone)]
pub struct RenderedChart {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ChartSpec {
    pub fn validate(&self) -> AppResult<()> {
        if self.series.is_empty() {
            return Err(AppError::Chart("chart has no data series".to_string()));
        }
        if self.series.len() > MAX_SERIES {
            return Err(AppError::Chart(format!(
                "too many series ({}, max {})",
                self.series.len(),
                MAX_SERIES
            )));
        }

        for (idx, series) in self.series.iter().enumerate() {
            let label = series.name.clone().unwrap_or_else(|| format!("#{}", idx + 1));
            if series.y.is_empty() {
                return Err(AppError::Chart(format!("series {} has no values", label)));
            }
            if series.y.len() > MAX_POINTS {
                return Err(AppError::Chart(format!(
                    "series {} has too many points (max {})",
                    label, MAX_POINTS
                )));
            }
            if !series.x.is_empty() && series.x.len() != series.y.len() {
                return Err(AppError::Chart(format!(
                    "series {}: x has {} values but y has {}",
                    label,
                    series.x.len(),
                    series.y.len()
                )));
            }
            if series.x.iter().chain(series.y.iter()).any(|v| !v.is_finite()) {
                return Err(AppError::Chart(format!("series {} contains non-finite values", label)));
            }
            if series.x.iter().chain(series.y.iter()).any(|v| v.abs() > MAX_ABS_VALUE) {
                return Err(AppError::Chart(format!(
                    "series {} has values beyond ±{:e}",
                    label, MAX_ABS_VALUE
                )));
            }
            if self.chart_type == ChartType::Bar
                && !self.categories.is_empty()
                && self.categories.len() != series.y.len()
            {
                return Err(AppError::Chart(format!(
                    "series {} has {} bars but {} categories were given",
                    label,
                    series.y.len(),
                    self.categories.len()
                )));
            }
        }

        Ok(())
    }

    fn bar_count(&self) -> usize {
        self.series.iter().map(|s| s.y.len()).max().unwrap_or(0)
    }

    fn bar_labels(&self) -> Vec<String> {
        if !self.categories.is_empty() {
            return self.categories.clone();
        }
        match self.series.first() {
            Some(first) if !first.x.is_empty() => first.x.iter().map(|v| format_number(*v)).collect(),
            _ => (1..=self.bar_count()).map(|i| i.to_string()).collect(),
        }
    }

    fn ranges(&self) -> AppResult<Ranges> {
        if self.chart_type == ChartType::Bar {
            let (lo, hi) = bounds(self.series.iter().flat_map(|s| s.y.iter().copied()));
            return Ok(((0.0, self.bar_count() as f64), pad(lo.min(0.0), hi.max(0.0))?));
        }

        let points: Vec<(f64, f64)> = self.series.iter().flat_map(|s| s.points()).collect();
        let (x_lo, x_hi) = bounds(points.iter().map(|p| p.0));
        let (y_lo, y_hi) = bounds(points.iter().map(|p| p.1));
        Ok((pad(x_lo, x_hi)?, pad(y_lo, y_hi)?))
    }
}

/// Render a chart request to PNG
pub fn render_request(request: &ChartRequest) -> AppResult<RenderedChart> {
    render(&request.to_spec()?)
}

/// Render a request and write the PNG to `path`, creating parent directories
pub fn save_png(request: &ChartRequest, path: &Path) -> AppResult<RenderedChart> {
    let chart = render_request(request)?;

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|e| AppError::Internal(format!("cannot create {}: {}", dir.display(), e)))?;
    }
    std::fs::write(path, &chart.png)
        .map_err(|e| AppError::Internal(format!("cannot write {}: {}", path.display(), e)))?;

    info!(path = %path.display(), bytes = chart.png.len(), "Chart saved");
    Ok(chart)
}

/// Render a validated spec onto a fresh canvas and encode it as PNG
pub fn render(spec: &ChartSpec) -> AppResult<RenderedChart> {
    spec.validate()?;
    let ranges = spec.ranges()?;

    let mut buffer = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    if let Err(e) = draw(&mut buffer, spec, ranges, true) {
        // Text needs a system font; without one, draw the data alone
        warn!(error = %e, "Chart drawing failed, retrying without text");
        draw(&mut buffer, spec, ranges, false).map_err(|e| AppError::Chart(e.to_string()))?;
    }

    let png = encode_png(buffer)?;
    debug!(bytes = png.len(), chart_type = ?spec.chart_type, "Chart rendered");

    Ok(RenderedChart {
        png,
        width: CHART_WIDTH,
        height: CHART_HEIGHT,
    })
}

fn draw(buffer: &mut [u8], spec: &ChartSpec, ranges: Ranges, with_text: bool) -> anyhow::Result<()> {
    let root = BitMapBackend::with_buffer(buffer, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
    root.fill(&WHITE)?;

    let ((x_lo, x_hi), (y_lo, y_hi)) = ranges;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if with_text {
        if let Some(title) = &spec.title {
            builder.caption(title, ("sans-serif", 24));
        }
        builder.x_label_area_size(40).y_label_area_size(60);
    }
    let mut chart = builder.build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

    let bar_labels = spec.bar_labels();
    let bar_formatter = |x: &f64| {
        let idx = x.floor() as usize;
        bar_labels.get(idx).cloned().unwrap_or_default()
    };

    if with_text {
        let mut mesh = chart.configure_mesh();
        if let Some(label) = &spec.x_label {
            mesh.x_desc(label.as_str());
        }
        if let Some(label) = &spec.y_label {
            mesh.y_desc(label.as_str());
        }
        if spec.chart_type == ChartType::Bar {
            mesh.disable_x_mesh()
                .x_labels(bar_labels.len().max(1))
                .x_label_formatter(&bar_formatter);
        }
        mesh.draw()?;
    }

    let series_count = spec.series.len();
    for (idx, series) in spec.series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let annotation = match spec.chart_type {
            ChartType::Line => chart.draw_series(LineSeries::new(series.points(), color.stroke_width(2)))?,
            ChartType::Scatter => chart.draw_series(
                series
                    .points()
                    .into_iter()
                    .map(move |p| Circle::new(p, 4, color.filled())),
            )?,
            ChartType::Bar => {
                let width = 0.8 / series_count as f64;
                let offset = 0.1 + width * idx as f64;
                chart.draw_series(series.y.iter().enumerate().map(move |(pos, y)| {
                    let x0 = pos as f64 + offset;
                    Rectangle::new([(x0, 0.0), (x0 + width, *y)], color.filled())
                }))?
            }
        };

        if with_text {
            if let Some(name) = &series.name {
                annotation
                    .label(name.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 4), (x + 16, y + 4)], color.filled()));
            }
        }
    }

    if with_text && spec.series.iter().any(|s| s.name.is_some()) {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}

fn encode_png(buffer: Vec<u8>) -> AppResult<Vec<u8>> {
    let canvas = image::RgbImage::from_raw(CHART_WIDTH, CHART_HEIGHT, buffer)
        .ok_or_else(|| AppError::Chart("canvas buffer has the wrong size".to_string()))?;

    let mut png = Vec::new();
    canvas
        .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| AppError::Chart(format!("PNG encoding failed: {}", e)))?;
    Ok(png)
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

/// Axis bounds with a 5% margin. An empty range becomes `0..1`.
fn pad(lo: f64, hi: f64) -> AppResult<(f64, f64)> {
    if lo > hi {
        return Ok((0.0, 1.0));
    }
    let span = hi - lo;
    let padded = if span.abs() < f64::EPSILON {
        (lo - 1.0, hi + 1.0)
    } else {
        (lo - span * 0.05, hi + span * 0.05)
    };
    if !span.is_finite() || !padded.0.is_finite() || !padded.1.is_finite() {
        return Err(AppError::Chart(format!("value range {}..{} is too wide to plot", lo, hi)));
    }
    Ok(padded)
}

pub(crate) fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn line_spec(y: Vec<f64>) -> ChartSpec {
        ChartSpec {
            series: vec![Series { y, ..Default::default() }],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_line_chart_produces_png() {
        let chart = render(&line_spec(vec![1.0, 2.0, 3.0])).unwrap();
        assert!(!chart.png.is_empty());
        assert_eq!(&chart.png[..8], &PNG_MAGIC);
        assert_eq!((chart.width, chart.height), (CHART_WIDTH, CHART_HEIGHT));
    }

    #[test]
    fn test_render_bar_chart_with_categories() {
        let spec = ChartSpec {
            chart_type: ChartType::Bar,
            title: Some("Армия, тыс. человек".to_string()),
            categories: vec!["1812".into(), "1813".into(), "1814".into()],
            series: vec![
                Series { name: Some("Франция".into()), y: vec![600.0, 400.0, 100.0], ..Default::default() },
                Series { name: Some("Россия".into()), y: vec![450.0, 500.0, 550.0], ..Default::default() },
            ],
            ..Default::default()
        };
        let chart = render(&spec).unwrap();
        assert_eq!(&chart.png[..8], &PNG_MAGIC);
    }

    #[test]
    fn test_render_scatter_with_single_point() {
        let spec = ChartSpec {
            chart_type: ChartType::Scatter,
            series: vec![Series { x: vec![1812.0], y: vec![5.0], ..Default::default() }],
            ..Default::default()
        };
        assert!(render(&spec).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_and_mismatched() {
        let empty = ChartSpec::default();
        assert!(matches!(empty.validate(), Err(AppError::Chart(_))));

        let mismatched = ChartSpec {
            series: vec![Series { x: vec![1.0, 2.0], y: vec![1.0], ..Default::default() }],
            ..Default::default()
        };
        let err = mismatched.validate().unwrap_err();
        assert!(err.to_string().contains("x has 2 values"));

        let nan = line_spec(vec![1.0, f64::NAN]);
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_chart_request_decodes_both_forms() {
        let spec: ChartRequest = serde_json::from_value(serde_json::json!({
            "chart_type": "bar",
            "categories": ["a", "b"],
            "series": [{"y": [1, 2]}]
        }))
        .unwrap();
        assert!(matches!(spec, ChartRequest::Spec(ChartSpec { chart_type: ChartType::Bar, .. })));

        let script: ChartRequest =
            serde_json::from_value(serde_json::json!({"code": "plt.plot([1,2,3])"})).unwrap();
        assert_eq!(
            script,
            ChartRequest::Script { script: "plt.plot([1,2,3])".to_string() }
        );
    }

    #[test]
    fn test_render_request_from_script() {
        let request = ChartRequest::Script { script: "plt.plot([1,2,3])".to_string() };
        let chart = render_request(&request).unwrap();
        assert!(!chart.png.is_empty());
    }

    #[test]
    fn test_save_png_creates_directory() {
        let dir = std::env::temp_dir().join(format!("alt-history-charts-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("chart.png");
        let request = ChartRequest::Script {
            script: "plt.bar(['1812', '1813'], [600, 100])".to_string(),
        };

        save_png(&request, &path).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written[..8], PNG_MAGIC);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_pad_handles_flat_ranges() {
        assert_eq!(pad(5.0, 5.0).unwrap(), (4.0, 6.0));
        assert_eq!(pad(f64::INFINITY, f64::NEG_INFINITY).unwrap(), (0.0, 1.0));
        assert_eq!(format_number(1812.0), "1812");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_pad_rejects_overflowing_span() {
        assert!(matches!(pad(-1e308, 1e308), Err(AppError::Chart(_))));
        assert!(matches!(pad(0.0, f64::MAX), Err(AppError::Chart(_))));
    }

    #[test]
    fn test_huge_values_fail_instead_of_hanging() {
        let request = ChartRequest::Script { script: "plt.plot([-1e308, 1e308])".into() };
        let err = render_request(&request).unwrap_err();
        assert!(matches!(err, AppError::Chart(_)));
        assert!(err.to_string().contains("beyond"));

        assert!(render(&line_spec(vec![-1e14, 1e14])).is_ok());
    }
}
