//! Chart geometry and the ratatui widgets that rasterise it.
//!
//! Layout is computed in logical pixels, with the origin in the top-left
//! corner and y growing downwards, the way a 2D canvas is addressed. The
//! widgets map those pixels onto a Braille canvas, where each terminal cell
//! holds a 2×4 grid of dots; that dot density plays the role of the device
//! pixel ratio, so a bar edge lands on a dot rather than on a whole cell.

use std::f64::consts::PI;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::Span,
    widgets::{
        canvas::{Canvas, Circle, Context, Line as CanvasLine, Points},
        Block, Widget,
    },
};

use crate::{
    comps::SearchResults,
    format::currency_short,
    loan::AmortizationRow,
    schedule::{aggregate, PeriodRow, ViewMode},
};

/// Logical pixels covered by one terminal cell.
pub const CELL_WIDTH_PX: f64 = 8.0;
pub const CELL_HEIGHT_PX: f64 = 16.0;

/// Braille dots per cell, horizontally and vertically.
pub const DOTS_PER_CELL: (u16, u16) = (2, 4);

pub const PRINCIPAL_COLOR: Color = Color::Rgb(99, 102, 241);
pub const INTEREST_COLOR: Color = Color::Rgb(34, 197, 94);
pub const REHAB_COLOR: Color = Color::Rgb(245, 158, 11);
pub const AXIS_COLOR: Color = Color::Rgb(107, 114, 128);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Raster dots per logical pixel.
    pub scale: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, scale: f64) -> Self {
        Self { width, height, scale }
    }

    pub fn for_area(area: Rect) -> Self {
        Self {
            width: area.width as f64 * CELL_WIDTH_PX,
            height: area.height as f64 * CELL_HEIGHT_PX,
            scale: DOTS_PER_CELL.0 as f64 / CELL_WIDTH_PX,
        }
    }

    /// Logical width of one raster dot.
    pub fn dot(&self) -> f64 {
        1.0 / self.scale
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Insets {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

pub const BAR_CHART_INSETS: Insets = Insets { top: 20.0, right: 20.0, bottom: 40.0, left: 60.0 };

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackedBar {
    pub label: String,
    pub interest: PixelRect,
    pub principal: PixelRect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisTick {
    pub y: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarLayout {
    pub plot: PixelRect,
    pub max_value: f64,
    pub bars: Vec<StackedBar>,
    pub ticks: Vec<AxisTick>,
}

/// Complete years only; a short trailing year would read as a dip.
pub fn chart_years(schedule: &[AmortizationRow]) -> Vec<PeriodRow> {
    aggregate(schedule, ViewMode::Yearly)
        .into_iter()
        .filter(|year| year.months == 12)
        .collect()
}

/// Stacked principal-over-interest bars, one per period.
pub fn layout_bars(periods: &[PeriodRow], viewport: Viewport) -> Option<BarLayout> {
    let pad = BAR_CHART_INSETS;
    let plot = PixelRect {
        x: pad.left,
        y: pad.top,
        width: viewport.width - pad.left - pad.right,
        height: viewport.height - pad.top - pad.bottom,
    };
    if periods.is_empty() || plot.width <= 0.0 || plot.height <= 0.0 {
        return None;
    }

    let max_value = periods
        .iter()
        .map(|p| p.principal + p.interest)
        .fold(0.0_f64, f64::max);
    if max_value <= 0.0 {
        return None;
    }

    let slot = plot.width / periods.len() as f64;
    let bar_width = slot * 0.7;
    let gap = slot * 0.3;
    let baseline = plot.y + plot.height;

    let bars = periods
        .iter()
        .enumerate()
        .map(|(i, period)| {
            let x = plot.x + i as f64 * (bar_width + gap) + gap / 2.0;
            let interest_height = period.interest / max_value * plot.height;
            let principal_height = period.principal / max_value * plot.height;
            StackedBar {
                label: format!("Y{}", period.period),
                interest: PixelRect {
                    x,
                    y: baseline - interest_height,
                    width: bar_width,
                    height: interest_height,
                },
                principal: PixelRect {
                    x,
                    y: baseline - interest_height - principal_height,
                    width: bar_width,
                    height: principal_height,
                },
            }
        })
        .collect();

    let ticks = (0..=4)
        .map(|i| AxisTick {
            y: baseline - plot.height / 4.0 * i as f64,
            label: currency_short(max_value / 4.0 * i as f64),
        })
        .collect();

    Some(BarLayout { plot, max_value, bars, ticks })
}

#[derive(Debug, Clone, PartialEq)]
pub struct DonutSlice {
    pub label: &'static str,
    pub value: f64,
    pub color: Color,
    /// Radians, clockwise from the positive x axis in screen space.
    pub start_angle: f64,
    pub sweep: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DonutLayout {
    pub center: (f64, f64),
    pub radius: f64,
    pub inner_radius: f64,
    pub total: f64,
    pub slices: Vec<DonutSlice>,
}

impl DonutLayout {
    /// Index of the slice under a screen point, if the point lies on the ring.
    pub fn slice_index_at(&self, x: f64, y: f64) -> Option<usize> {
        let (dx, dy) = (x - self.center.0, y - self.center.1);
        let r = dx.hypot(dy);
        if r < self.inner_radius || r > self.radius || self.slices.is_empty() {
            return None;
        }
        let offset = (dy.atan2(dx) + PI / 2.0).rem_euclid(2.0 * PI);
        let mut covered = 0.0;
        for (i, slice) in self.slices.iter().enumerate() {
            covered += slice.sweep;
            if offset <= covered {
                return Some(i);
            }
        }
        Some(self.slices.len() - 1)
    }
}

/// Ring chart starting at twelve o'clock; zero-valued segments are dropped.
pub fn layout_donut(
    segments: &[(&'static str, f64, Color)],
    viewport: Viewport,
) -> Option<DonutLayout> {
    let total: f64 = segments.iter().map(|(_, v, _)| v.max(0.0)).sum();
    let radius = viewport.width.min(viewport.height) / 2.0 - 20.0;
    if total <= 0.0 || radius <= 0.0 {
        return None;
    }

    let mut start_angle = -PI / 2.0;
    let slices = segments
        .iter()
        .filter(|(_, value, _)| *value > 0.0)
        .map(|&(label, value, color)| {
            let sweep = value / total * 2.0 * PI;
            let slice = DonutSlice { label, value, color, start_angle, sweep };
            start_angle += sweep;
            slice
        })
        .collect();

    Some(DonutLayout {
        center: (viewport.width / 2.0, viewport.height / 2.0),
        radius,
        inner_radius: radius * 0.6,
        total,
        slices,
    })
}

/// Canvas y axis points up; layout y points down.
fn flip(viewport: &Viewport, y: f64) -> f64 {
    viewport.height - y
}

fn fill_rect(ctx: &mut Context<'_>, viewport: &Viewport, rect: &PixelRect, color: Color) {
    if rect.width <= 0.0 || rect.height <= 0.0 {
        return;
    }
    let step = viewport.dot();
    let mut x = rect.x;
    while x < rect.x + rect.width {
        ctx.draw(&CanvasLine {
            x1: x,
            y1: flip(viewport, rect.y),
            x2: x,
            y2: flip(viewport, rect.y + rect.height),
            color,
        });
        x += step;
    }
}

/// Yearly principal/interest bars for a schedule.
pub struct ScheduleChart<'a> {
    periods: &'a [PeriodRow],
    block: Option<Block<'a>>,
}

impl<'a> ScheduleChart<'a> {
    pub fn new(periods: &'a [PeriodRow]) -> Self {
        Self { periods, block: None }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for ScheduleChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        let viewport = Viewport::for_area(inner);
        let Some(layout) = layout_bars(self.periods, viewport) else {
            return;
        };

        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([0.0, viewport.width])
            .y_bounds([0.0, viewport.height])
            .paint(|ctx| {
                for bar in &layout.bars {
                    fill_rect(ctx, &viewport, &bar.interest, INTEREST_COLOR);
                    fill_rect(ctx, &viewport, &bar.principal, PRINCIPAL_COLOR);
                }
                ctx.layer();
                let axis = Style::default().fg(AXIS_COLOR);
                for tick in &layout.ticks {
                    let width = tick.label.len() as f64 * CELL_WIDTH_PX;
                    ctx.print(
                        (layout.plot.x - 5.0 - width).max(0.0),
                        flip(&viewport, tick.y),
                        Span::styled(tick.label.clone(), axis),
                    );
                }
                // Thin out x labels so they never overlap.
                let label_px = 4.0 * CELL_WIDTH_PX;
                let slot = layout.plot.width / layout.bars.len() as f64;
                let every = (label_px / slot).ceil().max(1.0) as usize;
                for bar in layout.bars.iter().step_by(every) {
                    let center = bar.interest.x + bar.interest.width / 2.0;
                    let half = bar.label.len() as f64 * CELL_WIDTH_PX / 2.0;
                    ctx.print(
                        (center - half).max(0.0),
                        10.0,
                        Span::styled(bar.label.clone(), axis),
                    );
                }
            })
            .render(inner, buf);
    }
}

/// Ring chart of how the invested cash splits up, with the total in the hole.
pub struct DonutChart<'a> {
    segments: &'a [(&'static str, f64, Color)],
    caption: String,
    block: Option<Block<'a>>,
}

impl<'a> DonutChart<'a> {
    pub fn new(segments: &'a [(&'static str, f64, Color)], caption: String) -> Self {
        Self { segments, caption, block: None }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for DonutChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        let viewport = Viewport::for_area(inner);
        let Some(layout) = layout_donut(self.segments, viewport) else {
            return;
        };

        // Sample every raster dot once and bucket it by slice.
        let step = viewport.dot();
        let mut buckets: Vec<Vec<(f64, f64)>> = vec![Vec::new(); layout.slices.len()];
        let mut y = step / 2.0;
        while y < viewport.height {
            let mut x = step / 2.0;
            while x < viewport.width {
                if let Some(i) = layout.slice_index_at(x, y) {
                    buckets[i].push((x, flip(&viewport, y)));
                }
                x += step;
            }
            y += step;
        }

        let caption = self.caption;
        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([0.0, viewport.width])
            .y_bounds([0.0, viewport.height])
            .paint(|ctx| {
                for (slice, coords) in layout.slices.iter().zip(&buckets) {
                    ctx.draw(&Points { coords: coords.as_slice(), color: slice.color });
                }
                ctx.layer();
                let (cx, cy) = layout.center;
                let title = "Total Investment";
                ctx.print(
                    cx - title.len() as f64 * CELL_WIDTH_PX / 2.0,
                    flip(&viewport, cy - 8.0),
                    Span::raw(title),
                );
                ctx.print(
                    cx - caption.len() as f64 * CELL_WIDTH_PX / 2.0,
                    flip(&viewport, cy + 14.0),
                    Span::raw(caption.clone()),
                );
            })
            .render(inner, buf);
    }
}

/// Miles per degree of latitude.
const MILES_PER_DEGREE: f64 = 69.0;

/// Offsets in miles east/north of the subject property.
pub fn local_miles(origin: (f64, f64), point: (f64, f64)) -> (f64, f64) {
    let (lat0, lng0) = origin;
    let (lat, lng) = point;
    let east = (lng - lng0) * MILES_PER_DEGREE * lat0.to_radians().cos();
    let north = (lat - lat0) * MILES_PER_DEGREE;
    (east, north)
}

/// Subject property, numbered comparables and the search radius, plotted
/// in miles around the subject.
pub struct LocationPlot<'a> {
    results: &'a SearchResults,
    block: Option<Block<'a>>,
}

impl<'a> LocationPlot<'a> {
    pub fn new(results: &'a SearchResults) -> Self {
        Self { results, block: None }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for LocationPlot<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        let subject = &self.results.subject;
        let origin = (subject.lat, subject.lng);
        let points: Vec<(f64, f64)> = self
            .results
            .comparables
            .iter()
            .map(|c| local_miles(origin, (c.lat, c.lng)))
            .collect();

        let reach = points
            .iter()
            .map(|(x, y)| x.abs().max(y.abs()))
            .fold(self.results.radius, f64::max)
            * 1.15;
        let half_height = reach.max(0.1);
        // Braille dots are square, so match the x span to the cell aspect.
        let dots_w = inner.width as f64 * DOTS_PER_CELL.0 as f64;
        let dots_h = inner.height as f64 * DOTS_PER_CELL.1 as f64;
        let half_width = half_height * dots_w / dots_h;

        let radius = self.results.radius;
        Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([-half_width, half_width])
            .y_bounds([-half_height, half_height])
            .paint(|ctx| {
                ctx.draw(&Circle { x: 0.0, y: 0.0, radius, color: PRINCIPAL_COLOR });
                ctx.layer();
                for (i, (x, y)) in points.iter().enumerate() {
                    ctx.print(*x, *y, Span::styled((i + 1).to_string(), Style::default().fg(INTEREST_COLOR)));
                }
                ctx.print(0.0, 0.0, Span::styled("◆ You", Style::default().fg(Color::Cyan)));
            })
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loan::generate_schedule;

    fn viewport() -> Viewport {
        Viewport::new(680.0, 340.0, 0.25)
    }

    #[test]
    fn bars_fill_the_plot_area() {
        let schedule = generate_schedule(36_000.0, 0.0, 1000.0, 0.0);
        let years = chart_years(&schedule);
        let layout = layout_bars(&years, viewport()).unwrap();

        assert_eq!(layout.bars.len(), 3);
        assert_eq!(layout.plot.width, 600.0);
        assert_eq!(layout.plot.height, 280.0);
        let first = &layout.bars[0];
        assert!((first.interest.x - 90.0).abs() < 1e-9);
        assert!((first.interest.width - 140.0).abs() < 1e-9);
        // All principal, no interest: the principal bar spans the plot.
        assert_eq!(first.interest.height, 0.0);
        assert!((first.principal.y - 20.0).abs() < 1e-9);
        assert_eq!(first.label, "Y1");
    }

    #[test]
    fn ticks_span_zero_to_max() {
        let schedule = generate_schedule(24_000.0, 0.0, 1000.0, 0.0);
        let layout = layout_bars(&chart_years(&schedule), viewport()).unwrap();
        let labels: Vec<&str> = layout.ticks.iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, ["$0", "$3K", "$6K", "$9K", "$12K"]);
        assert_eq!(layout.ticks[0].y, 300.0);
        assert_eq!(layout.ticks[4].y, 20.0);
    }

    #[test]
    fn partial_years_are_not_charted() {
        let schedule = generate_schedule(18_000.0, 0.0, 1000.0, 0.0);
        assert_eq!(chart_years(&schedule).len(), 1);
        assert!(layout_bars(&[], viewport()).is_none());
    }

    #[test]
    fn donut_drops_empty_segments_and_starts_at_top() {
        let segments = [
            ("Down Payment", 60_000.0, PRINCIPAL_COLOR),
            ("Closing Costs", 0.0, INTEREST_COLOR),
            ("Rehab Costs", 20_000.0, REHAB_COLOR),
        ];
        let layout = layout_donut(&segments, Viewport::new(400.0, 300.0, 0.25)).unwrap();
        assert_eq!(layout.slices.len(), 2);
        assert_eq!(layout.radius, 130.0);
        assert!((layout.inner_radius - 78.0).abs() < 1e-9);
        assert!((layout.slices[0].start_angle + PI / 2.0).abs() < 1e-12);
        assert!((layout.slices[0].sweep - 1.5 * PI).abs() < 1e-12);

        // Straight up from the center lands in the first slice,
        // straight left lands in the last quarter.
        let (cx, cy) = layout.center;
        assert_eq!(layout.slice_index_at(cx + 1.0, cy - 100.0), Some(0));
        assert_eq!(layout.slices[1].label, "Rehab Costs");
        assert_eq!(layout.slice_index_at(cx - 100.0, cy - 1.0), Some(1));
        assert!(layout.slice_index_at(cx, cy).is_none());
    }

    #[test]
    fn donut_needs_positive_total() {
        let segments = [("Down Payment", 0.0, PRINCIPAL_COLOR)];
        assert!(layout_donut(&segments, viewport()).is_none());
    }

    #[test]
    fn schedule_chart_draws_into_buffer() {
        let schedule = generate_schedule(120_000.0, 0.005, 1500.0, 0.0);
        let years = chart_years(&schedule);
        let area = Rect::new(0, 0, 60, 20);
        let mut buf = Buffer::empty(area);
        ScheduleChart::new(&years).render(area, &mut buf);

        let painted = buf.content.iter().filter(|cell| cell.symbol() != " ").count();
        assert!(painted > 0);
    }

    #[test]
    fn local_miles_are_zero_at_origin() {
        assert_eq!(local_miles((41.8781, -87.6298), (41.8781, -87.6298)), (0.0, 0.0));
        let (_, north) = local_miles((41.0, -87.0), (41.01, -87.0));
        assert!((north - 0.69).abs() < 1e-9);
    }
}
