use ratatui::prelude::*;
use ratatui::symbols::Marker;
use ratatui::widgets::canvas::{Canvas, Context, Line as CanvasLine, Rectangle};
use unicode_width::UnicodeWidthChar;

use crate::app::{Model, ViewState};
use crate::layout::{LayoutConfig, Point};
use crate::render::{Affordance, ConnectorVisual, NodeVisual};

use super::style::{Palette, branch_style_color, label_style};
use super::{CELL_HEIGHT_PX, CELL_WIDTH_PX, STATUS_ROWS, overlays, status};

/// Below this opacity a node is not drawn at all.
const MIN_VISIBLE_OPACITY: f32 = 0.15;
/// Segments used to approximate each connector curve.
const CONNECTOR_SEGMENTS: usize = 12;

/// Area of the mind map canvas within the full frame.
pub fn canvas_area(area: Rect) -> Rect {
    Rect::new(
        area.x,
        area.y,
        area.width,
        area.height.saturating_sub(STATUS_ROWS),
    )
}

/// Render the complete UI.
pub fn render(model: &Model, frame: &mut Frame) {
    let area = frame.area();
    let canvas = canvas_area(area);
    let status_area = Rect::new(area.x, canvas.bottom(), area.width, STATUS_ROWS.min(area.height));

    render_canvas(model, frame, canvas);
    if model.active_toast().is_some() {
        status::render_toast_bar(model, frame, status_area);
    } else {
        status::render_status_bar(model, frame, status_area);
    }

    if model.help_visible {
        overlays::render_help_overlay(model, frame, area);
    }
}

/// Maps screen px to canvas coordinates (y grows upward on a canvas).
struct Projection {
    view: ViewState,
    height: f64,
}

impl Projection {
    fn point(&self, world: Point) -> (f64, f64) {
        let screen = self.view.world_to_screen(world);
        (f64::from(screen.x), self.height - f64::from(screen.y))
    }
}

fn render_canvas(model: &Model, frame: &mut Frame, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let width = f64::from(area.width) * f64::from(CELL_WIDTH_PX);
    let height = f64::from(area.height) * f64::from(CELL_HEIGHT_PX);
    let scene = model.scene();
    let projection = Projection {
        view: scene.view(),
        height,
    };
    let palette = Palette::for_theme(model.dark_theme);
    let config = model.layout_config;
    let line_height = model.measure.line_height;

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .background_color(palette.background)
        .x_bounds([0.0, width])
        .y_bounds([0.0, height])
        .paint(|ctx| {
            for connector in scene.connectors() {
                draw_connector(ctx, &projection, connector);
            }
            for node in scene.nodes() {
                draw_node_box(ctx, &projection, node);
            }
            // Text goes on its own layer above the braille strokes.
            ctx.layer();
            for node in scene.nodes() {
                draw_node_label(ctx, &projection, node, &config, line_height, &palette);
            }
        });
    frame.render_widget(canvas, area);
}

fn draw_connector(ctx: &mut Context<'_>, projection: &Projection, connector: &ConnectorVisual) {
    if connector.opacity < MIN_VISIBLE_OPACITY {
        return;
    }
    let color = branch_style_color(connector.branch);
    let points = connector.curve.flatten(CONNECTOR_SEGMENTS);
    for pair in points.windows(2) {
        let (x1, y1) = projection.point(pair[0]);
        let (x2, y2) = projection.point(pair[1]);
        ctx.draw(&CanvasLine::new(x1, y1, x2, y2, color));
    }
}

fn draw_node_box(ctx: &mut Context<'_>, projection: &Projection, node: &NodeVisual) {
    if node.opacity < MIN_VISIBLE_OPACITY {
        return;
    }
    let (left, top) = projection.point(Point::new(node.rect.x, node.rect.y));
    let (right, bottom) = projection.point(Point::new(node.rect.right(), node.rect.bottom()));
    ctx.draw(&Rectangle {
        x: left,
        y: bottom,
        width: right - left,
        height: top - bottom,
        color: branch_style_color(node.branch),
    });
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn draw_node_label(
    ctx: &mut Context<'_>,
    projection: &Projection,
    node: &NodeVisual,
    config: &LayoutConfig,
    line_height: f32,
    palette: &Palette,
) {
    if node.opacity < MIN_VISIBLE_OPACITY {
        return;
    }
    let scale = projection.view.scale;
    // Terminal text does not shrink with the view; skip labels that no
    // longer fit their box.
    if line_height * scale < CELL_HEIGHT_PX * 0.5 {
        return;
    }
    let inner_width = (node.rect.width - 2.0 * config.padding_x) * scale;
    let max_cols = (inner_width / CELL_WIDTH_PX).floor().max(1.0) as usize;
    let style = label_style(palette, node.strong, node.opacity);

    for (index, text) in node.lines.iter().enumerate() {
        let world = Point::new(
            node.rect.x + config.padding_x,
            node.rect.y + config.padding_y + (index as f32 + 0.5) * line_height,
        );
        let (x, y) = projection.point(world);
        ctx.print(x, y, Span::styled(truncate_to_width(text, max_cols), style));
    }

    if let Affordance::Collapsed { hidden } = node.affordance {
        let (x, y) = projection.point(Point::new(node.rect.right(), node.rect.center().y));
        ctx.print(
            x,
            y,
            Span::styled(
                format!("+{hidden}"),
                Style::default()
                    .fg(palette.badge)
                    .add_modifier(Modifier::BOLD),
            ),
        );
    }
}

/// Cut `text` to at most `max_cols` display columns, marking the cut.
fn truncate_to_width(text: &str, max_cols: usize) -> String {
    let mut width = 0;
    let mut out = String::new();
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if width + w > max_cols {
            out.pop();
            out.push('\u{2026}');
            return out;
        }
        width += w;
        out.push(ch);
    }
    out
}
