use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph};

use crate::app::Model;

pub fn render_help_overlay(model: &Model, frame: &mut Frame, area: Rect) {
    let global_cfg = model
        .config_global_path
        .as_ref()
        .map_or_else(|| "<unknown>".to_string(), |p| p.display().to_string());
    let local_cfg = model
        .config_local_path
        .as_ref()
        .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());

    let section_style = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let dim_style = Style::default().fg(Color::Indexed(245));

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::styled("View", section_style));
    lines.push(Line::raw("  Arrows / h j k l    Pan"));
    lines.push(Line::raw("  Mouse drag          Pan"));
    lines.push(Line::raw("  + / - / wheel       Zoom"));
    lines.push(Line::raw("  f / 0               Fit visible tree"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Tree", section_style));
    lines.push(Line::raw("  Click node          Collapse / expand"));
    lines.push(Line::raw("  Space / Enter       Collapse / expand root"));
    lines.push(Line::raw("  c                   Collapse to main branches"));
    lines.push(Line::raw("  e                   Expand all"));
    lines.push(Line::raw(""));

    lines.push(Line::styled("Other", section_style));
    lines.push(Line::raw("  w                   Toggle watch"));
    lines.push(Line::raw("  r                   Reload file"));
    lines.push(Line::raw("  q / Ctrl-c          Quit"));
    lines.push(Line::raw("  ? / F1              Toggle help"));
    lines.push(Line::raw(""));

    if !model.warnings.is_empty() {
        lines.push(Line::styled("Warnings", section_style));
        for warning in model.warnings.iter().take(5) {
            lines.push(Line::styled(format!("  {warning}"), dim_style));
        }
        if model.warnings.len() > 5 {
            lines.push(Line::styled(
                format!("  ... and {} more", model.warnings.len() - 5),
                dim_style,
            ));
        }
        lines.push(Line::raw(""));
    }

    lines.push(Line::styled("Config", section_style));
    lines.push(Line::raw(format!("  Global: {global_cfg}")));
    lines.push(Line::raw(format!("  Local override: {local_cfg}")));
    lines.push(Line::raw(""));
    lines.push(Line::styled("Any key closes", dim_style));

    // border(1) + padding(1) on each side
    #[allow(clippy::cast_possible_truncation)]
    let popup_height = (lines.len() as u16).saturating_add(4);
    let popup_width = area.width.saturating_sub(12).max(48);
    let popup = centered_popup_rect(popup_width, popup_height, area);

    let block = Block::default()
        .title("Help")
        .borders(Borders::ALL)
        .padding(Padding::uniform(1))
        .style(Style::default().bg(Color::Black).fg(Color::White));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn centered_popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w) / 2);
    let y = area.y + (area.height.saturating_sub(h) / 2);
    Rect::new(x, y, w, h)
}
