use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, Message, Model};
use crate::ui::{CELL_HEIGHT_PX, CELL_WIDTH_PX};

use super::event_loop::ResizeDebouncer;

/// Screen px moved by one pan key press.
const PAN_STEP_PX: f32 = 40.0;

impl App {
    pub(super) fn handle_event(
        &self,
        event: Event,
        model: &Model,
        now_ms: u64,
        resize_debouncer: &mut ResizeDebouncer,
    ) -> Option<Message> {
        match event {
            Event::Key(key) => self.handle_key(key, model),
            Event::Mouse(mouse) => self.handle_mouse(mouse, model),
            Event::Resize(w, h) => {
                crate::perf::log_event("event.resize.queue", format!("width={w} height={h}"));
                resize_debouncer.queue(w, h, now_ms);
                None
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(&self, key: KeyEvent, model: &Model) -> Option<Message> {
        if model.help_visible {
            return match key.code {
                KeyCode::Char('q') => Some(Message::Quit),
                _ => Some(Message::ToggleHelp),
            };
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Message::Quit)
            }
            KeyCode::Char('q') => Some(Message::Quit),

            // Pan: the content follows the arrow
            KeyCode::Left | KeyCode::Char('h') => Some(Message::Pan(PAN_STEP_PX, 0.0)),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::Pan(-PAN_STEP_PX, 0.0)),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::Pan(0.0, PAN_STEP_PX)),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::Pan(0.0, -PAN_STEP_PX)),

            // Zoom
            KeyCode::Char('+' | '=') => Some(Message::ZoomIn),
            KeyCode::Char('-' | '_') => Some(Message::ZoomOut),
            KeyCode::Char('f' | '0') => Some(Message::FitView),

            // Tree
            KeyCode::Char('c') => Some(Message::CollapseToMainBranches),
            KeyCode::Char('e') => Some(Message::ExpandAll),
            KeyCode::Char(' ') | KeyCode::Enter => Some(Message::Toggle(model.tree.root())),

            // File
            KeyCode::Char('r') => Some(Message::ForceReload),
            KeyCode::Char('w') => Some(Message::ToggleWatch),

            KeyCode::Char('?') | KeyCode::F(1) => Some(Message::ToggleHelp),
            _ => None,
        }
    }

    pub(super) fn handle_mouse(&self, mouse: MouseEvent, model: &Model) -> Option<Message> {
        if model.help_visible {
            return None;
        }
        let (x, y) = cell_to_px(mouse.column, mouse.row);
        // The status bar sits below the canvas.
        let on_canvas = y < model.viewport.1;

        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if on_canvas => {
                Some(Message::PointerDown { x, y })
            }
            MouseEventKind::Drag(MouseButton::Left) => Some(Message::PointerMove { x, y }),
            MouseEventKind::Up(MouseButton::Left) => Some(Message::PointerUp { x, y }),
            MouseEventKind::ScrollUp if on_canvas => Some(Message::Wheel { delta_y: -1.0, x, y }),
            MouseEventKind::ScrollDown if on_canvas => Some(Message::Wheel { delta_y: 1.0, x, y }),
            _ => None,
        }
    }
}

/// Centre of a terminal cell in canvas px.
fn cell_to_px(column: u16, row: u16) -> (f32, f32) {
    (
        (f32::from(column) + 0.5) * CELL_WIDTH_PX,
        (f32::from(row) + 0.5) * CELL_HEIGHT_PX,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_to_px_uses_cell_centre() {
        assert_eq!(cell_to_px(0, 0), (CELL_WIDTH_PX / 2.0, CELL_HEIGHT_PX / 2.0));
        assert_eq!(
            cell_to_px(2, 1),
            (2.5 * CELL_WIDTH_PX, 1.5 * CELL_HEIGHT_PX)
        );
    }
}
