use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::{App, Message, Model, ToastLevel, update};
use crate::watcher::{FileWatcher, WatchStatus};

/// Poll interval while something is moving (about 60 fps).
const FRAME_INTERVAL_MS: u64 = 16;

pub(super) struct ResizeDebouncer {
    delay_ms: u64,
    pending: Option<(u16, u16, u64)>,
}

impl ResizeDebouncer {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub(super) const fn queue(&mut self, width: u16, height: u16, now_ms: u64) {
        self.pending = Some((width, height, now_ms));
    }

    pub(super) fn take_ready(&mut self, now_ms: u64) -> Option<(u16, u16)> {
        let (width, height, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            Some((width, height))
        } else {
            None
        }
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal initialization fails, the scene
    /// cannot be updated, or the event loop hits an I/O failure.
    pub fn run(&mut self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        let init_scope = crate::perf::scope("app.ratatui_init");
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal: mindmark requires an interactive terminal")?;
        let size = terminal.size()?;
        drop(init_scope);

        let model_scope = crate::perf::scope("app.build_model");
        let mut model = self.build_model(crate::ui::canvas_px(size.width, size.height));
        drop(model_scope);
        crate::perf::log_event(
            "init.layout",
            format!(
                "terminal={}x{} nodes={} visible={} scale={:.3}",
                size.width,
                size.height,
                model.tree.len(),
                model.visible_count(),
                model.view.scale
            ),
        );

        let result = execute!(stdout(), EnableMouseCapture)
            .context("Failed to enable mouse capture")
            .and_then(|()| self.event_loop(&mut terminal, &mut model));

        // Restore terminal
        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();

        result
    }

    fn event_loop(&self, terminal: &mut DefaultTerminal, model: &mut Model) -> Result<()> {
        let start = Instant::now();
        let mut resize_debouncer = ResizeDebouncer::new(100);
        let mut file_watcher = if model.watch_enabled {
            match self.make_file_watcher() {
                Ok(watcher) => Some(watcher),
                Err(err) => {
                    model.watch_enabled = false;
                    model.show_toast(ToastLevel::Warning, format!("Watch unavailable: {err}"));
                    crate::perf::log_event(
                        "watcher.error",
                        format!("failed path={} err={err}", self.file_path.display()),
                    );
                    None
                }
            }
        } else {
            None
        };
        let mut frame_idx: u64 = 0;
        let mut needs_render = true;

        loop {
            let now_ms = elapsed_ms(start);

            if let Some((width, height)) = resize_debouncer.take_ready(now_ms) {
                crate::perf::log_event(
                    "event.resize.apply",
                    format!("frame={frame_idx} width={width} height={height}"),
                );
                let (px_width, px_height) = crate::ui::canvas_px(width, height);
                *model = update(
                    std::mem::take(model),
                    Message::Resize(px_width, px_height),
                );
                needs_render = true;
            }

            if model.watch_enabled
                && file_watcher
                    .as_mut()
                    .is_some_and(|w: &mut FileWatcher| w.poll(Instant::now()) == WatchStatus::Ready)
            {
                *model = update(std::mem::take(model), Message::FileChanged);
                self.handle_message_side_effects(model, &mut file_watcher, &Message::FileChanged);
                needs_render = true;
            }

            // Handle events
            let poll_ms = if needs_render {
                0
            } else if model.is_animating() {
                FRAME_INTERVAL_MS
            } else if resize_debouncer.is_pending() {
                10
            } else {
                250
            };
            if event::poll(Duration::from_millis(poll_ms))? {
                // Refresh timestamp after poll wait so debouncers use accurate times.
                let event_ms = elapsed_ms(start);
                let msg =
                    self.handle_event(event::read()?, model, event_ms, &mut resize_debouncer);
                if let Some(msg) = msg {
                    self.dispatch(model, &mut file_watcher, msg, event_ms, frame_idx);
                    needs_render = true;
                }

                // Coalesce drag and key repeat bursts into a single render.
                let mut drained = 0_u32;
                while event::poll(Duration::from_millis(0))? {
                    let drain_ms = elapsed_ms(start);
                    let msg =
                        self.handle_event(event::read()?, model, drain_ms, &mut resize_debouncer);
                    if let Some(msg) = msg {
                        drained += 1;
                        self.dispatch(model, &mut file_watcher, msg, drain_ms, frame_idx);
                        needs_render = true;
                    }
                }
                if drained > 0 {
                    crate::perf::log_event(
                        "event.drain",
                        format!("frame={frame_idx} drained={drained}"),
                    );
                }
            }

            // Advance the clock; anything still moving needs another frame.
            let was_animating = model.is_animating();
            let had_toast = model.active_toast().is_some();
            *model = update(std::mem::take(model), Message::Tick(elapsed_ms(start)));
            if was_animating || had_toast != model.active_toast().is_some() {
                needs_render = true;
            }

            if needs_render {
                frame_idx += 1;

                let scene_start = Instant::now();
                let stats = model
                    .render_scene()
                    .context("Failed to update the mind map scene")?;
                crate::perf::log_event(
                    "frame.scene",
                    format!(
                        "frame={} scene_ms={:.3} added={} updated={} removed={} unchanged={}",
                        frame_idx,
                        scene_start.elapsed().as_secs_f64() * 1000.0,
                        stats.added,
                        stats.updated,
                        stats.removed,
                        stats.unchanged
                    ),
                );

                let draw_start = Instant::now();
                terminal.draw(|frame| crate::ui::render(model, frame))?;
                crate::perf::log_event(
                    "frame.draw",
                    format!(
                        "frame={} draw_ms={:.3}",
                        frame_idx,
                        draw_start.elapsed().as_secs_f64() * 1000.0
                    ),
                );
                needs_render = false;
            }

            if model.should_quit {
                break;
            }
        }
        Ok(())
    }

    /// Apply an input message at the time it was read.
    ///
    /// The clock is advanced first so animations started by `msg` begin
    /// at `now_ms`, not at the previous frame's tick.
    pub(super) fn dispatch(
        &self,
        model: &mut Model,
        file_watcher: &mut Option<FileWatcher>,
        msg: Message,
        now_ms: u64,
        frame_idx: u64,
    ) {
        crate::perf::log_event("event.message", format!("frame={frame_idx} msg={msg:?}"));
        *model = update(std::mem::take(model), Message::Tick(now_ms));
        let side_msg = msg.clone();
        *model = update(std::mem::take(model), msg);
        self.handle_message_side_effects(model, file_watcher, &side_msg);
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_debouncer_waits_for_quiet_period() {
        let mut debouncer = ResizeDebouncer::new(100);
        assert!(!debouncer.is_pending());
        debouncer.queue(80, 24, 0);
        debouncer.queue(100, 30, 50);
        assert!(debouncer.take_ready(120).is_none());
        assert_eq!(debouncer.take_ready(150), Some((100, 30)));
        assert!(!debouncer.is_pending());
    }
}
