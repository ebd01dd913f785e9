//! Time-based node animations.
//!
//! Sampling is a pure function of the clock: a task never mutates itself
//! while running, so the same `now_ms` always yields the same frame.

use std::collections::BTreeMap;

use crate::document::NodeId;
use crate::render::{Frames, NodeFrame};

/// Duration of collapse/expand and fit transitions.
pub const ANIMATION_DURATION_MS: u64 = 300;

/// Easing function mapping linear progress in `[0, 1]` to eased progress.
pub type EasingFn = fn(f32) -> f32;

/// Constant velocity.
#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Cubic ease-in-out.
#[inline]
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Linear progress of an interval starting at `start_ms`.
pub fn progress(start_ms: u64, duration_ms: u64, now_ms: u64) -> f32 {
    if duration_ms == 0 {
        return 1.0;
    }
    let elapsed = now_ms.saturating_sub(start_ms);
    (elapsed as f32 / duration_ms as f32).min(1.0)
}

/// Interpolation of one node between two frames.
#[derive(Debug, Clone, Copy)]
pub struct AnimationTask {
    pub node: NodeId,
    pub start_ms: u64,
    pub duration_ms: u64,
    pub from: NodeFrame,
    pub to: NodeFrame,
    pub easing: EasingFn,
}

impl AnimationTask {
    pub fn new(node: NodeId, start_ms: u64, from: NodeFrame, to: NodeFrame) -> Self {
        Self {
            node,
            start_ms,
            duration_ms: ANIMATION_DURATION_MS,
            from,
            to,
            easing: ease_in_out_cubic,
        }
    }

    pub fn progress(&self, now_ms: u64) -> f32 {
        progress(self.start_ms, self.duration_ms, now_ms)
    }

    pub fn sample(&self, now_ms: u64) -> NodeFrame {
        self.from.lerp(&self.to, (self.easing)(self.progress(now_ms)))
    }

    pub const fn end_ms(&self) -> u64 {
        self.start_ms.saturating_add(self.duration_ms)
    }

    pub const fn is_finished(&self, now_ms: u64) -> bool {
        now_ms >= self.end_ms()
    }
}

/// In-flight tasks, at most one per node.
#[derive(Debug, Clone, Default)]
pub struct AnimationRegistry {
    tasks: BTreeMap<NodeId, AnimationTask>,
}

impl AnimationRegistry {
    /// Start a task, replacing (and returning) any task on the same node.
    pub fn start(&mut self, task: AnimationTask) -> Option<AnimationTask> {
        self.tasks.insert(task.node, task)
    }

    pub fn cancel(&mut self, node: NodeId) -> Option<AnimationTask> {
        self.tasks.remove(&node)
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn get(&self, node: NodeId) -> Option<&AnimationTask> {
        self.tasks.get(&node)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Overlay every task's current frame onto `frames`.
    ///
    /// Animated nodes missing from `frames` (disappearing ones) are added.
    pub fn overlay(&self, frames: &mut Frames, now_ms: u64) {
        for (id, task) in &self.tasks {
            frames.insert(*id, task.sample(now_ms));
        }
    }

    /// Drop finished tasks and return how many were retired.
    pub fn retire_finished(&mut self, now_ms: u64) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| !task.is_finished(now_ms));
        before - self.tasks.len()
    }
}
