use std::collections::BTreeMap;

use super::{ConnectorId, ConnectorVisual, NodeVisual, RenderError, Surface};
use crate::app::ViewState;
use crate::document::NodeId;

/// In-memory retained surface.
///
/// Holds whatever the renderer last pushed; the terminal UI paints from
/// it. Detaching models a torn-down host.
#[derive(Debug, Clone, Default)]
pub struct RetainedScene {
    nodes: BTreeMap<NodeId, NodeVisual>,
    connectors: BTreeMap<ConnectorId, ConnectorVisual>,
    view: ViewState,
    detached: bool,
    operations: usize,
}

impl RetainedScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn detach(&mut self) {
        self.detached = true;
    }

    pub const fn attach(&mut self) {
        self.detached = false;
    }

    pub const fn is_detached(&self) -> bool {
        self.detached
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeVisual> {
        self.nodes.get(&id)
    }

    /// Nodes in id order (document order).
    pub fn nodes(&self) -> impl Iterator<Item = &NodeVisual> {
        self.nodes.values()
    }

    pub fn connectors(&self) -> impl Iterator<Item = &ConnectorVisual> {
        self.connectors.values()
    }

    pub const fn view(&self) -> ViewState {
        self.view
    }

    /// Total number of surface calls applied so far.
    pub const fn operations(&self) -> usize {
        self.operations
    }

    fn check(&mut self) -> Result<(), RenderError> {
        if self.detached {
            return Err(RenderError::SurfaceDetached);
        }
        self.operations += 1;
        Ok(())
    }
}

impl Surface for RetainedScene {
    fn upsert_node(&mut self, node: &NodeVisual) -> Result<(), RenderError> {
        self.check()?;
        self.nodes.insert(node.id, node.clone());
        Ok(())
    }

    fn remove_node(&mut self, id: NodeId) -> Result<(), RenderError> {
        self.check()?;
        self.nodes.remove(&id);
        Ok(())
    }

    fn upsert_connector(&mut self, connector: &ConnectorVisual) -> Result<(), RenderError> {
        self.check()?;
        self.connectors.insert(connector.id, connector.clone());
        Ok(())
    }

    fn remove_connector(&mut self, id: ConnectorId) -> Result<(), RenderError> {
        self.check()?;
        self.connectors.remove(&id);
        Ok(())
    }

    fn set_view(&mut self, view: ViewState) -> Result<(), RenderError> {
        self.check()?;
        self.view = view;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        self.check()?;
        self.nodes.clear();
        self.connectors.clear();
        Ok(())
    }
}
