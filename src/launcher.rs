//! Launcher: one-shot "start selecting" action for the foreground tab.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::channel::ChannelError;
use crate::config::Settings;
use crate::protocol::{ExtensionMessage, QualitySettings, StartSelectionPayload};
use crate::selection::ContentEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(pub u32);

/// Tab lookup and delivery, as provided by the host browser.
pub trait TabDirectory {
    fn active_tab(&self) -> Option<TabId>;
    fn send_to_tab(&self, tab: TabId, message: ExtensionMessage) -> Result<(), ChannelError>;
}

/// In-process tab table: each tab is the event queue of its page runtime.
#[derive(Default)]
pub struct TabRegistry {
    tabs: HashMap<TabId, mpsc::UnboundedSender<ContentEvent>>,
    active: Option<TabId>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tab: TabId, events: mpsc::UnboundedSender<ContentEvent>) {
        self.tabs.insert(tab, events);
    }

    pub fn activate(&mut self, tab: TabId) {
        self.active = Some(tab);
    }

    pub fn close(&mut self, tab: TabId) {
        self.tabs.remove(&tab);
        if self.active == Some(tab) {
            self.active = None;
        }
    }
}

impl TabDirectory for TabRegistry {
    fn active_tab(&self) -> Option<TabId> {
        self.active.filter(|tab| self.tabs.contains_key(tab))
    }

    fn send_to_tab(&self, tab: TabId, message: ExtensionMessage) -> Result<(), ChannelError> {
        let events = self.tabs.get(&tab).ok_or(ChannelError::Unreachable)?;
        events
            .send(ContentEvent::Extension(message))
            .map_err(|_| ChannelError::Unreachable)
    }
}

pub struct Launcher<D> {
    directory: D,
    quality: QualitySettings,
}

impl<D: TabDirectory> Launcher<D> {
    pub fn new(directory: D, settings: &Settings) -> Self {
        Self {
            directory,
            quality: settings.launcher_quality,
        }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Tell the active tab to start a selection session.
    pub fn launch(&self) -> Result<TabId, LaunchError> {
        let tab = self.directory.active_tab().ok_or(LaunchError::NoActiveTab)?;

        self.directory.send_to_tab(
            tab,
            ExtensionMessage::StartSelection {
                message: Some(StartSelectionPayload::from_settings(self.quality)),
            },
        )?;

        log::info!("[LAUNCHER] Selection started in tab {}", tab.0);
        Ok(tab)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("No active tab to start a selection in")]
    NoActiveTab,

    #[error(transparent)]
    Channel(#[from] ChannelError),
}
