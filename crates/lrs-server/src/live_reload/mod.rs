//! Live reload: protocol, client registry, broadcast and file watching.

mod broadcaster;
mod debouncer;
mod protocol;
mod registry;
mod watcher;
mod websocket;

pub(crate) use broadcaster::{ReloadBroadcaster, ReloadEvent};
pub(crate) use registry::ClientRegistry;
pub(crate) use watcher::FileWatcher;
pub(crate) use websocket::ws_handler;

#[cfg(test)]
pub(crate) use protocol::ServerMessage;
#[cfg(test)]
pub(crate) use registry::Outbound;
