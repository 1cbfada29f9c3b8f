//! Livereload wire protocol and per-connection state machine.
//!
//! Clients speak the official livereload protocol (version 7): JSON text
//! frames carrying a `command` field. Each connection starts `Connected`,
//! becomes `Ready` once its `hello` is acknowledged, and ends `Closed`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only protocol this server speaks.
pub(crate) const SUPPORTED_PROTOCOL: &str = "http://livereload.com/protocols/official-7";

/// Name reported in the `hello` acknowledgement.
pub(crate) const SERVER_NAME: &str = "lrs";

/// A decoded client message.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ProtocolMessage {
    Hello { protocols: Vec<String> },
    Info { url: Option<String> },
    Unknown { command: String },
}

/// Only `command` must be well formed; other fields are taken as they come.
#[derive(Deserialize)]
struct RawMessage {
    command: String,
    #[serde(default)]
    protocols: Value,
    #[serde(default)]
    url: Value,
}

impl ProtocolMessage {
    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// Fails when the frame is not a JSON object with a string `command`.
    pub(crate) fn decode(text: &str) -> Result<Self, serde_json::Error> {
        let raw: RawMessage = serde_json::from_str(text)?;
        Ok(match raw.command.as_str() {
            "hello" => Self::Hello {
                protocols: raw
                    .protocols
                    .as_array()
                    .into_iter()
                    .flatten()
                    .filter_map(|p| p.as_str().map(str::to_owned))
                    .collect(),
            },
            "info" => Self::Info {
                url: match raw.url {
                    Value::Null => None,
                    Value::String(url) => Some(url),
                    other => Some(other.to_string()),
                },
            },
            _ => Self::Unknown {
                command: raw.command,
            },
        })
    }
}

/// A message sent by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub(crate) enum ServerMessage {
    Hello {
        protocols: Vec<String>,
        #[serde(rename = "serverName")]
        server_name: String,
    },
    Reload {
        path: String,
        #[serde(rename = "liveCSS")]
        live_css: bool,
    },
}

impl ServerMessage {
    pub(crate) fn hello() -> Self {
        Self::Hello {
            protocols: vec![SUPPORTED_PROTOCOL.to_owned()],
            server_name: SERVER_NAME.to_owned(),
        }
    }

    pub(crate) fn reload(path: &str) -> Self {
        Self::Reload {
            path: path.to_owned(),
            live_css: true,
        }
    }

    pub(crate) fn to_json(&self) -> String {
        // Plain structs of strings and bools always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Protocol state of one connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ClientState {
    Connected,
    Ready,
    Closed,
}

/// Something that happened on the channel.
#[derive(Debug)]
pub(crate) enum ChannelEvent<'a> {
    /// Text frame from the client.
    Text(&'a str),
    /// Frame type the protocol does not use (binary).
    Unsupported(&'static str),
    /// Broadcast queued for this client.
    Broadcast(ServerMessage),
    /// Transport reported an error.
    Error,
    /// Client closed the channel or went away.
    Close,
    /// Server is shutting down.
    Shutdown,
}

/// What the connection task should do next.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Send(ServerMessage),
    /// Deregister and close the channel.
    Teardown,
}

/// Explicit state machine for one livereload connection.
#[derive(Debug)]
pub(crate) struct ReloadProtocol {
    state: ClientState,
}

impl ReloadProtocol {
    pub(crate) fn new() -> Self {
        Self {
            state: ClientState::Connected,
        }
    }

    pub(crate) fn state(&self) -> ClientState {
        self.state
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state == ClientState::Closed
    }

    /// Apply one event and return the resulting action.
    ///
    /// Every event after `Closed` is a no-op.
    pub(crate) fn handle(&mut self, event: ChannelEvent<'_>) -> Action {
        if self.is_closed() {
            return Action::None;
        }

        match event {
            ChannelEvent::Text(text) => self.on_text(text),
            ChannelEvent::Unsupported(kind) => {
                tracing::warn!(kind, "Unknown livereload message type");
                Action::None
            }
            ChannelEvent::Broadcast(message) => Action::Send(message),
            ChannelEvent::Error | ChannelEvent::Close | ChannelEvent::Shutdown => {
                self.state = ClientState::Closed;
                Action::Teardown
            }
        }
    }

    fn on_text(&mut self, text: &str) -> Action {
        let message = match ProtocolMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(error = %e, data = text, "Received malformed message from livereload client");
                return Action::None;
            }
        };

        match message {
            ProtocolMessage::Hello { protocols } => {
                if !protocols.iter().any(|p| p == SUPPORTED_PROTOCOL) {
                    tracing::debug!(?protocols, "Client did not offer {SUPPORTED_PROTOCOL}");
                }
                self.state = ClientState::Ready;
                Action::Send(ServerMessage::hello())
            }
            ProtocolMessage::Info { url } => {
                tracing::info!(
                    url = url.as_deref().unwrap_or("<no URL data>"),
                    "Browser connected (livereload)"
                );
                Action::None
            }
            ProtocolMessage::Unknown { command } => {
                tracing::warn!(%command, "Received unknown command from livereload client");
                Action::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_hello() {
        let message =
            ProtocolMessage::decode(r#"{"command":"hello","protocols":["a","b"]}"#).unwrap();
        assert_eq!(
            message,
            ProtocolMessage::Hello {
                protocols: vec!["a".to_owned(), "b".to_owned()]
            }
        );
    }

    #[test]
    fn test_decode_info() {
        let message =
            ProtocolMessage::decode(r#"{"command":"info","url":"http://localhost:8000/"}"#)
                .unwrap();
        assert_eq!(
            message,
            ProtocolMessage::Info {
                url: Some("http://localhost:8000/".to_owned())
            }
        );
    }

    #[test]
    fn test_decode_info_with_odd_fields() {
        assert_eq!(
            ProtocolMessage::decode(r#"{"command":"info","url":5}"#).unwrap(),
            ProtocolMessage::Info {
                url: Some("5".to_owned())
            }
        );
        assert_eq!(
            ProtocolMessage::decode(r#"{"command":"info","url":null}"#).unwrap(),
            ProtocolMessage::Info { url: None }
        );
        assert_eq!(
            ProtocolMessage::decode(r#"{"command":"hello","protocols":["a",7],"extra":{}}"#)
                .unwrap(),
            ProtocolMessage::Hello {
                protocols: vec!["a".to_owned()]
            }
        );
    }

    #[test]
    fn test_info_with_numeric_url_is_not_malformed() {
        let mut protocol = ReloadProtocol::new();
        let action = protocol.handle(ChannelEvent::Text(r#"{"command":"info","url":5}"#));
        assert_eq!(action, Action::None);
        assert_eq!(protocol.state(), ClientState::Connected);
        assert!(matches!(
            ProtocolMessage::decode(r#"{"command":"info","url":5}"#),
            Ok(ProtocolMessage::Info { .. })
        ));
    }

    #[test]
    fn test_decode_unknown() {
        let message = ProtocolMessage::decode(r#"{"command":"ping"}"#).unwrap();
        assert_eq!(
            message,
            ProtocolMessage::Unknown {
                command: "ping".to_owned()
            }
        );
    }

    #[test]
    fn test_decode_malformed() {
        assert!(ProtocolMessage::decode("not json").is_err());
        assert!(ProtocolMessage::decode(r#"{"url":"x"}"#).is_err());
    }

    #[test]
    fn test_hello_wire_format() {
        assert_eq!(
            ServerMessage::hello().to_json(),
            r#"{"command":"hello","protocols":["http://livereload.com/protocols/official-7"],"serverName":"lrs"}"#
        );
    }

    #[test]
    fn test_reload_wire_format() {
        assert_eq!(
            ServerMessage::reload("/style.css").to_json(),
            r#"{"command":"reload","path":"/style.css","liveCSS":true}"#
        );
    }

    #[test]
    fn test_hello_moves_to_ready() {
        let mut protocol = ReloadProtocol::new();
        assert_eq!(protocol.state(), ClientState::Connected);

        let action = protocol.handle(ChannelEvent::Text(
            r#"{"command":"hello","protocols":["http://livereload.com/protocols/official-7"]}"#,
        ));

        assert_eq!(action, Action::Send(ServerMessage::hello()));
        assert_eq!(protocol.state(), ClientState::Ready);
    }

    #[test]
    fn test_hello_ack_lists_one_protocol() {
        let ServerMessage::Hello {
            protocols,
            server_name,
        } = ServerMessage::hello()
        else {
            panic!("expected hello");
        };
        assert_eq!(protocols.len(), 1);
        assert!(!server_name.is_empty());
    }

    #[test]
    fn test_info_and_unknown_do_not_change_state() {
        let mut protocol = ReloadProtocol::new();

        let action = protocol.handle(ChannelEvent::Text(r#"{"command":"info","url":"u"}"#));
        assert_eq!(action, Action::None);
        assert_eq!(protocol.state(), ClientState::Connected);

        protocol.handle(ChannelEvent::Text(r#"{"command":"hello"}"#));
        let action = protocol.handle(ChannelEvent::Text(r#"{"command":"bogus"}"#));
        assert_eq!(action, Action::None);
        assert_eq!(protocol.state(), ClientState::Ready);
    }

    #[test]
    fn test_malformed_message_keeps_connection() {
        let mut protocol = ReloadProtocol::new();
        let action = protocol.handle(ChannelEvent::Text("{"));
        assert_eq!(action, Action::None);
        assert!(!protocol.is_closed());
    }

    #[test]
    fn test_broadcast_delivered_before_hello() {
        let mut protocol = ReloadProtocol::new();
        let action = protocol.handle(ChannelEvent::Broadcast(ServerMessage::reload("*")));
        assert_eq!(action, Action::Send(ServerMessage::reload("*")));
    }

    #[test]
    fn test_close_is_terminal() {
        for event in [
            ChannelEvent::Close,
            ChannelEvent::Error,
            ChannelEvent::Shutdown,
        ] {
            let mut protocol = ReloadProtocol::new();
            assert_eq!(protocol.handle(event), Action::Teardown);
            assert!(protocol.is_closed());

            assert_eq!(
                protocol.handle(ChannelEvent::Broadcast(ServerMessage::reload("*"))),
                Action::None
            );
            assert_eq!(protocol.handle(ChannelEvent::Close), Action::None);
            assert_eq!(
                protocol.handle(ChannelEvent::Text(r#"{"command":"hello"}"#)),
                Action::None
            );
        }
    }
}
