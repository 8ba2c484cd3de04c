//! Session lifecycle: negotiation, configuration, tool dispatch, teardown.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::bridge::{ToolBackend, ToolCallRequest, ToolDescriptor};
use crate::error::Result;
use crate::protocol::client_events::ClientEvent;
use crate::protocol::models::{Item, SessionUpdate, Tool, ToolChoiceMode};
use crate::protocol::server_events::ServerEvent;
use crate::transport::{Transport, TransportConnector, TransportEvent};

const DEFAULT_INSTRUCTIONS: &str =
    "You are a helpful voice assistant. Use the available tools whenever they can answer the \
     user's request, and keep spoken replies short.";

/// Where a session is in its lifecycle.
///
/// `Closed` and `Failed` are terminal; a new session means a new controller
/// start from `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Negotiating,
    AwaitingChannelOpen,
    Configured,
    Active,
    Closed,
    Failed,
}

/// Receives the controller's human-readable audit trail.
///
/// Every state change and notable event goes through exactly one notifier,
/// so embedders get a single ordered record of what the session did.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, payload: Option<Value>);
}

/// Default notifier that forwards everything to `tracing` at info level.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, payload: Option<Value>) {
        match payload {
            Some(payload) => tracing::info!(%payload, "{message}"),
            None => tracing::info!("{message}"),
        }
    }
}

/// Drives one realtime session over a [`Transport`], bridging tool calls to
/// a [`ToolBackend`].
pub struct SessionController {
    connector: Box<dyn TransportConnector>,
    backend: Box<dyn ToolBackend>,
    notifier: Arc<dyn Notifier>,
    instructions: String,
    voice: Option<String>,
    state: SessionState,
    catalog: Vec<ToolDescriptor>,
    transport: Option<Box<dyn Transport>>,
}

impl SessionController {
    #[must_use]
    pub fn new(connector: Box<dyn TransportConnector>, backend: Box<dyn ToolBackend>) -> Self {
        Self {
            connector,
            backend,
            notifier: Arc::new(TracingNotifier),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            voice: None,
            state: SessionState::Idle,
            catalog: Vec::new(),
            transport: None,
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Load the tool catalog and open the transport.
    ///
    /// Calling this anywhere but `Idle` is a logged no-op. A catalog load
    /// failure is not fatal: the session continues with no tools. A transport
    /// failure returns the session to `Idle` and surfaces the error.
    ///
    /// # Errors
    /// Propagates transport negotiation failures.
    pub async fn start(&mut self, device_id: Option<&str>, voice: Option<&str>) -> Result<()> {
        if self.state != SessionState::Idle {
            self.notifier.notify(
                "start ignored: session already underway",
                Some(json!({"state": format!("{:?}", self.state)})),
            );
            return Ok(());
        }

        self.voice = voice.map(str::to_owned);
        self.state = SessionState::Negotiating;
        self.notifier.notify("starting session", None);

        match self.backend.catalog().await {
            Ok(catalog) => {
                self.notifier
                    .notify("tool catalog loaded", Some(json!({"count": catalog.len()})));
                self.catalog = catalog;
            }
            Err(err) => {
                self.notifier.notify(
                    "tool catalog unavailable, continuing without tools",
                    Some(json!({"error": err.to_string()})),
                );
                self.catalog = Vec::new();
            }
        }

        match self.connector.open(device_id).await {
            Ok(transport) => {
                self.transport = Some(transport);
                self.state = SessionState::AwaitingChannelOpen;
                self.notifier.notify("negotiation complete, waiting for control channel", None);
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Idle;
                self.notifier
                    .notify("session start failed", Some(json!({"error": err.to_string()})));
                Err(err)
            }
        }
    }

    /// Process transport events until the transport ends, then stop.
    ///
    /// A failure while handling one event is reported through the notifier
    /// and does not end the session; the loop only exits when the transport
    /// does.
    pub async fn run(&mut self) {
        loop {
            let Some(transport) = self.transport.as_mut() else { break };
            let Some(event) = transport.next_event().await else { break };
            if let Err(err) = self.handle_transport_event(event).await {
                self.notifier
                    .notify("event handling failed", Some(json!({"error": err.to_string()})));
            }
            if matches!(self.state, SessionState::Closed | SessionState::Failed) {
                break;
            }
        }
        self.stop().await;
    }

    /// Tear the session down. Idempotent from any state, including before
    /// `start`.
    pub async fn stop(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        if self.state != SessionState::Closed {
            // Failed stays Failed so callers can still distinguish outcomes.
            if self.state != SessionState::Failed {
                self.state = SessionState::Closed;
            }
            self.notifier.notify("session stopped", None);
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) -> Result<()> {
        match event {
            TransportEvent::ChannelOpen => self.configure().await,
            TransportEvent::ChannelError(message) => {
                if self.state == SessionState::Active {
                    self.notifier
                        .notify("control channel error", Some(json!({"error": message})));
                } else {
                    self.state = SessionState::Failed;
                    self.notifier.notify(
                        "control channel failed before session was active",
                        Some(json!({"error": message})),
                    );
                }
                Ok(())
            }
            TransportEvent::IceGatheringComplete => {
                tracing::debug!("ICE gathering complete");
                Ok(())
            }
            TransportEvent::TrackReceived { id } => {
                self.notifier.notify("remote audio attached", Some(json!({"track": id})));
                Ok(())
            }
            TransportEvent::Message(raw) => self.handle_message(&raw).await,
            TransportEvent::Closed => {
                self.state = SessionState::Closed;
                Ok(())
            }
        }
    }

    /// Send the one `session.update` that arms the session, then go active.
    async fn configure(&mut self) -> Result<()> {
        if self.state != SessionState::AwaitingChannelOpen {
            tracing::debug!(state = ?self.state, "ignoring duplicate channel open");
            return Ok(());
        }
        self.state = SessionState::Configured;

        let tools = self
            .catalog
            .iter()
            .map(|descriptor| Tool::Function {
                name: descriptor.name.clone(),
                description: Some(descriptor.description.clone()),
                parameters: descriptor.parameters.clone(),
            })
            .collect();
        let update = ClientEvent::SessionUpdate {
            event_id: None,
            session: Box::new(SessionUpdate {
                voice: self.voice.clone(),
                instructions: Some(self.instructions.clone()),
                tools: Some(tools),
                tool_choice: Some(ToolChoiceMode::Auto),
            }),
        };
        if let Some(transport) = self.transport.as_mut() {
            transport.send(update).await?;
        }

        self.state = SessionState::Active;
        self.notifier
            .notify("session active", Some(json!({"tools": self.catalog.len()})));
        Ok(())
    }

    async fn handle_message(&mut self, raw: &str) -> Result<()> {
        let event: ServerEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(err) => {
                self.notifier.notify(
                    "discarding malformed control message",
                    Some(json!({"error": err.to_string()})),
                );
                return Ok(());
            }
        };

        match event {
            ServerEvent::Error { error, .. } => {
                self.notifier.notify(
                    "remote error",
                    Some(json!({"code": error.code, "message": error.message})),
                );
                Ok(())
            }
            ServerEvent::FunctionCallArgumentsDone { call_id, name, arguments, .. } => {
                self.handle_tool_call(call_id, name, &arguments).await
            }
            ServerEvent::Unknown(value) => {
                tracing::debug!(kind = ?value.get("type"), "unhandled server event");
                Ok(())
            }
        }
    }

    /// Dispatch one tool call and feed the result back, result item first,
    /// `response.create` second.
    async fn handle_tool_call(&mut self, call_id: String, name: String, arguments: &str) -> Result<()> {
        let args = match serde_json::from_str::<Value>(arguments) {
            Ok(args) => Some(args),
            Err(err) => {
                self.notifier.notify(
                    "tool arguments unparsable, substituting empty object",
                    Some(json!({"tool": name, "error": err.to_string()})),
                );
                Some(json!({}))
            }
        };

        let request = ToolCallRequest { name: name.clone(), args, call_id: call_id.clone() };
        match self.backend.call(request).await {
            Ok(result) => {
                let Some(transport) = self.transport.as_mut() else { return Ok(()) };
                if !transport.is_open() {
                    self.notifier.notify(
                        "dropping tool result, control channel closed",
                        Some(json!({"tool": name})),
                    );
                    return Ok(());
                }
                let output = serde_json::to_string(&result.data)?;
                transport
                    .send(ClientEvent::ConversationItemCreate {
                        event_id: None,
                        previous_item_id: None,
                        item: Box::new(Item::FunctionCallOutput {
                            id: None,
                            call_id: result.call_id,
                            output,
                        }),
                    })
                    .await?;
                transport.send(ClientEvent::ResponseCreate { event_id: None }).await?;
                self.notifier
                    .notify("tool call completed", Some(json!({"tool": name, "call_id": call_id})));
                Ok(())
            }
            Err(err) => {
                // No result item on failure; the model is left to continue
                // without one rather than receive a fabricated output.
                self.notifier.notify(
                    "tool call failed",
                    Some(json!({"tool": name, "call_id": call_id, "error": err.to_string()})),
                );
                Ok(())
            }
        }
    }
}
