use crate::types::RawEdge;
use async_trait::async_trait;
use fluidvoice_foundation::error::HotkeyError;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};
use zbus::{Connection, Proxy};

/// Platform shortcut-capture backend. Implementations forward raw edges,
/// leaving debounce/coalesce/tap-hold classification to `ChordStateMachine`.
#[async_trait]
pub trait HotkeyBackend: Send + Sync {
    async fn initialize(&mut self) -> Result<(), HotkeyError>;
    async fn start_listening(self: Box<Self>, edge_tx: Sender<RawEdge>) -> Result<(), HotkeyError>;
    fn name(&self) -> &str;
}

/// XDG Desktop Portal `org.freedesktop.portal.GlobalShortcuts` backend —
/// the only cross-desktop-environment hotkey mechanism on Wayland.
pub struct PortalBackend {
    connection: Option<Arc<Connection>>,
}

impl PortalBackend {
    pub fn new() -> Self {
        Self { connection: None }
    }

    async fn wait_request_response(
        connection: &Connection,
        request_path: &OwnedObjectPath,
        timeout: Duration,
    ) -> Result<(u32, HashMap<String, OwnedValue>), zbus::Error> {
        let req_proxy = Proxy::new(
            connection,
            "org.freedesktop.portal.Desktop",
            request_path.as_str(),
            "org.freedesktop.portal.Request",
        )
        .await?;
        let mut stream = req_proxy.receive_signal("Response").await?;
        let msg = tokio::time::timeout(timeout, futures_util::StreamExt::next(&mut stream))
            .await
            .map_err(|_| {
                zbus::Error::InputOutput(Arc::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "portal request timed out",
                )))
            })?
            .ok_or_else(|| {
                zbus::Error::InputOutput(Arc::new(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "portal request stream ended",
                )))
            })?;
        msg.body().deserialize().map_err(|e| {
            zbus::Error::InputOutput(Arc::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("failed to decode portal response: {e}"),
            )))
        })
    }
}

impl Default for PortalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HotkeyBackend for PortalBackend {
    async fn initialize(&mut self) -> Result<(), HotkeyError> {
        let connection = Connection::session()
            .await
            .map_err(|e| HotkeyError::BackendUnavailable(e.to_string()))?;
        self.connection = Some(Arc::new(connection));
        Ok(())
    }

    async fn start_listening(self: Box<Self>, edge_tx: Sender<RawEdge>) -> Result<(), HotkeyError> {
        let connection = self
            .connection
            .ok_or_else(|| HotkeyError::BackendUnavailable("not initialized".into()))?;

        let portal = Proxy::new(
            &*connection,
            "org.freedesktop.portal.Desktop",
            "/org/freedesktop/portal/desktop",
            "org.freedesktop.portal.GlobalShortcuts",
        )
        .await
        .map_err(|e| HotkeyError::BackendUnavailable(e.to_string()))?;

        let mut options: HashMap<String, Value> = HashMap::new();
        options.insert(
            "handle_token".into(),
            Value::from(format!("fluidvoice_{:x}", std::process::id())),
        );
        let request: OwnedObjectPath = portal
            .call("CreateSession", &(options))
            .await
            .map_err(|e| HotkeyError::RegistrationFailed(e.to_string()))?;
        let (_status, mut results) = Self::wait_request_response(&connection, &request, Duration::from_secs(10))
            .await
            .map_err(|e| HotkeyError::RegistrationFailed(e.to_string()))?;

        let session_handle: OwnedObjectPath = results
            .remove("session_handle")
            .and_then(|v| String::try_from(v).ok())
            .and_then(|s| OwnedObjectPath::try_from(s.as_str()).ok())
            .ok_or_else(|| HotkeyError::RegistrationFailed("missing session_handle".into()))?;

        let mut sc_map: HashMap<String, Value> = HashMap::new();
        sc_map.insert(
            "description".into(),
            Value::from("FluidVoice activation chord"),
        );
        let shortcuts = vec![("fluidvoice_activate".to_string(), sc_map)];
        let mut bind_options: HashMap<String, Value> = HashMap::new();
        bind_options.insert(
            "handle_token".into(),
            Value::from(format!("bind_{:x}", std::process::id())),
        );
        let bind_request: OwnedObjectPath = portal
            .call(
                "BindShortcuts",
                &(session_handle.clone(), shortcuts, "", bind_options),
            )
            .await
            .map_err(|e| HotkeyError::RegistrationFailed(e.to_string()))?;
        Self::wait_request_response(&connection, &bind_request, Duration::from_secs(15))
            .await
            .map_err(|e| HotkeyError::RegistrationFailed(e.to_string()))?;

        let mut activated = portal
            .receive_signal("Activated")
            .await
            .map_err(|e| HotkeyError::RegistrationFailed(e.to_string()))?;
        let mut deactivated = portal
            .receive_signal("Deactivated")
            .await
            .map_err(|e| HotkeyError::RegistrationFailed(e.to_string()))?;

        loop {
            tokio::select! {
                Some(msg) = futures_util::StreamExt::next(&mut activated) => {
                    if let Ok((session_o, id, _ts, _opts)) =
                        msg.body().deserialize::<(OwnedObjectPath, String, u64, HashMap<String, OwnedValue>)>()
                    {
                        if session_o == session_handle && id == "fluidvoice_activate" {
                            let _ = edge_tx.send(RawEdge::Down).await;
                        }
                    }
                }
                Some(msg) = futures_util::StreamExt::next(&mut deactivated) => {
                    if let Ok((session_o, id, _ts, _opts)) =
                        msg.body().deserialize::<(OwnedObjectPath, String, u64, HashMap<String, OwnedValue>)>()
                    {
                        if session_o == session_handle && id == "fluidvoice_activate" {
                            let _ = edge_tx.send(RawEdge::Up).await;
                        }
                    }
                }
                else => {
                    tracing::warn!("GlobalShortcuts signal streams ended");
                    break;
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "xdg-portal"
    }
}

#[cfg(test)]
pub struct MockBackend {
    pub edges: Vec<RawEdge>,
}

#[cfg(test)]
#[async_trait]
impl HotkeyBackend for MockBackend {
    async fn initialize(&mut self) -> Result<(), HotkeyError> {
        Ok(())
    }

    async fn start_listening(self: Box<Self>, edge_tx: Sender<RawEdge>) -> Result<(), HotkeyError> {
        for edge in self.edges {
            let _ = edge_tx.send(edge).await;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
