//! Method-call dispatch at the collaborator boundary.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use renderer::{open_session, RenderSession, SessionConfig, SourceId};

use crate::platform;
use crate::registry::FrameRegistry;
use crate::requests::CreateSurfaceRequest;

/// Structured outcome of a boundary call.
#[derive(Debug)]
pub enum Response {
    Version(String),
    SurfaceCreated(SourceId),
    NotImplemented { method: String },
}

/// Routes collaborator method calls into the core.
///
/// Sessions opened through the handler stay owned here so `shutdown` can
/// close each one deterministically.
pub struct CommandHandler {
    registry: Arc<FrameRegistry>,
    sessions: Mutex<Vec<RenderSession>>,
}

impl CommandHandler {
    pub fn new(registry: Arc<FrameRegistry>) -> Self {
        Self {
            registry,
            sessions: Mutex::new(Vec::new()),
        }
    }

    /// Dispatches one method call. Unknown methods are reported, not errors.
    pub fn handle(&self, method: &str, args: &serde_json::Value) -> Result<Response> {
        match method {
            "platformVersion" => Ok(Response::Version(platform::platform_version())),
            "createSurface" => {
                let request = CreateSurfaceRequest::from_args(args)?;
                let id = self.create_session(SessionConfig::sized(request.width, request.height))?;
                Ok(Response::SurfaceCreated(id))
            }
            other => {
                tracing::warn!(method = other, "method not implemented");
                Ok(Response::NotImplemented {
                    method: other.to_string(),
                })
            }
        }
    }

    /// Opens a session, registers its frame source, and retains ownership.
    pub fn create_session(&self, config: SessionConfig) -> Result<SourceId> {
        let session = open_session(config, self.registry.as_ref())?;
        let id = session.source_id();
        self.sessions
            .lock()
            .expect("session list lock poisoned")
            .push(session);
        Ok(id)
    }

    /// Closes every session this handler opened, unregistering their sources.
    pub fn shutdown(&self) -> Result<()> {
        let sessions: Vec<RenderSession> = self
            .sessions
            .lock()
            .expect("session list lock poisoned")
            .drain(..)
            .collect();
        for session in sessions {
            let id = session.source_id();
            session.close()?;
            self.registry.unregister(id);
            tracing::info!(%id, "session closed");
        }
        Ok(())
    }
}
