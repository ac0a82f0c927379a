use crate::models::SessionSnapshot;
use crate::traits::{MediaSession, SessionManager};
use anyhow::Result;
use tracing::debug;

/// Resolves which session a command targets.
///
/// Holds the process-wide manager handle obtained by the startup handshake.
/// Nothing is cached: every call asks the platform again.
pub struct SessionGateway {
    manager: Box<dyn SessionManager>,
}

impl SessionGateway {
    pub fn new(manager: Box<dyn SessionManager>) -> Self {
        Self { manager }
    }

    /// Resolve the target session.
    ///
    /// Precedence: current session > first enumerated session > none
    pub async fn resolve_session(&self) -> Result<Option<Box<dyn MediaSession>>> {
        if let Some(session) = self.manager.current_session().await? {
            debug!("Using current session: {}", session.source_app_id());
            return Ok(Some(session));
        }

        let session = self.manager.sessions().await?.into_iter().next();
        match &session {
            Some(s) => debug!("No current session, falling back to {}", s.source_app_id()),
            None => debug!("No media sessions available"),
        }
        Ok(session)
    }

    /// Number of sessions the platform currently enumerates
    pub async fn session_count(&self) -> Result<usize> {
        Ok(self.manager.sessions().await?.len())
    }
}

/// Fetch metadata, playback info and timeline of a session in one go
pub async fn fetch_snapshot(session: &dyn MediaSession) -> Result<SessionSnapshot> {
    let properties = session.media_properties().await?;
    let playback = session.playback_info().await?;
    let timeline = session.timeline().await?;

    debug!(
        "Snapshot of {}: title={}, artist={}, status={}",
        session.source_app_id(),
        properties.title,
        properties.artist,
        playback.status
    );

    Ok(SessionSnapshot {
        properties,
        playback,
        timeline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockManager, MockSession};

    #[tokio::test]
    async fn test_resolve_prefers_current_session() {
        let manager = MockManager::new()
            .with_current(MockSession::new("spotify"))
            .with_session(MockSession::new("firefox"));
        let gateway = SessionGateway::new(Box::new(manager));

        let session = gateway.resolve_session().await.unwrap().unwrap();
        assert_eq!(session.source_app_id(), "spotify");
    }

    #[tokio::test]
    async fn test_resolve_falls_back_to_first_session() {
        let manager = MockManager::new()
            .with_session(MockSession::new("vlc"))
            .with_session(MockSession::new("firefox"));
        let gateway = SessionGateway::new(Box::new(manager));

        let session = gateway.resolve_session().await.unwrap().unwrap();
        assert_eq!(session.source_app_id(), "vlc");
    }

    #[tokio::test]
    async fn test_resolve_none() {
        let gateway = SessionGateway::new(Box::new(MockManager::new()));
        assert!(gateway.resolve_session().await.unwrap().is_none());
        assert_eq!(gateway.session_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_resolve_propagates_manager_error() {
        let manager = MockManager::new().failing("RPC server unavailable");
        let gateway = SessionGateway::new(Box::new(manager));

        let err = gateway.resolve_session().await.err().unwrap();
        assert_eq!(err.to_string(), "RPC server unavailable");
    }

    #[tokio::test]
    async fn test_fetch_snapshot() {
        let session = MockSession::new("spotify").with_track("Time", "Pink Floyd");
        let snapshot = fetch_snapshot(&session).await.unwrap();
        assert_eq!(snapshot.properties.title, "Time");
        assert_eq!(snapshot.properties.artist, "Pink Floyd");
    }
}
