//! Platform media session managers
//!
//! This crate provides the OS side of the bridge, one backend per platform:
//! - Linux: MPRIS via D-Bus
//! - Windows: System Media Transport Controls (SMTC)
//! - macOS: AppleScript (Music.app, Spotify)
//!
//! Each backend implements [`quickmedia_core::SessionManager`].

use anyhow::Result;
use quickmedia_core::SessionManager;
use tracing::info;

// Platform-specific modules
#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "macos")]
mod macos;

/// Perform the one-time handshake with the platform's session manager.
///
/// Fails with [`quickmedia_core::BridgeError::ManagerUnavailable`] when the
/// platform has no usable media subsystem.
pub async fn request_session_manager() -> Result<Box<dyn SessionManager>> {
    #[cfg(target_os = "linux")]
    let manager = linux::MprisManager::request().await?;

    #[cfg(target_os = "windows")]
    let manager = windows::SmtcManager::request().await?;

    #[cfg(target_os = "macos")]
    let manager = macos::MacOsManager::request().await?;

    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    compile_error!("Unsupported platform - media sessions require Linux, Windows, or macOS");

    info!("Media session manager ready");
    Ok(Box::new(manager))
}
