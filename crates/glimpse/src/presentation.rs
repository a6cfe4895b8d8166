//! Presentation Transition Controller.
//!
//! Handshake with the host's screen layer: get an attachment point, play
//! the entry transition, and only then let the session go `Active`.
//! Dismissal plays the reverse transition and terminates the session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::error::SessionError;
use crate::lifecycle::SessionState;
use crate::session::RecognitionSession;
use crate::types::SessionId;

/// How the session's screen enters and leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStyle {
    /// Appear immediately
    None,
    /// Pushed onto a navigation stack
    #[default]
    SlideIn,
    ModalReveal,
    ZoomIn,
    CrossFade,
}

impl TransitionStyle {
    pub const ALL: [TransitionStyle; 5] = [
        TransitionStyle::None,
        TransitionStyle::SlideIn,
        TransitionStyle::ModalReveal,
        TransitionStyle::ZoomIn,
        TransitionStyle::CrossFade,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionStyle::None => "none",
            TransitionStyle::SlideIn => "slide_in",
            TransitionStyle::ModalReveal => "modal_reveal",
            TransitionStyle::ZoomIn => "zoom_in",
            TransitionStyle::CrossFade => "cross_fade",
        }
    }
}

impl fmt::Display for TransitionStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionDirection {
    Present,
    Dismiss,
}

/// Opaque token for an attachment point granted by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentHandle(pub u64);

/// Host-side refusal or failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The hosting application's screen-management layer.
#[async_trait]
pub trait PresentationHost: Send + Sync {
    /// Grant a place to attach the session's screen, or refuse.
    async fn provide_attachment_point(
        &self,
        style: TransitionStyle,
    ) -> Result<AttachmentHandle, HostError>;

    /// Play `style` in `direction`; resolves once the animation finished.
    async fn play_transition(
        &self,
        handle: AttachmentHandle,
        style: TransitionStyle,
        direction: TransitionDirection,
    ) -> Result<(), HostError>;

    async fn release_attachment_point(&self, handle: AttachmentHandle);
}

#[derive(Debug, Clone, Copy)]
struct Attachment {
    session: SessionId,
    handle: AttachmentHandle,
    style: TransitionStyle,
}

/// Drives the presentation handshake for one session at a time.
pub struct PresentationController<H> {
    host: H,
    attached: tokio::sync::Mutex<Option<Attachment>>,
}

impl<H: PresentationHost> PresentationController<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            attached: tokio::sync::Mutex::new(None),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Present `session` with `style` and activate it.
    ///
    /// The session must be `Idle`. If the host denies attachment the
    /// session stays `Idle`; if the transition fails it returns to `Idle`.
    #[tracing::instrument(name = "glimpse.session.present", skip_all, fields(session.id = %session.id(), style = %style))]
    pub async fn present(
        &self,
        session: &RecognitionSession,
        style: TransitionStyle,
    ) -> Result<(), SessionError> {
        let mut attached = self.attached.lock().await;
        if let Some(current) = attached.as_ref() {
            tracing::warn!(presented = %current.session, "Controller already presents a session");
            return Err(SessionError::Presentation("already presented".to_string()));
        }
        match session.state() {
            SessionState::Idle => {}
            SessionState::Terminated => return Err(SessionError::Terminated),
            state => return Err(SessionError::invalid("present", state)),
        }

        let handle = self
            .host
            .provide_attachment_point(style)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Host denied attachment");
                SessionError::Presentation(format!("attachment denied: {}", e))
            })?;

        if let Err(err) = session.core().begin_start() {
            self.host.release_attachment_point(handle).await;
            return Err(err);
        }

        let played = self
            .host
            .play_transition(handle, style, TransitionDirection::Present)
            .await;
        if let Err(e) = played {
            tracing::warn!(error = %e, "Entry transition failed");
            session.core().abandon_start();
            self.host.release_attachment_point(handle).await;
            return Err(SessionError::Presentation(format!("transition failed: {}", e)));
        }

        // The session may have been terminated while the transition played.
        if let Err(err) = session.core().activate() {
            self.host.release_attachment_point(handle).await;
            return Err(err);
        }

        *attached = Some(Attachment {
            session: session.id(),
            handle,
            style,
        });
        tracing::info!("Session presented");
        Ok(())
    }

    /// Reverse the entry transition, release the attachment point and
    /// terminate `session`. Termination happens even if the transition
    /// fails; that failure is still reported.
    #[tracing::instrument(name = "glimpse.session.dismiss", skip_all, fields(session.id = %session.id()))]
    pub async fn dismiss(&self, session: &RecognitionSession) -> Result<(), SessionError> {
        let mut attached = self.attached.lock().await;

        // Another session's attachment stays in place.
        let mine = attached.as_ref().is_some_and(|a| a.session == session.id());
        let current = if mine { attached.take() } else { None };
        let played = match current {
            Some(attachment) => {
                let played = self
                    .host
                    .play_transition(attachment.handle, attachment.style, TransitionDirection::Dismiss)
                    .await;
                self.host.release_attachment_point(attachment.handle).await;
                played.map_err(|e| {
                    tracing::warn!(error = %e, "Exit transition failed");
                    SessionError::Presentation(format!("transition failed: {}", e))
                })
            }
            None => Ok(()),
        };

        session.terminate()?;
        tracing::info!("Session dismissed");
        played
    }

    /// Whether an attachment point is currently held.
    pub async fn is_presented(&self) -> bool {
        self.attached.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles_are_a_closed_set() {
        let names: Vec<_> = TransitionStyle::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["none", "slide_in", "modal_reveal", "zoom_in", "cross_fade"]);
        assert_eq!(
            serde_json::to_value(TransitionStyle::ModalReveal).unwrap(),
            serde_json::json!("modal_reveal")
        );
    }
}
