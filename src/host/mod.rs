//! Narrow contracts for the external editing host.
//!
//! The page probe only needs [`PageOpener`]; the embed pipeline drives an
//! [`EditorHost`] that owns a single active document at a time.

use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;

use crate::cli::OutputFormat;

pub mod plan;
pub mod poppler;

pub use plan::PlanRecorder;
pub use poppler::PdftoppmProbe;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("page {page} is out of range")]
    PageOutOfRange { page: u32 },

    #[error("cancelled by user")]
    Cancelled,

    #[error("{operation} failed: {message}")]
    Failed {
        operation: &'static str,
        message: String,
    },
}

impl HostError {
    pub fn failed(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            operation,
            message: message.into(),
        }
    }
}

/// Interrupt flag shared between the Ctrl+C handler and the hosts.
///
/// Once set, hosts answer their next operation with [`HostError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<(), HostError> {
        if self.is_cancelled() {
            Err(HostError::Cancelled)
        } else {
            Ok(())
        }
    }
}

pub trait PageOpener {
    type Session;

    fn open_page(&mut self, document: &Path, page: u32) -> Result<Self::Session, HostError>;

    /// Releases a session without persisting anything.
    fn close_discarding(&mut self, session: Self::Session);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextLayer {
    pub contents: String,
    pub font: String,
    pub size_pt: f64,
    pub color_rgb: [u8; 3],
    pub centered: bool,
}

impl TextLayer {
    pub fn new(contents: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            font: "Verdana".to_string(),
            size_pt: 50.0,
            color_rgb: [25, 227, 102],
            centered: true,
        }
    }
}

pub trait EditorHost {
    fn open_document(&mut self, source: &Path) -> Result<(), HostError>;

    fn place_embedded(
        &mut self,
        file: &Path,
        page: Option<u32>,
        layer_name: &str,
    ) -> Result<(), HostError>;

    fn add_layer_from_file(&mut self, file: &Path, layer_name: &str) -> Result<(), HostError>;

    fn add_text_layer(&mut self, text: &TextLayer) -> Result<(), HostError>;

    fn append_keywords(&mut self, keywords: &[String]) -> Result<(), HostError>;

    fn save_as(&mut self, target: &Path, format: OutputFormat) -> Result<(), HostError>;

    /// Closes the active document without saving further changes.
    fn close_document(&mut self);
}

/// An open probe session, closed when dropped.
pub struct ProbeSession<'a, O: PageOpener + ?Sized> {
    opener: &'a mut O,
    session: Option<O::Session>,
}

impl<'a, O: PageOpener + ?Sized> ProbeSession<'a, O> {
    pub fn open(opener: &'a mut O, document: &Path, page: u32) -> Result<Self, HostError> {
        let session = opener.open_page(document, page)?;
        Ok(Self {
            opener,
            session: Some(session),
        })
    }
}

impl<O: PageOpener + ?Sized> Drop for ProbeSession<'_, O> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.opener.close_discarding(session);
        }
    }
}

/// The active source document, closed when dropped.
pub struct OpenDocument<'a, H: EditorHost + ?Sized> {
    host: &'a mut H,
}

impl<'a, H: EditorHost + ?Sized> OpenDocument<'a, H> {
    pub fn open(host: &'a mut H, source: &Path) -> Result<Self, HostError> {
        host.open_document(source)?;
        Ok(Self { host })
    }
}

impl<H: EditorHost + ?Sized> Deref for OpenDocument<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        &*self.host
    }
}

impl<H: EditorHost + ?Sized> DerefMut for OpenDocument<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        &mut *self.host
    }
}

impl<H: EditorHost + ?Sized> Drop for OpenDocument<'_, H> {
    fn drop(&mut self) {
        self.host.close_document();
    }
}
