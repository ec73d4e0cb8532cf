use crate::error::ClipboardError;

pub trait Clipboard {
    fn copy(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The desktop clipboard, opened on first use and then kept for the life of
/// the process. On X11 the copied text is only served while the handle lives.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self { inner: None }
    }

    fn ensure(&mut self) -> Result<&mut arboard::Clipboard, ClipboardError> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new()?);
        }
        self.inner.as_mut().ok_or(ClipboardError::NotOpened)
    }
}

impl Clipboard for SystemClipboard {
    fn copy(&mut self, text: &str) -> Result<(), ClipboardError> {
        let clipboard = self.ensure()?;
        clipboard.set_text(text.to_owned())?;
        tracing::debug!(bytes = text.len(), "copied to clipboard");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SystemClipboard;
    use crate::error::ClipboardError;

    #[test]
    fn clipboard_is_opened_lazily() {
        let clipboard = SystemClipboard::new();
        assert!(clipboard.inner.is_none());
    }

    #[test]
    fn backend_errors_are_reported_with_context() {
        let err = ClipboardError::from(arboard::Error::ClipboardNotSupported);
        assert!(err.to_string().starts_with("clipboard unavailable"));
    }
}
