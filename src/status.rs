//! Per-tool session state: the current selection and a four-state status.
//!
//! ```text
//!            select / append / reject
//!   ┌──────────────────────────────────────┐
//!   ▼                                      │
//! Idle ──begin──▶ Processing ──finish──▶ Done | Error
//! ```
//!
//! [`ToolSession::begin`] hands out an [`InFlight`] guard that mutably borrows
//! the session. While the guard lives the session cannot be re-selected or
//! begun again, so a second concurrent transformation does not type-check.
//! A guard dropped without [`InFlight::finish`] (an early return or a panic)
//! leaves the session in `Error` rather than stuck in `Processing`.

use crate::error::{ConvertError, ErrorClass};
use tracing::debug;

/// Status of the single operation a tool can run at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Processing,
    Done,
    Error(String),
}

impl Status {
    /// Text for the primary action control.
    ///
    /// `action` is the idle label ("Split PDF"); `busy` replaces it while a
    /// transformation is running ("Processing...").
    pub fn label<'a>(&self, action: &'a str, busy: &'a str) -> &'a str {
        match self {
            Status::Processing => busy,
            _ => action,
        }
    }

    /// Last failure message, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Status::Error(msg) => Some(msg),
            _ => None,
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, Status::Processing)
    }
}

/// Selection + status for one tool instance.
#[derive(Debug)]
pub struct ToolSession<T> {
    selection: Option<T>,
    status: Status,
    notice: Option<String>,
}

impl<T> Default for ToolSession<T> {
    fn default() -> Self {
        Self {
            selection: None,
            status: Status::Idle,
            notice: None,
        }
    }
}

impl<T> ToolSession<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn selection(&self) -> Option<&T> {
        self.selection.as_ref()
    }

    /// Error text shown next to the action: either the last failure or an
    /// intake/option message recorded while idle.
    pub fn message(&self) -> Option<&str> {
        self.status.error_message().or(self.notice.as_deref())
    }

    /// Replace the selection wholesale and return to idle.
    pub fn select(&mut self, value: T) {
        self.selection = Some(value);
        self.reset();
    }

    /// Clear the selection entirely.
    pub fn clear(&mut self) {
        self.selection = None;
        self.reset();
    }

    /// Record an intake error without touching the held selection.
    pub fn reject(&mut self, err: &ConvertError) {
        self.notice = Some(err.to_string());
    }

    /// An option changed; stale results and errors no longer apply.
    pub fn options_changed(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.status = Status::Idle;
        self.notice = None;
    }

    /// Start a transformation over the current selection.
    pub fn begin(&mut self) -> Result<InFlight<'_, T>, ConvertError> {
        if self.status.is_processing() {
            return Err(ConvertError::AlreadyProcessing);
        }
        let ToolSession {
            selection,
            status,
            notice,
        } = self;
        let selection = selection.as_ref().ok_or(ConvertError::NothingSelected)?;
        *status = Status::Processing;
        *notice = None;
        debug!("tool session → processing");
        Ok(InFlight {
            selection,
            status,
            notice,
        })
    }
}

impl<T> ToolSession<Vec<T>> {
    /// Append items to a multi-file selection and return to idle.
    pub fn append(&mut self, items: impl IntoIterator<Item = T>) {
        self.selection.get_or_insert_with(Vec::new).extend(items);
        self.reset();
    }

    /// Remove one item of a multi-file selection.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let list = self.selection.as_mut()?;
        (index < list.len()).then(|| list.remove(index))
    }
}

/// Message recorded when a guard is dropped before its outcome is known.
pub const INTERRUPTED: &str = "The operation was interrupted.";

/// Guard for a running transformation. Consumed by [`InFlight::finish`].
#[derive(Debug)]
pub struct InFlight<'s, T> {
    selection: &'s T,
    status: &'s mut Status,
    notice: &'s mut Option<String>,
}

impl<'s, T> InFlight<'s, T> {
    /// The selection the transformation runs over.
    pub fn selection(&self) -> &'s T {
        self.selection
    }

    /// Record the outcome and leave the processing state.
    ///
    /// Option errors put the tool back to idle with the message shown, since
    /// nothing was started; every other error is a failed transformation.
    pub fn finish<R>(self, result: Result<R, ConvertError>) -> Result<R, ConvertError> {
        match &result {
            Ok(_) => {
                *self.status = Status::Done;
                debug!("tool session → done");
            }
            Err(e) if e.class() == ErrorClass::InvalidOptions => {
                *self.status = Status::Idle;
                *self.notice = Some(e.to_string());
                debug!("tool session → idle ({e})");
            }
            Err(e) => {
                *self.status = Status::Error(e.to_string());
                debug!("tool session → error ({e})");
            }
        }
        result
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if self.status.is_processing() {
            *self.status = Status::Error(INTERRUPTED.to_string());
            debug!("tool session → error (dropped while processing)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_switches_while_processing() {
        assert_eq!(Status::Idle.label("Split PDF", "Processing..."), "Split PDF");
        assert_eq!(
            Status::Processing.label("Split PDF", "Processing..."),
            "Processing..."
        );
        assert_eq!(Status::Done.label("Split PDF", "Processing..."), "Split PDF");
    }

    #[test]
    fn begin_requires_selection() {
        let mut s: ToolSession<u8> = ToolSession::new();
        assert!(matches!(s.begin(), Err(ConvertError::NothingSelected)));
    }

    #[test]
    fn success_moves_to_done() {
        let mut s = ToolSession::new();
        s.select("a.pdf");
        let run = s.begin().unwrap();
        assert_eq!(*run.selection(), "a.pdf");
        run.finish(Ok::<_, ConvertError>(())).unwrap();
        assert_eq!(*s.status(), Status::Done);
    }

    #[test]
    fn failure_moves_to_error_and_reselect_clears_it() {
        let mut s = ToolSession::new();
        s.select(1u8);
        let run = s.begin().unwrap();
        let _ = run.finish::<()>(Err(ConvertError::pdf("Failed to process PDF.", "eof")));
        assert!(matches!(s.status(), Status::Error(_)));
        assert!(s.message().unwrap().contains("eof"));

        s.select(2u8);
        assert_eq!(*s.status(), Status::Idle);
        assert!(s.message().is_none());
    }

    #[test]
    fn option_error_returns_to_idle_with_message() {
        let mut s = ToolSession::new();
        s.select(());
        let run = s.begin().unwrap();
        let _ = run.finish::<()>(Err(ConvertError::InvalidRange { total: 4 }));
        assert_eq!(*s.status(), Status::Idle);
        assert_eq!(
            s.message(),
            Some("Invalid page range. The document has 4 pages.")
        );
    }

    #[test]
    fn reject_keeps_previous_selection() {
        let mut s = ToolSession::new();
        s.select("keep.pdf");
        s.reject(&ConvertError::rejected("Please drop a PDF file."));
        assert_eq!(s.selection(), Some(&"keep.pdf"));
        assert_eq!(s.message(), Some("Please drop a PDF file."));
    }

    #[test]
    fn dropped_guard_does_not_wedge_the_session() {
        let mut s = ToolSession::new();
        s.select("a.pdf");
        drop(s.begin().unwrap());
        assert_eq!(*s.status(), Status::Error(INTERRUPTED.to_string()));

        let run = s.begin().unwrap();
        run.finish(Ok::<_, ConvertError>(())).unwrap();
        assert_eq!(*s.status(), Status::Done);
    }

    #[test]
    fn options_changed_clears_outcome() {
        let mut s = ToolSession::new();
        s.select(1u8);
        let run = s.begin().unwrap();
        let _ = run.finish::<()>(Err(ConvertError::pdf("Failed to process PDF.", "eof")));
        s.options_changed();
        assert_eq!(*s.status(), Status::Idle);
        assert!(s.message().is_none());
        assert_eq!(s.selection(), Some(&1u8));
    }

    #[test]
    fn append_extends_multi_selection() {
        let mut s: ToolSession<Vec<&str>> = ToolSession::new();
        s.append(["a.png"]);
        s.append(["b.png", "c.png"]);
        assert_eq!(s.selection().unwrap().len(), 3);
        assert_eq!(s.remove(1), Some("b.png"));
        assert_eq!(s.remove(9), None);
    }
}
