//! Client side of the proposal intake flow: file selection, the analysis
//! lifecycle, and result export.

pub mod notify;
pub mod presenter;
pub mod session;
pub mod transport;
pub mod upload;

pub use notify::{NoticeLevel, Notifier, TracingNotifier};
pub use presenter::{DocumentExport, DocumentViewer, SystemBrowser, ViewerError};
pub use session::{AnalysisSession, LifecycleState, TerminalEvent, Timing};
pub use transport::{AnalysisTransport, HttpTransport, TransportFailure};
pub use upload::{SelectionError, UploadCandidate, UploadedFile};
