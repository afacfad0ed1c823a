//! Subscriber setup for the service and the command-line client.

use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::Environment;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Single-line, with span context.
    Full,
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    Stderr,
}

/// How one process logs. `RUST_LOG` overrides the default filter.
#[derive(Debug, Clone)]
pub struct LogSetup {
    default_filter: &'static str,
    format: LogFormat,
    target: LogTarget,
    source_locations: bool,
    ansi: bool,
}

impl LogSetup {
    /// Pretty output in dev and staging, JSON in prod.
    pub fn server(env: &Environment) -> Self {
        let default_filter = match env {
            Environment::Dev => "proposal_intake=debug,tower_http=debug,info",
            Environment::Staging => "proposal_intake=debug,tower_http=info,info",
            Environment::Prod => "proposal_intake=info,tower_http=info,warn",
        };
        Self {
            default_filter,
            format: if env.is_prod() {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            target: LogTarget::Stdout,
            source_locations: env.is_dev(),
            ansi: !env.is_prod(),
        }
    }

    /// Warnings only unless verbose. Stdout stays free for results.
    pub fn cli(verbose: bool) -> Self {
        Self {
            default_filter: if verbose {
                "proposal_intake=debug,proposal_cli=debug,warn"
            } else {
                "warn"
            },
            format: LogFormat::Compact,
            target: LogTarget::Stderr,
            source_locations: false,
            ansi: true,
        }
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn target(&self) -> LogTarget {
        self.target
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_filter))
    }

    fn layer<W>(&self, writer: W, filter: EnvFilter) -> BoxedLayer
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let base = fmt::layer()
            .with_writer(writer)
            .with_ansi(self.ansi)
            .with_target(self.format != LogFormat::Compact)
            .with_thread_ids(false)
            .with_file(self.source_locations)
            .with_line_number(self.source_locations);

        match self.format {
            LogFormat::Full => base.with_filter(filter).boxed(),
            LogFormat::Compact => base.compact().with_filter(filter).boxed(),
            LogFormat::Pretty => base.pretty().with_filter(filter).boxed(),
            LogFormat::Json => base.json().with_filter(filter).boxed(),
        }
    }

    /// Install as the global subscriber.
    pub fn init(self) {
        let filter = self.filter();
        let layer = match self.target {
            LogTarget::Stdout => self.layer(std::io::stdout, filter),
            LogTarget::Stderr => self.layer(std::io::stderr, filter),
        };
        tracing_subscriber::registry().with(layer).init();
    }
}

pub fn init_logging(env: &Environment) {
    LogSetup::server(env).init();
    tracing::info!("Logging initialized for {:?} environment", env);
}

pub fn init_cli_logging(verbose: bool) {
    LogSetup::cli(verbose).init();
}

/// Formatted log output collected in memory.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct LogBuffer(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

#[cfg(test)]
impl LogBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

#[cfg(test)]
impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route this thread's events at INFO and above into a buffer until the
/// guard drops.
#[cfg(test)]
pub(crate) fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let logs = LogBuffer::default();
    let setup = LogSetup {
        default_filter: "info",
        format: LogFormat::Full,
        target: LogTarget::Stdout,
        source_locations: false,
        ansi: false,
    };
    let layer = setup.layer(logs.clone(), EnvFilter::new(setup.default_filter));
    let guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(layer));
    (logs, guard)
}
