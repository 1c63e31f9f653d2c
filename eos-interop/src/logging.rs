//! Native SDK log forwarding into `tracing`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::bridge::callback::panic_message;
use crate::marshal::{Enum, NativeEnum, Text};
use crate::pair::{struct_pair, StructPair};
use crate::platform::Shared;
use crate::result::{native_enum, ResultCode};

/// Target of every forwarded native log event.
pub const LOG_TARGET: &str = "eos";

pub type LogMessageFunc = unsafe extern "C" fn(*const LogMessageInternal);

native_enum! {
    pub enum LogLevel {
        Off = 0,
        Fatal = 100,
        Error = 200,
        Warning = 300,
        Info = 400,
        Verbose = 500,
        VeryVerbose = 600,
    }
}

native_enum! {
    pub enum LogCategory {
        Core = 0,
        Auth = 1,
        Friends = 2,
        Presence = 3,
        UserInfo = 4,
        HttpSerialization = 5,
        Ecom = 6,
        P2p = 7,
        Sessions = 8,
        RateLimiter = 9,
        PlayerDataStorage = 10,
        Analytics = 11,
        Messaging = 12,
        Connect = 13,
        Overlay = 14,
        Achievements = 15,
        Stats = 16,
        Ui = 17,
        Lobby = 18,
        Leaderboards = 19,
        Keychain = 20,
        IntegratedPlatform = 21,
        TitleStorage = 22,
        Mods = 23,
        AntiCheat = 24,
        Reports = 25,
        Sanctions = 26,
        ProgressionSnapshot = 27,
        Kws = 28,
        Rtc = 29,
        RtcAdmin = 30,
        CustomInvites = 31,
        AllCategories = 0x7FFF_FFFF,
    }
}

struct_pair! {
    /// One line of native SDK output.
    pub struct LogMessage => LogMessageInternal {
        category: Option<String> => Text,
        message: Option<String> => Text,
        level: LogLevel => Enum,
    }
}

/// `tracing` level for a native log level. `None` for `Off`.
pub fn tracing_level(level: LogLevel) -> Option<tracing::Level> {
    match level {
        LogLevel::Off => None,
        LogLevel::Fatal | LogLevel::Error => Some(tracing::Level::ERROR),
        LogLevel::Warning => Some(tracing::Level::WARN),
        LogLevel::Info => Some(tracing::Level::INFO),
        LogLevel::Verbose => Some(tracing::Level::DEBUG),
        LogLevel::VeryVerbose => Some(tracing::Level::TRACE),
        LogLevel::Unknown(raw) if raw > LogLevel::VeryVerbose.to_raw() => {
            Some(tracing::Level::TRACE)
        }
        LogLevel::Unknown(_) => Some(tracing::Level::INFO),
    }
}

/// Emit a native log line as a `tracing` event.
pub fn emit(message: &LogMessage) {
    let Some(level) = tracing_level(message.level) else {
        return;
    };
    let category = message.category.as_deref().unwrap_or("");
    let text = message.message.as_deref().unwrap_or("");
    match level {
        tracing::Level::ERROR => tracing::error!(target: LOG_TARGET, category, "{text}"),
        tracing::Level::WARN => tracing::warn!(target: LOG_TARGET, category, "{text}"),
        tracing::Level::INFO => tracing::info!(target: LOG_TARGET, category, "{text}"),
        tracing::Level::DEBUG => tracing::debug!(target: LOG_TARGET, category, "{text}"),
        _ => tracing::trace!(target: LOG_TARGET, category, "{text}"),
    }
}

unsafe extern "C" fn forward(native: *const LogMessageInternal) {
    unsafe { forward_to(native, emit) };
}

/// Decode `native` and hand it to `sink`, logging any panic instead of
/// letting it cross the native boundary.
unsafe fn forward_to(native: *const LogMessageInternal, sink: impl FnOnce(&LogMessage)) {
    if native.is_null() {
        return;
    }
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let message = unsafe { LogMessage::from_native(&*native) };
        sink(&message);
    }));
    if let Err(payload) = outcome {
        tracing::error!("native log forwarding panicked: {}", panic_message(&*payload));
    }
}

/// Native logging controls.
#[derive(Debug)]
pub struct Logging {
    shared: Arc<Shared>,
}

impl Logging {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Route native log output into `tracing` under target [`LOG_TARGET`].
    pub fn forward_native_logs(&self) -> ResultCode {
        let raw = unsafe { (self.shared.bindings.eos_logging_set_callback)(forward) };
        let code = ResultCode::from_raw(raw);
        tracing::debug!("EOS_Logging_SetCallback -> {code}");
        code
    }

    pub fn set_log_level(&self, category: LogCategory, level: LogLevel) -> ResultCode {
        ResultCode::from_raw(unsafe {
            (self.shared.bindings.eos_logging_set_log_level)(category.to_raw(), level.to_raw())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Capture {
        type Writer = Capture;

        fn make_writer(&'a self) -> Capture {
            self.clone()
        }
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(tracing_level(LogLevel::Off), None);
        assert_eq!(tracing_level(LogLevel::Fatal), Some(tracing::Level::ERROR));
        assert_eq!(tracing_level(LogLevel::Warning), Some(tracing::Level::WARN));
        assert_eq!(tracing_level(LogLevel::VeryVerbose), Some(tracing::Level::TRACE));
        assert_eq!(tracing_level(LogLevel::from_raw(700)), Some(tracing::Level::TRACE));
    }

    #[test]
    fn test_forwarded_line_reaches_subscriber() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();

        let native = LogMessage {
            category: Some("LogEOSP2P".into()),
            message: Some("socket opened".into()),
            level: LogLevel::Warning,
        }
        .to_native()
        .unwrap();

        tracing::subscriber::with_default(subscriber, || unsafe { forward(&native) });

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("eos"));
        assert!(output.contains("category=\"LogEOSP2P\""));
        assert!(output.contains("socket opened"));
    }

    #[test]
    fn test_forwarding_panic_is_logged() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .finish();
        let native = LogMessage {
            message: Some("overlay ready".into()),
            level: LogLevel::Info,
            ..Default::default()
        }
        .to_native()
        .unwrap();

        tracing::subscriber::with_default(subscriber, || unsafe {
            forward_to(&native, |message| {
                panic!("sink rejected {:?}", message.message.as_deref())
            })
        });

        let output = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("ERROR"));
        assert!(output.contains("native log forwarding panicked"));
        assert!(output.contains("sink rejected Some(\"overlay ready\")"));
    }

    #[test]
    fn test_off_level_is_silent() {
        let capture = Capture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            emit(&LogMessage {
                message: Some("hidden".into()),
                level: LogLevel::Off,
                ..Default::default()
            })
        });
        assert!(capture.0.lock().unwrap().is_empty());
    }
}
