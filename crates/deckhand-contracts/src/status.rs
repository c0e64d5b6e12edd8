use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::actions::Action;

pub type StatusPayload = Map<String, Value>;

/// How long a terminal success or error status stays visible before a sink
/// reverts its display. Informational notices persist.
pub const STATUS_REVERT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Success,
    Error,
    Info,
}

impl StatusLevel {
    pub fn label(&self) -> &'static str {
        match self {
            StatusLevel::Success => "success",
            StatusLevel::Error => "error",
            StatusLevel::Info => "info",
        }
    }
}

/// Outward signal surface of the engine.
///
/// The engine only ever talks to the host UI through this trait: a busy
/// toggle around each operation, one terminal status per operation, and a
/// success-only request to clear the action's input field.
pub trait StatusSink: Send + Sync {
    fn set_busy(&self, action: Action, busy: bool);

    /// Terminal status of one operation. `revert_after` hints that the
    /// display should clear itself after the delay; `None` means the
    /// message persists.
    fn show(
        &self,
        action: Action,
        level: StatusLevel,
        message: &str,
        revert_after: Option<Duration>,
    );

    /// Clear the input field for `action`. Signaled only after success;
    /// default is a no-op for sinks without input fields.
    fn clear_input(&self, _action: Action) {}
}

/// One captured signal, in the order the engine emitted it.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusSignal {
    Busy {
        action: Action,
        busy: bool,
    },
    Shown {
        action: Action,
        level: StatusLevel,
        message: String,
        revert_after: Option<Duration>,
    },
    InputCleared {
        action: Action,
    },
}

/// Records every signal instead of rendering it. The inspection sink for
/// tests and embedders.
#[derive(Default)]
pub struct RecordingSink {
    signals: Mutex<Vec<StatusSignal>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<StatusSignal> {
        match self.signals.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, signal: StatusSignal) {
        match self.signals.lock() {
            Ok(mut guard) => guard.push(signal),
            Err(poisoned) => poisoned.into_inner().push(signal),
        }
    }
}

impl StatusSink for RecordingSink {
    fn set_busy(&self, action: Action, busy: bool) {
        self.push(StatusSignal::Busy { action, busy });
    }

    fn show(
        &self,
        action: Action,
        level: StatusLevel,
        message: &str,
        revert_after: Option<Duration>,
    ) {
        self.push(StatusSignal::Shown {
            action,
            level,
            message: message.to_string(),
            revert_after,
        });
    }

    fn clear_input(&self, action: Action) {
        self.push(StatusSignal::InputCleared { action });
    }
}

/// Append-only JSONL status log.
///
/// - default fields are `type`, `run_id`, `ts`
/// - caller payload is merged last and can override defaults
/// - one compact JSON object per line
#[derive(Debug, Clone)]
pub struct StatusLog {
    inner: Arc<StatusLogInner>,
}

#[derive(Debug)]
struct StatusLogInner {
    path: PathBuf,
    run_id: String,
    lock: Mutex<()>,
}

impl StatusLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_run_id(path, Uuid::new_v4().to_string())
    }

    pub fn with_run_id(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(StatusLogInner {
                path: path.into(),
                run_id: run_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn run_id(&self) -> &str {
        &self.inner.run_id
    }

    pub fn emit(&self, event_type: &str, payload: StatusPayload) -> anyhow::Result<Value> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert(
            "run_id".to_string(),
            Value::String(self.inner.run_id.clone()),
        );
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        for (key, value) in payload {
            event.insert(key, value);
        }

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&event)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("status log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(event))
    }
}

// Status is best-effort: a failed log write never fails the operation that
// produced the signal. Callers that need the write error use `emit`.
impl StatusSink for StatusLog {
    fn set_busy(&self, action: Action, busy: bool) {
        let mut payload = StatusPayload::new();
        payload.insert(
            "action".to_string(),
            Value::String(action.name().to_string()),
        );
        payload.insert("busy".to_string(), Value::Bool(busy));
        let _ = self.emit("busy", payload);
    }

    fn show(
        &self,
        action: Action,
        level: StatusLevel,
        message: &str,
        revert_after: Option<Duration>,
    ) {
        let mut payload = StatusPayload::new();
        payload.insert(
            "action".to_string(),
            Value::String(action.name().to_string()),
        );
        payload.insert(
            "level".to_string(),
            Value::String(level.label().to_string()),
        );
        payload.insert("message".to_string(), Value::String(message.to_string()));
        if let Some(delay) = revert_after {
            payload.insert(
                "revert_after_ms".to_string(),
                Value::Number((delay.as_millis() as u64).into()),
            );
        }
        let _ = self.emit("status", payload);
    }

    fn clear_input(&self, action: Action) {
        let mut payload = StatusPayload::new();
        payload.insert(
            "action".to_string(),
            Value::String(action.name().to_string()),
        );
        let _ = self.emit("input_cleared", payload);
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
