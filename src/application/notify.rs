//! Transient notifications raised by actions and the editor.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use super::lock::mutex_lock;

const SOURCE: &str = "application::notify";
const DEFAULT_TOAST_TTL: Duration = Duration::from_millis(6000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Toast {
    pub id: Uuid,
    pub kind: ToastKind,
    pub text: String,
    #[serde(rename = "ttl_ms", serialize_with = "serialize_ttl")]
    pub ttl: Duration,
}

fn serialize_ttl<S: serde::Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX))
}

impl Toast {
    pub fn success(text: impl Into<String>) -> Self {
        Self::with_kind(ToastKind::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::with_kind(ToastKind::Error, text)
    }

    fn with_kind(kind: ToastKind, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            text: text.into(),
            ttl: DEFAULT_TOAST_TTL,
        }
    }
}

/// Sink for toasts; the rendering layer decides how they are shown.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Notifier that keeps every toast in memory.
#[derive(Debug, Default)]
pub struct ToastLog {
    toasts: Mutex<Vec<Toast>>,
}

impl ToastLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        mutex_lock(&self.toasts, SOURCE, "toasts").clone()
    }

    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut *mutex_lock(&self.toasts, SOURCE, "drain"))
    }
}

impl Notifier for ToastLog {
    fn notify(&self, toast: Toast) {
        mutex_lock(&self.toasts, SOURCE, "notify").push(toast);
    }
}
