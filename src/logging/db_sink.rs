//! Persists log events to the `log_entries` table.
//!
//! The layer itself never touches the database: it turns each event into a
//! [`NewLogEntry`] and pushes it onto a channel. [`spawn_writer`] drains the
//! channel into a [`Store`] on a background task.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

use crate::db::Store;
use crate::models::NewLogEntry;

/// Receiving half handed to [`spawn_writer`].
pub type LogEntryReceiver = UnboundedReceiver<NewLogEntry>;

pub struct DbLogLayer {
    tx: UnboundedSender<NewLogEntry>,
}

impl DbLogLayer {
    pub fn new() -> (Self, LogEntryReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

/// Stored in the extensions of any span that carries a `request_id` field.
struct SpanRequestId(String);

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: String,
    request_id: Option<String>,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message.push_str(value),
            "request_id" => self.request_id = Some(value.to_string()),
            name => {
                let _ = write!(self.fields, " {name}={value}");
            }
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => {
                let _ = write!(self.message, "{value:?}");
            }
            "request_id" => self.request_id = Some(format!("{value:?}")),
            name => {
                let _ = write!(self.fields, " {name}={value:?}");
            }
        }
    }
}

impl<S> Layer<S> for DbLogLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        attrs.record(&mut visitor);
        if let (Some(request_id), Some(span)) = (visitor.request_id, ctx.span(id)) {
            span.extensions_mut().insert(SpanRequestId(request_id));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        // The writer's own queries would otherwise be logged back into the table.
        if meta.target().starts_with("sqlx") {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let request_id = visitor.request_id.or_else(|| {
            ctx.event_scope(event)?.find_map(|span| {
                span.extensions()
                    .get::<SpanRequestId>()
                    .map(|id| id.0.clone())
            })
        });

        let entry = NewLogEntry {
            created_at: Utc::now(),
            level: meta.level().to_string(),
            logger_name: meta.target().to_string(),
            message: format!("{}{}", visitor.message, visitor.fields),
            context: request_id.map(|id| json!({ "request_id": id }).to_string()),
        };
        // A closed channel means the writer is gone; there is nowhere left to report to.
        let _ = self.tx.send(entry);
    }
}

/// Drain `rx` into `store` until every sender is dropped.
pub fn spawn_writer(mut rx: LogEntryReceiver, store: Arc<dyn Store>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(entry) = rx.recv().await {
            if let Err(err) = store.insert_log_entry(&entry).await {
                // Not through tracing: that would route straight back into this sink.
                eprintln!("failed to persist log entry: {err}");
            }
        }
    })
}
