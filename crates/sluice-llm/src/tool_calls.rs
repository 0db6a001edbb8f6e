//! Incremental tool-call reconstruction.
//!
//! Chat-completions streams deliver a tool call's id, function name and JSON
//! arguments as fragments keyed by `index`, and fragments of parallel calls
//! may interleave. [`ToolCallProcessor`] buffers each index until its
//! arguments parse as complete JSON, then emits a single
//! [`StreamEvent::ToolCall`].
//!
//! Calls still pending when the stream ends are settled by
//! [`ToolCallProcessor::finish`]: an empty argument buffer is a zero-argument
//! call (`{}`), anything else that never parsed is reported as
//! [`StreamEvent::MalformedToolCall`] for that index alone.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::streaming::{StreamEvent, ToolCallDelta};

#[derive(Debug, Default)]
struct PendingToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Accumulates tool-call fragments for a single stream
///
/// Not meant to be reused across requests: each stream builds its own.
#[derive(Debug, Default)]
pub struct ToolCallProcessor {
    pending: HashMap<u32, PendingToolCall>,
    completed: HashSet<u32>,
}

impl ToolCallProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process the tool-call fragments of one chunk, in order.
    ///
    /// The returned iterator is lazy; fragments are consumed as it is driven.
    pub fn process_deltas<'a, I>(&'a mut self, deltas: I) -> impl Iterator<Item = StreamEvent> + 'a
    where
        I: IntoIterator<Item = &'a ToolCallDelta>,
        I::IntoIter: 'a,
    {
        deltas
            .into_iter()
            .filter_map(move |delta| self.process_delta(delta))
    }

    /// Apply one fragment, returning the completed call if it just closed
    pub fn process_delta(&mut self, delta: &ToolCallDelta) -> Option<StreamEvent> {
        let index = delta.index;

        if self.completed.contains(&index) {
            tracing::debug!(index, "Ignoring fragment for already completed tool call");
            return None;
        }

        let pending = self.pending.entry(index).or_default();

        if pending.id.is_none() {
            pending.id = non_empty(delta.id.as_deref());
        }

        let function = delta.function.as_ref();

        if pending.name.is_none() {
            pending.name = non_empty(function.and_then(|f| f.name.as_deref()));
        }

        if let Some(chunk) = function.and_then(|f| f.arguments.as_deref()) {
            pending.arguments.push_str(chunk);
        }

        // An empty buffer is only a zero-argument call once the stream ends;
        // until then the arguments may simply not have started.
        if pending.name.is_none() || pending.arguments.trim().is_empty() {
            return None;
        }

        let arguments = serde_json::from_str::<Value>(&pending.arguments).ok()?;
        let pending = self.pending.remove(&index)?;
        self.completed.insert(index);

        Some(complete(index, pending, arguments))
    }

    /// Settle every call still pending, in ascending index order.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut indices: Vec<u32> = self.pending.keys().copied().collect();
        indices.sort_unstable();

        let mut events = Vec::with_capacity(indices.len());
        for index in indices {
            if let Some(pending) = self.pending.remove(&index) {
                self.completed.insert(index);
                events.push(settle(index, pending));
            }
        }

        events
    }

    /// Number of calls still waiting for fragments
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

fn complete(index: u32, pending: PendingToolCall, arguments: Value) -> StreamEvent {
    let id = pending.id.unwrap_or_default();
    let name = pending.name.unwrap_or_default();

    tracing::debug!(index, id = %id, name = %name, "Tool call complete");

    StreamEvent::ToolCall {
        index,
        id,
        name,
        arguments,
    }
}

fn settle(index: u32, pending: PendingToolCall) -> StreamEvent {
    let parsed = if pending.arguments.trim().is_empty() {
        Ok(Value::Object(serde_json::Map::new()))
    } else {
        serde_json::from_str::<Value>(&pending.arguments)
            .map_err(|e| format!("arguments are not valid JSON: {}", e))
    };

    match parsed {
        Ok(arguments) if pending.name.is_some() => complete(index, pending, arguments),
        Ok(_) => malformed(index, pending, "tool call has no function name".to_string()),
        Err(reason) => malformed(index, pending, reason),
    }
}

fn malformed(index: u32, pending: PendingToolCall, reason: String) -> StreamEvent {
    tracing::warn!(
        index,
        id = ?pending.id,
        name = ?pending.name,
        reason = %reason,
        "Discarding malformed tool call"
    );

    StreamEvent::MalformedToolCall {
        index,
        id: pending.id,
        name: pending.name,
        raw_arguments: pending.arguments,
        reason,
    }
}
