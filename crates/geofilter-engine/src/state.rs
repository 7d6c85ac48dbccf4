// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The single write channel from the engine into shared application state.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Action that replaces layer configurations by id, used to make a
/// filtered layer visible.
pub const REPLACE_BY_ID_IN_LAYER_CONFIG: &str = "replaceByIdInLayerConfig";

pub trait StateSink: Send + Sync {
	fn dispatch(&self, action: &str, payload: Value);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateAction {
	pub action: String,
	pub payload: Value,
}

/// Forwards dispatched actions to a channel receiver.
#[derive(Debug, Clone)]
pub struct ChannelStateSink {
	tx: mpsc::UnboundedSender<StateAction>,
}

impl ChannelStateSink {
	pub fn new() -> (Self, mpsc::UnboundedReceiver<StateAction>) {
		let (tx, rx) = mpsc::unbounded_channel();
		(Self { tx }, rx)
	}
}

impl StateSink for ChannelStateSink {
	fn dispatch(&self, action: &str, payload: Value) {
		debug!(action, "dispatching state action");
		let sent = self.tx.send(StateAction {
			action: action.to_string(),
			payload,
		});
		if sent.is_err() {
			warn!(action, "state receiver dropped, action discarded");
		}
	}
}

/// Discards every action.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStateSink;

impl StateSink for NoopStateSink {
	fn dispatch(&self, action: &str, _payload: Value) {
		debug!(action, "state action ignored");
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[tokio::test]
	async fn channel_sink_forwards_actions() {
		let (sink, mut rx) = ChannelStateSink::new();
		sink.dispatch(REPLACE_BY_ID_IN_LAYER_CONFIG, json!({"id": "1"}));

		let action = rx.recv().await.unwrap();
		assert_eq!(action.action, "replaceByIdInLayerConfig");
		assert_eq!(action.payload, json!({"id": "1"}));
	}

	#[test]
	fn dropped_receiver_does_not_panic() {
		let (sink, rx) = ChannelStateSink::new();
		drop(rx);
		sink.dispatch("anything", Value::Null);
	}
}
