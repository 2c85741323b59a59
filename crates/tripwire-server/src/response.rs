// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! JSON response envelopes shared by all handlers.

use serde::{Deserialize, Serialize};

/// Envelope for successful responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    /// The response payload.
    pub data: T,
    /// Optional human-readable note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> SuccessResponse<T> {
    /// Wrap a payload without a message.
    pub fn new(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    /// Wrap a payload with a message.
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: Some(message.into()),
        }
    }
}

/// Envelope for error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// What went wrong.
    pub error: String,
    /// Optional specifics, e.g. collected validation messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
