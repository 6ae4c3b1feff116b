// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{Result, ZkError};

/// Races a fallible I/O future against a timeout and the session's
/// cancellation token.
pub(super) async fn io_with_timeout<F, T>(
    label: &'static str,
    fut: F,
    io_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<T>
where F: Future<Output = Result<T>> {
    tokio::select! {
        _ = cancel.cancelled() => Err(ZkError::Closing),
        res = tokio::time::timeout(io_timeout, fut) => {
            match res {
                Ok(inner) => inner,
                Err(_) => {
                    warn!("{label} timed out after {io_timeout:?}");
                    Err(ZkError::OperationTimeout)
                },
            }
        }
    }
}
