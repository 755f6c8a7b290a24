//
// Copyright 2026 The Project Oak Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Deadline and cancellation carrier for calls.

use std::{collections::BTreeMap, future::Future, time::Duration};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Error,
    status::{Status, StatusCode},
};

/// Key/value pairs sent alongside a call.
pub type Metadata = BTreeMap<String, String>;

/// Carries the deadline, cancellation signal and metadata of a call.
///
/// A [`Context`] is cheap to clone; clones share the same cancellation token.
/// The transport is responsible for honoring it: the stubs only pass it along.
#[derive(Clone, Debug, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancellation_token: CancellationToken,
    metadata: Metadata,
}

impl Context {
    /// A context with no deadline, no metadata and a fresh cancellation token.
    pub fn background() -> Self {
        Self::default()
    }

    /// Sets the deadline, keeping the existing one if it is earlier.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Sets the deadline to `timeout` from now. A timeout too large to be
    /// represented as an instant leaves the context unchanged.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    pub fn with_cancellation_token(mut self, cancellation_token: CancellationToken) -> Self {
        self.cancellation_token = cancellation_token;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Derives a context for a nested operation: same deadline and metadata,
    /// with a cancellation token that is cancelled whenever this context is,
    /// but that can also be cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            deadline: self.deadline,
            cancellation_token: self.cancellation_token.child_token(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub(crate) fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    pub fn cancel(&self) {
        self.cancellation_token.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Returns the status of a context that is already done, without waiting.
    pub fn check(&self) -> Result<(), Status> {
        if self.is_cancelled() {
            return Err(cancelled_status());
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Err(deadline_exceeded_status()),
            _ => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline has passed, with
    /// the status describing why.
    pub async fn done(&self) -> Status {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.cancellation_token.cancelled() => cancelled_status(),
                _ = tokio::time::sleep_until(deadline) => deadline_exceeded_status(),
            },
            None => {
                self.cancellation_token.cancelled().await;
                cancelled_status()
            }
        }
    }

    /// Runs `future` to completion unless the context finishes first, in which
    /// case the corresponding [`Error::Transport`] is returned.
    pub async fn guard<T, F>(&self, future: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        tokio::select! {
            biased;
            status = self.done() => Err(Error::Transport(status)),
            result = future => result,
        }
    }
}

fn cancelled_status() -> Status {
    Status::new_with_message(StatusCode::Cancelled, "context cancelled")
}

fn deadline_exceeded_status() -> Status {
    Status::new_with_message(StatusCode::DeadlineExceeded, "context deadline exceeded")
}
