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

use std::time::Duration;

use crate::context::{Context, Metadata};

/// Metadata key used to advertise the message encoding of a call.
pub const ENCODING_METADATA_KEY: &str = "grpc-encoding";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    #[default]
    Identity,
    Gzip,
}

impl Compression {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::Identity => "identity",
            Compression::Gzip => "gzip",
        }
    }
}

/// Per-call options recognized by the transport.
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    /// Deadline override, relative to the start of the call. The earlier of
    /// this and the context deadline applies.
    pub timeout: Option<Duration>,

    /// Message compression requested for the call.
    pub compression: Compression,

    /// Metadata sent with the call. Entries override context metadata with
    /// the same key.
    pub metadata: Metadata,
}

impl CallOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Derives the context of a single call from the caller's context.
    ///
    /// The returned context is a child of `context`, so cancelling the caller's
    /// context cancels the call, and the call can be cancelled on its own.
    pub fn apply(&self, context: &Context) -> Context {
        let mut call_context = context.child();
        if let Some(timeout) = self.timeout {
            call_context = call_context.with_timeout(timeout);
        }
        call_context.metadata_mut().extend(self.metadata.clone());
        if self.compression != Compression::Identity {
            call_context
                .metadata_mut()
                .insert(ENCODING_METADATA_KEY.to_string(), self.compression.as_str().to_string());
        }
        call_context
    }
}
