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

//! The transport surface consumed by generated stubs.
//!
//! Implementations own connection management, framing, deadlines and
//! cancellation. The stubs only move already encoded messages through these
//! traits.

use std::sync::Arc;

use crate::{context::Context, error::Error, options::CallOptions};

/// A client side connection able to perform calls identified by their full
/// method path, e.g. `/test.Math/Div`.
#[async_trait::async_trait]
pub trait Connection: Send + Sync {
    /// Performs a unary call: exactly one request, exactly one response.
    async fn invoke(
        &self,
        context: &Context,
        method: &str,
        request: Vec<u8>,
        options: &CallOptions,
    ) -> Result<Vec<u8>, Error>;

    /// Opens a duplex stream for any streaming call shape.
    async fn new_client_stream(
        &self,
        context: &Context,
        method: &str,
        options: &CallOptions,
    ) -> Result<Box<dyn ClientStream>, Error>;
}

#[async_trait::async_trait]
impl<C: Connection + ?Sized> Connection for Arc<C> {
    async fn invoke(
        &self,
        context: &Context,
        method: &str,
        request: Vec<u8>,
        options: &CallOptions,
    ) -> Result<Vec<u8>, Error> {
        (**self).invoke(context, method, request, options).await
    }

    async fn new_client_stream(
        &self,
        context: &Context,
        method: &str,
        options: &CallOptions,
    ) -> Result<Box<dyn ClientStream>, Error> {
        (**self).new_client_stream(context, method, options).await
    }
}

/// Client half of a call stream.
///
/// Sending and receiving are independent directions: one `send_message` and
/// one `receive_message` may be in flight at the same time. Concurrent calls
/// in the same direction must be serialized by the caller.
#[async_trait::async_trait]
pub trait ClientStream: Send + Sync {
    async fn send_message(&self, message: Vec<u8>) -> Result<(), Error>;

    /// Returns the next message, or [`Error::EndOfStream`] once the server has
    /// finished the call successfully.
    async fn receive_message(&self) -> Result<Vec<u8>, Error>;

    /// Signals that no further messages will be sent, without closing the
    /// receive direction.
    async fn close_send(&self) -> Result<(), Error>;
}

/// Server half of a call stream, handed to service handlers.
#[async_trait::async_trait]
pub trait ServerStream: Send + Sync {
    /// The context of the call, as seen by the server.
    fn context(&self) -> &Context;

    async fn send_message(&self, message: Vec<u8>) -> Result<(), Error>;

    /// Returns the next message, or [`Error::EndOfStream`] once the client has
    /// closed its sending direction.
    async fn receive_message(&self) -> Result<Vec<u8>, Error>;
}
