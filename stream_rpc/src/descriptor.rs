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

//! Static metadata binding a service's methods to handler functions.
//!
//! Descriptors are meant to be declared as `static` items by generated code.
//! The type parameter `S` is the service implementation type the handlers
//! receive, usually a trait object such as `dyn Math`, so dispatch never needs
//! a runtime type check.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{context::Context, status::Status, transport::ServerStream};

/// Adapter for a unary method: decodes the request bytes, calls the service,
/// and returns the encoded response.
pub type UnaryHandler<S> =
    fn(Arc<S>, Context, Vec<u8>) -> BoxFuture<'static, Result<Vec<u8>, Status>>;

/// Adapter for a streaming method: wraps the stream in its typed view and
/// hands it to the service, which owns the rest of the call.
pub type StreamHandler<S> =
    fn(Arc<S>, Box<dyn ServerStream>) -> BoxFuture<'static, Result<(), Status>>;

pub struct ServiceDescriptor<S: ?Sized + 'static> {
    /// Fully qualified service name, e.g. `test.Math`.
    pub service_name: &'static str,
    pub methods: &'static [MethodDescriptor<S>],
    pub streams: &'static [StreamDescriptor<S>],
}

pub struct MethodDescriptor<S: ?Sized + 'static> {
    pub method_name: &'static str,
    pub handler: UnaryHandler<S>,
}

pub struct StreamDescriptor<S: ?Sized + 'static> {
    pub stream_name: &'static str,
    pub handler: StreamHandler<S>,
    pub client_streaming: bool,
    pub server_streaming: bool,
}

impl<S: ?Sized> ServiceDescriptor<S> {
    /// Full paths of every method and stream of this service.
    pub fn method_paths(&self) -> impl Iterator<Item = String> + '_ {
        self.methods
            .iter()
            .map(|method| method.method_name)
            .chain(self.streams.iter().map(|stream| stream.stream_name))
            .map(|name| method_path(self.service_name, name))
    }
}

/// Builds the wire-level routing key `/<service>/<method>`.
pub fn method_path(service_name: &str, method_name: &str) -> String {
    format!("/{service_name}/{method_name}")
}
