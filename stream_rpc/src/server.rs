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

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use futures::future::BoxFuture;
use log::{debug, warn};

use crate::{
    context::Context,
    descriptor::{method_path, ServiceDescriptor},
    error::Error,
    status::{Status, StatusCode},
    transport::ServerStream,
};

type BoundUnaryHandler =
    Arc<dyn Fn(Context, Vec<u8>) -> BoxFuture<'static, Result<Vec<u8>, Status>> + Send + Sync>;

type BoundStreamHandler =
    Arc<dyn Fn(Box<dyn ServerStream>) -> BoxFuture<'static, Result<(), Status>> + Send + Sync>;

/// A descriptor handler bound to the service instance it was registered with.
#[derive(Clone)]
enum Handler {
    Unary(BoundUnaryHandler),
    Stream(BoundStreamHandler),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MethodKind {
    Unary,
    Stream,
}

/// Dispatch table mapping full method paths to registered handlers.
#[derive(Default)]
pub struct Server {
    services: BTreeSet<&'static str>,
    handlers: BTreeMap<String, Handler>,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every method and stream of `descriptor`, served by `service`.
    pub fn register_service<S>(
        &mut self,
        descriptor: &'static ServiceDescriptor<S>,
        service: Arc<S>,
    ) -> anyhow::Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        if !self.services.insert(descriptor.service_name) {
            anyhow::bail!("duplicate service registration for {}", descriptor.service_name);
        }
        for method in descriptor.methods {
            let service = service.clone();
            let handler = method.handler;
            self.handlers.insert(
                method_path(descriptor.service_name, method.method_name),
                Handler::Unary(Arc::new(move |context: Context, request: Vec<u8>| {
                    handler(service.clone(), context, request)
                })),
            );
        }
        for stream in descriptor.streams {
            let service = service.clone();
            let handler = stream.handler;
            self.handlers.insert(
                method_path(descriptor.service_name, stream.stream_name),
                Handler::Stream(Arc::new(move |server_stream: Box<dyn ServerStream>| {
                    handler(service.clone(), server_stream)
                })),
            );
        }
        debug!(
            "registered service {} with {} methods and {} streams",
            descriptor.service_name,
            descriptor.methods.len(),
            descriptor.streams.len()
        );
        Ok(())
    }

    pub fn method_kind(&self, method: &str) -> Option<MethodKind> {
        self.handlers.get(method).map(|handler| match handler {
            Handler::Unary(_) => MethodKind::Unary,
            Handler::Stream(_) => MethodKind::Stream,
        })
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Serves a single call arriving on `stream`, returning its final status.
    ///
    /// Unary methods read exactly one request from the stream and send back
    /// exactly one response. Streaming methods own the stream until their
    /// handler returns.
    pub async fn serve_stream(
        &self,
        method: &str,
        stream: Box<dyn ServerStream>,
    ) -> Result<(), Status> {
        let Some(handler) = self.handlers.get(method).cloned() else {
            warn!("received call for unknown method {method}");
            return Err(Status::new_with_message(
                StatusCode::Unimplemented,
                format!("unknown method {method}"),
            ));
        };
        debug!("dispatching call to {method}");
        match handler {
            Handler::Unary(handler) => {
                let request = stream.receive_message().await.map_err(|err| match err {
                    Error::EndOfStream => Status::new_with_message(
                        StatusCode::Internal,
                        format!("no request received for unary method {method}"),
                    ),
                    err => err.into(),
                })?;
                let response = handler(stream.context().clone(), request).await?;
                stream.send_message(response).await.map_err(Status::from)
            }
            Handler::Stream(handler) => handler(stream).await,
        }
    }
}
