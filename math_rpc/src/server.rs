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

use std::sync::Arc;

use futures::future::BoxFuture;
use stream_rpc::{
    codec, Context, Error, MethodDescriptor, Server, ServerStream, ServiceDescriptor, Status,
    StatusCode, StreamDescriptor,
};

use crate::{
    proto::test::{DivArgs, DivReply, FibArgs, Num},
    SERVICE_NAME,
};

/// Server side of the `test.Math` service.
///
/// Each method owns its call until it returns. Returning `Ok` finishes the
/// call successfully, and returning a [`Status`] finishes it with that status.
#[async_trait::async_trait]
pub trait Math: Send + Sync + 'static {
    async fn div(&self, context: Context, request: DivArgs) -> Result<DivReply, Status>;

    async fn div_many(&self, stream: DivManyServer) -> Result<(), Status>;

    /// `request` has already been read from the stream.
    async fn fib(&self, request: FibArgs, stream: FibServer) -> Result<(), Status>;

    async fn sum(&self, stream: SumServer) -> Result<(), Status>;
}

pub struct DivManyServer {
    stream: Box<dyn ServerStream>,
}

impl DivManyServer {
    pub fn context(&self) -> &Context {
        self.stream.context()
    }

    pub async fn send(&self, message: &DivReply) -> Result<(), Error> {
        self.stream.send_message(codec::encode(message)).await
    }

    /// Returns [`Error::EndOfStream`] once the client has closed its side.
    pub async fn recv(&self) -> Result<DivArgs, Error> {
        codec::decode(&self.stream.receive_message().await?)
    }
}

pub struct FibServer {
    stream: Box<dyn ServerStream>,
}

impl FibServer {
    pub fn context(&self) -> &Context {
        self.stream.context()
    }

    pub async fn send(&self, message: &Num) -> Result<(), Error> {
        self.stream.send_message(codec::encode(message)).await
    }
}

pub struct SumServer {
    stream: Box<dyn ServerStream>,
}

impl SumServer {
    pub fn context(&self) -> &Context {
        self.stream.context()
    }

    pub async fn recv(&self) -> Result<Num, Error> {
        codec::decode(&self.stream.receive_message().await?)
    }

    /// Sends the single response. The call finishes when the handler returns.
    pub async fn send_and_close(self, message: &Num) -> Result<(), Error> {
        self.stream.send_message(codec::encode(message)).await
    }
}

fn div_handler(
    service: Arc<dyn Math>,
    context: Context,
    request: Vec<u8>,
) -> BoxFuture<'static, Result<Vec<u8>, Status>> {
    Box::pin(async move {
        let request: DivArgs = codec::decode(&request)?;
        let response = service.div(context, request).await?;
        Ok(codec::encode(&response))
    })
}

fn div_many_handler(
    service: Arc<dyn Math>,
    stream: Box<dyn ServerStream>,
) -> BoxFuture<'static, Result<(), Status>> {
    Box::pin(async move { service.div_many(DivManyServer { stream }).await })
}

fn fib_handler(
    service: Arc<dyn Math>,
    stream: Box<dyn ServerStream>,
) -> BoxFuture<'static, Result<(), Status>> {
    Box::pin(async move {
        let request: FibArgs = match stream.receive_message().await {
            Ok(request) => codec::decode(&request)?,
            Err(Error::EndOfStream) => {
                return Err(Status::new_with_message(
                    StatusCode::InvalidArgument,
                    "missing Fib request",
                ))
            }
            Err(err) => return Err(err.into()),
        };
        service.fib(request, FibServer { stream }).await
    })
}

fn sum_handler(
    service: Arc<dyn Math>,
    stream: Box<dyn ServerStream>,
) -> BoxFuture<'static, Result<(), Status>> {
    Box::pin(async move { service.sum(SumServer { stream }).await })
}

pub static MATH_SERVICE_DESCRIPTOR: ServiceDescriptor<dyn Math> = ServiceDescriptor {
    service_name: SERVICE_NAME,
    methods: &[MethodDescriptor { method_name: "Div", handler: div_handler }],
    streams: &[
        StreamDescriptor {
            stream_name: "DivMany",
            handler: div_many_handler,
            client_streaming: true,
            server_streaming: true,
        },
        StreamDescriptor {
            stream_name: "Fib",
            handler: fib_handler,
            client_streaming: false,
            server_streaming: true,
        },
        StreamDescriptor {
            stream_name: "Sum",
            handler: sum_handler,
            client_streaming: true,
            server_streaming: false,
        },
    ],
};

/// Registers `service` under `test.Math`. Fails if the server already serves
/// a service with that name.
pub fn register_math_service(server: &mut Server, service: Arc<dyn Math>) -> anyhow::Result<()> {
    server.register_service(&MATH_SERVICE_DESCRIPTOR, service)
}
