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

//! A [`Connection`] serving calls from a [`Server`] in the same process.
//!
//! Each call gets a pair of bounded channels, one per direction, and a task
//! running the server handler. When the handler returns, its status is sent
//! after all response messages as the trailer of the stream.

use std::sync::Arc;

use log::debug;
use tokio::sync::{mpsc, Mutex};

use crate::{
    context::Context,
    error::Error,
    options::CallOptions,
    server::Server,
    status::{Status, StatusCode},
    transport::{ClientStream, Connection, ServerStream},
};

#[derive(Clone, Debug)]
pub struct InProcessConfig {
    /// Number of messages each direction of a stream can hold before the
    /// sender has to wait.
    pub buffer_size: usize,
}

impl Default for InProcessConfig {
    fn default() -> Self {
        Self { buffer_size: 16 }
    }
}

pub struct InProcessChannel {
    server: Arc<Server>,
    config: InProcessConfig,
}

impl InProcessChannel {
    pub fn new(server: Arc<Server>) -> Self {
        Self::with_config(server, InProcessConfig::default())
    }

    pub fn with_config(server: Arc<Server>, config: InProcessConfig) -> Self {
        Self { server, config }
    }
}

enum Frame {
    Message(Vec<u8>),
    Trailer(Result<(), Status>),
}

#[async_trait::async_trait]
impl Connection for InProcessChannel {
    async fn invoke(
        &self,
        context: &Context,
        method: &str,
        request: Vec<u8>,
        options: &CallOptions,
    ) -> Result<Vec<u8>, Error> {
        let stream = self.new_client_stream(context, method, options).await?;
        // If the server already finished, its status is read below.
        match stream.send_message(request).await {
            Ok(()) | Err(Error::EndOfStream) => {}
            Err(err) => return Err(err),
        }
        stream.close_send().await?;
        let response = stream.receive_message().await.map_err(|err| match err {
            Error::EndOfStream => Error::Transport(Status::new_with_message(
                StatusCode::Internal,
                format!("no response received for unary method {method}"),
            )),
            err => err,
        })?;
        match stream.receive_message().await {
            Err(Error::EndOfStream) => Ok(response),
            Ok(_) => Err(Error::ProtocolViolation(format!(
                "more than one response received for unary method {method}"
            ))),
            Err(err) => Err(err),
        }
    }

    async fn new_client_stream(
        &self,
        context: &Context,
        method: &str,
        options: &CallOptions,
    ) -> Result<Box<dyn ClientStream>, Error> {
        let call_context = options.apply(context);
        call_context.check()?;

        let (request_sender, request_receiver) = mpsc::channel(self.config.buffer_size);
        let (response_sender, response_receiver) = mpsc::channel(self.config.buffer_size);

        let server_context = call_context.child();
        let server_stream = InProcessServerStream {
            context: server_context.clone(),
            requests: Mutex::new(request_receiver),
            responses: response_sender.clone(),
        };
        let server = self.server.clone();
        let method_name = method.to_string();
        debug!("opening stream for {method_name}");
        tokio::spawn(async move {
            let status = tokio::select! {
                biased;
                status = server_context.done() => Err(status),
                result = server.serve_stream(&method_name, Box::new(server_stream)) => result,
            };
            debug!("call to {method_name} finished with {status:?}");
            if response_sender.send(Frame::Trailer(status)).await.is_err() {
                debug!("client went away before receiving the status of {method_name}");
            }
        });

        Ok(Box::new(InProcessClientStream {
            context: call_context,
            requests: Mutex::new(Some(request_sender)),
            responses: Mutex::new(ResponseState { receiver: response_receiver, outcome: None }),
        }))
    }
}

struct ResponseState {
    receiver: mpsc::Receiver<Frame>,
    /// Final outcome of the call once observed. Later receives repeat it.
    outcome: Option<Result<(), Status>>,
}

struct InProcessClientStream {
    context: Context,
    requests: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    responses: Mutex<ResponseState>,
}

fn outcome_error(outcome: Result<(), Status>) -> Error {
    match outcome {
        Ok(()) => Error::EndOfStream,
        Err(status) => Error::Transport(status),
    }
}

#[async_trait::async_trait]
impl ClientStream for InProcessClientStream {
    async fn send_message(&self, message: Vec<u8>) -> Result<(), Error> {
        let sender = self.requests.lock().await.clone().ok_or_else(|| {
            Error::Transport(Status::new_with_message(
                StatusCode::FailedPrecondition,
                "send after close_send",
            ))
        })?;
        // A closed request channel means the server has finished; the caller
        // learns the final status from `receive_message`.
        self.context
            .guard(async move { sender.send(message).await.map_err(|_| Error::EndOfStream) })
            .await
    }

    async fn receive_message(&self) -> Result<Vec<u8>, Error> {
        let mut state = self.responses.lock().await;
        if let Some(outcome) = &state.outcome {
            return Err(outcome_error(outcome.clone()));
        }
        let receiver = &mut state.receiver;
        let frame = self.context.guard(async move { Ok(receiver.recv().await) }).await;
        let outcome = match frame {
            Ok(Some(Frame::Message(message))) => return Ok(message),
            Ok(Some(Frame::Trailer(status))) => status,
            Ok(None) => Err(Status::new_with_message(
                StatusCode::Internal,
                "stream closed without a status",
            )),
            Err(err) => Err(Status::from(err)),
        };
        state.outcome = Some(outcome.clone());
        Err(outcome_error(outcome))
    }

    async fn close_send(&self) -> Result<(), Error> {
        self.requests.lock().await.take();
        Ok(())
    }
}

impl Drop for InProcessClientStream {
    fn drop(&mut self) {
        // Abandoning the stream ends the call on the server side as well.
        self.context.cancel();
    }
}

struct InProcessServerStream {
    context: Context,
    requests: Mutex<mpsc::Receiver<Vec<u8>>>,
    responses: mpsc::Sender<Frame>,
}

#[async_trait::async_trait]
impl ServerStream for InProcessServerStream {
    fn context(&self) -> &Context {
        &self.context
    }

    async fn send_message(&self, message: Vec<u8>) -> Result<(), Error> {
        let responses = &self.responses;
        self.context
            .guard(async move {
                responses.send(Frame::Message(message)).await.map_err(|_| {
                    Error::Transport(Status::new_with_message(
                        StatusCode::Cancelled,
                        "client went away",
                    ))
                })
            })
            .await
    }

    async fn receive_message(&self) -> Result<Vec<u8>, Error> {
        let mut requests = self.requests.lock().await;
        let requests = &mut *requests;
        self.context.guard(async move { requests.recv().await.ok_or(Error::EndOfStream) }).await
    }
}
