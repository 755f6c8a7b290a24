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

use futures::Stream;
use stream_rpc::{codec, CallOptions, ClientStream, Connection, Context, Error};

use crate::{
    proto::test::{DivArgs, DivReply, FibArgs, Num},
    DIV_MANY_METHOD, DIV_METHOD, FIB_METHOD, SUM_METHOD,
};

pub struct MathClient<C: Connection> {
    connection: C,
}

impl<C: Connection> MathClient<C> {
    pub fn new(connection: C) -> Self {
        Self { connection }
    }

    pub async fn div(
        &self,
        context: &Context,
        request: &DivArgs,
        options: CallOptions,
    ) -> Result<DivReply, Error> {
        let response = self
            .connection
            .invoke(context, DIV_METHOD, codec::encode(request), &options)
            .await?;
        codec::decode(&response)
    }

    pub async fn div_many(
        &self,
        context: &Context,
        options: CallOptions,
    ) -> Result<DivManyClient, Error> {
        let stream = self.connection.new_client_stream(context, DIV_MANY_METHOD, &options).await?;
        Ok(DivManyClient { stream })
    }

    /// Sends the single request and closes the sending direction before
    /// returning the stream.
    pub async fn fib(
        &self,
        context: &Context,
        request: &FibArgs,
        options: CallOptions,
    ) -> Result<FibClient, Error> {
        let stream = self.connection.new_client_stream(context, FIB_METHOD, &options).await?;
        stream.send_message(codec::encode(request)).await?;
        stream.close_send().await?;
        Ok(FibClient { stream })
    }

    pub async fn sum(&self, context: &Context, options: CallOptions) -> Result<SumClient, Error> {
        let stream = self.connection.new_client_stream(context, SUM_METHOD, &options).await?;
        Ok(SumClient { stream })
    }
}

/// Client side of `DivMany`. Sending and receiving are independent; call
/// [`DivManyClient::close_send`] once all requests have been sent.
pub struct DivManyClient {
    stream: Box<dyn ClientStream>,
}

impl DivManyClient {
    pub async fn send(&self, message: &DivArgs) -> Result<(), Error> {
        self.stream.send_message(codec::encode(message)).await
    }

    pub async fn recv(&self) -> Result<DivReply, Error> {
        codec::decode(&self.stream.receive_message().await?)
    }

    pub async fn close_send(&self) -> Result<(), Error> {
        self.stream.close_send().await
    }
}

/// Client side of `Fib`.
pub struct FibClient {
    stream: Box<dyn ClientStream>,
}

impl FibClient {
    pub async fn recv(&self) -> Result<Num, Error> {
        codec::decode(&self.stream.receive_message().await?)
    }

    /// Adapts repeated [`FibClient::recv`] calls into a [`Stream`] that ends at
    /// [`Error::EndOfStream`], or right after yielding any other error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Num, Error>> {
        futures::stream::unfold(Some(self), |client| async move {
            let client = client?;
            match client.recv().await {
                Ok(num) => Some((Ok(num), Some(client))),
                Err(Error::EndOfStream) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }
}

/// Client side of `Sum`.
pub struct SumClient {
    stream: Box<dyn ClientStream>,
}

impl SumClient {
    pub async fn send(&self, message: &Num) -> Result<(), Error> {
        self.stream.send_message(codec::encode(message)).await
    }

    /// Closes the sending direction and reads the single response.
    ///
    /// The stream is read once more after the response, and must report
    /// [`Error::EndOfStream`]; a second message is reported as
    /// [`Error::ProtocolViolation`].
    pub async fn close_and_recv(self) -> Result<Num, Error> {
        self.stream.close_send().await?;
        let response = codec::decode(&self.stream.receive_message().await?)?;
        match self.stream.receive_message().await {
            Err(Error::EndOfStream) => Ok(response),
            Ok(_) => Err(Error::ProtocolViolation(
                "no end of stream after the response of a client streaming call".to_string(),
            )),
            Err(err) => Err(err),
        }
    }
}
