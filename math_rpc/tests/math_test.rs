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

//! Tests for the `test.Math` bindings, first against a scripted transport and
//! then end to end against [`MathService`] over an in-process channel.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use futures::TryStreamExt;
use math_rpc::{
    proto::test::{DivArgs, DivReply, FibArgs, Num},
    register_math_service, MathClient, MathService, DIV_MANY_METHOD, DIV_METHOD, FIB_METHOD,
    MATH_SERVICE_DESCRIPTOR, SUM_METHOD,
};
use prost::Message;
use stream_rpc::{
    codec, CallOptions, ClientStream, Connection, Context, Error, InProcessChannel,
    InProcessConfig, MethodKind, Server, Status, StatusCode,
};

/// Everything the bindings asked the transport to do, in order.
#[derive(Clone, Debug, PartialEq)]
enum Operation {
    Invoke { method: String, request: Vec<u8> },
    Open { method: String },
    Send(Vec<u8>),
    CloseSend,
    Receive,
}

#[derive(Default)]
struct MockTransport {
    operations: Vec<Operation>,
    unary_response: Option<Result<Vec<u8>, Error>>,
    /// Replayed by `receive_message`; an empty queue reads as end of stream.
    stream_responses: VecDeque<Result<Vec<u8>, Error>>,
}

/// A [`Connection`] that records calls and replays scripted responses. Clones
/// share the same transport, so tests keep one for verification.
#[derive(Clone, Default)]
struct MockConnection {
    transport: Arc<Mutex<MockTransport>>,
}

impl MockConnection {
    fn set_unary_response(&self, response: Result<Vec<u8>, Error>) {
        self.transport.lock().expect("failed to lock transport").unary_response = Some(response);
    }

    fn add_stream_response(&self, response: Result<Vec<u8>, Error>) {
        self.transport
            .lock()
            .expect("failed to lock transport")
            .stream_responses
            .push_back(response);
    }

    fn take_operations(&self) -> Vec<Operation> {
        std::mem::take(&mut self.transport.lock().expect("failed to lock transport").operations)
    }

    fn record(&self, operation: Operation) {
        self.transport.lock().expect("failed to lock transport").operations.push(operation);
    }
}

#[async_trait::async_trait]
impl Connection for MockConnection {
    async fn invoke(
        &self,
        _context: &Context,
        method: &str,
        request: Vec<u8>,
        _options: &CallOptions,
    ) -> Result<Vec<u8>, Error> {
        self.record(Operation::Invoke { method: method.to_string(), request });
        self.transport
            .lock()
            .expect("failed to lock transport")
            .unary_response
            .clone()
            .expect("no unary response scripted")
    }

    async fn new_client_stream(
        &self,
        _context: &Context,
        method: &str,
        _options: &CallOptions,
    ) -> Result<Box<dyn ClientStream>, Error> {
        self.record(Operation::Open { method: method.to_string() });
        Ok(Box::new(MockStream { connection: self.clone() }))
    }
}

struct MockStream {
    connection: MockConnection,
}

#[async_trait::async_trait]
impl ClientStream for MockStream {
    async fn send_message(&self, message: Vec<u8>) -> Result<(), Error> {
        self.connection.record(Operation::Send(message));
        Ok(())
    }

    async fn receive_message(&self) -> Result<Vec<u8>, Error> {
        self.connection.record(Operation::Receive);
        self.connection
            .transport
            .lock()
            .expect("failed to lock transport")
            .stream_responses
            .pop_front()
            .unwrap_or(Err(Error::EndOfStream))
    }

    async fn close_send(&self) -> Result<(), Error> {
        self.connection.record(Operation::CloseSend);
        Ok(())
    }
}

fn num(num: i64) -> Num {
    Num { num }
}

fn unavailable() -> Error {
    Error::Transport(Status::new_with_message(StatusCode::Unavailable, "connection reset"))
}

#[tokio::test]
async fn div_invokes_once_and_decodes_response() {
    let connection = MockConnection::default();
    connection.set_unary_response(Ok(codec::encode(&DivReply { quotient: 3, remainder: 1 })));
    let client = MathClient::new(connection.clone());

    let request = DivArgs { dividend: 7, divisor: 2 };
    let response = client.div(&Context::background(), &request, CallOptions::default()).await;

    assert_eq!(response, Ok(DivReply { quotient: 3, remainder: 1 }));
    assert_eq!(
        connection.take_operations(),
        vec![Operation::Invoke { method: DIV_METHOD.to_string(), request: request.encode_to_vec() }]
    );
}

#[tokio::test]
async fn div_returns_transport_error_unchanged() {
    let connection = MockConnection::default();
    connection.set_unary_response(Err(unavailable()));
    let client = MathClient::new(connection);

    let response = client
        .div(&Context::background(), &DivArgs { dividend: 1, divisor: 1 }, CallOptions::default())
        .await;

    assert_eq!(response, Err(unavailable()));
}

#[tokio::test]
async fn div_reports_undecodable_response() {
    let connection = MockConnection::default();
    connection.set_unary_response(Ok(vec![0xff, 0xff, 0xff]));
    let client = MathClient::new(connection);

    let response = client
        .div(&Context::background(), &DivArgs { dividend: 1, divisor: 1 }, CallOptions::default())
        .await;

    let status = response.expect_err("decoding should fail");
    assert_eq!(status.status().map(|status| status.code), Some(StatusCode::Internal));
}

#[tokio::test]
async fn sum_returns_single_response() {
    let connection = MockConnection::default();
    connection.add_stream_response(Ok(codec::encode(&num(6))));
    let client = MathClient::new(connection.clone());

    let sum = client.sum(&Context::background(), CallOptions::default()).await.expect("open");
    for value in 1..=3 {
        sum.send(&num(value)).await.expect("send");
    }

    assert_eq!(sum.close_and_recv().await, Ok(num(6)));
    assert_eq!(
        connection.take_operations(),
        vec![
            Operation::Open { method: SUM_METHOD.to_string() },
            Operation::Send(num(1).encode_to_vec()),
            Operation::Send(num(2).encode_to_vec()),
            Operation::Send(num(3).encode_to_vec()),
            Operation::CloseSend,
            Operation::Receive,
            Operation::Receive,
        ]
    );
}

#[tokio::test]
async fn sum_without_sends_is_legal() {
    let connection = MockConnection::default();
    connection.add_stream_response(Ok(codec::encode(&num(0))));
    let client = MathClient::new(connection);

    let sum = client.sum(&Context::background(), CallOptions::default()).await.expect("open");

    assert_eq!(sum.close_and_recv().await, Ok(num(0)));
}

#[tokio::test]
async fn sum_with_second_response_is_protocol_violation() {
    let connection = MockConnection::default();
    connection.add_stream_response(Ok(codec::encode(&num(1))));
    connection.add_stream_response(Ok(codec::encode(&num(2))));
    let client = MathClient::new(connection);

    let sum = client.sum(&Context::background(), CallOptions::default()).await.expect("open");
    let result = sum.close_and_recv().await;

    assert!(matches!(result, Err(Error::ProtocolViolation(_))), "{result:?}");
}

#[tokio::test]
async fn sum_passes_through_error_after_response() {
    let connection = MockConnection::default();
    connection.add_stream_response(Ok(codec::encode(&num(1))));
    connection.add_stream_response(Err(unavailable()));
    let client = MathClient::new(connection);

    let sum = client.sum(&Context::background(), CallOptions::default()).await.expect("open");

    assert_eq!(sum.close_and_recv().await, Err(unavailable()));
}

#[tokio::test]
async fn sum_without_response_is_end_of_stream() {
    let client = MathClient::new(MockConnection::default());

    let sum = client.sum(&Context::background(), CallOptions::default()).await.expect("open");

    assert_eq!(sum.close_and_recv().await, Err(Error::EndOfStream));
}

#[tokio::test]
async fn fib_sends_request_and_closes_before_returning() {
    let connection = MockConnection::default();
    for value in [0, 1, 1] {
        connection.add_stream_response(Ok(codec::encode(&num(value))));
    }
    let client = MathClient::new(connection.clone());

    let fib = client
        .fib(&Context::background(), &FibArgs { limit: 3 }, CallOptions::default())
        .await
        .expect("open");
    assert_eq!(
        connection.take_operations(),
        vec![
            Operation::Open { method: FIB_METHOD.to_string() },
            Operation::Send(FibArgs { limit: 3 }.encode_to_vec()),
            Operation::CloseSend,
        ]
    );

    assert_eq!(fib.recv().await, Ok(num(0)));
    assert_eq!(fib.recv().await, Ok(num(1)));
    assert_eq!(fib.recv().await, Ok(num(1)));
    assert_eq!(fib.recv().await, Err(Error::EndOfStream));
}

#[tokio::test]
async fn fib_stream_stops_after_error() {
    let connection = MockConnection::default();
    connection.add_stream_response(Ok(codec::encode(&num(0))));
    connection.add_stream_response(Err(unavailable()));
    connection.add_stream_response(Ok(codec::encode(&num(1))));
    let client = MathClient::new(connection);

    let fib = client
        .fib(&Context::background(), &FibArgs { limit: 0 }, CallOptions::default())
        .await
        .expect("open");
    let received: Vec<Result<Num, Error>> = futures::StreamExt::collect(fib.into_stream()).await;

    assert_eq!(received, vec![Ok(num(0)), Err(unavailable())]);
}

#[tokio::test]
async fn div_many_keeps_send_order() {
    let connection = MockConnection::default();
    connection.add_stream_response(Ok(codec::encode(&DivReply { quotient: 2, remainder: 0 })));
    let client = MathClient::new(connection.clone());

    let div_many =
        client.div_many(&Context::background(), CallOptions::default()).await.expect("open");
    div_many.send(&DivArgs { dividend: 4, divisor: 2 }).await.expect("send");
    assert_eq!(div_many.recv().await, Ok(DivReply { quotient: 2, remainder: 0 }));
    div_many.send(&DivArgs { dividend: 9, divisor: 3 }).await.expect("send");
    div_many.close_send().await.expect("close");
    assert_eq!(div_many.recv().await, Err(Error::EndOfStream));

    assert_eq!(
        connection.take_operations(),
        vec![
            Operation::Open { method: DIV_MANY_METHOD.to_string() },
            Operation::Send(DivArgs { dividend: 4, divisor: 2 }.encode_to_vec()),
            Operation::Receive,
            Operation::Send(DivArgs { dividend: 9, divisor: 3 }.encode_to_vec()),
            Operation::CloseSend,
            Operation::Receive,
        ]
    );
}

#[test]
fn messages_survive_encoding() {
    let args = DivArgs { dividend: i64::MIN, divisor: -7 };
    assert_eq!(codec::decode::<DivArgs>(&codec::encode(&args)), Ok(args));
    let reply = DivReply { quotient: -3, remainder: -1 };
    assert_eq!(codec::decode::<DivReply>(&codec::encode(&reply)), Ok(reply));
    assert_eq!(
        codec::decode::<FibArgs>(&codec::encode(&FibArgs { limit: 0 })),
        Ok(FibArgs::default())
    );
    assert_eq!(codec::decode::<Num>(&codec::encode(&num(i64::MAX))), Ok(num(i64::MAX)));
}

#[test]
fn registration_routes_every_method() {
    let mut server = Server::new();
    register_math_service(&mut server, Arc::new(MathService)).expect("failed to register");

    assert_eq!(server.method_kind(DIV_METHOD), Some(MethodKind::Unary));
    assert_eq!(server.method_kind(DIV_MANY_METHOD), Some(MethodKind::Stream));
    assert_eq!(server.method_kind(FIB_METHOD), Some(MethodKind::Stream));
    assert_eq!(server.method_kind(SUM_METHOD), Some(MethodKind::Stream));
    assert_eq!(server.method_names().count(), 4);
    assert_eq!(
        MATH_SERVICE_DESCRIPTOR.method_paths().collect::<Vec<_>>(),
        vec![DIV_METHOD, DIV_MANY_METHOD, FIB_METHOD, SUM_METHOD]
    );

    let shapes: Vec<_> = MATH_SERVICE_DESCRIPTOR
        .streams
        .iter()
        .map(|stream| (stream.stream_name, stream.client_streaming, stream.server_streaming))
        .collect();
    assert_eq!(shapes, vec![("DivMany", true, true), ("Fib", false, true), ("Sum", true, false)]);
}

#[test]
fn duplicate_registration_fails() {
    let mut server = Server::new();
    register_math_service(&mut server, Arc::new(MathService)).expect("failed to register");
    assert!(register_math_service(&mut server, Arc::new(MathService)).is_err());
}

fn math_client(buffer_size: usize) -> MathClient<InProcessChannel> {
    MathClient::new(math_channel(buffer_size))
}

fn math_channel(buffer_size: usize) -> InProcessChannel {
    let mut server = Server::new();
    register_math_service(&mut server, Arc::new(MathService)).expect("failed to register");
    InProcessChannel::with_config(Arc::new(server), InProcessConfig { buffer_size })
}

fn code<T: std::fmt::Debug>(result: Result<T, Error>) -> Option<StatusCode> {
    result.expect_err("call should fail").status().map(|status| status.code)
}

#[tokio::test]
async fn div_end_to_end() {
    let client = math_client(16);
    let context = Context::background();

    let reply = client
        .div(&context, &DivArgs { dividend: 73, divisor: 5 }, CallOptions::default())
        .await;
    assert_eq!(reply, Ok(DivReply { quotient: 14, remainder: 3 }));

    let by_zero =
        client.div(&context, &DivArgs { dividend: 1, divisor: 0 }, CallOptions::default()).await;
    assert_eq!(
        by_zero,
        Err(Error::Transport(Status::new_with_message(
            StatusCode::InvalidArgument,
            "divide by zero"
        )))
    );
}

#[tokio::test]
async fn div_many_end_to_end_with_concurrent_directions() {
    let client = math_client(1);
    let div_many =
        client.div_many(&Context::background(), CallOptions::default()).await.expect("open");

    let send_all = async {
        for divisor in 1..=50 {
            div_many.send(&DivArgs { dividend: 100, divisor }).await.expect("send");
        }
        div_many.close_send().await.expect("close");
    };
    let receive_all = async {
        let mut replies = vec![];
        loop {
            match div_many.recv().await {
                Ok(reply) => replies.push(reply),
                Err(Error::EndOfStream) => return replies,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }
    };
    let ((), replies) = tokio::join!(send_all, receive_all);

    let expected: Vec<_> = (1..=50)
        .map(|divisor| DivReply { quotient: 100 / divisor, remainder: 100 % divisor })
        .collect();
    assert_eq!(replies, expected);
}

#[tokio::test]
async fn div_many_stops_at_failing_division() {
    let client = math_client(16);
    let div_many =
        client.div_many(&Context::background(), CallOptions::default()).await.expect("open");

    div_many.send(&DivArgs { dividend: 4, divisor: 2 }).await.expect("send");
    div_many.send(&DivArgs { dividend: 1, divisor: 0 }).await.expect("send");
    div_many.close_send().await.expect("close");

    assert_eq!(div_many.recv().await, Ok(DivReply { quotient: 2, remainder: 0 }));
    assert_eq!(code(div_many.recv().await), Some(StatusCode::InvalidArgument));
    assert_eq!(code(div_many.recv().await), Some(StatusCode::InvalidArgument));
}

#[tokio::test]
async fn fib_end_to_end() {
    let client = math_client(16);
    let fib = client
        .fib(&Context::background(), &FibArgs { limit: 10 }, CallOptions::default())
        .await
        .expect("open");

    let values: Vec<i64> =
        fib.into_stream().map_ok(|num| num.num).try_collect().await.expect("fib failed");

    assert_eq!(values, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
}

#[tokio::test]
async fn unlimited_fib_ends_with_overflow() {
    let client = math_client(16);
    let fib = client
        .fib(&Context::background(), &FibArgs { limit: 0 }, CallOptions::default())
        .await
        .expect("open");

    let mut count = 0;
    let status = loop {
        match fib.recv().await {
            Ok(_) => count += 1,
            Err(err) => break err,
        }
    };

    // F(92) is the largest Fibonacci number that fits in an int64.
    assert_eq!(count, 93);
    assert_eq!(status.status().map(|status| status.code), Some(StatusCode::OutOfRange));
}

#[tokio::test]
async fn fib_rejects_negative_limit() {
    let client = math_client(16);
    let fib = client
        .fib(&Context::background(), &FibArgs { limit: -1 }, CallOptions::default())
        .await
        .expect("open");

    assert_eq!(code(fib.recv().await), Some(StatusCode::InvalidArgument));
}

#[tokio::test]
async fn sum_end_to_end() {
    let client = math_client(16);
    let sum = client.sum(&Context::background(), CallOptions::default()).await.expect("open");
    for value in [1, 2, 3, 4, -5] {
        sum.send(&num(value)).await.expect("send");
    }
    assert_eq!(sum.close_and_recv().await, Ok(num(5)));

    let empty = client.sum(&Context::background(), CallOptions::default()).await.expect("open");
    assert_eq!(empty.close_and_recv().await, Ok(num(0)));
}

#[tokio::test]
async fn sum_overflow_is_out_of_range() {
    let client = math_client(16);
    let sum = client.sum(&Context::background(), CallOptions::default()).await.expect("open");
    sum.send(&num(i64::MAX)).await.expect("send");
    sum.send(&num(1)).await.expect("send");

    assert_eq!(code(sum.close_and_recv().await), Some(StatusCode::OutOfRange));
}

#[tokio::test]
async fn fib_without_request_is_invalid_argument() {
    let channel = math_channel(16);
    let stream = channel
        .new_client_stream(&Context::background(), FIB_METHOD, &CallOptions::default())
        .await
        .expect("open");
    stream.close_send().await.expect("close");

    assert_eq!(
        stream.receive_message().await,
        Err(Error::Transport(Status::new_with_message(
            StatusCode::InvalidArgument,
            "missing Fib request"
        )))
    );
}

#[tokio::test]
async fn div_with_undecodable_request_is_internal() {
    let channel = math_channel(16);
    let response = channel
        .invoke(&Context::background(), DIV_METHOD, vec![0xff, 0xff, 0xff], &CallOptions::default())
        .await;

    assert_eq!(code(response), Some(StatusCode::Internal));
}
