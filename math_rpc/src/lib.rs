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

//! Bindings for the `test.Math` service defined in `proto/test.proto`.
//!
//! - [`MathClient`] exposes one method per RPC. The unary `div` returns the
//!   response directly; the streaming methods return typed stream wrappers.
//! - [`Math`] is the trait a service implementation provides, and
//!   [`register_math_service`] wires an implementation into a
//!   [`stream_rpc::Server`].
//! - [`MathService`] is a reference implementation.

pub mod client;
pub mod server;
pub mod service;

pub mod proto {
    pub mod test {
        // Do not lint generated code.
        #![allow(clippy::all, clippy::pedantic, clippy::nursery)]

        include!("../generated/test.rs");
    }
}

pub use crate::{
    client::{DivManyClient, FibClient, MathClient, SumClient},
    server::{
        register_math_service, DivManyServer, FibServer, Math, SumServer, MATH_SERVICE_DESCRIPTOR,
    },
    service::MathService,
};

pub const SERVICE_NAME: &str = "test.Math";
pub const DIV_METHOD: &str = "/test.Math/Div";
pub const DIV_MANY_METHOD: &str = "/test.Math/DivMany";
pub const FIB_METHOD: &str = "/test.Math/Fib";
pub const SUM_METHOD: &str = "/test.Math/Sum";
