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

//! Runtime support for protobuf service stubs covering the four call shapes:
//! unary, client streaming, server streaming and bidirectional streaming.
//!
//! Generated stubs are thin typed wrappers over the [`Connection`],
//! [`ClientStream`] and [`ServerStream`] traits. Services are exposed by
//! registering a static [`ServiceDescriptor`] with a [`Server`], which
//! dispatches calls by their full method path (`/<package>.<Service>/<Method>`).
//! [`InProcessChannel`] connects clients to a [`Server`] in the same process.

pub mod codec;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod in_process;
pub mod options;
pub mod server;
pub mod status;
pub mod transport;


pub use crate::{
    context::{Context, Metadata},
    descriptor::{
        method_path, MethodDescriptor, ServiceDescriptor, StreamDescriptor, StreamHandler,
        UnaryHandler,
    },
    error::{Error, Result},
    in_process::{InProcessChannel, InProcessConfig},
    options::{CallOptions, Compression, ENCODING_METADATA_KEY},
    server::{MethodKind, Server},
    status::{Status, StatusCode},
    transport::{ClientStream, Connection, ServerStream},
};
