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

use core::{fmt, result};

use crate::status::{Status, StatusCode};

/// An error observed by a caller of a stub or stream wrapper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A failure reported by the underlying connection or stream, including
    /// encoding failures, deadlines and cancellation. Never retried.
    Transport(Status),

    /// The peer finished the stream normally. This is a sentinel rather than a
    /// failure.
    EndOfStream,

    /// The peer sent more messages than the call shape allows.
    ProtocolViolation(String),
}

impl Error {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream)
    }

    /// Returns the transport status carried by this error, if any.
    pub fn status(&self) -> Option<&Status> {
        match self {
            Error::Transport(status) => Some(status),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(status) => write!(f, "transport error: {status}"),
            Error::EndOfStream => f.write_str("end of stream"),
            Error::ProtocolViolation(message) => write!(f, "protocol violation: {message}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Error::Transport(status)
    }
}

/// Converts a stream error into the final status of a server handler, so that
/// implementations can use `?` on stream operations.
impl From<Error> for Status {
    fn from(error: Error) -> Self {
        match error {
            Error::Transport(status) => status,
            Error::EndOfStream => {
                Status::new_with_message(StatusCode::Internal, "unexpected end of stream")
            }
            Error::ProtocolViolation(message) => {
                Status::new_with_message(StatusCode::Internal, message)
            }
        }
    }
}

pub type Result<T> = result::Result<T, Error>;
