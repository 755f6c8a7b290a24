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

//! Reference implementation of the `test.Math` service.

use log::debug;
use stream_rpc::{Context, Error, Status, StatusCode};

use crate::{
    proto::test::{DivArgs, DivReply, FibArgs, Num},
    server::{DivManyServer, FibServer, Math, SumServer},
};

/// Integer arithmetic over `int64`, with truncated division.
#[derive(Clone, Copy, Debug, Default)]
pub struct MathService;

fn divide(args: &DivArgs) -> Result<DivReply, Status> {
    if args.divisor == 0 {
        return Err(Status::new_with_message(StatusCode::InvalidArgument, "divide by zero"));
    }
    match (args.dividend.checked_div(args.divisor), args.dividend.checked_rem(args.divisor)) {
        (Some(quotient), Some(remainder)) => Ok(DivReply { quotient, remainder }),
        _ => Err(Status::new_with_message(
            StatusCode::OutOfRange,
            format!("{} / {} overflows int64", args.dividend, args.divisor),
        )),
    }
}

#[async_trait::async_trait]
impl Math for MathService {
    async fn div(&self, _context: Context, request: DivArgs) -> Result<DivReply, Status> {
        debug!("Div {} / {}", request.dividend, request.divisor);
        divide(&request)
    }

    async fn div_many(&self, stream: DivManyServer) -> Result<(), Status> {
        let mut count = 0usize;
        loop {
            match stream.recv().await {
                Ok(request) => {
                    stream.send(&divide(&request)?).await?;
                    count += 1;
                }
                Err(Error::EndOfStream) => {
                    debug!("DivMany answered {count} requests");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn fib(&self, request: FibArgs, stream: FibServer) -> Result<(), Status> {
        if request.limit < 0 {
            return Err(Status::new_with_message(
                StatusCode::InvalidArgument,
                format!("negative limit {}", request.limit),
            ));
        }
        debug!("Fib with limit {}", request.limit);
        // `None` once the value no longer fits in an int64.
        let mut current = Some(0i64);
        let mut next = Some(1i64);
        let mut sent = 0i64;
        while request.limit == 0 || sent < request.limit {
            let Some(value) = current else {
                return Err(Status::new_with_message(
                    StatusCode::OutOfRange,
                    format!("Fibonacci number {sent} overflows int64"),
                ));
            };
            stream.send(&Num { num: value }).await?;
            sent += 1;
            let following = next.and_then(|next| next.checked_add(value));
            current = next;
            next = following;
        }
        Ok(())
    }

    async fn sum(&self, stream: SumServer) -> Result<(), Status> {
        let mut total = 0i64;
        loop {
            match stream.recv().await {
                Ok(Num { num }) => {
                    total = total.checked_add(num).ok_or_else(|| {
                        Status::new_with_message(StatusCode::OutOfRange, "sum overflows int64")
                    })?;
                }
                Err(Error::EndOfStream) => {
                    debug!("Sum finished with {total}");
                    return stream.send_and_close(&Num { num: total }).await.map_err(Status::from);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
