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

//! Runs each `test.Math` call once against the reference service, over an
//! in-process channel.

use std::{sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use futures::TryStreamExt;
use log::info;
use math_rpc::{
    proto::test::{DivArgs, FibArgs, Num},
    register_math_service, MathClient, MathService,
};
use stream_rpc::{CallOptions, Context, Error, InProcessChannel, InProcessConfig, Server};

#[derive(Parser, Clone, Debug)]
#[command(about = "Math service demo")]
struct Args {
    #[arg(long, default_value_t = 73)]
    dividend: i64,

    #[arg(long, default_value_t = 5)]
    divisor: i64,

    /// Number of Fibonacci values to request. Zero requests values until they
    /// overflow an int64.
    #[arg(long, default_value_t = 10)]
    fib_limit: i64,

    /// Values added up by the Sum call.
    #[arg(long, value_delimiter = ',', default_value = "1,2,3,4,5")]
    values: Vec<i64>,

    /// Deadline for the whole run, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Messages buffered per stream direction.
    #[arg(long, default_value_t = 16)]
    buffer_size: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut server = Server::new();
    register_math_service(&mut server, Arc::new(MathService))
        .context("Couldn't register Math service")?;
    let channel = InProcessChannel::with_config(
        Arc::new(server),
        InProcessConfig { buffer_size: args.buffer_size },
    );
    let client = MathClient::new(channel);

    let context = match args.timeout_ms {
        Some(timeout_ms) => Context::background().with_timeout(Duration::from_millis(timeout_ms)),
        None => Context::background(),
    };
    let options = CallOptions::default();

    let request = DivArgs { dividend: args.dividend, divisor: args.divisor };
    let reply = client.div(&context, &request, options.clone()).await.context("Div failed")?;
    println!(
        "Div: {} / {} = {} remainder {}",
        args.dividend, args.divisor, reply.quotient, reply.remainder
    );

    let div_many =
        client.div_many(&context, options.clone()).await.context("Couldn't open DivMany")?;
    let divisors: Vec<i64> = (0..3).map(|offset| args.divisor + offset).collect();
    let send_all = async {
        for divisor in &divisors {
            let request = DivArgs { dividend: args.dividend, divisor: *divisor };
            if let Err(err) = div_many.send(&request).await {
                // The server finished early; `recv` reports its status.
                if err.is_end_of_stream() {
                    break;
                }
                return Err(err);
            }
        }
        div_many.close_send().await
    };
    let receive_all = async {
        let mut replies = vec![];
        loop {
            match div_many.recv().await {
                Ok(reply) => replies.push(reply),
                Err(Error::EndOfStream) => return Ok(replies),
                Err(err) => return Err(err),
            }
        }
    };
    let ((), replies) = tokio::try_join!(send_all, receive_all).context("DivMany failed")?;
    for (divisor, reply) in divisors.iter().zip(&replies) {
        println!(
            "DivMany: {} / {} = {} remainder {}",
            args.dividend, divisor, reply.quotient, reply.remainder
        );
    }

    let fib = client
        .fib(&context, &FibArgs { limit: args.fib_limit }, options.clone())
        .await
        .context("Couldn't open Fib")?;
    let numbers: Vec<i64> =
        fib.into_stream().map_ok(|num| num.num).try_collect().await.context("Fib failed")?;
    println!("Fib: {numbers:?}");

    let sum = client.sum(&context, options).await.context("Couldn't open Sum")?;
    for value in &args.values {
        sum.send(&Num { num: *value }).await.context("Couldn't send Sum value")?;
    }
    let total = sum.close_and_recv().await.context("Sum failed")?;
    println!("Sum: {:?} = {}", args.values, total.num);

    info!("all calls finished");
    Ok(())
}
