// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements command-line argument parsing.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// The udns authoritative and forwarding DNS server
#[derive(Debug, Parser)]
#[command(author, version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the server
    Run(RunArgs),

    /// Write each zone file back out to <FILE>new with the SOA serial
    /// incremented
    Rewrite(RewriteArgs),
}

#[derive(Debug, Parser)]
#[command(group(ArgGroup::new("required").required(true).args(["config", "zones"])))]
pub struct RunArgs {
    /// Set the configuration file to use
    #[arg(
        long,
        conflicts_with_all = ["bind", "ip", "port", "zones", "forwarders"],
        value_name = "FILE"
    )]
    pub config: Option<PathBuf>,

    /// Set the server bind IP address and port
    #[arg(long, value_name = "IP:PORT")]
    pub bind: Option<SocketAddr>,

    /// Set the server bind IP address
    #[arg(long, conflicts_with = "bind", value_name = "IP")]
    pub ip: Option<IpAddr>,

    /// Set the server port
    #[arg(long, conflicts_with = "bind", value_name = "PORT")]
    pub port: Option<u16>,

    /// Serve the zone files matching a glob pattern
    #[arg(long, value_name = "GLOB")]
    pub zones: Option<String>,

    /// Add an upstream server for queries outside the served zones
    #[arg(long = "forwarder", value_name = "HOST:PORT:TRANSPORT")]
    pub forwarders: Vec<String>,
}

#[derive(Debug, Parser)]
pub struct RewriteArgs {
    /// The zone files to rewrite
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,
}
