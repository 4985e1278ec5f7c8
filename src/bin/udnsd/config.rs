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

//! Implements the server configuration file.

use std::fmt::{self, Write};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::Level::Debug;
use log::{debug, log_enabled, warn, LevelFilter};
use paste::paste;
use serde::{de, Deserialize};

use crate::args::RunArgs;

////////////////////////////////////////////////////////////////////////
// CONFIGURATION LOADING                                              //
////////////////////////////////////////////////////////////////////////

/// Loads the server configuration from the file given by `path`.
///
/// The zone file pattern and log file path are interpreted relative to
/// the configuration file's directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let dir = match path.as_ref().parent() {
        Some(p) => p,
        None => return Err(anyhow!("the configuration file path has no parent")),
    };
    let raw_config = fs::read(path.as_ref()).context("failed to read the configuration file")?;
    let mut config: Config =
        toml::from_slice(&raw_config).context("failed to parse the configuration file")?;

    if Path::new(&config.dns.zones).is_relative() {
        let escaped_dir = glob::Pattern::escape(&dir.to_string_lossy());
        config.dns.zones = Path::new(&escaped_dir)
            .join(&config.dns.zones)
            .to_string_lossy()
            .into_owned();
    }
    if let Some(ref mut file) = config.log.file {
        if file.is_relative() {
            *file = dir.join(&*file);
        }
    }
    Ok(config)
}

/// Loads the server configuration from the parsed command line
/// arguments given by `args`.
pub fn load_from_args(args: RunArgs) -> Config {
    let (host, port) = match args.bind {
        Some(bind) => (bind.ip(), bind.port()),
        None => (
            args.ip.unwrap_or(DEFAULT_HOST),
            args.port.unwrap_or(DEFAULT_PORT),
        ),
    };
    Config {
        dns: DnsConfig {
            host,
            port,
            zones: args.zones.unwrap_or_default(),
            forwarders: args.forwarders,
        },
        log: LogConfig::default(),
    }
}

impl Config {
    pub fn bind(&self) -> SocketAddr {
        SocketAddr::new(self.dns.host, self.dns.port)
    }

    /// Expands the zone file pattern. Paths that cannot be read while
    /// matching are logged and skipped.
    pub fn zone_files(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in glob::glob(&self.dns.zones).context("invalid zone file pattern")? {
            match entry {
                Ok(path) => paths.push(path),
                Err(e) => warn!("Skipping {}: {}", e.path().display(), e.error()),
            }
        }
        Ok(paths)
    }

    /// Summarizes the configuration in the log, if the debug log level
    /// is enabled.
    pub fn log_summary(&self) {
        if !log_enabled!(Debug) {
            // Don't compute the message if it will never be printed.
            return;
        }

        let mut message = format!(
            "Configuration loaded:\n\
             Bind address: {}\n\
             Zone files:   {}\n\
             Forwarders:   ",
            self.bind(),
            self.dns.zones,
        );
        if self.dns.forwarders.is_empty() {
            message.push_str("none");
        } else {
            for forwarder in &self.dns.forwarders {
                write!(message, "\n  {forwarder}").unwrap();
            }
        }
        debug!("{}", message);
    }
}

/// The parts of a `HOST:PORT:TRANSPORT` forwarder specification.
#[derive(Debug, Eq, PartialEq)]
pub struct ForwarderSpec<'a> {
    pub host: &'a str,
    pub port: u16,
    pub transport: &'a str,
}

/// Splits a forwarder specification. The split is made from the right,
/// so that IPv6 hosts need no brackets.
pub fn parse_forwarder(spec: &str) -> Result<ForwarderSpec<'_>> {
    let mut fields = spec.rsplitn(3, ':');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(transport), Some(port), Some(host)) => Ok(ForwarderSpec {
            host,
            port: port
                .parse()
                .with_context(|| format!("invalid port {port:?}"))?,
            transport,
        }),
        _ => Err(anyhow!("expected HOST:PORT:TRANSPORT")),
    }
}

////////////////////////////////////////////////////////////////////////
// CONFIGURATION FILE STRUCTURE                                       //
////////////////////////////////////////////////////////////////////////

/// The complete configuration file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub dns: DnsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// The `[dns]` section: where to listen, what to serve and where to
/// forward.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DnsConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    pub zones: String,
    #[serde(default)]
    pub forwarders: Vec<String>,
}

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_PORT: u16 = 53;

fn default_host() -> IpAddr {
    DEFAULT_HOST
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// The `[log]` section.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: ConfigLevelFilter,
    pub file: Option<PathBuf>,
}

fn default_log_level() -> ConfigLevelFilter {
    ConfigLevelFilter(LevelFilter::Info)
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

////////////////////////////////////////////////////////////////////////
// WRAPPERS FOR SERDE                                                 //
////////////////////////////////////////////////////////////////////////

/// Generates a deserializable `ConfigX` structure wrapping an `X` type,
/// using its [`FromStr`](std::str::FromStr) implementation.
macro_rules! make_serde_wrapper {
    ($wrapper:ident, $over:ty, $description:literal) => {
        /// A macro-generated deserializable wrapper.
        #[derive(Clone, Debug)]
        pub struct $wrapper(pub $over);

        impl<'de> Deserialize<'de> for $wrapper {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: de::Deserializer<'de>,
            {
                deserializer.deserialize_str(paste! { [<$wrapper Visitor>] })
            }
        }

        paste! {
            /// A macro-generated [`Visitor`](de::Visitor).
            #[derive(Debug)]
            struct [<$wrapper Visitor>];
        }

        impl<'de> de::Visitor<'de> for paste! { [<$wrapper Visitor>] } {
            type Value = $wrapper;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str($description)
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value
                    .parse()
                    .map($wrapper)
                    .map_err(|e| E::custom(format!("invalid {}: {}", $description, e)))
            }
        }
    };
}

make_serde_wrapper!(ConfigLevelFilter, LevelFilter, "log level");

////////////////////////////////////////////////////////////////////////
// TESTS                                                              //
////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn full_file_is_loaded_relative_to_its_directory() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("zones")).unwrap();
        fs::write(dir.path().join("zones/a.zone"), "").unwrap();
        fs::write(dir.path().join("zones/b.zone"), "").unwrap();
        fs::write(dir.path().join("zones/notes.txt"), "").unwrap();
        let path = dir.path().join("udnsd.toml");
        fs::write(
            &path,
            "[dns]\n\
             host = \"::1\"\n\
             port = 5353\n\
             zones = \"zones/*.zone\"\n\
             forwarders = [\"192.0.2.53:53:udp\"]\n\
             [log]\n\
             level = \"debug\"\n\
             file = \"udnsd.log\"\n",
        )
        .unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.bind(), "[::1]:5353".parse().unwrap());
        assert_eq!(config.dns.forwarders, ["192.0.2.53:53:udp"]);
        assert_eq!(config.log.level.0, LevelFilter::Debug);
        assert_eq!(config.log.file, Some(dir.path().join("udnsd.log")));
        let mut zone_files = config.zone_files().unwrap();
        zone_files.sort();
        assert_eq!(
            zone_files,
            [dir.path().join("zones/a.zone"), dir.path().join("zones/b.zone")]
        );
    }

    #[test]
    fn defaults_apply_and_unknown_fields_are_rejected() {
        let config: Config = toml::from_str("[dns]\nzones = \"/srv/*.zone\"\n").unwrap();
        assert_eq!(config.bind(), "127.0.0.1:53".parse().unwrap());
        assert!(config.dns.forwarders.is_empty());
        assert_eq!(config.log.level.0, LevelFilter::Info);
        assert!(config.log.file.is_none());

        assert!(toml::from_str::<Config>("[dns]\nzones = \"*\"\nzonefiles = \"*\"\n").is_err());
        assert!(toml::from_str::<Config>("[dns]\nzones = \"*\"\n[log]\nlevel = \"loud\"\n").is_err());
    }

    #[test]
    fn forwarder_specs_split_from_the_right() {
        assert_eq!(
            parse_forwarder("192.0.2.53:53:udp").unwrap(),
            ForwarderSpec {
                host: "192.0.2.53",
                port: 53,
                transport: "udp"
            }
        );
        assert_eq!(
            parse_forwarder("2001:db8::1:5353:tcp").unwrap(),
            ForwarderSpec {
                host: "2001:db8::1",
                port: 5353,
                transport: "tcp"
            }
        );
        assert!(parse_forwarder("192.0.2.53:udp").is_err());
        assert!(parse_forwarder("192.0.2.53:dns:udp").is_err());
    }
}
