// Copyright 2023 subregsim authors
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Command line and configuration file handling.
//!
//! Values given on the command line (or through `SUBREGSIM_*` variables) win
//! over the configuration file, which wins over the built-in defaults.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use thiserror::Error;

use crate::session::Credentials;
use crate::utils::serde_utils::one_or_many;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_SSL_PORT: u16 = 443;
pub const DEFAULT_DNS_PORT: u16 = 53;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required option --{0}")]
    Missing(&'static str),
    #[error("--ssl requires --ssl-certificate")]
    SslWithoutCertificate,
    #[error("cannot read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Subreg.cz API simulator suitable for testing DNS provider clients.
#[derive(Debug, Default, Parser)]
#[command(name = "subregsim", version)]
pub struct Args {
    /// Configuration file with any of the options below (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Simulated domain name, may be repeated
    #[arg(long = "domain", env = "SUBREGSIM_DOMAIN", value_delimiter = ',')]
    pub domains: Vec<String>,

    /// Expected login user name
    #[arg(long, env = "SUBREGSIM_USERNAME")]
    pub username: Option<String>,

    /// Expected login password
    #[arg(long, env = "SUBREGSIM_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Listening host name or IP address [default: localhost]
    #[arg(long, env = "SUBREGSIM_HOST")]
    pub host: Option<String>,

    /// Listening port [default: 80]
    #[arg(long, env = "SUBREGSIM_PORT")]
    pub port: Option<u16>,

    /// Also serve the API over HTTPS
    #[arg(long, env = "SUBREGSIM_SSL", help_heading = "SSL")]
    pub ssl: bool,

    /// HTTPS listening port [default: 443]
    #[arg(long, env = "SUBREGSIM_SSL_PORT", value_name = "PORT", help_heading = "SSL")]
    pub ssl_port: Option<u16>,

    /// Server certificate
    #[arg(long, env = "SUBREGSIM_SSL_CERTIFICATE", value_name = "PEM-FILE", help_heading = "SSL")]
    pub ssl_certificate: Option<PathBuf>,

    /// Server private key, not needed when the certificate file carries it
    #[arg(long, env = "SUBREGSIM_SSL_PRIVATE_KEY", value_name = "PEM-FILE", help_heading = "SSL")]
    pub ssl_private_key: Option<PathBuf>,

    /// Also serve the simulated zones over DNS (UDP)
    #[arg(long, env = "SUBREGSIM_DNS", help_heading = "DNS")]
    pub dns: bool,

    /// DNS listening port [default: 53]
    #[arg(long, env = "SUBREGSIM_DNS_PORT", value_name = "PORT", help_heading = "DNS")]
    pub dns_port: Option<u16>,
}

/// Contents of the configuration file. Every key is optional and named like
/// its command line option.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    #[serde(default, alias = "domain", deserialize_with = "one_or_many")]
    pub domains: Vec<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ssl: Option<bool>,
    pub ssl_port: Option<u16>,
    pub ssl_certificate: Option<PathBuf>,
    pub ssl_private_key: Option<PathBuf>,
    pub dns: Option<bool>,
    pub dns_port: Option<u16>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// HTTPS listener settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsSettings {
    pub port: u16,
    pub certificate: PathBuf,
    pub private_key: PathBuf,
}

/// Resolved simulator settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub domains: Vec<String>,
    pub credentials: Credentials,
    pub host: String,
    pub port: u16,
    /// Present when HTTPS is enabled.
    pub tls: Option<TlsSettings>,
    /// DNS listening port, present when DNS is enabled.
    pub dns_port: Option<u16>,
}

impl Config {
    /// Resolves the arguments, reading the configuration file they name.
    pub fn load(args: Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(args, file)
    }

    fn merge(args: Args, file: FileConfig) -> Result<Self, ConfigError> {
        let domains = if args.domains.is_empty() {
            file.domains
        } else {
            args.domains
        };
        let domains: Vec<String> = domains
            .into_iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();
        if domains.is_empty() {
            return Err(ConfigError::Missing("domain"));
        }

        let username = args
            .username
            .or(file.username)
            .ok_or(ConfigError::Missing("username"))?;
        let password = args
            .password
            .or(file.password)
            .ok_or(ConfigError::Missing("password"))?;

        let tls = if args.ssl || file.ssl.unwrap_or(false) {
            let certificate = args
                .ssl_certificate
                .or(file.ssl_certificate)
                .ok_or(ConfigError::SslWithoutCertificate)?;
            let private_key = args
                .ssl_private_key
                .or(file.ssl_private_key)
                .unwrap_or_else(|| certificate.clone());
            Some(TlsSettings {
                port: args.ssl_port.or(file.ssl_port).unwrap_or(DEFAULT_SSL_PORT),
                certificate,
                private_key,
            })
        } else {
            None
        };

        let dns_port = (args.dns || file.dns.unwrap_or(false))
            .then(|| args.dns_port.or(file.dns_port).unwrap_or(DEFAULT_DNS_PORT));

        Ok(Self {
            domains,
            credentials: Credentials::new(username, password),
            host: args.host.or(file.host).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: args.port.or(file.port).unwrap_or(DEFAULT_PORT),
            tls,
            dns_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("subregsim").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn command_line_only() {
        let config = Config::load(args(&[
            "--domain",
            "example.com",
            "--domain",
            "example.org,example.net",
            "--username",
            "user",
            "--password",
            "pass",
            "--port",
            "8008",
        ]))
        .unwrap();

        assert_eq!(config.domains, ["example.com", "example.org", "example.net"]);
        assert_eq!(config.credentials, Credentials::new("user", "pass"));
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, 8008);
        assert_eq!(config.tls, None);
        assert_eq!(config.dns_port, None);
    }

    const REQUIRED: [&str; 6] = ["--domain", "example.com", "--username", "user", "--password", "pass"];

    fn with_required(extra: &[&str]) -> Args {
        let argv: Vec<&str> = REQUIRED.iter().chain(extra).copied().collect();
        args(&argv)
    }

    #[test]
    fn ssl_requires_certificate() {
        let err = Config::load(with_required(&["--ssl", "--ssl-port", "8443"])).unwrap_err();
        assert!(matches!(err, ConfigError::SslWithoutCertificate));
        assert_eq!(err.to_string(), "--ssl requires --ssl-certificate");

        // certificate options alone do not enable HTTPS
        let config = Config::load(with_required(&["--ssl-certificate", "cert.pem"])).unwrap();
        assert_eq!(config.tls, None);
    }

    #[test]
    fn ssl_settings() {
        let config = Config::load(with_required(&["--ssl", "--ssl-certificate", "both.pem"])).unwrap();
        assert_eq!(
            config.tls,
            Some(TlsSettings {
                port: DEFAULT_SSL_PORT,
                certificate: "both.pem".into(),
                private_key: "both.pem".into(),
            })
        );

        let config = Config::load(with_required(&[
            "--ssl",
            "--ssl-port",
            "8443",
            "--ssl-certificate",
            "cert.pem",
            "--ssl-private-key",
            "key.pem",
        ]))
        .unwrap();
        let tls = config.tls.unwrap();
        assert_eq!(tls.port, 8443);
        assert_eq!(tls.private_key, PathBuf::from("key.pem"));
    }

    #[test]
    fn dns_settings() {
        let config = Config::load(with_required(&["--dns"])).unwrap();
        assert_eq!(config.dns_port, Some(DEFAULT_DNS_PORT));

        let config = Config::load(with_required(&["--dns-port", "5353"])).unwrap();
        assert_eq!(config.dns_port, None);

        let file: FileConfig = toml::from_str("dns = true\ndns-port = 5353\nssl = true").unwrap();
        let err = Config::merge(with_required(&[]), file).unwrap_err();
        assert!(matches!(err, ConfigError::SslWithoutCertificate));

        let file: FileConfig =
            toml::from_str("dns = true\ndns-port = 5353\nssl-certificate = \"cert.pem\"").unwrap();
        let config = Config::merge(with_required(&[]), file).unwrap();
        assert_eq!(config.dns_port, Some(5353));
        assert_eq!(config.tls, None);
    }

    #[test]
    fn missing_values_are_reported() {
        let err = Config::merge(Args::default(), FileConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("domain")));

        let err = Config::merge(
            args(&["--domain", "example.com", "--username", "user"]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "missing required option --password");
    }

    #[test]
    fn file_values_are_overridden_by_arguments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
domain = "file.example"
username = "file-user"
password = "file-pass"
host = "0.0.0.0"
port = 8080
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let config = Config::load(args(&["-c", path, "--username", "cli-user"])).unwrap();

        assert_eq!(config.domains, ["file.example"]);
        assert_eq!(config.credentials, Credentials::new("cli-user", "file-pass"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn file_domain_list() {
        let file: FileConfig = toml::from_str(r#"domains = ["a.cz", "b.cz"]"#).unwrap();
        assert_eq!(file.domains, ["a.cz", "b.cz"]);
    }

    #[test]
    fn broken_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"eighty\"").unwrap();
        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let err = FileConfig::load(Path::new("/nonexistent/subregsim.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
