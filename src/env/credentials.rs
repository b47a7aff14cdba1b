//! Credential modes and login command generation.
//!
//! The loose option fields (cluster id, username/password/url, kubeconfig
//! path) are folded into a single [`Credentials`] value when the environment
//! is built. Invalid combinations are rejected there, so building a login
//! command can never fail.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::{EnvError, Result};
use crate::workspace::vars::quote;

use super::Options;

/// Where the workspace kubeconfig comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KubeconfigSource {
    /// A kubeconfig file on disk, copied verbatim.
    File(PathBuf),
    /// Raw kubeconfig bytes fetched by the caller.
    Bytes(Vec<u8>),
}

impl KubeconfigSource {
    pub fn read(&self) -> io::Result<Cow<'_, [u8]>> {
        match self {
            Self::File(path) => fs::read(path).map(Cow::Owned),
            Self::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
        }
    }
}

/// How a workspace authenticates against its cluster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    /// Cluster-scoped token login, keyed by cluster id.
    Token {
        cluster_id: String,
        kubeconfig: Option<KubeconfigSource>,
    },
    /// Direct login against an API server.
    Individual {
        url: String,
        username: String,
        password: Option<String>,
    },
    /// A static kubeconfig; no login step.
    Kubeconfig { source: KubeconfigSource },
    /// Bare workspace without credentials.
    Unauthenticated,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Credentials {
    /// Fold raw options into a credential mode.
    ///
    /// Cluster id beats username/password, which beats a kubeconfig path.
    pub fn from_options(opts: &Options) -> Result<Self> {
        let kubeconfig = match (&opts.kubeconfig_bytes, &opts.kubeconfig) {
            (Some(bytes), _) => Some(KubeconfigSource::Bytes(bytes.clone())),
            (None, Some(path)) => Some(KubeconfigSource::File(path.clone())),
            (None, None) => None,
        };

        if let Some(cluster_id) = non_empty(&opts.cluster_id) {
            return Ok(Self::Token {
                cluster_id: cluster_id.to_string(),
                kubeconfig,
            });
        }

        let username = non_empty(&opts.username);
        let url = non_empty(&opts.url);
        match (username, url) {
            (Some(username), Some(url)) => {
                return Ok(Self::Individual {
                    url: url.to_string(),
                    username: username.to_string(),
                    password: non_empty(&opts.password).map(str::to_string),
                });
            }
            (Some(_), None) => {
                return Err(EnvError::ContractViolation(
                    "username login requires an API url (--api)".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(EnvError::ContractViolation(
                    "API url login requires a username (--username)".to_string(),
                ));
            }
            (None, None) => {}
        }

        if non_empty(&opts.password).is_some() {
            return Err(EnvError::ContractViolation(
                "password given without a username".to_string(),
            ));
        }

        Ok(match kubeconfig {
            Some(source) => Self::Kubeconfig { source },
            None => Self::Unauthenticated,
        })
    }

    pub fn cluster_id(&self) -> Option<&str> {
        match self {
            Self::Token { cluster_id, .. } => Some(cluster_id),
            _ => None,
        }
    }

    pub fn kubeconfig(&self) -> Option<&KubeconfigSource> {
        match self {
            Self::Token { kubeconfig, .. } => kubeconfig.as_ref(),
            Self::Kubeconfig { source } => Some(source),
            _ => None,
        }
    }

    /// The shell command that logs this workspace in, if a login step exists.
    ///
    /// Token mode defers the actual token retrieval to `ocm` at run time.
    pub fn login_command(&self) -> Option<String> {
        match self {
            Self::Token { cluster_id, .. } => {
                Some(format!("ocm cluster login --token {}", quote(cluster_id)))
            }
            Self::Individual {
                url,
                username,
                password,
            } => {
                let mut cmd = format!("oc login -u {}", quote(username));
                if let Some(password) = password {
                    cmd.push_str(&format!(" -p {}", quote(password)));
                }
                cmd.push_str(&format!(" {}", quote(url)));
                Some(cmd)
            }
            Self::Kubeconfig { .. } | Self::Unauthenticated => None,
        }
    }
}
