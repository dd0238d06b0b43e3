use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};

/// Credential-bearing view of an incoming request, as handed to the Authorizer.
///
/// Header names are expected in lowercase.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

impl AuthRequest {
    /// Build a request from arbitrary-case header pairs.
    pub fn from_headers<I, K, V>(headers: I, source_ip: IpAddr) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
            source_ip,
        }
    }

    /// Look up a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl Default for AuthRequest {
    fn default() -> Self {
        Self {
            headers: HashMap::new(),
            source_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }
}

/// Identity the Authorizer vouched for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub user_id: String,
    pub method: String,
    #[serde(default)]
    pub claims: HashMap<String, serde_json::Value>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            method: "none".to_string(),
            claims: HashMap::new(),
        }
    }

    /// Identity used for jobs created by the pipeline itself.
    pub fn pipeline() -> Self {
        Self {
            user_id: "pipeline".to_string(),
            method: "internal".to_string(),
            claims: HashMap::new(),
        }
    }
}
