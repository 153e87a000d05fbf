use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

/// Reasons an HTTP client configuration is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HttpClientError {
    #[error("at most one of bearer_token & bearer_token_file must be configured")]
    BearerTokenAndFile,

    #[error("at most one of basic_auth, oauth2, bearer_token & bearer_token_file must be configured")]
    BearerTokenWithOtherAuth,

    #[error("at most one of basic_auth username & username_file must be configured")]
    UsernameAndFile,

    #[error("at most one of basic_auth password & password_file must be configured")]
    PasswordAndFile,

    #[error("authorization is not compatible with bearer_token & bearer_token_file")]
    AuthorizationWithBearerToken,

    #[error("at most one of authorization credentials & credentials_file must be configured")]
    CredentialsAndFile,

    #[error("authorization type cannot be set to \"basic\", use \"basic_auth\" instead")]
    BasicAuthorizationType,

    #[error("at most one of basic_auth, oauth2 & authorization must be configured")]
    MultipleAuthMethods,

    #[error("oauth2 client_id must be configured")]
    MissingOAuth2ClientId,

    #[error("oauth2 token_url must be configured")]
    MissingOAuth2TokenUrl,

    #[error("at most one of oauth2 client_secret & client_secret_file must be configured")]
    ClientSecretAndFile,

    #[error("exactly one of key or key_file must be configured when a client certificate is configured")]
    CertWithoutKey,

    #[error("exactly one of cert or cert_file must be configured when a client key is configured")]
    KeyWithoutCert,
}

/// A value that must never end up in logs or printed configuration.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<secret>")
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("<secret>")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BasicAuth {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Secret::is_empty")]
    pub password: Secret,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Authorization {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Secret::is_empty")]
    pub credentials: Secret,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<PathBuf>,
}

impl Default for Authorization {
    fn default() -> Self {
        Self {
            kind: "Bearer".to_string(),
            credentials: Secret::default(),
            credentials_file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OAuth2 {
    pub client_id: String,
    #[serde(skip_serializing_if = "Secret::is_empty")]
    pub client_secret: Secret,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    pub token_url: String,
    #[serde(skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub endpoint_params: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsVersion {
    TLS10,
    TLS11,
    TLS12,
    TLS13,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TlsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,
    pub insecure_skip_verify: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_version: Option<TlsVersion>,
}

impl TlsConfig {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), HttpClientError> {
        match (&self.cert_file, &self.key_file) {
            (Some(_), None) => Err(HttpClientError::CertWithoutKey),
            (None, Some(_)) => Err(HttpClientError::KeyWithoutCert),
            _ => Ok(()),
        }
    }
}

/// HTTP client settings used to reach the targets of a scrape job.
///
/// In the document these keys live directly in the scrape job block rather
/// than under a nested key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    pub basic_auth: Option<BasicAuth>,
    pub authorization: Option<Authorization>,
    pub oauth2: Option<OAuth2>,
    pub bearer_token: Secret,
    pub bearer_token_file: Option<PathBuf>,
    pub tls_config: TlsConfig,
    pub proxy_url: Option<Url>,
    pub follow_redirects: bool,
    pub enable_http2: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            basic_auth: None,
            authorization: None,
            oauth2: None,
            bearer_token: Secret::default(),
            bearer_token_file: None,
            tls_config: TlsConfig::default(),
            proxy_url: None,
            follow_redirects: true,
            enable_http2: true,
        }
    }
}

impl HttpClientConfig {
    /// Checks that at most one way of authenticating is configured, and that
    /// each of them is internally consistent.
    pub fn validate(&self) -> Result<(), HttpClientError> {
        let has_bearer = !self.bearer_token.is_empty() || self.bearer_token_file.is_some();

        if !self.bearer_token.is_empty() && self.bearer_token_file.is_some() {
            return Err(HttpClientError::BearerTokenAndFile);
        }
        if (self.basic_auth.is_some() || self.oauth2.is_some()) && has_bearer {
            return Err(HttpClientError::BearerTokenWithOtherAuth);
        }

        if let Some(basic_auth) = &self.basic_auth {
            if !basic_auth.username.is_empty() && basic_auth.username_file.is_some() {
                return Err(HttpClientError::UsernameAndFile);
            }
            if !basic_auth.password.is_empty() && basic_auth.password_file.is_some() {
                return Err(HttpClientError::PasswordAndFile);
            }
        }

        if let Some(authorization) = &self.authorization {
            if has_bearer {
                return Err(HttpClientError::AuthorizationWithBearerToken);
            }
            if !authorization.credentials.is_empty() && authorization.credentials_file.is_some() {
                return Err(HttpClientError::CredentialsAndFile);
            }
            if authorization.kind.trim().eq_ignore_ascii_case("basic") {
                return Err(HttpClientError::BasicAuthorizationType);
            }
            if self.basic_auth.is_some() || self.oauth2.is_some() {
                return Err(HttpClientError::MultipleAuthMethods);
            }
        }

        if let Some(oauth2) = &self.oauth2 {
            if self.basic_auth.is_some() {
                return Err(HttpClientError::MultipleAuthMethods);
            }
            if oauth2.client_id.is_empty() {
                return Err(HttpClientError::MissingOAuth2ClientId);
            }
            if oauth2.token_url.is_empty() {
                return Err(HttpClientError::MissingOAuth2TokenUrl);
            }
            if !oauth2.client_secret.is_empty() && oauth2.client_secret_file.is_some() {
                return Err(HttpClientError::ClientSecretAndFile);
            }
        }

        self.tls_config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn basic_auth(username: &str, password: &str) -> Option<BasicAuth> {
        Some(BasicAuth {
            username: username.to_string(),
            password: Secret::new(password),
            ..BasicAuth::default()
        })
    }

    #[test]
    fn default_is_valid() {
        assert_eq!(HttpClientConfig::default().validate(), Ok(()));
    }

    #[test]
    fn secrets_are_redacted() {
        let secret = Secret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "<secret>");
        let printed: String =
            serde_yaml::from_str(&serde_yaml::to_string(&secret).unwrap()).unwrap();
        assert_eq!(printed, "<secret>");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[rstest]
    #[case::token_and_file(
        HttpClientConfig {
            bearer_token: Secret::new("token"),
            bearer_token_file: Some("/etc/token".into()),
            ..HttpClientConfig::default()
        },
        HttpClientError::BearerTokenAndFile
    )]
    #[case::basic_auth_and_token(
        HttpClientConfig {
            basic_auth: basic_auth("user", "pass"),
            bearer_token: Secret::new("token"),
            ..HttpClientConfig::default()
        },
        HttpClientError::BearerTokenWithOtherAuth
    )]
    #[case::username_and_file(
        HttpClientConfig {
            basic_auth: Some(BasicAuth {
                username: "user".to_string(),
                username_file: Some("/etc/user".into()),
                ..BasicAuth::default()
            }),
            ..HttpClientConfig::default()
        },
        HttpClientError::UsernameAndFile
    )]
    #[case::authorization_and_token(
        HttpClientConfig {
            authorization: Some(Authorization::default()),
            bearer_token_file: Some("/etc/token".into()),
            ..HttpClientConfig::default()
        },
        HttpClientError::AuthorizationWithBearerToken
    )]
    #[case::basic_authorization_type(
        HttpClientConfig {
            authorization: Some(Authorization {
                kind: "Basic".to_string(),
                ..Authorization::default()
            }),
            ..HttpClientConfig::default()
        },
        HttpClientError::BasicAuthorizationType
    )]
    #[case::authorization_and_basic_auth(
        HttpClientConfig {
            authorization: Some(Authorization::default()),
            basic_auth: basic_auth("user", "pass"),
            ..HttpClientConfig::default()
        },
        HttpClientError::MultipleAuthMethods
    )]
    #[case::oauth2_without_client_id(
        HttpClientConfig {
            oauth2: Some(OAuth2 {
                token_url: "https://auth.example.com/token".to_string(),
                ..OAuth2::default()
            }),
            ..HttpClientConfig::default()
        },
        HttpClientError::MissingOAuth2ClientId
    )]
    #[case::cert_without_key(
        HttpClientConfig {
            tls_config: TlsConfig {
                cert_file: Some("/etc/client.crt".into()),
                ..TlsConfig::default()
            },
            ..HttpClientConfig::default()
        },
        HttpClientError::CertWithoutKey
    )]
    fn validate_error(#[case] config: HttpClientConfig, #[case] expected: HttpClientError) {
        assert_eq!(config.validate(), Err(expected));
    }

    #[test]
    fn oauth2_complete_is_valid() {
        let config = HttpClientConfig {
            oauth2: Some(OAuth2 {
                client_id: "agent".to_string(),
                client_secret_file: Some("/etc/secret".into()),
                token_url: "https://auth.example.com/token".to_string(),
                ..OAuth2::default()
            }),
            ..HttpClientConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
