//! Vault client backed by `vaultrs`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};
use vaultrs::client::{Client, VaultClient as Session, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::{auth, kv1, kv2, sys};

use crate::error::{VaultError, VaultResult};
use crate::kv::{KvData, KvValue};
use crate::mounts::MountTable;
use crate::secret::{KvSchema, SecretRef};
use crate::store::SecretStore;

const APPROLE_MOUNT: &str = "approle";

/// Authenticated Vault session.
///
/// The token is fixed after login, so a client can be shared by reference
/// across concurrently running targets.
pub struct VaultClient {
    session: Session,
    address: String,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("address", &self.address)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl VaultClient {
    /// Create a client for an already issued token.
    pub fn with_token(address: impl Into<String>, token: impl AsRef<str>) -> VaultResult<Self> {
        let address = address.into().trim_end_matches('/').to_string();

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&address);
        settings_builder.token(token.as_ref());
        let settings = settings_builder
            .build()
            .map_err(|e| VaultError::Settings(e.to_string()))?;

        let session = Session::new(settings).map_err(|e| VaultError::Settings(e.to_string()))?;
        Ok(Self { session, address })
    }

    /// Log in with AppRole credentials.
    pub async fn authenticate(address: &str, role_id: &str, secret_id: &str) -> VaultResult<Self> {
        let mut client = Self::with_token(address, "")?;
        info!("Authenticating to Vault at {} using AppRole", client.address);

        let login = auth::approle::login(&client.session, APPROLE_MOUNT, role_id, secret_id)
            .await
            .map_err(|e| VaultError::Auth(api_message(&e)))?;
        client.session.set_token(&login.client_token);
        Ok(client)
    }

    /// Vault address this client talks to.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Fetch the KV engine version of every mount.
    pub async fn mounts(&self) -> VaultResult<MountTable> {
        let mounts = sys::mount::list(&self.session).await.map_err(api_error)?;
        let table = MountTable::from_engines(mounts.into_iter().map(|(mount, info)| {
            let version = info.options.and_then(|options| options.get("version").cloned());
            (mount, info.mount_type, version)
        }));
        debug!("Discovered {} KV mounts", table.len());
        Ok(table)
    }

    fn convert(secret: &SecretRef, data: Map<String, Value>) -> VaultResult<KvData> {
        let mut kv = KvData::new();
        for (key, value) in data {
            let value = KvValue::from_scalar(value).ok_or_else(|| {
                VaultError::schema(
                    &secret.path,
                    format!("value of key `{}` is not a string, number or bool", key),
                )
            })?;
            kv.insert(key, value);
        }
        Ok(kv)
    }
}

/// Vault's `errors` array, or the bare status when it is empty.
fn api_message(e: &ClientError) -> String {
    match e {
        ClientError::APIError { code, errors } if errors.is_empty() => format!("status {}", code),
        ClientError::APIError { errors, .. } => errors.join("; "),
        other => other.to_string(),
    }
}

fn api_error(e: ClientError) -> VaultError {
    match e {
        ClientError::APIError { code, .. } => VaultError::Api {
            status: code,
            message: api_message(&e),
        },
        other => VaultError::Client(other),
    }
}

fn read_error(secret: &SecretRef, e: ClientError) -> VaultError {
    match e {
        ClientError::APIError { code: 404, .. } => VaultError::NotFound(secret.path.clone()),
        ClientError::APIError { .. } | ClientError::RestClientError { .. } => api_error(e),
        other => VaultError::schema(&secret.path, other.to_string()),
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn read(&self, secret: &SecretRef, schema: KvSchema) -> VaultResult<KvData> {
        let (mount, path) = secret.split()?;
        debug!("Reading secret {} ({})", secret, schema);

        let data: Value = match (schema, secret.pinned_version()) {
            (KvSchema::V1, _) => kv1::get(&self.session, mount, path).await,
            (KvSchema::V2, Some(version)) => {
                kv2::read_version(&self.session, mount, path, version).await
            }
            (KvSchema::V2, None) => kv2::read(&self.session, mount, path).await,
        }
        .map_err(|e| read_error(secret, e))?;

        match data {
            Value::Object(data) if !data.is_empty() => Self::convert(secret, data),
            _ => Err(VaultError::schema(
                &secret.path,
                "no key-values stored within secret",
            )),
        }
    }

    async fn write(&self, secret: &SecretRef, data: &KvData, schema: KvSchema) -> VaultResult<()> {
        let (mount, path) = secret.split()?;
        info!("Writing {} keys to {} in Vault", data.len(), secret.path);

        let result = match schema {
            KvSchema::V1 => {
                let values: Vec<(&str, String)> = data
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.to_string()))
                    .collect();
                let body: HashMap<&str, &str> = values
                    .iter()
                    .map(|(key, value)| (*key, value.as_str()))
                    .collect();
                kv1::set(&self.session, mount, path, &body).await
            }
            KvSchema::V2 => kv2::set(&self.session, mount, path, data).await.map(|_| ()),
        };

        result.map_err(|e| VaultError::Write {
            path: secret.path.clone(),
            message: api_message(&e),
        })
    }
}
