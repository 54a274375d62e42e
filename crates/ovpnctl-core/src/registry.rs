//! Certificate environments of connected clients, keyed by common name.
//!
//! The management dispatch task is the only writer. Readers take cheap
//! clones of the handle and copy values out under the lock.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::event::{ClientSubtype, EventRecord};

type Env = BTreeMap<String, String>;

#[derive(Debug, Default)]
struct Inner {
    env: HashMap<String, Env>,
    /// Daemon-assigned client id → common name.
    ids: HashMap<String, String>,
    /// Last `CONNECT`, `REAUTH` or `DISCONNECT`; its ENV block follows as a
    /// separate record without a client id.
    announced: Option<Announced>,
}

#[derive(Debug)]
struct Announced {
    client_id: String,
    leaving: bool,
}

impl Inner {
    fn merge_env(&mut self, common_name: &str, fields: &Env) {
        self.env
            .entry(common_name.to_string())
            .or_default()
            .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    fn forget_client_id(&mut self, client_id: &str) -> Option<String> {
        let common_name = self.ids.remove(client_id)?;
        self.drop_unbound(&common_name);
        Some(common_name)
    }

    /// Remove the environment unless another session uses the same certificate.
    fn drop_unbound(&mut self, common_name: &str) {
        if !self.ids.values().any(|cn| cn == common_name) {
            self.env.remove(common_name);
        }
    }
}

/// Shared handle to the client environment registry.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Union `fields` into the environment stored for `common_name`.
    pub fn merge_env(&self, common_name: &str, fields: &Env) {
        self.lock().merge_env(common_name, fields);
    }

    pub fn bind_client_id(&self, client_id: &str, common_name: &str) {
        self.lock()
            .ids
            .insert(client_id.to_string(), common_name.to_string());
    }

    /// Drop the client behind `client_id`, returning its common name.
    pub fn forget_client_id(&self, client_id: &str) -> Option<String> {
        self.lock().forget_client_id(client_id)
    }

    pub fn env(&self, common_name: &str) -> Option<Env> {
        self.lock().env.get(common_name).cloned()
    }

    pub fn common_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().env.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.lock().env.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().env.is_empty()
    }

    /// Apply one completed `CLIENT` record.
    pub fn observe(&self, record: &EventRecord) {
        if !record.is_client() {
            return;
        }
        let mut inner = self.lock();
        match &record.subtype {
            Some(ClientSubtype::Connect | ClientSubtype::Reauth) => {
                inner.announced = record.client_id().map(|id| Announced {
                    client_id: id.to_string(),
                    leaving: false,
                });
            }
            Some(ClientSubtype::Disconnect) => {
                let Some(id) = record.client_id() else {
                    return;
                };
                if let Some(cn) = inner.forget_client_id(id) {
                    debug!(client_id = id, common_name = %cn, "client left");
                }
                inner.announced = Some(Announced {
                    client_id: id.to_string(),
                    leaving: true,
                });
            }
            Some(ClientSubtype::Env) if record.client_id().is_none() => {
                let announced = inner.announced.take();
                let Some(cn) = record.common_name() else {
                    return;
                };
                match announced {
                    Some(Announced {
                        client_id,
                        leaving: true,
                    }) => {
                        debug!(%client_id, common_name = %cn, "discarding environment of departed client");
                        inner.drop_unbound(cn);
                    }
                    Some(Announced { client_id, .. }) => {
                        inner.merge_env(cn, &record.fields);
                        inner.ids.insert(client_id, cn.to_string());
                    }
                    None => inner.merge_env(cn, &record.fields),
                }
            }
            _ => {
                if let Some(cn) = record.common_name() {
                    inner.merge_env(cn, &record.fields);
                    if let Some(id) = record.client_id() {
                        inner.ids.insert(id.to_string(), cn.to_string());
                    }
                }
            }
        }
    }
}
