//! Who may log in, and as what.

use std::{collections::HashMap, path::Path};

use anyhow::Context;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::password::matches_stored;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkerKind {
    #[default]
    Warehouse,
    Field,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "role", content = "kind", rename_all = "lowercase")]
pub enum Role {
    Admin,
    Worker(WorkerKind),
}

/// Credentials were rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Denied;

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `username` is expected normalized (see [`normalize_username`]).
    async fn authenticate(&self, username: &str, password: &str) -> Result<Role, Denied>;
}

pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[a-z0-9][a-z0-9._-]{0,63}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminEntry {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerEntry {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub kind: WorkerKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsFile {
    pub admin: AdminEntry,
    #[serde(default)]
    pub workers: Vec<WorkerEntry>,
}

/// Fixed credential table read once at startup.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    admin: AdminEntry,
    workers: HashMap<String, WorkerEntry>,
}

impl StaticCredentials {
    pub fn new(file: CredentialsFile) -> Self {
        let admin = AdminEntry {
            username: normalize_username(&file.admin.username),
            password: file.admin.password,
        };
        let workers = file
            .workers
            .into_iter()
            .map(|w| (normalize_username(&w.username), w))
            .collect();
        Self { admin, workers }
    }

    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let file: CredentialsFile = serde_json::from_str(raw).context("parse credentials")?;
        Ok(Self::new(file))
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read credentials from {}", path.display()))?;
        let creds = Self::from_json(&raw)?;
        info!(workers = creds.workers.len(), path = %path.display(), "credentials loaded");
        Ok(creds)
    }
}

#[async_trait]
impl Authenticator for StaticCredentials {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Role, Denied> {
        if username == self.admin.username && matches_stored(password, &self.admin.password) {
            return Ok(Role::Admin);
        }
        match self.workers.get(username) {
            Some(w) if matches_stored(password, &w.password) => Ok(Role::Worker(w.kind)),
            Some(_) => {
                debug!(username, "worker password mismatch");
                Err(Denied)
            }
            None => Err(Denied),
        }
    }
}
