// crates/store/src/profiles.rs
//! Named configuration profiles

use crate::error::{StoreError, StoreResult};
use crate::journal_store::write_atomic;
use driftsync_core::{CompareOptions, VerifyPolicy};
use driftsync_resilience::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Sentinel profile id meaning "leave the active configuration alone"
pub const CUSTOM_PROFILE_ID: &str = "custom";

/// A named bundle of comparison, retry, and verification settings,
/// selectable as a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncProfile {
    pub id: String,
    pub name: String,
    pub options: CompareOptions,
    pub retry: RetryPolicy,
    pub verify: VerifyPolicy,
}

/// Built-in profiles used when nothing is persisted yet
pub fn builtin_profiles() -> Vec<SyncProfile> {
    vec![
        SyncProfile {
            id: "balanced".to_string(),
            name: "Balanced".to_string(),
            options: CompareOptions::default(),
            retry: RetryPolicy::default(),
            verify: VerifyPolicy::SizeOnly,
        },
        SyncProfile {
            id: "paranoid".to_string(),
            name: "Paranoid".to_string(),
            options: CompareOptions::default().with_checksum(true),
            retry: RetryPolicy::default()
                .with_max_retries(5)
                .with_max_delay_ms(30_000),
            verify: VerifyPolicy::Full,
        },
        SyncProfile {
            id: "quick".to_string(),
            name: "Quick".to_string(),
            options: CompareOptions {
                compare_timestamp: false,
                ..CompareOptions::default()
            },
            retry: RetryPolicy::default().with_max_retries(1).with_timeout_ms(10_000),
            verify: VerifyPolicy::None,
        },
    ]
}

/// Resolves a profile id into its configuration bundle.
///
/// Returns `None` for the `"custom"` sentinel (the current configuration
/// stays untouched) and for unknown ids.
pub fn apply_profile(
    profiles: &[SyncProfile],
    profile_id: &str,
) -> Option<(CompareOptions, RetryPolicy, VerifyPolicy)> {
    if profile_id == CUSTOM_PROFILE_ID {
        return None;
    }
    profiles
        .iter()
        .find(|p| p.id == profile_id)
        .map(|p| (p.options.clone(), p.retry.clone(), p.verify))
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfilesFile {
    profiles: Vec<SyncProfile>,
}

/// TOML-backed profile list
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Opens the platform-default profile file
    pub fn open_default() -> StoreResult<Self> {
        let dirs = directories::ProjectDirs::from("", "", "driftsync")
            .ok_or(StoreError::NoDataDir)?;
        Ok(Self::new(dirs.config_dir().join("profiles.toml")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads persisted profiles, falling back to the built-ins when no
    /// file exists yet
    pub async fn load(&self) -> StoreResult<Vec<SyncProfile>> {
        if !self.path.exists() {
            return Ok(builtin_profiles());
        }
        let contents = fs::read_to_string(&self.path).await?;
        let file: ProfilesFile = toml::from_str(&contents)?;
        Ok(file.profiles)
    }

    /// Persists the full profile list atomically
    pub async fn save(&self, profiles: &[SyncProfile]) -> StoreResult<()> {
        let parent = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&parent)?;

        let file = ProfilesFile {
            profiles: profiles.to_vec(),
        };
        let toml_string = toml::to_string_pretty(&file)?;
        write_atomic(&parent, &self.path, toml_string.as_bytes())?;
        Ok(())
    }
}
