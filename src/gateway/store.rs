use super::GatewayState;
use crate::config::{GatewayFormat, GatewaySettings};
use crate::core::{ClusterError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{Level, event};

const STATE_FILE_PREFIX: &str = "state-";

/// Directory-backed persistence for one node's gateway state.
///
/// Each commit lands in `state-<version>.<bin|json>`, written to a temporary
/// file in the same directory and renamed into place. The store assumes a
/// single writer; it rejects a commit older than the newest file on disk but
/// does not lock the directory.
#[derive(Debug)]
pub struct GatewayStore {
    dir: PathBuf,
    settings: GatewaySettings,
}

impl GatewayStore {
    pub fn open<P: AsRef<Path>>(dir: P, settings: GatewaySettings) -> Result<Self> {
        if settings.retained_states == 0 {
            return Err(ClusterError::ConfigError(
                "retained_states must be >= 1".to_string(),
            ));
        }
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|err| {
            ClusterError::IoError(format!(
                "create gateway directory '{}': {}",
                dir.display(),
                err
            ))
        })?;
        Ok(Self { dir, settings })
    }

    /// Opens a directory that must already exist. Used by read-only callers
    /// that should not leave an empty directory behind.
    pub fn open_existing<P: AsRef<Path>>(dir: P, settings: GatewaySettings) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(ClusterError::IoError(format!(
                "gateway directory '{}' does not exist",
                dir.display()
            )));
        }
        Self::open(dir, settings)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }

    /// Committed state files, newest version first.
    pub fn state_files(&self) -> Result<Vec<(u64, PathBuf)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(version) = parse_state_file_name(&path) {
                files.push((version, path));
            }
        }
        files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(files)
    }

    pub fn latest_version(&self) -> Result<Option<u64>> {
        Ok(self.state_files()?.first().map(|(version, _)| *version))
    }

    /// Writes `state` durably and prunes files beyond `retained_states`.
    pub fn persist(&mut self, state: &GatewayState) -> Result<PathBuf> {
        if let Some(latest) = self.latest_version()? {
            if state.version() < latest {
                return Err(ClusterError::StaleState(format!(
                    "refusing to persist version {} over version {}",
                    state.version(),
                    latest
                )));
            }
        }

        let format = self.settings.format;
        let bytes = match format {
            GatewayFormat::Binary => state.to_bytes()?,
            GatewayFormat::Json => state.to_json_pretty()?.into_bytes(),
        };
        let path = self.dir.join(format!(
            "{}{}.{}",
            STATE_FILE_PREFIX,
            state.version(),
            format.extension()
        ));

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path)
            .map_err(|err| ClusterError::IoError(format!("rename gateway state: {}", err.error)))?;

        event!(
            Level::INFO,
            version = state.version(),
            shards = state.shards().len(),
            path = %path.display(),
            "persisted gateway state"
        );

        self.prune(state.version(), &path)?;
        Ok(path)
    }

    /// Newest persisted state, or `None` when nothing was ever committed.
    /// A malformed newest file is an error.
    pub fn load_latest(&self) -> Result<Option<GatewayState>> {
        match self.state_files()?.first() {
            Some((_, path)) => Self::read_state_file(path).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`load_latest`](Self::load_latest), but degrades to the default
    /// state when the newest file cannot be read.
    pub fn recover(&self) -> GatewayState {
        match self.load_latest() {
            Ok(Some(state)) => state,
            Ok(None) => GatewayState::default(),
            Err(err) => {
                event!(
                    Level::WARN,
                    error = %err,
                    dir = %self.dir.display(),
                    "no usable gateway state, starting empty"
                );
                GatewayState::default()
            }
        }
    }

    /// Decodes a state file, choosing the codec from its extension.
    pub fn read_state_file(path: &Path) -> Result<GatewayState> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(GatewayFormat::from_extension)
            .ok_or_else(|| {
                ClusterError::MalformedState(format!(
                    "unknown gateway state extension: '{}'",
                    path.display()
                ))
            })?;
        let bytes = fs::read(path)?;
        match format {
            GatewayFormat::Binary => GatewayState::from_bytes(&bytes),
            GatewayFormat::Json => GatewayState::from_json_slice(&bytes),
        }
    }

    fn prune(&self, written_version: u64, written: &Path) -> Result<()> {
        let files = self.state_files()?;
        let mut kept = 0usize;
        for (version, path) in files {
            let same_version_other_form = version == written_version && path != written;
            if !same_version_other_form && kept < self.settings.retained_states {
                kept += 1;
                continue;
            }
            if let Err(err) = fs::remove_file(&path) {
                event!(
                    Level::WARN,
                    error = %err,
                    path = %path.display(),
                    "failed to prune old gateway state"
                );
            }
        }
        Ok(())
    }
}

fn parse_state_file_name(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let rest = name.strip_prefix(STATE_FILE_PREFIX)?;
    let (version, ext) = rest.rsplit_once('.')?;
    GatewayFormat::from_extension(ext)?;
    version.parse().ok()
}
