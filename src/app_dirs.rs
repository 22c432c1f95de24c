use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "certprep";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Directory for saved sessions, history and logs: `$HOME/.local/state/certprep`
    pub fn state_dir() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join(APP_NAME)
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
            proj_dirs.data_local_dir().to_path_buf()
        } else {
            PathBuf::from(".")
        }
    }

    pub fn config_path() -> PathBuf {
        if let Some(pd) = ProjectDirs::from("", "", APP_NAME) {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("certprep_config.json")
        }
    }

    pub fn sessions_path() -> PathBuf {
        Self::state_dir().join("sessions.json")
    }

    pub fn history_db_path() -> PathBuf {
        Self::state_dir().join("history.db")
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir().join("certprep.log")
    }
}
