use directories::ProjectDirs;
use eyre::ContextCompat as _;
use std::path::PathBuf;

pub const CONFIG_DIR_ENV: &str = "WALLET_MCP_CONFIG_DIR";
pub const DATA_DIR_ENV: &str = "WALLET_MCP_DATA_DIR";

const LOG_FILE_NAME: &str = "purpleflea-wallet-mcp.log.jsonl";

#[derive(Debug, Clone)]
pub struct WalletMcpPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
}

impl WalletMcpPaths {
    pub fn discover() -> eyre::Result<Self> {
        // Test/CI override knobs.
        if let (Ok(data_dir), Ok(config_dir)) =
            (std::env::var(DATA_DIR_ENV), std::env::var(CONFIG_DIR_ENV))
        {
            return Ok(Self::from_dirs(
                PathBuf::from(config_dir),
                PathBuf::from(data_dir),
            ));
        }

        // macOS: ~/Library/Application Support/purpleflea-wallet-mcp
        // Linux: ~/.config/purpleflea-wallet-mcp
        // Windows: %APPDATA%\\purpleflea-wallet-mcp
        let proj = ProjectDirs::from("", "", "purpleflea-wallet-mcp")
            .context("failed to resolve project dirs")?;
        Ok(Self::from_dirs(
            proj.config_dir().to_path_buf(),
            proj.data_dir().to_path_buf(),
        ))
    }

    fn from_dirs(config_dir: PathBuf, data_dir: PathBuf) -> Self {
        let log_file = data_dir.join(LOG_FILE_NAME);
        Self {
            config_dir,
            data_dir,
            log_file,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn log_file_name(&self) -> &str {
        self.log_file
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(LOG_FILE_NAME)
    }
}
