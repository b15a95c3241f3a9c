use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use roll_picker::config::DEFAULT_MAXIMUM;
use roll_picker::loader::DEFAULT_PAGE_SIZE;
use roll_picker::retry::RetryPolicy;
use roll_picker::types::LogLevel;
use roll_picker::{Asset, AssetType, GroupType, PickerConfig, Scope};

#[derive(Parser, Debug)]
#[command(name = "roll-picker", about = "Browse a photo directory and pick assets from it")]
pub struct Cli {
    /// Library directory to browse
    #[arg(short = 'd', long, env = "ROLL_PICKER_DIR", default_value = "~/Pictures")]
    pub directory: String,

    /// Assets fetched per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Maximum number of selected assets
    #[arg(short = 'm', long, default_value_t = DEFAULT_MAXIMUM)]
    pub maximum: usize,

    /// Single-select mode: every new selection replaces the previous one
    #[arg(long)]
    pub single: bool,

    /// Only list assets from this album (parent directory name)
    #[arg(short = 'a', long)]
    pub album: Option<String>,

    /// Kind of assets to list
    #[arg(long, value_enum, default_value = "photos")]
    pub asset_type: AssetType,

    /// Group type to query
    #[arg(long, value_enum, default_value = "saved-photos")]
    pub group_types: GroupType,

    /// URI selected before loading starts (repeatable)
    #[arg(long = "initial")]
    pub initial: Vec<String>,

    /// List index to toggle after loading (repeatable, applied in order)
    #[arg(short = 's', long = "select")]
    pub select: Vec<usize>,

    /// Keep loading pages until the library is exhausted
    #[arg(long)]
    pub all: bool,

    /// Retries for a failed page load
    #[arg(long, default_value_t = 2)]
    pub max_retries: u32,

    /// Base delay between retries, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub retry_delay_ms: u64,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Settings for one run of the driver.
#[derive(Debug)]
pub struct Settings {
    pub directory: PathBuf,
    pub picker: PickerConfig,
    pub retry: RetryPolicy,
    pub select: Vec<usize>,
    pub load_all: bool,
    pub json: bool,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Settings {
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        if cli.page_size == 0 {
            anyhow::bail!("--page-size must be at least 1");
        }
        let directory = expand_tilde(&cli.directory);

        let initial_selection = cli
            .initial
            .iter()
            .map(|uri| Asset::photo(uri.as_str(), None))
            .collect();

        Ok(Self {
            directory,
            picker: PickerConfig {
                page_size: cli.page_size,
                maximum: cli.maximum,
                select_single_item: cli.single,
                initial_selection,
                scope: Scope {
                    group_name: cli.album,
                    group_types: cli.group_types,
                    asset_type: cli.asset_type,
                },
            },
            retry: RetryPolicy {
                max_retries: cli.max_retries,
                base_delay: Duration::from_millis(cli.retry_delay_ms),
                ..RetryPolicy::default()
            },
            select: cli.select,
            load_all: cli.all,
            json: cli.json,
        })
    }
}
