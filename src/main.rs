use clap::{Parser, Subcommand};
use smugsync::config::{self, SyncConfig};
use smugsync::output;
use smugsync::reconcile::{self, SyncOptions};
use smugsync::remote::SmugMugClient;
use smugsync::scan::{self, ScanRules};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "smugsync")]
#[command(about = "Mirror a local photo tree onto SmugMug folders and galleries")]
#[command(long_about = "\
Mirror a local photo tree onto SmugMug folders and galleries

The local tree is the source of truth. Directories holding directories become
folders, directories holding images become galleries. New and changed images
are uploaded; with --prune, remote images missing locally are deleted unless
that would remove more than the delete threshold of a gallery.

Source structure:

  Photos/                          # SOURCE (holds directories only)
  ├── Travel/                      # Folder
  │   ├── Japan/                   # Gallery
  │   │   ├── 001.jpg
  │   │   └── 002.jpg
  │   └── Italy/
  │       └── rome.jpg
  ├── Family/
  │   ├── .smuggallery             # Marker: gallery even with subdirectories
  │   ├── outtakes/                # (ignored)
  │   └── dinner.jpg
  └── Drafts/                      # Nothing to sync: skipped

Credentials come from [auth] in smugsync.toml or the SMUGMUG_API_KEY,
SMUGMUG_API_SECRET, SMUGMUG_ACCESS_TOKEN and SMUGMUG_ACCESS_TOKEN_SECRET
environment variables.

Run 'smugsync gen-config' to generate a documented smugsync.toml.")]
#[command(version)]
struct Cli {
    /// Config file [default: smugsync.toml]
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct SyncArgs {
    /// Local directory to mirror
    source: PathBuf,

    /// Existing remote folder, e.g. "Archive/2019" ("" for the root)
    dest: String,

    /// Delete remote images that no longer exist locally
    #[arg(long)]
    prune: bool,

    /// Largest share of a gallery that --prune may delete (0.0-1.0)
    #[arg(long)]
    delete_threshold: Option<f64>,

    /// Show what would change without changing anything
    #[arg(long)]
    dry_run: bool,

    /// Album template applied to new galleries
    #[arg(long)]
    template: Option<String>,

    /// Privacy of new galleries (Public, Unlisted, Private)
    #[arg(long)]
    privacy: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Sync a local tree into a remote folder
    Sync(SyncArgs),
    /// Scan a local tree and show how it would be synced, offline
    Check {
        /// Local directory to check
        source: PathBuf,
    },
    /// List every album of the account
    Albums,
    /// Print a stock smugsync.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Sync(args) => {
            let config = load_config(cli.config.as_deref(), sync_overlay(args))?;
            config.auth.require()?;
            let client = SmugMugClient::new(&config.api, &config.auth)?;
            let mut opts = SyncOptions::from_config(&config);
            opts.dry_run = args.dry_run;

            println!(
                "==> Syncing {} \u{2192} /{}",
                args.source.display(),
                args.dest.trim_start_matches('/')
            );
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_sync_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = reconcile::sync_tree(&client, &args.source, &args.dest, &opts, Some(tx));
            printer.join().map_err(|_| "output thread panicked")?;
            let report = result?;
            output::print_sync_report(&report, opts.dry_run);
        }
        Command::Check { source } => {
            let config = load_config(cli.config.as_deref(), None)?;
            let rules = ScanRules::from_config(&config.scan);
            println!("==> Checking {}", source.display());
            let entries = scan::scan_tree(source, &rules)?;
            output::print_check_output(&entries);
            println!("==> Source is valid");
        }
        Command::Albums => {
            let config = load_config(cli.config.as_deref(), None)?;
            config.auth.require()?;
            let client = SmugMugClient::new(&config.api, &config.auth)?;
            let names = client.album_names()?;
            output::print_albums(&names);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `warn` by default, `debug` for this crate with `-v`; `RUST_LOG` wins.
fn init_logging(verbose: bool) {
    let default = if verbose { "smugsync=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

/// Stock defaults ← config file ← environment ← command-line flags.
fn load_config(
    explicit: Option<&Path>,
    flags: Option<toml::Value>,
) -> Result<SyncConfig, Box<dyn std::error::Error>> {
    let path = explicit.unwrap_or(Path::new(config::DEFAULT_CONFIG_FILE));
    let file = config::load_raw_config(path)?;
    if file.is_none() && explicit.is_some() {
        return Err(format!("Config file not found: {}", path.display()).into());
    }
    if file.is_some() {
        log::debug!("loaded config from {}", path.display());
    }
    let env = config::env_overlay(|var| std::env::var(var).ok());
    Ok(config::resolve_config(
        config::stock_defaults_value(),
        [file, env, flags],
    )?)
}

/// Config overlay for the flags of the sync command that were given.
fn sync_overlay(args: &SyncArgs) -> Option<toml::Value> {
    let mut sync = toml::map::Map::new();
    if args.prune {
        sync.insert("prune".into(), toml::Value::Boolean(true));
    }
    if let Some(threshold) = args.delete_threshold {
        sync.insert("delete_threshold".into(), toml::Value::Float(threshold));
    }
    let mut gallery = toml::map::Map::new();
    if let Some(template) = &args.template {
        gallery.insert("template".into(), toml::Value::String(template.clone()));
    }
    if let Some(privacy) = &args.privacy {
        gallery.insert("privacy".into(), toml::Value::String(privacy.clone()));
    }

    let mut root = toml::map::Map::new();
    if !sync.is_empty() {
        root.insert("sync".into(), toml::Value::Table(sync));
    }
    if !gallery.is_empty() {
        root.insert("gallery".into(), toml::Value::Table(gallery));
    }
    (!root.is_empty()).then_some(toml::Value::Table(root))
}
