use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nimbus::aws::{AwsCreds, Ec2, Ec2Client};
use nimbus::config::Config;
use nimbus::error::format_cloud_error;
use nimbus::google::{Compute, GcpClient};
use nimbus::mock::MockStore;
use nimbus::model::{Disk, DiskPatch, Disks, Volume, VolumePatch, Volumes};
use nimbus::service::{DiskService, VolumeService};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Project used for disks when running against the mock store without one configured
const MOCK_PROJECT: &str = "mock-project";

/// Longest pause between two readiness polls
const MAX_POLL_DELAY: Duration = Duration::from_secs(8);

/// Manage EC2 volumes and Compute Engine disks
#[derive(Parser, Debug)]
#[command(name = "nimbus", version = nimbus::VERSION, about, long_about = None)]
struct Args {
    /// Serve requests from an in-memory mock instead of the provider APIs
    #[arg(long, global = true)]
    mock: bool,

    /// AWS region to use
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// GCP project to use
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// GCP zone to use
    #[arg(short, long, global = true)]
    zone: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// EC2 block storage volumes
    #[command(subcommand)]
    Volume(VolumeCommand),
    /// Compute Engine persistent disks
    #[command(subcommand)]
    Disk(DiskCommand),
}

#[derive(Subcommand, Debug)]
enum VolumeCommand {
    /// Create a volume
    Create {
        #[arg(long)]
        availability_zone: Option<String>,
        /// Size in GiB
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        snapshot_id: Option<String>,
    },
    /// Describe volumes; all of them when no id is given
    Describe { ids: Vec<String> },
    /// Delete a volume
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
enum DiskCommand {
    /// Create a disk in the selected zone
    Create {
        name: String,
        /// Size in GB
        #[arg(long)]
        size_gb: Option<u64>,
        /// Source image name or URL
        #[arg(long)]
        image: Option<String>,
        /// Poll until the disk is READY
        #[arg(long)]
        wait: bool,
        /// Give up waiting after this many seconds
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
    },
    /// Poll a disk once and report whether it is READY
    Ready { name: String },
    /// Show a disk, or every disk in the zone when no name is given
    Describe { name: Option<String> },
    /// Print the boot disk descriptor used when creating an instance
    BootDescriptor {
        name: String,
        #[arg(long)]
        read_only: bool,
    },
    /// Delete a disk
    Delete { name: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Failed to open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("nimbus started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("nimbus").join("nimbus.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".nimbus").join("nimbus.log");
    }
    PathBuf::from("nimbus.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        tracing::error!("command failed: {:?}", err);
        eprintln!("Error: {}", format_cloud_error(&err));
        std::process::exit(1);
    }
}

/// Resolved settings for one invocation
struct Session {
    config: Config,
    mock: Option<Arc<MockStore>>,
    region: String,
    project: Option<String>,
    zone: String,
}

impl Session {
    fn new(args: &Args) -> Self {
        let config = Config::load();
        let mock = config
            .effective_mock(args.mock)
            .then(|| Arc::new(MockStore::new()));
        let region = config.effective_region(args.region.as_deref());
        let project = config.effective_project(args.project.as_deref());
        let zone = config.effective_zone(args.zone.as_deref());

        tracing::info!(
            "Using region: {}, project: {:?}, zone: {}, mock: {}",
            region,
            project,
            zone,
            mock.is_some()
        );

        Self {
            config,
            mock,
            region,
            project,
            zone,
        }
    }

    fn volumes(&self) -> Result<Arc<dyn VolumeService>> {
        let ec2 = match &self.mock {
            Some(store) => Ec2::mock(store.clone()),
            None => {
                let creds = AwsCreds::from_env()?;
                Ec2::live(Ec2Client::new(&self.region, creds)?)
            }
        };
        Ok(Arc::new(ec2))
    }

    async fn disks(&self) -> Result<Arc<dyn DiskService>> {
        let compute = match &self.mock {
            Some(store) => Compute::mock(
                store.clone(),
                self.project.as_deref().unwrap_or(MOCK_PROJECT),
            ),
            None => {
                let Some(project) = &self.project else {
                    bail!(
                        "No GCP project configured. Set GOOGLE_CLOUD_PROJECT or use --project flag"
                    );
                };
                Compute::live(GcpClient::new(project).await?)
            }
        };
        Ok(Arc::new(compute))
    }
}

async fn run(args: Args) -> Result<()> {
    let ctx = Session::new(&args);
    tracing::debug!("config: {:?}", ctx.config);

    match args.command {
        Command::Volume(command) => run_volume(&ctx, command).await,
        Command::Disk(command) => run_disk(&ctx, command).await,
    }
}

async fn run_volume(ctx: &Session, command: VolumeCommand) -> Result<()> {
    let volumes = Volumes::new(ctx.volumes()?);

    match command {
        VolumeCommand::Create {
            availability_zone,
            size,
            snapshot_id,
        } => {
            let mut volume = volumes.build(VolumePatch {
                availability_zone,
                size,
                snapshot_id,
                ..Default::default()
            });
            volume.save().await.context("Failed to create volume")?;
            print_json(&Value::Object(volume.attributes()))
        }
        VolumeCommand::Describe { ids } => {
            let found: Vec<Volume> = if ids.is_empty() {
                volumes.all().await?
            } else {
                let mut found = Vec::with_capacity(ids.len());
                for id in &ids {
                    match volumes.get(id).await? {
                        Some(volume) => found.push(volume),
                        None => bail!("Volume {} not found", id),
                    }
                }
                found
            };
            print_json(&Value::Array(
                found
                    .iter()
                    .map(|v| Value::Object(v.attributes()))
                    .collect(),
            ))
        }
        VolumeCommand::Delete { id } => {
            let volume = volumes.build(VolumePatch {
                id: Some(id.clone()),
                ..Default::default()
            });
            volume
                .destroy()
                .await
                .with_context(|| format!("Failed to delete volume {}", id))?;
            println!("Deleted {}", id);
            Ok(())
        }
    }
}

async fn run_disk(ctx: &Session, command: DiskCommand) -> Result<()> {
    let disks = Disks::new(ctx.disks().await?);
    let named = |name: &str| DiskPatch {
        name: Some(name.to_string()),
        zone_name: Some(ctx.zone.clone()),
        ..Default::default()
    };

    match command {
        DiskCommand::Create {
            name,
            size_gb,
            image,
            wait,
            timeout_secs,
        } => {
            let mut disk = disks.build(DiskPatch {
                size_gb,
                image_name: image,
                ..named(&name)
            });
            disk.save()
                .await
                .with_context(|| format!("Failed to create disk {}", name))?;
            if wait {
                wait_until_ready(&mut disk, Duration::from_secs(timeout_secs)).await?;
            }
            print_json(&Value::Object(disk.attributes()))
        }
        DiskCommand::Ready { name } => {
            let mut disk = disks.build(named(&name));
            let ready = disk.ready().await?;
            println!("{}", ready);
            Ok(())
        }
        DiskCommand::Describe { name: Some(name) } => {
            let disk = find_disk(&disks, &name, &ctx.zone).await?;
            print_json(&Value::Object(disk.attributes()))
        }
        DiskCommand::Describe { name: None } => {
            let found = disks.all(&ctx.zone).await?;
            print_json(&Value::Array(
                found
                    .iter()
                    .map(|d| Value::Object(d.attributes()))
                    .collect(),
            ))
        }
        DiskCommand::BootDescriptor { name, read_only } => {
            let disk = find_disk(&disks, &name, &ctx.zone).await?;
            print_json(&disk.get_as_boot_disk(!read_only))
        }
        DiskCommand::Delete { name } => {
            disks
                .build(named(&name))
                .destroy()
                .await
                .with_context(|| format!("Failed to delete disk {}", name))?;
            println!("Deleted {}", name);
            Ok(())
        }
    }
}

async fn find_disk(disks: &Disks, name: &str, zone: &str) -> Result<Disk> {
    match disks.get(name, zone).await? {
        Some(disk) => Ok(disk),
        None => bail!("Disk {} not found in {}", name, zone),
    }
}

/// Poll `ready` with a doubling delay capped at [`MAX_POLL_DELAY`]
async fn wait_until_ready(disk: &mut Disk, timeout: Duration) -> Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    let mut delay = Duration::from_millis(500);

    while !disk.ready().await? {
        if tokio::time::Instant::now() + delay > deadline {
            bail!(
                "Disk {} not ready after {}s (status {:?})",
                disk.name().unwrap_or_default(),
                timeout.as_secs(),
                disk.status()
            );
        }
        tracing::debug!("disk {:?} is {:?}, retrying in {:?}", disk.name(), disk.status(), delay);
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(MAX_POLL_DELAY);
    }

    tracing::info!("disk {:?} is ready", disk.name());
    Ok(())
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
