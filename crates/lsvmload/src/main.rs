//! CLI entry point (spec.md §6's external interfaces): parses `lsvmconf`,
//! opens the raw devices and key material the orchestrator needs, and
//! runs `S0 Init` through `S12 Handoff`. Grounded on
//! `hadris-iso-cli`/`hadris-fat-cli`'s thin `clap::Parser` + `anyhow`
//! shape — a flat argument struct, one subcommand-free operation, errors
//! bubbling out of `main` rather than being matched by hand.

mod config;
mod context;
mod error;
mod esp_fat;
mod grubcfg;
mod logging;
mod orchestrator;
mod prompt;
mod specialize;

use std::fs;
use std::io::Read as _;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use lsvmload_block::{Bdev, VecBdev};
use lsvmload_interpose::{Console, Key};
use lsvmload_tpm::SoftwareTpm;

use config::Config;
use context::BootContext;
use orchestrator::{BootInputs, BootOrchestrator, Outcome};

/// Everything `lsvmconf` itself leaves to the caller of this binary: where
/// each raw image lives on the host running the boot simulation.
#[derive(Debug, Parser)]
struct Args {
    /// Path to the `lsvmconf` configuration file.
    #[arg(long)]
    config: PathBuf,
    /// The boot volume's raw LUKS partition image.
    #[arg(long)]
    boot_dev: PathBuf,
    /// The root volume's raw LUKS partition image.
    #[arg(long)]
    root_dev: PathBuf,
    /// The whole physical disk image, carrying the GPT `S9` patches.
    #[arg(long)]
    root_disk: PathBuf,
    /// TPM-sealed `boot_key || root_key` blob (spec.md's `sealedkeys`).
    #[arg(long)]
    sealed_keys: PathBuf,
    /// Optional `specialization.aes` blob.
    #[arg(long)]
    specialization: Option<PathBuf>,
    /// Optional `/lsvmload/dbxupdate.bin`, already extracted to a host file.
    #[arg(long)]
    dbx_update: Option<PathBuf>,
    /// Raw EFI device-path bytes for `root_disk`.
    #[arg(long)]
    root_device_path: PathBuf,
    /// Sectors to reserve for the synthesized `BOOTFS` partition.
    #[arg(long)]
    boot_volume_sectors: u64,
    /// Where to append the `lsvmlog` plain-text log.
    #[arg(long, default_value = "lsvmlog")]
    log_file: PathBuf,
    /// Stop right after `S8 PatchInitrd`, before installing any interposer.
    #[arg(long)]
    dry_run: bool,
}

/// A host-terminal-backed [`Console`]: reads raw bytes from stdin one at a
/// time and writes straight to stdout. Grounded on
/// `original_source/lsvmload/console.c`'s read-key/write-string surface;
/// the firmware `SIMPLE_TEXT_*` protocol calls it wraps are out of scope
/// here, so this substitutes the host terminal for them.
struct StdioConsole {
    stdin: std::io::Stdin,
}

impl StdioConsole {
    fn new() -> Self {
        Self { stdin: std::io::stdin() }
    }
}

impl Console for StdioConsole {
    fn read_key(&mut self) -> Key {
        let mut byte = [0u8; 1];
        loop {
            match self.stdin.read(&mut byte) {
                Ok(0) => return Key::Enter, // EOF: behave as if the user hit Enter
                Ok(_) => {}
                Err(_) => return Key::Enter,
            }
            return match byte[0] {
                b'\n' | b'\r' => Key::Enter,
                0x08 | 0x7F => Key::Backspace,
                b => Key::Char(b),
            };
        }
    }

    fn write_str(&mut self, s: &str) {
        use std::io::Write as _;
        print!("{s}");
        let _ = std::io::stdout().flush();
    }
}

fn load_device(path: &PathBuf) -> anyhow::Result<Box<dyn Bdev + Send>> {
    let bytes = fs::read(path).with_context(|| format!("reading device image {}", path.display()))?;
    Ok(Box::new(VecBdev::from_bytes(&bytes)))
}

fn read_optional(path: &Option<PathBuf>) -> anyhow::Result<Option<Vec<u8>>> {
    path.as_ref()
        .map(|p| fs::read(p).with_context(|| format!("reading {}", p.display())))
        .transpose()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_text = fs::read_to_string(&args.config).with_context(|| format!("reading config {}", args.config.display()))?;
    let config = Config::parse(&config_text).context("parsing lsvmconf")?;

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)
        .with_context(|| format!("opening log file {}", args.log_file.display()))?;
    let level = config.log_level.to_level_filter();
    log::set_boxed_logger(Box::new(logging::FileLogger::new(Some(log_file)))).expect("logger installed once");
    log::set_max_level(level);

    let ctx = BootContext::new(config, args.dry_run);
    let tpm = SoftwareTpm::new();
    let console = StdioConsole::new();

    let inputs = BootInputs {
        boot_dev: load_device(&args.boot_dev)?,
        root_dev: load_device(&args.root_dev)?,
        root_disk: load_device(&args.root_disk)?,
        sealed_keys: fs::read(&args.sealed_keys).context("reading sealed-keys blob")?,
        specialization_blob: read_optional(&args.specialization)?,
        dbx_update: read_optional(&args.dbx_update)?,
        root_device_path: fs::read(&args.root_device_path).context("reading root device path bytes")?,
        boot_volume_sectors: args.boot_volume_sectors,
    };

    let orchestrator = BootOrchestrator::new(tpm, console, ctx);
    match orchestrator.run(inputs)? {
        Some(Outcome::Handoff { root_bio, esp }) => {
            // Control would transfer to the loaded shim here; this
            // simulation just keeps both interposers alive for as long as
            // this process runs so the orchestrator's effects are
            // inspectable, and returns successfully.
            drop(root_bio);
            drop(esp);
            log::info!("handoff complete");
        }
        Some(Outcome::Reboot { resealed_keys }) => {
            fs::write(&args.sealed_keys, &resealed_keys).context("rewriting sealed-keys blob after DBX update")?;
            log::info!("DBX update applied; sealed-keys blob rewritten, warm reset requested");
        }
        None => {
            log::info!("dry run: stopped before S9 Interpose");
        }
    }

    Ok(())
}
