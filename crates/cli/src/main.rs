use std::fs::File;
use std::io;
use std::path::PathBuf;

use cardprobe_apdu_transport_pcsc::{PcscConfig, PcscDeviceManager, PcscTransport};
use cardprobe_uicc::aid::AidInfo;
use cardprobe_uicc::discover::{self, ScanConfig};
use cardprobe_uicc::{CardProfile, CardSession, PinOutcome};
use clap::{Parser, Subcommand};
use tracing::info;

mod report;

#[derive(Parser)]
#[command(version, about = "Explore the file system of UICC and SIM cards")]
struct Cli {
    /// Optional reader name to use (will auto-detect if not specified)
    #[arg(short, long)]
    reader: Option<String>,

    /// Trace level output
    #[arg(short, long)]
    verbose: bool,

    /// Speak the legacy SIM dialect (class 0xA0) instead of UICC
    #[arg(long)]
    sim: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available readers
    Readers,

    /// Show card identity: ATR, ICCID, applications and IMSI
    Info,

    /// Brute-force scan of the card's file system
    Scan {
        /// Maximum directory nesting depth, 0 for unbounded
        #[arg(long, default_value_t = 2)]
        depth: usize,

        /// Scan inside the USIM application instead of the MF tree
        #[arg(long)]
        usim: bool,

        /// Write the report to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify a PIN against the card
    VerifyPin {
        /// PIN code (4 to 8 digits)
        #[arg(required = true)]
        pin: String,

        /// Key reference (1 is the application PIN)
        #[arg(long, default_value_t = 1)]
        reference: u8,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let manager = PcscDeviceManager::new()?;

    if matches!(cli.command, Commands::Readers) {
        return list_readers(&manager);
    }

    let reader = match &cli.reader {
        Some(name) => manager
            .list_readers()?
            .into_iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| format!("Reader '{name}' not found"))?,
        None => manager.find_reader_with_card()?,
    };
    info!("Using reader: {}", reader.name());

    let transport = manager.open_reader_with_config(reader.name(), PcscConfig::default())?;
    let profile = if cli.sim {
        CardProfile::Sim
    } else {
        CardProfile::Uicc
    };
    let mut session = CardSession::from_transport(transport, profile);

    match cli.command {
        Commands::Readers => unreachable!(), // Already handled above
        Commands::Info => info_command(&mut session)?,
        Commands::Scan {
            depth,
            usim,
            output,
        } => scan_command(&mut session, depth, usim, output)?,
        Commands::VerifyPin { pin, reference } => verify_pin_command(&mut session, &pin, reference)?,
    }

    Ok(())
}

fn list_readers(manager: &PcscDeviceManager) -> Result<(), Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    if readers.is_empty() {
        println!("No readers found!");
        return Ok(());
    }

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        let status = if reader.has_card() {
            "card present"
        } else {
            "no card"
        };
        println!("{}. {} ({})", i + 1, reader.name(), status);
    }

    Ok(())
}

fn info_command(session: &mut CardSession<PcscTransport>) -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(atr) = session.executor().transport().atr() {
        println!("ATR:   {}", hex::encode_upper(atr));
    }

    match session.iccid()? {
        Some(iccid) => {
            print!("ICCID: {iccid}");
            let luhn_ok = iccid.len() > 1 && {
                let (body, check) = iccid.split_at(iccid.len() - 1);
                cardprobe_uicc::util::compute_luhn(body)
                    .is_some_and(|d| check.as_bytes()[0] == b'0' + d)
            };
            if luhn_ok {
                println!();
            } else {
                println!(" (Luhn check digit mismatch)");
            }
        }
        None => println!("ICCID: not readable"),
    }

    let aids = session.application_ids()?;
    if aids.is_empty() {
        println!("No applications listed in EF_DIR");
    }
    for aid in &aids {
        print!("App:   {}", hex::encode_upper(aid));
        if let Some(info) = AidInfo::parse(aid) {
            let issuer = info.rid_name().unwrap_or("unknown issuer");
            match info.app_name() {
                Some(app) => print!(" ({app}, {issuer})"),
                None => print!(" ({issuer})"),
            }
        }
        println!();
    }

    if session.select_usim()?.is_some() {
        match session.imsi()? {
            Some(imsi) => println!("IMSI:  {imsi}"),
            None => println!("IMSI:  not readable"),
        }
    }

    Ok(())
}

fn scan_command(
    session: &mut CardSession<PcscTransport>,
    depth: usize,
    usim: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let under_aid = if usim {
        let aid = session
            .application_ids()?
            .into_iter()
            .find(|a| cardprobe_uicc::aid::is_usim_aid(a))
            .ok_or("No USIM application listed in EF_DIR")?;
        Some(aid)
    } else {
        None
    };

    let config = ScanConfig {
        max_depth: (depth > 0).then_some(depth),
        under_aid,
        ..ScanConfig::default()
    };

    info!("Starting scan, this will take a while");
    let discovery = discover::explore(session, &config)?;

    match output {
        Some(path) => {
            let mut file = File::create(&path)?;
            report::write_report(&mut file, &discovery)?;
            println!("Report written to {}", path.display());
        }
        None => report::write_report(&mut io::stdout().lock(), &discovery)?,
    }

    Ok(())
}

fn verify_pin_command(
    session: &mut CardSession<PcscTransport>,
    pin: &str,
    reference: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    match session.verify_pin(pin, reference)? {
        PinOutcome::Accepted => println!("PIN verified"),
        PinOutcome::Refused(sw) => {
            println!("PIN refused ({sw}): {}", session.interpret(sw));
        }
    }
    Ok(())
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(true)
        .init();
}
