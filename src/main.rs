use card_cse::application::orchestrator::EncryptionOrchestrator;
use card_cse::config::Config;
use card_cse::domain::brand;
use card_cse::domain::ports::{Clock, EncryptCallback, EncryptOutcome};
use card_cse::domain::request::{CardDetails, CardEncryptRequest, EncryptRequest};
use card_cse::domain::validation::ValidationErrorCode;
use card_cse::error::EncryptExceptionCode;
use card_cse::infrastructure::clock::SystemClock;
use card_cse::interfaces::csv::card_reader::CardReader;
use card_cse::interfaces::csv::report_writer::{ReportRow, ReportWriter};
use card_cse::telemetry;
use clap::{Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log filter directive. Overrides CSE_LOG_LEVEL.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the brand detected for a card number
    Brand { pan: String },
    /// Validate card fields and print a JSON report
    Check(CardArgs),
    /// Validate a CSV file of card records and print a CSV report
    Validate { input: PathBuf },
    /// Encrypt card fields with the key from CSE_ENCRYPTION_KEY
    Encrypt(CardArgs),
    /// Encrypt a CVV and nonce with the key from CSE_ENCRYPTION_KEY
    EncryptCvv {
        #[arg(long)]
        cvv: String,
        #[arg(long)]
        nonce: String,
    },
}

#[derive(Args)]
struct CardArgs {
    #[arg(long)]
    pan: String,
    /// Cardholder name
    #[arg(long)]
    name: String,
    /// Expiry month (1-12)
    #[arg(long, allow_hyphen_values = true)]
    month: i32,
    /// Expiry year, two or four digits
    #[arg(long, allow_hyphen_values = true)]
    year: i32,
    #[arg(long)]
    cvv: String,
    #[arg(long)]
    nonce: String,
}

impl From<CardArgs> for CardDetails {
    fn from(args: CardArgs) -> Self {
        Self {
            pan: args.pan,
            card_holder_name: args.name,
            expiry_year: args.year,
            expiry_month: args.month,
            cvv: args.cvv,
            nonce: args.nonce,
        }
    }
}

#[derive(Serialize)]
struct CheckOutput<'a> {
    brand: brand::CardBrand,
    valid: bool,
    errors: &'a [ValidationErrorCode],
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env().into_diagnostic()?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    telemetry::init(&config.log_level, config.log_json).into_diagnostic()?;

    match cli.command {
        Command::Brand { pan } => {
            println!("{}", brand::detect_brand(&pan));
        }
        Command::Check(args) => {
            let today = SystemClock.today();
            let request = CardEncryptRequest::new(args.into(), today);
            let report = request.validate(today);
            let output = CheckOutput {
                brand: brand::detect(request.pan()),
                valid: report.is_valid(),
                errors: report.errors(),
            };
            println!("{}", serde_json::to_string(&output).into_diagnostic()?);
        }
        Command::Validate { input } => {
            let file = File::open(input).into_diagnostic()?;
            let today = SystemClock.today();
            let stdout = io::stdout();
            let mut writer = ReportWriter::new(stdout.lock());

            for (index, card) in CardReader::new(file).cards().enumerate() {
                let row = index + 1;
                match card {
                    Ok(details) => {
                        let request = CardEncryptRequest::new(details, today);
                        let report = request.validate(today);
                        let brand = brand::detect(request.pan());
                        writer
                            .write_row(&ReportRow::new(row, brand, &report))
                            .into_diagnostic()?;
                    }
                    Err(e) => {
                        eprintln!("Error reading card record {}: {}", row, e);
                    }
                }
            }
            writer.finish().into_diagnostic()?;
        }
        Command::Encrypt(args) => {
            let cse = orchestrator(&config)?;
            let (callback, rx) = outcome_channel();
            cse.encrypt_card(args.into(), callback);
            report_outcome(&cse, rx.await)?;
        }
        Command::EncryptCvv { cvv, nonce } => {
            let cse = orchestrator(&config)?;
            let (callback, rx) = outcome_channel();
            cse.encrypt_cvv(&cvv, &nonce, callback);
            report_outcome(&cse, rx.await)?;
        }
    }

    Ok(())
}

fn orchestrator(config: &Config) -> Result<EncryptionOrchestrator> {
    let service = config.encryption_service().into_diagnostic()?;
    EncryptionOrchestrator::new(Arc::new(service), Handle::current()).into_diagnostic()
}

fn outcome_channel() -> (Box<dyn EncryptCallback>, oneshot::Receiver<EncryptOutcome>) {
    let (tx, rx) = oneshot::channel();
    (Box::new(tx), rx)
}

fn report_outcome(
    cse: &EncryptionOrchestrator,
    received: std::result::Result<EncryptOutcome, oneshot::error::RecvError>,
) -> Result<()> {
    match received {
        Ok(Ok(token)) => {
            println!("{token}");
            Ok(())
        }
        Ok(Err(e)) if e.code() == EncryptExceptionCode::ValidationFailed => {
            let codes: Vec<&str> = cse.errors().iter().map(|c| c.as_str()).collect();
            miette::bail!("{}: {}", e.code(), codes.join(", "))
        }
        Ok(Err(e)) => Err(e).into_diagnostic(),
        Err(_) => miette::bail!("encryption was cancelled before completing"),
    }
}
