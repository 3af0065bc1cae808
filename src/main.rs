//! Purpose: `pushgate` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::io::{self, Read};
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::aot::Shell;
use serde_json::{Value, json};

mod serve;

use pushgate::api::{Error, ErrorKind, MessageEnvelope, to_exit_code};
use serve::{ServeConfig, serve};

fn main() {
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();
    match cli.command {
        Command::Parse(args) => run_parse(args),
        Command::Serve(args) => run_serve(args),
        Command::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "pushgate", &mut io::stdout());
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(
    name = "pushgate",
    version,
    about = "Parse push send requests into validated message envelopes",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a send document and print its audit projection
    Parse(ParseArgs),
    /// Run the HTTP sender endpoint
    Serve(ServeArgs),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct ParseArgs {
    /// Document to parse; reads stdin when omitted
    file: Option<PathBuf>,
    /// Print the structured envelope instead of the audit projection
    #[arg(long, conflicts_with = "check")]
    pretty: bool,
    /// Validate only; print nothing on success
    #[arg(long)]
    check: bool,
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1:9999")]
    bind: SocketAddr,
    /// File holding the bearer token clients must present
    #[arg(long)]
    token_file: Option<PathBuf>,
    /// Allow binding to a non-loopback address
    #[arg(long)]
    allow_non_loopback: bool,
    /// Maximum request body size in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    max_body_bytes: u64,
}

fn run_parse(args: ParseArgs) -> Result<(), Error> {
    let input = match &args.file {
        Some(path) => std::fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read {}", path.display()))
                .with_source(err)
        })?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read stdin")
                    .with_source(err)
            })?;
            buffer
        }
    };

    let value: Value = serde_json::from_str(&input).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("input is not valid JSON")
            .with_source(err)
    })?;
    let document = value.as_object().ok_or_else(|| {
        Error::new(ErrorKind::TypeMismatch).with_message("input must be a JSON object")
    })?;

    let envelope = MessageEnvelope::from_document(document)?;
    if args.check {
        return Ok(());
    }
    if args.pretty {
        let rendered = serde_json::to_string_pretty(&envelope_json(&envelope)).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to render envelope")
                .with_source(err)
        })?;
        println!("{rendered}");
    } else {
        println!("{}", envelope.to_audit_json());
    }
    Ok(())
}

/// Structured (machine-readable) rendering of an envelope, in contrast to
/// the lossy audit projection: unset fields are real JSON nulls and `data`
/// keeps its original value types.
fn envelope_json(envelope: &MessageEnvelope) -> Value {
    json!({
        "criteria": {
            "aliases": envelope.criteria().aliases(),
            "deviceTypes": envelope.criteria().device_types(),
            "categories": envelope.criteria().categories(),
            "variants": envelope.criteria().variants(),
        },
        "alert": envelope.alert(),
        "title": envelope.title(),
        "action": envelope.action(),
        "actionCategory": envelope.action_category(),
        "sound": envelope.sound(),
        "contentAvailable": envelope.content_available(),
        "badge": envelope.badge(),
        "timeToLive": envelope.time_to_live(),
        "simplePush": envelope.simple_push(),
        "data": envelope.data(),
    })
}

fn run_serve(args: ServeArgs) -> Result<(), Error> {
    let token = match &args.token_file {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .map_err(|err| {
                    Error::new(ErrorKind::Io)
                        .with_message(format!("failed to read {}", path.display()))
                        .with_source(err)
                })?
                .trim()
                .to_string(),
        ),
        None => None,
    };

    let config = ServeConfig {
        bind: args.bind,
        token,
        allow_non_loopback: args.allow_non_loopback,
        max_body_bytes: args.max_body_bytes,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to start runtime")
                .with_source(err)
        })?;
    runtime.block_on(serve(config))
}

fn emit_error(err: &Error) {
    let mut body = json!({
        "kind": format!("{:?}", err.kind()),
        "message": err.message().unwrap_or("error"),
    });
    if let Some(field) = err.field() {
        body["field"] = json!(field);
    }
    if let Some(hint) = err.hint() {
        body["hint"] = json!(hint);
    }
    eprintln!("{}", json!({ "error": body }));
}
