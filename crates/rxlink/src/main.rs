mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "rxlink", version, about = "GNSS and timing receiver serial link CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_send_text() {
        let cli = Cli::try_parse_from([
            "rxlink",
            "send",
            "--port",
            "/dev/ttyACM0",
            "--text",
            "PUBX,00",
            "--wait",
        ])
        .expect("send args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!(args.text.as_deref(), Some("PUBX,00"));
                assert!(args.wait);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_send_frame() {
        let cli = Cli::try_parse_from([
            "rxlink", "send", "-p", "COM3", "--class", "0x06", "--id", "0x01", "--payload",
            "01 07",
        ])
        .expect("frame args should parse");

        match cli.command {
            Command::Send(args) => {
                assert_eq!((args.class, args.id), (Some(0x06), Some(0x01)));
                assert_eq!(args.payload.map(|p| p.0), Some(vec![0x01, 0x07]));
                assert_eq!(args.port.port, "COM3");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_text_with_frame_args() {
        let err = Cli::try_parse_from([
            "rxlink", "send", "-p", "COM3", "--text", "PUBX,00", "--class", "6", "--id", "1",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn class_requires_id() {
        let err = Cli::try_parse_from(["rxlink", "send", "-p", "COM3", "--class", "6"])
            .expect_err("class alone should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_checksum_binary() {
        let cli = Cli::try_parse_from([
            "rxlink", "checksum", "binary", "--class", "0x0a", "--id", "0x04",
        ])
        .expect("checksum args should parse");
        assert!(matches!(cli.command, Command::Checksum(_)));
    }

    #[test]
    fn read_rejects_bytes_with_frames() {
        let err = Cli::try_parse_from([
            "rxlink", "read", "-p", "COM3", "--bytes", "4", "--frames",
        ])
        .expect_err("conflicting read modes should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
