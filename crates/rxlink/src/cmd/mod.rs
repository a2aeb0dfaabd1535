use clap::{Args, Subcommand};

use rxlink::transport::{Channel, LineConfig, ReadEngine, TracingObserver};
use rxlink::{Receiver, ReceiverConfig};

use crate::exit::{transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod checksum;
pub mod listen;
pub mod read;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a checksummed text command or binary frame without touching a device.
    Checksum(ChecksumArgs),
    /// Send one text command or binary frame, optionally waiting for the reply.
    Send(SendArgs),
    /// Read lines, raw bytes or frames with a bounded timeout.
    Read(ReadArgs),
    /// Print everything the receiver emits until interrupted.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Checksum(args) => checksum::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Read(args) => read::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial line options shared by every command that opens a device.
#[derive(Args, Debug, Clone)]
pub struct PortArgs {
    /// Device node, e.g. /dev/ttyACM0 or COM3.
    #[arg(long, short = 'p', env = "RXLINK_PORT")]
    pub port: String,
    /// Line speed in bits per second.
    #[arg(long, short = 'b', env = "RXLINK_BAUD", default_value_t = rxlink::transport::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Deadline for each read in milliseconds.
    #[arg(long, env = "RXLINK_TIMEOUT_MS", default_value_t = 1000)]
    pub timeout_ms: u64,
    /// Character size in bits (5-8).
    #[arg(long, default_value_t = 8)]
    pub char_size: u8,
}

impl PortArgs {
    pub fn line_config(&self) -> CliResult<LineConfig> {
        let char_size = rxlink::transport::char_size(self.char_size).ok_or_else(|| {
            CliError::new(
                USAGE,
                format!("unsupported character size: {}", self.char_size),
            )
        })?;
        Ok(LineConfig::default()
            .with_baud_rate(self.baud)
            .with_timeout_ms(self.timeout_ms)
            .with_char_size(char_size))
    }

    pub fn open(&self) -> CliResult<Receiver> {
        let line = self.line_config()?;
        let channel =
            Channel::open(&self.port, line).map_err(|err| transport_error("open failed", err))?;
        Ok(Receiver::new(
            ReadEngine::with_observer(channel, TracingObserver),
            ReceiverConfig::default(),
        ))
    }
}

/// A binary frame given on the command line.
#[derive(Args, Debug, Clone)]
pub struct FrameArgs {
    /// Message class, decimal or 0x-prefixed hex.
    #[arg(long, value_parser = parse_u8)]
    pub class: u8,
    /// Message id, decimal or 0x-prefixed hex.
    #[arg(long, value_parser = parse_u8)]
    pub id: u8,
    /// Payload as hex bytes, e.g. "01 07" or "0107". Omit for a poll request.
    #[arg(long, value_parser = parse_hex)]
    pub payload: Option<HexBytes>,
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    #[command(subcommand)]
    pub kind: ChecksumKind,
}

#[derive(Subcommand, Debug)]
pub enum ChecksumKind {
    /// `$<body>*HH` text command.
    Text {
        /// Command body without `$`, `*` or trailer.
        body: String,
    },
    /// Binary frame with its two-byte checksum.
    Binary(FrameArgs),
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Text command body (checksum and terminator are added).
    #[arg(long, conflicts_with_all = ["class", "id", "payload"])]
    pub text: Option<String>,
    /// Message class of a binary frame.
    #[arg(long, value_parser = parse_u8, requires = "id")]
    pub class: Option<u8>,
    /// Message id of a binary frame.
    #[arg(long, value_parser = parse_u8, requires = "class")]
    pub id: Option<u8>,
    /// Binary payload as hex bytes.
    #[arg(long, value_parser = parse_hex)]
    pub payload: Option<HexBytes>,
    /// Wait for the reply: the next line for text, the matching frame for binary.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Number of items to read.
    #[arg(long, short = 'n', default_value_t = 1)]
    pub count: usize,
    /// Read exactly this many raw bytes per item instead of a line.
    #[arg(long, conflicts_with = "frames")]
    pub bytes: Option<usize>,
    /// Read binary frames instead of lines.
    #[arg(long)]
    pub frames: bool,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub port: PortArgs,
    /// Decode binary frames instead of lines.
    #[arg(long)]
    pub frames: bool,
    /// Exit after printing N items.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexBytes(pub Vec<u8>);

pub fn parse_u8(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|err| format!("invalid byte value {input:?}: {err}"))
}

pub fn parse_hex(input: &str) -> Result<HexBytes, String> {
    let digits: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {input:?}"));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| format!("invalid hex byte in {input:?}"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(HexBytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_u8_accepts_decimal_and_hex() {
        assert_eq!(parse_u8("10"), Ok(10));
        assert_eq!(parse_u8("0x0a"), Ok(10));
        assert_eq!(parse_u8("0XFF"), Ok(255));
        assert!(parse_u8("256").is_err());
        assert!(parse_u8("0xzz").is_err());
    }

    #[test]
    fn parse_hex_accepts_separators() {
        assert_eq!(parse_hex("01 07").unwrap().0, vec![0x01, 0x07]);
        assert_eq!(parse_hex("b5:62").unwrap().0, vec![0xb5, 0x62]);
        assert_eq!(parse_hex("").unwrap().0, Vec::<u8>::new());
    }

    #[test]
    fn parse_hex_rejects_bad_input() {
        assert!(parse_hex("123").is_err());
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("é1").is_err());
    }

    #[test]
    fn line_config_applies_flags() {
        let args = PortArgs {
            port: "/dev/ttyACM0".to_string(),
            baud: 9600,
            timeout_ms: 250,
            char_size: 7,
        };
        let line = args.line_config().unwrap();
        assert_eq!(line.baud_rate, 9600);
        assert_eq!(line.timeout, std::time::Duration::from_millis(250));
        assert_eq!(line.char_size, rxlink::transport::DataBits::Seven);
    }

    #[test]
    fn line_config_rejects_char_size() {
        let args = PortArgs {
            port: "/dev/ttyACM0".to_string(),
            baud: 9600,
            timeout_ms: 250,
            char_size: 9,
        };
        assert_eq!(args.line_config().unwrap_err().code, USAGE);
    }
}
