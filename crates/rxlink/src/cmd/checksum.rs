use rxlink::frame::{escape, fletcher_checksum, text_command, xor_checksum, UbxFrame};

use crate::cmd::{ChecksumArgs, ChecksumKind};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_checksum, ChecksumReport, OutputFormat};

pub fn run(args: ChecksumArgs, format: OutputFormat) -> CliResult<i32> {
    let report = build_report(args.kind)?;
    print_checksum(&report, format);
    Ok(SUCCESS)
}

fn build_report(kind: ChecksumKind) -> CliResult<ChecksumReport> {
    match kind {
        ChecksumKind::Text { body } => {
            let command = text_command(&body);
            Ok(ChecksumReport {
                kind: "text",
                checksum: format!("{:02X}", xor_checksum(body.as_bytes())),
                wire: format!("{command}\r\n").into_bytes(),
                frame: command,
            })
        }
        ChecksumKind::Binary(frame) => {
            let wire = UbxFrame::new(frame.class, frame.id, frame.payload.unwrap_or_default().0)
                .to_bytes()
                .map_err(|err| frame_error("frame encoding failed", err))?;
            let (a, b) = fletcher_checksum(&wire[2..wire.len() - 2]);
            Ok(ChecksumReport {
                kind: "binary",
                checksum: format!("{a:02x} {b:02x}"),
                frame: escape(&wire),
                wire: wire.to_vec(),
            })
        }
    }
}
