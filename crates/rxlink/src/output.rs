use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use rxlink::frame::{escape, UbxFrame};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct LineOutput<'a> {
    kind: &'static str,
    location: &'a str,
    size: usize,
    text: String,
    checksum_ok: Option<bool>,
    timestamp: String,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    kind: &'static str,
    location: &'a str,
    class: String,
    id: String,
    payload_size: usize,
    payload: String,
    timestamp: String,
}

/// An outbound frame built by `checksum`.
#[derive(Serialize)]
pub struct ChecksumReport {
    pub kind: &'static str,
    pub checksum: String,
    pub frame: String,
    #[serde(skip)]
    pub wire: Vec<u8>,
}

pub fn print_line(line: &[u8], location: &str, format: OutputFormat) {
    let text = line_preview(line);
    let checksum_ok = line
        .starts_with(b"$")
        .then(|| rxlink::frame::validate_text(line));
    match format {
        OutputFormat::Json => {
            let out = LineOutput {
                kind: "line",
                location,
                size: line.len(),
                text,
                checksum_ok,
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SIZE", "CHECKSUM", "LINE"])
                .add_row(vec![
                    line.len().to_string(),
                    checksum_label(checksum_ok).to_string(),
                    text,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "size={} checksum={} line={}",
                line.len(),
                checksum_label(checksum_ok),
                text
            );
        }
        OutputFormat::Raw => print_raw(line),
    }
}

pub fn print_frame(frame: &UbxFrame, location: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                kind: "frame",
                location,
                class: format!("{:#04x}", frame.class),
                id: format!("{:#04x}", frame.id),
                payload_size: frame.payload.len(),
                payload: escape(&frame.payload),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CLASS", "ID", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    format!("{:#04x}", frame.class),
                    format!("{:#04x}", frame.id),
                    frame.payload.len().to_string(),
                    escape(&frame.payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "class={:#04x} id={:#04x} size={} payload={}",
                frame.class,
                frame.id,
                frame.payload.len(),
                escape(&frame.payload)
            );
        }
        OutputFormat::Raw => match frame.to_bytes() {
            Ok(wire) => print_raw(&wire),
            Err(err) => tracing::warn!(error = %err, "frame not re-encodable"),
        },
    }
}

pub fn print_checksum(report: &ChecksumReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "CHECKSUM", "FRAME"])
                .add_row(vec![
                    report.kind.to_string(),
                    report.checksum.clone(),
                    report.frame.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "kind={} checksum={} frame={}",
                report.kind, report.checksum, report.frame
            );
        }
        OutputFormat::Raw => print_raw(&report.wire),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn checksum_label(checksum_ok: Option<bool>) -> &'static str {
    match checksum_ok {
        Some(true) => "ok",
        Some(false) => "bad",
        None => "-",
    }
}

fn line_preview(line: &[u8]) -> String {
    let trimmed = line
        .strip_suffix(b"\r\n")
        .or_else(|| line.strip_suffix(b"\n"))
        .unwrap_or(line);
    match std::str::from_utf8(trimmed) {
        Ok(text) => text.to_string(),
        Err(_) => escape(trimmed),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_strips_terminator() {
        assert_eq!(line_preview(b"$GPTXT,01*00\r\n"), "$GPTXT,01*00");
        assert_eq!(line_preview(b"OK\n"), "OK");
    }

    #[test]
    fn preview_escapes_binary() {
        assert_eq!(line_preview(&[0xb5, 0x62]), "\\xb5\\x62");
    }
}
