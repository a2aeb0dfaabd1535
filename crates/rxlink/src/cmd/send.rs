use crate::cmd::SendArgs;
use crate::exit::{receiver_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, print_line, OutputFormat};

enum Outbound {
    Text(String),
    Frame { class: u8, id: u8, payload: Vec<u8> },
}

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let outbound = resolve_outbound(&args)?;
    let mut receiver = args.port.open()?;
    let location = args.port.port.as_str();

    match outbound {
        Outbound::Text(body) => {
            receiver
                .send_command(&body)
                .map_err(|err| receiver_error("send failed", err))?;
            if args.wait {
                let line = receiver
                    .read_line()
                    .map_err(|err| receiver_error("receive failed", err))?;
                print_line(&line, location, format);
            }
        }
        Outbound::Frame { class, id, payload } => {
            receiver
                .send_frame(class, id, &payload)
                .map_err(|err| receiver_error("send failed", err))?;
            if args.wait {
                let frame = receiver
                    .fetch_frame_matching(class, id)
                    .map_err(|err| receiver_error("receive failed", err))?;
                print_frame(&frame, location, format);
            }
        }
    }

    Ok(SUCCESS)
}

fn resolve_outbound(args: &SendArgs) -> CliResult<Outbound> {
    if let Some(body) = &args.text {
        return Ok(Outbound::Text(body.clone()));
    }
    match (args.class, args.id) {
        (Some(class), Some(id)) => Ok(Outbound::Frame {
            class,
            id,
            payload: args.payload.clone().unwrap_or_default().0,
        }),
        _ => Err(CliError::new(
            USAGE,
            "nothing to send: pass --text or --class/--id",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::{HexBytes, PortArgs};

    fn args() -> SendArgs {
        SendArgs {
            port: PortArgs {
                port: "/dev/ttyACM0".to_string(),
                baud: 115_200,
                timeout_ms: 100,
                char_size: 8,
            },
            text: None,
            class: None,
            id: None,
            payload: None,
            wait: false,
        }
    }

    #[test]
    fn requires_something_to_send() {
        let err = resolve_outbound(&args()).err().unwrap();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn frame_defaults_to_poll() {
        let mut args = args();
        args.class = Some(0x0a);
        args.id = Some(0x04);
        match resolve_outbound(&args).unwrap() {
            Outbound::Frame { class, id, payload } => {
                assert_eq!((class, id), (0x0a, 0x04));
                assert!(payload.is_empty());
            }
            Outbound::Text(_) => panic!("expected a frame"),
        }

        args.payload = Some(HexBytes(vec![0x01, 0x07]));
        assert!(matches!(
            resolve_outbound(&args).unwrap(),
            Outbound::Frame { payload, .. } if payload == [0x01, 0x07]
        ));
    }
}
