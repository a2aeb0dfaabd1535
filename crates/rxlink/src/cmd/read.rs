use tracing::debug;

use crate::cmd::ReadArgs;
use crate::exit::{receiver_error, CliResult, SUCCESS};
use crate::output::{print_frame, print_line, OutputFormat};

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    let mut receiver = args.port.open()?;
    let location = args.port.port.as_str();

    for n in 0..args.count {
        if args.frames {
            let frame = receiver
                .fetch_frame()
                .map_err(|err| receiver_error("fetch failed", err))?;
            print_frame(&frame, location, format);
        } else if let Some(len) = args.bytes {
            let chunk = receiver
                .read_exact(len)
                .map_err(|err| receiver_error("read failed", err))?;
            print_line(&chunk, location, format);
        } else {
            let line = receiver
                .read_line()
                .map_err(|err| receiver_error("read failed", err))?;
            print_line(&line, location, format);
        }
        debug!(item = n + 1, of = args.count, "item read");
    }

    Ok(SUCCESS)
}
