use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    println!("lanecast {}", env!("CARGO_PKG_VERSION"));
    if !args.extended {
        return Ok(SUCCESS);
    }

    println!(
        "target: {}",
        option_env!("LANECAST_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("os: {}", std::env::consts::OS);
    println!("arch: {}", std::env::consts::ARCH);
    println!("serial: {}", cfg!(unix));
    println!("channels: {}", lanecast_frame::CHANNEL_COUNT);
    println!("default_path: {}", lanecast_broadcast::DEFAULT_PATH);

    Ok(SUCCESS)
}
