use clap::{Arg, Command};

pub const ARG_URL: &str = "url";
pub const ARG_TIMEOUT: &str = "timeout";
pub const ARG_APP_VERSION: &str = "app-version";
pub const ARG_DEVICE_UID: &str = "device-uid";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_URL)
                .short('u')
                .long("url")
                .help("MAGE server URL, example: https://mage.example.com")
                .env("MAGE_AUTH_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .short('t')
                .long("timeout")
                .help("Seconds to wait for a login attempt before giving up")
                .default_value("30")
                .env("MAGE_AUTH_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_APP_VERSION)
                .long("app-version")
                .help("Client version reported to the server")
                .default_value(env!("CARGO_PKG_VERSION"))
                .env("MAGE_AUTH_APP_VERSION")
                .global(true),
        )
        .arg(
            Arg::new(ARG_DEVICE_UID)
                .long("device-uid")
                .help("Device identifier reported to the server (default: random UUID)")
                .env("MAGE_AUTH_DEVICE_UID")
                .global(true),
        )
}
