mod anonymize;
mod command;
mod logging;
mod util;

fn main() -> anyhow::Result<()> {
    command::run()
}
