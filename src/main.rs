//! `reqpub`: publish Doorstop requirements as themed, accessible HTML.

use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
