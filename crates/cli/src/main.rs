pub(crate) mod error;
pub(crate) mod exec;
pub(crate) mod log_args;
pub(crate) mod output;

use error::Error;
use exec::{exec, ExecArgs};
use log_args::LogArgs;
use output::build_output_path;
use tracing::info;

use clap::{Parser, Subcommand};

use meridian_common::utils::io::file::write_file;
use meridian_config::{config, ConfigArgs, Configuration};

#[derive(Debug, Parser)]
#[clap(name = "meridian", version)]
pub(crate) struct Arguments {
    #[clap(subcommand)]
    pub(crate) sub: Subcommands,

    #[clap(flatten)]
    logs: LogArgs,
}

#[derive(Debug, Subcommand)]
#[clap(about = "meridian is an EVM interpreter backed by a Merkle-Patricia world state.")]
pub(crate) enum Subcommands {
    #[clap(name = "exec", about = "Execute EVM bytecode against an empty in-memory state")]
    Exec(ExecArgs),

    #[clap(name = "config", about = "Display and edit the current configuration")]
    Config(ConfigArgs),
}

fn main() -> Result<(), Error> {
    let args = Arguments::parse();

    // setup logging, keeping the file writer alive until exit
    let _guard = args.logs.init_tracing();

    match args.sub {
        Subcommands::Exec(cmd) => {
            let configuration = Configuration::load()
                .map_err(|e| Error::Generic(format!("failed to load configuration: {}", e)))?;

            let output = cmd.output.clone();
            let result = exec(cmd, &configuration)
                .map_err(|e| Error::Generic(format!("failed to execute bytecode: {}", e)))?;
            let json = serde_json::to_string_pretty(&result)?;

            if output == "print" {
                println!("{json}");
            } else {
                let output_path = build_output_path(&output, "result.json")
                    .map_err(|e| Error::Generic(format!("failed to build output path: {}", e)))?;
                write_file(&output_path, &json)
                    .map_err(|e| Error::Generic(format!("failed to write result: {}", e)))?;
                info!("wrote execution result to '{}'", output_path);
            }
        }

        Subcommands::Config(cmd) => {
            config(cmd).map_err(|e| Error::Generic(format!("failed to configure: {}", e)))?;
        }
    }

    Ok(())
}
