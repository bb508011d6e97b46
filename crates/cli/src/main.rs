use clap::Parser;
use smith_cli::{cli::Cli, commands, logging, output};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli).await {
		// The run summary already carries the verdict
		if err.is_output_already_printed() {
			eprintln!("error: {err}");
		} else {
			output::print_error(command, &format!("{err:#}"), format);
		}
		std::process::exit(1);
	}
}
