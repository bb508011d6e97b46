use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
	/// The command already wrote its result envelope; only the exit code is
	/// left to report.
	#[error("{0}")]
	OutputAlreadyPrinted(String),

	#[error("invalid OID {0:?}")]
	InvalidOid(String),

	#[error("--timeout must be greater than zero")]
	ZeroTimeout,

	#[error(transparent)]
	Config(#[from] smith::ConfigError),

	#[error(transparent)]
	Harness(#[from] smith::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl CliError {
	/// When true, the caller exits with code 1 without printing another
	/// envelope.
	pub fn is_output_already_printed(&self) -> bool {
		matches!(self, CliError::OutputAlreadyPrinted(_))
	}
}
