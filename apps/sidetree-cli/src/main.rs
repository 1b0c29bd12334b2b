mod fs_cas;

use std::{path::PathBuf, sync::Arc};

use clap::Parser as _;
use color_eyre::eyre::{Context as _, Result};
use sidetree_core::{
	composer::PatchComposer, compression::CompressionProvider, operation::QueuedOperation,
	AnchoredOperation, Applier, OperationHandler, OperationParser, Protocol,
	ResolutionModel,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::fs_cas::FsCas;

#[derive(clap::Parser, Debug)]
struct Cli {
	/// JSON file with protocol parameters. Unset fields keep their defaults.
	#[clap(long, env = "SIDETREE_PROTOCOL")]
	protocol: Option<PathBuf>,
	#[clap(long, env = "SIDETREE_NAMESPACE", default_value = "did:sidetree")]
	namespace: String,
	#[clap(subcommand)]
	command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
	/// Writes operation requests to CAS as a single batch, and prints the
	/// anchor string.
	Batch {
		#[clap(long, env = "SIDETREE_CAS_DIR")]
		cas_dir: PathBuf,
		#[clap(required = true)]
		files: Vec<PathBuf>,
	},
	/// Applies the operation requests in order, as if each was anchored in its
	/// own transaction, and prints the resolved state.
	Resolve {
		#[clap(required = true)]
		files: Vec<PathBuf>,
	},
}

fn main() -> Result<()> {
	color_eyre::install()?;
	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or("info".into()))
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();

	let cli = Cli::parse();
	let protocol = match &cli.protocol {
		Some(path) => {
			let bytes = std::fs::read(path).wrap_err_with(|| {
				format!("failed to read protocol file {}", path.display())
			})?;
			serde_json::from_slice(&bytes).wrap_err("failed to parse protocol file")?
		}
		None => Protocol::default(),
	};

	match cli.command {
		Command::Batch { cas_dir, files } => {
			let anchor = batch(protocol, &cli.namespace, cas_dir, &files)?;
			println!("{anchor}");
		}
		Command::Resolve { files } => {
			let rm = resolve(protocol, &cli.namespace, &files)?;
			println!("{}", serde_json::to_string_pretty(&rm)?);
		}
	}
	Ok(())
}

fn read_all(files: &[PathBuf]) -> Result<Vec<Vec<u8>>> {
	files
		.iter()
		.map(|path| {
			std::fs::read(path)
				.wrap_err_with(|| format!("failed to read operation {}", path.display()))
		})
		.collect()
}

fn batch(
	protocol: Protocol,
	namespace: &str,
	cas_dir: PathBuf,
	files: &[PathBuf],
) -> Result<String> {
	let cas = FsCas::new(&cas_dir)
		.wrap_err_with(|| format!("failed to open cas dir {}", cas_dir.display()))?;
	let handler =
		OperationHandler::new(protocol, Arc::new(cas), Arc::new(CompressionProvider));
	let ops: Vec<QueuedOperation> = read_all(files)?
		.into_iter()
		.map(|operation_buffer| QueuedOperation {
			namespace: namespace.to_owned(),
			operation_buffer,
		})
		.collect();
	handler.prepare_batch(&ops).wrap_err("failed to prepare batch")
}

/// A minimal resolution loop. Rejected operations are skipped.
fn resolve(protocol: Protocol, namespace: &str, files: &[PathBuf]) -> Result<ResolutionModel> {
	let parser = OperationParser::new(protocol.clone());
	let applier = Applier::new(protocol, Arc::new(PatchComposer));
	let mut rm = ResolutionModel::default();
	for (number, (path, buf)) in files.iter().zip(read_all(files)?).enumerate() {
		let op = match parser.parse_anchored(namespace, &buf) {
			Ok(op) => op,
			Err(err) => {
				warn!(path = %path.display(), %err, "skipping unparseable operation");
				continue;
			}
		};
		let number = u64::try_from(number).wrap_err("too many operations")?;
		let anchored = AnchoredOperation::from_operation(&op, number, number);
		match applier.apply(&anchored, &rm) {
			Ok(next) => {
				info!(path = %path.display(), did = %op.id(), "applied operation");
				rm = next;
			}
			Err(err) => warn!(path = %path.display(), %err, "skipping rejected operation"),
		}
	}
	Ok(rm)
}
