//! retroasm binary.

use std::fs::File;
use std::io::{Read, Write};
use std::sync::Arc;

use clap::Parser;
use log::LevelFilter;
use retroasm::cli::{Cpu, OutputFormat, RetroasmCli, TerminalFrontend};
use retroasm::{AssemblyCode, AssemblyError, Backend, MachineConfig, Mos6502, Z80, assemble, pretty_hex};

fn main() -> miette::Result<()> {
	human_panic::setup_panic!(human_panic::metadata!());
	miette::set_hook(Box::new(|_| {
		Box::new(
			miette::MietteHandlerOpts::new().unicode(true).context_lines(3).tab_width(4).with_cause_chain().build(),
		)
	}))?;

	let arguments = RetroasmCli::parse();
	let log_level = match arguments.verbose {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		2 => LevelFilter::Debug,
		3 .. => LevelFilter::Trace,
	};
	simple_logger::SimpleLogger::new().with_level(log_level).init().map_err(|error| miette::miette!("{error}"))?;

	let code = read_input(&arguments).map_err(|error| miette::Report::new(*error))?;
	let assembled = match arguments.cpu {
		Cpu::Z80 | Cpu::Z80n => assemble_with::<Z80>(&code, &arguments),
		_ => assemble_with::<Mos6502>(&code, &arguments),
	};
	let assembled = match assembled {
		Ok(assembled) => assembled,
		Err(error) => {
			report_failure(*error);
			std::process::exit(1);
		},
	};

	let mut output: Box<dyn Write> = match &arguments.output {
		Some(path) if path.to_string_lossy() != "-" => Box::new(std::io::BufWriter::new(
			File::options().create(true).truncate(true).write(true).open(path).map_err(|error| {
				miette::Report::new(AssemblyError::FileNotFound {
					os_error:  error,
					file_name: path.to_string_lossy().to_string(),
					src:       code.clone(),
					location:  (0, 0).into(),
				})
			})?,
		)),
		_ => Box::new(std::io::stdout()),
	};
	match arguments.output_format {
		OutputFormat::Plain => output.write_all(&assembled),
		OutputFormat::HexDump => output.write_all(pretty_hex(&assembled, None).as_bytes()),
	}
	.and_then(|()| output.flush())
	.map_err(|error| miette::miette!("could not write output: {error}"))?;
	Ok(())
}

fn read_input(arguments: &RetroasmCli) -> Result<Arc<AssemblyCode>, Box<AssemblyError>> {
	if arguments.input.to_string_lossy() == "-" {
		let mut text = String::new();
		std::io::stdin().read_to_string(&mut text).map_err(|os_error| AssemblyError::FileNotFound {
			os_error,
			file_name: "<stdin>".to_owned(),
			src: Arc::new(AssemblyCode::new("", "<stdin>")),
			location: (0, 0).into(),
		})?;
		Ok(Arc::new(AssemblyCode::new(&text, "<stdin>")))
	} else {
		AssemblyCode::from_file_or_assembly_error(&arguments.input.to_string_lossy())
	}
}

/// Assembles and links with the back end `B`, starting from the CPU chosen on the command line.
fn assemble_with<B: Backend>(code: &Arc<AssemblyCode>, arguments: &RetroasmCli) -> Result<Vec<u8>, Box<AssemblyError>> {
	let mut config = MachineConfig::new(B::cpu(arguments.cpu.name()).unwrap_or_else(B::default_features));
	config.synthetic_instructions = !arguments.no_synth;
	let frontend = TerminalFrontend { options: arguments.warning_flags.clone() };
	let program = assemble::<B>(code, config, &frontend)?;
	program.link(arguments.base)
}

/// Prints every error of a failed run.
fn report_failure(error: AssemblyError) {
	match error {
		AssemblyError::AssemblyFailed { errors, count } => {
			for error in errors {
				eprintln!("{:?}", miette::Report::new(error));
			}
			eprintln!("{count} error(s) found, no output written");
		},
		error => eprintln!("{:?}", miette::Report::new(error)),
	}
}
