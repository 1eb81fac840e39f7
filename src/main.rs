use std::path::PathBuf;

use clap::{CommandFactory, Parser as ClapParser, error::ErrorKind};
use jmmc::{
    config::CompilerConfig,
    diagnostics::Diagnostic,
    frontend::SourceFile,
    pipeline::{self, Compilation},
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Syntax tree of the program, as produced by the parser
    source_file: PathBuf,

    /// Run the tree optimizer
    #[arg(short = 'O', long)]
    optimize: bool,

    /// Allocate registers. 0 minimizes without a bound, a positive value fails
    /// when a method needs more slots for its locals.
    #[arg(short = 'r', long, value_name = "N", allow_negative_numbers = true)]
    register_allocation: Option<i64>,

    /// Log the intermediate representation
    #[arg(short, long)]
    debug: bool,

    /// Print the intermediate representation instead of the assembly
    #[arg(long)]
    emit_ir: bool,

    /// Write the output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn flags(&self) -> Vec<(&'static str, String)> {
        let mut flags = vec![
            (CompilerConfig::OPTIMIZE, self.optimize.to_string()),
            (CompilerConfig::DEBUG, self.debug.to_string()),
        ];

        if let Some(registers) = self.register_allocation {
            flags.push((CompilerConfig::REGISTER_ALLOCATION, registers.to_string()));
        }

        flags
    }
}

fn report(diagnostics: &[Diagnostic], file_name: &str) -> ! {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic.render(file_name));
    }

    std::process::exit(1)
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if !args.source_file.is_file() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Input path '{}' is not a file!", args.source_file.display()),
            )
            .exit()
    }

    let flags = args.flags();
    let flags = flags.iter().map(|(key, value)| (*key, value.as_str()));
    let config = match CompilerConfig::from_flags(flags) {
        Ok(config) => config,
        Err(error) => Args::command().error(ErrorKind::InvalidValue, error).exit(),
    };

    let source_file = match SourceFile::read(args.source_file.clone()) {
        Ok(source_file) => source_file,
        Err(error) => Args::command()
            .error(
                ErrorKind::Io,
                format!("Failed to read '{}': {error}", args.source_file.display()),
            )
            .exit(),
    };
    let file_name = source_file.origin.to_string();

    let mut ast = match source_file.parse() {
        Ok(ast) => ast,
        Err(diagnostics) => report(&diagnostics, &file_name),
    };

    let Compilation { ir, assembly } = match pipeline::compile(&mut ast, &config) {
        Ok(compilation) => compilation,
        Err(diagnostics) => report(&diagnostics, &file_name),
    };

    let output = if args.emit_ir {
        ir.to_string()
    } else {
        assembly
    };

    match &args.output {
        Some(path) => {
            if let Err(error) = std::fs::write(path, output) {
                Args::command()
                    .error(
                        ErrorKind::Io,
                        format!("Failed to write '{}': {error}", path.display()),
                    )
                    .exit()
            }
        }
        None => print!("{output}"),
    }
}
