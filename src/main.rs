use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{bail, IntoDiagnostic, Result, WrapErr};

use vmips::output::{self, file_message, message, MsgColor};
use vmips::{dump, Air, AsmParser, MachineState, RunEnvironment, RunStatus};

/// Vmips is an assembler and functional simulator for the VMIPS vector instruction set.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run `Code.asm` from a directory, loading and dumping register and memory state
    Run {
        /// Directory holding `Code.asm` and optional `SDMEM.txt`/`VDMEM.txt`
        iodir: PathBuf,
        /// Directory to write dumps to, defaults to the input directory
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Save the dynamic instruction flow as `trace.asm`
        #[arg(short, long)]
        trace: bool,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Create binary `.bin` file to run later or inspect
    Assemble {
        /// `.asm` file to assemble
        name: PathBuf,
        /// Destination to output `.bin` file
        dest: Option<PathBuf>,
    },
    /// Check a `.asm` file without running or outputting binary
    Check {
        /// File to check
        name: PathBuf,
    },
    /// Print the instructions of a `.bin` file as assembly
    Disasm {
        /// `.bin` file to decode
        name: PathBuf,
    },
    /// Run text `.asm` or binary `.bin` file directly and print registers to terminal
    Exec {
        /// `.asm` or `.bin` file to run
        name: PathBuf,
        /// Directory holding optional `SDMEM.txt`/`VDMEM.txt` images
        #[arg(short, long)]
        iodir: Option<PathBuf>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();
    env_logger::init();
    vmips::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(vmips::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        println!("\n~ vmips v{VERSION} ~");
        println!("{}", LOGO.truecolor(120, 190, 255).bold());
        println!("{SHORT_INFO}");
        return Ok(());
    };

    match command {
        Command::Run {
            iodir,
            out,
            trace,
            minimal,
        } => {
            output::set_minimal(minimal);
            let out = out.unwrap_or_else(|| iodir.clone());
            run_dir(&iodir, &out, trace || vmips::env::is_trace_enabled())
        }
        Command::Assemble { name, dest } => {
            file_message(Green, "Assembling", &name);
            let air = assemble(&name)?;
            let dest = dest.unwrap_or_else(|| name.with_extension("bin"));
            fs::write(&dest, air.to_bytes())
                .into_diagnostic()
                .wrap_err_with(|| format!("could not write {}", dest.display()))?;
            message(Green, "Finished", "emit binary");
            file_message(Green, "Saved", &dest);
            Ok(())
        }
        Command::Check { name } => {
            file_message(Green, "Checking", &name);
            let air = assemble(&name)?;
            message(
                Green,
                "Success",
                format!("no errors found in {} instructions!", air.len()),
            );
            Ok(())
        }
        Command::Disasm { name } => {
            output::set_minimal(true);
            for stmt in &load_binary(&name)? {
                println!("{}", stmt.instr);
            }
            Ok(())
        }
        Command::Exec {
            name,
            iodir,
            minimal,
        } => {
            output::set_minimal(minimal);
            file_message(Green, "Loading", &name);
            let air = match name.extension().and_then(|ext| ext.to_str()) {
                Some("bin") => load_binary(&name)?,
                Some("asm") => assemble(&name)?,
                Some(_) => bail!("File has unknown extension. Exiting..."),
                None => bail!("File has no extension. Exiting..."),
            };
            let state = match &iodir {
                Some(dir) => load_state(dir)?,
                None => MachineState::new(),
            };
            let mut env = RunEnvironment::new(air).with_state(state);
            message(Green, "Running", format!("{} instructions", env.program().len()));
            let outcome = execute(&mut env);
            output::print_registers(env.state());
            outcome
        }
    }
}

/// Assemble, run and dump a program directory.
fn run_dir(iodir: &Path, out: &Path, trace: bool) -> Result<()> {
    use MsgColor::*;
    file_message(Green, "Assembling", &iodir.join("Code.asm"));
    let air = assemble(&iodir.join("Code.asm"))?;
    let state = load_state(iodir)?;

    let mut env = RunEnvironment::new(air).with_state(state);
    if trace {
        env = env.with_trace();
    }
    message(Green, "Running", format!("{} instructions", env.program().len()));
    let outcome = execute(&mut env);

    // Dumps are written even if the run faulted
    fs::create_dir_all(out).into_diagnostic()?;
    let state = env.state();
    let files = [
        ("SRF.txt", dump::scalar_dump(state)),
        ("VRF.txt", dump::vector_dump(state)),
        ("SDMEMOP.txt", dump::memory_dump(&state.smem)),
        ("VDMEMOP.txt", dump::memory_dump(&state.vmem)),
    ];
    for (file, contents) in files {
        write_file(&out.join(file), &contents)?;
    }
    if let Some(trace) = env.trace() {
        write_file(&out.join("trace.asm"), &trace.to_string())?;
        message(Cyan, "Traced", format!("{} instructions", trace.lines().len()));
    }
    message(Green, "Dumped", format!("state to {}", out.display()));
    outcome
}

/// Step the program until it stops, bounded by the configured step limit.
fn execute(env: &mut RunEnvironment) -> Result<()> {
    let limit = vmips::env::step_limit();
    while *env.status() == RunStatus::Running {
        if env.steps() >= limit {
            bail!(
                "Program did not halt within {limit} steps (pc {}). Set VMIPS_STEP_LIMIT to raise the limit.",
                env.pc()
            );
        }
        env.step();
    }

    match env.status() {
        RunStatus::Faulted { line, fault } => {
            message(MsgColor::Red, "Faulted", format!("on line {line}"));
            Err(miette::Report::new(fault.clone())
                .wrap_err(format!("Execution stopped on line {line}")))
        }
        _ => {
            message(
                MsgColor::Cyan,
                "Halted",
                format!("after {} instructions", env.steps()),
            );
            Ok(())
        }
    }
}

/// Read memory images from a directory. Missing images leave memory zeroed.
fn load_state(dir: &Path) -> Result<MachineState> {
    let mut state = MachineState::new();
    for (file, mem) in [
        ("SDMEM.txt", &mut state.smem),
        ("VDMEM.txt", &mut state.vmem),
    ] {
        let path = dir.join(file);
        if !path.exists() {
            log::info!("{} not found, starting with zeroed {}", path.display(), mem.space());
            continue;
        }
        let text = read_file(&path)?;
        dump::load_memory_image(mem, &text)
            .wrap_err_with(|| format!("invalid memory image {}", path.display()))?;
    }
    Ok(state)
}

/// Return assembly intermediate representation of source file for further processing
fn assemble(name: &Path) -> Result<Air> {
    let contents = read_file(name)?;
    Ok(AsmParser::new(&contents).parse()?)
}

fn load_binary(name: &Path) -> Result<Air> {
    let bytes = fs::read(name)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not read {}", name.display()))?;
    Ok(Air::from_bytes(&bytes)?)
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not read {}", path.display()))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not write {}", path.display()))?;
    file_message(MsgColor::Green, "Saved", path);
    Ok(())
}

const LOGO: &str = r#"
 __   ___ __  __ ___ ___  ___
 \ \ / / |  \/  |_ _| _ \/ __|
  \ V /  | |\/| || ||  _/\__ \
   \_/   |_|  |_|___|_|  |___/"#;

const SHORT_INFO: &str = r"
Welcome to vmips, an assembler and functional simulator for the VMIPS
vector instruction set.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
