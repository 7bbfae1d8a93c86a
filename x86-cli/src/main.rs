//! Outer run-loop: loads an image, wires the core to reference device
//! windows, optionally arms watchpoints from the command line, and steps
//! to completion or to a fatal halt.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use x86_core::dispatch::ControlTransfer;
use x86_core::mem::{NullPortBus, PhysicalMemory};
use x86_core::Emulator;
use x86_dbg::{EventTrace, FunctionTracer, InstructionRing, NoSymbols, SymbolResolver, WatchpointManager};
use x86_loader::{load_flat, SymbolTable};

/// Run a flat i386 binary image to completion under the teaching core.
#[derive(Parser, Debug)]
#[command(name = "x86-emu", version, about)]
struct Args {
    /// Path to the binary image to load.
    image: PathBuf,

    /// Physical address the image is loaded at.
    #[arg(long, default_value_t = 0)]
    load_addr: u32,

    /// PC the CPU starts executing from. Defaults to `load_addr`.
    #[arg(long)]
    reset_vector: Option<u32>,

    /// RAM size in bytes.
    #[arg(long, default_value_t = 0x0010_0000)]
    ram_size: usize,

    /// ELF file to pull `.symtab` function symbols from for the call
    /// tracer. If unset, function-trace entries show `???`.
    #[arg(long)]
    symbols: Option<PathBuf>,

    /// Watchpoint expression, may be repeated.
    #[arg(long = "watch")]
    watches: Vec<String>,

    /// Maximum instructions to execute before giving up.
    #[arg(long, default_value_t = 10_000_000)]
    max_insts: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let exit_code = run(&args)?;
    std::process::exit(exit_code);
}

fn run(args: &Args) -> Result<i32> {
    let image = fs::read(&args.image)
        .with_context(|| format!("reading image {}", args.image.display()))?;

    let mut mem = PhysicalMemory::new(args.ram_size);
    load_flat(&mut mem, args.load_addr, &image);

    let reset_vector = args.reset_vector.unwrap_or(args.load_addr);
    let stack_top = args.ram_size as u32;
    let mut emu = Emulator::new(mem, NullPortBus, reset_vector, stack_top);

    let symbols: Box<dyn SymbolResolver> = match &args.symbols {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("reading symbol file {}", path.display()))?;
            Box::new(SymbolTable::from_elf_bytes(&bytes).context("parsing ELF symbols")?)
        }
        None => Box::new(NoSymbols),
    };

    let mut watchpoints = WatchpointManager::new();
    for expr in &args.watches {
        match watchpoints.set(expr, &emu.cpu.regs, &mut emu.mmu) {
            Ok(number) => tracing::info!(number, %expr, "watchpoint armed"),
            Err(err) => tracing::warn!(%expr, %err, "failed to arm watchpoint"),
        }
    }

    let mut ring = InstructionRing::new();
    let mut ftrace = FunctionTracer::new();
    let mut events = EventTrace::new();

    for _ in 0..args.max_insts {
        let report = match emu.step() {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(%err, "fatal halt");
                dump_ring(&ring);
                return Ok(1);
            }
        };

        ring.push(format!("{:#010x}: {}", report.pc, report.mnemonic));

        match report.control_transfer {
            Some(ControlTransfer::Call { target }) => {
                let entry = ftrace.on_call(report.pc, target, symbols.as_ref());
                tracing::debug!("{}", entry.render());
            }
            Some(ControlTransfer::Ret) => {
                let entry = ftrace.on_ret(report.pc, symbols.as_ref());
                tracing::debug!("{}", entry.render());
            }
            Some(ControlTransfer::Interrupt(event)) => {
                events.record(event);
            }
            None => {}
        }

        if let Some(change) = watchpoints.scan(&emu.cpu.regs, &mut emu.mmu) {
            tracing::info!(
                number = change.number,
                old = change.old_value,
                new = change.new_value,
                "watchpoint fired"
            );
        }

        if report.mnemonic == "int3" {
            let exit_code = emu.cpu.regs.read(x86_core::regs::EAX, x86_core::regs::Width::Dword) as i32;
            tracing::info!(exit_code, "int3 trap, exiting");
            dump_ring(&ring);
            return Ok(exit_code);
        }
    }

    tracing::warn!(max_insts = args.max_insts, "instruction budget exhausted without trapping");
    dump_ring(&ring);
    Ok(124)
}

fn dump_ring(ring: &InstructionRing) {
    for line in ring.entries() {
        tracing::debug!("{line}");
    }
}
