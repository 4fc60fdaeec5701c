//! LC-3 Emulator - CLI Entry Point
//!
//! Commands:
//! - `lc3-emu run <program>` - Run an object image on the terminal
//! - `lc3-emu disasm <image>` - Disassemble an object image

use clap::{Parser, Subcommand};
use lc3::{BufferedConsole, FrameQueue, Instruction, ObjectImage, Registers, RunState, SliceOutcome, Vm, VmConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lc3-emu")]
#[command(version = "0.1.0")]
#[command(about = "An emulator for the LC-3 instructional computer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Path to the object image to execute
        program: String,
        /// Operating-system image loaded before the program
        #[arg(long)]
        os: Option<String>,
        /// Instructions per scheduling slice
        #[arg(short, long)]
        quantum: Option<u32>,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<String>,
        /// Run headless, feeding this text as keyboard input
        #[arg(short, long)]
        input: Option<String>,
        /// Print every instruction (implies headless)
        #[arg(short, long)]
        trace: bool,
        /// Stop a headless run after this many instructions
        #[arg(long, default_value = "10000000")]
        max_cycles: u64,
        /// Print the final registers as JSON, the last instruction and memory around PC
        #[arg(long)]
        dump: bool,
    },
    /// Disassemble an object image
    Disasm {
        /// Path to the object image
        image: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { program, os, quantum, config, input, trace, max_cycles, dump } => {
            let config = build_config(config.as_deref(), quantum);
            let mut vm = build_vm(&program, os.as_deref(), config);

            let headless = trace || input.is_some() || !cfg!(feature = "term");
            if headless {
                run_headless(&mut vm, input.as_deref().unwrap_or(""), trace, max_cycles);
                if dump {
                    let memory = vm.cpu.memory_near_pc();
                    dump_state(&DumpView {
                        registers: &vm.cpu.regs,
                        state: vm.state(),
                        cycles: vm.cpu.cycles,
                        last_instruction: vm.cpu.last_instruction(),
                        memory: &memory,
                    });
                }
            } else {
                run_interactive(vm, dump);
            }
        }
        Commands::Disasm { image } => {
            disassemble_file(&image);
        }
    }
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("❌ {}", message);
    std::process::exit(1);
}

fn build_config(path: Option<&str>, quantum: Option<u32>) -> VmConfig {
    let config = match path {
        Some(path) => VmConfig::from_file(path).unwrap_or_else(|e| fail(format!("Failed to read config: {}", e))),
        None => VmConfig::default(),
    };
    match quantum {
        Some(quantum) => VmConfig::with_quantum(quantum).unwrap_or_else(|e| fail(format!("Invalid --quantum: {}", e))),
        None => config,
    }
}

fn read_image(path: &str) -> ObjectImage {
    lc3::read_object(path).unwrap_or_else(|e| fail(format!("Failed to read {}: {}", path, e)))
}

fn build_vm(program: &str, os: Option<&str>, config: VmConfig) -> Vm<BufferedConsole, FrameQueue> {
    let mut vm = Vm::new(BufferedConsole::new(), FrameQueue::new(), config);

    if let Some(os) = os {
        vm.set_os(read_image(os));
        if let Err(e) = vm.load_operating_system_image() {
            fail(format!("Failed to load OS: {}", e));
        }
    }

    let image = read_image(program);
    if let Err(e) = vm.load(&image) {
        fail(format!("Failed to load program: {}", e));
    }
    tracing::info!("loaded {} words at {:#06x}", image.len(), image.origin);

    vm
}

fn run_headless(vm: &mut Vm<BufferedConsole, FrameQueue>, input: &str, trace: bool, max_cycles: u64) {
    use lc3::image::format_instruction;

    vm.console_mut().push_str(input);
    vm.schedule_execution();

    let end = loop {
        let remaining = max_cycles.saturating_sub(vm.cpu.cycles);
        if remaining == 0 {
            break None;
        }

        if trace {
            let pc = vm.cpu.regs.pc;
            match vm.step() {
                None => eprintln!(
                    "x{:04X}: {:<24} R0={:#06x} R7={:#06x} CC={:?}",
                    pc,
                    vm.cpu.last_instruction().map(|i| format_instruction(&i)).unwrap_or_default(),
                    vm.cpu.regs.get(0),
                    vm.cpu.regs.get(7),
                    vm.cpu.regs.cond
                ),
                end => break end,
            }
        } else {
            match vm.poll_frame_within(remaining) {
                Some(SliceOutcome::Yielded) => {}
                end => break end,
            }
        }

        print!("{}", vm.console_mut().take_output_string());
    };

    print!("{}", vm.console_mut().take_output_string());
    println!();

    match end {
        Some(SliceOutcome::Stopped) => eprintln!("✓ Halted after {} instructions", vm.cpu.cycles),
        Some(SliceOutcome::Suspended) => eprintln!("⚠️  Waiting for input after {} instructions", vm.cpu.cycles),
        Some(SliceOutcome::Halted) => {
            let reason = vm.halt_reason().map(|e| e.to_string()).unwrap_or_default();
            fail(format!("CPU error at PC=x{:04X}: {}", vm.cpu.regs.pc.wrapping_sub(1), reason));
        }
        Some(SliceOutcome::Yielded) | None => {
            eprintln!("⚠️  Reached max cycles limit ({}). Use --max-cycles to increase.", max_cycles);
        }
    }
}

#[cfg(feature = "term")]
fn run_interactive(vm: Vm<BufferedConsole, FrameQueue>, dump: bool) {
    let summary = match lc3::term::run_terminal(vm) {
        Ok(summary) => summary,
        Err(e) => fail(format!("Terminal error: {}", e)),
    };

    if dump {
        dump_state(&DumpView {
            registers: &summary.registers,
            state: summary.state,
            cycles: summary.cycles,
            last_instruction: summary.last_instruction,
            memory: &summary.memory,
        });
    }
    if let Some(reason) = summary.halt_reason {
        fail(format!("CPU error: {}", reason));
    }
    if summary.interrupted {
        eprintln!("Interrupted after {} instructions", summary.cycles);
    }
}

#[cfg(not(feature = "term"))]
fn run_interactive(_vm: Vm<BufferedConsole, FrameQueue>, _dump: bool) {
    fail("built without terminal support; pass --input to run headless");
}

/// Final machine state printed by `--dump`.
struct DumpView<'a> {
    registers: &'a Registers,
    state: RunState,
    cycles: u64,
    last_instruction: Option<Instruction>,
    memory: &'a [(u16, u16)],
}

fn dump_state(view: &DumpView<'_>) {
    use lc3::image::{disassemble_instruction, format_instruction};

    match serde_json::to_string_pretty(view.registers) {
        Ok(json) => {
            println!("{}", json);
            println!("state: {:?}, cycles: {}", view.state, view.cycles);
        }
        Err(e) => fail(format!("Failed to serialize registers: {}", e)),
    }

    if let Some(instr) = view.last_instruction {
        println!("last: {}", format_instruction(&instr));
    }
    for &(addr, word) in view.memory {
        let marker = if addr == view.registers.pc { "=>" } else { "  " };
        println!("{} x{:04X}: x{:04X}  {}", marker, addr, word, disassemble_instruction(word));
    }
}

fn disassemble_file(path: &str) {
    let image = read_image(path);
    print!("{}", lc3::disassemble(image.origin, &image.words));
}
