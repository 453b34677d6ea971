use std::io::BufRead;

use clap::Parser;
use intcode::program;
use intcode::{Fault, Machine, MemoryPolicy, Status};

#[derive(Parser)]
#[command(name = "intcode", about = "Intcode: run and debug Intcode programs")]
struct Cli {
    /// File holding the program as a comma-separated list of integers.
    program: std::path::PathBuf,

    /// Initial input values, comma-separated (e.g. 1,2,3).
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    input: String,

    /// Address space policy (bounded, unbounded).
    #[arg(long, default_value_t = MemoryPolicy::Unbounded)]
    memory: MemoryPolicy,

    /// Execute at most this many instructions.
    #[arg(long)]
    steps: Option<usize>,

    /// Suspend before the instruction at this address (repeatable).
    #[arg(long = "breakpoint")]
    breakpoints: Vec<usize>,

    /// Read further input from stdin when the program waits, and continue
    /// past breakpoints after printing the surrounding memory.
    #[arg(long)]
    interactive: bool,

    /// Print every memory cell changed by the run.
    #[arg(long)]
    diff: bool,

    /// Print a disassembly of the program and exit.
    #[arg(long)]
    disassemble: bool,

    /// Run in benchmark mode: suppress output, print throughput stats.
    #[arg(long)]
    benchmark: bool,

    /// Number of runs in benchmark mode.
    #[arg(long, default_value_t = 1000)]
    iterations: usize,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let text = match std::fs::read_to_string(&cli.program) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Cannot read {}: {e}", cli.program.display());
            std::process::exit(1);
        }
    };
    let (code, input) = match (program::parse(&text), program::parse(&cli.input)) {
        (Ok(code), Ok(input)) => (code, input),
        (Err(e), _) => {
            eprintln!("Invalid program: {e}");
            std::process::exit(1);
        }
        (_, Err(e)) => {
            eprintln!("Invalid input: {e}");
            std::process::exit(1);
        }
    };

    if cli.disassemble {
        let vm = Machine::new(&code, &[], cli.memory);
        print!("{}", vm.disassemble());
        return;
    }

    if cli.benchmark {
        run_benchmark(&cli, &code, &input);
        return;
    }

    let mut vm = Machine::new(&code, &input, cli.memory);
    for &address in &cli.breakpoints {
        vm.set_breakpoint(address);
    }

    let status = drive(&mut vm, &cli);

    for value in vm.output_log() {
        println!("{value}");
    }
    if cli.diff {
        for change in vm.snapshot_diff() {
            println!("{change}");
        }
    }
    eprintln!(
        "{status} at pc {} after {} cycles",
        vm.program_counter(),
        vm.cycle_count()
    );
    if status == Status::Faulted {
        std::process::exit(1);
    }
}

/// Run the machine until it stops for a reason the user has to see.
fn drive(vm: &mut Machine, cli: &Cli) -> Status {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let budget = cli.steps.map(|n| n as u64);

    loop {
        let result = match budget {
            Some(limit) => {
                let remaining = limit.saturating_sub(vm.cycle_count());
                if remaining == 0 {
                    return vm.status();
                }
                vm.run_for(remaining as usize)
            }
            None => vm.run(),
        };
        match result {
            Err(fault) => {
                eprintln!("Fault: {fault}");
                return Status::Faulted;
            }
            Ok(Status::WaitingForInput) if cli.interactive => {
                // Show what the program printed before asking.
                for value in vm.take_output() {
                    println!("{value}");
                }
                eprint!("input> ");
                let Some(Ok(line)) = lines.next() else {
                    return Status::WaitingForInput;
                };
                match line.trim().parse::<i64>() {
                    Ok(value) => vm.push_input(value),
                    Err(e) => eprintln!("Not an integer: {e}"),
                }
            }
            Ok(Status::AtBreakpoint) if cli.interactive => {
                let pc = vm.program_counter();
                eprintln!("Breakpoint at pc {pc} (rb = {})", vm.relative_base());
                eprint!("{}", vm.dump(pc, 1, 4));
            }
            Ok(status) => return status,
        }
    }
}

/// Totals gathered over repeated runs of the same program.
#[derive(Debug, Default)]
struct Tally {
    total_cycles: u64,
    faulted: usize,
    first_fault: Option<Fault>,
}

/// Run fresh machines `iterations` times, counting cycles and faults.
fn run_repeatedly(
    code: &[i64],
    input: &[i64],
    memory: MemoryPolicy,
    steps: Option<usize>,
    iterations: usize,
) -> Tally {
    let mut tally = Tally::default();
    for _ in 0..iterations {
        let mut vm = Machine::new(code, input, memory);
        let result = match steps {
            Some(n) => vm.run_for(n),
            None => vm.run(),
        };
        if let Err(fault) = result {
            tally.faulted += 1;
            tally.first_fault.get_or_insert(fault);
        }
        tally.total_cycles += vm.cycle_count();
    }
    tally
}

fn run_benchmark(cli: &Cli, code: &[i64], input: &[i64]) {
    let start = std::time::Instant::now();
    let tally = run_repeatedly(code, input, cli.memory, cli.steps, cli.iterations);
    let elapsed = start.elapsed();

    let runs_per_sec = cli.iterations as f64 / elapsed.as_secs_f64();
    let cycles_per_sec = tally.total_cycles as f64 / elapsed.as_secs_f64();

    eprintln!("Benchmark results:");
    eprintln!("  Runs:              {}", cli.iterations);
    eprintln!("  Memory:            {}", cli.memory);
    eprintln!("  Total cycles:      {}", tally.total_cycles);
    eprintln!("  Elapsed:           {elapsed:.2?}");
    eprintln!("  Runs/sec:          {runs_per_sec:.1}");
    eprintln!("  Cycles/sec:        {cycles_per_sec:.0}");
    eprintln!("  Faulted runs:      {}", tally.faulted);
    if let Some(fault) = tally.first_fault {
        eprintln!("  First fault:       {fault}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_runs_count_cycles() {
        let tally = run_repeatedly(&[1101, 2, 3, 5, 99, 0], &[], MemoryPolicy::Bounded, None, 4);
        assert_eq!(tally.total_cycles, 8);
        assert_eq!(tally.faulted, 0);
        assert!(tally.first_fault.is_none());
    }

    #[test]
    fn test_repeated_runs_count_faults() {
        // Reads address 10, past the end of bounded memory.
        let tally = run_repeatedly(&[4, 10, 99], &[], MemoryPolicy::Bounded, None, 3);
        assert_eq!(tally.faulted, 3);
        assert_eq!(tally.first_fault, Some(Fault::Address { pc: 0, address: 10 }));
    }

    #[test]
    fn test_repeated_runs_respect_step_limit() {
        // Infinite loop, cut off by the step limit on every run.
        let tally = run_repeatedly(&[1105, 1, 0], &[], MemoryPolicy::Bounded, Some(5), 2);
        assert_eq!(tally.total_cycles, 10);
        assert_eq!(tally.faulted, 0);
    }
}
