//! Command-line front end for the ruler search.
//!
//! Hand-rolled argument parsing (no parser dependency) to keep the
//! binary small and boot instant.
//!
//! ```text
//! ogr-rs <n> [--fast] [--threads=T] [--depth=D] [--max-len=L]
//! ogr-rs            # correctness pass + benchmark sweep
//! ```

use std::env;
use std::process::ExitCode;
use std::time::Instant;

use ogr_rs::cluster::{run_local_cluster, run_local_symmetric};
use ogr_rs::{optimal_length, solve_with_config, SolveConfig, Solution};

fn print_usage(exe: &str) {
    eprintln!(
        "usage: {exe} [n] [--fast] [--threads=T] [--depth=D] [--max-len=L] [--processes=P] [--symmetric]"
    );
    eprintln!("  n             number of marks (2..=24); omit to run the benchmark sweep");
    eprintln!("  --fast        seed the bound with the known optimal length (n <= 13)");
    eprintln!("  --threads=T   worker threads per process (default: all cores)");
    eprintln!("  --depth=D     prefix decomposition depth (default: auto)");
    eprintln!("  --max-len=L   length cap (default: known optimum, else 127)");
    eprintln!("  --processes=P run P coordinated ranks in-process (default: 1)");
    eprintln!("  --symmetric   use the static-partition protocol (P a power of two)");
}

fn main() -> ExitCode {
    let mut args = env::args();
    let exe = args.next().unwrap_or_else(|| "ogr-rs".into());

    let mut n: Option<u32> = None;
    let mut fast = false;
    let mut threads: usize = 0;
    let mut depth: u32 = 0;
    let mut max_len: Option<u32> = None;
    let mut processes: usize = 1;
    let mut symmetric = false;

    for arg in args {
        if let Some(rest) = arg.strip_prefix("--processes=") {
            match rest.parse() {
                Ok(p) if p >= 1 => processes = p,
                _ => return bad_arg(&exe, &arg),
            }
        } else if arg == "--symmetric" {
            symmetric = true;
        } else if let Some(rest) = arg.strip_prefix("--threads=") {
            match rest.parse() {
                Ok(t) => threads = t,
                Err(_) => return bad_arg(&exe, &arg),
            }
        } else if let Some(rest) = arg.strip_prefix("--depth=") {
            match rest.parse() {
                Ok(d) => depth = d,
                Err(_) => return bad_arg(&exe, &arg),
            }
        } else if let Some(rest) = arg.strip_prefix("--max-len=") {
            match rest.parse() {
                Ok(l) => max_len = Some(l),
                Err(_) => return bad_arg(&exe, &arg),
            }
        } else if arg == "--fast" {
            fast = true;
        } else if arg == "--help" || arg == "-h" {
            print_usage(&exe);
            return ExitCode::SUCCESS;
        } else if arg.starts_with("--") {
            eprintln!("unknown flag: {arg}");
            print_usage(&exe);
            return ExitCode::from(2);
        } else {
            match arg.parse() {
                Ok(v) => n = Some(v),
                Err(_) => return bad_arg(&exe, &arg),
            }
        }
    }

    match n {
        Some(n) => run_single(n, fast, threads, depth, max_len, processes, symmetric),
        None => run_sweep(threads),
    }
}

fn bad_arg(exe: &str, arg: &str) -> ExitCode {
    eprintln!("invalid argument: {arg}");
    print_usage(exe);
    ExitCode::FAILURE
}

fn run_single(
    n: u32,
    fast: bool,
    threads: usize,
    depth: u32,
    max_len: Option<u32>,
    processes: usize,
    symmetric: bool,
) -> ExitCode {
    let mut cfg = SolveConfig::new(n, max_len.or_else(|| optimal_length(n)).unwrap_or(127));
    cfg.threads = threads;
    cfg.prefix_depth = depth;
    if fast {
        match optimal_length(n) {
            Some(len) => cfg.initial_bound = Some(len),
            None => {
                eprintln!("--fast needs a tabulated optimum; none known for n={n}");
                return ExitCode::FAILURE;
            }
        }
    }

    let start = Instant::now();
    let result = if processes > 1 {
        if symmetric {
            run_local_symmetric(cfg, processes).map_err(|e| e.to_string())
        } else {
            run_local_cluster(cfg, processes).map_err(|e| e.to_string())
        }
    } else {
        solve_with_config(cfg).map_err(|e| e.to_string())
    };
    let solution = match result {
        Ok(s) => s,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let elapsed = start.elapsed().as_secs_f64();

    if solution.ruler.is_empty() {
        println!(
            "no {n}-mark ruler of length <= {} exists ({} states, {:.3} s)",
            cfg.clamped_max_len(),
            solution.explored,
            elapsed
        );
        return ExitCode::SUCCESS;
    }

    print_report(n, &solution, elapsed);

    if solution.ruler.is_golomb() {
        ExitCode::SUCCESS
    } else {
        eprintln!("result failed validation");
        ExitCode::FAILURE
    }
}

fn print_report(n: u32, solution: &Solution, elapsed: f64) {
    println!("n          : {n}");
    println!("length     : {}", solution.ruler.length);
    println!("time       : {elapsed:.3} s");
    println!("states     : {}", solution.explored);
    if elapsed > 0.0 {
        println!("states/sec : {:.2e}", solution.explored as f64 / elapsed);
    }
    println!("ruler      : {}", solution.ruler);
}

/// Bare invocation: verify the small sizes against the table, then
/// time the mid-range ones.
fn run_sweep(threads: usize) -> ExitCode {
    println!("{:>4} {:>9} {:>6} {:>12} {:>11}  {}", "n", "length", "ok", "states", "time", "ruler");

    let mut all_ok = true;
    for n in 2..=10u32 {
        let expected = optimal_length(n).expect("table covers 2..=13");
        let mut cfg = SolveConfig::new(n, expected);
        cfg.threads = threads;

        let start = Instant::now();
        let solution = match solve_with_config(cfg) {
            Ok(s) => s,
            Err(err) => {
                eprintln!("error at n={n}: {err}");
                return ExitCode::FAILURE;
            }
        };
        let elapsed = start.elapsed().as_secs_f64();

        let ok = solution.ruler.length == expected && solution.ruler.is_golomb();
        all_ok &= ok;

        println!(
            "{:>4} {:>9} {:>6} {:>12} {:>10.3}s  {}",
            n,
            solution.ruler.length,
            if ok { "yes" } else { "NO" },
            solution.explored,
            elapsed,
            solution.ruler
        );
    }

    if all_ok {
        ExitCode::SUCCESS
    } else {
        eprintln!("sweep failed: some lengths diverge from the known optima");
        ExitCode::FAILURE
    }
}
