//! String art CLI - Run chord selection jobs from JSON files.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::path::PathBuf;
use std::time::Instant;

use string_art::{JobConfig, JobContext, REGISTRY};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <job.json>", args[0]);
        eprintln!();
        eprintln!("Select string art chords for the image in a job file.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  job.json  Path to job file (parameters + image)");
        eprintln!();
        eprintln!("Algorithms: {}", REGISTRY.keys().join(", "));
        eprintln!("An example job file is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_job();
        return;
    }

    let job_path = PathBuf::from(&args[1]);
    let job = JobConfig::from_path(&job_path).unwrap_or_else(|e| {
        eprintln!("Error loading job: {}", e);
        std::process::exit(1);
    });

    eprintln!("String Art");
    eprintln!("==========");
    eprintln!("Image: {}x{}", job.image.width, job.image.height);
    eprintln!("Algorithm: {}", job.params.algorithm);
    eprintln!("Anchors: {}", job.params.n_anchors);
    eprintln!("Strings: {}", job.params.n_strings);
    eprintln!();

    let n_strings = job.params.n_strings;
    let start = Instant::now();
    let handle = JobContext::spawn(job).unwrap_or_else(|e| {
        eprintln!("Error starting job: {}", e);
        std::process::exit(1);
    });

    let result = handle
        .wait_with(|index, from, to| {
            eprintln!("  [{}/{}] {} -> {}", index + 1, n_strings, from, to);
        })
        .unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        });

    eprintln!();
    eprintln!(
        "Done: {} strings ({:?}) in {:.2}s",
        result.len(),
        result.stop_reason,
        start.elapsed().as_secs_f32()
    );

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing result: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_example_job() {
    match serde_json::to_string_pretty(&JobConfig::example()) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing example: {}", e);
            std::process::exit(1);
        }
    }
}
