/*!
  Driver for the Successor Virtual Machine: loads a bytecode program file,
  executes it against the real console, and exits with the machine's status
  code. A second mode reports the maximum heap capacity reachable under each
  growth policy for a given initial segment size.
*/

#[macro_use]
extern crate prettytable;
#[macro_use]
extern crate lazy_static;

mod bytecode;
mod console;
mod error;
mod heap;
mod registers;
mod stack;
mod svm;

use std::env;
use std::fs;
use std::io;
use std::process;

use crate::bytecode::Word;
use crate::console::StandardConsole;
use crate::heap::{report_max_heap_size, GrowthPolicy};
use crate::svm::{ExitStatus, SVM};

/// Exit code for problems outside the machine itself: bad arguments,
/// unreadable program files, infeasible configurations.
const EXIT_USAGE: i32 = 2;

fn main() {
  let arguments: Vec<String> = env::args().skip(1).collect();

  let code = match arguments.as_slice() {
    [flag, slots] if flag == "--heap-report" => {
      match slots.parse::<i32>() {
        Ok(slots) => heap_report(slots),
        Err(_) => {
          eprintln!("invalid slot count: {}", slots);
          EXIT_USAGE
        }
      }
    }

    [path] => run_program(path),

    _ => {
      print_usage();
      EXIT_USAGE
    }
  };

  process::exit(code);
}

fn print_usage() {
  eprintln!("Usage:");
  eprintln!("  successor <program.svm>          run a bytecode program");
  eprintln!("  successor --heap-report <slots>  print maximum heap capacities");
}

fn run_program(path: &str) -> i32 {
  let program = match load_program(path) {
    Ok(words) => words,
    Err(error) => {
      eprintln!("{}: {}", path, error);
      return EXIT_USAGE;
    }
  };

  let mut machine = match SVM::new(program, StandardConsole) {
    Ok(machine) => machine,
    Err(error) => {
      eprintln!("{}", error);
      return EXIT_USAGE;
    }
  };

  let status = machine.execute();
  if let ExitStatus::Failure(fault) = &status {
    eprintln!("{}", fault);
  }
  status.code()
}

/// Program files are a flat sequence of little-endian 32-bit words, the
/// command and immediate words of each instruction interleaved.
fn load_program(path: &str) -> Result<Vec<Word>, io::Error> {
  let bytes = fs::read(path)?;
  if bytes.len() % 4 != 0 {
    return Err(io::Error::new(
      io::ErrorKind::InvalidData,
      "file length is not a multiple of four bytes"
    ));
  }
  let words = bytes
    .chunks_exact(4)
    .map(|chunk| Word::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
    .collect();
  Ok(words)
}

fn heap_report(slots: i32) -> i32 {
  let policies = [
    GrowthPolicy::Linear,
    GrowthPolicy::Quadratic,
    GrowthPolicy::Exponential,
  ];

  for &growth in &policies {
    match report_max_heap_size(growth, slots) {
      Ok(report) => println!("{:<12} {}", growth, report),
      Err(error) => {
        eprintln!("{}: {}", growth, error);
        return EXIT_USAGE;
      }
    }
  }
  0
}
