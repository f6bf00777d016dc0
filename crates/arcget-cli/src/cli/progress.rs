//! Stdout progress printer for one transfer at a time.

use arcget_core::progress::ProgressSink;
use std::cell::Cell;
use std::io::Write;
use std::time::Instant;

const PROGRESS_INTERVAL_MS: u128 = 500;

/// Prints a carriage-return progress line per transfer and a status line per
/// file. Interior mutability because the sink is shared immutably.
pub struct PrintProgress {
    total: Cell<u64>,
    done: Cell<u64>,
    printed: Cell<bool>,
    last_print: Cell<Option<Instant>>,
}

impl PrintProgress {
    pub fn new() -> Self {
        Self {
            total: Cell::new(0),
            done: Cell::new(0),
            printed: Cell::new(false),
            last_print: Cell::new(None),
        }
    }

    fn print_line(&self) {
        let done_mib = self.done.get() as f64 / 1_048_576.0;
        if self.total.get() > 0 {
            let total_mib = self.total.get() as f64 / 1_048_576.0;
            let pct = (self.done.get() as f64 / self.total.get() as f64 * 100.0).min(100.0);
            print!("\r  {:.1} / {:.1} MiB ({:.1}%)  ", done_mib, total_mib, pct);
        } else {
            print!("\r  {:.1} MiB  ", done_mib);
        }
        let _ = std::io::stdout().flush();
        self.printed.set(true);
        self.last_print.set(Some(Instant::now()));
    }
}

impl ProgressSink for PrintProgress {
    fn file_started(&self, name: &str) {
        println!("fetching {}", name);
        self.total.set(0);
        self.done.set(0);
        self.printed.set(false);
        self.last_print.set(None);
    }

    fn begin(&self, total: u64) {
        self.total.set(total);
    }

    fn advance(&self, n: u64) {
        self.done.set(self.done.get() + n);
        let due = match self.last_print.get() {
            Some(t) => t.elapsed().as_millis() >= PROGRESS_INTERVAL_MS,
            None => true,
        };
        if due || (self.total.get() > 0 && self.done.get() >= self.total.get()) {
            self.print_line();
        }
    }

    fn finish(&self) {
        if self.printed.get() {
            println!();
        }
    }

    fn file_done(&self, name: &str, line: &str) {
        println!("{}: {}", name, line);
    }
}
