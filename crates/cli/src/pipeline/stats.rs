//! Run statistics printed after a pipeline run.

use std::time::Duration;

/// Final counters for one destination's stage.
#[derive(Debug, Clone)]
pub struct DestinationStats {
    /// Destination name from the blueprint
    pub destination: String,

    /// Writer kind backing it
    pub kind: String,

    /// Payloads handed to a worker
    pub payloads_dispatched: u64,

    /// Payloads written successfully
    pub payloads_written: u64,

    /// Records inside successfully written payloads
    pub records_written: u64,

    /// Failed write attempts
    pub write_failures: u64,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Per-destination stage counters
    pub destinations: Vec<DestinationStats>,

    /// Wall-clock duration of the run
    pub elapsed: Duration,

    /// True when a signal or the --duration deadline cut the run short
    pub interrupted: bool,
}

impl RunSummary {
    pub fn total_payloads_written(&self) -> u64 {
        self.destinations.iter().map(|d| d.payloads_written).sum()
    }

    pub fn total_records_written(&self) -> u64 {
        self.destinations.iter().map(|d| d.records_written).sum()
    }

    pub fn total_write_failures(&self) -> u64 {
        self.destinations.iter().map(|d| d.write_failures).sum()
    }

    /// Records per second across all destinations
    pub fn records_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.total_records_written() as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Drain Run Statistics                    ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.elapsed.as_secs_f64());
        println!("   ├─ Payloads written: {}", self.total_payloads_written());
        println!("   ├─ Records written: {}", self.total_records_written());
        println!("   ├─ Write failures: {}", self.total_write_failures());
        println!("   ├─ Throughput: {:.2} records/s", self.records_per_second());
        println!("   └─ Destinations: {}", self.destinations.len());

        for stats in &self.destinations {
            println!("\n📤 {} ({})", stats.destination, stats.kind);
            println!("   ├─ Payloads dispatched: {}", stats.payloads_dispatched);
            println!("   ├─ Payloads written: {}", stats.payloads_written);
            println!("   ├─ Records written: {}", stats.records_written);
            println!("   └─ Write failures: {}", stats.write_failures);
        }

        if self.interrupted {
            println!("\n⚠️  Run was interrupted before the stream ended");
        }

        println!();
    }
}
