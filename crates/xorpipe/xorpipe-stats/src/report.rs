use crate::time_fmt::format_local_hms;
use owo_colors::OwoColorize;
use xorpipe_slots::{Header, ProcessStats};

/// Snapshot of everything [`print_statistics`] needs, taken under
/// `global_mutex` by the caller so the numbers printed are mutually
/// consistent (mirrors the original's "snapshot for visual consistency"
/// comment).
pub struct StatsSnapshot {
    pub file_size: u64,
    pub processed_count: u64,
    pub in_flight: u64,
    pub active_emitters: i64,
    pub total_emitters: u64,
    pub active_receivers: i64,
    pub total_receivers: u64,
    pub emitter_stats: Vec<ProcessStats>,
    pub receiver_stats: Vec<ProcessStats>,
}

impl StatsSnapshot {
    /// Builds a snapshot from the live header. The caller must already hold
    /// `global_mutex` (or otherwise know no other process is mutating the
    /// header) for the duration of this call.
    pub fn capture(header: &Header) -> Self {
        let emitter_n = (header.emitter_stats_count as usize).min(header.emitter_stats.len());
        let receiver_n = (header.receiver_stats_count as usize).min(header.receiver_stats.len());
        StatsSnapshot {
            file_size: header.file_size,
            processed_count: header.processed_count,
            in_flight: header.free_ring.size + header.ready_ring.size,
            active_emitters: header.active_emitters,
            total_emitters: header.total_emitters,
            active_receivers: header.active_receivers,
            total_receivers: header.total_receivers,
            emitter_stats: header.emitter_stats[..emitter_n].to_vec(),
            receiver_stats: header.receiver_stats[..receiver_n].to_vec(),
        }
    }
}

/// Prints the full end-of-run statistics report: a cyan title box, general
/// counters, process-activity counters, and a per-pid table for emitters and
/// receivers each.
pub fn print_statistics(snapshot: &StatsSnapshot) {
    crate::banner::print_title_banner("SYSTEM STATISTICS");

    println!("{}", "General:".yellow().bold());
    println!("  total bytes in file:       {}", snapshot.file_size);
    println!("  total bytes processed:     {}", snapshot.processed_count);
    println!("  bytes in shared memory:    {}", snapshot.in_flight);
    if snapshot.file_size > 0 {
        let pct = snapshot.processed_count as f64 / snapshot.file_size as f64 * 100.0;
        println!("  percent complete:          {pct:.2}%");
    } else {
        println!("  percent complete:          N/A");
    }

    println!();
    println!("{}", "Process state:".blue().bold());
    println!("  active emitters:   {} / {} (lifetime total)", snapshot.active_emitters, snapshot.total_emitters);
    println!("  active receivers:  {} / {} (lifetime total)", snapshot.active_receivers, snapshot.total_receivers);

    println!();
    print_process_table("Emitters", &snapshot.emitter_stats, |s| s.green().bold().to_string());
    println!();
    print_process_table("Receivers", &snapshot.receiver_stats, |s| s.magenta().bold().to_string());
}

fn print_process_table(label: &str, rows: &[ProcessStats], style: impl Fn(&str) -> String) {
    println!("{}", style(&format!("{label}:")));
    println!("  {:<10} {:<15} {:<12} {:<12}", "PID", "Bytes proc.", "Started", "Finished");
    println!("  {:<10} {:<15} {:<12} {:<12}", "-".repeat(10), "-".repeat(15), "-".repeat(12), "-".repeat(12));
    for row in rows {
        println!(
            "  {:<10} {:<15} {:<12} {:<12}",
            row.pid,
            row.chars_processed,
            format_local_hms(row.start_time_unix),
            format_local_hms(row.end_time_unix),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_snapshot() -> StatsSnapshot {
        StatsSnapshot {
            file_size: 10,
            processed_count: 10,
            in_flight: 0,
            active_emitters: 0,
            total_emitters: 2,
            active_receivers: 0,
            total_receivers: 1,
            emitter_stats: vec![ProcessStats { pid: 123, ..ProcessStats::EMPTY }],
            receiver_stats: vec![],
        }
    }

    #[test]
    fn print_statistics_does_not_panic_on_a_typical_snapshot() {
        print_statistics(&empty_snapshot());
    }

    #[test]
    fn print_statistics_does_not_panic_with_zero_file_size() {
        let mut snap = empty_snapshot();
        snap.file_size = 0;
        snap.processed_count = 0;
        print_statistics(&snap);
    }
}
