use clap::Parser;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::io::BufRead;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use xorpipe_config::{Mode, ReceiverArgs};
use xorpipe_core::{PeerKind, PositionalFile, ReceiverOutcome, SharedSegment, SyncSet, XorCipher};
use xorpipe_slots::ProcessStats;

extern "C" fn noop_handler(_: i32) {}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO")))
        .init();

    let args = ReceiverArgs::parse();
    xorpipe_stats::print_title_banner("RECEIVER");

    // See bins/emitter: SA_RESTART must be off so a blocked `sem_wait` is
    // actually interrupted by the terminator's SIGUSR1 nudge.
    let action = SigAction::new(SigHandler::Handler(noop_handler), SaFlags::empty(), SigSet::empty());
    unsafe { sigaction(Signal::SIGUSR1, &action) }?;

    let shm_dir = xorpipe_config::shm_dir();
    let segment = SharedSegment::attach(&shm_dir)?;
    let sync = SyncSet::open_existing()?;
    let pid = std::process::id() as i32;
    let key = args.key.unwrap_or(segment.header().xor_key);
    let cipher = XorCipher { key };

    let output_path = output_file_path(&args.output_dir(), segment.header().input_name());
    let output = PositionalFile::create_presized(&output_path, segment.header().file_size)?;

    {
        let _guard = sync.global_mutex.lock()?;
        let header = segment.header_mut();
        xorpipe_core::register(&mut header.receiver_pids, pid, PeerKind::Receiver)?;
        header.active_receivers += 1;
        header.total_receivers += 1;
    }
    tracing::info!(pid, path = %output_path.display(), "receiver registered");

    let start_time = unix_timestamp();
    let mut chars_processed: u64 = 0;
    let stdin = std::io::stdin();

    loop {
        if args.mode() == Mode::Manual {
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
                break;
            }
        }

        match xorpipe_core::receiver_step(&segment, &sync, pid, &cipher, &output)? {
            ReceiverOutcome::Wrote { source_index } => {
                chars_processed += 1;
                tracing::debug!(pid, source_index, "received byte");
                if args.delay_ms() > 0 {
                    std::thread::sleep(std::time::Duration::from_millis(args.delay_ms()));
                }
            }
            ReceiverOutcome::ReleasedSentinel => {
                tracing::debug!(pid, "released a stale sentinel slot");
            }
            ReceiverOutcome::Drained => {
                tracing::info!(pid, chars_processed, "run fully drained");
                break;
            }
            ReceiverOutcome::ShutdownRequested => {
                tracing::info!(pid, chars_processed, "shutdown requested");
                break;
            }
        }
    }

    let end_time = unix_timestamp();
    {
        let _guard = sync.global_mutex.lock()?;
        let header = segment.header_mut();
        xorpipe_core::unregister(&mut header.receiver_pids, pid);
        header.active_receivers -= 1;
        xorpipe_core::push_receiver_stats(header, ProcessStats {
            pid,
            chars_processed,
            start_time_unix: start_time,
            end_time_unix: end_time,
            ..ProcessStats::EMPTY
        });
    }

    println!("  received {chars_processed} byte(s) -> {}", output_path.display());
    Ok(())
}

/// `<OUTPUT_DIR>/<basename(input_name)>.dec.bin`, per the receiver contract.
fn output_file_path(output_dir: &Path, input_name: &str) -> std::path::PathBuf {
    let basename = Path::new(input_name).file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    output_dir.join(format!("{basename}.dec.bin"))
}

fn unix_timestamp() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}
