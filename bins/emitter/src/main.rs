use clap::Parser;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::io::BufRead;
use tracing_subscriber::EnvFilter;
use xorpipe_config::{EmitterArgs, Mode};
use xorpipe_core::{EmitterOutcome, PeerKind, SharedSegment, SyncSet, XorCipher};
use xorpipe_slots::ProcessStats;

extern "C" fn noop_handler(_: i32) {}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO")))
        .init();

    let args = EmitterArgs::parse();
    xorpipe_stats::print_title_banner("EMITTER");

    // Blocking `sem_wait` must be interrupted (EINTR), not transparently
    // restarted, so a SIGUSR1 nudge from the terminator actually wakes a
    // waiter stuck on `free_spaces`. `SaFlags::empty()` omits SA_RESTART.
    let action = SigAction::new(SigHandler::Handler(noop_handler), SaFlags::empty(), SigSet::empty());
    unsafe { sigaction(Signal::SIGUSR1, &action) }?;

    let shm_dir = xorpipe_config::shm_dir();
    let segment = SharedSegment::attach(&shm_dir)?;
    let sync = SyncSet::open_existing()?;
    let pid = std::process::id() as i32;
    let key = args.key.unwrap_or(segment.header().xor_key);
    let cipher = XorCipher { key };

    {
        let _guard = sync.global_mutex.lock()?;
        let header = segment.header_mut();
        xorpipe_core::register(&mut header.emitter_pids, pid, PeerKind::Emitter)?;
        header.active_emitters += 1;
        header.total_emitters += 1;
    }
    tracing::info!(pid, "emitter registered");

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

        match xorpipe_core::emitter_step(&segment, &sync, pid, &cipher)? {
            EmitterOutcome::Wrote { source_index } => {
                chars_processed += 1;
                tracing::debug!(pid, source_index, "emitted byte");
                if args.delay_ms() > 0 {
                    std::thread::sleep(std::time::Duration::from_millis(args.delay_ms()));
                }
            }
            EmitterOutcome::EndOfInput => {
                tracing::info!(pid, chars_processed, "input exhausted");
                break;
            }
            EmitterOutcome::ShutdownRequested => {
                tracing::info!(pid, chars_processed, "shutdown requested");
                break;
            }
        }
    }

    let end_time = unix_timestamp();
    {
        let _guard = sync.global_mutex.lock()?;
        let header = segment.header_mut();
        xorpipe_core::unregister(&mut header.emitter_pids, pid);
        header.active_emitters -= 1;
        xorpipe_core::push_emitter_stats(header, ProcessStats {
            pid,
            chars_processed,
            start_time_unix: start_time,
            end_time_unix: end_time,
            ..ProcessStats::EMPTY
        });
    }

    println!("  emitted {chars_processed} byte(s)");
    Ok(())
}

fn unix_timestamp() -> i64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}
