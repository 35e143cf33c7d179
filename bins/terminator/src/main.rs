//! Waits for a shutdown signal or a 'q'/'Q' keypress, drains the pipeline,
//! prints statistics, then unlinks every IPC object the run created.
//!
//! Mirrors the emitter/receiver's choice of raw `libc` calls for the
//! blocking primitives the standard library doesn't expose directly
//! (`xorpipe-sync` already does this for `sem_wait`/`sem_post`); here it is
//! `poll(2)` over stdin, interruptible by the same signal-driven flag used
//! for `sem_wait`.

use clap::Parser;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, kill, pthread_sigmask, sigaction};
use nix::sys::termios::{self, SetArg};
use nix::unistd::Pid;
use std::io::Read;
use std::os::fd::{AsFd, AsRawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use xorpipe_config::TerminatorArgs;
use xorpipe_core::{SharedSegment, SyncSet};

/// Set by the SIGINT/SIGTERM handler; read at every poll timeout. Handlers
/// may not safely do more than set a flag, so this is the entire handler
/// body — the real shutdown work happens back in `main` once it observes
/// the flag.
static SHUTDOWN_SIGNALED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_shutdown_signal(_: i32) {
    SHUTDOWN_SIGNALED.store(true, Ordering::SeqCst);
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO")))
        .init();

    let _args = TerminatorArgs::parse();
    xorpipe_stats::print_title_banner("TERMINATOR");

    let action = SigAction::new(SigHandler::Handler(on_shutdown_signal), SaFlags::empty(), SigSet::empty());
    unsafe {
        sigaction(Signal::SIGINT, &action)?;
        sigaction(Signal::SIGTERM, &action)?;
    }

    let shm_dir = xorpipe_config::shm_dir();
    let segment = SharedSegment::attach(&shm_dir)?;
    let sync = SyncSet::open_existing()?;

    let stdin = std::io::stdin();
    let original_termios = termios::tcgetattr(stdin.as_fd())?;
    let mut raw_termios = original_termios.clone();
    termios::cfmakeraw(&mut raw_termios);
    termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &raw_termios)?;

    println!("waiting for Ctrl-C, SIGTERM, or a 'q' keypress...");
    let wake_result = wait_for_wake(&stdin);

    // Restore the terminal immediately: every remaining println! below must
    // produce normal line-buffered output, not raw-mode bytes.
    termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &original_termios)?;
    wake_result?;

    tracing::info!("shutdown requested, beginning drain");
    xorpipe_stats::print_requesting("requesting shutdown");

    {
        let _guard = sync.global_mutex.lock()?;
        segment.header().shutdown_flag.store(1, Ordering::Release);
    }

    let capacity = {
        let _guard = sync.global_mutex.lock()?;
        let header = segment.header();
        for &pid in header.emitter_pids.iter().chain(header.receiver_pids.iter()) {
            if pid != 0 {
                if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGUSR1) {
                    tracing::debug!(pid, error = %e, "termination hint signal failed (non-fatal)");
                }
            }
        }
        header.capacity as usize
    };

    for _ in 0..capacity {
        sync.free_spaces.post()?;
    }
    for _ in 0..capacity {
        sync.ready_items.post()?;
    }

    let mut blocked = SigSet::empty();
    blocked.add(Signal::SIGINT);
    blocked.add(Signal::SIGTERM);
    pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&blocked), None)?;

    loop {
        let (active_emitters, active_receivers) = {
            let _guard = sync.global_mutex.lock()?;
            let header = segment.header();
            (header.active_emitters, header.active_receivers)
        };
        if active_emitters == 0 && active_receivers == 0 {
            break;
        }
        xorpipe_stats::print_waiting_progress(active_emitters, active_receivers);
        std::thread::sleep(Duration::from_secs(1));
    }
    println!();
    xorpipe_stats::print_all_finished();

    let snapshot = {
        let _guard = sync.global_mutex.lock()?;
        xorpipe_stats::StatsSnapshot::capture(segment.header())
    };
    xorpipe_stats::print_statistics(&snapshot);

    xorpipe_stats::print_cleaning_up();
    let segment_path = segment.path().to_path_buf();
    match SyncSet::unlink_all() {
        Ok(()) => xorpipe_stats::print_cleanup_step("named semaphores unlinked", true),
        Err(e) => {
            tracing::warn!(error = %e, "failed to unlink one or more semaphores");
            xorpipe_stats::print_cleanup_step("named semaphores unlinked", false);
        }
    }
    match segment.destroy() {
        Ok(()) => xorpipe_stats::print_cleanup_step(&format!("shared segment removed ({})", segment_path.display()), true),
        Err(e) => {
            tracing::warn!(error = %e, "failed to remove shared segment");
            xorpipe_stats::print_cleanup_step(&format!("shared segment removed ({})", segment_path.display()), false);
        }
    }

    xorpipe_stats::print_shutdown_complete();
    Ok(())
}

/// Blocks until `SHUTDOWN_SIGNALED` is set or a 'q'/'Q' byte arrives on
/// stdin, polling with a bounded timeout so the signal flag is re-checked
/// even when stdin never becomes readable (no controlling terminal, or a
/// terminal nobody is typing into).
fn wait_for_wake(stdin: &std::io::Stdin) -> anyhow::Result<()> {
    let fd = stdin.as_fd();
    let mut pfd = libc::pollfd { fd: fd.as_raw_fd(), events: libc::POLLIN, revents: 0 };

    loop {
        if SHUTDOWN_SIGNALED.load(Ordering::SeqCst) {
            return Ok(());
        }

        pfd.revents = 0;
        let rc = unsafe { libc::poll(&mut pfd, 1, 1000) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err.into());
        }
        if rc == 0 {
            continue;
        }
        if pfd.revents & libc::POLLIN != 0 {
            let mut byte = [0u8; 1];
            let mut handle = stdin.lock();
            if handle.read(&mut byte).unwrap_or(0) == 1 && (byte[0] == b'q' || byte[0] == b'Q') {
                return Ok(());
            }
        }
    }
}
