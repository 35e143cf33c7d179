use clap::Parser;
use tracing_subscriber::EnvFilter;
use xorpipe_config::InitializerArgs;
use xorpipe_core::SharedSegment;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("INFO")))
        .init();

    let args = InitializerArgs::parse();
    xorpipe_stats::print_title_banner("INITIALIZER");

    let shm_dir = xorpipe_config::shm_dir();
    let segment = SharedSegment::create(&shm_dir, args.capacity, &args.input_file, args.key)?;
    if let Err(e) = xorpipe_core::SyncSet::create(args.capacity as u32) {
        // Reverse-order teardown of whatever was already acquired: the
        // segment was created before the semaphores, so it goes first.
        if let Err(cleanup_err) = segment.destroy() {
            tracing::error!(error = %cleanup_err, "failed to remove segment during startup rollback");
        }
        return Err(e.into());
    }

    println!("  segment:   {}", segment.path().display());
    println!("  capacity:  {} slots", args.capacity);
    println!("  input:     {} ({} bytes)", args.input_file.display(), segment.layout().file_size);
    println!("  xor key:   {:#04x}", args.key);
    tracing::info!(path = %segment.path().display(), capacity = args.capacity, "pipeline ready, run emitter/receiver next");

    Ok(())
}
