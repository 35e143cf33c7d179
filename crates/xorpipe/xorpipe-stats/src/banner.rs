use owo_colors::OwoColorize;

/// Prints a boxed cyan-bold title banner, the same way every binary
/// announces itself on startup (e.g. the terminator's `FINALIZADOR` box).
pub fn print_title_banner(title: &str) {
    let width = 62usize.max(title.len() + 4);
    let top = format!("╔{}╗", "═".repeat(width));
    let bottom = format!("╚{}╝", "═".repeat(width));
    let pad_total = width - title.len();
    let pad_left = pad_total / 2;
    let pad_right = pad_total - pad_left;
    let middle = format!("║{}{}{}║", " ".repeat(pad_left), title, " ".repeat(pad_right));

    println!("{}", top.cyan().bold());
    println!("{}", middle.cyan().bold());
    println!("{}", bottom.cyan().bold());
    println!();
}

/// "→ requesting shutdown" style line, printed once when the terminator
/// wakes up and begins draining the pipeline.
pub fn print_requesting(message: &str) {
    println!("{}", format!("→ {message}").yellow().bold());
}

/// "→ waiting for N emitters, M receivers" progress line. Callers overwrite
/// the same terminal line on each poll by prefixing with `\r` and omitting
/// the trailing newline.
pub fn print_waiting_progress(active_emitters: i64, active_receivers: i64) {
    print!(
        "\r{}",
        format!("→ waiting ({active_emitters} emitters, {active_receivers} receivers active)").blue().bold()
    );
    use std::io::Write;
    let _ = std::io::stdout().flush();
}

/// "✓ all processes finished" line, printed once the drain completes.
pub fn print_all_finished() {
    println!("\n{}", "✓ all processes finished".green().bold());
    println!();
}

/// "→ cleaning up resources..." line printed while unlinking semaphores and
/// removing the backing segment file.
pub fn print_cleaning_up() {
    println!("{}", "→ cleaning up resources...".yellow().bold());
}

/// "✓ shutdown complete" final line.
pub fn print_shutdown_complete() {
    println!("{}", "✓ shutdown complete".green().bold());
}

/// One line per semaphore/segment cleanup step, green on success and yellow
/// when the resource was already gone (non-fatal, matches the original's
/// "continuing" tolerance for already-missing IPC objects).
pub fn print_cleanup_step(message: &str, ok: bool) {
    if ok {
        println!("{}", format!("  ✓ {message}").green());
    } else {
        println!("{}", format!("  • {message} (already gone, continuing)").yellow());
    }
}
