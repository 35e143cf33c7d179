//! Terminal banners and the end-of-run statistics report, translated from
//! the original tool's ANSI box-drawing output into [`owo_colors`] calls.
//! Every binary prints its own title banner on startup; only the terminator
//! prints the full [`report::print_statistics`] table.

mod banner;
mod report;
mod time_fmt;

pub use banner::{
    print_all_finished, print_cleaning_up, print_cleanup_step, print_requesting, print_shutdown_complete,
    print_title_banner, print_waiting_progress,
};
pub use report::{StatsSnapshot, print_statistics};
