use clap::Parser;

/// Elaborates a design unit from the built-in demo library and runs it
/// against the kernel until its event queue empties.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Top-level unit to elaborate and run.
    #[arg(long, default_value = "clock_divider")]
    pub top: String,

    /// Print kernel TRACE lines (scheduling, driver updates, cycle
    /// boundaries) to stderr.
    #[arg(long)]
    pub trace: bool,

    /// Half-period of the demo clock, in femtoseconds.
    #[arg(long, default_value_t = 10_000_000)]
    pub half_period_fs: u64,

    /// Number of times the demo clock toggles before the run ends.
    #[arg(long, default_value_t = 10)]
    pub toggles: u32,
}
