use std::time::Duration;
use anyhow::Result;

use crate::diagnostics::{self, CheckStatus};
use crate::state::AppState;

/// Speak every card and print a pass/fail report
pub async fn run(state: &AppState) -> Result<()> {
    if !state.speech.has_credential() {
        println!("  No API key configured. Every item will fail.");
    }

    let gap = Duration::from_millis(state.settings.general.diagnostics_gap_ms);
    let total = diagnostics::plan().len();
    println!("\n  Voice Health Check\n  Testing {} items...\n", total);

    let report = diagnostics::run(&state.speech, gap, |i, result| {
        let mark = match result.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Pending => "..",
        };
        println!("  [{:>2}/{}] {:<4} {} {}", i + 1, total, mark, result.category, result.name);
    })
    .await;

    println!("\n{}", report);
    Ok(())
}
