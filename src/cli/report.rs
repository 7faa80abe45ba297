use std::path::PathBuf;

use ansi_term::Colour;
use anyhow::Result;

use crate::{
    daemon::storage::{
        ledger::UsageLedger,
        state::StoreState,
        store::JsonStateStore,
    },
    utils::time::format_millis,
};

const BAR_WIDTH: usize = 40;

/// Command to process `report`. Renders today's usage as a bar chart with
/// limits marked, most used domains first.
pub async fn process_report_command(dir: PathBuf) -> Result<()> {
    let ledger = UsageLedger::new(JsonStateStore::new(dir)?);
    let state = ledger.snapshot().await?;
    print!("{}", render_report(&state));
    Ok(())
}

fn render_report(state: &StoreState) -> String {
    let mut entries = state.usage.iter().collect::<Vec<_>>();
    if entries.is_empty() {
        return "No activity recorded today.\n".to_string();
    }
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let longest = entries
        .iter()
        .map(|(domain, _)| domain.len())
        .max()
        .unwrap_or(0);
    let most = *entries[0].1;

    let mut output = String::new();
    for (domain, &millis) in entries {
        let width = ((millis as f64 / most as f64) * BAR_WIDTH as f64).ceil() as usize;
        let bar = "█".repeat(width.max(1));
        let limit = state.limits.get(domain).copied();

        let colour = match limit {
            Some(limit) if millis >= limit => Colour::Red,
            Some(limit) if millis.saturating_mul(10) >= limit.saturating_mul(8) => Colour::Yellow,
            _ => Colour::Green,
        };
        let note = match limit {
            Some(limit) => format!("\t(limit {})", format_millis(limit)),
            None => String::new(),
        };

        output += &format!(
            "{:longest$}\t{}\t{}{}\n",
            domain,
            format_millis(millis),
            colour.paint(bar),
            note,
        );
    }
    output += &format!("\ntotal\t{}\n", format_millis(state.total_usage_ms()));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> StoreState {
        let mut state = StoreState::default();
        state.usage.insert("a.com".into(), 70_000);
        state.usage.insert("b.com".into(), 30_000);
        state.limits.insert("a.com".into(), 60_000);
        state
    }

    #[test]
    fn report_lists_domains_by_usage() {
        let report = render_report(&sample_state());
        let a = report.find("a.com").unwrap();
        let b = report.find("b.com").unwrap();
        assert!(a < b);
        assert!(report.contains("1m10s"));
        assert!(report.contains("limit 1m0s"));
        assert!(report.contains("total\t1m40s"));
    }

    #[test]
    fn extreme_limit_still_renders() {
        let mut state = sample_state();
        state.limits.insert("a.com".into(), u64::MAX);

        let report = render_report(&state);
        assert!(report.contains("a.com"));
    }

    #[test]
    fn empty_store_reports_no_activity() {
        assert_eq!(
            render_report(&StoreState::default()),
            "No activity recorded today.\n"
        );
    }
}
