//! Output formatting for the simulation summary.

use std::collections::BTreeMap;

use colored::Colorize;
use serde::Serialize;

/// Output format for the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Trait for renderable output.
pub trait Render {
    /// Render as human-readable string.
    fn render_human(&self) -> String;

    /// Render as JSON string.
    fn render_json(&self) -> String;

    /// Render in the specified format.
    fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Human => self.render_human(),
            OutputFormat::Json => self.render_json(),
        }
    }
}

/// What a simulation run did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimReport {
    pub seed: u64,
    pub blocks: u64,
    pub commands_accepted: u64,
    pub commands_rejected: u64,
    /// Rejections by error code
    pub rejections: BTreeMap<String, u64>,
    /// Events by kind
    pub events: BTreeMap<String, u64>,
    pub rounds_delivered: u64,
    pub open_contexts: usize,
    pub active_requests: usize,
    /// Total native supply at the end of the run, base units
    pub total_supply: String,
}

impl SimReport {
    pub fn event_count(&self, kind: &str) -> u64 {
        self.events.get(kind).copied().unwrap_or(0)
    }
}

impl Render for SimReport {
    fn render_human(&self) -> String {
        let mut lines = vec![
            format!(
                "{} {} blocks, seed {}",
                "Simulated".green().bold(),
                self.blocks,
                self.seed
            ),
            format!(
                "  {}: {} accepted, {} rejected",
                "Commands".cyan(),
                self.commands_accepted,
                self.commands_rejected
            ),
        ];
        for (code, n) in &self.rejections {
            lines.push(format!("    {:<28} {}", code.yellow(), n));
        }
        lines.push(format!(
            "  {}: {} started, {} delivered to callbacks",
            "Rounds".cyan(),
            self.event_count("round_started"),
            self.rounds_delivered
        ));
        lines.push(format!(
            "  {}: {} issued, {} answered, {} expired, {} abandoned",
            "Requests".cyan(),
            self.event_count("new_request"),
            self.event_count("response_received"),
            self.event_count("request_expired"),
            self.event_count("request_abandoned")
        ));
        lines.push(format!(
            "  {}: {} open contexts, {} active requests",
            "Final state".cyan(),
            self.open_contexts,
            self.active_requests
        ));
        lines.push(format!("  {}: {}", "Total supply".cyan(), self.total_supply));
        lines.push(format!("{}", "All invariants held".green()));
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_json() {
        let mut report = SimReport {
            seed: 7,
            blocks: 3,
            ..Default::default()
        };
        report.events.insert("new_request".into(), 4);
        let json: serde_json::Value = serde_json::from_str(&report.render(OutputFormat::Json)).unwrap();
        assert_eq!(json["seed"], 7);
        assert_eq!(json["events"]["new_request"], 4);
    }

    #[test]
    fn test_render_human_mentions_counts() {
        let mut report = SimReport::default();
        report.events.insert("request_expired".into(), 2);
        let text = report.render(OutputFormat::Human);
        assert!(text.contains("2 expired"));
    }
}
