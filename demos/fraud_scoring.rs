//! Flags transactions whose amount is far above an account's rolling
//! average ticket size.
//!
//! Stands in for a real fraud-analysis job (§1's non-goals: the core only
//! defines the `Source`/`Operator` contract, not concrete analyzers).
//! Demonstrates `FieldGrouping` keeping every transaction for one account on
//! the same instance, so the rolling average can be kept in private,
//! unsynchronized per-instance state (§5: "if the user deliberately shares
//! state... they must provide their own synchronization").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cascade::{
    EngineConfig, Event, EventCollector, FieldGrouping, Job, Operator, OperatorSpec, RunningJob, Source, SourceSpec,
    StreamEngine,
};

#[derive(Clone)]
struct TxEvent {
    remaining: Arc<AtomicU64>,
    accounts: Vec<&'static str>,
}

impl TxEvent {
    fn new(total: u64) -> Self {
        Self {
            remaining: Arc::new(AtomicU64::new(total)),
            accounts: vec!["acct-1", "acct-2", "acct-3"],
        }
    }
}

impl Source for TxEvent {
    fn setup_instance(&mut self, instance: usize) {
        log::info!("transaction feed instance {instance} ready");
    }

    fn get_events(&mut self, collector: &mut EventCollector) {
        let Ok(n) = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        else {
            std::thread::sleep(Duration::from_millis(50));
            return;
        };
        let account = self.accounts[(n as usize) % self.accounts.len()];
        // A handful of amounts, with an occasional spike to trigger a flag.
        let amount = if n % 17 == 0 { 5_000.0 } else { 10.0 + (n % 40) as f64 };
        let mut fields = serde_json::Map::new();
        fields.insert("account".to_string(), account.into());
        fields.insert("amount".to_string(), amount.into());
        collector.add_default(Event::from_fields(fields));
    }
}

/// Keeps a running average ticket size per account it has seen, and emits
/// onto the `"alerts"` side channel when a transaction is more than 10x the
/// current average.
#[derive(Clone, Default)]
struct AvgTicketAnalyzer {
    totals: std::collections::HashMap<String, (f64, u64)>,
}

impl Operator for AvgTicketAnalyzer {
    fn setup_instance(&mut self, instance: usize) {
        log::info!("avg ticket analyzer instance {instance} ready");
    }

    fn apply(&mut self, _stream_name: &str, event: &Event, collector: &mut EventCollector) {
        let Some(account) = event.get_field("account").and_then(|v| v.as_str()) else {
            return;
        };
        let Some(amount) = event.get_field("amount").and_then(|v| v.as_f64()) else {
            return;
        };

        let (sum, count) = self.totals.entry(account.to_string()).or_insert((0.0, 0));
        let average = if *count == 0 { amount } else { *sum / *count as f64 };

        if *count > 0 && amount > average * 10.0 {
            log::warn!("flagging {account}: amount {amount:.2} vs average {average:.2}");
            collector.add(event.clone(), "alerts");
        }

        *sum += amount;
        *count += 1;
    }
}

/// Sink for the `"alerts"` side channel: just logs. A real job would push
/// these to a paging system instead.
#[derive(Clone, Default)]
struct AlertLogger;

impl Operator for AlertLogger {
    fn setup_instance(&mut self, instance: usize) {
        log::info!("alert logger instance {instance} ready");
    }

    fn apply(&mut self, _stream_name: &str, event: &Event, _collector: &mut EventCollector) {
        log::warn!("ALERT: {event:?}");
    }
}

fn main() {
    env_logger::init();

    let job = Job::new("fraud-scoring");
    let source_stream = job
        .add_source(SourceSpec::new("tx-feed", 2, TxEvent::new(400)))
        .expect("tx feed registered once");

    let analyzer = job.add_operator(
        OperatorSpec::new("avg-ticket-analyzer", 3, AvgTicketAnalyzer::default()).with_grouping(
            "default",
            FieldGrouping::new(|e: &Event| {
                e.get_field("account")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
                    .to_string()
            }),
        ),
    );
    source_stream.apply_operator(&analyzer).expect("single edge");

    let alert_logger = job.add_operator(OperatorSpec::new("alert-logger", 1, AlertLogger));
    analyzer
        .outgoing_stream()
        .select_channel("alerts")
        .apply_operator(&alert_logger)
        .expect("single edge");

    let engine = StreamEngine::new(EngineConfig::default());
    let running: RunningJob = engine.submit(job).expect("topology is valid");

    std::thread::sleep(Duration::from_secs(2));
    running.stop();
}
