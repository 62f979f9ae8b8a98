//! One tracing session: host, tracer, observers and output
//!
//! A session wires a host to a [`Tracer`], registers the output, statistics
//! and coverage observers, drives the workload and renders the result.

use crate::cli::OutputFormat;
use crate::config::TracerConfig;
use crate::coverage::{self, Coverage, CoverageResult};
use crate::csv_output::{self, CsvOutput};
use crate::event::EventRecord;
use crate::filter::EventFilter;
use crate::host::{Runtime, TraceHost};
use crate::json_output::JsonOutput;
use crate::replay::{CapturedEvent, ReplayHost};
use crate::stats::EventStats;
use crate::tracer::{DispatchStats, Tracer};
use anyhow::Result;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use tracing::debug;

/// File name the demo program reports
pub const DEMO_FILE: &str = "demo.rb";

/// What to trace
#[derive(Debug, Clone)]
pub enum Workload {
    /// Captured raw events, played through a [`ReplayHost`]
    Replay(Vec<CapturedEvent>),
    /// The built-in [`demo_program`] on a [`Runtime`]
    Demo,
}

/// Session settings
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub filter: EventFilter,
    pub format: OutputFormat,
    /// Summarize instead of listing events
    pub statistics: bool,
    pub coverage: bool,
    pub config: TracerConfig,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            filter: EventFilter::all(),
            format: OutputFormat::Text,
            statistics: false,
            coverage: false,
            config: TracerConfig::default(),
        }
    }
}

/// What a finished session observed
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub dispatch: DispatchStats,
    /// Events that passed the filter
    pub events: Vec<EventRecord>,
    pub coverage: Option<CoverageResult>,
}

/// Small traced program: a class body, a scripted call doing native
/// arithmetic, and a method that raises
pub fn demo_program(rt: &Runtime) -> i64 {
    rt.class_body("Greeter", 1, |rt| rt.line(2));
    rt.line(5);
    let greeter = rt.object("Greeter");
    let sum = rt.invoke(&greeter, "greet", 6, |rt| {
        rt.line(7);
        rt.int_add(1, 2, 7)
    });
    rt.line(10);
    rt.invoke(&greeter, "fail", 11, |rt| {
        rt.line(12);
        rt.raise(12);
    });
    sum
}

/// Trace `workload` and return what was observed, without rendering
pub fn trace(workload: &Workload, options: &SessionOptions) -> SessionReport {
    match workload {
        Workload::Replay(events) => {
            let host = Rc::new(ReplayHost::new());
            trace_with(Rc::clone(&host), options, || {
                let played = host.play(events);
                debug!(played, "capture replayed");
            })
        }
        Workload::Demo => {
            let host = Rc::new(Runtime::new(DEMO_FILE));
            trace_with(Rc::clone(&host), options, || {
                demo_program(&host);
            })
        }
    }
}

fn trace_with<H: TraceHost + 'static>(
    host: Rc<H>,
    options: &SessionOptions,
    drive: impl FnOnce(),
) -> SessionReport {
    let tracer = Tracer::with_config(host, options.config.clone());

    let selected = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&selected);
    let filter = options.filter.clone();
    tracer.trace(Some("output"), move |event| {
        if filter.should_trace(event) {
            sink.borrow_mut().push(event.clone());
        }
    });

    let collector = options.coverage.then(Coverage::new);
    match &collector {
        Some(c) => c.start(&tracer),
        None => tracer.activate(),
    }

    drive();

    match &collector {
        Some(c) => c.stop(&tracer),
        None => tracer.deactivate(),
    }

    let dispatch = tracer.stats();
    tracer.shutdown();

    SessionReport {
        dispatch,
        events: selected.take(),
        coverage: collector.map(|c| c.result()),
    }
}

/// Trace `workload` and render it to `out` (summaries go to stderr)
pub fn run(
    workload: &Workload,
    options: &SessionOptions,
    out: &mut dyn Write,
) -> Result<SessionReport> {
    let report = trace(workload, options);

    let mut stats = EventStats::new();
    for event in &report.events {
        stats.record(event);
    }

    match options.format {
        OutputFormat::Text => {
            if options.statistics {
                stats.print_summary();
            } else {
                for event in &report.events {
                    writeln!(out, "{event}")?;
                }
            }
        }
        OutputFormat::Csv => {
            if options.statistics {
                out.write_all(csv_output::stats_to_csv(&stats).as_bytes())?;
            } else {
                let mut csv = CsvOutput::new();
                for event in &report.events {
                    csv.add_event(event);
                }
                out.write_all(csv.to_csv().as_bytes())?;
            }
        }
        OutputFormat::Json => {
            let mut json = JsonOutput::new();
            for event in &report.events {
                json.add_event(event);
            }
            json.set_dispatch_stats(report.dispatch);
            if let Some(coverage) = &report.coverage {
                json.set_coverage(coverage.clone());
            }
            writeln!(out, "{}", json.to_json()?)?;
            if options.statistics {
                stats.print_summary();
            }
        }
    }

    // JSON output carries coverage inline
    if !matches!(options.format, OutputFormat::Json) {
        if let Some(result) = &report.coverage {
            coverage::print_result(result);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    fn kinds(report: &SessionReport) -> Vec<Option<EventKind>> {
        report.events.iter().map(EventRecord::kind).collect()
    }

    #[test]
    fn test_demo_trace_sequence() {
        let report = trace(&Workload::Demo, &SessionOptions::default());
        assert_eq!(
            kinds(&report),
            vec![
                Some(EventKind::Class),
                Some(EventKind::Line),
                Some(EventKind::ScopeEnd),
                Some(EventKind::Line),
                Some(EventKind::Call),
                Some(EventKind::Line),
                Some(EventKind::NativeCall),
                Some(EventKind::NativeReturn),
                Some(EventKind::Return),
                Some(EventKind::Line),
                Some(EventKind::Call),
                Some(EventKind::Line),
                Some(EventKind::Raise),
                Some(EventKind::Return),
            ]
        );
        // Installing the hook is suppressed; removal happens after deactivation
        assert_eq!(report.dispatch.suppressed, 1);
        assert_eq!(report.dispatch.events, 14);
    }

    #[test]
    fn test_demo_native_return_backfilled() {
        let report = trace(&Workload::Demo, &SessionOptions::default());
        let call = report
            .events
            .iter()
            .find(|e| e.kind() == Some(EventKind::NativeCall))
            .unwrap();
        let ret = report
            .events
            .iter()
            .find(|e| e.kind() == Some(EventKind::NativeReturn))
            .unwrap();
        assert_eq!(ret.previous_context(), call.context());
        assert_eq!(ret.self_context().class, "Integer");
    }

    #[test]
    fn test_filtered_session() {
        let options = SessionOptions {
            filter: EventFilter::from_expr("trace=before").unwrap(),
            ..SessionOptions::default()
        };
        let report = trace(&Workload::Demo, &options);
        assert_eq!(
            kinds(&report),
            vec![
                Some(EventKind::Call),
                Some(EventKind::NativeCall),
                Some(EventKind::Call)
            ]
        );
        assert_eq!(report.dispatch.events, 14);
    }

    #[test]
    fn test_coverage_session() {
        let options = SessionOptions {
            coverage: true,
            ..SessionOptions::default()
        };
        let report = trace(&Workload::Demo, &options);
        let coverage = report.coverage.unwrap();
        let lines = &coverage[DEMO_FILE];
        assert_eq!(lines.len(), 12);
        // class body `end` is reported on the opening line
        assert_eq!(lines[0], Some(1));
        assert_eq!(lines[1], Some(1));
        assert_eq!(lines[2], None);
        assert_eq!(lines[5], Some(1));
        assert_eq!(lines[6], Some(1));
        assert_eq!(lines[11], Some(1));
    }

    #[test]
    fn test_replay_session() {
        let events = vec![
            CapturedEvent::new("line", "a.rb", 1),
            CapturedEvent::new("teleport", "a.rb", 2),
        ];
        let report = trace(&Workload::Replay(events), &SessionOptions::default());
        assert_eq!(kinds(&report), vec![Some(EventKind::Line), None]);
        assert_eq!(report.dispatch.unknown_kinds, 1);
    }

    #[test]
    fn test_run_text_output() {
        let mut out = Vec::new();
        run(&Workload::Demo, &SessionOptions::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 14);
        assert!(text.contains("demo.rb:7"));
    }

    #[test]
    fn test_run_json_output() {
        let options = SessionOptions {
            format: OutputFormat::Json,
            coverage: true,
            ..SessionOptions::default()
        };
        let mut out = Vec::new();
        run(&Workload::Demo, &options, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["summary"]["total_events"], 14);
        assert!(value["coverage"][DEMO_FILE].is_array());
    }

    #[test]
    fn test_run_csv_statistics() {
        let options = SessionOptions {
            format: OutputFormat::Csv,
            statistics: true,
            ..SessionOptions::default()
        };
        let mut out = Vec::new();
        run(&Workload::Demo, &options, &mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        assert!(csv.starts_with("kind,count\n"));
        assert!(csv.contains("greet,1,1,0"));
    }
}
