//! CSV output format for normalized event traces

use crate::event::EventRecord;
use crate::stats::{EventStats, UNDEFINED_KIND};

/// CSV record for a single event
#[derive(Debug, Clone)]
pub struct CsvEvent {
    pub kind: String,
    pub file: String,
    pub line: u32,
    pub method: Option<String>,
    pub receiver: String,
}

impl From<&EventRecord> for CsvEvent {
    fn from(event: &EventRecord) -> Self {
        Self {
            kind: event
                .kind()
                .map_or(UNDEFINED_KIND, |k| k.as_str())
                .to_string(),
            file: event.file().to_string(),
            line: event.line(),
            method: event.method_name().map(str::to_string),
            receiver: event.self_context().to_string(),
        }
    }
}

/// CSV output formatter
#[derive(Debug, Default)]
pub struct CsvOutput {
    events: Vec<CsvEvent>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&mut self, event: &EventRecord) {
        self.events.push(CsvEvent::from(event));
    }

    fn header() -> &'static str {
        "kind,file,line,method,self"
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_event(event: &CsvEvent) -> String {
        [
            Self::escape_field(&event.kind),
            Self::escape_field(&event.file),
            event.line.to_string(),
            event
                .method
                .as_deref()
                .map(Self::escape_field)
                .unwrap_or_default(),
            Self::escape_field(&event.receiver),
        ]
        .join(",")
    }

    /// Generate CSV output as string
    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(Self::header());
        output.push('\n');
        for event in &self.events {
            output.push_str(&Self::format_event(event));
            output.push('\n');
        }
        output
    }
}

/// CSV statistics output (for -c mode)
pub fn stats_to_csv(stats: &EventStats) -> String {
    let mut output = String::from("kind,count\n");
    for (kind, count) in stats.kind_rows() {
        output.push_str(&format!("{kind},{count}\n"));
    }
    output.push_str("\nmethod,calls,returns,raises\n");
    for (name, method) in stats.method_rows() {
        output.push_str(&format!(
            "{},{},{},{}\n",
            CsvOutput::escape_field(name),
            method.calls,
            method.returns,
            method.raises
        ));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn test_csv_header() {
        let output = CsvOutput::new();
        assert_eq!(output.to_csv(), "kind,file,line,method,self\n");
    }

    #[test]
    fn test_csv_event_row() {
        let mut output = CsvOutput::new();
        output.add_event(&EventRecord::new(
            Some(EventKind::NativeCall),
            "a.rb",
            3,
            Some("+".to_string()),
            None,
        ));
        let csv = output.to_csv();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[1], "c-call,a.rb,3,+,Object(0)");
    }

    #[test]
    fn test_csv_missing_method_and_undefined_kind() {
        let mut output = CsvOutput::new();
        output.add_event(&EventRecord::new(None, "a.rb", 1, None, None));
        assert!(output.to_csv().ends_with("undefined,a.rb,1,,Object(0)\n"));
    }

    #[test]
    fn test_csv_escape_field() {
        assert_eq!(CsvOutput::escape_field("simple"), "simple");
        assert_eq!(CsvOutput::escape_field("a,b"), "\"a,b\"");
        assert_eq!(CsvOutput::escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(CsvOutput::escape_field("line1\nline2"), "\"line1\nline2\"");
    }

    #[test]
    fn test_csv_escapes_method_names() {
        let mut output = CsvOutput::new();
        output.add_event(&EventRecord::new(
            Some(EventKind::NativeCall),
            "a.rb",
            1,
            Some("[]=,".to_string()),
            None,
        ));
        assert!(output.to_csv().contains("\"[]=,\""));
    }

    #[test]
    fn test_stats_to_csv() {
        let mut stats = EventStats::new();
        stats.record(&EventRecord::new(
            Some(EventKind::Call),
            "a.rb",
            1,
            Some("greet".to_string()),
            None,
        ));
        stats.record(&EventRecord::new(Some(EventKind::Line), "a.rb", 2, None, None));
        let csv = stats_to_csv(&stats);
        assert!(csv.starts_with("kind,count\ncall,1\nline,1\n"));
        assert!(csv.contains("method,calls,returns,raises\ngreet,1,0,0\n"));
    }
}
