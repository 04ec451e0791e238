//! A `tracing_subscriber` event formatter that writes `key=value` pairs,
//! one line per event, in the style of Heroku's logfmt. Used as the default
//! (non-JSON) output format for every litmap stage binary.

use std::fmt;

use tracing_subscriber::{
    field::{Field, Visit},
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
};

/// Formats one tracing event as a single logfmt line:
/// `level=INFO target=litmap_entrez msg="fetched page" count=200`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFmtFormatter;

impl<S, N> FormatEvent<S, N> for LogFmtFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(writer, "level={} target={}", metadata.level(), metadata.target())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, " span={}", span.name())?;
            }
        }

        let mut visitor = LogFmtVisitor { writer: &mut writer };
        event.record(&mut visitor);
        visitor.writer.write_char('\n')
    }
}

struct LogFmtVisitor<'a, 'w> {
    writer: &'a mut Writer<'w>,
}

impl<'a, 'w> Visit for LogFmtVisitor<'a, 'w> {
    fn record_str(&mut self, field: &Field, value: &str) {
        let _ = write!(self.writer, " {}=\"{}\"", field.name(), escape(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let name = field.name();
        if name == "message" {
            let _ = write!(self.writer, " msg=\"{}\"", escape(&format!("{value:?}")));
        } else {
            let _ = write!(self.writer, " {name}={value:?}");
        }
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::fmt::format::FmtSpan;

    #[test]
    fn formats_a_basic_event() {
        let buf = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let writer_buf = buf.clone();

        let subscriber = tracing_subscriber::fmt()
            .event_format(LogFmtFormatter)
            .with_writer(move || TestWriter(writer_buf.clone()))
            .with_span_events(FmtSpan::NONE)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(count = 200, "fetched page");
        });

        let out = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        assert!(out.contains("level=INFO"));
        assert!(out.contains("count=200"));
        assert!(out.contains("msg=\"fetched page\""));
    }

    struct TestWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
