use std::fmt;

/// Destination for the session's diagnostic lines (retry notices, traces).
pub trait LogSink: Send + Sync {
    fn log(&self, args: fmt::Arguments<'_>);
}

impl<F> LogSink for F
where
    F: Fn(fmt::Arguments<'_>) + Send + Sync,
{
    fn log(&self, args: fmt::Arguments<'_>) {
        self(args)
    }
}

/// Writes each line to standard error. The default sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn log(&self, args: fmt::Arguments<'_>) {
        eprintln!("{args}");
    }
}

/// Forwards each line to `tracing` at `WARN` level.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

#[cfg(feature = "tracing")]
impl LogSink for TracingSink {
    fn log(&self, args: fmt::Arguments<'_>) {
        tracing::warn!(target: "requests", "{}", args);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fmt,
        sync::{Arc, Mutex},
    };

    use super::LogSink;

    #[test]
    fn closures_are_sinks() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&lines);
        let sink = move |args: fmt::Arguments<'_>| {
            captured
                .lock()
                .expect("log mutex must not be poisoned")
                .push(args.to_string());
        };

        sink.log(format_args!("retry[{}/{}]", 1, 2));

        let lines = lines.lock().expect("log mutex must not be poisoned");
        assert_eq!(lines.as_slice(), ["retry[1/2]"]);
    }

    #[cfg(feature = "tracing")]
    #[test]
    fn tracing_sink_emits_warn_events() {
        use std::io;

        use super::TracingSink;

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0
                    .lock()
                    .expect("capture mutex must not be poisoned")
                    .extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            TracingSink.log(format_args!("retry[{}/{}], err={}", 1, 2, "refused"));
        });

        let output = captured.0.lock().expect("capture mutex must not be poisoned");
        let output = String::from_utf8_lossy(&output);
        assert!(output.contains("WARN"));
        assert!(output.contains("requests"));
        assert!(output.contains("retry[1/2], err=refused"));
    }
}
