#![allow(dead_code)]

pub mod test_tracing {
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// Captures formatted log lines for assertions.
    #[derive(Clone, Default)]
    pub struct CapturedLogs {
        buf: Arc<Mutex<Vec<u8>>>,
    }

    impl CapturedLogs {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
        }

        pub fn contains(&self, needle: &str) -> bool {
            self.contents().contains(needle)
        }
    }

    pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CaptureWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CaptureWriter;

        fn make_writer(&'a self) -> Self::Writer {
            CaptureWriter(Arc::clone(&self.buf))
        }
    }

    /// Install a thread-local subscriber writing plain lines into a buffer.
    ///
    /// Keep the guard alive for as long as logs should be captured.
    pub fn capture() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    /// Route logs to the libtest writer; useful with `--nocapture`.
    pub fn init_test_writer() {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    }
}

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a fresh `.yaml` file removed when the handle drops.
    pub fn yaml_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("brrtd_routes_")
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }
}

pub mod requests {
    use brrtdispatch::server::Request;
    use http::Method;

    pub fn get(target: &str) -> Request {
        Request::new(Method::GET, target)
    }

    pub fn with_method(method: Method, target: &str) -> Request {
        Request::new(method, target)
    }
}
