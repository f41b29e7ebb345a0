//! Event Source
//!
//! Reads geolocated events as newline-delimited JSON, one [`GeoEvent`] per
//! line, and forwards them in order to the batcher:
//!
//! ```text
//! {"ip":"192.0.2.7","distro":"ubuntu","location":{"latitude":43.1,"longitude":-75.2}}
//! {"ip":"2001:db8::9","distro":"debian"}
//! ```
//!
//! Reading happens on a dedicated OS thread. A read blocked on an idle pipe
//! must not keep the runtime from shutting down, so the thread is detached
//! and never joined on exit.

use std::io::BufRead;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::encoder::GeoEvent;

/// Errors that stop the reader
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Forward events from `reader` into `events` until EOF
///
/// Blank lines are skipped and malformed lines are logged and skipped. Stops
/// early if the receiving side has gone away. Returns the number of events
/// forwarded.
///
/// Blocks the calling thread; must not be called from an async context.
pub fn read_events<R>(reader: R, events: mpsc::Sender<GeoEvent>) -> Result<u64, SourceError>
where
    R: BufRead,
{
    let mut forwarded = 0u64;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match serde_json::from_str::<GeoEvent>(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "Skipping malformed event");
                continue;
            }
        };

        if events.blocking_send(event).is_err() {
            tracing::debug!("Event consumer gone, stopping source");
            break;
        }
        forwarded += 1;
    }

    Ok(forwarded)
}

/// Run [`read_events`] on a named background thread
///
/// `open` runs on the new thread, so readers that are not `Send` (such as a
/// locked stdin) can be used.
pub fn spawn_reader<F, R>(
    open: F,
    events: mpsc::Sender<GeoEvent>,
) -> std::io::Result<JoinHandle<Result<u64, SourceError>>>
where
    F: FnOnce() -> R + Send + 'static,
    R: BufRead,
{
    thread::Builder::new()
        .name("event-source".to_string())
        .spawn(move || {
            let result = read_events(open(), events);
            match &result {
                Ok(count) => tracing::info!(events = count, "Event source finished"),
                Err(e) => tracing::error!(error = %e, "Event source failed"),
            }
            result
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Location;
    use std::io::Cursor;

    #[test]
    fn test_reads_events_in_order() {
        let input = concat!(
            r#"{"ip":"192.0.2.1","distro":"ubuntu","location":{"latitude":1.0,"longitude":2.0}}"#,
            "\n\n",
            r#"{"ip":"192.0.2.2","distro":"debian"}"#,
            "\n",
        );
        let (tx, mut rx) = mpsc::channel(8);

        let forwarded = read_events(Cursor::new(input), tx).unwrap();
        assert_eq!(forwarded, 2);

        let first = rx.blocking_recv().unwrap();
        assert_eq!(first.distro, "ubuntu");
        assert_eq!(first.location, Some(Location::new(1.0, 2.0)));

        let second = rx.blocking_recv().unwrap();
        assert_eq!(second.distro, "debian");
        assert!(second.location.is_none());

        assert!(rx.blocking_recv().is_none());
    }

    #[test]
    fn test_skips_malformed_lines() {
        let input = concat!(
            "not json\n",
            r#"{"ip":"nonsense","distro":"ubuntu"}"#,
            "\n",
            r#"{"ip":"192.0.2.3","distro":"arch"}"#,
            "\n",
        );
        let (tx, mut rx) = mpsc::channel(8);

        let forwarded = read_events(Cursor::new(input), tx).unwrap();

        assert_eq!(forwarded, 1);
        assert_eq!(rx.blocking_recv().unwrap().distro, "arch");
    }

    #[test]
    fn test_stops_when_receiver_dropped() {
        let input = r#"{"ip":"192.0.2.1","distro":"ubuntu"}"#;
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let forwarded = read_events(Cursor::new(input), tx).unwrap();
        assert_eq!(forwarded, 0);
    }

    #[tokio::test]
    async fn test_spawned_reader_feeds_async_consumer() {
        let input = concat!(
            r#"{"ip":"192.0.2.1","distro":"ubuntu"}"#,
            "\n",
            r#"{"ip":"192.0.2.2","distro":"debian"}"#,
            "\n",
        );
        let (tx, mut rx) = mpsc::channel(1);

        let handle = spawn_reader(move || Cursor::new(input), tx).unwrap();
        assert_eq!(handle.thread().name(), Some("event-source"));

        assert_eq!(rx.recv().await.unwrap().distro, "ubuntu");
        assert_eq!(rx.recv().await.unwrap().distro, "debian");
        assert!(rx.recv().await.is_none());

        let forwarded = tokio::task::spawn_blocking(move || handle.join())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(forwarded, 2);
    }

    #[test]
    fn test_runtime_shutdown_does_not_wait_for_idle_reader() {
        // Never reaches EOF until released, like an idle stdin
        struct Idle(std::sync::mpsc::Receiver<()>);

        impl std::io::Read for Idle {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                let _ = self.0.recv();
                Ok(0)
            }
        }

        let (release, blocked) = std::sync::mpsc::channel::<()>();
        let (tx, rx) = mpsc::channel(1);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let handle = runtime.block_on(async move {
            spawn_reader(move || std::io::BufReader::new(Idle(blocked)), tx).unwrap()
        });

        let started = std::time::Instant::now();
        drop(runtime);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
        assert!(!handle.is_finished());

        drop(release);
        drop(rx);
        assert_eq!(handle.join().unwrap().unwrap(), 0);
    }
}
