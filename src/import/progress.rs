//! Byte-counting stream wrapper with rate-limited progress samples.
//!
//! Samples are taken on the reader's own poll path; there is no timer task, so
//! the cadence can never exceed how fast the consumer pulls bytes.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, ReadBuf};

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// One progress observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSample {
    pub bytes_read: u64,
    pub total: Option<u64>,
    pub percent: f64,
    pub speed_bytes_per_sec: f64,
}

pub type ProgressCallback<'a> = Box<dyn FnMut(ProgressSample) + Send + 'a>;

/// Percentage of `total`, or 0 when the total is unknown
pub fn compute_percent(read: u64, total: Option<u64>) -> f64 {
    match total {
        Some(total) if total > 0 => (read as f64 / total as f64) * 100.0,
        _ => 0.0,
    }
}

/// Wraps a reader, counting bytes and reporting throttled samples.
///
/// Dropping the wrapper drops the inner reader; [`ProgressReader::into_inner`]
/// hands it back instead.
pub struct ProgressReader<'a, R> {
    inner: R,
    total: Option<u64>,
    read: u64,
    interval: Duration,
    last_bytes: u64,
    last_time: Instant,
    finished: bool,
    callback: Option<ProgressCallback<'a>>,
}

impl<'a, R> ProgressReader<'a, R> {
    pub fn new(inner: R, total: Option<u64>, callback: Option<ProgressCallback<'a>>) -> Self {
        Self {
            inner,
            total: total.filter(|t| *t > 0),
            read: 0,
            interval: DEFAULT_SAMPLE_INTERVAL,
            last_bytes: 0,
            last_time: Instant::now(),
            finished: false,
            callback,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn report(&mut self, force: bool) {
        let Some(callback) = self.callback.as_mut() else {
            return;
        };

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_time);
        if !force && elapsed < self.interval {
            return;
        }

        let delta_bytes = self.read - self.last_bytes;
        let delta_secs = elapsed.as_secs_f64();
        let speed = if delta_secs > 0.0 {
            delta_bytes as f64 / delta_secs
        } else {
            0.0
        };

        callback(ProgressSample {
            bytes_read: self.read,
            total: self.total,
            percent: compute_percent(self.read, self.total),
            speed_bytes_per_sec: speed,
        });

        self.last_time = now;
        self.last_bytes = self.read;
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<'_, R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let can_read = buf.remaining() > 0;

        let this = &mut *self;
        let poll = Pin::new(&mut this.inner).poll_read(cx, buf);

        if let Poll::Ready(Ok(())) = poll {
            let n = buf.filled().len() - before;
            if n > 0 {
                this.read += n as u64;
                this.report(false);
            } else if can_read && !this.finished {
                // Zero bytes into a non-full buffer is end of stream
                this.finished = true;
                this.report(true);
            }
        }

        poll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::AsyncReadExt;

    fn collecting() -> (Arc<Mutex<Vec<ProgressSample>>>, ProgressCallback<'static>) {
        let samples = Arc::new(Mutex::new(Vec::new()));
        let sink = samples.clone();
        (samples, Box::new(move |s| sink.lock().unwrap().push(s)))
    }

    #[test]
    fn test_compute_percent() {
        assert_eq!(compute_percent(50, Some(200)), 25.0);
        assert_eq!(compute_percent(50, None), 0.0);
        assert_eq!(compute_percent(50, Some(0)), 0.0);
    }

    #[tokio::test]
    async fn test_final_sample_reports_all_bytes() {
        let data = vec![7u8; 1000];
        let (samples, callback) = collecting();

        let mut reader = ProgressReader::new(&data[..], Some(1000), Some(callback))
            .with_interval(Duration::from_secs(3600));

        let mut sink = Vec::new();
        let mut chunk = [0u8; 64];
        loop {
            let n = reader.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            sink.extend_from_slice(&chunk[..n]);
        }

        assert_eq!(sink.len(), 1000);
        assert_eq!(reader.bytes_read(), 1000);

        let samples = samples.lock().unwrap();
        // the interval is never reached, so only the end-of-stream sample fires
        assert_eq!(samples.len(), 1);
        let last = samples.last().unwrap();
        assert_eq!(last.bytes_read, 1000);
        assert_eq!(last.total, Some(1000));
        assert_eq!(last.percent, 100.0);
    }

    #[tokio::test]
    async fn test_zero_interval_samples_every_read() {
        let data = vec![1u8; 300];
        let (samples, callback) = collecting();

        let mut reader = ProgressReader::new(&data[..], None, Some(callback))
            .with_interval(Duration::ZERO);

        let mut chunk = [0u8; 100];
        while reader.read(&mut chunk).await.unwrap() > 0 {}

        let samples = samples.lock().unwrap();
        let counts: Vec<u64> = samples.iter().map(|s| s.bytes_read).collect();
        assert_eq!(counts, vec![100, 200, 300, 300]);
        assert!(samples.iter().all(|s| s.percent == 0.0));
    }

    #[tokio::test]
    async fn test_end_of_stream_reported_once() {
        let data = vec![1u8; 10];
        let (samples, callback) = collecting();
        let mut reader = ProgressReader::new(&data[..], Some(10), Some(callback))
            .with_interval(Duration::from_secs(3600));

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        let mut extra = [0u8; 4];
        assert_eq!(reader.read(&mut extra).await.unwrap(), 0);

        let samples = samples.lock().unwrap();
        assert_eq!(samples.iter().filter(|s| s.bytes_read == 10).count(), 1);
    }

    #[tokio::test]
    async fn test_without_callback_still_counts() {
        let data = vec![0u8; 256];
        let mut reader = ProgressReader::new(&data[..], None, None);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert_eq!(reader.bytes_read(), 256);
        assert_eq!(reader.into_inner().len(), 0);
    }
}
