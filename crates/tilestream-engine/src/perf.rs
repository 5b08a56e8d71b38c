//! Streaming performance metrics.
//!
//! Accumulates per-frame streaming counters and update timings over a run.

use std::collections::VecDeque;
use std::time::Instant;

use tilestream_world::FrameStats;

/// Streaming metrics collector.
#[derive(Debug)]
pub struct StreamMetrics {
    /// Recent update times in seconds
    update_times: VecDeque<f32>,
    /// History size for averaging
    history_size: usize,
    /// Frames recorded
    frames: u64,
    /// Tiles written across all frames
    tiles_transferred: u64,
    /// Largest single-frame transfer
    peak_tiles: u32,
    /// Chunks that finished loading
    chunks_loaded: u64,
    /// Records evicted for range or slot reuse
    chunks_evicted: u64,
    /// Records evicted by residency overflow
    overflow_evictions: u64,
    /// Frames in which the buffer origin moved
    recenters: u64,
    /// Frames that ended with a session in progress
    streaming_frames: u64,
    /// Buffer uploads
    uploads: u64,
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new(120)
    }
}

impl StreamMetrics {
    /// Create a new metrics collector.
    ///
    /// # Arguments
    /// * `history_size` - Number of update timings kept for averaging
    #[must_use]
    pub fn new(history_size: usize) -> Self {
        Self {
            update_times: VecDeque::with_capacity(history_size),
            history_size: history_size.max(1),
            frames: 0,
            tiles_transferred: 0,
            peak_tiles: 0,
            chunks_loaded: 0,
            chunks_evicted: 0,
            overflow_evictions: 0,
            recenters: 0,
            streaming_frames: 0,
            uploads: 0,
        }
    }

    /// Record one frame.
    ///
    /// # Arguments
    /// * `stats` - Counters reported by the chunk manager
    /// * `streaming` - Whether a session was in progress after the update
    /// * `uploaded` - Whether the buffer was flushed this frame
    /// * `update_secs` - Time spent in update and commit, in seconds
    pub fn record_frame(&mut self, stats: &FrameStats, streaming: bool, uploaded: bool, update_secs: f32) {
        self.frames += 1;
        self.tiles_transferred += u64::from(stats.tiles_transferred);
        self.peak_tiles = self.peak_tiles.max(stats.tiles_transferred);
        self.chunks_loaded += u64::from(stats.chunks_processed);
        self.chunks_evicted += u64::from(stats.chunks_evicted);
        self.overflow_evictions += u64::from(stats.overflow_evictions);
        self.recenters += u64::from(stats.buffer_recentered);
        self.streaming_frames += u64::from(streaming);
        self.uploads += u64::from(uploaded);

        self.update_times.push_back(update_secs);
        if self.update_times.len() > self.history_size {
            self.update_times.pop_front();
        }
    }

    /// Frames recorded so far.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Get average update time in seconds.
    #[must_use]
    pub fn avg_update_time(&self) -> f32 {
        if self.update_times.is_empty() {
            return 0.0;
        }
        self.update_times.iter().sum::<f32>() / self.update_times.len() as f32
    }

    /// Get the slowest recent update time in seconds.
    #[must_use]
    pub fn max_update_time(&self) -> f32 {
        self.update_times.iter().copied().fold(0.0, f32::max)
    }

    /// Get a summary of all metrics.
    #[must_use]
    pub fn summary(&self) -> StreamSummary {
        StreamSummary {
            frames: self.frames,
            tiles_transferred: self.tiles_transferred,
            peak_tiles: self.peak_tiles,
            chunks_loaded: self.chunks_loaded,
            chunks_evicted: self.chunks_evicted,
            overflow_evictions: self.overflow_evictions,
            recenters: self.recenters,
            streaming_frames: self.streaming_frames,
            uploads: self.uploads,
            update_time_ms: self.avg_update_time() * 1000.0,
            max_update_time_ms: self.max_update_time() * 1000.0,
        }
    }
}

/// Summary of a streaming run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamSummary {
    /// Frames simulated
    pub frames: u64,
    /// Tiles written
    pub tiles_transferred: u64,
    /// Largest single-frame transfer
    pub peak_tiles: u32,
    /// Chunks loaded
    pub chunks_loaded: u64,
    /// Range and slot evictions
    pub chunks_evicted: u64,
    /// Overflow evictions
    pub overflow_evictions: u64,
    /// Buffer recenters
    pub recenters: u64,
    /// Frames ending mid-stream
    pub streaming_frames: u64,
    /// Buffer uploads
    pub uploads: u64,
    /// Average update time in milliseconds
    pub update_time_ms: f32,
    /// Slowest recent update in milliseconds
    pub max_update_time_ms: f32,
}

impl StreamSummary {
    /// Format as a single log line.
    #[must_use]
    pub fn format_line(&self) -> String {
        format!(
            "frames={} tiles={} (peak {}/frame) loaded={} evicted={} overflow={} \
             recenters={} streaming_frames={} uploads={} update={:.3}ms (max {:.3}ms)",
            self.frames,
            format_number(self.tiles_transferred),
            self.peak_tiles,
            self.chunks_loaded,
            self.chunks_evicted,
            self.overflow_evictions,
            self.recenters,
            self.streaming_frames,
            self.uploads,
            self.update_time_ms,
            self.max_update_time_ms
        )
    }
}

/// Format a large number with commas.
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Scoped timer for measuring code sections.
#[derive(Debug)]
pub struct ScopedTimer {
    start: Instant,
}

impl ScopedTimer {
    /// Start a new scoped timer.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop and return elapsed time in seconds.
    #[must_use]
    pub fn stop(self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(tiles: u32, chunks: u32) -> FrameStats {
        FrameStats {
            chunks_processed: chunks,
            tiles_transferred: tiles,
            ..Default::default()
        }
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = StreamMetrics::new(60);
        assert_eq!(metrics.frames(), 0);
        assert_eq!(metrics.avg_update_time(), 0.0);
        assert_eq!(metrics.summary(), StreamSummary::default());
    }

    #[test]
    fn test_metrics_record() {
        let mut metrics = StreamMetrics::new(60);
        metrics.record_frame(&stats(512, 8), false, true, 0.002);
        metrics.record_frame(&stats(100, 1), true, true, 0.004);
        metrics.record_frame(&stats(0, 0), false, false, 0.0);

        let summary = metrics.summary();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.tiles_transferred, 612);
        assert_eq!(summary.peak_tiles, 512);
        assert_eq!(summary.chunks_loaded, 9);
        assert_eq!(summary.streaming_frames, 1);
        assert_eq!(summary.uploads, 2);
        assert!((summary.update_time_ms - 2.0).abs() < 1e-3);
        assert!((summary.max_update_time_ms - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut metrics = StreamMetrics::new(4);
        for _ in 0..4 {
            metrics.record_frame(&stats(0, 0), false, false, 1.0);
        }
        for _ in 0..4 {
            metrics.record_frame(&stats(0, 0), false, false, 0.0);
        }
        assert_eq!(metrics.frames(), 8);
        assert_eq!(metrics.avg_update_time(), 0.0);
    }

    #[test]
    fn test_summary_format() {
        let mut metrics = StreamMetrics::default();
        for _ in 0..3000 {
            metrics.record_frame(&stats(512, 8), false, true, 0.001);
        }

        let text = metrics.summary().format_line();
        assert!(text.contains("frames=3000"));
        assert!(text.contains("tiles=1,536,000"));
        assert!(text.contains("peak 512/frame"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(999), "999");
    }

    #[test]
    fn test_scoped_timer() {
        let timer = ScopedTimer::start();
        std::thread::sleep(std::time::Duration::from_millis(10));
        let elapsed = timer.stop();
        assert!(elapsed >= 0.009, "Timer should have measured ~10ms");
    }
}
