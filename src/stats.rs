use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone)]
pub struct Stats {
    pub frames: u64,
    pub skipped: u64,
    pub forwarded: u64,
    pub reconnects: u64,
    t0: Instant,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            frames: 0,
            skipped: 0,
            forwarded: 0,
            reconnects: 0,
            t0: Instant::now(),
        }
    }
    pub fn inc_frames(&mut self) {
        self.frames += 1;
    }
    pub fn inc_skipped(&mut self) {
        self.skipped += 1;
    }
    pub fn add_forwarded(&mut self, n: usize) {
        self.forwarded += n as u64;
    }
    pub fn inc_reconnects(&mut self) {
        self.reconnects += 1;
    }

    pub fn log(&self, label: &str) {
        info!(
            "[stats] {}: frames={} skipped={} forwarded={}B device_reconnects={} over {:.1}s",
            label,
            self.frames,
            self.skipped,
            self.forwarded,
            self.reconnects,
            self.t0.elapsed().as_secs_f64()
        );
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
