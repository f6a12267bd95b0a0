use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use linknexus_bridge::ByteProgress;

/// Per-transfer progress sink. Samples are clamped to `[0, 100]` and any
/// sample lower than one already emitted is dropped.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn Fn(f64) + Send + Sync>,
    // bit pattern of the highest emitted sample; for non-negative f64 the
    // integer order of the bits matches the numeric order
    high_water: Arc<AtomicU64>,
}

impl ProgressReporter {
    pub fn new(sink: impl Fn(f64) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
            high_water: Arc::new(AtomicU64::new(0f64.to_bits())),
        }
    }

    pub fn silent() -> Self {
        Self::new(|_| {})
    }

    pub fn report(&self, percent: f64) {
        // NaN and -0.0 both collapse to +0.0; the bit comparison below needs a
        // non-negative sign bit
        let sample = if percent.is_nan() || percent <= 0.0 {
            0.0
        } else {
            percent.min(100.0)
        };
        let bits = sample.to_bits();
        let previous = self.high_water.fetch_max(bits, Ordering::AcqRel);
        if bits >= previous {
            (self.sink)(sample);
        }
    }

    pub fn bytes(&self) -> ByteProgress {
        let reporter = self.clone();
        Arc::new(move |sent, total| {
            if total > 0 {
                reporter.report(sent as f64 / total as f64 * 100.0);
            }
        })
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("high_water", &f64::from_bits(self.high_water.load(Ordering::Acquire)))
            .finish()
    }
}
