//! Real-time Allocation Tests
//!
//! Counts heap allocations made on the calling thread while parameter
//! setters and per-sample processing run. Kept in its own test binary so
//! the counting allocator does not see other tests.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use sfx_core::FilterShape;
use sfx_dsp::{
    CrosstalkCanceller128, MonoProcessor, PhaseVocoder, ProcessorConfig, SpectralFilter256,
};

struct CountingAlloc;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOCATIONS.with(|count| count.set(count.get() + 1));
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ALLOCATIONS.with(|count| count.set(count.get() + 1));
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static GLOBAL: CountingAlloc = CountingAlloc;

fn allocations_during(f: impl FnOnce()) -> usize {
    let before = ALLOCATIONS.with(Cell::get);
    f();
    ALLOCATIONS.with(Cell::get) - before
}

// ═══════════════════════════════════════════════════════════════════════════════
// SETTERS AND PROCESSING
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_setters_and_processing_do_not_allocate() {
    let mut filter = SpectralFilter256::new(48000.0);
    let mut pv = PhaseVocoder::<512>::new(48000.0);
    let mut xtc = CrosstalkCanceller128::new(48000.0);

    let filter_allocs = allocations_during(|| {
        for i in 0..10 {
            let cutoff = 500.0 + 100.0 * i as f32;
            filter.set_lowpass(cutoff);
            filter.set_highpass(cutoff);
            filter.set_bandpass(cutoff, 0.002);
            filter.apply_params(&FilterShape::Lowpass { cutoff_hz: cutoff });
        }
        filter.set_sample_rate(44100.0);
        filter.set_identity();
    });
    assert_eq!(filter_allocs, 0, "spectral filter setters allocated");

    let pv_allocs = allocations_during(|| {
        for ratio in [0.5, 0.75, 1.25, 2.0] {
            pv.set_pitch_ratio(ratio);
        }
        pv.set_sample_rate(44100.0);
    });
    assert_eq!(pv_allocs, 0, "pitch shifter setters allocated");

    let xtc_allocs = allocations_during(|| {
        for angle in [10.0, 20.0, 40.0] {
            xtc.set_speaker_angle(angle);
        }
        xtc.set_regularization(1e-3);
        xtc.set_sample_rate(44100.0);
    });
    assert_eq!(xtc_allocs, 0, "crosstalk setters allocated");

    let process_allocs = allocations_during(|| {
        for i in 0..10_000 {
            let x = (i as f32 * 0.05).sin();
            filter.process_sample(x);
            pv.process_sample(x);
            xtc.process(x, -x);
        }
    });
    assert_eq!(process_allocs, 0, "per-sample processing allocated");
}
