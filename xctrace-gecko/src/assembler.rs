//! Merges the samples of all tables into one timeline per thread.
//!
//! The Firefox Profiler treats each sample as lasting until the next sample on
//! the same thread. Without explicit off-CPU samples this would attribute the
//! time a thread spent idle to the last stack seen before the idle period, so
//! the assembler inserts an empty sample where a gap in the timeline is too
//! long to be explained by the sampling interval.

use std::cmp::Ordering;

use crate::fast_hash_map::FastHashMap;
use crate::props::IdleGapMode;
use crate::types::{Sample, SampleSource, ThreadDescriptor};

/// A gap longer than this many sampling intervals is considered idle time.
pub const IDLE_GAP_MULTIPLIER: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IdleGapStrategy {
    /// Don't synthesize idle samples, because idle time is already recorded.
    Disabled,
    /// Gaps are compared to a fixed sampling interval.
    FixedInterval { interval_ms: f64 },
    /// Gaps are compared to the duration of the last CPU sample before the
    /// gap, or to the fallback interval if there is none or it has no duration.
    /// Syscall and VM samples are much shorter than a sampling interval and
    /// don't count.
    PreviousDuration { fallback_interval_ms: f64 },
}

impl IdleGapStrategy {
    /// Picks the strategy for a run.
    ///
    /// A thread-state table records idle time explicitly, so no samples are
    /// synthesized when it is present. Otherwise `mode` decides, and in
    /// automatic mode the per-sample durations are used when every CPU sample
    /// has one.
    pub fn select(
        mode: IdleGapMode,
        has_thread_state: bool,
        cpu_samples: &[Sample],
        interval_ms: f64,
    ) -> Self {
        if has_thread_state {
            return IdleGapStrategy::Disabled;
        }
        match mode {
            IdleGapMode::Disabled => IdleGapStrategy::Disabled,
            IdleGapMode::FixedInterval => IdleGapStrategy::FixedInterval { interval_ms },
            IdleGapMode::PreviousDuration => IdleGapStrategy::PreviousDuration {
                fallback_interval_ms: interval_ms,
            },
            IdleGapMode::Auto => {
                if !cpu_samples.is_empty() && cpu_samples.iter().all(|s| s.duration_ms > 0.0) {
                    IdleGapStrategy::PreviousDuration {
                        fallback_interval_ms: interval_ms,
                    }
                } else {
                    IdleGapStrategy::FixedInterval { interval_ms }
                }
            }
        }
    }

    fn threshold_ms(&self, previous_duration_ms: f64) -> Option<f64> {
        match *self {
            IdleGapStrategy::Disabled => None,
            IdleGapStrategy::FixedInterval { interval_ms } => {
                Some(IDLE_GAP_MULTIPLIER * interval_ms)
            }
            IdleGapStrategy::PreviousDuration {
                fallback_interval_ms,
            } => {
                let reference = if previous_duration_ms > 0.0 {
                    previous_duration_ms
                } else {
                    fallback_interval_ms
                };
                Some(IDLE_GAP_MULTIPLIER * reference)
            }
        }
    }
}

/// The per-table inputs of the assembler.
#[derive(Debug, Clone, Default)]
pub struct SampleTables {
    pub syscall: Vec<Sample>,
    pub thread_state: Vec<Sample>,
    pub virtual_memory: Vec<Sample>,
    pub cpu: Vec<Sample>,
}

impl SampleTables {
    pub fn len(&self) -> usize {
        self.syscall.len() + self.thread_state.len() + self.virtual_memory.len() + self.cpu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Sample> {
        self.syscall
            .iter_mut()
            .chain(self.thread_state.iter_mut())
            .chain(self.virtual_memory.iter_mut())
            .chain(self.cpu.iter_mut())
    }
}

/// The time-ordered samples of one thread.
#[derive(Debug, Clone)]
pub struct ThreadSamples {
    pub thread: ThreadDescriptor,
    pub samples: Vec<Sample>,
    /// How many of `samples` were synthesized to mark idle gaps.
    pub idle_samples: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct SampleAssembler {
    strategy: IdleGapStrategy,
}

impl SampleAssembler {
    pub fn new(strategy: IdleGapStrategy) -> Self {
        SampleAssembler { strategy }
    }

    /// Groups the samples by thread and orders each thread's samples by time.
    /// Samples with equal timestamps keep the table order syscall, thread state,
    /// virtual memory, CPU.
    pub fn assemble(&self, tables: SampleTables) -> Vec<ThreadSamples> {
        let SampleTables {
            syscall,
            thread_state,
            virtual_memory,
            cpu,
        } = tables;

        let mut by_thread: FastHashMap<u64, Vec<Sample>> = FastHashMap::default();
        for sample in syscall
            .into_iter()
            .chain(thread_state)
            .chain(virtual_memory)
            .chain(cpu)
        {
            by_thread.entry(sample.thread.tid).or_default().push(sample);
        }

        let mut threads: Vec<ThreadSamples> = by_thread
            .into_values()
            .map(|mut samples| {
                samples.sort_by(|a, b| a.timestamp_ms.total_cmp(&b.timestamp_ms));
                self.assemble_thread(samples)
            })
            .collect();

        threads.sort_by(|a, b| {
            let ordering = a.samples[0]
                .timestamp_ms
                .total_cmp(&b.samples[0].timestamp_ms);
            if ordering != Ordering::Equal {
                return ordering;
            }
            let ordering = a.thread.name.cmp(&b.thread.name);
            if ordering != Ordering::Equal {
                return ordering;
            }
            a.thread.tid.cmp(&b.thread.tid)
        });
        threads
    }

    /// Inserts idle samples into one thread's time-ordered, non-empty samples.
    fn assemble_thread(&self, samples: Vec<Sample>) -> ThreadSamples {
        let thread = samples[0].thread.clone();
        let mut output = Vec::with_capacity(samples.len());
        let mut idle_samples = 0;
        let mut last_sample_end: Option<f64> = None;
        let mut previous_cpu_duration_ms = 0.0;

        for sample in samples {
            if let (Some(last_end), Some(threshold)) = (
                last_sample_end,
                self.strategy.threshold_ms(previous_cpu_duration_ms),
            ) {
                if sample.timestamp_ms - last_end > threshold {
                    output.push(Sample {
                        thread: sample.thread.clone(),
                        timestamp_ms: last_end,
                        duration_ms: 0.0,
                        source: SampleSource::IdleGap,
                        backtrace: Vec::new(),
                    });
                    idle_samples += 1;
                }
            }
            // A short sample nested inside a longer one doesn't move the end back.
            let end = sample.end_ms();
            last_sample_end = Some(last_sample_end.map_or(end, |prev: f64| prev.max(end)));
            if sample.source == SampleSource::CpuProfile {
                previous_cpu_duration_ms = sample.duration_ms;
            }
            output.push(sample);
        }

        log::trace!(
            "Thread {} ({}): {} samples, {idle_samples} idle gaps",
            thread.name,
            thread.tid,
            output.len()
        );
        ThreadSamples {
            thread,
            samples: output,
            idle_samples,
        }
    }
}
