//! Reporters sample the state vector at scheduled checkpoints and
//! accumulate an ordered history of `(t, payload)` records.
//!
//! Grounded on `examples/original_source/src/openrxn/systems/reporters.py`.
//! One divergence from that source is deliberate: its `MinReporter`
//! computes `np.max`/`np.argmax` instead of min/argmin, which reads as
//! a copy-paste bug rather than an intended behavior; this module's
//! `Min` reporter reports the actual minimum.

/// One recorded sample: the time it was taken and its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub t: f64,
    pub payload: Payload,
}

/// The value a reporter captured at one checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Full(Vec<f64>),
    Scalar(f64),
    ValueAt { value: f64, index: usize },
}

/// How often (in simulation time) a reporter should fire, and what it
/// captures from the state vector when it does.
pub trait Reporter {
    /// The checkpoint period this reporter samples at.
    fn frequency(&self) -> f64;

    /// Samples `q` at time `t` and appends the resulting record.
    fn report(&mut self, t: f64, q: &[f64]);

    /// The ordered history of samples taken so far.
    fn records(&self) -> &[Record];
}

macro_rules! impl_records {
    () => {
        fn records(&self) -> &[Record] {
            &self.records
        }
    };
}

/// Records the full state vector at every checkpoint.
#[derive(Debug, Clone)]
pub struct AllReporter {
    frequency: f64,
    records: Vec<Record>,
}

impl AllReporter {
    pub fn new(frequency: f64) -> Self {
        AllReporter { frequency, records: Vec::new() }
    }
}

impl Reporter for AllReporter {
    fn frequency(&self) -> f64 {
        self.frequency
    }

    fn report(&mut self, t: f64, q: &[f64]) {
        self.records.push(Record { t, payload: Payload::Full(q.to_vec()) });
    }

    impl_records!();
}

/// Records a fixed subset of state positions, in the order given.
#[derive(Debug, Clone)]
pub struct SelectionReporter {
    frequency: f64,
    indices: Vec<usize>,
    records: Vec<Record>,
}

impl SelectionReporter {
    pub fn new(frequency: f64, indices: Vec<usize>) -> Self {
        SelectionReporter { frequency, indices, records: Vec::new() }
    }
}

impl Reporter for SelectionReporter {
    fn frequency(&self) -> f64 {
        self.frequency
    }

    fn report(&mut self, t: f64, q: &[f64]) {
        let slice: Vec<f64> = self.indices.iter().map(|&i| q[i]).collect();
        self.records.push(Record { t, payload: Payload::Full(slice) });
    }

    impl_records!();
}

/// Records the sum over a fixed subset of state positions (the whole
/// state vector if `indices` is empty).
#[derive(Debug, Clone)]
pub struct SumReporter {
    frequency: f64,
    indices: Vec<usize>,
    records: Vec<Record>,
}

impl SumReporter {
    pub fn new(frequency: f64, indices: Vec<usize>) -> Self {
        SumReporter { frequency, indices, records: Vec::new() }
    }

    fn selected<'a>(&self, q: &'a [f64]) -> Box<dyn Iterator<Item = f64> + 'a> {
        if self.indices.is_empty() {
            Box::new(q.iter().copied())
        } else {
            let idxs = self.indices.clone();
            Box::new((0..idxs.len()).map(move |i| q[idxs[i]]))
        }
    }
}

impl Reporter for SumReporter {
    fn frequency(&self) -> f64 {
        self.frequency
    }

    fn report(&mut self, t: f64, q: &[f64]) {
        let sum: f64 = self.selected(q).sum();
        self.records.push(Record { t, payload: Payload::Scalar(sum) });
    }

    impl_records!();
}

/// Records the mean over a fixed subset of state positions (the whole
/// state vector if `indices` is empty).
#[derive(Debug, Clone)]
pub struct AvgReporter {
    frequency: f64,
    indices: Vec<usize>,
    records: Vec<Record>,
}

impl AvgReporter {
    pub fn new(frequency: f64, indices: Vec<usize>) -> Self {
        AvgReporter { frequency, indices, records: Vec::new() }
    }
}

impl Reporter for AvgReporter {
    fn frequency(&self) -> f64 {
        self.frequency
    }

    fn report(&mut self, t: f64, q: &[f64]) {
        let values: Vec<f64> = if self.indices.is_empty() {
            q.to_vec()
        } else {
            self.indices.iter().map(|&i| q[i]).collect()
        };
        let avg = values.iter().sum::<f64>() / values.len() as f64;
        self.records.push(Record { t, payload: Payload::Scalar(avg) });
    }

    impl_records!();
}

/// Records `(value, argmax)` over a fixed subset of state positions
/// (the whole state vector if `indices` is empty). `argmax` is the
/// absolute state index, not an offset into `indices`.
#[derive(Debug, Clone)]
pub struct MaxReporter {
    frequency: f64,
    indices: Vec<usize>,
    records: Vec<Record>,
}

impl MaxReporter {
    pub fn new(frequency: f64, indices: Vec<usize>) -> Self {
        MaxReporter { frequency, indices, records: Vec::new() }
    }
}

impl Reporter for MaxReporter {
    fn frequency(&self) -> f64 {
        self.frequency
    }

    fn report(&mut self, t: f64, q: &[f64]) {
        let candidates: Box<dyn Iterator<Item = usize>> =
            if self.indices.is_empty() { Box::new(0..q.len()) } else { Box::new(self.indices.clone().into_iter()) };
        let (index, value) = candidates
            .map(|i| (i, q[i]))
            .fold((0usize, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
        self.records.push(Record { t, payload: Payload::ValueAt { value, index } });
    }

    impl_records!();
}

/// Records `(value, argmin)` over a fixed subset of state positions
/// (the whole state vector if `indices` is empty).
#[derive(Debug, Clone)]
pub struct MinReporter {
    frequency: f64,
    indices: Vec<usize>,
    records: Vec<Record>,
}

impl MinReporter {
    pub fn new(frequency: f64, indices: Vec<usize>) -> Self {
        MinReporter { frequency, indices, records: Vec::new() }
    }
}

impl Reporter for MinReporter {
    fn frequency(&self) -> f64 {
        self.frequency
    }

    fn report(&mut self, t: f64, q: &[f64]) {
        let candidates: Box<dyn Iterator<Item = usize>> =
            if self.indices.is_empty() { Box::new(0..q.len()) } else { Box::new(self.indices.clone().into_iter()) };
        let (index, value) = candidates
            .map(|i| (i, q[i]))
            .fold((0usize, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
        self.records.push(Record { t, payload: Payload::ValueAt { value, index } });
    }

    impl_records!();
}
