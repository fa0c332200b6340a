use std::fmt;

/// Depth calculates minimum, maximum, average and percentile of leaf
/// depths in a [`crate::RbTree`]. A leaf here is an absent child slot,
/// so a tree with `n` entries always yields `n + 1` samples.
#[derive(Clone, Debug, Default)]
pub struct Depth {
    samples: usize,
    min: usize,
    max: usize,
    total: usize,
    depths: Vec<usize>, // histogram, indexed by depth
}

impl Depth {
    pub(crate) fn new() -> Depth {
        Default::default()
    }

    pub(crate) fn sample(&mut self, depth: usize) {
        if self.samples == 0 || depth < self.min {
            self.min = depth
        }
        if depth > self.max {
            self.max = depth
        }
        self.samples += 1;
        self.total += depth;
        if self.depths.len() <= depth {
            self.depths.resize(depth + 1, 0);
        }
        self.depths[depth] += 1;
    }

    /// Return number of leaves sampled.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Return minimum leaf depth.
    pub fn min(&self) -> usize {
        self.min
    }

    /// Return maximum leaf depth.
    pub fn max(&self) -> usize {
        self.max
    }

    /// Return the average leaf depth, zero when nothing was sampled.
    pub fn mean(&self) -> usize {
        match self.samples {
            0 => 0,
            n => self.total / n,
        }
    }

    /// Return depth as tuple of percentiles, each tuple provides
    /// (percentile, depth). Only percentiles from 90 onwards are reported.
    pub fn percentiles(&self) -> Vec<(u8, usize)> {
        let mut percentiles = vec![];
        if self.samples == 0 {
            return percentiles;
        }
        let (mut acc, mut prev_perc) = (0_usize, 90_u8);
        let iter = self.depths.iter().enumerate().filter(|(_, n)| **n > 0);
        for (depth, n) in iter {
            acc += *n;
            let perc = ((acc as f64 / self.samples as f64) * 100_f64) as u8;
            if perc >= prev_perc {
                percentiles.push((perc, depth));
                prev_perc = perc;
            }
        }
        percentiles
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let ps: Vec<String> = self
            .percentiles()
            .into_iter()
            .map(|(p, d)| format!("{}: {}", p, d))
            .collect();
        write!(
            f,
            "{{ min: {}, mean: {}, max: {}, percentiles: {{ {} }} }}",
            self.min,
            self.mean(),
            self.max,
            ps.join(", ")
        )
    }
}
