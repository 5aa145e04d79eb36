//! Segment optimiser

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::*;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The segment optimiser.
///
/// The random number generator is injected so a run can be reproduced from its seed.
pub struct SegmentOptimiser {
    params: Params,

    mutator: Box<dyn Mutator + Send>,

    rng: ChaCha8Rng,

    /// Parameters flown in the current episode
    current: Vec<SegmentParams>,

    /// Most recently accepted parameters of each segment
    last_known_good: Vec<SegmentParams>,

    /// Best time each gate has been reached at
    best_lap: Vec<f64>,

    /// Parameters which flew the best complete race
    best_params: Vec<SegmentParams>,

    best_race_time_s: f64,

    iteration: u64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SegmentOptimiser {
    /// Create a new optimiser, the initial vector is flown in the first episode.
    pub fn new(
        params: Params,
        initial: Vec<SegmentParams>,
        mutator: Box<dyn Mutator + Send>,
        rng: ChaCha8Rng
    ) -> Result<Self, HyperOptError> {
        if initial.is_empty() {
            return Err(HyperOptError::EmptyVector);
        }
        if !(0.0..=1.0).contains(&params.p_explore) {
            return Err(HyperOptError::InvalidExploreProbability(params.p_explore));
        }

        Ok(Self {
            best_lap: vec![params.sentinel_s; initial.len()],
            best_race_time_s: params.sentinel_s,
            last_known_good: initial.clone(),
            best_params: initial.clone(),
            current: initial,
            params,
            mutator,
            rng,
            iteration: 0,
        })
    }

    /// Create an optimiser starting every segment from the configured initial parameters, with a
    /// [`BoundedNoiseMutator`]. Both generators are seeded from `params.seed`.
    pub fn from_params(params: Params, num_segments: usize) -> Result<Self, HyperOptError> {
        let mutator = BoundedNoiseMutator::new(params.mutation, params.seed);
        let rng = ChaCha8Rng::seed_from_u64(params.seed.wrapping_add(1));
        let initial = params.initial_vector(num_segments);

        Self::new(params, initial, Box::new(mutator), rng)
    }

    /// Parameters to fly the next episode with.
    pub fn current(&self) -> &[SegmentParams] {
        &self.current
    }

    pub fn num_segments(&self) -> usize {
        self.current.len()
    }

    pub fn best_lap(&self) -> &[f64] {
        &self.best_lap
    }

    pub fn last_known_good(&self) -> &[SegmentParams] {
        &self.last_known_good
    }

    /// Parameters which flew the best complete race, the initial vector if no race has been
    /// completed yet.
    pub fn best_params(&self) -> &[SegmentParams] {
        &self.best_params
    }

    /// Best complete race time so far, the sentinel if no race has been completed.
    pub fn best_race_time_s(&self) -> f64 {
        self.best_race_time_s
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Update the optimiser with the lap record flown using `current()`, and produce the
    /// parameters for the next episode.
    pub fn update(&mut self, lap: &LapRecord) -> Result<OptimiserStep, HyperOptError> {
        let num_segments = self.current.len();
        if lap.len() != num_segments {
            return Err(HyperOptError::LapLength {
                expected: num_segments,
                found: lap.len(),
            });
        }

        if let Some(t) = lap.race_time_s(self.params.sentinel_s) {
            if t < self.best_race_time_s {
                info!("New best race time {:.2} s", t);
                self.best_race_time_s = t;
                self.best_params = self.current.clone();
            }
        }

        let (mut next, decisions, breakpoint) = self.scan(lap);

        let (start_idx, explored) = self.choose_start_index(breakpoint);

        for idx in start_idx..num_segments {
            self.mutator.mutate(&mut next, idx);
        }

        info!(
            "Optimiser iteration {}: breakpoint {}, mutating from {}{}",
            self.iteration,
            breakpoint,
            start_idx,
            if explored { " (explore)" } else { "" }
        );
        debug!("Segment decisions: {:?}", decisions);

        let step = OptimiserStep {
            iteration: self.iteration,
            decisions,
            breakpoint,
            start_idx,
            explored,
            next_params: next.clone(),
        };

        self.current = next;
        self.iteration += 1;

        Ok(step)
    }

    /// Choose the index to start mutating from.
    ///
    /// With probability `p_explore` the index is drawn uniformly from before the breakpoint,
    /// otherwise it is the breakpoint. Returns the index and whether it was explored.
    pub fn choose_start_index(&mut self, breakpoint: usize) -> (usize, bool) {
        if breakpoint > 0 && self.rng.gen_bool(self.params.p_explore) {
            (self.rng.gen_range(0..breakpoint), true)
        }
        else {
            (breakpoint, false)
        }
    }

    /// Compare the lap to the best lap, segment by segment, and roll back the parameters which
    /// did not improve.
    fn scan(&mut self, lap: &LapRecord) -> (Vec<SegmentParams>, Vec<SegmentDecision>, usize) {
        let num_segments = self.current.len();
        let finish_idx = num_segments - 1;

        let mut next = self.current.clone();
        let mut decisions = vec![SegmentDecision::RolledBack; num_segments];
        let mut breakpoint = finish_idx;

        for idx in 0..num_segments {
            let curr = lap.times_s[idx];
            let missed = curr >= self.params.sentinel_s;

            if curr < self.best_lap[idx] {
                self.best_lap[idx] = curr;
                self.last_known_good[idx] = self.current[idx];
                next[idx] = self.current[idx];
                decisions[idx] = SegmentDecision::Accepted;
            }
            else if !missed && (self.best_lap[idx] - curr).abs() <= self.params.tolerance_s {
                next[idx] = self.last_known_good[idx];
                decisions[idx] = SegmentDecision::SoftRegressed;
            }
            else {
                next[idx..].copy_from_slice(&self.last_known_good[idx..]);
                decisions[idx] = match missed {
                    true => SegmentDecision::Missed,
                    false => SegmentDecision::HardRegressed,
                };
                breakpoint = idx;
                break;
            }
        }

        (next, decisions, breakpoint)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Mutator recording which indices it was asked to mutate, without changing anything
    struct Recorder(std::sync::Arc<std::sync::Mutex<Vec<usize>>>);

    impl Mutator for Recorder {
        fn mutate(&mut self, _vector: &mut [SegmentParams], index: usize) {
            if let Ok(mut v) = self.0.lock() {
                v.push(index);
            }
        }
    }

    fn seg(v_ms: f64) -> SegmentParams {
        SegmentParams { v_ms, a_mss: 5.0, d_m: 1.0 }
    }

    fn optimiser(
        p_explore: f64,
        initial: Vec<SegmentParams>
    ) -> (SegmentOptimiser, std::sync::Arc<std::sync::Mutex<Vec<usize>>>) {
        let params = Params {
            p_explore,
            ..Default::default()
        };
        let log = std::sync::Arc::new(std::sync::Mutex::new(vec![]));

        let opt = SegmentOptimiser::new(
            params,
            initial,
            Box::new(Recorder(log.clone())),
            ChaCha8Rng::seed_from_u64(1),
        ).unwrap();

        (opt, log)
    }

    #[test]
    fn test_invalid_construction() {
        let p = Params::default();
        let m = || Box::new(BoundedNoiseMutator::new(p.mutation, 0));

        assert!(matches!(
            SegmentOptimiser::new(p.clone(), vec![], m(), ChaCha8Rng::seed_from_u64(0)),
            Err(HyperOptError::EmptyVector)
        ));

        let bad = Params { p_explore: 1.5, ..p.clone() };
        assert!(matches!(
            SegmentOptimiser::new(bad, vec![seg(1.0)], m(), ChaCha8Rng::seed_from_u64(0)),
            Err(HyperOptError::InvalidExploreProbability(_))
        ));

        let (mut opt, _) = optimiser(0.0, vec![seg(1.0), seg(2.0)]);
        assert!(matches!(
            opt.update(&LapRecord::new(vec![1.0])),
            Err(HyperOptError::LapLength { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_accept_then_hard_regression() {
        let (mut opt, log) = optimiser(0.0, vec![seg(10.0), seg(10.0)]);

        // First episode sets the best lap
        opt.update(&LapRecord::new(vec![5.0, 6.0])).unwrap();
        assert_eq!(opt.best_lap(), &[5.0, 6.0]);

        // Fly a distinct hypothesis in the second episode
        opt.current = vec![seg(12.0), seg(13.0)];
        log.lock().unwrap().clear();

        let step = opt.update(&LapRecord::new(vec![4.5, 7.0])).unwrap();

        assert_eq!(step.decisions, vec![
            SegmentDecision::Accepted,
            SegmentDecision::HardRegressed,
        ]);
        assert_eq!(step.breakpoint, 1);
        assert_eq!(step.start_idx, 1);
        assert!(!step.explored);
        assert_eq!(opt.best_lap(), &[4.5, 6.0]);

        // Segment 0 keeps its winning parameters, segment 1 goes back to the last known good
        assert_eq!(step.next_params, vec![seg(12.0), seg(10.0)]);
        assert_eq!(opt.last_known_good(), &[seg(12.0), seg(10.0)]);
        assert_eq!(*log.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_soft_regression_continues() {
        let (mut opt, log) = optimiser(0.0, vec![seg(10.0)]);
        opt.update(&LapRecord::new(vec![5.0])).unwrap();

        opt.current = vec![seg(11.0)];
        log.lock().unwrap().clear();

        let step = opt.update(&LapRecord::new(vec![5.3])).unwrap();

        assert_eq!(step.decisions, vec![SegmentDecision::SoftRegressed]);
        assert_eq!(step.next_params, vec![seg(10.0)]);
        assert_eq!(opt.best_lap(), &[5.0]);

        // No break, the finish segment is the breakpoint
        assert_eq!(step.breakpoint, 0);
        assert_eq!(*log.lock().unwrap(), vec![0]);
    }

    #[test]
    fn test_missed_segment_rolls_back_rest() {
        let (mut opt, _) = optimiser(0.0, vec![seg(10.0); 3]);
        opt.update(&LapRecord::new(vec![5.0, 6.0, 7.0])).unwrap();

        opt.current = vec![seg(11.0), seg(12.0), seg(13.0)];
        let step = opt.update(&LapRecord::new(vec![5.2, 1000.0, 1000.0])).unwrap();

        assert_eq!(step.decisions, vec![
            SegmentDecision::SoftRegressed,
            SegmentDecision::Missed,
            SegmentDecision::RolledBack,
        ]);
        assert_eq!(step.breakpoint, 1);
        assert_eq!(step.next_params, vec![seg(10.0); 3]);

        // A sentinel never counts as a soft regression, even against a sentinel best
        let (mut opt, _) = optimiser(0.0, vec![seg(10.0)]);
        let step = opt.update(&LapRecord::new(vec![1000.0])).unwrap();
        assert_eq!(step.decisions, vec![SegmentDecision::Missed]);
        assert_eq!(opt.best_lap(), &[1000.0]);
    }

    #[test]
    fn test_no_break_mutates_finish_segment_only() {
        let (mut opt, log) = optimiser(0.0, vec![seg(10.0); 3]);

        let step = opt.update(&LapRecord::new(vec![5.0, 6.0, 7.0])).unwrap();

        assert!(step.decisions.iter().all(|d| d.is_kept()));
        assert_eq!(step.breakpoint, 2);
        assert_eq!(*log.lock().unwrap(), vec![2]);
        assert_eq!(opt.best_race_time_s(), 7.0);
        assert_eq!(opt.iteration(), 1);
    }

    #[test]
    fn test_best_lap_only_decreases() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let params = Params::default();
        let mut opt = SegmentOptimiser::new(
            params.clone(),
            params.initial_vector(4),
            Box::new(BoundedNoiseMutator::new(params.mutation, 2)),
            ChaCha8Rng::seed_from_u64(3),
        ).unwrap();

        let mut prev = opt.best_lap().to_vec();

        for _ in 0..200 {
            let lap: Vec<f64> = (0..4)
                .map(|i| match rng.gen_bool(0.1) {
                    true => 1000.0,
                    false => 5.0 * (i + 1) as f64 + rng.gen_range(-1.0..1.0),
                })
                .collect();

            let step = opt.update(&LapRecord::new(lap)).unwrap();

            for (b, p) in opt.best_lap().iter().zip(prev.iter()) {
                assert!(b <= p);
            }
            assert!(step.start_idx <= step.breakpoint);
            assert_eq!(step.next_params.len(), 4);

            prev = opt.best_lap().to_vec();
        }
    }

    #[test]
    fn test_exploration_rate() {
        let (mut opt, _) = optimiser(0.3, vec![seg(10.0); 3]);

        let n = 10_000;
        let mut explored = 0;
        for _ in 0..n {
            let (idx, e) = opt.choose_start_index(2);
            assert!(idx <= 2);
            assert_eq!(e, idx < 2);
            if idx < 2 {
                explored += 1;
            }
        }

        let rate = explored as f64 / n as f64;
        assert!(rate > 0.28 && rate < 0.32, "exploration rate {}", rate);
    }

    #[test]
    fn test_no_exploration_at_zero_breakpoint() {
        let (mut opt, _) = optimiser(1.0, vec![seg(10.0)]);

        for _ in 0..100 {
            assert_eq!(opt.choose_start_index(0), (0, false));
        }
    }
}
