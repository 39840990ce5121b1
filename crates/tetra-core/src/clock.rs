//! Hierarchical clock division
//!
//! A subtrack advances once every `track_divider × subtrack_divider` master
//! ticks and wraps at its own length. Lanes with different lengths or
//! dividers therefore run independent cycles and only realign at the least
//! common multiple of their periods.

/// Master ticks in one 4/4 bar of 16th-note pulses
pub const TICKS_PER_BAR: u64 = 16;

/// Master ticks per subtrack step
pub fn combined_divider(track_divider: u32, subtrack_divider: u32) -> u64 {
    track_divider.max(1) as u64 * subtrack_divider.max(1) as u64
}

/// True when a subtrack with these dividers advances on `master_tick`
pub fn should_tick(master_tick: u64, track_divider: u32, subtrack_divider: u32) -> bool {
    master_tick % combined_divider(track_divider, subtrack_divider) == 0
}

/// Step a subtrack sits on at `master_tick`
pub fn effective_step(
    master_tick: u64,
    track_divider: u32,
    subtrack_divider: u32,
    subtrack_length: usize,
) -> usize {
    let length = subtrack_length.max(1) as u64;
    ((master_tick / combined_divider(track_divider, subtrack_divider)) % length) as usize
}

/// Number of complete cycles a subtrack has finished by `master_tick`
pub fn completed_loops(
    master_tick: u64,
    track_divider: u32,
    subtrack_divider: u32,
    subtrack_length: usize,
) -> u64 {
    master_tick / (combined_divider(track_divider, subtrack_divider) * subtrack_length.max(1) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_step_wraps() {
        assert_eq!(effective_step(7, 1, 1, 3), 1);
        assert_eq!(effective_step(0, 1, 1, 16), 0);
        assert_eq!(effective_step(17, 1, 1, 16), 1);
    }

    #[test]
    fn test_effective_step_divided() {
        // 2 × 3 = 6 ticks per step
        assert_eq!(effective_step(5, 2, 3, 4), 0);
        assert_eq!(effective_step(6, 2, 3, 4), 1);
        assert_eq!(effective_step(24, 2, 3, 4), 0);
    }

    #[test]
    fn test_should_tick() {
        let ticks: Vec<u64> = (0..13).filter(|&mt| should_tick(mt, 2, 2)).collect();
        assert_eq!(ticks, vec![0, 4, 8, 12]);
        assert!((0..10).all(|mt| should_tick(mt, 1, 1)));
    }

    #[test]
    fn test_polymeter_realignment() {
        // 3-step and 4-step lanes only start together every 12 ticks
        let together: Vec<u64> = (0..30)
            .filter(|&mt| effective_step(mt, 1, 1, 3) == 0 && effective_step(mt, 1, 1, 4) == 0)
            .collect();
        assert_eq!(together, vec![0, 12, 24]);
    }

    #[test]
    fn test_completed_loops() {
        assert_eq!(completed_loops(15, 1, 1, 16), 0);
        assert_eq!(completed_loops(16, 1, 1, 16), 1);
        assert_eq!(completed_loops(64, 2, 1, 16), 2);
    }
}
