// =============================================================================
// Adaptive Weighting Engine — volatility-dependent tx/volume weights
// =============================================================================
//
// The combination weights for the activity index shift with the rolling
// volatility of the normalized volume series:
//
//   1. std_t   = rolling sample std of normalized volume over W
//   2. rank_t  = rolling percentile rank of std_t over W
//   3. tx_weight = rank_t, volume_weight = 1 - rank_t
//
// When volume's recent volatility ranks high against its own history, volume
// is judged less reliable and weight shifts to the transaction count.
// =============================================================================

use crate::series::{or_half, rolling};

/// Time-varying weight pair; `tx[d] + volume[d] == 1.0` at every date.
#[derive(Debug, Clone)]
pub struct WeightPair {
    pub tx: Vec<f64>,
    pub volume: Vec<f64>,
}

/// Derive the adaptive weight pair from the normalized volume series.
pub fn adaptive_weights(normalized_volume: &[f64], window: usize) -> WeightPair {
    let vol_std = rolling::rolling_std(normalized_volume, window);
    let rank = rolling::rolling_percentile_rank(&vol_std, window);

    let tx: Vec<f64> = rank.iter().map(|&r| or_half(r)).collect();
    let volume: Vec<f64> = tx.iter().map(|&w| 1.0 - w).collect();
    WeightPair { tx, volume }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_sum_to_one() {
        let norm_vol: Vec<f64> = (0..120).map(|i| 1.0 + ((i * 7) % 13) as f64 / 10.0).collect();
        let pair = adaptive_weights(&norm_vol, 30);
        for (tx, vol) in pair.tx.iter().zip(pair.volume.iter()) {
            assert!((tx + vol - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn volatile_volume_shifts_weight_to_tx() {
        // 60 flat days, then 30 wildly swinging days.
        let mut norm_vol = vec![1.0; 60];
        for i in 0..30 {
            norm_vol.push(if i % 2 == 0 { 3.0 } else { 0.2 });
        }
        let pair = adaptive_weights(&norm_vol, 30);
        let calm_tx = pair.tx[59];
        let wild_tx = *pair.tx.last().unwrap();
        assert!(
            wild_tx > calm_tx,
            "tx weight should rise when volume turns volatile ({calm_tx} -> {wild_tx})"
        );
        assert!(wild_tx > 0.9);
    }

    #[test]
    fn nan_in_volume_series_does_not_poison_weights() {
        let mut norm_vol = vec![1.0; 40];
        norm_vol[10] = f64::NAN;
        let pair = adaptive_weights(&norm_vol, 30);
        assert!(pair.tx.iter().all(|w| w.is_finite()));
        assert!(pair.volume.iter().all(|w| w.is_finite()));
    }
}
