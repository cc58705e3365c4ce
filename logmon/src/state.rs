use std::collections::{HashMap, VecDeque};

use crate::types::{ThresholdAlert, TrafficStats};

/// 表示するアラート遷移履歴の最大保持件数
const MAX_ALERTS: usize = 100;

/// プレゼンタが表示する状態を保持する構造体
#[derive(Debug, Default)]
pub struct AppState {
    /// 直近のリフレッシュ間隔の集計
    pub latest_stats: Option<TrafficStats>,
    /// アラート遷移の履歴（先頭が最新）
    pub alerts: VecDeque<ThresholdAlert>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_stats(&mut self, stats: TrafficStats) {
        self.latest_stats = Some(stats);
    }

    /// 遷移を履歴へ積む。古いものから捨てる
    pub fn push_alert(&mut self, alert: ThresholdAlert) {
        self.alerts.push_front(alert);
        if self.alerts.len() > MAX_ALERTS {
            self.alerts.pop_back();
        }
    }

    /// 現在のアラート状態（最後に起きた遷移）
    pub fn last_alert(&self) -> Option<&ThresholdAlert> {
        self.alerts.front()
    }
}

/// ヒット数マップから上位 limit 件を返す。
/// 値の降順、同値はキー昇順で並びが安定する
pub fn top_hits(hits: &HashMap<String, u64>, limit: usize) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = hits.iter().map(|(k, v)| (k.clone(), *v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn alert(is_open: bool, rate: f64) -> ThresholdAlert {
        ThresholdAlert {
            is_open,
            rate,
            at: Utc::now(),
        }
    }

    fn hits(pairs: &[(&str, u64)]) -> HashMap<String, u64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn ranks_by_value_descending() {
        let ranked = top_hits(&hits(&[("/a", 1), ("/b", 5), ("/c", 3)]), 10);
        assert_eq!(
            ranked,
            vec![
                ("/b".to_string(), 5),
                ("/c".to_string(), 3),
                ("/a".to_string(), 1)
            ]
        );
    }

    #[test]
    fn breaks_ties_by_key_for_stable_order() {
        let ranked = top_hits(&hits(&[("/z", 2), ("/a", 2), ("/m", 2)]), 10);
        assert_eq!(
            ranked,
            vec![
                ("/a".to_string(), 2),
                ("/m".to_string(), 2),
                ("/z".to_string(), 2)
            ]
        );
    }

    #[test]
    fn truncates_to_limit() {
        let ranked = top_hits(&hits(&[("/a", 4), ("/b", 3), ("/c", 2), ("/d", 1)]), 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, "/a");
        assert_eq!(ranked[1].0, "/b");
    }

    #[test]
    fn newest_alert_comes_first() {
        let mut state = AppState::new();
        state.push_alert(alert(true, 2.0));
        state.push_alert(alert(false, 0.5));

        let last = state.last_alert().unwrap();
        assert!(!last.is_open);
        assert_eq!(state.alerts.len(), 2);
    }

    #[test]
    fn alert_history_is_bounded() {
        let mut state = AppState::new();
        for i in 0..(MAX_ALERTS + 10) {
            state.push_alert(alert(i % 2 == 0, i as f64));
        }
        assert_eq!(state.alerts.len(), MAX_ALERTS);
        // 最新の遷移が先頭に残る
        assert_eq!(state.last_alert().unwrap().rate, (MAX_ALERTS + 9) as f64);
    }
}
